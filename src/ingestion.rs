//! Ingestion (§4.C): source records → features/segments, classified and tagged.
//! Grounded on the teacher's `pbf::extract_elements` (indicatif progress bar
//! over a flat iterator, tag-predicate dispatch) and `pbf::Tags`.

use indicatif::{ProgressBar, ProgressStyle};

use crate::geometry;
use crate::model::{Context, Coordinate, Feature, FeatureGeometry, Patch, Segment, Tags};
use crate::tags::ObjectKind;

/// Geometry kind as it arrives from the source iterator, before classification.
#[derive(Clone, Debug)]
pub enum SourceGeometry {
    Point(Coordinate),
    Line(Vec<Coordinate>),
    /// Only the first ring-group of a multipolygon is kept (§4.C).
    Polygon(Vec<Vec<Coordinate>>),
}

#[derive(Clone, Debug)]
pub struct SourceRecord {
    pub object_kind: String,
    pub geometry: SourceGeometry,
    pub properties: Tags,
    /// Source date, for the run-summary year histogram.
    pub date_year: Option<u16>,
}

/// Round to 7 decimals and drop consecutive duplicates (§4.C); a line that
/// collapses to one point is discarded.
fn clean_line(coords: &[Coordinate]) -> Vec<Coordinate> {
    let mut out: Vec<Coordinate> = Vec::with_capacity(coords.len());
    for &c in coords {
        let rounded = Coordinate::new(c.lon, c.lat);
        if out.last() != Some(&rounded) {
            out.push(rounded);
        }
    }
    out
}

fn ring_to_patch(ring: &[Coordinate]) -> Vec<Vec<Coordinate>> {
    let cleaned = clean_line(ring);
    if cleaned.len() < 4 {
        return Vec::new();
    }
    geometry::split_patch(&cleaned)
}

/// Ingest every record into the context: avoid-set objects vanish, auxiliary
/// objects become `used = 0` segments, everything else becomes a feature
/// (§4.C).
pub fn ingest(ctx: &mut Context, records: Vec<SourceRecord>) {
    let progress = ProgressBar::new(records.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} ingested").unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for record in records {
        progress.inc(1);
        let kind = ObjectKind::from_source(&record.object_kind);
        if kind.is_avoid() {
            continue;
        }
        if let Some(year) = record.date_year {
            ctx.stats.record_date(year);
        }
        if matches!(kind, ObjectKind::Other(_)) {
            ctx.stats.record_missing_tag(&kind.as_str());
        }

        match record.geometry {
            SourceGeometry::Point(coord) => {
                ingest_point(ctx, kind, coord, record.properties);
            }
            SourceGeometry::Line(line) => {
                ingest_line(ctx, kind, &line, record.properties);
            }
            SourceGeometry::Polygon(rings) => {
                ingest_polygon(ctx, kind, rings, record.properties);
            }
        }
    }
    progress.finish_and_clear();
}

fn ingest_point(ctx: &mut Context, kind: ObjectKind, coord: Coordinate, properties: Tags) {
    let coord = Coordinate::new(coord.lon, coord.lat);
    let tags = tag_feature(&kind, properties);
    let feature = Feature::new(kind, FeatureGeometry::Point(coord), tags);
    ctx.add_feature(feature);
}

fn ingest_line(ctx: &mut Context, kind: ObjectKind, line: &[Coordinate], properties: Tags) {
    let cleaned = clean_line(line);
    if cleaned.len() < 2 {
        return;
    }

    // Vattenfall line geometry collapses to its midpoint-by-endpoints and is
    // reclassified as a point (§4.C).
    if matches!(kind, ObjectKind::Vattenfall) {
        let first = cleaned[0];
        let last = *cleaned.last().unwrap();
        let mid = Coordinate::new((first.lon + last.lon) / 2.0, (first.lat + last.lat) / 2.0);
        ingest_point(ctx, kind, mid, properties);
        return;
    }

    if kind.is_avoid() {
        return;
    }
    if kind.is_auxiliary() {
        if let Some(segment) = Segment::new(kind, cleaned, Tags::new()) {
            ctx.add_segment(segment);
        }
        return;
    }

    let tags = tag_feature(&kind, properties);
    let feature = Feature::new(kind, FeatureGeometry::LineString(cleaned), tags);
    ctx.add_feature(feature);
}

fn ingest_polygon(ctx: &mut Context, kind: ObjectKind, rings: Vec<Vec<Coordinate>>, properties: Tags) {
    let mut patches = Vec::new();
    for ring in &rings {
        for split_ring in ring_to_patch(ring) {
            patches.push(Patch::new(split_ring));
        }
    }
    if patches.is_empty() {
        return;
    }

    if kind.is_auxiliary() {
        for patch in patches {
            if let Some(segment) = Segment::new(kind.clone(), patch.ring, Tags::new()) {
                ctx.add_segment(segment);
            }
        }
        return;
    }

    let tags = tag_feature(&kind, properties);
    let feature = Feature::new(kind, FeatureGeometry::Polygon(patches), tags);
    ctx.add_feature(feature);
}

/// Per-kind tagging rules (§4.C): protected-area name composition, waterway
/// class from size-class/canal flag, lake/reservoir elevation, aerodrome vs.
/// airstrip. The tag *dictionaries themselves* are configuration data (§1);
/// only the dispatch shape lives here, mirroring `pbf::is_water_feature`'s
/// predicate style.
pub fn tag_feature(kind: &ObjectKind, properties: Tags) -> Tags {
    let mut tags = kind.default_tags();

    if let Some(base_name) = properties.get("djurskyddstyp_namn") {
        if let Some(djurskyddstyp) = properties.get("djurskyddstyp").or_else(|| properties.get("feature_type")) {
            tags.insert("name".into(), compose_protected_area_name(base_name, djurskyddstyp));
        }
    }

    if matches!(kind, ObjectKind::Vattendrag | ObjectKind::VattendragYta) {
        if let Some(size_class) = properties.get("storleksklass").and_then(|s| s.parse::<u32>().ok()) {
            let is_canal = properties.get("kanal").map(|v| v == "true" || v == "1").unwrap_or(false);
            tags.insert("waterway".into(), waterway_class(size_class, is_canal).into());
        }
        if let Some(id) = properties.get("vattendragsid") {
            tags.insert("vattendragsid".into(), id.clone());
        }
    }

    if matches!(kind, ObjectKind::Sjo | ObjectKind::AnlagtVatten) {
        if let Some(elevation) = properties.get("hojd") {
            if let Some((ele, ele_min)) = parse_reservoir_elevation(elevation) {
                tags.insert("water".into(), "reservoir".into());
                tags.insert("ele".into(), ele);
                tags.insert("ele:min".into(), ele_min);
            }
        }
    }

    if let Some(kind_str) = properties.get("flygplatstyp") {
        let aerodrome = properties.contains_key("iata");
        tags.insert("aeroway".into(), if aerodrome { "aerodrome".into() } else { "airstrip".into() });
        let _ = kind_str;
    }

    for (k, v) in &properties {
        if k.starts_with("name") || k == "ref:lantmateriet:ortnamn" {
            tags.insert(k.clone(), v.clone());
        }
    }

    tags
}

/// `<name> <s/space> <djurskyddstyp|feature-type-lowercased>`; the joining `s`
/// is dropped when `base_name` already ends in `s` (§4.C).
fn compose_protected_area_name(base_name: &str, suffix: &str) -> String {
    let suffix = suffix.to_lowercase();
    if base_name.ends_with('s') {
        format!("{base_name} {suffix}")
    } else {
        format!("{base_name}s{suffix}")
    }
}

fn waterway_class(size_class: u32, is_canal: bool) -> &'static str {
    if is_canal {
        "canal"
    } else if size_class >= 2 {
        "river"
    } else {
        "stream"
    }
}

/// `"123.4-120.0"` → `(ele="123.4", ele_min="120.0")`.
fn parse_reservoir_elevation(raw: &str) -> Option<(String, String)> {
    let (high, low) = raw.split_once('-')?;
    Some((high.trim().to_string(), low.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn record(kind: &str, geometry: SourceGeometry) -> SourceRecord {
        SourceRecord { object_kind: kind.into(), geometry, properties: Tags::new(), date_year: Some(2023) }
    }

    #[test]
    fn avoid_kind_is_discarded() {
        let mut ctx = Context::new(Config::default());
        ingest(&mut ctx, vec![record("Fixpunkt", SourceGeometry::Point(Coordinate::new(10.0, 60.0)))]);
        assert!(ctx.features.is_empty());
    }

    #[test]
    fn auxiliary_line_becomes_zero_use_segment() {
        let mut ctx = Context::new(Config::default());
        let line = vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0), Coordinate::new(1.0, 1.0)];
        ingest(&mut ctx, vec![record("Gridline", SourceGeometry::Line(line))]);
        assert!(ctx.features.is_empty());
        assert_eq!(ctx.segments.len(), 1);
        assert_eq!(ctx.segments[0].used, 0);
    }

    #[test]
    fn vattenfall_line_is_reclassified_as_point() {
        let mut ctx = Context::new(Config::default());
        let line = vec![Coordinate::new(0.0, 0.0), Coordinate::new(2.0, 0.0)];
        ingest(&mut ctx, vec![record("Vattenfall", SourceGeometry::Line(line))]);
        assert_eq!(ctx.features.len(), 1);
        assert!(matches!(ctx.features[0].geometry, FeatureGeometry::Point(_)));
    }

    #[test]
    fn reservoir_elevation_splits_on_dash() {
        let mut props = Tags::new();
        props.insert("hojd".into(), "123.4-120.0".into());
        let tags = tag_feature(&ObjectKind::Sjo, props);
        assert_eq!(tags.get("ele").map(String::as_str), Some("123.4"));
        assert_eq!(tags.get("ele:min").map(String::as_str), Some("120.0"));
    }

    #[test]
    fn protected_area_name_drops_duplicate_s() {
        assert_eq!(compose_protected_area_name("Nationalparkens", "Nationalpark"), "Nationalparkens nationalpark");
        assert_eq!(compose_protected_area_name("Skogen", "Naturreservat"), "Skogens naturreservat");
    }
}
