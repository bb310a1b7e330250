//! Place-name matcher (§4.J): assigns gazetteer candidates to features by
//! category, bbox/containment, rank, and (for rivers) a dedicated pass with
//! cross-scale upgrade.

use hashbrown::HashSet;

use crate::geometry;
use crate::model::{Context, Feature, FeatureGeometry};
use crate::tags::ObjectKind;

const POINT_PAD_M: f64 = 500.0;
const POLYGON_PAD_M: f64 = 3000.0;
const PROXIMITY_PAD_M: f64 = 50.0;
const PROXIMITY_MAX_M: f64 = 50.0;
const RIVER_PAD_M: f64 = 100.0;
const DROP_BELOW_TOP_THRESHOLD: usize = 5;

fn category_matches(feature_kind: &ObjectKind, category: &str) -> bool {
    match category {
        "Sjö" => matches!(feature_kind, ObjectKind::Sjo | ObjectKind::AnlagtVatten),
        "Del av vatten" => matches!(feature_kind, ObjectKind::Hav | ObjectKind::DelAvVatten),
        "Vattendrag" | "Vattenfall" | "Fors" => {
            matches!(feature_kind, ObjectKind::Vattendrag | ObjectKind::VattendragYta | ObjectKind::Akvedukt | ObjectKind::Fors | ObjectKind::Vattenfall)
        }
        "Terräng" => matches!(feature_kind, ObjectKind::Terrang),
        "Glaciär" => matches!(feature_kind, ObjectKind::Glaciar),
        "Sankmark" => matches!(feature_kind, ObjectKind::Sankmark),
        _ => feature_kind.as_str() == category,
    }
}

fn feature_pad(feature: &Feature) -> f64 {
    match feature.geometry {
        FeatureGeometry::Point(_) => POINT_PAD_M,
        _ => POLYGON_PAD_M,
    }
}

fn feature_contains_point(feature: &Feature, p: crate::model::Coordinate) -> bool {
    match &feature.geometry {
        FeatureGeometry::Polygon(patches) => {
            let rings: Vec<Vec<crate::model::Coordinate>> = patches.iter().map(|patch| patch.ring.clone()).collect();
            geometry::point_in_multipolygon(p, &rings)
        }
        _ => false,
    }
}

/// Match function order: sea, islands, glaciers, wetlands, lakes, rivers, then
/// unmatched bay/sea/glacier names as standalone points (§4.J).
pub fn match_names(ctx: &mut Context) {
    apply_suffix_fixups(ctx);

    let pass_order = ["Del av vatten", "Ö", "Glaciär", "Sankmark", "Sjö"];
    for category in pass_order {
        match_category(ctx, category);
    }

    proximity_fallback(ctx);
    match_rivers(ctx);
    emit_unmatched_as_points(ctx);
}

fn match_category(ctx: &mut Context, category: &str) {
    let mut place_indices: Vec<usize> = ctx
        .place_names
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.claimed && p.category == category)
        .map(|(i, _)| i)
        .collect();
    place_indices.sort_by_key(|&i| std::cmp::Reverse(ctx.place_names[i].rank_key()));

    if let Some(&top) = place_indices.first() {
        let top_tier = ctx.place_names[top].best_tier();
        let sharing_top_tier = place_indices.iter().filter(|&&i| ctx.place_names[i].best_tier() == top_tier).count();

        if matches!(category, "Ö" | "Sankmark") {
            // Islands/wetlands always drop candidates whose own best scale
            // differs from the top candidate's, regardless of how many share it.
            place_indices.retain(|&i| ctx.place_names[i].best_tier() == top_tier);
        } else if sharing_top_tier > DROP_BELOW_TOP_THRESHOLD {
            let top_scores = ctx.place_names[top].scores;
            place_indices.retain(|&i| ctx.place_names[i].scores == top_scores);
        }
    }

    for fi in 0..ctx.features.len() {
        if ctx.features[fi].tags.contains_key("name") {
            continue;
        }
        if !category_matches(&ctx.features[fi].object_kind, category) {
            continue;
        }
        let Some(feature_bbox) = ctx.features[fi].bbox() else { continue };
        let padded = feature_bbox.padded(feature_pad(&ctx.features[fi]));

        let sea_consume_only = ctx.features[fi].object_kind == ObjectKind::Hav && !ctx.config.add_sea_names;

        let mut matched: Vec<usize> = Vec::new();
        for &pi in &place_indices {
            if ctx.place_names[pi].claimed {
                continue;
            }
            let candidate_bbox = match crate::model::BBox::of(&ctx.place_names[pi].candidates) {
                Some(b) => b,
                None => continue,
            };
            if !padded.overlaps(&candidate_bbox) {
                continue;
            }
            let contains = ctx.place_names[pi].candidates.iter().any(|&c| feature_contains_point(&ctx.features[fi], c));
            if !contains {
                continue;
            }
            matched.push(pi);
        }

        dedupe_by_name(ctx, &mut matched);
        if matched.is_empty() {
            continue;
        }

        for &pi in &matched {
            ctx.place_names[pi].claimed = true;
        }
        if sea_consume_only {
            continue;
        }

        apply_tag_outcome(ctx, fi, &matched);
    }
}

fn dedupe_by_name(ctx: &Context, matched: &mut Vec<usize>) {
    let mut seen: HashSet<String> = HashSet::new();
    matched.retain(|&pi| seen.insert(ctx.place_names[pi].name().to_string()));
}

fn apply_tag_outcome(ctx: &mut Context, fi: usize, matched: &[usize]) {
    let has_ref = ctx.features[fi].tags.contains_key("ref:lantmateriet:ortnamn") && ctx.features[fi].tags.contains_key("name");

    if has_ref {
        for &pi in matched {
            set_fixme(ctx, fi, &format!("Consider extra name: {}", ctx.place_names[pi].name()));
        }
        return;
    }

    let mut ranked: Vec<usize> = matched.to_vec();
    ranked.sort_by_key(|&pi| std::cmp::Reverse(ctx.place_names[pi].rank_key()));

    let best = ranked[0];
    let tied = ranked.len() > 1 && !ctx.place_names[best].priority_name(&ctx.place_names[ranked[1]]);

    for (k, v) in ctx.place_names[best].tags.clone() {
        ctx.features[fi].tags.insert(k, v);
    }
    let verb = if tied { "Choose name" } else { "Verify name" };
    set_fixme(ctx, fi, &format!("{verb}: {}", ctx.place_names[best].name()));

    for &pi in &ranked[1..] {
        ctx.features[fi].tags.insert("ALT_NAME".into(), ctx.place_names[pi].name().to_string());
        emit_fixme_point(ctx, pi);
    }
}

fn set_fixme(ctx: &mut Context, fi: usize, text: &str) {
    ctx.features[fi].tags.insert("FIXME".into(), text.to_string());
}

fn emit_fixme_point(ctx: &mut Context, place_index: usize) {
    let Some(&candidate) = ctx.place_names[place_index].candidates.first() else { return };
    let mut tags = ctx.place_names[place_index].tags.clone();
    tags.insert("FIXME".into(), format!("Verify name: {}", ctx.place_names[place_index].name()));
    let feature = Feature::new(ObjectKind::Ortnamn, FeatureGeometry::Point(candidate), tags);
    ctx.add_feature(feature);
}

/// For still-nameless features, pad bbox 50 m and pick the closest unclaimed
/// place within 50 m (§4.J "Proximity fallback").
fn proximity_fallback(ctx: &mut Context) {
    for fi in 0..ctx.features.len() {
        if ctx.features[fi].tags.contains_key("name") {
            continue;
        }
        let Some(bbox) = ctx.features[fi].bbox() else { continue };
        let padded = bbox.padded(PROXIMITY_PAD_M);
        let ring = match &ctx.features[fi].geometry {
            FeatureGeometry::Polygon(patches) => patches.first().map(|p| p.ring.clone()),
            FeatureGeometry::LineString(line) => Some(line.clone()),
            FeatureGeometry::Point(_) => None,
        };
        let Some(ring) = ring else { continue };

        let mut best: Option<(f64, usize)> = None;
        for (pi, place) in ctx.place_names.iter().enumerate() {
            if place.claimed {
                continue;
            }
            let Some(candidate_bbox) = crate::model::BBox::of(&place.candidates) else { continue };
            if !padded.overlaps(&candidate_bbox) {
                continue;
            }
            for &candidate in &place.candidates {
                let (dist, _) = geometry::shortest_distance(candidate, &ring);
                if dist < PROXIMITY_MAX_M && best.map(|(d, _)| dist < d).unwrap_or(true) {
                    best = Some((dist, pi));
                }
            }
        }

        if let Some((_, pi)) = best {
            ctx.place_names[pi].claimed = true;
            for (k, v) in ctx.place_names[pi].tags.clone() {
                ctx.features[fi].tags.insert(k, v);
            }
        }
    }
}

/// River name matching: accumulate every matched place per river feature; if
/// all names agree, transfer it; otherwise split with a FIXME and emit each
/// as a standalone point (§4.J "Rivers").
fn match_rivers(ctx: &mut Context) {
    let river_place_indices: Vec<usize> = ctx
        .place_names
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.claimed && matches!(p.category.as_str(), "Vattendrag" | "Vattenfall" | "Fors"))
        .map(|(i, _)| i)
        .collect();

    let mut river_worthy_ids: HashSet<String> = HashSet::new();

    for fi in 0..ctx.features.len() {
        if !matches!(
            ctx.features[fi].object_kind,
            ObjectKind::Vattendrag | ObjectKind::VattendragYta | ObjectKind::Akvedukt | ObjectKind::Fors
        ) {
            continue;
        }
        let Some(bbox) = ctx.features[fi].bbox() else { continue };
        let padded = bbox.padded(RIVER_PAD_M);

        let mut matched: Vec<usize> = Vec::new();
        for &pi in &river_place_indices {
            if ctx.place_names[pi].claimed {
                continue;
            }
            let Some(candidate_bbox) = crate::model::BBox::of(&ctx.place_names[pi].candidates) else { continue };
            if padded.overlaps(&candidate_bbox) {
                matched.push(pi);
            }
        }
        if matched.is_empty() {
            continue;
        }

        let names_len = matched.iter().map(|&pi| ctx.place_names[pi].name()).collect::<HashSet<&str>>().len();
        if names_len == 1 {
            let pi = matched[0];
            for (k, v) in ctx.place_names[pi].tags.clone() {
                ctx.features[fi].tags.insert(k, v);
            }
            if ctx.place_names[pi].scores.t100 > 0 || ctx.place_names[pi].scores.t250 > 0 {
                if let Some(id) = ctx.features[fi].tags.get("vattendragsid").cloned() {
                    river_worthy_ids.insert(id);
                }
            }
        } else {
            let joined = matched.iter().map(|&pi| ctx.place_names[pi].name()).collect::<Vec<_>>().join(", ");
            set_fixme(ctx, fi, &format!("Split waterway for names: {joined}"));
        }

        for &pi in &matched {
            ctx.place_names[pi].claimed = true;
        }
    }

    crate::river::upgrade_cross_scale(ctx, &river_worthy_ids);
}

/// Second emission pass: unmatched bay/sea/glacier names become standalone
/// FIXME points (§4.J).
fn emit_unmatched_as_points(ctx: &mut Context) {
    let unmatched: Vec<usize> = ctx
        .place_names
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.claimed && matches!(p.category.as_str(), "Del av vatten" | "Glaciär"))
        .map(|(i, _)| i)
        .collect();

    for pi in unmatched {
        emit_fixme_point(ctx, pi);
        ctx.place_names[pi].claimed = true;
    }
}

/// Reclassify place categories based on name suffixes (§4.J "Stillwater/river
/// suffix fix-ups").
fn apply_suffix_fixups(ctx: &mut Context) {
    for place in &mut ctx.place_names {
        let name = place.name().to_lowercase();
        let new_category = if name.ends_with("bäcken") || name.ends_with("älven") {
            Some("Vattendrag")
        } else if name.ends_with("selet") {
            Some("Del av vatten")
        } else if name.ends_with("forsen") {
            Some("Fors")
        } else if name.ends_with("fallet") {
            Some("Vattenfall")
        } else {
            None
        };
        if let Some(category) = new_category {
            place.category = category.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::place::ScaleScores;
    use crate::model::{Coordinate, Patch, PlaceName, Tags};

    fn place(name: &str, category: &str, candidate: Coordinate) -> PlaceName {
        let mut tags = Tags::new();
        tags.insert("name".into(), name.into());
        PlaceName {
            reference_id: "1".into(),
            category: category.into(),
            candidates: vec![candidate],
            scores: ScaleScores::default(),
            tags,
            claimed: false,
        }
    }

    #[test]
    fn match_category_tags_a_lake_from_a_contained_candidate() {
        let mut ctx = Context::new(Config::default());
        let ring = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(10.0, 0.0),
            Coordinate::new(10.0, 10.0),
            Coordinate::new(0.0, 10.0),
            Coordinate::new(0.0, 0.0),
        ];
        let feature = Feature::new(ObjectKind::Sjo, FeatureGeometry::Polygon(vec![Patch::new(ring)]), Tags::new());
        ctx.add_feature(feature);
        ctx.place_names.push(place("Storsjön", "Sjö", Coordinate::new(5.0, 5.0)));

        match_category(&mut ctx, "Sjö");

        assert_eq!(ctx.features[0].tags.get("name").map(String::as_str), Some("Storsjön"));
        assert!(ctx.place_names[0].claimed);
    }

    #[test]
    fn suffix_fixup_reclassifies_baecken_to_vattendrag() {
        let mut ctx = Context::new(Config::default());
        ctx.place_names.push(place("Stor-bäcken", "Terräng", Coordinate::new(0.0, 0.0)));
        apply_suffix_fixups(&mut ctx);
        assert_eq!(ctx.place_names[0].category, "Vattendrag");
    }

    fn place_with_scores(name: &str, candidate: Coordinate, t50: u32, t10: u32, reference_id: &str) -> PlaceName {
        let mut tags = Tags::new();
        tags.insert("name".into(), name.into());
        PlaceName {
            reference_id: reference_id.into(),
            category: "Sjö".into(),
            candidates: vec![candidate],
            scores: ScaleScores { t250: 0, t100: 0, t50, t10 },
            tags,
            claimed: false,
        }
    }

    /// E5 — ambiguous lake name (§8): two gazetteer points inside the same
    /// lake with a strictly ordered score split the tie into a primary name
    /// plus an alternate FIXME point, rather than silently picking one.
    #[test]
    fn e5_ambiguous_lake_name_keeps_the_stronger_candidate_and_fixmes_the_rest() {
        let mut ctx = Context::new(Config::default());
        let ring = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(10.0, 0.0),
            Coordinate::new(10.0, 10.0),
            Coordinate::new(0.0, 10.0),
            Coordinate::new(0.0, 0.0),
        ];
        let feature = Feature::new(ObjectKind::Sjo, FeatureGeometry::Polygon(vec![Patch::new(ring)]), Tags::new());
        ctx.add_feature(feature);

        ctx.place_names.push(place_with_scores("Storsjön", Coordinate::new(3.0, 3.0), 3, 1, "100"));
        ctx.place_names.push(place_with_scores("Lillsjön", Coordinate::new(7.0, 7.0), 2, 4, "200"));

        match_category(&mut ctx, "Sjö");

        assert_eq!(ctx.features[0].tags.get("name").map(String::as_str), Some("Storsjön"));
        assert_eq!(ctx.features[0].tags.get("ALT_NAME").map(String::as_str), Some("Lillsjön"));
        assert_eq!(ctx.features[0].tags.get("FIXME").map(String::as_str), Some("Verify name: Storsjön"));

        let alt_point = ctx
            .features
            .iter()
            .find(|f| matches!(f.geometry, FeatureGeometry::Point(_)) && f.tags.get("name").map(String::as_str) == Some("Lillsjön"));
        assert!(alt_point.is_some(), "expected a standalone point for the losing candidate");
    }
}
