//! OSM emitter (§4.M): allocates negative ids, emits shared nodes, ways per
//! used segment, and points/ways/multipolygon-relations per feature. Also
//! writes the optional debug GeoJSON (SUPPLEMENT "Debug GeoJSON"), grounded on
//! the teacher's `output::write_geojson`.

use std::collections::BTreeMap;
use std::io::Write;

use geojson::{Feature as GeoFeature, FeatureCollection, Geometry, Value};
use serde_json::{json, Map};

use crate::config::VERSION;
use crate::model::{Context, Coordinate, FeatureGeometry, Tags};

struct IdAllocator {
    next: i64,
}

impl IdAllocator {
    fn new() -> Self {
        Self { next: -1001 }
    }

    fn allocate(&mut self) -> i64 {
        let id = self.next;
        self.next -= 1;
        id
    }
}

struct OsmNode {
    id: i64,
    coord: Coordinate,
    tags: Tags,
}

struct OsmWay {
    id: i64,
    node_ids: Vec<i64>,
    tags: Tags,
}

struct OsmMember {
    way_id: i64,
    role: &'static str,
}

struct OsmRelation {
    id: i64,
    members: Vec<OsmMember>,
    tags: Tags,
}

#[derive(Default)]
struct Document {
    nodes: Vec<OsmNode>,
    ways: Vec<OsmWay>,
    relations: Vec<OsmRelation>,
}

/// Emit the context into an OSM XML change file (§4.M, §6 "Outputs").
pub fn emit_osm_xml(ctx: &Context) -> String {
    let mut ids = IdAllocator::new();
    let mut doc = Document::default();
    let mut node_id_by_coord: BTreeMap<(i64, i64), i64> = BTreeMap::new();

    for &coord in ctx.nodes.iter() {
        let id = ids.allocate();
        node_id_by_coord.insert(coord_key(coord), id);
        doc.nodes.push(OsmNode { id, coord, tags: Tags::new() });
    }

    let mut way_id_by_segment: BTreeMap<usize, i64> = BTreeMap::new();
    for (sid, segment) in ctx.segments.iter().enumerate() {
        if segment.used == 0 {
            continue;
        }
        let node_ids = resolve_node_ids(&mut ids, &mut doc, &mut node_id_by_coord, &segment.coords);
        let id = ids.allocate();
        way_id_by_segment.insert(sid, id);
        doc.ways.push(OsmWay { id, node_ids, tags: segment.tags.clone() });
    }

    for feature in &ctx.features {
        match &feature.geometry {
            FeatureGeometry::Point(coord) => {
                // Reuse the shared-node id for this coordinate if one exists
                // (§4.M "Point -> a new node, or reuse an existing shared-node id").
                match node_id_by_coord.get(&coord_key(*coord)) {
                    Some(&existing_id) => {
                        if let Some(node) = doc.nodes.iter_mut().find(|n| n.id == existing_id) {
                            node.tags.extend(feature.tags.clone());
                        }
                    }
                    None => {
                        let id = ids.allocate();
                        doc.nodes.push(OsmNode { id, coord: *coord, tags: feature.tags.clone() });
                    }
                }
            }
            FeatureGeometry::LineString(line) => {
                let node_ids = resolve_node_ids(&mut ids, &mut doc, &mut node_id_by_coord, line);
                let id = ids.allocate();
                doc.ways.push(OsmWay { id, node_ids, tags: feature.tags.clone() });
            }
            FeatureGeometry::Polygon(patches) => {
                emit_polygon(&mut ids, &mut doc, &way_id_by_segment, feature, patches);
            }
        }
    }

    render_xml(&doc)
}

fn emit_polygon(
    ids: &mut IdAllocator,
    doc: &mut Document,
    way_id_by_segment: &BTreeMap<usize, i64>,
    feature: &crate::model::Feature,
    patches: &[crate::model::Patch],
) {
    // Closed-way shortcut: exactly one patch of exactly one member, no tag
    // collision with the member segment (§4.M).
    if patches.len() == 1 && patches[0].members.len() == 1 {
        let member = &patches[0].members[0];
        if let Some(&way_id) = way_id_by_segment.get(&member.segment.0) {
            let way = doc.ways.iter_mut().find(|w| w.id == way_id);
            if let Some(way) = way {
                let collides = feature.tags.keys().any(|k| way.tags.contains_key(k) && way.tags[k] != feature.tags[k]);
                if !collides {
                    way.tags.extend(feature.tags.clone());
                    return;
                }
            }
        }
    }

    let mut members = Vec::new();
    for (pi, patch) in patches.iter().enumerate() {
        let role: &'static str = if pi == 0 { "outer" } else { "inner" };
        for member in &patch.members {
            if let Some(&way_id) = way_id_by_segment.get(&member.segment.0) {
                members.push(OsmMember { way_id, role });
            }
        }
    }
    let id = ids.allocate();
    let mut tags = feature.tags.clone();
    tags.insert("type".into(), "multipolygon".into());
    doc.relations.push(OsmRelation { id, members, tags });
}

fn coord_key(c: Coordinate) -> (i64, i64) {
    ((c.lon * 1e7).round() as i64, (c.lat * 1e7).round() as i64)
}

fn resolve_node_ids(
    ids: &mut IdAllocator,
    doc: &mut Document,
    node_id_by_coord: &mut BTreeMap<(i64, i64), i64>,
    coords: &[Coordinate],
) -> Vec<i64> {
    coords
        .iter()
        .map(|&c| {
            let key = coord_key(c);
            if let Some(&id) = node_id_by_coord.get(&key) {
                id
            } else {
                // Not a shared node: inline-create it (§4.M).
                let id = ids.allocate();
                doc.nodes.push(OsmNode { id, coord: c, tags: Tags::new() });
                id
            }
        })
        .collect()
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn render_xml(doc: &Document) -> String {
    let mut out = String::new();
    out.push_str("<?xml version='1.0' encoding='UTF-8'?>\n");
    out.push_str(&format!(
        "<osm version=\"0.6\" upload=\"false\" generator=\"topo2osm v{VERSION}\">\n"
    ));

    for node in &doc.nodes {
        if node.tags.is_empty() {
            out.push_str(&format!(
                "  <node id=\"{}\" action=\"modify\" visible=\"true\" lat=\"{}\" lon=\"{}\"/>\n",
                node.id, node.coord.lat, node.coord.lon
            ));
        } else {
            out.push_str(&format!(
                "  <node id=\"{}\" action=\"modify\" visible=\"true\" lat=\"{}\" lon=\"{}\">\n",
                node.id, node.coord.lat, node.coord.lon
            ));
            write_tags(&mut out, &node.tags);
            out.push_str("  </node>\n");
        }
    }

    for way in &doc.ways {
        out.push_str(&format!("  <way id=\"{}\" action=\"modify\" visible=\"true\">\n", way.id));
        for nd in &way.node_ids {
            out.push_str(&format!("    <nd ref=\"{nd}\"/>\n"));
        }
        write_tags(&mut out, &way.tags);
        out.push_str("  </way>\n");
    }

    for relation in &doc.relations {
        out.push_str(&format!("  <relation id=\"{}\" action=\"modify\" visible=\"true\">\n", relation.id));
        for member in &relation.members {
            out.push_str(&format!(
                "    <member type=\"way\" ref=\"{}\" role=\"{}\"/>\n",
                member.way_id, member.role
            ));
        }
        write_tags(&mut out, &relation.tags);
        out.push_str("  </relation>\n");
    }

    out.push_str("</osm>\n");
    out
}

fn write_tags(out: &mut String, tags: &Tags) {
    let mut sorted: Vec<_> = tags.iter().collect();
    sorted.sort_by_key(|(k, _)| k.as_str());
    for (k, v) in sorted {
        out.push_str(&format!("    <tag k=\"{}\" v=\"{}\"/>\n", escape_xml(k), escape_xml(v)));
    }
}

/// Write the debug GeoJSON file preserving raw geometry and `extras`
/// (SUPPLEMENT "Debug GeoJSON"), grounded on the teacher's `output.rs`.
pub fn write_debug_geojson<W: Write>(ctx: &Context, writer: W) -> std::io::Result<()> {
    let mut features = Vec::new();
    for feature in &ctx.features {
        let geometry = match &feature.geometry {
            FeatureGeometry::Point(c) => Geometry::new(Value::Point(vec![c.lon, c.lat])),
            FeatureGeometry::LineString(line) => {
                Geometry::new(Value::LineString(line.iter().map(|c| vec![c.lon, c.lat]).collect()))
            }
            FeatureGeometry::Polygon(patches) => Geometry::new(Value::Polygon(
                patches.iter().map(|p| p.ring.iter().map(|c| vec![c.lon, c.lat]).collect()).collect(),
            )),
        };

        let mut properties = Map::new();
        for (k, v) in &feature.tags {
            properties.insert(k.clone(), json!(v));
        }
        for (k, v) in &feature.extras {
            properties.insert(format!("extra:{k}"), json!(v));
        }
        properties.insert("object_kind".into(), json!(feature.object_kind.as_str()));

        features.push(GeoFeature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    let collection = FeatureCollection { bbox: None, features, foreign_members: None };
    serde_json::to_writer_pretty(writer, &collection)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{Feature, Segment};
    use crate::tags::ObjectKind;

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat)
    }

    #[test]
    fn emits_a_way_for_a_used_segment() {
        let mut ctx = Context::new(Config::default());
        let mut seg = Segment::new(ObjectKind::Gridline, vec![c(0.0, 0.0), c(1.0, 0.0)], Tags::new()).unwrap();
        seg.used = 1;
        ctx.add_segment(seg);
        ctx.nodes.insert(c(0.0, 0.0));
        ctx.nodes.insert(c(1.0, 0.0));

        let xml = emit_osm_xml(&ctx);
        assert!(xml.contains("<way"));
        assert!(xml.contains("<nd ref="));
    }

    #[test]
    fn closed_way_shortcut_merges_tags_into_the_member_way() {
        let mut ctx = Context::new(Config::default());
        let ring = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 0.0)];
        let seg = Segment::new(ObjectKind::StrandlinjeSjo, ring.clone(), Tags::new()).unwrap();
        let sid = ctx.add_segment(seg);
        ctx.segment_mut(sid).used = 1;
        ctx.nodes.insert(ring[0]);
        ctx.nodes.insert(ring[1]);
        ctx.nodes.insert(ring[2]);

        let mut patch = crate::model::Patch::new(ring);
        patch.members.push(crate::model::SegmentRef { segment: sid, forward: true });
        let mut tags = Tags::new();
        tags.insert("natural".into(), "water".into());
        let feature = Feature::new(ObjectKind::Sjo, FeatureGeometry::Polygon(vec![patch]), tags);
        ctx.add_feature(feature);

        let xml = emit_osm_xml(&ctx);
        assert!(!xml.contains("<relation"));
        assert!(xml.contains("natural"));
    }
}
