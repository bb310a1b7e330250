//! Line intersection resolver (§4.K): drops organizational sea features,
//! populates the node set, and snaps stream endpoints against crossing
//! segments.

use hashbrown::HashSet;

use crate::geometry;
use crate::model::{Context, Coordinate, FeatureGeometry, SegmentId};
use crate::tags::ObjectKind;

const SNAP_TOLERANCE_M: f64 = 0.1;
const OFFSET_LON_M_EQUIVALENT: f64 = 4e-6;
const OFFSET_LAT_M_EQUIVALENT: f64 = 2e-6;

/// Remove sea features; they exist only to organize islands/segments (§4.K).
pub fn remove_sea_features(ctx: &mut Context) {
    let sea: HashSet<crate::model::FeatureId> = ctx
        .features
        .iter()
        .enumerate()
        .filter(|(_, f)| f.object_kind == ObjectKind::Hav)
        .map(|(i, _)| crate::model::FeatureId(i))
        .collect();
    ctx.delete_features(&sea);
}

/// Populate the node set with the endpoints of every used segment and every
/// emitted line (§4.K).
pub fn populate_node_set(ctx: &mut Context) {
    for segment in &ctx.segments {
        if segment.used == 0 {
            continue;
        }
        ctx.nodes.insert(segment.first());
        ctx.nodes.insert(segment.last());
    }
    for feature in &ctx.features {
        if let FeatureGeometry::LineString(line) = &feature.geometry {
            if let (Some(&first), Some(&last)) = (line.first(), line.last()) {
                ctx.nodes.insert(first);
                ctx.nodes.insert(last);
            }
        }
    }
}

/// For each stream feature (`Vattendrag` LineString) and each bbox-overlapping
/// segment, resolve the shared-vertex / no-shared-vertex cases (§4.K).
pub fn resolve_stream_intersections(ctx: &mut Context) {
    let stream_indices: Vec<usize> = ctx
        .features
        .iter()
        .enumerate()
        .filter(|(_, f)| f.object_kind == ObjectKind::Vattendrag && matches!(f.geometry, FeatureGeometry::LineString(_)))
        .map(|(i, _)| i)
        .collect();

    let used_segment_ids: Vec<usize> = (0..ctx.segments.len()).filter(|&i| ctx.segments[i].used > 0).collect();

    for fi in stream_indices {
        let Some(stream_bbox) = ctx.features[fi].bbox() else { continue };
        for &sid in &used_segment_ids {
            if !ctx.segments[sid].bbox().overlaps(&stream_bbox) {
                continue;
            }
            resolve_one(ctx, fi, SegmentId(sid));
        }
    }
}

fn resolve_one(ctx: &mut Context, fi: usize, sid: SegmentId) {
    let FeatureGeometry::LineString(line) = ctx.features[fi].geometry.clone() else { return };
    if line.is_empty() {
        return;
    }
    let endpoints = [line[0], *line.last().unwrap()];
    let is_shoreline = matches!(
        ctx.segment(sid).object_kind,
        ObjectKind::StrandlinjeSjo | ObjectKind::StrandlinjeHav | ObjectKind::StangningMotHav
    );

    for (which, &endpoint) in endpoints.iter().enumerate() {
        let shared = ctx.segment(sid).coords.iter().any(|&c| c == endpoint);

        if shared {
            ctx.nodes.insert(endpoint);
            if is_shoreline {
                continue;
            }
            handle_non_shoreline_shared_vertex(ctx, fi, which, sid, endpoint);
            continue;
        }

        let coords = ctx.segment(sid).coords.clone();
        let (dist, edge_idx) = geometry::shortest_distance(endpoint, &coords);
        if dist < SNAP_TOLERANCE_M {
            let (_, projected) = geometry::segment_distance(endpoint, coords[edge_idx], coords[edge_idx + 1], true);
            snap_stream_endpoint(ctx, fi, which, sid, projected);
        }
    }
}

fn snap_stream_endpoint(ctx: &mut Context, fi: usize, which: usize, sid: SegmentId, projected_point: Option<Coordinate>) {
    let FeatureGeometry::LineString(mut line) = ctx.features[fi].geometry.clone() else { return };
    let Some(target) = projected_point.or_else(|| Some(if which == 0 { line[0] } else { *line.last().unwrap() })) else { return };

    let exists_nearby = ctx.segment(sid).coords.iter().any(|&c| geometry::point_distance(c, target) < SNAP_TOLERANCE_M);
    if !exists_nearby {
        let insert_at = ctx.segment(sid).coords.len() / 2;
        ctx.segment_mut(sid).coords.insert(insert_at, target);
        ctx.segment_mut(sid).recompute_bbox();
    }

    if which == 0 {
        line[0] = target;
    } else {
        let last = line.len() - 1;
        line[last] = target;
    }
    ctx.features[fi].geometry = FeatureGeometry::LineString(line);
    ctx.nodes.insert(target);
}

fn handle_non_shoreline_shared_vertex(ctx: &mut Context, fi: usize, which: usize, sid: SegmentId, vertex: Coordinate) {
    let FeatureGeometry::LineString(mut line) = ctx.features[fi].geometry.clone() else { return };
    let is_interior = which != 0 && which != line.len().saturating_sub(1);
    let neighbors_shared = if line.len() >= 3 {
        let neighbor_idx = if which == 0 { 1 } else { line.len() - 2 };
        ctx.nodes.contains(&line[neighbor_idx])
    } else {
        false
    };

    if is_interior && !neighbors_shared {
        line.retain(|&c| c != vertex);
        ctx.features[fi].geometry = FeatureGeometry::LineString(line);
        return;
    }

    let offset = vertex.offset(OFFSET_LON_M_EQUIVALENT, OFFSET_LAT_M_EQUIVALENT);
    if which == 0 {
        line[0] = offset;
    } else {
        let last = line.len() - 1;
        line[last] = offset;
    }
    ctx.features[fi].geometry = FeatureGeometry::LineString(line);
    ctx.nodes.insert(offset);
    let _ = sid;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{Feature, Segment, Tags};

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat)
    }

    #[test]
    fn removes_sea_features_but_keeps_others() {
        let mut ctx = Context::new(Config::default());
        ctx.add_feature(Feature::new(ObjectKind::Hav, FeatureGeometry::Point(c(0.0, 0.0)), Tags::new()));
        ctx.add_feature(Feature::new(ObjectKind::Sjo, FeatureGeometry::Point(c(1.0, 1.0)), Tags::new()));
        remove_sea_features(&mut ctx);
        assert_eq!(ctx.features.len(), 1);
        assert_eq!(ctx.features[0].object_kind, ObjectKind::Sjo);
    }

    #[test]
    fn node_set_contains_used_segment_endpoints() {
        let mut ctx = Context::new(Config::default());
        let mut seg = Segment::new(ObjectKind::Gridline, vec![c(0.0, 0.0), c(1.0, 0.0)], Tags::new()).unwrap();
        seg.used = 1;
        ctx.add_segment(seg);
        populate_node_set(&mut ctx);
        assert!(ctx.nodes.contains(&c(0.0, 0.0)));
        assert!(ctx.nodes.contains(&c(1.0, 0.0)));
    }
}
