//! Polygon → segment decomposer (§4.G): for every polygon feature, in
//! priority order, assign existing or synthesized segments to each patch so
//! the patch ring is fully covered by its member list.

use hashbrown::HashSet;

use crate::model::{segment::order_pair, Context, Coordinate, FeatureGeometry, Segment, SegmentId, SegmentRef};
use crate::tags::ObjectKind;

const COASTLINE_REPAIR_TOLERANCE_M: f64 = 0.01;

/// Pre-step for sea features (§4.G): rewrite a `Hav` patch vertex to equal a
/// nearby `Strandlinje, hav` / `Stängning mot hav` segment coordinate when
/// exactly one segment coordinate has no exact match in the patch but one
/// patch vertex lies within 0.01 m of it.
pub fn repair_sea_coastlines(ctx: &mut Context) {
    let shoreline_ids: Vec<SegmentId> = ctx
        .segments
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s.object_kind, ObjectKind::StrandlinjeHav | ObjectKind::StangningMotHav))
        .map(|(i, _)| SegmentId(i))
        .collect();

    for feature in &mut ctx.features {
        if feature.object_kind != ObjectKind::Hav {
            continue;
        }
        let FeatureGeometry::Polygon(patches) = &mut feature.geometry else { continue };
        for patch in patches {
            let patch_vertices: HashSet<Coordinate> = patch.ring.iter().copied().collect();
            for &sid in &shoreline_ids {
                let segment = &ctx.segments[sid.0];
                let unmatched: Vec<Coordinate> =
                    segment.coords.iter().copied().filter(|c| !patch_vertices.contains(c)).collect();
                if unmatched.len() != 1 {
                    continue;
                }
                let target = unmatched[0];
                if let Some(idx) = patch
                    .ring
                    .iter()
                    .position(|&v| crate::geometry::point_distance(v, target) < COASTLINE_REPAIR_TOLERANCE_M)
                {
                    patch.ring[idx] = target;
                }
            }
        }
    }
}

fn consecutive_indices(ring_len: usize, a: usize, b: usize) -> bool {
    let n = ring_len - 1; // ring is closed
    (a + 1) % n == b || (b + 1) % n == a
}

/// Decompose every polygon feature's patches into member segments, in the
/// priority order from `ObjectKind::sort_priority`.
pub fn decompose(ctx: &mut Context) {
    let mut feature_order: Vec<usize> = (0..ctx.features.len())
        .filter(|&i| matches!(ctx.features[i].geometry, FeatureGeometry::Polygon(_)))
        .collect();
    feature_order.sort_by_key(|&i| ctx.features[i].object_kind.sort_priority());

    for fi in feature_order {
        let topo50_100_wetland = matches!(ctx.config.topo_product, crate::config::TopoProduct::Topo50 | crate::config::TopoProduct::Topo100)
            && ctx.features[fi].object_kind.is_wetland();
        let is_sea = ctx.features[fi].object_kind == ObjectKind::Hav;
        let is_water = ctx.features[fi].is_water();

        let patch_count = ctx.features[fi].patches().len();
        for pi in 0..patch_count {
            decompose_patch(ctx, fi, pi, topo50_100_wetland, is_sea, is_water);
        }
    }
}

fn decompose_patch(ctx: &mut Context, fi: usize, pi: usize, topo50_100_wetland: bool, is_sea: bool, is_water: bool) {
    let ring = ctx.features[fi].patches()[pi].ring.clone();
    let Some(patch_bbox) = crate::model::BBox::of(&ring) else { return };
    let ring_vertices: HashSet<Coordinate> = ring.iter().copied().collect();

    let mut claimed: HashSet<(Coordinate, Coordinate)> = HashSet::new();
    let ring_connections: HashSet<(Coordinate, Coordinate)> = ring.windows(2).map(|w| order_pair(w[0], w[1])).collect();
    let mut members: Vec<SegmentRef> = Vec::new();

    let candidate_ids: Vec<usize> = (0..ctx.segments.len())
        .filter(|&sid| {
            let seg = &ctx.segments[sid];
            if is_sea && seg.object_kind == ObjectKind::Stangning {
                return false;
            }
            if !seg.bbox().overlaps(&patch_bbox) {
                return false;
            }
            if !seg.coords.iter().all(|c| ring_vertices.contains(c)) {
                return false;
            }
            if topo50_100_wetland && seg.coords != ring {
                return false;
            }
            true
        })
        .collect();

    for sid in candidate_ids {
        let seg_connections = ctx.segments[sid].connections();
        if seg_connections.iter().any(|c| claimed.contains(c)) {
            continue;
        }
        if !seg_connections.iter().all(|c| ring_connections.contains(c)) {
            continue;
        }
        let first_idx = ring.iter().position(|&c| c == ctx.segments[sid].first());
        let last_idx = ring.iter().position(|&c| c == ctx.segments[sid].last());
        let (Some(a), Some(b)) = (first_idx, last_idx) else { continue };
        if a != b && !consecutive_indices(ring.len(), a, b) && ctx.segments[sid].coords.len() == 2 {
            continue;
        }

        let was_unused = ctx.segments[sid].used == 0;
        if is_water && was_unused {
            let ring_forward_order = a < b || (b == 0 && a == ring.len() - 2);
            if !ring_forward_order {
                ctx.segments[sid].reverse();
            }
        }

        claimed.extend(seg_connections);
        ctx.segments[sid].used += 1;
        members.push(SegmentRef { segment: SegmentId(sid), forward: true });

        if claimed.len() >= ring_connections.len() {
            break;
        }
    }

    // Completion: synthesize segments covering any leftover runs.
    let uncovered: Vec<(Coordinate, Coordinate)> =
        ring.windows(2).map(|w| order_pair(w[0], w[1])).filter(|c| !claimed.contains(c)).collect();
    if !uncovered.is_empty() {
        let kind = ctx.features[fi].object_kind.clone();
        let mut runs: Vec<Vec<Coordinate>> = Vec::new();
        let mut current: Vec<Coordinate> = Vec::new();
        for w in ring.windows(2) {
            if uncovered.contains(&order_pair(w[0], w[1])) {
                if current.is_empty() {
                    current.push(w[0]);
                }
                current.push(w[1]);
            } else if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        for run in runs {
            if let Some(segment) = Segment::new(kind.clone(), run, crate::model::Tags::new()) {
                let sid = ctx.add_segment(segment);
                ctx.segment_mut(sid).used += 1;
                members.push(SegmentRef { segment: sid, forward: true });
            }
        }
    }

    // Sorting: order by the ring position of each member's "second" coordinate.
    members.sort_by_key(|m| {
        let seg = ctx.segment(m.segment);
        let a = ring.iter().position(|&c| c == seg.first()).unwrap_or(0);
        let b = ring.iter().position(|&c| c == seg.last()).unwrap_or(0);
        if seg.coords.len() == 2 {
            a.max(b)
        } else {
            b
        }
    });

    ctx.features[fi].patches_mut()[pi].members = members;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{Feature, Patch, Tags};

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat)
    }

    #[test]
    fn decompose_assigns_existing_segments_to_a_square() {
        let mut ctx = Context::new(Config::default());
        let ring = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0), c(0.0, 0.0)];
        let seg = Segment::new(ObjectKind::StrandlinjeSjo, ring.clone(), Tags::new()).unwrap();
        ctx.add_segment(seg);

        let feature = Feature::new(ObjectKind::Sjo, FeatureGeometry::Polygon(vec![Patch::new(ring)]), Tags::new());
        ctx.add_feature(feature);

        decompose(&mut ctx);

        assert_eq!(ctx.features[0].patches()[0].members.len(), 1);
        assert_eq!(ctx.segments[0].used, 1);
    }

    #[test]
    fn decompose_synthesizes_leftover_runs() {
        let mut ctx = Context::new(Config::default());
        let ring = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0), c(0.0, 0.0)];
        let feature = Feature::new(ObjectKind::Sjo, FeatureGeometry::Polygon(vec![Patch::new(ring)]), Tags::new());
        ctx.add_feature(feature);

        decompose(&mut ctx);

        assert!(!ctx.features[0].patches()[0].members.is_empty());
        assert!(ctx.segments.iter().any(|s| s.used > 0));
    }
}
