//! Wetland reconciler (§4.E). Operates on `Strandlinje*` / `Sankmark gräns`
//! segments (plus any `*gräns` kind when `merge_wetland` is set) and on the
//! wetland/shoreline feature patches they bound.

use hashbrown::HashSet;

use crate::geometry;
use crate::model::{segment::order_pair, Context, Coordinate, FeatureGeometry, Segment, SegmentId};
use crate::tags::ObjectKind;

const SNAP_TOLERANCE_M: f64 = 0.2;

fn is_wetland_boundary_segment(ctx: &Context, id: SegmentId) -> bool {
    let merge_wetland = ctx.config.merge_wetland;
    ctx.segment(id).object_kind.is_wetland_boundary(merge_wetland)
}

/// (i) Overlap-to-segments: for each pair of wetland features of different
/// object kind whose bboxes overlap, and for each pair of rings sharing a
/// vertex, walk the first ring accumulating runs whose consecutive vertices
/// both lie in the second ring's connection set, emitting each run as a new
/// `used = 0` `Sankmark gräns` segment.
pub fn overlap_to_segments(ctx: &mut Context) {
    let wetland_feature_indices: Vec<usize> = ctx
        .features
        .iter()
        .enumerate()
        .filter(|(_, f)| f.object_kind.is_wetland() || f.object_kind.is_water())
        .map(|(i, _)| i)
        .collect();

    let mut new_segments = Vec::new();

    for (ai, &fi) in wetland_feature_indices.iter().enumerate() {
        for &fj in &wetland_feature_indices[ai + 1..] {
            if ctx.features[fi].object_kind == ctx.features[fj].object_kind {
                continue;
            }
            let (Some(bbox_i), Some(bbox_j)) = (ctx.features[fi].bbox(), ctx.features[fj].bbox()) else { continue };
            if !bbox_i.overlaps(&bbox_j) {
                continue;
            }

            for patch_i in ctx.features[fi].patches() {
                for patch_j in ctx.features[fj].patches() {
                    let connections_j: HashSet<(Coordinate, Coordinate)> =
                        patch_j.ring.windows(2).map(|w| order_pair(w[0], w[1])).collect();

                    let mut run: Vec<Coordinate> = Vec::new();
                    for w in patch_i.ring.windows(2) {
                        let on_boundary = connections_j.contains(&order_pair(w[0], w[1]));
                        if on_boundary {
                            if run.is_empty() {
                                run.push(w[0]);
                            }
                            run.push(w[1]);
                        } else if run.len() >= 2 {
                            new_segments.push(std::mem::take(&mut run));
                        } else {
                            run.clear();
                        }
                    }
                    if run.len() >= 2 {
                        new_segments.push(run);
                    }
                }
            }
        }
    }

    for coords in new_segments {
        if let Some(segment) = Segment::new(ObjectKind::SankmarkGrans, coords, crate::model::Tags::new()) {
            ctx.add_segment(segment);
        }
    }
}

/// (ii) Segment splitting: for each wetland patch and each boundary segment
/// whose vertex-set overlap with the patch is partial, walk the segment
/// alternating inside/outside runs and re-emit each run as a new segment,
/// replacing the original.
pub fn split_segments(ctx: &mut Context) {
    let patch_vertex_sets: Vec<HashSet<Coordinate>> = ctx
        .features
        .iter()
        .flat_map(|f| f.patches().iter().map(|p| p.ring.iter().copied().collect::<HashSet<_>>()))
        .collect();

    let mut to_retire = Vec::new();
    let mut to_add = Vec::new();

    for (sid, segment) in ctx.segments.iter().enumerate() {
        if !is_wetland_boundary_segment(ctx, SegmentId(sid)) {
            continue;
        }
        let coord_set = segment.coord_set();

        for patch_vertices in &patch_vertex_sets {
            let overlap = coord_set.iter().filter(|c| patch_vertices.contains(*c)).count();
            if overlap == 0 || overlap == coord_set.len() {
                continue;
            }
            let endpoints_only = overlap == 2
                && patch_vertices.contains(&segment.first())
                && patch_vertices.contains(&segment.last());
            if endpoints_only {
                continue;
            }

            let mut runs: Vec<Vec<Coordinate>> = Vec::new();
            let mut current: Vec<Coordinate> = vec![segment.coords[0]];
            let mut current_inside = patch_vertices.contains(&segment.coords[0]);
            for &c in &segment.coords[1..] {
                let inside = patch_vertices.contains(&c);
                if inside == current_inside {
                    current.push(c);
                } else {
                    current.push(c);
                    runs.push(std::mem::take(&mut current));
                    current = vec![c];
                    current_inside = inside;
                }
            }
            runs.push(current);

            to_retire.push(sid);
            for run in runs {
                if run.len() >= 2 {
                    to_add.push((segment.object_kind.clone(), run));
                }
            }
            break;
        }
    }

    for sid in to_retire {
        ctx.segment_mut(SegmentId(sid)).used = 0;
    }
    for (kind, coords) in to_add {
        if let Some(segment) = Segment::new(kind, coords, crate::model::Tags::new()) {
            ctx.add_segment(segment);
        }
    }
}

/// (iii) Missing-node insertion: for a segment nearly a subset of a wetland
/// patch (missing fraction <= half its length), insert any missing coordinate
/// within 0.2 m of the patch polyline between its two surrounding vertices.
pub fn insert_missing_nodes(ctx: &mut Context) {
    let boundary_segments: Vec<Vec<Coordinate>> = ctx
        .segments
        .iter()
        .filter(|s| s.object_kind.is_wetland_boundary(true))
        .map(|s| s.coords.clone())
        .collect();

    for feature in &mut ctx.features {
        let FeatureGeometry::Polygon(patches) = &mut feature.geometry else { continue };
        for patch in patches {
            for segment_coords in &boundary_segments {
                let patch_vertices: HashSet<Coordinate> = patch.ring.iter().copied().collect();
                let missing: Vec<Coordinate> =
                    segment_coords.iter().copied().filter(|c| !patch_vertices.contains(c)).collect();
                if missing.is_empty() || missing.len() * 2 > segment_coords.len() {
                    continue;
                }

                for m in missing {
                    let (dist, _) = geometry::shortest_distance(m, &patch.ring);
                    if dist < SNAP_TOLERANCE_M {
                        insert_at_closest_position(&mut patch.ring, m);
                    }
                }
            }
        }
    }
}

fn insert_at_closest_position(ring: &mut Vec<Coordinate>, m: Coordinate) {
    let mut best = (f64::INFINITY, 0usize);
    for (i, w) in ring.windows(2).enumerate() {
        let (d, _) = geometry::segment_distance(m, w[0], w[1], false);
        if d < best.0 {
            best = (d, i);
        }
    }
    ring.insert(best.1 + 1, m);
}

/// (iv) Surplus-node removal: for a patch fully containing a segment, drop
/// patch vertices strictly between the segment's endpoints that aren't on the
/// segment and lie within 0.2 m of it, keeping the ring closed.
pub fn remove_surplus_nodes(ctx: &mut Context) {
    for feature in &mut ctx.features {
        let FeatureGeometry::Polygon(patches) = &mut feature.geometry else { continue };
        for patch in patches {
            for segment in &ctx.segments {
                if !segment.object_kind.is_wetland_boundary(true) {
                    continue;
                }
                let seg_set = segment.coord_set();
                let fully_contained = seg_set.iter().all(|c| patch.ring.contains(c));
                if !fully_contained || seg_set.len() < 2 {
                    continue;
                }
                let Some(start) = patch.ring.iter().position(|c| *c == segment.first()) else { continue };
                let Some(end) = patch.ring.iter().position(|c| *c == segment.last()) else { continue };
                if start == end {
                    continue;
                }

                let (lo, hi) = (start.min(end), start.max(end));
                let surplus: Vec<usize> = (lo + 1..hi)
                    .filter(|&i| {
                        if seg_set.contains(&patch.ring[i]) {
                            return false;
                        }
                        geometry::shortest_distance(patch.ring[i], &segment.coords).0 < SNAP_TOLERANCE_M
                    })
                    .collect();

                for &i in surplus.iter().rev() {
                    patch.ring.remove(i);
                }
            }
            if patch.ring.first() != patch.ring.last() {
                if let Some(&first) = patch.ring.first() {
                    patch.ring.push(first);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{Feature, Tags};

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat)
    }

    #[test]
    fn overlap_to_segments_extracts_shared_edge() {
        let mut ctx = Context::new(Config::default());
        let sjo_ring = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0), c(0.0, 0.0)];
        let sank_ring = vec![c(1.0, 0.0), c(2.0, 0.0), c(2.0, 1.0), c(1.0, 1.0), c(1.0, 0.0)];

        let sjo = Feature::new(
            ObjectKind::Sjo,
            FeatureGeometry::Polygon(vec![crate::model::Patch::new(sjo_ring)]),
            Tags::new(),
        );
        let sank = Feature::new(
            ObjectKind::Sankmark,
            FeatureGeometry::Polygon(vec![crate::model::Patch::new(sank_ring)]),
            Tags::new(),
        );
        ctx.add_feature(sjo);
        ctx.add_feature(sank);

        overlap_to_segments(&mut ctx);
        assert_eq!(ctx.segments.len(), 1);
        assert_eq!(ctx.segments[0].coords.len(), 2);
    }

    #[test]
    fn insert_missing_nodes_writes_back_into_the_patch_ring() {
        let mut ctx = Context::new(Config::default());
        let ring = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0), c(0.0, 0.0)];
        let feature = Feature::new(
            ObjectKind::Sankmark,
            FeatureGeometry::Polygon(vec![crate::model::Patch::new(ring)]),
            Tags::new(),
        );
        ctx.add_feature(feature);

        // A boundary segment that runs along the bottom edge but also touches
        // a point just off it; only the off-edge point is "missing" from the
        // patch ring and should get inserted.
        let missing_point = c(0.5, 0.0000001);
        let seg = Segment::new(
            ObjectKind::SankmarkGrans,
            vec![c(0.0, 0.0), missing_point, c(1.0, 0.0)],
            Tags::new(),
        )
        .unwrap();
        ctx.add_segment(seg);

        insert_missing_nodes(&mut ctx);

        let FeatureGeometry::Polygon(patches) = &ctx.features[0].geometry else { unreachable!() };
        assert!(patches[0].ring.contains(&missing_point));
    }
}
