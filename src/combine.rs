//! Feature combiner & segment combiner (§4.H): merges features split across a
//! grid line, then coalesces consecutive same-provenance segments within a
//! patch.

use hashbrown::HashSet;

use crate::grid;
use crate::model::{Context, FeatureId, SegmentId};
use crate::tags::ObjectKind;

const WOODLAND_MEMBER_THRESHOLD: usize = 10;

/// Combine across grid (§4.H): for each `Gridline` segment with exactly two
/// distinct parent features of the same kind, merge them unless both are
/// woodland exceeding the member threshold, or the grid line crosses a
/// grid-crossing point.
pub fn combine_across_grid(ctx: &mut Context) {
    ctx.recompute_parents();
    let grid_size = ctx.config.grid_size();

    let grid_segment_ids: Vec<usize> = (0..ctx.segments.len())
        .filter(|&i| ctx.segments[i].object_kind == ObjectKind::Gridline)
        .collect();

    for sid in grid_segment_ids {
        let parent_features: HashSet<FeatureId> = ctx.segments[sid].parents.iter().map(|(fid, _)| *fid).collect();
        if parent_features.len() != 2 {
            continue;
        }
        let mut iter = parent_features.into_iter();
        let (a, b) = (iter.next().unwrap(), iter.next().unwrap());
        if ctx.features[a.0].object_kind != ctx.features[b.0].object_kind {
            continue;
        }

        let a_members: usize = ctx.features[a.0].patches().iter().map(|p| p.members.len()).sum();
        let b_members: usize = ctx.features[b.0].patches().iter().map(|p| p.members.len()).sum();
        let both_large_woodland = ctx.features[a.0].object_kind.is_woodland()
            && a_members > WOODLAND_MEMBER_THRESHOLD
            && b_members > WOODLAND_MEMBER_THRESHOLD;
        if both_large_woodland {
            continue;
        }

        if crosses_grid_crossing(ctx, SegmentId(sid), grid_size) {
            continue;
        }

        merge_features(ctx, a, b, SegmentId(sid));
    }
}

fn crosses_grid_crossing(ctx: &Context, sid: SegmentId, grid_size: f64) -> bool {
    ctx.segment(sid)
        .coords
        .iter()
        .any(|c| grid::is_grid_crossing((c.lon, c.lat), grid_size))
}

fn merge_features(ctx: &mut Context, a: FeatureId, b: FeatureId, shared: SegmentId) {
    let (keep, drop) = {
        let a_members: usize = ctx.features[a.0].patches().iter().map(|p| p.members.len()).sum();
        let b_members: usize = ctx.features[b.0].patches().iter().map(|p| p.members.len()).sum();
        if a_members >= b_members {
            (a, b)
        } else {
            (b, a)
        }
    };

    let dropped_patches = std::mem::take(ctx.features[drop.0].patches_mut());
    ctx.features[keep.0].patches_mut().extend(dropped_patches);

    let seg = ctx.segment_mut(shared);
    seg.used = seg.used.saturating_sub(2);

    fix_member_order(ctx, keep);

    let mut to_delete = HashSet::new();
    to_delete.insert(drop);
    ctx.delete_features(&to_delete);
    ctx.recompute_parents();
}

/// Reconstruct proper outer/inner rings by walking members end-to-end, and
/// sort patches by absolute area descending.
pub fn fix_member_order(ctx: &mut Context, fid: FeatureId) {
    let patch_count = ctx.features[fid.0].patches().len();
    for pidx in 0..patch_count {
        if ctx.features[fid.0].patches()[pidx].members.is_empty() {
            continue;
        }
        let mut remaining = ctx.features[fid.0].patches()[pidx].members.clone();
        let mut ordered = vec![remaining.remove(0)];

        while !remaining.is_empty() {
            let tail = *ctx_segment_last(ctx, ordered.last().unwrap());
            let next_pos = remaining.iter().position(|m| *ctx_segment_first(ctx, m) == tail);
            match next_pos {
                Some(pos) => ordered.push(remaining.remove(pos)),
                None => {
                    ctx.stats.disconnected_combines += 1;
                    ordered.push(remaining.remove(0));
                }
            }
        }

        let ring: Vec<_> = {
            let mut ring = Vec::new();
            for m in &ordered {
                let seg = ctx.segment(m.segment);
                let coords: Vec<_> = if m.forward { seg.coords.clone() } else { seg.coords.iter().rev().copied().collect() };
                if ring.last() == coords.first() {
                    ring.extend(coords.into_iter().skip(1));
                } else {
                    ring.extend(coords);
                }
            }
            ring
        };

        let patch = &mut ctx.features[fid.0].patches_mut()[pidx];
        patch.members = ordered;
        patch.ring = ring;
    }

    ctx.features[fid.0]
        .patches_mut()
        .sort_by(|p, q| q.area().abs().partial_cmp(&p.area().abs()).unwrap());
}

fn ctx_segment_first<'a>(ctx: &'a Context, m: &crate::model::SegmentRef) -> &'a crate::model::Coordinate {
    let seg = ctx.segment(m.segment);
    if m.forward {
        &seg.coords[0]
    } else {
        seg.coords.last().unwrap()
    }
}

fn ctx_segment_last<'a>(ctx: &'a Context, m: &crate::model::SegmentRef) -> &'a crate::model::Coordinate {
    let seg = ctx.segment(m.segment);
    if m.forward {
        seg.coords.last().unwrap()
    } else {
        &seg.coords[0]
    }
}

/// Combine consecutive segments (§4.H): within each patch, coalesce runs of
/// segments sharing the same parent set, object kind, and tags that are
/// end-to-end connected.
pub fn combine_consecutive_segments(ctx: &mut Context) {
    ctx.recompute_parents();

    for fi in 0..ctx.features.len() {
        let patch_count = ctx.features[fi].patches().len();
        for pi in 0..patch_count {
            combine_consecutive_in_patch(ctx, fi, pi);
        }
    }
}

fn combine_consecutive_in_patch(ctx: &mut Context, fi: usize, pi: usize) {
    let members = ctx.features[fi].patches()[pi].members.clone();
    if members.len() < 2 {
        return;
    }

    let mut new_members = Vec::new();
    let mut i = 0;
    while i < members.len() {
        let mut run = vec![members[i]];
        let mut j = i + 1;
        while j < members.len() && can_coalesce(ctx, &members[j - 1], &members[j]) {
            run.push(members[j]);
            j += 1;
        }

        if run.len() > 1 {
            let merged_coords = concat_run(ctx, &run);
            let seg0 = run[0].segment;
            ctx.segment_mut(seg0).coords = merged_coords;
            ctx.segment_mut(seg0).recompute_bbox();
            for m in &run[1..] {
                ctx.segment_mut(m.segment).used = 0;
            }
            new_members.push(crate::model::SegmentRef { segment: seg0, forward: true });
        } else {
            new_members.push(run[0]);
        }
        i = j;
    }

    ctx.features[fi].patches_mut()[pi].members = new_members;
}

fn can_coalesce(ctx: &Context, a: &crate::model::SegmentRef, b: &crate::model::SegmentRef) -> bool {
    let sa = ctx.segment(a.segment);
    let sb = ctx.segment(b.segment);
    if sa.object_kind != sb.object_kind || sa.tags != sb.tags {
        return false;
    }
    if sa.parents != sb.parents {
        return false;
    }
    ctx_segment_last(ctx, a) == ctx_segment_first(ctx, b)
}

fn concat_run(ctx: &Context, run: &[crate::model::SegmentRef]) -> Vec<crate::model::Coordinate> {
    let mut out = Vec::new();
    for m in run {
        let seg = ctx.segment(m.segment);
        let coords: Vec<_> = if m.forward { seg.coords.clone() } else { seg.coords.iter().rev().copied().collect() };
        if out.last() == coords.first() {
            out.extend(coords.into_iter().skip(1));
        } else {
            out.extend(coords);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{Feature, FeatureGeometry, Patch, SegmentRef, Tags};
    use crate::model::Segment;

    fn c(lon: f64, lat: f64) -> crate::model::Coordinate {
        crate::model::Coordinate::new(lon, lat)
    }

    #[test]
    fn combine_consecutive_merges_matching_adjacent_segments() {
        let mut ctx = Context::new(Config::default());
        let s1 = Segment::new(ObjectKind::StrandlinjeSjo, vec![c(0.0, 0.0), c(1.0, 0.0)], Tags::new()).unwrap();
        let s2 = Segment::new(ObjectKind::StrandlinjeSjo, vec![c(1.0, 0.0), c(2.0, 0.0)], Tags::new()).unwrap();
        let id1 = ctx.add_segment(s1);
        let id2 = ctx.add_segment(s2);

        let mut patch = Patch::new(vec![c(0.0, 0.0), c(1.0, 0.0), c(2.0, 0.0)]);
        patch.members = vec![
            SegmentRef { segment: id1, forward: true },
            SegmentRef { segment: id2, forward: true },
        ];
        let feature = Feature::new(ObjectKind::Sjo, FeatureGeometry::Polygon(vec![patch]), Tags::new());
        ctx.add_feature(feature);

        combine_consecutive_segments(&mut ctx);

        assert_eq!(ctx.features[0].patches()[0].members.len(), 1);
        assert_eq!(ctx.segment(id1).coords.len(), 3);
        assert_eq!(ctx.segment(id2).used, 0);
    }
}
