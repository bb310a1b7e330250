//! Simplifier (§4.L): partitions every used segment/line at node-set
//! coordinates, simplifies each partition independently, then drops
//! degenerate patches and empty features.

use crate::geometry;
use crate::model::{Context, Coordinate, FeatureGeometry};

const EPSILON_M: f64 = 0.2;

/// Split `coords` into maximal runs whose only node-set members are the two
/// endpoints of each run.
fn partition_at_nodes(ctx: &Context, coords: &[Coordinate]) -> Vec<Vec<Coordinate>> {
    if coords.len() < 2 {
        return vec![coords.to_vec()];
    }
    let mut partitions = Vec::new();
    let mut current = vec![coords[0]];
    for &c in &coords[1..] {
        current.push(c);
        if ctx.nodes.contains(&c) {
            partitions.push(std::mem::take(&mut current));
            current.push(c);
        }
    }
    if current.len() > 1 {
        partitions.push(current);
    }
    partitions
}

fn simplify_coords(ctx: &Context, coords: &[Coordinate]) -> Vec<Coordinate> {
    let closed = coords.len() >= 4 && coords.first() == coords.last();
    if closed && coords.len() <= 4 {
        return coords.to_vec();
    }

    let partitions = partition_at_nodes(ctx, coords);
    let mut out: Vec<Coordinate> = Vec::new();
    for partition in partitions {
        let simplified = geometry::simplify(&partition, EPSILON_M);
        if out.last() == simplified.first() {
            out.extend(simplified.into_iter().skip(1));
        } else {
            out.extend(simplified);
        }
    }
    out
}

/// Simplify every used segment and LineString feature in place.
pub fn simplify_all(ctx: &mut Context) {
    let simplify_enabled = ctx.config.simplify;
    if !simplify_enabled {
        return;
    }

    let updated: Vec<(usize, Vec<Coordinate>)> = ctx
        .segments
        .iter()
        .enumerate()
        .filter(|(_, s)| s.used > 0)
        .map(|(i, s)| (i, simplify_coords(ctx, &s.coords)))
        .collect();
    for (i, coords) in updated {
        ctx.segments[i].coords = coords;
        ctx.segments[i].recompute_bbox();
    }

    for i in 0..ctx.features.len() {
        if let FeatureGeometry::LineString(line) = &ctx.features[i].geometry {
            let simplified = simplify_coords(ctx, line);
            ctx.features[i].geometry = FeatureGeometry::LineString(simplified);
        }
    }

    drop_degenerate_patches(ctx);
}

/// After simplification, drop polygon patches whose exactly two members
/// collapse, combined, to just two distinct coordinates — a degenerate
/// back-and-forth ring — decrementing `used` on both member segments so they
/// stop being emitted, and drop any feature left with zero patches.
fn drop_degenerate_patches(ctx: &mut Context) {
    let mut patches_to_drop: Vec<(usize, usize)> = Vec::new();
    let mut segments_to_decrement: Vec<usize> = Vec::new();

    for (fi, feature) in ctx.features.iter().enumerate() {
        let FeatureGeometry::Polygon(patches) = &feature.geometry else { continue };
        for (pi, patch) in patches.iter().enumerate() {
            if patch.members.len() != 2 {
                continue;
            }
            let mut distinct: hashbrown::HashSet<Coordinate> = hashbrown::HashSet::new();
            for member in &patch.members {
                distinct.extend(ctx.segment(member.segment).coords.iter().copied());
            }
            if distinct.len() == 2 {
                patches_to_drop.push((fi, pi));
                for member in &patch.members {
                    segments_to_decrement.push(member.segment.0);
                }
            }
        }
    }

    for sid in segments_to_decrement {
        ctx.segments[sid].used = ctx.segments[sid].used.saturating_sub(1);
    }

    let mut by_feature: hashbrown::HashMap<usize, Vec<usize>> = hashbrown::HashMap::new();
    for (fi, pi) in patches_to_drop {
        by_feature.entry(fi).or_default().push(pi);
    }

    let mut to_delete = hashbrown::HashSet::new();
    for (fi, mut patch_indices) in by_feature {
        patch_indices.sort_unstable_by(|a, b| b.cmp(a));
        if let FeatureGeometry::Polygon(patches) = &mut ctx.features[fi].geometry {
            for pi in patch_indices {
                patches.remove(pi);
            }
            if patches.is_empty() {
                to_delete.insert(crate::model::FeatureId(fi));
            }
        }
    }
    ctx.delete_features(&to_delete);
}
