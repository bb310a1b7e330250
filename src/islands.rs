//! Island identifier (§4.I): materializes islands from inner water rings and
//! from closed cycles of shore segments.

use hashbrown::HashSet;

use crate::geometry;
use crate::model::{Context, Coordinate, Feature, FeatureGeometry, Patch, Tags};
use crate::tags::ObjectKind;

fn place_tag(area_m2: f64, island_size: f64) -> &'static str {
    if area_m2.abs() >= island_size {
        "island"
    } else {
        "islet"
    }
}

const WATER_KINDS: [ObjectKind; 4] = [ObjectKind::Sjo, ObjectKind::AnlagtVatten, ObjectKind::VattendragYta, ObjectKind::Hav];

/// (1) Inner rings of water: each inner patch of a water feature becomes (or
/// augments) an island/islet.
pub fn inner_ring_islands(ctx: &mut Context) {
    let island_size = ctx.config.island_size;

    let water_feature_indices: Vec<usize> = ctx
        .features
        .iter()
        .enumerate()
        .filter(|(_, f)| WATER_KINDS.contains(&f.object_kind))
        .map(|(i, _)| i)
        .collect();

    let mut to_materialize = Vec::new();
    let mut reuse_tags: Vec<(usize, &'static str)> = Vec::new();

    for &fi in &water_feature_indices {
        let patch_count = ctx.features[fi].patches().len();
        for pi in 1..patch_count {
            let ring = ctx.features[fi].patches()[pi].ring.clone();
            let area = geometry::polygon_area(&ring);
            let tag = place_tag(area, island_size);

            let exact_match = ctx.features.iter().enumerate().find(|(other_fi, other)| {
                *other_fi != fi && !other.object_kind.is_wetland() && other.patches().iter().any(|p| p.ring == ring)
            });

            match exact_match {
                Some((other_fi, _)) => reuse_tags.push((other_fi, tag)),
                None => to_materialize.push((ring, tag)),
            }
        }
    }

    for (other_fi, tag) in reuse_tags {
        ctx.features[other_fi].tags.insert("place".into(), tag.into());
    }

    for (ring, tag) in to_materialize {
        let mut tags = Tags::new();
        tags.insert("place".into(), tag.into());
        let feature = Feature::new(ObjectKind::Island, FeatureGeometry::Polygon(vec![Patch::new(ring)]), tags);
        ctx.add_feature(feature);
    }
}

/// (2) Cycles of shore segments: two passes (coastline-only, then any
/// lake/river/sea combination) walk unclosed shore chains forward; a closed,
/// positively-wound chain is an island.
pub fn shore_cycle_islands(ctx: &mut Context) {
    shore_cycle_pass(ctx, true);
    shore_cycle_pass(ctx, false);
}

fn shore_cycle_pass(ctx: &mut Context, coastline_only: bool) {
    let island_size = ctx.config.island_size;

    let candidate_ids: Vec<usize> = (0..ctx.segments.len())
        .filter(|&i| {
            let kind = &ctx.segments[i].object_kind;
            if coastline_only {
                matches!(kind, ObjectKind::StrandlinjeHav | ObjectKind::StangningMotHav)
            } else {
                matches!(
                    kind,
                    ObjectKind::StrandlinjeHav
                        | ObjectKind::StangningMotHav
                        | ObjectKind::StrandlinjeSjo
                        | ObjectKind::SankmarkGrans
                )
            }
        })
        .collect();

    let mut consumed: HashSet<usize> = HashSet::new();
    let mut new_islands = Vec::new();

    for &start in &candidate_ids {
        if consumed.contains(&start) {
            continue;
        }
        let start_coord = ctx.segments[start].first();
        let mut chain = vec![start];
        let mut tail = ctx.segments[start].last();
        consumed.insert(start);

        while tail != start_coord {
            let next = candidate_ids
                .iter()
                .copied()
                .find(|&sid| !consumed.contains(&sid) && ctx.segments[sid].first() == tail);
            match next {
                Some(sid) => {
                    consumed.insert(sid);
                    chain.push(sid);
                    tail = ctx.segments[sid].last();
                }
                None => break,
            }
        }

        if tail != start_coord {
            continue;
        }

        let mut ring: Vec<Coordinate> = Vec::new();
        for &sid in &chain {
            let coords = &ctx.segments[sid].coords;
            if ring.last() == coords.first() {
                ring.extend(coords[1..].iter().copied());
            } else {
                ring.extend(coords.iter().copied());
            }
        }
        let area = geometry::polygon_area(&ring);
        if area <= 0.0 {
            continue; // negative winding is a lake, not an island
        }
        new_islands.push((ring, place_tag(area, island_size)));
    }

    for (ring, tag) in new_islands {
        let mut tags = Tags::new();
        tags.insert("place".into(), tag.into());
        let feature = Feature::new(ObjectKind::Island, FeatureGeometry::Polygon(vec![Patch::new(ring)]), tags);
        ctx.add_feature(feature);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat)
    }

    #[test]
    fn boundary_area_of_exactly_100000_is_an_island() {
        assert_eq!(place_tag(100_000.0, 100_000.0), "island");
        assert_eq!(place_tag(99_999.0, 100_000.0), "islet");
    }

    #[test]
    fn inner_ring_materializes_a_new_island_feature() {
        let mut ctx = Context::new(Config::default());
        let outer = vec![c(0.0, 0.0), c(10.0, 0.0), c(10.0, 10.0), c(0.0, 10.0), c(0.0, 0.0)];
        let inner = vec![c(1.0, 1.0), c(1.0, 2.0), c(2.0, 2.0), c(2.0, 1.0), c(1.0, 1.0)];
        let feature = Feature::new(
            ObjectKind::Sjo,
            FeatureGeometry::Polygon(vec![Patch::new(outer), Patch::new(inner)]),
            Tags::new(),
        );
        ctx.add_feature(feature);

        inner_ring_islands(&mut ctx);

        assert_eq!(ctx.features.len(), 2);
        assert_eq!(ctx.features[1].object_kind, ObjectKind::Island);
    }
}
