//! River assembler (§4.F): chains `Vattendrag` LineStrings sharing an
//! identifier end-to-end, then upgrades `stream` to `river` using coarser
//! same-municipality scales.

use hashbrown::HashSet;

use crate::model::{Context, Coordinate, FeatureGeometry};
use crate::tags::ObjectKind;

fn endpoints(feature_index: usize, ctx: &Context) -> Option<(Coordinate, Coordinate)> {
    match &ctx.features[feature_index].geometry {
        FeatureGeometry::LineString(line) if line.len() >= 2 => Some((line[0], *line.last().unwrap())),
        _ => None,
    }
}

fn has_name(ctx: &Context, feature_index: usize) -> bool {
    ctx.features[feature_index].tags.contains_key("name")
}

/// (1) Chain by identifier: repeatedly pick an unclaimed river and extend it by
/// any river sharing `vattendragsid`, the same `waterway` tag, the same
/// has-name predicate, whose endpoints chain end-to-end.
pub fn chain_by_identifier(ctx: &mut Context) {
    let river_indices: Vec<usize> = ctx
        .features
        .iter()
        .enumerate()
        .filter(|(_, f)| f.object_kind == ObjectKind::Vattendrag)
        .map(|(i, _)| i)
        .collect();

    let mut claimed: HashSet<usize> = HashSet::new();
    let mut chains: Vec<Vec<usize>> = Vec::new();

    for &seed in &river_indices {
        if claimed.contains(&seed) {
            continue;
        }
        let mut chain = vec![seed];
        claimed.insert(seed);

        loop {
            let Some(&tail) = chain.last() else { break };
            let Some((_, tail_end)) = endpoints(tail, ctx) else { break };
            let tail_id = ctx.features[tail].tags.get("vattendragsid").cloned();
            let tail_waterway = ctx.features[tail].tags.get("waterway").cloned();
            let tail_named = has_name(ctx, tail);

            let next = river_indices.iter().copied().find(|&candidate| {
                if claimed.contains(&candidate) {
                    return false;
                }
                if ctx.features[candidate].tags.get("vattendragsid") != tail_id.as_ref() {
                    return false;
                }
                if ctx.features[candidate].tags.get("waterway") != tail_waterway.as_ref() {
                    return false;
                }
                if has_name(ctx, candidate) != tail_named {
                    return false;
                }
                match endpoints(candidate, ctx) {
                    Some((start, _)) => start == tail_end,
                    None => false,
                }
            });

            match next {
                Some(n) => {
                    claimed.insert(n);
                    chain.push(n);
                }
                None => break,
            }
        }
        chains.push(chain);
    }

    for chain in &chains {
        if chain.len() < 2 {
            continue;
        }
        let mut combined_line = match &ctx.features[chain[0]].geometry {
            FeatureGeometry::LineString(line) => line.clone(),
            _ => continue,
        };
        for &next in &chain[1..] {
            if let FeatureGeometry::LineString(line) = &ctx.features[next].geometry {
                combined_line.extend_from_slice(&line[1..]);
            }
        }
        ctx.features[chain[0]].geometry = FeatureGeometry::LineString(combined_line);
        for &dead in &chain[1..] {
            ctx.features[dead].extras.insert("merged_into".into(), "true".into());
        }
    }

    let dead: HashSet<usize> = chains.iter().flat_map(|c| c[1..].iter().copied()).collect();
    if !dead.is_empty() {
        let ids: hashbrown::HashSet<crate::model::FeatureId> = dead.into_iter().map(crate::model::FeatureId).collect();
        ctx.delete_features(&ids);
    }
}

/// (2) Cross-scale upgrade: given the set of identifiers with size-class >= 2
/// from the coarser-scale layers, upgrade any current `waterway=stream`
/// feature sharing that identifier to `waterway=river`.
pub fn upgrade_cross_scale(ctx: &mut Context, river_worthy_ids: &HashSet<String>) {
    for feature in &mut ctx.features {
        if feature.tags.get("waterway").map(String::as_str) != Some("stream") {
            continue;
        }
        let Some(id) = feature.tags.get("vattendragsid") else { continue };
        if river_worthy_ids.contains(id) {
            feature.tags.insert("waterway".into(), "river".into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{Feature, Tags};

    fn river(id: &str, from: (f64, f64), to: (f64, f64)) -> Feature {
        let mut tags = Tags::new();
        tags.insert("vattendragsid".into(), id.into());
        tags.insert("waterway".into(), "stream".into());
        let line = vec![Coordinate::new(from.0, from.1), Coordinate::new(to.0, to.1)];
        Feature::new(ObjectKind::Vattendrag, FeatureGeometry::LineString(line), tags)
    }

    #[test]
    fn chains_two_segments_sharing_an_identifier() {
        let mut ctx = Context::new(Config::default());
        ctx.add_feature(river("42", (0.0, 0.0), (1.0, 0.0)));
        ctx.add_feature(river("42", (1.0, 0.0), (2.0, 0.0)));

        chain_by_identifier(&mut ctx);

        assert_eq!(ctx.features.len(), 1);
        if let FeatureGeometry::LineString(line) = &ctx.features[0].geometry {
            assert_eq!(line.len(), 3);
        } else {
            panic!("expected a LineString");
        }
    }

    #[test]
    fn upgrade_cross_scale_promotes_matching_streams() {
        let mut ctx = Context::new(Config::default());
        ctx.add_feature(river("42", (0.0, 0.0), (1.0, 0.0)));
        let mut ids = HashSet::new();
        ids.insert("42".to_string());
        upgrade_cross_scale(&mut ctx, &ids);
        assert_eq!(ctx.features[0].tags.get("waterway").map(String::as_str), Some("river"));
    }
}
