//! Pipeline-scoped context (§9 "Global mutable state"): the four collections
//! every phase reads and writes, bundled into one struct instead of process
//! globals.

use hashbrown::{HashMap, HashSet};

use crate::config::Config;
use crate::model::{Coordinate, Feature, FeatureId, PlaceName, Segment, SegmentId};

/// The global set of coordinates that are semantically shared: endpoints of any
/// used segment, endpoints of any emitted line, explicit intersections (§3 Node
/// set). Write-only after §4.K begins (§5).
#[derive(Default, Debug)]
pub struct NodeSet {
    coords: HashSet<Coordinate>,
}

impl NodeSet {
    pub fn insert(&mut self, c: Coordinate) -> bool {
        self.coords.insert(c)
    }

    pub fn contains(&self, c: &Coordinate) -> bool {
        self.coords.contains(c)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coordinate> {
        self.coords.iter()
    }
}

/// Accumulated run statistics (§"SUPPLEMENT Run summary"): source dates by year,
/// unknown object kinds hit during ingestion, and simple per-phase counters.
#[derive(Default, Debug)]
pub struct RunStats {
    pub dates_by_year: std::collections::BTreeMap<u16, u32>,
    pub missing_tags: HashSet<String>,
    pub repaired_polygons: u32,
    pub disconnected_combines: u32,
}

impl RunStats {
    pub fn record_date(&mut self, year: u16) {
        *self.dates_by_year.entry(year).or_insert(0) += 1;
    }

    pub fn record_missing_tag(&mut self, kind: &str) {
        self.missing_tags.insert(kind.to_string());
    }

    pub fn log_summary(&self) {
        log::info!("=== Run summary ===");
        for (year, count) in &self.dates_by_year {
            log::info!("  source date {year}: {count} features");
        }
        if !self.missing_tags.is_empty() {
            log::warn!("  unknown object kinds: {:?}", self.missing_tags);
        }
        if self.repaired_polygons > 0 {
            log::warn!("  repaired polygons: {}", self.repaired_polygons);
        }
        if self.disconnected_combines > 0 {
            log::warn!("  disconnected combines: {}", self.disconnected_combines);
        }
    }
}

pub struct Context {
    pub features: Vec<Feature>,
    pub segments: Vec<Segment>,
    pub nodes: NodeSet,
    pub place_names: Vec<PlaceName>,
    pub config: Config,
    pub stats: RunStats,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self {
            features: Vec::new(),
            segments: Vec::new(),
            nodes: NodeSet::default(),
            place_names: Vec::new(),
            config,
            stats: RunStats::default(),
        }
    }

    pub fn add_segment(&mut self, segment: Segment) -> SegmentId {
        let id = SegmentId(self.segments.len());
        self.segments.push(segment);
        id
    }

    pub fn add_feature(&mut self, feature: Feature) -> FeatureId {
        let id = FeatureId(self.features.len());
        self.features.push(feature);
        id
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.0]
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segments[id.0]
    }

    pub fn feature(&self, id: FeatureId) -> &Feature {
        &self.features[id.0]
    }

    pub fn feature_mut(&mut self, id: FeatureId) -> &mut Feature {
        &mut self.features[id.0]
    }

    /// Recompute every segment's `parents` set from the current feature/patch
    /// member lists (§9: recomputed at the start of §4.H and again at §4.K).
    pub fn recompute_parents(&mut self) {
        for segment in &mut self.segments {
            segment.parents.clear();
        }
        for (fi, feature) in self.features.iter().enumerate() {
            for (pi, patch) in feature.patches().iter().enumerate() {
                for member in &patch.members {
                    self.segments[member.segment.0].parents.insert((FeatureId(fi), pi));
                }
            }
        }
    }

    /// Delete features by index in one sweep, remapping every `FeatureId`
    /// referenced from `Segment::parents` (§5 "Stable indices under deletion").
    /// Segments themselves are never removed here.
    pub fn delete_features(&mut self, to_delete: &HashSet<FeatureId>) {
        if to_delete.is_empty() {
            return;
        }
        let mut remap: HashMap<usize, usize> = HashMap::new();
        let mut kept = Vec::with_capacity(self.features.len());
        for (old_idx, feature) in self.features.drain(..).enumerate() {
            if to_delete.contains(&FeatureId(old_idx)) {
                continue;
            }
            remap.insert(old_idx, kept.len());
            kept.push(feature);
        }
        self.features = kept;

        for segment in &mut self.segments {
            segment.parents = segment
                .parents
                .drain()
                .filter_map(|(fid, patch_idx)| remap.get(&fid.0).map(|&new_idx| (FeatureId(new_idx), patch_idx)))
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, FeatureGeometry, Patch, SegmentRef};
    use crate::tags::ObjectKind;

    #[test]
    fn delete_features_remaps_segment_parents() {
        let mut ctx = Context::new(Config::default());
        let c0 = Coordinate::new(0.0, 0.0);
        let c1 = Coordinate::new(1.0, 0.0);
        let seg = Segment::new(ObjectKind::Gridline, vec![c0, c1], crate::model::Tags::new()).unwrap();
        let seg_id = ctx.add_segment(seg);

        let mut patch = Patch::new(vec![c0, c1, c0]);
        patch.members.push(SegmentRef { segment: seg_id, forward: true });
        let f0 = Feature::new(ObjectKind::Sjo, FeatureGeometry::Polygon(vec![patch.clone()]), crate::model::Tags::new());
        let f1 = Feature::new(ObjectKind::Sjo, FeatureGeometry::Polygon(vec![patch]), crate::model::Tags::new());
        ctx.add_feature(f0);
        let keep_id = ctx.add_feature(f1);

        ctx.recompute_parents();
        assert_eq!(ctx.segment(seg_id).parents.len(), 2);

        let mut to_delete = HashSet::new();
        to_delete.insert(FeatureId(0));
        ctx.delete_features(&to_delete);

        assert_eq!(ctx.features.len(), 1);
        assert!(ctx.segment(seg_id).parents.contains(&(FeatureId(0), 0)));
        let _ = keep_id;
    }
}
