//! Feature (§3): a point, line, or polygon built from patches whose member
//! segment lists reconstruct each ring.

use crate::model::{BBox, Coordinate, SegmentId, Tags};
use crate::tags::ObjectKind;

/// A member segment of a patch, with the direction it's walked in (forward =
/// segment's own coordinate order).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentRef {
    pub segment: SegmentId,
    pub forward: bool,
}

/// One ring of a polygon (§"GLOSSARY: Patch"). Index 0 of `Feature::Polygon` is
/// the outer ring, later indices are holes. `ring` and `members` are kept
/// consistent until emission (§3 Polygon invariant); after combine/simplify the
/// raw ring may diverge from segment concatenation, which is accepted.
#[derive(Clone, Debug, Default)]
pub struct Patch {
    pub ring: Vec<Coordinate>,
    pub members: Vec<SegmentRef>,
}

impl Patch {
    pub fn new(ring: Vec<Coordinate>) -> Self {
        Self { ring, members: Vec::new() }
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::of(&self.ring)
    }

    pub fn area(&self) -> f64 {
        crate::geometry::polygon_area(&self.ring)
    }
}

#[derive(Clone, Debug)]
pub enum FeatureGeometry {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    /// Patch 0 is outer, the rest are holes (§3 Polygon).
    Polygon(Vec<Patch>),
}

#[derive(Clone, Debug)]
pub struct Feature {
    pub object_kind: ObjectKind,
    pub geometry: FeatureGeometry,
    pub tags: Tags,
    pub extras: Tags,
    pub osm_id: Option<i64>,
}

impl Feature {
    pub fn new(object_kind: ObjectKind, geometry: FeatureGeometry, tags: Tags) -> Self {
        Self { object_kind, geometry, tags, extras: Tags::new(), osm_id: None }
    }

    pub fn patches(&self) -> &[Patch] {
        match &self.geometry {
            FeatureGeometry::Polygon(patches) => patches,
            _ => &[],
        }
    }

    pub fn patches_mut(&mut self) -> &mut Vec<Patch> {
        match &mut self.geometry {
            FeatureGeometry::Polygon(patches) => patches,
            _ => panic!("patches_mut called on a non-polygon feature"),
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        match &self.geometry {
            FeatureGeometry::Point(p) => Some(BBox { min: *p, max: *p }),
            FeatureGeometry::LineString(line) => BBox::of(line),
            FeatureGeometry::Polygon(patches) => {
                patches.first().and_then(|p| BBox::of(&p.ring))
            }
        }
    }

    pub fn is_water(&self) -> bool {
        self.object_kind.is_water()
    }
}
