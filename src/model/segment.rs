//! A shared edge (§3 Segment): an ordered polyline that may be referenced by
//! several polygon patches, with a reference count and a provenance-tracking
//! parent set recomputed at the start of §4.H and again at §4.K.

use hashbrown::HashSet;

use crate::model::{BBox, Coordinate, FeatureId, Tags};
use crate::tags::ObjectKind;

#[derive(Clone, Debug)]
pub struct Segment {
    pub object_kind: ObjectKind,
    pub coords: Vec<Coordinate>,
    pub tags: Tags,
    pub extras: Tags,
    /// Reference count of (feature, patch) pairs using this segment. `0` means
    /// drop from output unless debug mode is on (§3 invariant 2).
    pub used: u32,
    pub parents: HashSet<(FeatureId, usize)>,
    bbox: BBox,
}

impl Segment {
    pub fn new(object_kind: ObjectKind, mut coords: Vec<Coordinate>, tags: Tags) -> Option<Self> {
        coords.dedup();
        if coords.len() < 2 {
            return None;
        }
        let bbox = BBox::of(&coords)?;
        Some(Self {
            object_kind,
            coords,
            tags,
            extras: Tags::new(),
            used: 0,
            parents: HashSet::new(),
            bbox,
        })
    }

    pub fn first(&self) -> Coordinate {
        self.coords[0]
    }

    pub fn last(&self) -> Coordinate {
        *self.coords.last().unwrap()
    }

    pub fn is_closed(&self) -> bool {
        self.coords.len() >= 4 && self.first() == self.last()
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    pub fn recompute_bbox(&mut self) {
        if let Some(b) = BBox::of(&self.coords) {
            self.bbox = b;
        }
    }

    pub fn reverse(&mut self) {
        self.coords.reverse();
    }

    /// Unordered endpoint pairs for every edge of the segment, used to detect
    /// whether two segments share a boundary run (§4.D, §4.E).
    pub fn connections(&self) -> HashSet<(Coordinate, Coordinate)> {
        self.coords
            .windows(2)
            .map(|w| order_pair(w[0], w[1]))
            .collect()
    }

    /// All coordinates as a set, used for the "subset of ring vertices" test in §4.G.
    pub fn coord_set(&self) -> HashSet<Coordinate> {
        self.coords.iter().copied().collect()
    }
}

pub fn order_pair(a: Coordinate, b: Coordinate) -> (Coordinate, Coordinate) {
    // Coordinate has no Ord; order by the rounded fixed-point key via string-free
    // tuple comparison on lon then lat, which is stable because equality is exact.
    if (a.lon, a.lat) <= (b.lon, b.lat) {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_segments_shorter_than_two_points() {
        let c = Coordinate::new(0.0, 0.0);
        assert!(Segment::new(ObjectKind::Gridline, vec![c, c], Tags::new()).is_none());
    }

    #[test]
    fn connections_are_order_independent() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        let seg = Segment::new(ObjectKind::Gridline, vec![a, b], Tags::new()).unwrap();
        assert!(seg.connections().contains(&order_pair(b, a)));
    }
}
