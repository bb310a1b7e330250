//! Rounded geographic coordinates with exact, hashable equality.

use std::hash::{Hash, Hasher};

/// Decimal places coordinates are rounded to at ingestion (§3 Coordinate).
pub const COORD_PRECISION: i32 = 7;
const COORD_SCALE: f64 = 10_000_000.0;

/// Meters per degree of latitude, used for the local equirectangular projection in §4.A.
pub const METERS_PER_DEGREE: f64 = (std::f64::consts::PI / 180.0) * 6_378_137.0;

/// A `(lon, lat)` pair rounded to [`COORD_PRECISION`] decimals. Equality and hashing
/// operate on the rounded fixed-point representation so that coordinates compare
/// correctly as map/set keys after repeated arithmetic (§9 "Float determinism").
#[derive(Clone, Copy, Debug)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon: round7(lon),
            lat: round7(lat),
        }
    }

    fn key(&self) -> (i64, i64) {
        (
            (self.lon * COORD_SCALE).round() as i64,
            (self.lat * COORD_SCALE).round() as i64,
        )
    }

    /// Offset this coordinate by a metric distance along lon/lat, per the original
    /// tool's `coordinate_offset`: used to break incidental intersections in §4.K.
    pub fn offset(&self, dlon_m: f64, dlat_m: f64) -> Coordinate {
        let lat = self.lat + dlat_m / METERS_PER_DEGREE;
        let lon = self.lon + dlon_m / (METERS_PER_DEGREE * self.lat.to_radians().cos());
        Coordinate::new(lon, lat)
    }
}

fn round7(v: f64) -> f64 {
    (v * COORD_SCALE).round() / COORD_SCALE
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

/// Axis-aligned bounding box in lon/lat degrees (§4.A `bbox`).
#[derive(Clone, Copy, Debug)]
pub struct BBox {
    pub min: Coordinate,
    pub max: Coordinate,
}

impl BBox {
    pub fn of(points: &[Coordinate]) -> Option<BBox> {
        let mut iter = points.iter();
        let first = *iter.next()?;
        let mut bbox = BBox { min: first, max: first };
        for &p in iter {
            bbox.min.lon = bbox.min.lon.min(p.lon);
            bbox.min.lat = bbox.min.lat.min(p.lat);
            bbox.max.lon = bbox.max.lon.max(p.lon);
            bbox.max.lat = bbox.max.lat.max(p.lat);
        }
        Some(bbox)
    }

    /// Expand by a metric offset (§4.A `bbox(points, pad_m)`), approximating degrees
    /// per meter at this box's mean latitude.
    pub fn padded(&self, pad_m: f64) -> BBox {
        if pad_m == 0.0 {
            return *self;
        }
        let lat_mean = (self.min.lat + self.max.lat) / 2.0;
        let dlat = pad_m / METERS_PER_DEGREE;
        let dlon = pad_m / (METERS_PER_DEGREE * lat_mean.to_radians().cos());
        BBox {
            min: Coordinate::new(self.min.lon - dlon, self.min.lat - dlat),
            max: Coordinate::new(self.max.lon + dlon, self.max.lat + dlat),
        }
    }

    pub fn overlaps(&self, other: &BBox) -> bool {
        self.min.lon <= other.max.lon
            && self.max.lon >= other.min.lon
            && self.min.lat <= other.max.lat
            && self.max.lat >= other.min.lat
    }

    pub fn contains_point(&self, p: Coordinate) -> bool {
        p.lon >= self.min.lon && p.lon <= self.max.lon && p.lat >= self.min.lat && p.lat <= self.max.lat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_seven_decimals() {
        let a = Coordinate::new(12.345678_90, 60.0);
        let b = Coordinate::new(12.345678_94, 60.0);
        assert_eq!(a, b);
        let c = Coordinate::new(12.345679_9, 60.0);
        assert_ne!(a, c);
    }

    #[test]
    fn bbox_overlap_is_inclusive() {
        let a = BBox {
            min: Coordinate::new(0.0, 0.0),
            max: Coordinate::new(1.0, 1.0),
        };
        let b = BBox {
            min: Coordinate::new(1.0, 1.0),
            max: Coordinate::new(2.0, 2.0),
        };
        assert!(a.overlaps(&b));
    }

    #[test]
    fn offset_moves_by_approximately_the_requested_distance() {
        let a = Coordinate::new(10.0, 60.0);
        let b = a.offset(0.0, METERS_PER_DEGREE);
        assert!((b.lat - (a.lat + 1.0)).abs() < 1e-6);
    }
}
