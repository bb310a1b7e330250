//! Geometry kernel (§4.A): planar-spherical distance, area, containment,
//! simplification and ring splitting. Every other component is built on top of
//! these primitives; nothing here depends on the feature/segment model.

use crate::model::coord::{Coordinate, METERS_PER_DEGREE};

/// Signed planar area of a closed ring (first == last). Negative is clockwise,
/// positive is counter-clockwise, `0.0` if the ring isn't closed.
pub fn polygon_area(ring: &[Coordinate]) -> f64 {
    if ring.len() < 2 || ring.first() != ring.last() {
        return 0.0;
    }
    let mut sum = 0.0;
    for w in ring.windows(2) {
        let (a, b) = (w[0], w[1]);
        sum += a.lon * b.lat - b.lon * a.lat;
    }
    sum / 2.0
}

/// `outer - sum(|inner|)`, or `None` if any ring is not closed.
pub fn multipolygon_area(patches: &[Vec<Coordinate>]) -> Option<f64> {
    let (outer, inners) = patches.split_first()?;
    if outer.len() < 2 || outer.first() != outer.last() {
        return None;
    }
    let mut area = polygon_area(outer).abs();
    for inner in inners {
        if inner.len() < 2 || inner.first() != inner.last() {
            return None;
        }
        area -= polygon_area(inner).abs();
    }
    Some(area)
}

/// Standard signed-area centroid of a closed ring.
pub fn polygon_centroid(ring: &[Coordinate]) -> Option<Coordinate> {
    if ring.len() < 2 || ring.first() != ring.last() {
        return None;
    }
    let area6 = polygon_area(ring) * 3.0; // 6 * signed_area / 2
    if area6.abs() < 1e-18 {
        // Degenerate ring: fall back to the vertex average.
        let n = (ring.len() - 1) as f64;
        let (sx, sy) = ring[..ring.len() - 1]
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.lon, sy + p.lat));
        return Some(Coordinate::new(sx / n, sy / n));
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for w in ring.windows(2) {
        let (a, b) = (w[0], w[1]);
        let cross = a.lon * b.lat - b.lon * a.lat;
        cx += (a.lon + b.lon) * cross;
        cy += (a.lat + b.lat) * cross;
    }
    Some(Coordinate::new(cx / area6, cy / area6))
}

/// Ray-casting point-in-polygon test, half-open on the upper edge to avoid double
/// counting vertices shared by adjacent edges.
pub fn point_in_polygon(p: Coordinate, ring: &[Coordinate]) -> bool {
    if ring.len() < 4 {
        return false;
    }
    let mut inside = false;
    let n = ring.len() - 1; // ring is closed; don't double-test the repeated vertex
    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        let crosses_y = (a.lat <= p.lat && p.lat < b.lat) || (b.lat <= p.lat && p.lat < a.lat);
        if crosses_y {
            let x_at_y = a.lon + (p.lat - a.lat) / (b.lat - a.lat) * (b.lon - a.lon);
            if p.lon < x_at_y {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// In the outer ring AND not in any inner ring (hole).
pub fn point_in_multipolygon(p: Coordinate, patches: &[Vec<Coordinate>]) -> bool {
    let Some(outer) = patches.first() else {
        return false;
    };
    if !point_in_polygon(p, outer) {
        return false;
    }
    !patches[1..].iter().any(|inner| point_in_polygon(p, inner))
}

fn to_local_meters(c: Coordinate, lat_mean_rad: f64) -> (f64, f64) {
    let x = c.lon.to_radians() * lat_mean_rad.cos() * (METERS_PER_DEGREE / (std::f64::consts::PI / 180.0));
    let y = c.lat.to_radians() * (METERS_PER_DEGREE / (std::f64::consts::PI / 180.0));
    (x, y)
}

/// Great-circle approximation in meters via the local equirectangular projection
/// described in §4.A (accurate enough at municipality scale).
pub fn point_distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat_mean = ((a.lat + b.lat) / 2.0).to_radians();
    let (ax, ay) = to_local_meters(a, lat_mean);
    let (bx, by) = to_local_meters(b, lat_mean);
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

/// Perpendicular distance (meters) from `p` to segment `a`-`b`, with the
/// parameter clamped to `[0, 1]`. Optionally returns the closest point on the
/// segment in lon/lat.
pub fn segment_distance(p: Coordinate, a: Coordinate, b: Coordinate, want_point: bool) -> (f64, Option<Coordinate>) {
    let lat_mean = ((a.lat + b.lat + p.lat) / 3.0).to_radians();
    let (px, py) = to_local_meters(p, lat_mean);
    let (ax, ay) = to_local_meters(a, lat_mean);
    let (bx, by) = to_local_meters(b, lat_mean);

    let (abx, aby) = (bx - ax, by - ay);
    let ab_len_sq = abx * abx + aby * aby;
    let t = if ab_len_sq < 1e-12 {
        0.0
    } else {
        ((px - ax) * abx + (py - ay) * aby) / ab_len_sq
    }
    .clamp(0.0, 1.0);

    let (cx, cy) = (ax + t * abx, ay + t * aby);
    let dist = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();

    let point = if want_point {
        Some(if t <= 0.0 {
            a
        } else if t >= 1.0 {
            b
        } else {
            Coordinate::new(a.lon + t * (b.lon - a.lon), a.lat + t * (b.lat - a.lat))
        })
    } else {
        None
    };
    (dist, point)
}

/// Minimum distance from `p` to any segment of `polyline`, plus the index of the
/// segment ("index i" means the segment `polyline[i] .. polyline[i+1]`).
pub fn shortest_distance(p: Coordinate, polyline: &[Coordinate]) -> (f64, usize) {
    let mut best = (f64::INFINITY, 0usize);
    for (i, w) in polyline.windows(2).enumerate() {
        let (d, _) = segment_distance(p, w[0], w[1], false);
        if d < best.0 {
            best = (d, i);
        }
    }
    best
}

/// Recursive Ramer-Douglas-Peucker simplification with a meter threshold.
pub fn simplify(line: &[Coordinate], epsilon_m: f64) -> Vec<Coordinate> {
    if line.len() < 3 {
        return line.to_vec();
    }
    let first = line[0];
    let last = *line.last().unwrap();

    let mut max_dist = 0.0;
    let mut split_at = 0;
    for (i, &p) in line[1..line.len() - 1].iter().enumerate() {
        let (d, _) = segment_distance(p, first, last, false);
        if d > max_dist {
            max_dist = d;
            split_at = i + 1;
        }
    }

    if max_dist > epsilon_m {
        let mut left = simplify(&line[..=split_at], epsilon_m);
        let right = simplify(&line[split_at..], epsilon_m);
        left.pop(); // avoid duplicating the shared midpoint
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

/// If a coordinate occurs twice in the interior of `ring` (not counting the
/// closing duplicate), split at the first repetition into two simple rings and
/// recurse, returning the rings ordered by perimeter length, longest first
/// (§4.A `split_patch`, §8 E6). Runs before any other geometry consumes rings.
pub fn split_patch(ring: &[Coordinate]) -> Vec<Vec<Coordinate>> {
    if ring.len() < 4 || ring.first() != ring.last() {
        return vec![ring.to_vec()];
    }
    let interior = &ring[..ring.len() - 1];
    for i in 0..interior.len() {
        for j in (i + 1)..interior.len() {
            if interior[i] == interior[j] {
                // ring = [ ... i ... j ... ] with interior[i] == interior[j];
                // split into [i..=j] (closed at i/j) and [j..] + [..=i] (closed at j/i).
                let mut first_ring: Vec<Coordinate> = interior[i..=j].to_vec();
                first_ring.push(interior[i]);

                let mut second_ring: Vec<Coordinate> = interior[j..].to_vec();
                second_ring.extend_from_slice(&interior[..=i]);

                let mut result = Vec::new();
                for sub in [first_ring, second_ring] {
                    result.extend(split_patch(&sub));
                }
                result.sort_by(|a, b| ring_length(b).partial_cmp(&ring_length(a)).unwrap());
                return result;
            }
        }
    }
    vec![ring.to_vec()]
}

fn ring_length(ring: &[Coordinate]) -> f64 {
    ring.windows(2).map(|w| point_distance(w[0], w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat)
    }

    #[test]
    fn polygon_area_sign_matches_winding() {
        let cw = vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0), c(1.0, 0.0), c(0.0, 0.0)];
        let ccw = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0), c(0.0, 0.0)];
        assert!(polygon_area(&cw) < 0.0);
        assert!(polygon_area(&ccw) > 0.0);
    }

    #[test]
    fn point_in_polygon_basic_square() {
        let square = vec![c(0.0, 0.0), c(2.0, 0.0), c(2.0, 2.0), c(0.0, 2.0), c(0.0, 0.0)];
        assert!(point_in_polygon(c(1.0, 1.0), &square));
        assert!(!point_in_polygon(c(3.0, 1.0), &square));
    }

    #[test]
    fn douglas_peucker_is_idempotent_at_zero() {
        let line = vec![c(0.0, 0.0), c(0.5, 0.5), c(1.0, 0.0)];
        let once = simplify(&line, 0.0);
        assert_eq!(once.len(), line.len());
    }

    #[test]
    fn douglas_peucker_collapses_a_straight_line() {
        let line = vec![c(0.0, 0.0), c(0.5, 0.0000001), c(1.0, 0.0)];
        let simplified = simplify(&line, 50.0);
        assert_eq!(simplified.len(), 2);
    }

    #[test]
    fn split_patch_splits_figure_eight() {
        let ring = vec![
            c(0.0, 0.0),
            c(2.0, 0.0),
            c(1.0, 1.0),
            c(2.0, 2.0),
            c(0.0, 2.0),
            c(1.0, 1.0),
            c(0.0, 0.0),
        ];
        let rings = split_patch(&ring);
        assert_eq!(rings.len(), 2);
        for r in &rings {
            assert_eq!(r.first(), r.last());
        }
        // Longer ring (perimeter) listed first.
        assert!(ring_length(&rings[0]) >= ring_length(&rings[1]));
    }
}
