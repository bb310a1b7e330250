//! Grid detector (§4.D). Grid edges are detected against the *projected* CRS,
//! pre-reprojection (§6 "the kernel also needs the original projected
//! coordinates"); callers pass the projected vertex alongside the geographic
//! one via `ProjectedRing`. A second pass, after reprojection, dedupes
//! WGS84-equal grid segments and strips their interior nodes from the owning
//! ring.

use hashbrown::HashSet;

use crate::model::{segment::order_pair, Context, Coordinate, FeatureGeometry, Segment};
use crate::tags::ObjectKind;

/// A ring alongside its pre-reprojection projected-CRS coordinates, one pair
/// per vertex, same length and winding as the geographic ring.
pub struct ProjectedRing<'a> {
    pub geographic: &'a [Coordinate],
    pub projected: &'a [(f64, f64)],
}

fn is_on_grid(value: f64, grid_size: f64) -> bool {
    let remainder = value.rem_euclid(grid_size);
    remainder < 1e-6 || (grid_size - remainder) < 1e-6
}

fn vertex_on_grid(p: (f64, f64), grid_size: f64) -> bool {
    is_on_grid(p.0, grid_size) || is_on_grid(p.1, grid_size)
}

/// A vertex lying at a multiple of `grid_size` on BOTH axes (§4.H "grid-crossing
/// point").
pub fn is_grid_crossing(p: (f64, f64), grid_size: f64) -> bool {
    is_on_grid(p.0, grid_size) && is_on_grid(p.1, grid_size)
}

/// Detect grid edges in one ring (§4.D steps 1-2): rotate so the start isn't
/// on-grid, then greedily accumulate runs of length >= 2.
pub fn detect_grid_edges(ring: &ProjectedRing, grid_size: f64) -> Vec<Vec<Coordinate>> {
    let n = ring.geographic.len();
    if n < 4 || ring.geographic.first() != ring.geographic.last() {
        return Vec::new();
    }
    let interior_len = n - 1;
    let on_grid: Vec<bool> = (0..interior_len).map(|i| vertex_on_grid(ring.projected[i], grid_size)).collect();

    let start = (0..interior_len).find(|&i| !on_grid[i]).unwrap_or(0);

    let mut runs = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    for step in 0..interior_len {
        let i = (start + step) % interior_len;
        if on_grid[i] {
            current.push(i);
        } else if current.len() >= 2 {
            runs.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
    }
    if current.len() >= 2 {
        runs.push(current);
    }

    runs.into_iter()
        .map(|indices| indices.into_iter().map(|i| ring.geographic[i]).collect())
        .collect()
}

/// Deduplicate runs ignoring direction, then sort by Manhattan length
/// descending (§4.D step 3).
pub fn dedup_and_sort_runs(runs: Vec<Vec<Coordinate>>) -> Vec<Vec<Coordinate>> {
    let mut seen: HashSet<(Coordinate, Coordinate)> = HashSet::new();
    let mut kept = Vec::new();
    for run in runs {
        let (&first, last) = match (run.first(), run.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => continue,
        };
        let key = order_pair(first, *last);
        if seen.insert(key) {
            kept.push(run);
        }
    }
    kept.sort_by(|a, b| manhattan_length(b).partial_cmp(&manhattan_length(a)).unwrap());
    kept
}

/// Canonical-direction comparison for deduplicating a run against its reverse;
/// `Coordinate` has no total order, so compare lon/lat pairs directly.
fn lexicographically_smaller(a: &[Coordinate], b: &[Coordinate]) -> bool {
    for (pa, pb) in a.iter().zip(b.iter()) {
        if pa.lon != pb.lon {
            return pa.lon < pb.lon;
        }
        if pa.lat != pb.lat {
            return pa.lat < pb.lat;
        }
    }
    false
}

fn manhattan_length(run: &[Coordinate]) -> f64 {
    run.windows(2).map(|w| (w[1].lon - w[0].lon).abs() + (w[1].lat - w[0].lat).abs()).sum()
}

/// Materialize each surviving run as a `used = 0` `Gridline` segment.
pub fn materialize_grid_segments(ctx: &mut Context, runs: Vec<Vec<Coordinate>>) {
    for run in runs {
        if let Some(segment) = Segment::new(ObjectKind::Gridline, run, crate::model::Tags::new()) {
            ctx.add_segment(segment);
        }
    }
}

/// Post-reprojection second pass (§4.D): dedupe grid segments whose WGS84
/// coordinates have become equal, and strip interior nodes shared with a
/// polygon feature ring.
pub fn dedup_post_reprojection(ctx: &mut Context) {
    let mut seen: HashSet<Vec<Coordinate>> = HashSet::new();
    let mut drop: Vec<usize> = Vec::new();
    for (i, segment) in ctx.segments.iter().enumerate() {
        if segment.object_kind != ObjectKind::Gridline {
            continue;
        }
        let mut key = segment.coords.clone();
        let reversed: Vec<Coordinate> = key.iter().rev().copied().collect();
        if lexicographically_smaller(&reversed, &key) {
            key = reversed;
        }
        if !seen.insert(key) {
            drop.push(i);
        }
    }
    for i in drop {
        ctx.segments[i].used = 0;
    }

    let grid_runs: Vec<Vec<Coordinate>> = ctx
        .segments
        .iter()
        .filter(|s| s.object_kind == ObjectKind::Gridline)
        .map(|s| s.coords.clone())
        .collect();

    for feature in &mut ctx.features {
        let FeatureGeometry::Polygon(patches) = &mut feature.geometry else { continue };
        for patch in patches {
            for run in &grid_runs {
                strip_consecutive_run(&mut patch.ring, run);
            }
        }
    }
}

/// If `run` appears as a consecutive subsequence of `ring` (either direction),
/// remove its interior vertices, leaving only the two endpoints.
fn strip_consecutive_run(ring: &mut Vec<Coordinate>, run: &[Coordinate]) {
    if run.len() < 3 || ring.len() <= run.len() {
        return;
    }
    let n = ring.len();
    for start in 0..n {
        if matches_run(ring, start, run, false) {
            splice_out_interior(ring, start, run.len());
            return;
        }
        if matches_run(ring, start, run, true) {
            splice_out_interior(ring, start, run.len());
            return;
        }
    }
}

fn matches_run(ring: &[Coordinate], start: usize, run: &[Coordinate], reversed: bool) -> bool {
    let n = ring.len();
    (0..run.len()).all(|k| {
        let idx = (start + k) % n;
        let expected = if reversed { run[run.len() - 1 - k] } else { run[k] };
        ring[idx] == expected
    })
}

fn splice_out_interior(ring: &mut Vec<Coordinate>, start: usize, run_len: usize) {
    let n = ring.len();
    let mut keep = Vec::with_capacity(n - (run_len - 2));
    let interior: HashSet<usize> = (1..run_len - 1).map(|k| (start + k) % n).collect();
    for i in 0..n {
        if !interior.contains(&i) {
            keep.push(ring[i]);
        }
    }
    *ring = keep;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat)
    }

    #[test]
    fn detects_a_run_on_a_single_grid_line() {
        // Square whose bottom edge (y=0, a multiple of grid_size) has an extra
        // on-grid vertex in the middle.
        let geographic = vec![c(0.0, 0.0), c(0.5, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0), c(0.0, 0.0)];
        let projected = vec![(0.0, 0.0), (5000.0, 0.0), (10_000.0, 0.0), (10_000.0, 10_000.0), (0.0, 10_000.0), (0.0, 0.0)];
        let ring = ProjectedRing { geographic: &geographic, projected: &projected };
        let runs = detect_grid_edges(&ring, 10_000.0);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].len(), 3);
    }

    #[test]
    fn grid_crossing_requires_both_axes_on_grid() {
        assert!(is_grid_crossing((10_000.0, 20_000.0), 10_000.0));
        assert!(!is_grid_crossing((10_000.0, 20_001.0), 10_000.0));
    }

    #[test]
    fn dedup_ignores_run_direction() {
        let a = vec![c(0.0, 0.0), c(1.0, 0.0), c(2.0, 0.0)];
        let b = vec![c(2.0, 0.0), c(1.0, 0.0), c(0.0, 0.0)];
        let kept = dedup_and_sort_runs(vec![a, b]);
        assert_eq!(kept.len(), 1);
    }
}
