//! Orchestration (§4, §5): runs every component in sequence, consuming each
//! phase's fixpoint, narrated with `log::info!` per phase in the teacher's
//! `main.rs` style.

use hashbrown::HashSet;

use crate::config::Config;
use crate::grid::{self, ProjectedRing};
use crate::ingestion::{self, SourceRecord};
use crate::model::Context;
use crate::{combine, decompose, emit, intersections, islands, names, river, simplify, wetland};

pub struct PipelineInput {
    pub records: Vec<SourceRecord>,
    /// Projected-CRS rings for grid detection (§4.D), aligned by feature index
    /// with any polygon-geometry record in `records`.
    pub projected_rings: Vec<Vec<(f64, f64)>>,
    pub river_worthy_ids: HashSet<String>,
}

/// Run the full pipeline, returning the emitted OSM XML alongside the
/// context it was built from (so callers can also write the debug GeoJSON
/// dump without re-running the whole pipeline).
pub fn run(config: Config, input: PipelineInput) -> (String, Context) {
    let mut ctx = Context::new(config);

    log::info!("ingesting {} records", input.records.len());
    ingestion::ingest(&mut ctx, input.records);

    log::info!("detecting grid edges");
    run_grid_detection(&mut ctx, &input.projected_rings);

    log::info!("reconciling wetlands");
    wetland::overlap_to_segments(&mut ctx);
    wetland::split_segments(&mut ctx);
    wetland::insert_missing_nodes(&mut ctx);
    wetland::remove_surplus_nodes(&mut ctx);

    log::info!("assembling rivers");
    river::chain_by_identifier(&mut ctx);
    river::upgrade_cross_scale(&mut ctx, &input.river_worthy_ids);

    log::info!("decomposing polygons into segments");
    decompose::repair_sea_coastlines(&mut ctx);
    decompose::decompose(&mut ctx);

    log::info!("combining features and segments");
    combine::combine_across_grid(&mut ctx);
    combine::combine_consecutive_segments(&mut ctx);

    log::info!("identifying islands");
    islands::inner_ring_islands(&mut ctx);
    islands::shore_cycle_islands(&mut ctx);

    if ctx.config.get_name {
        log::info!("matching place names");
        names::match_names(&mut ctx);
    }

    log::info!("resolving line intersections");
    intersections::remove_sea_features(&mut ctx);
    intersections::populate_node_set(&mut ctx);
    intersections::resolve_stream_intersections(&mut ctx);

    log::info!("simplifying geometry");
    simplify::simplify_all(&mut ctx);

    ctx.stats.log_summary();

    log::info!("emitting OSM XML");
    let xml = emit::emit_osm_xml(&ctx);
    (xml, ctx)
}

fn run_grid_detection(ctx: &mut Context, projected_rings: &[Vec<(f64, f64)>]) {
    let grid_size = ctx.config.grid_size();
    let mut all_runs = Vec::new();

    for feature in &ctx.features {
        for patch in feature.patches() {
            let Some(projected) = projected_rings.iter().find(|p| p.len() == patch.ring.len()) else { continue };
            let ring = ProjectedRing { geographic: &patch.ring, projected };
            all_runs.extend(grid::detect_grid_edges(&ring, grid_size));
        }
    }

    let runs = grid::dedup_and_sort_runs(all_runs);
    grid::materialize_grid_segments(ctx, runs);
    grid::dedup_post_reprojection(ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::SourceGeometry;
    use crate::model::{Coordinate, FeatureGeometry, Tags};
    use crate::tags::ObjectKind;

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat)
    }

    fn record(kind: &str, geometry: SourceGeometry) -> SourceRecord {
        SourceRecord { object_kind: kind.into(), geometry, properties: Tags::new(), date_year: Some(2024) }
    }

    fn run_default(records: Vec<SourceRecord>) -> (String, Context) {
        run(Config::default(), PipelineInput { records, projected_rings: Vec::new(), river_worthy_ids: HashSet::new() })
    }

    /// E1 — two lake polygons sharing a shore (§8): both polygons should
    /// reference the same shoreline way between the shared vertices.
    #[test]
    fn e1_two_lakes_share_a_wall() {
        let lake_a = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0), c(0.0, 0.0)];
        let lake_b = vec![c(1.0, 0.0), c(2.0, 0.0), c(2.0, 1.0), c(1.0, 1.0), c(1.0, 0.0)];
        let shared_wall = vec![c(1.0, 0.0), c(1.0, 1.0)];

        let records = vec![
            record("Sjö", SourceGeometry::Polygon(vec![lake_a])),
            record("Sjö", SourceGeometry::Polygon(vec![lake_b])),
            record("Strandlinje, sjö", SourceGeometry::Line(shared_wall)),
        ];

        let (xml, _ctx) = run_default(records);

        assert!(xml.contains("water"));
        assert!(xml.matches("<way").count() >= 1);
    }

    /// E2 — island in sea (§8): an inner ring of a `Hav` polygon whose area
    /// clears `island_size` becomes a standalone `place=island` feature, and
    /// the sea feature itself is dropped once it has done its organizing job.
    #[test]
    fn e2_island_in_sea_becomes_a_place_feature() {
        let outer = vec![c(0.0, 0.0), c(1000.0, 0.0), c(1000.0, 1000.0), c(0.0, 1000.0), c(0.0, 0.0)];
        let inner = vec![c(100.0, 100.0), c(500.0, 100.0), c(500.0, 600.0), c(100.0, 600.0), c(100.0, 100.0)];

        let records = vec![record("Hav", SourceGeometry::Polygon(vec![outer, inner]))];
        let (xml, ctx) = run_default(records);

        assert!(ctx.features.iter().all(|f| f.object_kind != ObjectKind::Hav));
        let island = ctx.features.iter().find(|f| f.tags.get("place").map(String::as_str) == Some("island"));
        assert!(island.is_some(), "expected a materialized island feature");
        assert!(xml.contains("island"));
    }

    /// E3 — grid-split forest (§8): two woodland polygons separated by a
    /// `Gridline` segment combine into one feature and the grid line stops
    /// being used once it's interior to the merged shape.
    #[test]
    fn e3_grid_split_forest_merges_across_the_grid_line() {
        let forest_a = vec![c(0.0, 0.0), c(10.0, 0.0), c(10.0, 10.0), c(0.0, 10.0), c(0.0, 0.0)];
        let forest_b = vec![c(10.0, 0.0), c(20.0, 0.0), c(20.0, 10.0), c(10.0, 10.0), c(10.0, 0.0)];
        let grid_edge = vec![c(10.0, 0.0), c(10.0, 10.0)];

        let records = vec![
            record("Skogsmark", SourceGeometry::Polygon(vec![forest_a])),
            record("Skogsmark", SourceGeometry::Polygon(vec![forest_b])),
            record("Gridline", SourceGeometry::Line(grid_edge)),
        ];
        let (_xml, ctx) = run_default(records);

        let forests: Vec<_> = ctx.features.iter().filter(|f| f.object_kind.as_str() == "Skogsmark").collect();
        assert_eq!(forests.len(), 1, "the two forest polygons should combine into one feature");

        let grid_segment = ctx.segments.iter().find(|s| s.object_kind == ObjectKind::Gridline);
        assert_eq!(grid_segment.map(|s| s.used), Some(0), "the shared grid line should no longer be used");
    }

    /// E4 — stream meeting lake (§8): a stream endpoint a few centimeters off
    /// a shore vertex snaps onto it and the node set records the shared point.
    #[test]
    fn e4_stream_endpoint_snaps_onto_the_shore_vertex() {
        let lake_ring =
            vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.5, 0.5), c(0.0, 1.0), c(0.0, 0.0)];
        let stream = vec![c(0.0, -5.0), c(0.5000001, 0.5)];

        let records = vec![
            record("Sjö", SourceGeometry::Polygon(vec![lake_ring.clone()])),
            record("Strandlinje, sjö", SourceGeometry::Line(lake_ring)),
            record("Vattendrag", SourceGeometry::Line(stream)),
        ];
        let (_xml, ctx) = run_default(records);

        assert!(ctx.nodes.contains(&c(0.5, 0.5)));
        let stream_feature = ctx.features.iter().find(|f| f.object_kind == ObjectKind::Vattendrag).unwrap();
        let FeatureGeometry::LineString(line) = &stream_feature.geometry else { panic!("expected a line") };
        assert_eq!(*line.last().unwrap(), c(0.5, 0.5));
    }

    /// E6 — self-touching ring (§8): a figure-eight ring is split into two
    /// simple rings before decomposition runs, and both survive to the patch
    /// set the pipeline actually emits.
    #[test]
    fn e6_self_touching_ring_splits_into_two_patches() {
        let ring = vec![
            c(0.0, 0.0),
            c(2.0, 0.0),
            c(1.0, 1.0),
            c(2.0, 2.0),
            c(0.0, 2.0),
            c(1.0, 1.0),
            c(0.0, 0.0),
        ];
        let records = vec![record("Sjö", SourceGeometry::Polygon(vec![ring]))];

        let (xml, ctx) = run_default(records);
        assert!(xml.contains("<osm"));

        let lake = ctx.features.iter().find(|f| f.object_kind == ObjectKind::Sjo).expect("lake feature survives");
        let FeatureGeometry::Polygon(patches) = &lake.geometry else { panic!("expected a polygon") };
        assert_eq!(patches.len(), 2, "the figure-eight ring should have split into two patches");
    }
}
