use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use hashbrown::HashSet;
use serde::Deserialize;

use topo2osm::config::{Config, DataCategory, TopoProduct};
use topo2osm::ingestion::{SourceGeometry, SourceRecord};
use topo2osm::model::Tags;
use topo2osm::{emit, pipeline};

/// Convert Swedish national topographic vector data into an OSM change file.
#[derive(Parser, Debug)]
#[command(name = "topo2osm", version)]
struct Args {
    /// Path to a JSON file of ingested source records (see `InputRecord`).
    input: PathBuf,

    /// Where to write the OSM XML change file.
    #[arg(short, long, default_value = "out.osm")]
    output: PathBuf,

    /// Also write a debug GeoJSON file next to the output.
    #[arg(long)]
    debug: bool,

    #[arg(long, value_enum, default_value = "topo10")]
    topo_product: CliTopoProduct,

    #[arg(long, default_value_t = false)]
    no_name: bool,

    #[arg(long, default_value_t = false)]
    no_simplify: bool,

    #[arg(long, default_value_t = false)]
    merge_wetland: bool,

    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliTopoProduct {
    Topo10,
    Topo50,
    Topo100,
    Topo250,
}

impl From<CliTopoProduct> for TopoProduct {
    fn from(v: CliTopoProduct) -> Self {
        match v {
            CliTopoProduct::Topo10 => TopoProduct::Topo10,
            CliTopoProduct::Topo50 => TopoProduct::Topo50,
            CliTopoProduct::Topo100 => TopoProduct::Topo100,
            CliTopoProduct::Topo250 => TopoProduct::Topo250,
        }
    }
}

#[derive(Deserialize)]
struct InputFile {
    records: Vec<InputRecord>,
    #[serde(default)]
    river_worthy_ids: Vec<String>,
}

#[derive(Deserialize)]
struct InputRecord {
    object_kind: String,
    geometry: InputGeometry,
    #[serde(default)]
    properties: Tags,
    #[serde(default)]
    date_year: Option<u16>,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum InputGeometry {
    Point { coordinates: (f64, f64) },
    Line { coordinates: Vec<(f64, f64)> },
    Polygon { coordinates: Vec<Vec<(f64, f64)>> },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = Config {
        topo_product: args.topo_product.into(),
        data_category: DataCategory::Topo,
        debug: args.debug,
        get_name: !args.no_name,
        simplify: !args.no_simplify,
        merge_wetland: args.merge_wetland,
        ..Config::default()
    };

    log::info!("reading input from {}", args.input.display());
    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading input file {}", args.input.display()))?;
    let input_file: InputFile =
        serde_json::from_str(&raw).with_context(|| format!("parsing input file {}", args.input.display()))?;

    let records: Vec<SourceRecord> = input_file.records.into_iter().map(convert_record).collect();
    let river_worthy_ids: HashSet<String> = input_file.river_worthy_ids.into_iter().collect();

    let pipeline_input = pipeline::PipelineInput { records, projected_rings: Vec::new(), river_worthy_ids };

    let (xml, ctx) = pipeline::run(config.clone(), pipeline_input);

    log::info!("writing output to {}", args.output.display());
    std::fs::write(&args.output, &xml).with_context(|| format!("writing output file {}", args.output.display()))?;

    if args.debug || config.json_output {
        let geojson_path = args.output.with_extension("debug.geojson");
        log::info!("writing debug GeoJSON to {}", geojson_path.display());
        let file = File::create(&geojson_path)
            .with_context(|| format!("creating debug GeoJSON file {}", geojson_path.display()))?;
        emit::write_debug_geojson(&ctx, BufWriter::new(file))?;
    }

    Ok(())
}

fn convert_record(input: InputRecord) -> SourceRecord {
    let geometry = match input.geometry {
        InputGeometry::Point { coordinates } => {
            SourceGeometry::Point(topo2osm::model::Coordinate::new(coordinates.0, coordinates.1))
        }
        InputGeometry::Line { coordinates } => SourceGeometry::Line(
            coordinates.into_iter().map(|(lon, lat)| topo2osm::model::Coordinate::new(lon, lat)).collect(),
        ),
        InputGeometry::Polygon { coordinates } => SourceGeometry::Polygon(
            coordinates
                .into_iter()
                .map(|ring| ring.into_iter().map(|(lon, lat)| topo2osm::model::Coordinate::new(lon, lat)).collect())
                .collect(),
        ),
    };
    SourceRecord { object_kind: input.object_kind, geometry, properties: input.properties, date_year: input.date_year }
}
