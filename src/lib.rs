//! Converts Swedish national topographic vector data into an OSM change file:
//! ingest source records, reconstruct shared-edge topology, enrich with
//! gazetteer names, and emit OSM XML (+ optional debug GeoJSON).

pub mod combine;
pub mod config;
pub mod decompose;
pub mod emit;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod ingestion;
pub mod intersections;
pub mod islands;
pub mod model;
pub mod names;
pub mod pipeline;
pub mod river;
pub mod simplify;
pub mod tags;
pub mod wetland;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{run, PipelineInput};
