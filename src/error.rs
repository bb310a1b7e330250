//! Error taxonomy (§7). Most variants are recorded into `RunStats`/FIXME tags
//! rather than aborting the run; only ingestion-time failures propagate up to
//! `main` via `anyhow`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input error: {0}")]
    Input(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("geometry anomaly in {context}: {detail}")]
    GeometryAnomaly { context: String, detail: String },

    #[error("unknown object kind: {0}")]
    UnknownTag(String),

    #[error("ambiguous place name {reference_id}: {detail}")]
    NameAmbiguity { reference_id: String, detail: String },

    #[error("disconnected combination in {context}: {detail}")]
    DisconnectedCombine { context: String, detail: String },
}

pub type Result<T> = std::result::Result<T, Error>;
