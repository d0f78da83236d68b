use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TaxaError {
    #[error("invalid local key: {0}")]
    InvalidKey(String),

    #[error("invalid persistent id: {0}")]
    InvalidPersistentId(String),

    #[error("invalid rank: {0}")]
    InvalidRank(String),

    #[error("invalid dataset key: {0}")]
    InvalidDatasetKey(String),

    #[error("invalid matching mode: {0} (expected exact, fuzzy, fulltext, suggest or contains)")]
    InvalidMatchingMode(String),

    #[error("GBIF request failed: {0}")]
    GbifHttp(String),

    #[error("GBIF returned status {status}: {message}")]
    GbifStatus { status: u16, message: String },

    #[error("failed to decode registry response: {0}")]
    Decode(String),

    #[error("name usage not found: {0}")]
    NotFound(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

impl TaxaError {
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TaxaError::GbifHttp(_) | TaxaError::GbifStatus { .. } | TaxaError::Decode(_)
        )
    }
}
