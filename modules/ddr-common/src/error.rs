use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DdrError {
    /// Neither document produced anything the pipeline can work with.
    #[error("At least one valid document (inspection or thermal) is required")]
    NoUsableInput,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type DdrResult<T> = std::result::Result<T, DdrError>;
