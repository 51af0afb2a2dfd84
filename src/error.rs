use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error at position {position}: {source}")]
    Xml {
        source: quick_xml::Error,
        position: usize,
    },

    #[error("Malformed coverage report: {0}")]
    Malformed(String),

    #[error("Invalid coverage data: {0}")]
    Data(String),

    #[error("Cannot read source file {}: {source}", path.display())]
    SourceFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upload failed: {0}")]
    Transport(String),

    #[error("git error: {0}")]
    Git(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ShimError>;
