use thiserror::Error;

/// Boundary data could not be loaded. The map keeps working without the overlay.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("GeoJSON could not be loaded from any source: {}", attempted.join(", "))]
    AllSourcesFailed { attempted: Vec<String> },

    #[error("invalid boundary dataset from {source_url}: {reason}")]
    InvalidDataset { source_url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF assembly failed: {0}")]
    Pdf(String),

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{command}' expects {expected}")]
    Usage { command: &'static str, expected: &'static str },

    #[error("invalid number '{0}'")]
    Number(String),
}
