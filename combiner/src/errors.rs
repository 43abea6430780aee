use thiserror::Error;

/// Result type alias for combiner operations
pub type Result<T, E = CombinerError> = std::result::Result<T, E>;

/// Errors that can occur while serving a bundle request
#[derive(Error, Debug)]
pub enum CombinerError {
    #[error("malformed bundle request url: {0}")]
    MalformedRequestUrl(String),

    #[error("unrecognized asset type: {0}")]
    UnrecognizedAssetType(String),

    #[error("no configuration section for {0} assets")]
    ConfigurationMissing(&'static str),

    #[error("remote fetch failed for {url}: {reason}")]
    RemoteFetchFailure { url: String, reason: String },

    #[error("compression failed: {0}")]
    CompressionFailure(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
