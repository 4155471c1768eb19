use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the background removal pipeline.
///
/// Every variant is terminal for the current invocation; nothing is retried
/// internally.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported channel count {actual} (expected {expected})")]
    UnsupportedChannelCount { expected: usize, actual: usize },

    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("malformed resource: {0}")]
    MalformedResource(String),

    #[error("resource {0} not found. Ensure that the config.publicPath is configured correctly.")]
    ResourceNotFound(String),

    #[error("chunk {hash} of {key} has {actual} bytes but {expected} were declared")]
    ChunkSizeMismatch {
        key: String,
        hash: String,
        expected: u64,
        actual: u64,
    },

    #[error("failed to fetch {key} with size {expected} but got {actual}")]
    ResourceSizeMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },

    #[error("invalid configuration: {0}")]
    ConfigValidation(String),

    #[error("failed to create session: {0}. Please check if the publicPath is set correctly.")]
    SessionCreation(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("manifest parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResource(msg.into())
    }

    pub(crate) fn channels(expected: usize, actual: usize) -> Self {
        Self::UnsupportedChannelCount { expected, actual }
    }
}
