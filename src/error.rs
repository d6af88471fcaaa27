//! Custom error types for growthwise

use thiserror::Error;

/// Main error type for growthwise operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid measurement: {0}")]
    Domain(String),

    #[error("No {indicator} reference row for {sex} at {key}")]
    ReferenceNotFound {
        indicator: String,
        sex: String,
        key: String,
    },

    #[error("Guideline index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationFailure),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Qdrant error: {0}")]
    Qdrant(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors caused by the caller's input rather than by the system.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::Domain(_) | Error::ReferenceNotFound { .. })
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

/// Convert qdrant errors
impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::Qdrant(err.to_string())
    }
}

/// Result type alias for growthwise
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single generation call produced no usable answer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationFailure {
    #[error("API credential not set")]
    MissingCredential,

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("empty response")]
    Empty,

    #[error("generator not configured: {0}")]
    Unconfigured(String),
}

impl From<reqwest::Error> for GenerationFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationFailure::Timeout
        } else if err.is_decode() {
            GenerationFailure::Malformed(err.to_string())
        } else {
            GenerationFailure::Transport(err.to_string())
        }
    }
}

/// Reason tag for a retrieval-augmented answer that could not be produced.
///
/// These never reach the end user as errors; the recommendation composer
/// switches to the rule-based text and logs the reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    #[error("no guideline index has been built")]
    IndexMissing,

    #[error("index backend error: {0}")]
    Index(String),

    #[error("embedding service error: {0}")]
    Embedding(String),

    #[error("retrieval returned no context")]
    NoContext,

    #[error("generation failed: {0}")]
    Generation(GenerationFailure),
}

impl From<GenerationFailure> for Unavailable {
    fn from(failure: GenerationFailure) -> Self {
        Unavailable::Generation(failure)
    }
}

impl From<Unavailable> for Error {
    fn from(reason: Unavailable) -> Self {
        match reason {
            Unavailable::Generation(failure) => Error::Generation(failure),
            other => Error::IndexUnavailable(other.to_string()),
        }
    }
}
