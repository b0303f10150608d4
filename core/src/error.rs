use std::path::PathBuf;

/// Engine error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The term dictionary could not be loaded; there is nothing to scan for.
    #[error("dictionary unavailable: {0}")]
    DictionaryUnavailable(String),

    /// A file-backed source could not be read.
    #[error("io error: {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file-backed source is not a valid dictionary document.
    #[error("parse error: {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("paraphrase failed: {0}")]
    Paraphrase(#[from] ParaphraseError),
}

/// Failures talking to the paraphrase service.
#[derive(Debug, thiserror::Error)]
pub enum ParaphraseError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("service returned status {0}")]
    Status(u16),

    #[error("response has no `result` field")]
    MissingResult,

    #[error("text is {len} characters, limit is {max}")]
    TooLong { len: usize, max: usize },
}

/// Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;
