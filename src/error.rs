/// Result type for jamcore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading data or building a performance.
///
/// Nothing in the per-frame tick path returns these; they only surface at
/// load and construction time.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fingering table exists but its contents are malformed
    #[error("Invalid fingering table for {instrument}: {reason}")]
    Table { instrument: String, reason: String },

    /// An instrument requires a fingering table that was not loaded
    #[error("No fingering table for instrument: {0}")]
    MissingTable(String),

    /// A score line could not be parsed
    #[error("Score error on line {line}: {reason}")]
    Score { line: usize, reason: String },

    /// Configuration could not be applied
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a table error for the named instrument
    pub fn table(instrument: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Table {
            instrument: instrument.into(),
            reason: reason.into(),
        }
    }
}
