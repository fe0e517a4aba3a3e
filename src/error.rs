#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Integrity violation: {0}")]
    Constraint(String),

    #[error("Fetch failed for {symbol}: {reason}")]
    Fetch { symbol: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl SyncError {
    /// Classify a DuckDB error raised while writing rows.
    ///
    /// DuckDB reports integrity violations (duplicate key, NOT NULL, CHECK)
    /// as a plain failure whose message starts with `Constraint Error`;
    /// there is no dedicated error code for them.
    pub fn from_store(err: duckdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("Constraint Error") {
            SyncError::Constraint(message)
        } else {
            SyncError::DuckDb(err)
        }
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, SyncError::Constraint(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
