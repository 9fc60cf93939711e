use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("corrupt device row: {0}")]
    Corrupt(String),

    /// The gate server could not be reached; scans fall back to the device.
    #[error("gate server unreachable: {0}")]
    NetworkUnavailable(String),

    /// Offline scanning was needed but this event was never downloaded.
    #[error("no offline snapshot for event {0}")]
    NoSnapshot(i64),

    #[error("gate server answered {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unexpected gate server payload: {0}")]
    Decode(String),

    #[error("invalid scanner configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ScannerError>;
