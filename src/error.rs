//! Error types.
//!
//! Library code returns typed errors (`StoreError`, `FetchError`, `IngestError`).
//! The binary boundary collapses them into `AppError`, which carries the process
//! exit code alongside a human-readable message.

/// Exit code for configuration and usage problems.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code for a run that completed with status `failed`.
pub const EXIT_RUN_FAILED: u8 = 3;
/// Exit code for fetch or storage failures outside a run.
pub const EXIT_IO: u8 = 4;

/// Failures raised by a repository, run history, or revision backend.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store lock poisoned: {0}")]
    Poisoned(&'static str),

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("corrupt stored row: {0}")]
    Corrupt(String),
}

/// Failures raised while fetching a payload from an upstream vendor.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request failed with status {0}")]
    Status(u16),

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response body is not a JSON object")]
    NotAnObject,

    #[error("invalid request url: {0}")]
    Url(String),
}

/// Failures that abort an ingestion job.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("payload is not JSON-serializable: {0}")]
    Serialization(serde_json::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Error surfaced by the `ingest` binary.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::new(EXIT_IO, format!("Storage error: {err}"))
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::new(EXIT_IO, format!("Fetch failed: {err}"))
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Store(e) => e.into(),
            IngestError::Fetch(e) => e.into(),
            IngestError::Serialization(e) => {
                AppError::new(EXIT_CONFIG, format!("Invalid payload: {e}"))
            }
        }
    }
}
