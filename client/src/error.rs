use thiserror::Error;

/// How a failed remote call is classified for scheduling and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NetworkFailure,
    MalformedResponse,
}

/// Failure of a call to the canvas service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("service answered with status {0}")]
    Status(u16),

    #[error("unreadable response: {0}")]
    Malformed(String),
}

impl RemoteError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RemoteError::Network(_) | RemoteError::Status(_) => FailureKind::NetworkFailure,
            RemoteError::Malformed(_) => FailureKind::MalformedResponse,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid scheduler settings: {reason}")]
    InvalidScheduler { reason: String },

    #[error("invalid tile settings: {reason}")]
    InvalidTiles { reason: String },

    #[error("invalid zoom limits: {reason}")]
    InvalidZoom { reason: String },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum AddressError {
    #[error("address must start with /canvas: {0}")]
    MissingPrefix(String),

    #[error("invalid {field} segment: {value}")]
    InvalidSegment { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync driver has stopped")]
    DriverStopped,
}
