//! Error types for the notification core.

/// Top-level error type for the deadline notification engine.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Configuration load/save error.
    #[error("config error: {0}")]
    Config(String),

    /// Notification ledger read/write error.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Task snapshot loading error.
    #[error("task source error: {0}")]
    Tasks(String),

    /// Realtime alert channel error.
    #[error("channel error: {0}")]
    Channel(String),

    /// Outbound email dispatch error.
    #[error("email error: {0}")]
    Email(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, NotifyError>;
