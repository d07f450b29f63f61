//! Error types for the reconciler
//!
//! Every variant except [`Error::Persist`] is fatal: the orchestrator stops
//! the run at the first one it sees.

use thiserror::Error;

use crate::snapshot::SnapshotKind;

/// Result type alias for reconciler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciler
#[derive(Error, Debug)]
pub enum Error {
    /// The OS reported no interface in the "up" state
    #[error("No active network interface found")]
    NoActiveInterface,

    /// Reading the live IPv4 configuration failed
    #[error("Failed to read IPv4 configuration of {interface}: {message}")]
    ProbeRead {
        /// Interface name
        interface: String,
        /// Error message
        message: String,
    },

    /// Applying a configuration to an interface failed
    #[error("Failed to apply configuration to {interface}: {message}")]
    Apply {
        /// Interface name
        interface: String,
        /// Error message
        message: String,
    },

    /// A forced mode needs a snapshot that is not on disk
    #[error("No {kind} snapshot stored for interface {slot}")]
    MissingSnapshot {
        /// Interface slot (1-based)
        slot: usize,
        /// Which snapshot was expected
        kind: SnapshotKind,
    },

    /// Writing a snapshot failed (non-fatal)
    #[error("Failed to persist snapshot: {0}")]
    Persist(String),

    /// A snapshot file exists but its contents are malformed
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// The requested interface slot does not exist
    #[error("Interface {requested} does not exist ({available} active interface(s))")]
    UnknownInterface {
        /// Slot that was asked for
        requested: usize,
        /// Number of active interfaces
        available: usize,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors outside the snapshot store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a probe read error
    pub fn probe_read(interface: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProbeRead {
            interface: interface.into(),
            message: message.into(),
        }
    }

    /// Create an apply error
    pub fn apply(interface: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Apply {
            interface: interface.into(),
            message: message.into(),
        }
    }

    /// Create a missing snapshot error
    pub fn missing_snapshot(slot: usize, kind: SnapshotKind) -> Self {
        Self::MissingSnapshot { slot, kind }
    }

    /// Create a persistence error
    pub fn persist(msg: impl Into<String>) -> Self {
        Self::Persist(msg.into())
    }

    /// Create an invalid snapshot error
    pub fn invalid_snapshot(msg: impl Into<String>) -> Self {
        Self::InvalidSnapshot(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error must stop the run (everything but [`Error::Persist`])
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Persist(_))
    }
}
