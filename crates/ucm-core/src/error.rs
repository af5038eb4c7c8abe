//! Error types for the routing resolver.

use thiserror::Error;

/// Main error type for use-case routing operations.
#[derive(Error, Debug)]
pub enum UcmError {
    /// Malformed or missing descriptor text.
    #[error("config error: {0}")]
    Config(String),

    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    #[error("unknown device: {0}")]
    UnknownDevice(String),

    #[error("unknown modifier: {0}")]
    UnknownModifier(String),

    #[error("allocation error: {0}")]
    Allocation(String),

    /// A control mutation failed while enabling; everything applied by the
    /// failing call has already been rolled back when this is returned.
    #[error("control write failed in {descriptor} at step {index} ('{control}'): {reason}")]
    ControlWrite {
        descriptor: String,
        control: String,
        index: usize,
        reason: String,
    },

    #[error("invalid state: {0}")]
    State(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UcmError {
    /// Config error pinned to a source location.
    pub fn config_at(file: &str, line: usize, msg: impl std::fmt::Display) -> Self {
        Self::Config(format!("{}:{}: {}", file, line, msg))
    }

    /// True for the errors that abort a card open.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnknownVerb(_)
                | Self::UnknownDevice(_)
                | Self::UnknownModifier(_)
                | Self::Io(_)
        )
    }
}

/// Result type alias for routing operations.
pub type Result<T> = std::result::Result<T, UcmError>;
