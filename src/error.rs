//! Error types for phdc-bridge.

use thiserror::Error;

use crate::ndef::NdefError;

/// Main error type for all bridge operations.
#[derive(Debug, Error)]
pub enum PhdcError {
    /// I/O error talking to the tag (e.g. physical removal).
    ///
    /// Fatal for the session: the link cannot be resumed.
    #[error("tag link failure: {0}")]
    Link(#[from] std::io::Error),

    /// NDEF message or record could not be parsed.
    #[error("NDEF error: {0}")]
    Ndef(#[from] NdefError),

    /// Frame bytes were empty where a PHD record payload was expected.
    #[error("malformed PHD frame")]
    MalformedFrame,

    /// Protocol error (bad attach message, attribute block misuse, etc.).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The session task has terminated; no further APDUs can be sent.
    #[error("session closed")]
    SessionClosed,
}

/// Result type alias using PhdcError.
pub type Result<T> = std::result::Result<T, PhdcError>;
