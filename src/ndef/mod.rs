//! NDEF module - record and message codecs.
//!
//! Implements the subset of the NFC Data Exchange Format the bridge
//! needs: typed, binary-payload records grouped into a message, with the
//! well-known "PHD" record type carrying one frame per message.

mod message;
mod record;

pub use message::Message;
pub use record::{Record, PHD_TYPE, PHD_TYPE_NAME, TNF_WELL_KNOWN, WKT_PREFIX};

use thiserror::Error;

/// Errors raised while parsing NDEF data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NdefError {
    /// Declared length is inconsistent with the bytes available.
    ///
    /// Expected transiently while the peer is mid-write; callers retry.
    #[error("NDEF length inconsistent: need {needed} bytes, have {available}")]
    Length { needed: usize, available: usize },

    /// Structurally invalid NDEF data.
    #[error("invalid NDEF structure: {0}")]
    Format(&'static str),
}

impl NdefError {
    /// True for the transient mid-write state (length inconsistency).
    pub fn is_transient(&self) -> bool {
        matches!(self, NdefError::Length { .. })
    }
}
