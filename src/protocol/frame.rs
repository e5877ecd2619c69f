//! Frame struct with typed accessors.
//!
//! Represents a complete PHD frame: one control byte followed by the
//! APDU payload. Uses `bytes::Bytes` for zero-copy payload sharing.
//!
//! # Example
//!
//! ```
//! use phdc_bridge::protocol::Frame;
//!
//! let frame = Frame::command(1, b"\x01\x02".as_ref().into());
//! assert_eq!(frame.control(), 0x07);
//! assert_eq!(frame.payload(), b"\x01\x02");
//! assert_eq!(frame.to_bytes(), vec![0x07, 0x01, 0x02]);
//! ```

use bytes::Bytes;

use super::wire_format::{encode_control, kind, kinds, matches_expected, sequence};
use crate::error::{PhdcError, Result};

/// A complete PHD frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Control byte (sequence + kind).
    pub control: u8,
    /// APDU payload (zero-copy via `bytes::Bytes`). May be empty for
    /// keep-alive frames.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame from a raw control byte and payload.
    pub fn new(control: u8, payload: Bytes) -> Self {
        Self { control, payload }
    }

    /// Create a command frame for the given sequence counter.
    pub fn command(counter: u64, payload: Bytes) -> Self {
        Self::new(encode_control(counter, kinds::COMMAND), payload)
    }

    /// Create a response frame for the given sequence counter.
    pub fn response(counter: u64, payload: Bytes) -> Self {
        Self::new(encode_control(counter, kinds::RESPONSE), payload)
    }

    /// Create a session-initial attach frame carrying the initial APDU.
    pub fn attach(payload: Bytes) -> Self {
        Self::new(encode_control(0, kinds::ATTACH), payload)
    }

    /// Parse a frame from the payload bytes of a PHD record.
    ///
    /// # Errors
    ///
    /// Returns [`PhdcError::MalformedFrame`] if the input is empty.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (&control, payload) = data.split_first().ok_or(PhdcError::MalformedFrame)?;
        Ok(Self::new(control, Bytes::copy_from_slice(payload)))
    }

    /// Serialize the frame: control byte followed by the payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + self.payload.len());
        buf.push(self.control);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Get the control byte.
    #[inline]
    pub fn control(&self) -> u8 {
        self.control
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get a clone of the payload as Bytes (cheap, zero-copy).
    #[inline]
    pub fn payload_bytes(&self) -> Bytes {
        self.payload.clone()
    }

    /// Get the frame kind (see [`kinds`]).
    #[inline]
    pub fn kind(&self) -> u8 {
        kind(self.control)
    }

    /// Get the sequence field (counter mod 4).
    #[inline]
    pub fn sequence(&self) -> u8 {
        sequence(self.control)
    }

    /// Check if this is a session-initial attach frame.
    #[inline]
    pub fn is_attach(&self) -> bool {
        self.control == 0
    }

    /// Check whether this frame is the expected reply for the given
    /// counter and kind.
    #[inline]
    pub fn matches(&self, counter: u64, kind: u8) -> bool {
        matches_expected(self.control, counter, kind)
    }
}
