//! Protocol module - control byte wire format and frame types.
//!
//! This module implements the PHD framing layer carried inside NDEF
//! records:
//! - one-byte control header encoding/decoding
//! - Frame struct with typed accessors

mod frame;
mod wire_format;

pub use frame::Frame;
pub use wire_format::{
    encode_control, kind, kinds, matches_expected, sequence, CONTROL_MASK, SEQUENCE_SHIFT,
};

/// Format bytes as lowercase hex for log output.
pub(crate) fn hex(data: &[u8]) -> String {
    use std::fmt::Write;

    data.iter().fold(String::with_capacity(data.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
