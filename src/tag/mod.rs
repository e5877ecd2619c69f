//! Tag handle abstraction.
//!
//! The exchange protocol drives a connected tag through this trait; it
//! never sees discovery or the radio. A handle is stateful and not safe
//! for concurrent access, so the session owns it exclusively for its
//! whole lifetime.
//!
//! # Implementations
//!
//! - **`MemoryTag`**: emulated tag over shared in-memory storage, used by
//!   the demos and tests
//! - Hardware-backed handles live with the device layer that produced
//!   them; any connected NDEF tag can be adapted to this trait

mod attribute;
mod memory;

pub use attribute::{AttributeBlock, ATTRIBUTE_BLOCK_SIZE};
pub use memory::{MemoryTag, TagStore};

use std::io;

use async_trait::async_trait;

/// A connected NDEF tag.
///
/// `read_message`/`write_message` operate on the tag's NDEF data area as
/// a whole — one message in, one message out. Tag families that expose a
/// raw attribute block (Type 3) additionally implement the attribute
/// accessors; the default implementations report the capability as
/// absent.
#[async_trait]
pub trait TagHandle: Send {
    /// Read the current NDEF message bytes from the data area.
    async fn read_message(&mut self) -> io::Result<Vec<u8>>;

    /// Replace the NDEF data area with a new message.
    async fn write_message(&mut self, message: &[u8]) -> io::Result<()>;

    /// Whether this tag family exposes a raw attribute block.
    fn has_attribute_block(&self) -> bool {
        false
    }

    /// Read the raw attribute block.
    async fn read_attribute_block(&mut self) -> io::Result<[u8; ATTRIBUTE_BLOCK_SIZE]> {
        Err(unsupported())
    }

    /// Write the raw attribute block.
    async fn write_attribute_block(&mut self, _block: &[u8; ATTRIBUTE_BLOCK_SIZE]) -> io::Result<()> {
        Err(unsupported())
    }
}

fn unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "tag has no attribute block")
}
