//! # phdc-bridge
//!
//! Transport bridge carrying IEEE 11073 Personal Health Device (PHD)
//! APDUs over an NFC tag's NDEF storage area, using the reserved
//! well-known "PHD" record type.
//!
//! The tag is a synchronous, poll-driven storage medium with no "message
//! arrived" signal; this crate makes it look like an asynchronous,
//! bidirectional byte-stream to the application.
//!
//! ## Architecture
//!
//! - **Frame codec** ([`protocol`]): one-byte control header (2-bit
//!   rolling sequence + 2-bit kind) in front of each APDU
//! - **Tag exchange** ([`TagExchange`]): write-then-poll-for-reply, one
//!   half-duplex round trip per sequence step
//! - **Session bridge** ([`PhdcBridge`]): two unbounded queues and a
//!   dedicated session task that owns all tag I/O
//!
//! ## Example
//!
//! ```ignore
//! use phdc_bridge::{PhdcBridge, Recv};
//!
//! #[tokio::main]
//! async fn main() -> phdc_bridge::Result<()> {
//!     let mut bridge = PhdcBridge::builder().attach(tag).await?;
//!     loop {
//!         match bridge.recv(None).await {
//!             Recv::Apdu(apdu) => bridge.send(process(apdu))?,
//!             Recv::Shutdown => break,
//!             Recv::Empty => unreachable!("no timeout given"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod ndef;
pub mod protocol;
pub mod tag;

mod bridge;
mod exchange;

pub use bridge::{BridgeBuilder, BridgeConfig, PhdcBridge, Recv, DEFAULT_OUTBOUND_POLL};
pub use error::{PhdcError, Result};
pub use exchange::{TagExchange, DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT};
