//! Tag exchange protocol.
//!
//! One half-duplex round trip per sequence step: write a command frame
//! into the tag's NDEF area, then poll the same area until the matching
//! response frame shows up. The storage medium gives no "message
//! arrived" signal, so the poll loop has to tell a genuinely new reply
//! apart from whatever was left in the data area — the sequence field of
//! the control byte carries that distinction.
//!
//! The session's sequence counter lives here and advances by exactly one
//! per completed write or matched read; a timeout or a stale frame never
//! moves it.

use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::error::Result;
use crate::ndef::{Message, Record};
use crate::protocol::{hex, kinds, Frame};
use crate::tag::{AttributeBlock, TagHandle};

/// Default delay between tag read attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default overall reply timeout (100 poll intervals).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Per-session exchange state machine.
///
/// Owns the tag handle for the session's lifetime — the underlying tag
/// API is not safe for concurrent access, so exclusivity is by
/// construction, not by locking.
pub struct TagExchange<T> {
    tag: T,
    counter: u64,
    poll_interval: Duration,
}

impl<T: TagHandle> TagExchange<T> {
    /// Create an exchange with the default poll interval.
    pub fn new(tag: T) -> Self {
        Self::with_poll_interval(tag, DEFAULT_POLL_INTERVAL)
    }

    /// Create an exchange with a custom poll interval (fast clocks in
    /// tests, slower cadence for fragile tags).
    pub fn with_poll_interval(tag: T, poll_interval: Duration) -> Self {
        Self {
            tag,
            counter: 1,
            poll_interval,
        }
    }

    /// Current sequence counter value.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Write step: encode the APDU as a command frame, wrap it in a PHD
    /// record, and replace the tag's NDEF message with it.
    ///
    /// A zero-length APDU is a valid keep-alive write.
    ///
    /// # Errors
    ///
    /// A tag I/O error is a link failure and is fatal for the session.
    pub async fn write_apdu(&mut self, apdu: Bytes) -> Result<()> {
        let frame = Frame::command(self.counter, apdu);
        let data = frame.to_bytes();
        tracing::info!(">>> {}", hex(&data));
        let message = Message::new(Record::phd(data.into()));
        self.tag.write_message(&message.to_bytes()).await?;
        self.counter += 1;
        Ok(())
    }

    /// Read step: poll the tag until the expected response frame appears
    /// or `timeout` elapses.
    ///
    /// Returns `Ok(Some(payload))` on a match and `Ok(None)` on timeout.
    /// Unparseable messages (the peer is mid-write), non-PHD record
    /// types, malformed frames, and well-formed frames with the wrong
    /// sequence or kind all just keep the loop polling.
    ///
    /// # Errors
    ///
    /// A tag I/O error is a link failure and is fatal for the session.
    pub async fn read_apdu(&mut self, timeout: Duration) -> Result<Option<Bytes>> {
        let deadline = Instant::now() + timeout;
        loop {
            tokio::time::sleep(self.poll_interval).await;
            let raw = self.tag.read_message().await?;

            match Message::parse(&raw) {
                Ok(message) if message.is_phd() => {
                    match Frame::parse(message.first().payload()) {
                        Ok(frame) if frame.matches(self.counter, kinds::RESPONSE) => {
                            tracing::info!("<<< {}", hex(&frame.to_bytes()));
                            self.mark_consumed().await?;
                            self.counter += 1;
                            return Ok(Some(frame.payload_bytes()));
                        }
                        Ok(frame) => {
                            tracing::trace!(
                                control = frame.control(),
                                "stale frame, waiting for sequence {}",
                                self.counter % 4
                            );
                        }
                        Err(_) => {
                            tracing::trace!("malformed PHD frame, still waiting");
                        }
                    }
                }
                Ok(message) => {
                    tracing::trace!("ignoring {} message", message.type_name());
                }
                Err(e) if e.is_transient() => {
                    tracing::trace!("data area not ready: {e}");
                }
                Err(e) => {
                    tracing::trace!("unreadable NDEF data: {e}");
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    /// Mark the just-consumed reply so a later poll cannot re-observe
    /// it. Only tag families with an attribute block support this; for
    /// the rest the sequence check alone screens out leftovers.
    async fn mark_consumed(&mut self) -> Result<()> {
        if !self.tag.has_attribute_block() {
            return Ok(());
        }
        let raw = self.tag.read_attribute_block().await?;
        let mut attr = AttributeBlock::parse(&raw);
        attr.set_writing(true);
        attr.set_length(0);
        self.tag.write_attribute_block(&attr.encode()).await?;
        Ok(())
    }
}
