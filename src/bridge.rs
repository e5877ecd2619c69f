//! Session bridge: the two queues and the loop that drives the tag.
//!
//! The bridge decouples the tag's polling cadence from the
//! application's processing cadence with two unbounded channels and a
//! dedicated session task that owns all tag I/O:
//!
//! ```text
//! send() ──► outbound ──► session loop ──► TagExchange ──► tag storage
//! recv() ◄── inbound  ◄───────┘
//! ```
//!
//! The loop performs one exchange per iteration: pop an outbound APDU
//! (substituting a keep-alive if the application has nothing to say —
//! the medium has no notion of "idle"), write it, poll for the reply,
//! deliver the result inbound. Only a tag I/O failure ends the session;
//! it is reported to the application as the end-of-session marker.
//!
//! # Example
//!
//! ```no_run
//! use phdc_bridge::{PhdcBridge, Recv};
//! use phdc_bridge::tag::MemoryTag;
//!
//! # async fn run() -> phdc_bridge::Result<()> {
//! let (tag, _store) = MemoryTag::new();
//! let mut bridge = PhdcBridge::start(tag);
//!
//! bridge.send(b"\x01\x02".as_ref())?;
//! match bridge.recv(None).await {
//!     Recv::Apdu(apdu) => println!("reply: {apdu:?}"),
//!     Recv::Empty => unreachable!("no timeout given"),
//!     Recv::Shutdown => println!("session ended"),
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{PhdcError, Result};
use crate::exchange::{TagExchange, DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT};
use crate::ndef::Message;
use crate::protocol::Frame;
use crate::tag::TagHandle;

/// Default timeout for one outbound-queue poll per loop iteration.
pub const DEFAULT_OUTBOUND_POLL: Duration = Duration::from_millis(100);

/// Outcome of a [`PhdcBridge::recv`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recv {
    /// An APDU delivered by the peer.
    Apdu(Bytes),
    /// Nothing arrived before the timeout elapsed.
    Empty,
    /// The session ended; no further APDUs will arrive.
    Shutdown,
}

/// Timing configuration for a session.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Delay between tag read attempts in the read step.
    pub poll_interval: Duration,
    /// Overall reply timeout per exchange.
    pub read_timeout: Duration,
    /// How long each loop iteration waits for application data before
    /// writing a keep-alive.
    pub outbound_poll: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
            outbound_poll: DEFAULT_OUTBOUND_POLL,
        }
    }
}

/// Builder for configuring and starting a session.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use phdc_bridge::PhdcBridge;
/// use phdc_bridge::tag::MemoryTag;
///
/// let (tag, _store) = MemoryTag::new();
/// let bridge = PhdcBridge::builder()
///     .poll_interval(Duration::from_millis(5))
///     .read_timeout(Duration::from_millis(500))
///     .start(tag);
/// ```
#[derive(Debug, Default)]
pub struct BridgeBuilder {
    config: BridgeConfig,
    initial_apdu: Option<Bytes>,
}

impl BridgeBuilder {
    /// Create a builder with default timing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay between tag read attempts.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the overall reply timeout per exchange.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the outbound-queue poll timeout per loop iteration.
    pub fn outbound_poll(mut self, timeout: Duration) -> Self {
        self.config.outbound_poll = timeout;
        self
    }

    /// Pre-load the inbound queue with the initial APDU carried by the
    /// attach message.
    pub fn initial_apdu(mut self, apdu: impl Into<Bytes>) -> Self {
        self.initial_apdu = Some(apdu.into());
        self
    }

    /// Read the discovered tag's current message, require a PHD attach
    /// frame (control byte 0), seed the inbound queue with its payload,
    /// and start the session.
    ///
    /// # Errors
    ///
    /// Fails if the tag cannot be read or its current message is not a
    /// valid attach message.
    pub async fn attach<T>(mut self, mut tag: T) -> Result<PhdcBridge>
    where
        T: TagHandle + 'static,
    {
        let raw = tag.read_message().await?;
        let message = Message::parse(&raw)?;
        if !message.is_phd() {
            return Err(PhdcError::Protocol(format!(
                "expected a PHD attach message, found {}",
                message.type_name()
            )));
        }
        let frame = Frame::parse(message.first().payload())?;
        if !frame.is_attach() {
            return Err(PhdcError::Protocol(format!(
                "attach message has control byte {:#04x}, expected 0x00",
                frame.control()
            )));
        }
        self.initial_apdu = Some(frame.payload_bytes());
        Ok(self.start(tag))
    }

    /// Start the session task and return the application handle.
    ///
    /// Must be called within a tokio runtime.
    pub fn start<T>(self, tag: T) -> PhdcBridge
    where
        T: TagHandle + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        if let Some(apdu) = self.initial_apdu {
            deliver(&inbound_tx, Some(apdu));
        }

        let exchange = TagExchange::with_poll_interval(tag, self.config.poll_interval);
        let session = tokio::spawn(session_loop(exchange, outbound_rx, inbound_tx, self.config));

        PhdcBridge {
            outbound: outbound_tx,
            inbound: inbound_rx,
            session,
        }
    }
}

/// A running PHDC session.
///
/// The application is the sole producer of the outbound queue and the
/// sole consumer of the inbound queue; all tag I/O happens on the
/// session task. Dropping the bridge ends the session cleanly.
#[derive(Debug)]
pub struct PhdcBridge {
    outbound: mpsc::UnboundedSender<Bytes>,
    inbound: mpsc::UnboundedReceiver<Option<Bytes>>,
    session: JoinHandle<Result<()>>,
}

impl PhdcBridge {
    /// Create a session builder.
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Start a session with default timing.
    ///
    /// Must be called within a tokio runtime.
    pub fn start<T>(tag: T) -> Self
    where
        T: TagHandle + 'static,
    {
        BridgeBuilder::new().start(tag)
    }

    /// Queue an APDU for transmission. Never blocks, never drops.
    ///
    /// # Errors
    ///
    /// Returns [`PhdcError::SessionClosed`] if the session task has
    /// terminated.
    pub fn send(&self, apdu: impl Into<Bytes>) -> Result<()> {
        self.outbound
            .send(apdu.into())
            .map_err(|_| PhdcError::SessionClosed)
    }

    /// Receive the next inbound APDU.
    ///
    /// With `timeout = None` this blocks until an APDU arrives or the
    /// session ends; with a finite timeout it returns [`Recv::Empty`]
    /// when nothing arrives in time.
    pub async fn recv(&mut self, timeout: Option<Duration>) -> Recv {
        let item = match timeout {
            None => self.inbound.recv().await,
            Some(timeout) => match tokio::time::timeout(timeout, self.inbound.recv()).await {
                Ok(item) => item,
                Err(_) => return Recv::Empty,
            },
        };
        match item {
            Some(Some(apdu)) => Recv::Apdu(apdu),
            // The end-of-session marker, or the loop is gone entirely.
            Some(None) | None => Recv::Shutdown,
        }
    }

    /// Wait for the session loop to exit and return its result.
    ///
    /// The loop only exits on a link failure, so this blocks until the
    /// tag goes away.
    pub async fn join(self) -> Result<()> {
        self.session
            .await
            .map_err(|e| PhdcError::Protocol(format!("session task failed: {e}")))?
    }
}

/// Deliver a read-step result to the inbound queue.
///
/// Zero-length replies are keep-alive padding and stay invisible to the
/// application; "no reply" becomes the end-of-session marker.
fn deliver(inbound: &mpsc::UnboundedSender<Option<Bytes>>, reply: Option<Bytes>) {
    match reply {
        Some(apdu) if apdu.is_empty() => {}
        item => {
            let _ = inbound.send(item);
        }
    }
}

/// The session loop: one exchange per iteration until the link fails or
/// the application goes away.
async fn session_loop<T: TagHandle>(
    mut exchange: TagExchange<T>,
    mut outbound: mpsc::UnboundedReceiver<Bytes>,
    inbound: mpsc::UnboundedSender<Option<Bytes>>,
    config: BridgeConfig,
) -> Result<()> {
    tracing::info!("entering phdc session loop");
    let result = loop {
        let apdu = match tokio::time::timeout(config.outbound_poll, outbound.recv()).await {
            Ok(Some(apdu)) => apdu,
            Ok(None) => {
                // Application dropped its handle; nobody is left to
                // observe replies.
                tracing::debug!("application handle dropped, ending session");
                break Ok(());
            }
            Err(_) => Bytes::new(),
        };

        if let Err(e) = exchange.write_apdu(apdu).await {
            let _ = inbound.send(None);
            break Err(e);
        }

        match exchange.read_apdu(config.read_timeout).await {
            Ok(reply) => deliver(&inbound, reply),
            Err(e) => {
                let _ = inbound.send(None);
                break Err(e);
            }
        }
    };
    tracing::info!("leaving phdc session loop");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndef::Record;
    use crate::protocol::kinds;
    use crate::tag::MemoryTag;

    fn fast_builder() -> BridgeBuilder {
        PhdcBridge::builder()
            .poll_interval(Duration::from_millis(1))
            .read_timeout(Duration::from_millis(50))
            .outbound_poll(Duration::from_millis(5))
    }

    fn phd_message(frame: &Frame) -> Vec<u8> {
        Message::new(Record::phd(frame.to_bytes().into())).to_bytes()
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_apdu_is_delivered_first() {
        let (tag, _store) = MemoryTag::new();
        let mut bridge = fast_builder()
            .initial_apdu(b"\xE2\x00".as_ref())
            .start(tag);

        match bridge.recv(Some(Duration::from_millis(10))).await {
            Recv::Apdu(apdu) => assert_eq!(&apdu[..], b"\xE2\x00"),
            other => panic!("expected initial apdu, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_initial_apdu_is_filtered() {
        let (tag, _store) = MemoryTag::new();
        let mut bridge = fast_builder().initial_apdu(Bytes::new()).start(tag);

        assert_eq!(bridge.recv(Some(Duration::from_millis(10))).await, Recv::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_timeout_is_empty_not_shutdown() {
        let (tag, _store) = MemoryTag::new();
        let mut bridge = fast_builder().start(tag);

        assert_eq!(bridge.recv(Some(Duration::from_millis(20))).await, Recv::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_written_without_application_data() {
        let (tag, store) = MemoryTag::new();
        let _bridge = fast_builder().start(tag);

        // Let a few loop iterations pass with an empty outbound queue.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let message = Message::parse(&store.read_message()).unwrap();
        assert!(message.is_phd());
        let frame = Frame::parse(message.first().payload()).unwrap();
        assert_eq!(frame.kind(), kinds::COMMAND);
        assert!(frame.payload().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_failure_delivers_shutdown_once() {
        let (tag, store) = MemoryTag::new();
        let mut bridge = fast_builder().start(tag);
        store.remove();

        assert_eq!(bridge.recv(None).await, Recv::Shutdown);
        // The loop is gone; a second recv reports shutdown, not a hang.
        assert_eq!(bridge.recv(Some(Duration::from_millis(10))).await, Recv::Shutdown);

        assert!(matches!(bridge.join().await, Err(PhdcError::Link(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_after_link_failure_is_session_closed() {
        let (tag, store) = MemoryTag::new();
        let mut bridge = fast_builder().start(tag);
        store.remove();

        assert_eq!(bridge.recv(None).await, Recv::Shutdown);
        // Give the loop a moment to fully unwind.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(
            bridge.send(b"x".as_ref()),
            Err(PhdcError::SessionClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout_delivers_shutdown_and_loop_survives() {
        let (tag, store) = MemoryTag::new();
        let mut bridge = fast_builder().start(tag);

        // No agent replies: the first exchange times out.
        assert_eq!(bridge.recv(None).await, Recv::Shutdown);

        // The session is still alive; a reply to a later exchange still
        // gets through. The first command (sequence 1) already timed
        // out, so the agent answers the second (sequence 2) only.
        let store2 = store.clone();
        let agent = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(2)).await;
                let raw = store2.read_message();
                if let Ok(message) = Message::parse(&raw) {
                    if message.is_phd() {
                        if let Ok(frame) = Frame::parse(message.first().payload()) {
                            if frame.kind() == kinds::COMMAND && frame.sequence() == 2 {
                                store2.write_message(&phd_message(&Frame::response(
                                    3,
                                    Bytes::from_static(b"pong"),
                                )));
                                return;
                            }
                        }
                    }
                }
            }
        });

        match bridge.recv(None).await {
            Recv::Apdu(apdu) => assert_eq!(&apdu[..], b"pong"),
            other => panic!("expected pong, got {other:?}"),
        }
        agent.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_seeds_inbound_from_tag() {
        let (tag, store) = MemoryTag::new();
        store.write_message(&phd_message(&Frame::attach(Bytes::from_static(b"\xE2\x00\x00\x32"))));

        let mut bridge = fast_builder().attach(tag).await.unwrap();
        match bridge.recv(Some(Duration::from_millis(10))).await {
            Recv::Apdu(apdu) => assert_eq!(&apdu[..], b"\xE2\x00\x00\x32"),
            other => panic!("expected attach apdu, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_attach_rejects_non_phd_message() {
        let (tag, store) = MemoryTag::new();
        let text = Message::new(Record::well_known(b"T", Bytes::from_static(b"\x02enx")));
        store.write_message(&text.to_bytes());

        let err = fast_builder().attach(tag).await.unwrap_err();
        assert!(matches!(err, PhdcError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_attach_rejects_non_attach_control_byte() {
        let (tag, store) = MemoryTag::new();
        store.write_message(&phd_message(&Frame::command(1, Bytes::from_static(b"x"))));

        let err = fast_builder().attach(tag).await.unwrap_err();
        assert!(matches!(err, PhdcError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_attach_on_empty_tag_is_ndef_error() {
        let (tag, _store) = MemoryTag::new();
        let err = fast_builder().attach(tag).await.unwrap_err();
        assert!(matches!(err, PhdcError::Ndef(_)));
    }
}
