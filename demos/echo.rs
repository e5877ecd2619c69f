//! Echo manager - the demonstration consumer of the bridge.
//!
//! A simulated personal health device leaves an attach message on an
//! emulated tag and then answers every command with its next queued
//! measurement. The manager echoes each received APDU back reversed,
//! the way the reference PHDC test manager does. When the device runs
//! out of measurements it leaves the field, ending the session.
//!
//! Run with:
//!
//! ```text
//! cargo run --example echo
//! ```

use std::time::Duration;

use bytes::Bytes;
use phdc_bridge::ndef::{Message, Record};
use phdc_bridge::protocol::{kinds, Frame};
use phdc_bridge::tag::{MemoryTag, TagStore};
use phdc_bridge::{PhdcBridge, Recv};

/// Measurements the simulated device sends, one per exchange.
const SAMPLES: &[&[u8]] = &[b"\x36\x50\x01\x02", b"\x36\x50\x03\x04", b"\x36\x50\x05\x06"];

/// The device side of the protocol, driven through the tag store.
struct SimDevice {
    store: TagStore,
    counter: u64,
}

impl SimDevice {
    fn new(store: TagStore) -> Self {
        Self { store, counter: 1 }
    }

    /// Poll the data area until the expected command frame appears.
    async fn expect_command(&mut self) -> Bytes {
        loop {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let Ok(message) = Message::parse(&self.store.read_message()) else {
                continue;
            };
            if !message.is_phd() {
                continue;
            }
            let Ok(frame) = Frame::parse(message.first().payload()) else {
                continue;
            };
            if frame.matches(self.counter, kinds::COMMAND) {
                self.counter += 1;
                return frame.payload_bytes();
            }
        }
    }

    /// Write a response frame carrying the given APDU.
    fn reply(&mut self, apdu: &[u8]) {
        let frame = Frame::response(self.counter, Bytes::copy_from_slice(apdu));
        let message = Message::new(Record::phd(frame.to_bytes().into()));
        self.store.write_message(&message.to_bytes());
        self.counter += 1;
    }
}

/// Simulated device: attach, deliver samples, leave the field.
async fn run_device(store: TagStore) {
    let mut device = SimDevice::new(store);
    let mut samples = SAMPLES.iter();

    loop {
        let command = device.expect_command().await;
        if !command.is_empty() {
            tracing::info!("[device] echo received: {:02x?}", &command[..]);
        }
        match samples.next() {
            Some(sample) => device.reply(sample),
            None => {
                tracing::info!("[device] out of samples, leaving the field");
                device.store.remove();
                return;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let (tag, store) = MemoryTag::new();

    // The device announces itself before discovery.
    let attach = Frame::attach(Bytes::from_static(b"\xE2\x00\x00\x32"));
    store.write_message(&Message::new(Record::phd(attach.to_bytes().into())).to_bytes());
    let device = tokio::spawn(run_device(store));

    let mut bridge = PhdcBridge::builder().attach(tag).await?;

    tracing::info!("entering echo loop");
    loop {
        match bridge.recv(None).await {
            Recv::Apdu(apdu) => {
                tracing::info!("[ieee] <<< {:02x?}", &apdu[..]);
                let reversed: Vec<u8> = apdu.iter().rev().copied().collect();
                tokio::time::sleep(Duration::from_millis(200)).await;
                tracing::info!("[ieee] >>> {:02x?}", reversed);
                if bridge.send(reversed).is_err() {
                    break;
                }
            }
            Recv::Shutdown => break,
            Recv::Empty => unreachable!("no timeout given"),
        }
    }
    tracing::info!("leaving echo loop");

    if let Err(e) = bridge.join().await {
        tracing::info!("session ended: {e}");
    }
    device.await?;
    Ok(())
}
