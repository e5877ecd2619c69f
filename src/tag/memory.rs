//! In-memory emulated tag.
//!
//! `MemoryTag` implements [`TagHandle`] over shared storage so a session
//! can run without radio hardware. The paired [`TagStore`] handle is the
//! other side of the medium: demos and tests use it to play the agent
//! role (read commands, write replies) and to inject faults (mid-write
//! garbage, tag removal).

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::attribute::{AttributeBlock, ATTRIBUTE_BLOCK_SIZE};
use super::TagHandle;

#[derive(Debug, Default)]
struct TagState {
    message: Vec<u8>,
    attribute: Option<[u8; ATTRIBUTE_BLOCK_SIZE]>,
    removed: bool,
}

impl TagState {
    fn check_present(&self) -> io::Result<()> {
        if self.removed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "tag removed"));
        }
        Ok(())
    }

    fn settle_write(&mut self, len: usize) {
        if let Some(raw) = self.attribute {
            let mut attr = AttributeBlock::parse(&raw);
            attr.set_writing(false);
            attr.set_length(len as u32);
            self.attribute = Some(attr.encode());
        }
    }
}

/// Emulated tag handle over in-memory storage.
pub struct MemoryTag {
    state: Arc<Mutex<TagState>>,
}

/// Peer handle onto a [`MemoryTag`]'s storage.
///
/// Cheaply cloneable; every clone observes the same storage.
#[derive(Clone)]
pub struct TagStore {
    state: Arc<Mutex<TagState>>,
}

impl MemoryTag {
    /// Create an emulated tag without an attribute block (Type 2 family).
    pub fn new() -> (Self, TagStore) {
        Self::build(None)
    }

    /// Create an emulated tag with an attribute block (Type 3 family).
    pub fn with_attribute_block() -> (Self, TagStore) {
        Self::build(Some(AttributeBlock::new(64).encode()))
    }

    fn build(attribute: Option<[u8; ATTRIBUTE_BLOCK_SIZE]>) -> (Self, TagStore) {
        let state = Arc::new(Mutex::new(TagState {
            attribute,
            ..TagState::default()
        }));
        (
            Self {
                state: state.clone(),
            },
            TagStore { state },
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TagState> {
        self.state.lock().expect("tag state poisoned")
    }
}

#[async_trait]
impl TagHandle for MemoryTag {
    async fn read_message(&mut self) -> io::Result<Vec<u8>> {
        let state = self.lock();
        state.check_present()?;
        match state.attribute {
            // Attribute-block tags expose only the live Ln bytes, and
            // nothing at all while a write is marked in progress.
            Some(raw) => {
                let attr = AttributeBlock::parse(&raw);
                if attr.writing() {
                    return Ok(Vec::new());
                }
                let len = (attr.length() as usize).min(state.message.len());
                Ok(state.message[..len].to_vec())
            }
            None => Ok(state.message.clone()),
        }
    }

    async fn write_message(&mut self, message: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        state.check_present()?;
        state.message = message.to_vec();
        state.settle_write(message.len());
        Ok(())
    }

    fn has_attribute_block(&self) -> bool {
        self.lock().attribute.is_some()
    }

    async fn read_attribute_block(&mut self) -> io::Result<[u8; ATTRIBUTE_BLOCK_SIZE]> {
        let state = self.lock();
        state.check_present()?;
        state
            .attribute
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "tag has no attribute block"))
    }

    async fn write_attribute_block(&mut self, block: &[u8; ATTRIBUTE_BLOCK_SIZE]) -> io::Result<()> {
        let mut state = self.lock();
        state.check_present()?;
        if state.attribute.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "tag has no attribute block",
            ));
        }
        state.attribute = Some(*block);
        Ok(())
    }
}

impl TagStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, TagState> {
        self.state.lock().expect("tag state poisoned")
    }

    /// Read the raw storage contents.
    pub fn read_message(&self) -> Vec<u8> {
        self.lock().message.clone()
    }

    /// Write a complete message and settle the attribute block, the way
    /// a peer device finishes a write.
    pub fn write_message(&self, message: &[u8]) {
        let mut state = self.lock();
        state.message = message.to_vec();
        state.settle_write(message.len());
    }

    /// Write raw bytes without settling the attribute block. Use to
    /// stage a mid-write or garbage state.
    pub fn write_raw(&self, data: &[u8]) {
        self.lock().message = data.to_vec();
    }

    /// Current attribute block, if the tag family has one.
    pub fn attribute(&self) -> Option<AttributeBlock> {
        self.lock().attribute.map(|raw| AttributeBlock::parse(&raw))
    }

    /// Simulate tag removal: every later handle operation fails with an
    /// I/O error.
    pub fn remove(&self) {
        self.lock().removed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_back_written_message() {
        let (mut tag, _store) = MemoryTag::new();
        tag.write_message(b"hello").await.unwrap();
        assert_eq!(tag.read_message().await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_store_and_handle_share_storage() {
        let (mut tag, store) = MemoryTag::new();
        store.write_message(b"from peer");
        assert_eq!(tag.read_message().await.unwrap(), b"from peer");
        tag.write_message(b"from manager").await.unwrap();
        assert_eq!(store.read_message(), b"from manager");
    }

    #[tokio::test]
    async fn test_removed_tag_fails_io() {
        let (mut tag, store) = MemoryTag::new();
        store.remove();
        let err = tag.read_message().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(tag.write_message(b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_attribute_block_capability() {
        let (mut plain, _) = MemoryTag::new();
        assert!(!plain.has_attribute_block());
        assert!(plain.read_attribute_block().await.is_err());

        let (mut tag, _) = MemoryTag::with_attribute_block();
        assert!(tag.has_attribute_block());
        let attr = AttributeBlock::parse(&tag.read_attribute_block().await.unwrap());
        assert!(!attr.writing());
        assert_eq!(attr.length(), 0);
    }

    #[tokio::test]
    async fn test_write_settles_attribute_block() {
        let (mut tag, store) = MemoryTag::with_attribute_block();
        tag.write_message(b"abcdef").await.unwrap();
        let attr = store.attribute().unwrap();
        assert!(!attr.writing());
        assert_eq!(attr.length(), 6);
    }

    #[tokio::test]
    async fn test_write_in_progress_hides_message() {
        let (mut tag, _store) = MemoryTag::with_attribute_block();
        tag.write_message(b"reply").await.unwrap();
        assert_eq!(tag.read_message().await.unwrap(), b"reply");

        let mut attr = AttributeBlock::parse(&tag.read_attribute_block().await.unwrap());
        attr.set_writing(true);
        attr.set_length(0);
        tag.write_attribute_block(&attr.encode()).await.unwrap();

        // Consumed: the stored bytes are no longer observable.
        assert!(tag.read_message().await.unwrap().is_empty());
    }
}
