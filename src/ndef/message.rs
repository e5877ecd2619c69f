//! NDEF message parsing and serialization.
//!
//! Wire layout per record:
//! ```text
//! ┌───────┬──────────┬─────────────┬──────────┬──────┬────┬─────────┐
//! │ flags │ type len │ payload len │ [id len] │ type │ id │ payload │
//! │ 1 byte│ 1 byte   │ 1 or 4 bytes│ 0/1 byte │      │    │         │
//! └───────┴──────────┴─────────────┴──────────┴──────┴────┴─────────┘
//! ```
//!
//! Flags byte: MB (0x80) message begin, ME (0x40) message end, CF (0x20)
//! chunk, SR (0x10) short record (1-byte payload length), IL (0x08) id
//! length present, low 3 bits TNF.
//!
//! A declared length that exceeds the available bytes yields
//! [`NdefError::Length`] — the transient state observed while the peer
//! is still writing the data area.

use bytes::Bytes;

use super::record::Record;
use super::NdefError;

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;

/// An ordered sequence of NDEF records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    records: Vec<Record>,
}

impl Message {
    /// Create a single-record message.
    pub fn new(record: Record) -> Self {
        Self {
            records: vec![record],
        }
    }

    /// Create a message from a non-empty record sequence.
    pub fn from_records(records: Vec<Record>) -> Self {
        debug_assert!(!records.is_empty());
        Self { records }
    }

    /// The records in message order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The first record.
    pub fn first(&self) -> &Record {
        &self.records[0]
    }

    /// The message type: the first record's type in external form.
    pub fn type_name(&self) -> String {
        self.first().type_name()
    }

    /// Check if this is a PHD message (first record has the PHD type).
    pub fn is_phd(&self) -> bool {
        self.first().is_phd()
    }

    /// Parse a message from raw NDEF data.
    ///
    /// Trailing bytes after the ME record are tolerated; tag data areas
    /// commonly carry stale padding past the live message.
    ///
    /// # Errors
    ///
    /// [`NdefError::Length`] when the data ends before a declared
    /// length is satisfied (transient mid-write state), and
    /// [`NdefError::Format`] for structural violations.
    pub fn parse(data: &[u8]) -> Result<Self, NdefError> {
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            need(data, offset + 2)?;
            let flags = data[offset];
            let tnf = flags & TNF_MASK;
            let type_len = data[offset + 1] as usize;
            let mut pos = offset + 2;

            if flags & FLAG_CF != 0 {
                return Err(NdefError::Format("chunked records not supported"));
            }
            if records.is_empty() && flags & FLAG_MB == 0 {
                return Err(NdefError::Format("first record missing MB flag"));
            }

            let payload_len = if flags & FLAG_SR != 0 {
                need(data, pos + 1)?;
                let len = data[pos] as usize;
                pos += 1;
                len
            } else {
                need(data, pos + 4)?;
                let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
                pos += 4;
                len as usize
            };

            let id_len = if flags & FLAG_IL != 0 {
                need(data, pos + 1)?;
                let len = data[pos] as usize;
                pos += 1;
                len
            } else {
                0
            };

            need(data, pos + type_len + id_len + payload_len)?;
            let record_type = Bytes::copy_from_slice(&data[pos..pos + type_len]);
            pos += type_len;
            let id = Bytes::copy_from_slice(&data[pos..pos + id_len]);
            pos += id_len;
            let payload = Bytes::copy_from_slice(&data[pos..pos + payload_len]);
            pos += payload_len;

            records.push(Record {
                tnf,
                record_type,
                id,
                payload,
            });

            if flags & FLAG_ME != 0 {
                return Ok(Self { records });
            }
            offset = pos;
        }
    }

    /// Serialize the message to raw NDEF data.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let last = self.records.len() - 1;

        for (i, record) in self.records.iter().enumerate() {
            let short = record.payload.len() < 256;
            let mut flags = record.tnf & TNF_MASK;
            if i == 0 {
                flags |= FLAG_MB;
            }
            if i == last {
                flags |= FLAG_ME;
            }
            if short {
                flags |= FLAG_SR;
            }
            if !record.id.is_empty() {
                flags |= FLAG_IL;
            }

            buf.push(flags);
            buf.push(record.record_type.len() as u8);
            if short {
                buf.push(record.payload.len() as u8);
            } else {
                buf.extend_from_slice(&(record.payload.len() as u32).to_be_bytes());
            }
            if !record.id.is_empty() {
                buf.push(record.id.len() as u8);
            }
            buf.extend_from_slice(&record.record_type);
            buf.extend_from_slice(&record.id);
            buf.extend_from_slice(&record.payload);
        }

        buf
    }
}

fn need(data: &[u8], len: usize) -> Result<(), NdefError> {
    if data.len() < len {
        return Err(NdefError::Length {
            needed: len,
            available: data.len(),
        });
    }
    Ok(())
}
