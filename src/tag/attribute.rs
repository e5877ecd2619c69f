//! Type 3 tag NDEF attribute information block.
//!
//! Tag families derived from FeliCa keep a 16-byte attribute block in
//! front of the NDEF data area:
//! ```text
//! ┌─────┬─────┬─────┬───────┬────────┬────────┬────┬────────┬──────────┐
//! │ Ver │ Nbr │ Nbw │ Nmaxb │ unused │ WriteF │ RW │ Ln     │ Checksum │
//! │ [0] │ [1] │ [2] │ [3-4] │ [5-8]  │ [9]    │[10]│ [11-13]│ [14-15]  │
//! └─────┴─────┴─────┴───────┴────────┴────────┴────┴────────┴──────────┘
//! ```
//! Multi-byte fields are Big Endian. `WriteF = 0x0F` marks a write in
//! progress; `Ln` is the live NDEF data length. The checksum is the
//! 16-bit sum of bytes 0-13 and is recomputed on every encode.
//!
//! The exchange protocol toggles `WriteF`/`Ln` after consuming a reply
//! so a later poll cannot re-observe it.

/// Attribute block size in bytes (fixed, exactly 16).
pub const ATTRIBUTE_BLOCK_SIZE: usize = 16;

/// WriteF value marking a write in progress.
const WRITE_IN_PROGRESS: u8 = 0x0F;

/// WriteF value marking the data area settled.
const WRITE_DONE: u8 = 0x00;

/// Decoded attribute block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBlock {
    /// Mapping version (major.minor packed in one byte, usually 0x10).
    pub version: u8,
    /// Blocks readable per command.
    pub nbr: u8,
    /// Blocks writable per command.
    pub nbw: u8,
    /// Maximum data-area size in blocks.
    pub nmaxb: u16,
    /// Write-in-progress flag.
    writing: bool,
    /// Data area is writable.
    pub writable: bool,
    /// Live NDEF data length in bytes (24-bit on the wire).
    length: u32,
}

impl AttributeBlock {
    /// Create a fresh attribute block for an empty, writable data area.
    pub fn new(nmaxb: u16) -> Self {
        Self {
            version: 0x10,
            nbr: 4,
            nbw: 1,
            nmaxb,
            writing: false,
            writable: true,
            length: 0,
        }
    }

    /// Decode an attribute block from its 16 raw bytes.
    ///
    /// The stored checksum is not verified; encoding always emits a
    /// correct one.
    pub fn parse(raw: &[u8; ATTRIBUTE_BLOCK_SIZE]) -> Self {
        Self {
            version: raw[0],
            nbr: raw[1],
            nbw: raw[2],
            nmaxb: u16::from_be_bytes([raw[3], raw[4]]),
            writing: raw[9] == WRITE_IN_PROGRESS,
            writable: raw[10] != 0,
            length: u32::from_be_bytes([0, raw[11], raw[12], raw[13]]),
        }
    }

    /// Encode to 16 raw bytes with a freshly computed checksum.
    pub fn encode(&self) -> [u8; ATTRIBUTE_BLOCK_SIZE] {
        let mut raw = [0u8; ATTRIBUTE_BLOCK_SIZE];
        raw[0] = self.version;
        raw[1] = self.nbr;
        raw[2] = self.nbw;
        raw[3..5].copy_from_slice(&self.nmaxb.to_be_bytes());
        raw[9] = if self.writing { WRITE_IN_PROGRESS } else { WRITE_DONE };
        raw[10] = u8::from(self.writable);
        let len = self.length.to_be_bytes();
        raw[11..14].copy_from_slice(&len[1..4]);
        let checksum: u16 = raw[..14].iter().map(|&b| u16::from(b)).sum();
        raw[14..16].copy_from_slice(&checksum.to_be_bytes());
        raw
    }

    /// Whether a write is marked in progress.
    #[inline]
    pub fn writing(&self) -> bool {
        self.writing
    }

    /// Set or clear the write-in-progress flag.
    pub fn set_writing(&mut self, writing: bool) {
        self.writing = writing;
    }

    /// The live NDEF data length.
    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Set the live NDEF data length (capped to the 24-bit field).
    pub fn set_length(&mut self, length: u32) {
        self.length = length & 0x00FF_FFFF;
    }
}
