//! NDEF record type.
//!
//! A record is a typed binary payload. The bridge only ever writes
//! NFC-Forum well-known types (TNF 0x01), whose external form is the
//! type name under the `urn:nfc:wkt:` prefix.

use bytes::Bytes;

/// Type Name Format: NFC Forum well-known type.
pub const TNF_WELL_KNOWN: u8 = 0x01;

/// External-form prefix for well-known types.
pub const WKT_PREFIX: &str = "urn:nfc:wkt:";

/// Raw type of the reserved PHD record.
pub const PHD_TYPE: &[u8] = b"PHD";

/// External-form URI of the PHD record type.
pub const PHD_TYPE_NAME: &str = "urn:nfc:wkt:PHD";

/// A single NDEF record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Type Name Format (3 bits on the wire).
    pub tnf: u8,
    /// Record type bytes (e.g. `b"PHD"`).
    pub record_type: Bytes,
    /// Record id (empty if absent).
    pub id: Bytes,
    /// Payload bytes.
    pub payload: Bytes,
}

impl Record {
    /// Create a well-known-type record with no id.
    pub fn well_known(record_type: &'static [u8], payload: Bytes) -> Self {
        Self {
            tnf: TNF_WELL_KNOWN,
            record_type: Bytes::from_static(record_type),
            id: Bytes::new(),
            payload,
        }
    }

    /// Create a PHD record carrying the given frame bytes.
    pub fn phd(payload: Bytes) -> Self {
        Self::well_known(PHD_TYPE, payload)
    }

    /// The record type in external form.
    ///
    /// Well-known types map to `urn:nfc:wkt:<type>`; anything else is
    /// rendered as the raw type bytes (lossy UTF-8).
    ///
    /// # Example
    ///
    /// ```
    /// use phdc_bridge::ndef::Record;
    /// use bytes::Bytes;
    ///
    /// let record = Record::phd(Bytes::new());
    /// assert_eq!(record.type_name(), "urn:nfc:wkt:PHD");
    /// ```
    pub fn type_name(&self) -> String {
        let name = String::from_utf8_lossy(&self.record_type);
        if self.tnf == TNF_WELL_KNOWN {
            format!("{WKT_PREFIX}{name}")
        } else {
            name.into_owned()
        }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Check if this is a PHD record.
    #[inline]
    pub fn is_phd(&self) -> bool {
        self.tnf == TNF_WELL_KNOWN && self.record_type == PHD_TYPE
    }
}
