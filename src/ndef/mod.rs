//! NFC Data Exchange Format: messages made of typed records.
//!
//! Only what the demo needs is decoded into structured records: URI (`U`)
//! and text (`T`). Every other record is carried through as a [`RawRecord`].

mod message;
mod record;
mod text;
mod uri;

pub use message::{Message, Records};
pub use record::{RawRecord, Record, RecordKind, Tnf, MAX_ID_LEN, MAX_PAYLOAD_LEN, MAX_TYPE_LEN};
pub use text::{TextRecord, MAX_LANG_LEN, MAX_TEXT_LEN};
pub use uri::{UriPrefix, UriRecord, MAX_URI_LEN};

/// Largest encoded message handled here, the NDEF area of an M24LR04E-R.
///
/// Every record size limit below follows from it, so any record that fits
/// on the tag can be decoded.
pub const MAX_MESSAGE_LEN: usize = 503;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A fixed-capacity buffer could not hold the data.
    BufferFull,
    /// The input ended in the middle of a record.
    Truncated,
    ChunkedRecord,
    InvalidUtf8,
    UnknownUriPrefix(u8),
    /// Not a record type that is decoded into a structured record.
    UnknownType,
    Utf16Text,
}
