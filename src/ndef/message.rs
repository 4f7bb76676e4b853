use heapless::Vec;

use super::record::{MB, ME};
use super::{Error, Record, Tnf, MAX_MESSAGE_LEN};

/// An ordered list of NDEF records.
///
/// Records are kept encoded and decoded one at a time while iterating, so
/// the number of records is only bounded by [`MAX_MESSAGE_LEN`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    bytes: Vec<u8, MAX_MESSAGE_LEN>,
    /// Offset of the last record header, the one carrying ME.
    last: Option<usize>,
    len: usize,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. On error the message is left as it was.
    pub fn add_record(&mut self, record: impl Into<Record>) -> Result<(), Error> {
        let record = record.into();
        let start = self.bytes.len();
        let flags = if self.last.is_none() { MB | ME } else { ME };
        if let Err(e) = record.encode(flags, &mut self.bytes) {
            self.bytes.truncate(start);
            return Err(e);
        }

        if let Some(last) = self.last {
            self.bytes[last] &= !ME;
        }
        self.last = Some(start);
        if record.tnf() != Tnf::Empty {
            self.len += 1;
        }
        Ok(())
    }

    /// Number of records, empty records not counted.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, i: usize) -> Option<Record> {
        self.iter().nth(i)
    }

    pub fn iter(&self) -> Records<'_> {
        Records { buf: &self.bytes }
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.last = None;
        self.len = 0;
    }

    /// The encoded message.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Serialize all records into `out`, replacing its contents.
    ///
    /// A message without records encodes to nothing.
    pub fn encode<const N: usize>(&self, out: &mut Vec<u8, N>) -> Result<(), Error> {
        out.clear();
        out.extend_from_slice(&self.bytes)
            .map_err(|_| Error::BufferFull)
    }

    /// Parse records until the one flagged ME or the end of `buf`.
    ///
    /// Only the record framing can make this fail. A record whose content
    /// cannot be understood comes back as [`Record::Other`].
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut msg = Message::new();
        let mut pos = 0;
        while pos < buf.len() {
            let (record, header, used) = Record::decode(&buf[pos..])?;
            if record.is_some() {
                msg.len += 1;
            }
            msg.last = Some(pos);
            pos += used;
            if header & ME != 0 {
                break;
            }
        }
        msg.bytes = Vec::from_slice(&buf[..pos]).map_err(|_| Error::BufferFull)?;
        Ok(msg)
    }
}

/// Iterator over the records of a [`Message`], in order. Empty records are
/// skipped.
pub struct Records<'a> {
    buf: &'a [u8],
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while !self.buf.is_empty() {
            // framing was checked when the bytes went into the message
            let (record, _, used) = Record::decode(self.buf).ok()?;
            self.buf = self.buf.get(used..).unwrap_or(&[]);
            if record.is_some() {
                return record;
            }
        }
        None
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = Record;
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Records<'a> {
        self.iter()
    }
}
