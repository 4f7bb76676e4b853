use heapless::Vec;

use super::{Error, TextRecord, UriRecord, MAX_MESSAGE_LEN};

/// Type and id lengths are a single byte on the wire.
pub const MAX_TYPE_LEN: usize = 255;
pub const MAX_ID_LEN: usize = 255;
pub const MAX_PAYLOAD_LEN: usize = MAX_MESSAGE_LEN;

pub(crate) const MB: u8 = 0x80;
pub(crate) const ME: u8 = 0x40;
const CF: u8 = 0x20;
const SR: u8 = 0x10;
const IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;

const URI_TYPE: &[u8] = b"U";
const TEXT_TYPE: &[u8] = b"T";

/// Type Name Format, the low three bits of a record header.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tnf {
    Empty = 0,
    WellKnown = 1,
    Media = 2,
    AbsoluteUri = 3,
    External = 4,
    Unknown = 5,
    Unchanged = 6,
    Reserved = 7,
}

impl Tnf {
    fn from_header(header: u8) -> Self {
        match header & TNF_MASK {
            0 => Tnf::Empty,
            1 => Tnf::WellKnown,
            2 => Tnf::Media,
            3 => Tnf::AbsoluteUri,
            4 => Tnf::External,
            5 => Tnf::Unknown,
            6 => Tnf::Unchanged,
            _ => Tnf::Reserved,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordKind {
    Uri,
    Text,
    Other,
}

/// Any record that is neither a URI nor a text record, kept as raw bytes.
///
/// URI and text records this crate cannot represent (reserved identifier
/// code, UTF-16 text) end up here as well.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawRecord {
    pub tnf: Tnf,
    pub record_type: Vec<u8, MAX_TYPE_LEN>,
    pub id: Vec<u8, MAX_ID_LEN>,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl RawRecord {
    pub fn new(tnf: Tnf, record_type: &[u8], payload: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            tnf,
            record_type: Vec::from_slice(record_type).map_err(|_| Error::BufferFull)?,
            id: Vec::new(),
            payload: Vec::from_slice(payload).map_err(|_| Error::BufferFull)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Record {
    Uri(UriRecord),
    Text(TextRecord),
    Other(RawRecord),
}

impl From<UriRecord> for Record {
    fn from(r: UriRecord) -> Self {
        Record::Uri(r)
    }
}

impl From<TextRecord> for Record {
    fn from(r: TextRecord) -> Self {
        Record::Text(r)
    }
}

impl From<RawRecord> for Record {
    fn from(r: RawRecord) -> Self {
        Record::Other(r)
    }
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Uri(_) => RecordKind::Uri,
            Record::Text(_) => RecordKind::Text,
            Record::Other(_) => RecordKind::Other,
        }
    }

    pub fn as_uri(&self) -> Option<&UriRecord> {
        if let Record::Uri(r) = self {
            Some(r)
        } else {
            None
        }
    }

    pub(crate) fn tnf(&self) -> Tnf {
        match self {
            Record::Uri(_) | Record::Text(_) => Tnf::WellKnown,
            Record::Other(r) => r.tnf,
        }
    }

    fn record_type(&self) -> &[u8] {
        match self {
            Record::Uri(_) => URI_TYPE,
            Record::Text(_) => TEXT_TYPE,
            Record::Other(r) => &r.record_type,
        }
    }

    fn id(&self) -> &[u8] {
        match self {
            Record::Other(r) => &r.id,
            _ => &[],
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            Record::Uri(r) => r.payload_len(),
            Record::Text(r) => r.payload_len(),
            Record::Other(r) => r.payload.len(),
        }
    }

    /// Append the encoded record to `out`. `flags` carries MB/ME.
    pub(crate) fn encode<const N: usize>(&self, flags: u8, out: &mut Vec<u8, N>) -> Result<(), Error> {
        let record_type = self.record_type();
        let id = self.id();
        let payload_len = self.payload_len();

        let mut header = flags | self.tnf() as u8;
        if payload_len < 256 {
            header |= SR;
        }
        if !id.is_empty() {
            header |= IL;
        }

        out.push(header).map_err(|_| Error::BufferFull)?;
        out.push(record_type.len() as u8)
            .map_err(|_| Error::BufferFull)?;
        if payload_len < 256 {
            out.push(payload_len as u8).map_err(|_| Error::BufferFull)?;
        } else {
            out.extend_from_slice(&(payload_len as u32).to_be_bytes())
                .map_err(|_| Error::BufferFull)?;
        }
        if !id.is_empty() {
            out.push(id.len() as u8).map_err(|_| Error::BufferFull)?;
        }
        out.extend_from_slice(record_type)
            .map_err(|_| Error::BufferFull)?;
        out.extend_from_slice(id).map_err(|_| Error::BufferFull)?;

        match self {
            Record::Uri(r) => r.write_payload(out),
            Record::Text(r) => r.write_payload(out),
            Record::Other(r) => out
                .extend_from_slice(&r.payload)
                .map_err(|_| Error::BufferFull),
        }
    }

    /// Decode one record from the start of `buf`.
    ///
    /// Returns the record (`None` for an empty record), its header byte and
    /// the number of bytes consumed. Errors only come from the framing.
    pub(crate) fn decode(buf: &[u8]) -> Result<(Option<Record>, u8, usize), Error> {
        let mut reader = Reader { buf, pos: 0 };

        let header = reader.byte()?;
        if header & CF != 0 {
            return Err(Error::ChunkedRecord);
        }
        let type_len = reader.byte()? as usize;
        let payload_len = if header & SR != 0 {
            reader.byte()? as usize
        } else {
            let b = reader.take(4)?;
            u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize
        };
        let id_len = if header & IL != 0 {
            reader.byte()? as usize
        } else {
            0
        };
        let record_type = reader.take(type_len)?;
        let id = reader.take(id_len)?;
        let payload = reader.take(payload_len)?;

        let tnf = Tnf::from_header(header);
        if tnf == Tnf::Empty {
            return Ok((None, header, reader.pos));
        }

        let known = match (tnf, record_type) {
            (Tnf::WellKnown, URI_TYPE) => UriRecord::from_payload(payload).map(Record::Uri),
            (Tnf::WellKnown, TEXT_TYPE) => TextRecord::from_payload(payload).map(Record::Text),
            _ => Err(Error::UnknownType),
        };
        let record = match known {
            Ok(record) => record,
            Err(e) => {
                if e != Error::UnknownType {
                    debug!("keeping record raw: {:?}", e);
                }
                let mut raw = RawRecord::new(tnf, record_type, payload)?;
                raw.id = Vec::from_slice(id).map_err(|_| Error::BufferFull)?;
                Record::Other(raw)
            }
        };

        Ok((Some(record), header, reader.pos))
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self.pos.checked_add(n).ok_or(Error::Truncated)?;
        let s = self.buf.get(self.pos..end).ok_or(Error::Truncated)?;
        self.pos = end;
        Ok(s)
    }
}
