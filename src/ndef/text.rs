use heapless::String;

use super::{Error, MAX_MESSAGE_LEN};

pub const MAX_TEXT_LEN: usize = MAX_MESSAGE_LEN;
/// The status byte has six bits for the language code length.
pub const MAX_LANG_LEN: usize = 63;

// Status byte: bit 7 selects UTF-16, bits 5..0 hold the language code length.
const UTF16_FLAG: u8 = 0x80;
const LANG_LEN_MASK: u8 = 0x3f;

/// Well-known record of type `T`. Only UTF-8 encoded text is supported.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TextRecord {
    lang: String<MAX_LANG_LEN>,
    text: String<MAX_TEXT_LEN>,
}

impl TextRecord {
    pub fn new(lang: &str, text: &str) -> Result<Self, Error> {
        let mut l = String::new();
        l.push_str(lang).map_err(|_| Error::BufferFull)?;
        let mut t = String::new();
        t.push_str(text).map_err(|_| Error::BufferFull)?;
        Ok(Self { lang: l, text: t })
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn payload_len(&self) -> usize {
        1 + self.lang.len() + self.text.len()
    }

    pub(crate) fn write_payload<const N: usize>(
        &self,
        out: &mut heapless::Vec<u8, N>,
    ) -> Result<(), Error> {
        out.push(self.lang.len() as u8)
            .map_err(|_| Error::BufferFull)?;
        out.extend_from_slice(self.lang.as_bytes())
            .map_err(|_| Error::BufferFull)?;
        out.extend_from_slice(self.text.as_bytes())
            .map_err(|_| Error::BufferFull)
    }

    pub(crate) fn from_payload(payload: &[u8]) -> Result<Self, Error> {
        let (&status, rest) = payload.split_first().ok_or(Error::Truncated)?;
        if status & UTF16_FLAG != 0 {
            return Err(Error::Utf16Text);
        }
        let lang_len = (status & LANG_LEN_MASK) as usize;
        if rest.len() < lang_len {
            return Err(Error::Truncated);
        }
        let (lang, text) = rest.split_at(lang_len);
        let lang = core::str::from_utf8(lang).map_err(|_| Error::InvalidUtf8)?;
        let text = core::str::from_utf8(text).map_err(|_| Error::InvalidUtf8)?;
        Self::new(lang, text)
    }
}
