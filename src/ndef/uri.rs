use heapless::String;

use super::{Error, MAX_MESSAGE_LEN};

/// Longest URI suffix a record can carry.
pub const MAX_URI_LEN: usize = MAX_MESSAGE_LEN;

macro_rules! uri_prefixes {
    ($($code:literal => $name:ident : $prefix:literal,)*) => {
        /// URI identifier codes from the NFC Forum URI record type definition.
        ///
        /// The code replaces a common scheme prefix so the record only has to
        /// store the rest of the URI.
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum UriPrefix {
            $($name = $code,)*
        }

        impl UriPrefix {
            pub const ALL: &'static [UriPrefix] = &[$(UriPrefix::$name,)*];

            /// The text this code stands for, e.g. `"http://www."`.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(UriPrefix::$name => $prefix,)*
                }
            }
        }

        impl TryFrom<u8> for UriPrefix {
            type Error = Error;

            fn try_from(code: u8) -> Result<Self, Error> {
                match code {
                    $($code => Ok(UriPrefix::$name),)*
                    _ => Err(Error::UnknownUriPrefix(code)),
                }
            }
        }
    };
}

uri_prefixes!(
    0x00 => NoPrefix: "",
    0x01 => HttpWww: "http://www.",
    0x02 => HttpsWww: "https://www.",
    0x03 => Http: "http://",
    0x04 => Https: "https://",
    0x05 => Tel: "tel:",
    0x06 => Mailto: "mailto:",
    0x07 => FtpAnonymous: "ftp://anonymous:anonymous@",
    0x08 => FtpFtp: "ftp://ftp.",
    0x09 => Ftps: "ftps://",
    0x0a => Sftp: "sftp://",
    0x0b => Smb: "smb://",
    0x0c => Nfs: "nfs://",
    0x0d => Ftp: "ftp://",
    0x0e => Dav: "dav://",
    0x0f => News: "news:",
    0x10 => Telnet: "telnet://",
    0x11 => Imap: "imap:",
    0x12 => Rtsp: "rtsp://",
    0x13 => Urn: "urn:",
    0x14 => Pop: "pop:",
    0x15 => Sip: "sip:",
    0x16 => Sips: "sips:",
    0x17 => Tftp: "tftp:",
    0x18 => BtSpp: "btspp://",
    0x19 => BtL2cap: "btl2cap://",
    0x1a => BtGoep: "btgoep://",
    0x1b => TcpObex: "tcpobex://",
    0x1c => IrdaObex: "irdaobex://",
    0x1d => File: "file://",
    0x1e => UrnEpcId: "urn:epc:id:",
    0x1f => UrnEpcTag: "urn:epc:tag:",
    0x20 => UrnEpcPat: "urn:epc:pat:",
    0x21 => UrnEpcRaw: "urn:epc:raw:",
    0x22 => UrnEpc: "urn:epc:",
    0x23 => UrnNfc: "urn:nfc:",
);

/// Well-known record of type `U`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UriRecord {
    prefix: UriPrefix,
    content: String<MAX_URI_LEN>,
}

impl UriRecord {
    pub fn new(prefix: UriPrefix, content: &str) -> Result<Self, Error> {
        let mut s = String::new();
        s.push_str(content).map_err(|_| Error::BufferFull)?;
        Ok(Self { prefix, content: s })
    }

    /// Build a record from a complete URI, abbreviating the longest known prefix.
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        let prefix = UriPrefix::ALL
            .iter()
            .copied()
            .filter(|p| uri.starts_with(p.as_str()))
            .max_by_key(|p| p.as_str().len())
            .unwrap_or(UriPrefix::NoPrefix);
        Self::new(prefix, &uri[prefix.as_str().len()..])
    }

    pub fn id(&self) -> u8 {
        self.prefix as u8
    }

    pub fn prefix(&self) -> UriPrefix {
        self.prefix
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn payload_len(&self) -> usize {
        1 + self.content.len()
    }

    pub(crate) fn write_payload<const N: usize>(
        &self,
        out: &mut heapless::Vec<u8, N>,
    ) -> Result<(), Error> {
        out.push(self.id()).map_err(|_| Error::BufferFull)?;
        out.extend_from_slice(self.content.as_bytes())
            .map_err(|_| Error::BufferFull)
    }

    pub(crate) fn from_payload(payload: &[u8]) -> Result<Self, Error> {
        let (&code, rest) = payload.split_first().ok_or(Error::Truncated)?;
        let content = core::str::from_utf8(rest).map_err(|_| Error::InvalidUtf8)?;
        Self::new(UriPrefix::try_from(code)?, content)
    }
}

impl core::fmt::Display for UriRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", self.prefix.as_str(), self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_uri_picks_longest_prefix() {
        let r = UriRecord::from_uri("https://www.st.com/st25").unwrap();
        assert_eq!(r.prefix(), UriPrefix::HttpsWww);
        assert_eq!(r.content(), "st.com/st25");

        let r = UriRecord::from_uri("urn:epc:id:sgtin:1").unwrap();
        assert_eq!(r.prefix(), UriPrefix::UrnEpcId);
        assert_eq!(r.content(), "sgtin:1");

        let r = UriRecord::from_uri("gopher://example").unwrap();
        assert_eq!(r.prefix(), UriPrefix::NoPrefix);
        assert_eq!(r.content(), "gopher://example");
    }

    #[test]
    fn payload_starts_with_identifier_code() {
        let r = UriRecord::new(UriPrefix::HttpWww, "st.com/st25").unwrap();
        let mut out: heapless::Vec<u8, 32> = heapless::Vec::new();
        r.write_payload(&mut out).unwrap();
        assert_eq!(out[0], 0x01);
        assert_eq!(&out[1..], b"st.com/st25");
        assert_eq!(r.payload_len(), out.len());
        assert_eq!(UriRecord::from_payload(&out).unwrap(), r);
    }

    #[test]
    fn rejects_reserved_codes_and_bad_text() {
        assert_eq!(
            UriRecord::from_payload(&[0x24, b'a']),
            Err(Error::UnknownUriPrefix(0x24))
        );
        assert_eq!(UriRecord::from_payload(&[0x01, 0xff]), Err(Error::InvalidUtf8));
        assert_eq!(UriRecord::from_payload(&[]), Err(Error::Truncated));
    }

    #[test]
    fn content_longer_than_capacity_is_refused() {
        let long = [b'a'; MAX_URI_LEN + 1];
        let long = core::str::from_utf8(&long).unwrap();
        assert_eq!(
            UriRecord::new(UriPrefix::Http, long),
            Err(Error::BufferFull)
        );
    }

    #[test]
    fn display_joins_prefix_and_content() {
        let r = UriRecord::new(UriPrefix::HttpWww, "st.com/st25").unwrap();
        assert_eq!(std::format!("{}", r), "http://www.st.com/st25");
    }
}
