//! Session-scoped NDEF access to a tag, and the Type 5 layout used on the M24LR.

use embedded_hal::{
    blocking::{
        delay::DelayMs,
        i2c::{Write, WriteRead},
    },
    digital::v2::InputPin,
};
use heapless::Vec;

use crate::{
    fmt::Dbg,
    m24lr::{M24lr, MEMORY_SIZE},
    ndef::{self, Message},
    Error,
};

/// A tag that stores one NDEF message.
///
/// Reads and writes are only valid between `open_session` and
/// `close_session`.
pub trait NdefTag {
    type Error: core::fmt::Debug;

    fn open_session(&mut self) -> Result<(), Self::Error>;
    fn close_session(&mut self) -> Result<(), Self::Error>;
    fn write(&mut self, message: &Message) -> Result<(), Self::Error>;
    /// Replace the contents of `message` with what is stored on the tag.
    fn read(&mut self, message: &mut Message) -> Result<(), Self::Error>;
}

pub trait EnergyHarvesting: NdefTag {
    fn enable_energy_harvesting(&mut self) -> Result<(), Self::Error>;
}

/// Capability container: magic, version 1.0 with read/write access,
/// memory size in 8 byte units, no extra features.
pub const CC: [u8; 4] = [0xe1, 0x40, (MEMORY_SIZE / 8) as u8, 0x00];
const CC_MAGIC: u8 = 0xe1;
const CC_ADDR: u16 = 0;
const TLV_ADDR: u16 = CC.len() as u16;

const TLV_NULL: u8 = 0x00;
const TLV_NDEF: u8 = 0x03;
const TLV_TERMINATOR: u8 = 0xfe;

/// Room left for the NDEF message once the CC and TLV framing are taken out.
pub const MAX_MESSAGE_LEN: usize = MEMORY_SIZE as usize - CC.len() - 5;

const _: () = assert!(MAX_MESSAGE_LEN == ndef::MAX_MESSAGE_LEN);

type Buffer = Vec<u8, { MEMORY_SIZE as usize }>;

impl<I2C, D, GPO, E> M24lr<I2C, D, GPO>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
    GPO: InputPin,
{
    /// Write a capability container and an empty NDEF message.
    pub fn format(&mut self) -> Result<(), Error<E>> {
        info!("formatting tag");
        self.write(CC_ADDR, &CC)?;
        self.write(TLV_ADDR, &[TLV_NDEF, 0x00, TLV_TERMINATOR])
    }

    fn check_session(&self) -> Result<(), Error<E>> {
        if self.session_open {
            Ok(())
        } else {
            Err(Error::SessionNotOpen)
        }
    }

    /// Find the NDEF TLV and return the address and length of its value.
    fn find_ndef(&mut self) -> Result<Option<(u16, usize)>, Error<E>> {
        let mut addr = TLV_ADDR;
        while addr < MEMORY_SIZE {
            let mut tag = [0];
            self.read(addr, &mut tag)?;
            match tag[0] {
                TLV_NULL => {
                    addr += 1;
                    continue;
                }
                TLV_TERMINATOR => return Ok(None),
                _ => {}
            }

            let mut len = [0];
            self.read(addr + 1, &mut len)?;
            let (value_addr, value_len) = if len[0] == 0xff {
                let mut long = [0; 2];
                self.read(addr + 2, &mut long)?;
                (addr + 4, u16::from_be_bytes(long) as usize)
            } else {
                (addr + 2, len[0] as usize)
            };

            if tag[0] == TLV_NDEF {
                return Ok(Some((value_addr, value_len)));
            }
            trace!("skipping TLV {} of {} bytes", tag[0], value_len);
            addr = value_addr.saturating_add(value_len as u16);
        }
        Ok(None)
    }
}

impl<I2C, D, GPO, E> NdefTag for M24lr<I2C, D, GPO>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
    GPO: InputPin,
    E: core::fmt::Debug,
{
    type Error = Error<E>;

    fn open_session(&mut self) -> Result<(), Error<E>> {
        if self.session_open {
            return Err(Error::SessionAlreadyOpen);
        }
        if self.rf_busy()? {
            warn!("RF busy, session refused");
            return Err(Error::RfBusy);
        }

        let mut cc = [0; 4];
        self.read(CC_ADDR, &mut cc)?;
        if cc[0] != CC_MAGIC {
            debug!("no capability container (cc[0]={})", cc[0]);
            self.format()?;
        }

        self.session_open = true;
        debug!("session opened");
        Ok(())
    }

    fn close_session(&mut self) -> Result<(), Error<E>> {
        self.check_session()?;
        self.session_open = false;
        debug!("session closed");
        Ok(())
    }

    fn write(&mut self, message: &Message) -> Result<(), Error<E>> {
        self.check_session()?;

        let bytes = message.as_bytes();
        if bytes.len() > MAX_MESSAGE_LEN {
            return Err(Error::MessageTooLarge);
        }

        let mut tlv = Buffer::new();
        let push = |tlv: &mut Buffer, chunk: &[u8]| -> Result<(), Error<E>> {
            tlv.extend_from_slice(chunk)
                .map_err(|_| Error::MessageTooLarge)
        };
        if bytes.len() < 0xff {
            push(&mut tlv, &[TLV_NDEF, bytes.len() as u8])?;
        } else {
            push(&mut tlv, &[TLV_NDEF, 0xff])?;
            push(&mut tlv, &(bytes.len() as u16).to_be_bytes())?;
        }
        push(&mut tlv, bytes)?;
        push(&mut tlv, &[TLV_TERMINATOR])?;

        debug!("writing {} byte NDEF message", bytes.len());
        M24lr::write(self, TLV_ADDR, &tlv)
    }

    fn read(&mut self, message: &mut Message) -> Result<(), Error<E>> {
        self.check_session()?;
        message.clear();

        let (addr, len) = match self.find_ndef()? {
            Some(found) => found,
            None => {
                debug!("no NDEF TLV on tag");
                return Ok(());
            }
        };
        if len > MAX_MESSAGE_LEN {
            warn!("NDEF TLV claims {} bytes", len);
            return Err(Error::MessageTooLarge);
        }

        let mut buf = Buffer::new();
        // len is bounded by the buffer capacity above
        let _ = buf.resize(len, 0);
        M24lr::read(self, addr, &mut buf)?;
        *message = Message::decode(&buf).map_err(|e| {
            warn!("undecodable NDEF message: {:?}", Dbg(&e));
            Error::Ndef(e)
        })?;
        Ok(())
    }
}

impl<I2C, D, GPO, E> EnergyHarvesting for M24lr<I2C, D, GPO>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
    GPO: InputPin,
    E: core::fmt::Debug,
{
    fn enable_energy_harvesting(&mut self) -> Result<(), Error<E>> {
        M24lr::enable_energy_harvesting(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::m24lr::fake::Bus;
    use crate::ndef::{TextRecord, UriPrefix, UriRecord};

    fn uri_message(content: &str) -> Message {
        let mut msg = Message::new();
        msg.add_record(UriRecord::new(UriPrefix::HttpWww, content).unwrap())
            .unwrap();
        msg
    }

    #[test]
    fn blank_tag_is_formatted_on_open() {
        let bus = Bus::new();
        let mut tag = bus.driver();

        tag.open_session().unwrap();

        let chip = bus.0.borrow();
        assert_eq!(&chip.user[..4], &CC);
        assert_eq!(&chip.user[4..7], &[0x03, 0x00, 0xfe]);
    }

    #[test]
    fn formatted_tag_is_left_alone() {
        let bus = Bus::new();
        bus.0.borrow_mut().user[..4].copy_from_slice(&CC);
        let mut tag = bus.driver();
        tag.open_session().unwrap();
        assert!(bus.0.borrow().writes.is_empty());
    }

    #[test]
    fn written_message_is_read_back() {
        let bus = Bus::new();
        let mut tag = bus.driver();
        let msg = uri_message("st.com/st25");

        tag.open_session().unwrap();
        NdefTag::write(&mut tag, &msg).unwrap();
        tag.close_session().unwrap();

        {
            let chip = bus.0.borrow();
            // 03 len, record header d1 01 0c 'U' 01 ..., terminator
            assert_eq!(&chip.user[4..9], &[0x03, 0x10, 0xd1, 0x01, 0x0c]);
            assert_eq!(chip.user[4 + 2 + 16], 0xfe);
        }

        let mut read = Message::new();
        read.add_record(TextRecord::new("en", "stale").unwrap())
            .unwrap();
        tag.open_session().unwrap();
        NdefTag::read(&mut tag, &mut read).unwrap();
        tag.close_session().unwrap();
        assert_eq!(read, msg);
    }

    #[test]
    fn long_tlv_length_form() {
        let bus = Bus::new();
        let mut tag = bus.driver();
        let mut msg = Message::new();
        for _ in 0..3 {
            let content = [b'x'; 100];
            let content = core::str::from_utf8(&content).unwrap();
            msg.add_record(UriRecord::new(UriPrefix::Https, content).unwrap())
                .unwrap();
        }

        tag.open_session().unwrap();
        NdefTag::write(&mut tag, &msg).unwrap();
        assert_eq!(&bus.0.borrow().user[4..6], &[0x03, 0xff]);

        let mut read = Message::new();
        NdefTag::read(&mut tag, &mut read).unwrap();
        assert_eq!(read, msg);
    }

    #[test]
    fn null_and_foreign_tlvs_are_skipped() {
        let bus = Bus::new();
        {
            let mut chip = bus.0.borrow_mut();
            chip.user[..4].copy_from_slice(&CC);
            // NULL, lock control TLV (01 03 xx xx xx), then NDEF
            chip.user[4..17].copy_from_slice(&[
                0x00, 0x01, 0x03, 0xa0, 0x10, 0x44, 0x03, 0x05, 0xd1, 0x01, 0x01, b'U', 0x05,
            ]);
            chip.user[17] = 0xfe;
        }
        let mut tag = bus.driver();
        tag.open_session().unwrap();
        let mut read = Message::new();
        NdefTag::read(&mut tag, &mut read).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read.get(0).unwrap().as_uri().unwrap().prefix(), UriPrefix::Tel);
    }

    #[test]
    fn message_written_by_another_device_is_read_whole() {
        let bus = Bus::new();
        let mut ndef = std::vec::Vec::new();
        // five short URI records
        for (i, header) in [0x91, 0x11, 0x11, 0x11, 0x11].into_iter().enumerate() {
            ndef.extend_from_slice(&[header, 0x01, 0x02, b'U', 0x01, b'a' + i as u8]);
        }
        // a media record bigger than any short payload
        ndef.extend_from_slice(&[0x12, 0x0a, 0xc8]);
        ndef.extend_from_slice(b"text/vcard");
        ndef.extend_from_slice(&[b'v'; 200]);
        // a URI with a 200 byte suffix, flagged ME
        ndef.extend_from_slice(&[0x51, 0x01, 0xc9, b'U', 0x04]);
        ndef.extend_from_slice(&[b'x'; 200]);
        bus.load_ndef(&ndef);

        let mut tag = bus.driver();
        tag.open_session().unwrap();
        let mut read = Message::new();
        NdefTag::read(&mut tag, &mut read).unwrap();

        assert_eq!(read.len(), 7);
        assert_eq!(read.as_bytes(), &ndef[..]);
        assert_eq!(read.get(5).unwrap().kind(), crate::ndef::RecordKind::Other);
        let last = read.get(6).unwrap();
        let uri = last.as_uri().unwrap();
        assert_eq!(uri.prefix(), UriPrefix::Https);
        assert_eq!(uri.content().len(), 200);
    }

    #[test]
    fn empty_tag_reads_as_no_records() {
        let bus = Bus::new();
        let mut tag = bus.driver();
        tag.open_session().unwrap();
        let mut read = uri_message("old");
        NdefTag::read(&mut tag, &mut read).unwrap();
        assert!(read.is_empty());
    }

    #[test]
    fn session_rules() {
        let bus = Bus::new();
        let mut tag = bus.driver();
        let msg = uri_message("x");
        let mut read = Message::new();

        assert_eq!(NdefTag::write(&mut tag, &msg), Err(Error::SessionNotOpen));
        assert_eq!(NdefTag::read(&mut tag, &mut read), Err(Error::SessionNotOpen));
        assert_eq!(tag.close_session(), Err(Error::SessionNotOpen));

        tag.open_session().unwrap();
        assert_eq!(tag.open_session(), Err(Error::SessionAlreadyOpen));
        tag.close_session().unwrap();
        assert_eq!(tag.close_session(), Err(Error::SessionNotOpen));
    }

    #[test]
    fn busy_rf_side_refuses_the_session() {
        let bus = Bus::new();
        bus.0.borrow_mut().rf_busy = true;
        let mut tag = bus.driver();
        assert_eq!(tag.open_session(), Err(Error::RfBusy));
        assert!(bus.0.borrow().writes.is_empty());
    }
}
