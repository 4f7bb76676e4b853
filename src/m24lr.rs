//! Driver for the M24LR04E-R dynamic NFC/RFID tag over I2C.
//!
//! The chip answers on two I2C addresses: one for the 512 byte user EEPROM
//! and one for the system area (password, energy harvesting, UID).

use embedded_hal::{
    blocking::{
        delay::DelayMs,
        i2c::{Write, WriteRead},
    },
    digital::v2::InputPin,
};

use crate::Error;

/// 7-bit address of the user memory (E2 = 0).
pub const USER_ADDR: u8 = 0x53;
/// 7-bit address of the system area (E2 = 1).
pub const SYSTEM_ADDR: u8 = 0x57;

/// User EEPROM size in bytes (4 Kbit).
pub const MEMORY_SIZE: u16 = 512;
/// Bytes per I2C page write.
pub const PAGE_SIZE: u16 = 4;
/// Worst case EEPROM programming time of one page.
pub const WRITE_TIME_MS: u32 = 5;

/// Energy harvesting configuration byte (EEPROM).
pub const EH_CFG_REG: u16 = 0x0910;
/// 8 byte unique identifier, LSB first.
pub const UID_REG: u16 = 0x0914;
/// Volatile control register.
pub const CTRL_REG: u16 = 0x0920;

// CTRL_REG bits
pub const CTRL_EH_EN: u8 = 0x01;
pub const CTRL_FIELD_ON: u8 = 0x02;
pub const CTRL_T_PROG: u8 = 0x04;

pub struct M24lr<I2C, D, GPO> {
    i2c: I2C,
    delay: D,
    /// RF WIP/BUSY output, open drain, low while the RF side is busy.
    gpo: GPO,
    pub(crate) session_open: bool,
}

impl<I2C, D, GPO, E> M24lr<I2C, D, GPO>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u32>,
    GPO: InputPin,
{
    pub fn new(i2c: I2C, delay: D, gpo: GPO) -> Self {
        Self {
            i2c,
            delay,
            gpo,
            session_open: false,
        }
    }

    /// Give the bus, delay and GPO pin back.
    pub fn release(self) -> (I2C, D, GPO) {
        (self.i2c, self.delay, self.gpo)
    }

    pub fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Error<E>> {
        check_range(addr, buf.len())?;
        trace!("read {} bytes at {}", buf.len(), addr);
        self.i2c
            .write_read(USER_ADDR, &addr.to_be_bytes(), buf)
            .map_err(Error::I2c)
    }

    /// Write `data` at `addr`, split on page boundaries.
    pub fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), Error<E>> {
        check_range(addr, data.len())?;
        trace!("write {} bytes at {}", data.len(), addr);

        let mut addr = addr;
        let mut data = data;
        while !data.is_empty() {
            let room = (PAGE_SIZE - addr % PAGE_SIZE) as usize;
            let (page, rest) = data.split_at(room.min(data.len()));
            self.write_page(USER_ADDR, addr, page)?;
            addr += page.len() as u16;
            data = rest;
        }
        Ok(())
    }

    pub fn read_system(&mut self, reg: u16, buf: &mut [u8]) -> Result<(), Error<E>> {
        self.i2c
            .write_read(SYSTEM_ADDR, &reg.to_be_bytes(), buf)
            .map_err(Error::I2c)
    }

    pub fn write_system(&mut self, reg: u16, value: u8) -> Result<(), Error<E>> {
        self.write_page(SYSTEM_ADDR, reg, &[value])
    }

    fn write_page(&mut self, dev: u8, addr: u16, page: &[u8]) -> Result<(), Error<E>> {
        let mut frame = [0; 2 + PAGE_SIZE as usize];
        frame[..2].copy_from_slice(&addr.to_be_bytes());
        frame[2..2 + page.len()].copy_from_slice(page);
        self.i2c
            .write(dev, &frame[..2 + page.len()])
            .map_err(Error::I2c)?;
        self.delay.delay_ms(WRITE_TIME_MS);
        Ok(())
    }

    fn ctrl(&mut self) -> Result<u8, Error<E>> {
        let mut reg = [0];
        self.read_system(CTRL_REG, &mut reg)?;
        Ok(reg[0])
    }

    pub fn enable_energy_harvesting(&mut self) -> Result<(), Error<E>> {
        let ctrl = self.ctrl()?;
        debug!("enable energy harvesting, ctrl={}", ctrl);
        self.write_system(CTRL_REG, ctrl | CTRL_EH_EN)
    }

    pub fn disable_energy_harvesting(&mut self) -> Result<(), Error<E>> {
        let ctrl = self.ctrl()?;
        debug!("disable energy harvesting, ctrl={}", ctrl);
        self.write_system(CTRL_REG, ctrl & !CTRL_EH_EN)
    }

    pub fn energy_harvesting_enabled(&mut self) -> Result<bool, Error<E>> {
        Ok(self.ctrl()? & CTRL_EH_EN != 0)
    }

    /// Whether an RF field is currently detected.
    pub fn field_on(&mut self) -> Result<bool, Error<E>> {
        Ok(self.ctrl()? & CTRL_FIELD_ON != 0)
    }

    pub fn uid(&mut self) -> Result<u64, Error<E>> {
        let mut uid = [0; 8];
        self.read_system(UID_REG, &mut uid)?;
        Ok(u64::from_le_bytes(uid))
    }

    pub fn rf_busy(&mut self) -> Result<bool, Error<E>> {
        self.gpo.is_low().map_err(|_| Error::Pin)
    }
}

fn check_range<E>(addr: u16, len: usize) -> Result<(), Error<E>> {
    if addr as usize + len > MEMORY_SIZE as usize {
        Err(Error::OutOfRange)
    } else {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fake::{Bus, Nack};
    use super::*;

    #[test]
    fn writes_are_split_on_page_boundaries() {
        let bus = Bus::new();
        let mut m24 = bus.driver();

        m24.write(2, &[1, 2, 3, 4, 5, 6, 7]).unwrap();

        let chip = bus.0.borrow();
        assert_eq!(chip.writes, [2, 4, 1]);
        assert_eq!(&chip.user[2..9], &[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(chip.delay_ms, 3 * WRITE_TIME_MS);
    }

    #[test]
    fn reads_back_user_memory() {
        let bus = Bus::new();
        bus.0.borrow_mut().user[10..13].copy_from_slice(b"abc");
        let mut m24 = bus.driver();
        let mut buf = [0; 3];
        m24.read(10, &mut buf).unwrap();
        assert_eq!(&buf, b"abc");
    }

    #[test]
    fn access_past_the_end_is_refused() {
        let bus = Bus::new();
        let mut m24 = bus.driver();
        let mut buf = [0; 4];
        assert_eq!(m24.read(MEMORY_SIZE - 2, &mut buf), Err(Error::OutOfRange));
        assert_eq!(m24.write(MEMORY_SIZE, &[0]), Err(Error::OutOfRange));
        assert!(bus.0.borrow().writes.is_empty());
    }

    #[test]
    fn energy_harvesting_toggles_only_its_bit() {
        let bus = Bus::new();
        bus.0.borrow_mut().ctrl = CTRL_FIELD_ON;
        let mut m24 = bus.driver();

        m24.enable_energy_harvesting().unwrap();
        assert_eq!(bus.0.borrow().ctrl, CTRL_FIELD_ON | CTRL_EH_EN);
        assert!(m24.energy_harvesting_enabled().unwrap());
        assert!(m24.field_on().unwrap());

        m24.disable_energy_harvesting().unwrap();
        assert_eq!(bus.0.borrow().ctrl, CTRL_FIELD_ON);
        assert!(!m24.energy_harvesting_enabled().unwrap());
    }

    #[test]
    fn uid_is_little_endian() {
        let bus = Bus::new();
        let mut m24 = bus.driver();
        assert_eq!(m24.uid().unwrap(), 0xe007_6655_4433_2211);
    }

    #[test]
    fn bus_errors_are_wrapped() {
        let bus = Bus::new();
        bus.0.borrow_mut().nack = true;
        let mut m24 = bus.driver();
        assert_eq!(m24.enable_energy_harvesting(), Err(Error::I2c(Nack)));
    }

    #[test]
    fn gpo_low_means_rf_busy() {
        let bus = Bus::new();
        let mut m24 = bus.driver();
        assert!(!m24.rf_busy().unwrap());
        bus.0.borrow_mut().rf_busy = true;
        assert!(m24.rf_busy().unwrap());
    }
}
