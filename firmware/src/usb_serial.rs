//! USB CDC serial port used as the demo console.

use core::fmt;

use nfc02a1_pico as bsp;
use bsp::{
    hal::{pac, pac::interrupt, usb},
    pac::{RESETS, USBCTRL_DPRAM, USBCTRL_REGS},
};
use rp2040_hal::{clocks::UsbClock, usb::UsbBus};
use usb_device::{
    class_prelude::UsbBusAllocator,
    prelude::{UsbDevice, UsbDeviceBuilder, UsbVidPid},
    UsbError,
};
use usbd_serial::SerialPort;

use crate::spinlocks::UsbSpinlock;

static mut USB_BUS_ALLOCATOR: Option<UsbBusAllocator<UsbBus>> = None;

/// Polls without progress before a console write gives up, so an absent or
/// stalled host cannot hold the main loop.
const MAX_STALLS: u32 = 1000;

pub struct UsbManager {
    usb_dev: UsbDevice<'static, UsbBus>,
    serial: SerialPort<'static, UsbBus>,
    buffer: [u8; 64],
}

impl UsbManager {
    /// Service the device and drop anything the host typed, the console is
    /// output only.
    pub fn maintain(&mut self) -> Result<(), UsbError> {
        if self.usb_dev.poll(&mut [&mut self.serial]) {
            loop {
                match self.serial.read(&mut self.buffer) {
                    Ok(0) | Err(UsbError::WouldBlock) => break,
                    Ok(_) => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Queue all of `buf`, polling the device between packets.
    ///
    /// Runs with the USB interrupt held off, so it services the device
    /// itself. Gives up with `WouldBlock` after [`MAX_STALLS`] polls that
    /// moved nothing.
    pub fn write_all(&mut self, mut buf: &[u8]) -> Result<(), UsbError> {
        let mut stalls = 0;
        while !buf.is_empty() {
            match self.serial.write(buf) {
                Ok(n) => {
                    buf = buf.get(n..).unwrap_or(&[]);
                    stalls = 0;
                }
                Err(UsbError::WouldBlock) if stalls < MAX_STALLS => stalls += 1,
                Err(e) => return Err(e),
            }
            self.maintain()?;
        }
        Ok(())
    }

    pub fn init(
        ctrl_reg: USBCTRL_REGS,
        ctrl_dpram: USBCTRL_DPRAM,
        usb_clock: UsbClock,
        resets: &mut RESETS,
    ) {
        let usb_bus: &'static mut UsbBusAllocator<UsbBus> = unsafe {
            USB_BUS_ALLOCATOR.insert(UsbBusAllocator::new(usb::UsbBus::new(
                ctrl_reg, ctrl_dpram, usb_clock, true, resets,
            )))
        };

        let serial = SerialPort::new(usb_bus);

        // pid.codes test VID/PID for CDC-ACM
        let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x16c0, 0x27dd))
            .manufacturer("nfc02a1-demo")
            .product("NFC02A1 tag console")
            .serial_number("0001")
            .device_class(usbd_serial::USB_CLASS_CDC)
            .build();

        *UsbSpinlock::claim() = Some(UsbManager {
            usb_dev,
            serial,
            buffer: [0; 64],
        });

        unsafe {
            pac::NVIC::unmask(pac::Interrupt::USBCTRL_IRQ);
        };
    }
}

/// `core::fmt::Write` front end for [`UsbManager`].
///
/// Writes fail while no host has the port open; the demo carries on.
pub struct UsbConsole;

impl fmt::Write for UsbConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // USBCTRL_IRQ only try-claims the lock and returns without servicing
        // the device when it is taken. Holding the lock with the interrupt
        // enabled would let it fire forever.
        critical_section::with(|_| match &mut *UsbSpinlock::claim() {
            Some(usb) => usb.write_all(s.as_bytes()).map_err(|_| fmt::Error),
            None => Err(fmt::Error),
        })
    }
}

#[allow(non_snake_case)]
#[interrupt]
unsafe fn USBCTRL_IRQ() {
    if let Some(mut usb) = UsbSpinlock::try_claim() {
        if let Some(usb) = &mut *usb {
            if let Err(e) = usb.maintain() {
                defmt::warn!("usb: {}", defmt::Debug2Format(&e));
            }
        }
    }
}
