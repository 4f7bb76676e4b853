//! Board support for an X-NUCLEO-NFC02A1 (M24LR04E-R) shield wired to a
//! Raspberry Pi Pico.
//!
//! | Shield    | Pico   |
//! |-----------|--------|
//! | SDA       | GPIO4  |
//! | SCL       | GPIO5  |
//! | GPO       | GPIO6  |
//! | RF_DIS    | GPIO7  |
//! | LED1..3   | GPIO13..15 |
//! | user button to GND | GPIO16 |
#![no_std]

pub extern crate rp2040_hal as hal;

#[cfg(feature = "rt")]
extern crate cortex_m_rt;
#[cfg(feature = "rt")]
pub use hal::entry;

/// The linker will place this boot block at the start of our program image. We
/// need this to help the ROM bootloader get our code up and running.
#[cfg(feature = "boot2")]
#[link_section = ".boot2"]
#[no_mangle]
#[used]
pub static BOOT2_FIRMWARE: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

pub use hal::pac;

hal::bsp_pins!(
    Gpio4 {
        name: sda,
        aliases: {
            FunctionI2C: Gp4I2C0Sda
        }
    },
    Gpio5 {
        name: scl,
        aliases: {
            FunctionI2C: Gp5I2C0Scl
        }
    },
    Gpio6 {
        name: gpo,
        aliases: {
            /// Open drain RF busy output of the tag, needs the pull-up.
            PullUpInput: Gpo
        }
    },
    Gpio7 {
        name: rf_disable,
        aliases: {
            PushPullOutput: RfDisable
        }
    },
    Gpio13 {
        name: led1,
        aliases: {
            PushPullOutput: Led1
        }
    },
    Gpio14 {
        name: led2,
        aliases: {
            PushPullOutput: Led2
        }
    },
    Gpio15 {
        name: led3,
        aliases: {
            PushPullOutput: Led3
        }
    },
    Gpio16 {
        name: user_button,
        aliases: {
            PullUpInput: UserButton
        }
    },
);

pub const XOSC_CRYSTAL_FREQ: u32 = 12_000_000;
