#![no_std]
#![no_main]

use core::cell::Cell;

use cortex_m::interrupt::Mutex;
use defmt_rtt as _;
use embedded_hal::blocking::delay::DelayMs;
use fugit::RateExtU32;
use panic_probe as _;

use nfc02a1_pico as bsp;

use bsp::{
    entry,
    hal::{
        clocks::{init_clocks_and_plls, Clock},
        gpio::Interrupt,
        i2c,
        pac::{self, interrupt},
        sio::Sio,
        watchdog::Watchdog,
    },
};
use nfc02a1_demo::{
    demo::{self, Config},
    Board, ButtonFlag, Indicators, M24lr, RunMode,
};

mod spinlocks;
mod usb_serial;

use usb_serial::{UsbConsole, UsbManager};

static BUTTON_PRESSED: ButtonFlag = ButtonFlag::new();

// Used for hand-off to the interrupt handler
static GLOBAL_BUTTON: Mutex<Cell<Option<bsp::UserButton>>> = Mutex::new(Cell::new(None));

#[entry]
fn main() -> ! {
    let mut pac = pac::Peripherals::take().unwrap();
    let core = pac::CorePeripherals::take().unwrap();
    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    let sio = Sio::new(pac.SIO);

    let clocks = init_clocks_and_plls(
        bsp::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    let mut delay = cortex_m::delay::Delay::new(core.SYST, clocks.system_clock.freq().to_Hz());

    UsbManager::init(
        pac.USBCTRL_REGS,
        pac.USBCTRL_DPRAM,
        clocks.usb_clock,
        &mut pac.RESETS,
    );

    // Give the host a moment to enumerate and open the port, the first
    // console lines are lost otherwise.
    delay.delay_ms(1000);

    let pins = bsp::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let sda: bsp::Gp4I2C0Sda = pins.sda.into_mode();
    let scl: bsp::Gp5I2C0Scl = pins.scl.into_mode();
    let i2c = i2c::I2C::i2c0(
        pac.I2C0,
        sda,
        scl,
        400.kHz(),
        &mut pac.RESETS,
        clocks.system_clock.freq(),
    );

    let gpo: bsp::Gpo = pins.gpo.into_mode();
    let rf_disable: bsp::RfDisable = pins.rf_disable.into_mode();
    let led1: bsp::Led1 = pins.led1.into_mode();
    let led2: bsp::Led2 = pins.led2.into_mode();
    let led3: bsp::Led3 = pins.led3.into_mode();

    let m24lr = M24lr::new(i2c, delay, gpo);
    let mut board = Board::new(m24lr, Indicators::new(led1, led2, led3), rf_disable);

    let config = Config::default();
    defmt::info!("run mode: {}", config.run_mode);

    if config.run_mode == RunMode::ButtonLoop {
        let button: bsp::UserButton = pins.user_button.into_mode();
        button.set_interrupt_enabled(Interrupt::EdgeLow, true);

        cortex_m::interrupt::free(|cs| {
            GLOBAL_BUTTON.borrow(cs).set(Some(button));
        });

        unsafe {
            pac::NVIC::unmask(pac::Interrupt::IO_IRQ_BANK0);
        }
    }

    demo::run(
        &config,
        &BUTTON_PRESSED,
        &mut board,
        &mut UsbConsole,
        sleep_unless_pressed,
    );

    loop {
        cortex_m::asm::wfi();
    }
}

/// Sleep until the next interrupt, unless a press is already waiting.
///
/// The check runs with interrupts masked so a press cannot slip in between
/// it and `wfi`; a pending interrupt still wakes the core.
fn sleep_unless_pressed(flag: &ButtonFlag) {
    cortex_m::interrupt::free(|_| {
        if !flag.is_set() {
            cortex_m::asm::wfi();
        }
    });
}

#[interrupt]
fn IO_IRQ_BANK0() {
    // The `#[interrupt]` attribute covertly converts this to `&'static mut Option<UserButton>`
    static mut BUTTON: Option<bsp::UserButton> = None;

    // Lazy initialization: Steal the global button pin
    if BUTTON.is_none() {
        cortex_m::interrupt::free(|cs| {
            *BUTTON = GLOBAL_BUTTON.borrow(cs).take();
        });
    }

    if let Some(button) = BUTTON {
        if button.interrupt_status(Interrupt::EdgeLow) {
            BUTTON_PRESSED.signal();
            button.clear_interrupt(Interrupt::EdgeLow);
        }
    }
}
