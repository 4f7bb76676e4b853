use embedded_hal::digital::v2::OutputPin;

use crate::{fmt::Dbg, tag::EnergyHarvesting};

/// The three status LEDs of the shield.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    /// Session opened for writing.
    Led1,
    /// Tag written.
    Led2,
    /// Session closed.
    Led3,
}

pub trait StatusLeds {
    fn set(&mut self, indicator: Indicator, on: bool);
}

/// Status LEDs driven by three GPIOs, active high.
pub struct Indicators<L1, L2, L3> {
    pub led1: L1,
    pub led2: L2,
    pub led3: L3,
}

impl<L1, L2, L3> Indicators<L1, L2, L3>
where
    L1: OutputPin,
    L2: OutputPin,
    L3: OutputPin,
    L1::Error: core::fmt::Debug,
    L2::Error: core::fmt::Debug,
    L3::Error: core::fmt::Debug,
{
    pub fn new(led1: L1, led2: L2, led3: L3) -> Self {
        let mut leds = Self { led1, led2, led3 };
        leds.set(Indicator::Led1, false);
        leds.set(Indicator::Led2, false);
        leds.set(Indicator::Led3, false);
        leds
    }
}

fn drive<P: OutputPin>(pin: &mut P, on: bool) -> Result<(), P::Error> {
    if on {
        pin.set_high()
    } else {
        pin.set_low()
    }
}

impl<L1, L2, L3> StatusLeds for Indicators<L1, L2, L3>
where
    L1: OutputPin,
    L2: OutputPin,
    L3: OutputPin,
    L1::Error: core::fmt::Debug,
    L2::Error: core::fmt::Debug,
    L3::Error: core::fmt::Debug,
{
    fn set(&mut self, indicator: Indicator, on: bool) {
        let res = match indicator {
            Indicator::Led1 => drive(&mut self.led1, on).map_err(|e| warn!("{:?}: {:?}", indicator, Dbg(&e))),
            Indicator::Led2 => drive(&mut self.led2, on).map_err(|e| warn!("{:?}: {:?}", indicator, Dbg(&e))),
            Indicator::Led3 => drive(&mut self.led3, on).map_err(|e| warn!("{:?}: {:?}", indicator, Dbg(&e))),
        };
        if res.is_ok() {
            trace!("{:?} -> {}", indicator, on);
        }
    }
}

/// Everything the demo drives: the tag chip, the status LEDs and the
/// RF disable line.
///
/// Built once at startup and passed around by reference.
pub struct Board<T, S, RF> {
    tag: T,
    leds: S,
    rf_disable: RF,
}

impl<T, S, RF> Board<T, S, RF>
where
    T: EnergyHarvesting,
    S: StatusLeds,
    RF: OutputPin,
    RF::Error: core::fmt::Debug,
{
    /// Takes ownership of the parts and turns the RF interface on.
    pub fn new(tag: T, leds: S, rf_disable: RF) -> Self {
        let mut board = Self {
            tag,
            leds,
            rf_disable,
        };
        board.set_rf_enabled(true);
        board
    }

    pub fn tag(&mut self) -> &mut T {
        &mut self.tag
    }

    pub fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        self.leds.set(indicator, on);
    }

    /// RF_DISABLE is active high: driving it high mutes the RF interface.
    pub fn set_rf_enabled(&mut self, enabled: bool) {
        if let Err(e) = drive(&mut self.rf_disable, !enabled) {
            warn!("rf_disable: {:?}", Dbg(&e));
        }
    }

    pub fn enable_energy_harvesting(&mut self) -> Result<(), T::Error> {
        self.tag.enable_energy_harvesting()
    }

    pub fn release(self) -> (T, S, RF) {
        (self.tag, self.leds, self.rf_disable)
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;
    use std::{cell::RefCell, rc::Rc, vec::Vec};

    use super::*;
    use crate::m24lr::fake::Bus;

    #[derive(Clone, Default)]
    struct Pin(Rc<RefCell<Vec<bool>>>);

    impl OutputPin for Pin {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().push(true);
            Ok(())
        }
    }

    struct BrokenPin;

    impl OutputPin for BrokenPin {
        type Error = ();

        fn set_low(&mut self) -> Result<(), ()> {
            Err(())
        }

        fn set_high(&mut self) -> Result<(), ()> {
            Err(())
        }
    }

    #[test]
    fn leds_start_off_and_follow_indicators() {
        let (l1, l2, l3) = (Pin::default(), Pin::default(), Pin::default());
        let mut leds = Indicators::new(l1.clone(), l2.clone(), l3.clone());
        leds.set(Indicator::Led2, true);
        leds.set(Indicator::Led1, true);
        leds.set(Indicator::Led1, false);

        assert_eq!(*l1.0.borrow(), [false, true, false]);
        assert_eq!(*l2.0.borrow(), [false, true]);
        assert_eq!(*l3.0.borrow(), [false]);
    }

    #[test]
    fn pin_errors_do_not_stop_the_others() {
        let l3 = Pin::default();
        let mut leds = Indicators::new(BrokenPin, BrokenPin, l3.clone());
        leds.set(Indicator::Led1, true);
        leds.set(Indicator::Led3, true);
        assert_eq!(*l3.0.borrow(), [false, true]);
    }

    #[test]
    fn board_enables_rf_and_energy_harvesting() {
        let bus = Bus::new();
        let rf = Pin::default();
        let leds = Indicators::new(Pin::default(), Pin::default(), Pin::default());
        let mut board = Board::new(bus.driver(), leds, rf.clone());
        assert_eq!(*rf.0.borrow(), [false]);

        board.enable_energy_harvesting().unwrap();
        assert!(board.tag().energy_harvesting_enabled().unwrap());

        board.set_rf_enabled(false);
        assert_eq!(*rf.0.borrow(), [false, true]);
    }
}
