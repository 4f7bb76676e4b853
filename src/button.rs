use core::sync::atomic::{AtomicBool, Ordering};

/// One-bit handoff from the button interrupt to the main loop.
///
/// Only plain loads and stores are used, so this works on cores without
/// atomic read-modify-write (thumbv6m).
pub struct ButtonFlag(AtomicBool);

impl ButtonFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Called from the interrupt handler on a falling edge.
    pub fn signal(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for ButtonFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// What happens after the tag has been written.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunMode {
    /// Wait for button presses and read the tag on each one. Never returns.
    #[default]
    ButtonLoop,
    /// Read the tag once and return.
    SingleShot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_then_clear() {
        static FLAG: ButtonFlag = ButtonFlag::new();
        assert!(!FLAG.is_set());
        FLAG.signal();
        FLAG.signal();
        assert!(FLAG.is_set());
        FLAG.clear();
        assert!(!FLAG.is_set());
    }

    #[test]
    fn signal_from_another_thread_is_seen() {
        let flag = std::sync::Arc::new(ButtonFlag::new());
        let isr = flag.clone();
        std::thread::spawn(move || isr.signal()).join().unwrap();
        assert!(flag.is_set());
    }
}
