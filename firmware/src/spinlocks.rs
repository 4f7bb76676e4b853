//! Globals shared between the main loop and interrupt handlers, each one
//! guarded by one of the RP2040 hardware spinlocks.

/// `N => Name : Type = init;` declares a guard `Name` that derefs to a
/// static `Type` for as long as hardware spinlock `N` is held.
macro_rules! spinlocks {
    ($($n:literal => $name:ident : $inner:ty = $default:expr;)*) => {
        $(
            pub(crate) struct $name {
                _lock: rp2040_hal::sio::Spinlock<$n>,
            }

            impl $name {
                fn cell() -> *mut $inner {
                    static mut GLOBAL: $inner = $default;
                    unsafe { core::ptr::addr_of_mut!(GLOBAL) }
                }

                /// Spin until the lock is free.
                pub fn claim() -> Self {
                    Self { _lock: rp2040_hal::sio::Spinlock::<$n>::claim() }
                }

                /// For interrupt handlers, which must not spin on a lock
                /// the code they interrupted may hold.
                pub fn try_claim() -> Option<Self> {
                    Some(Self { _lock: rp2040_hal::sio::Spinlock::<$n>::try_claim()? })
                }
            }

            impl core::ops::Deref for $name {
                type Target = $inner;

                fn deref(&self) -> &$inner {
                    // Holding the lock makes this the only live reference.
                    unsafe { &*Self::cell() }
                }
            }

            impl core::ops::DerefMut for $name {
                fn deref_mut(&mut self) -> &mut $inner {
                    unsafe { &mut *Self::cell() }
                }
            }
        )*
    };
}

spinlocks!(
    0 => UsbSpinlock : Option<crate::usb_serial::UsbManager> = None;
);
