use crate::ndef;

/// Errors from the M24LR driver and the NDEF tag built on top of it.
///
/// `E` is the error type of the I2C bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    I2c(E),
    /// Reading the GPO pin failed.
    Pin,
    /// Access past the end of the EEPROM.
    OutOfRange,
    /// The RF side is busy with the tag, I2C access would be refused.
    RfBusy,
    SessionNotOpen,
    SessionAlreadyOpen,
    /// The encoded message does not fit in the NDEF area.
    MessageTooLarge,
    Ndef(ndef::Error),
}

impl<E> From<ndef::Error> for Error<E> {
    fn from(e: ndef::Error) -> Self {
        Error::Ndef(e)
    }
}
