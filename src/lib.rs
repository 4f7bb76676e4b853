//! Write an NDEF URI record to an M24LR04E-R tag and print it back on demand.
//!
//! Everything here is generic over the `embedded-hal` 0.2 traits; the
//! board specific wiring lives in the `firmware` crate.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod board;
pub mod button;
pub mod demo;
mod error;
pub mod m24lr;
pub mod ndef;
pub mod tag;

pub use board::{Board, Indicator, Indicators, StatusLeds};
pub use button::{ButtonFlag, RunMode};
pub use error::Error;
pub use m24lr::M24lr;
pub use tag::{EnergyHarvesting, NdefTag};
