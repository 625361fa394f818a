//! # Machine driver for the Cirrus Logic Audio Card
//!
//! The card combines a Wolfson/Cirrus WM5102 audio hub codec with a WM8804 SPDIF transceiver.
//! The WM5102 SYSCLK is produced by its FLL1, which runs in one of three modes:
//!
//! - off,
//! - free-running against the 12 MHz CLKOUT of the WM8804,
//! - synchronised to the bit clock the WM8804 recovers from an incoming SPDIF stream.
//!
//! The [governor::ClockGovernor] decides which mode is active, based on the events forwarded from
//! the audio framework. The [card::CirrusCard] bundles the governor with the bring-up sequence
//! and the user controls of the card.
//!
//! The codec drivers themselves are not part of this crate. They are abstracted by the traits in
//! the [codec] module. [wm8804::Wm8804Regmap] provides the WM8804 register access on top of an
//! [embedded_hal::i2c::I2c] bus.
#![cfg_attr(not(test), no_std)]

pub mod card;
pub mod codec;
pub mod fll;
pub mod governor;
pub mod power;
pub mod rate;
pub mod spdif;
pub mod stream;
pub mod time;
pub mod wm8804;

#[cfg(test)]
mod testutil;

pub use card::{CardConfig, CirrusCard};
pub use codec::CodecError;
pub use fll::{ClockMode, ProgramError};
pub use governor::ClockGovernor;
