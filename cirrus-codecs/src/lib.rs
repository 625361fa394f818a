//! # Register definitions for the Cirrus Logic Audio Card codecs
//!
//! This crate contains the register vocabulary of the two codecs found on the Cirrus Logic
//! Audio Card for the Raspberry Pi:
//!
//! - The [WM5102](wm5102) audio hub codec, whose FLL1 synthesizer produces the card system clock.
//! - The [WM8804](wm8804) digital audio interface transceiver, which provides the reference
//!   clock for the WM5102 and handles SPDIF transmit and receive.
//!
//! Only the registers and identifiers which are relevant for clocking and SPDIF status are
//! defined here. The typed machine driver on top of these definitions lives in the
//! `rpi-cirrus` crate.
#![cfg_attr(not(test), no_std)]

pub mod wm5102;
pub mod wm8804;
