//! # WM8804 register access over I2C
//!
//! The WM8804 expects the register address as first byte of a write. A register is read by
//! writing the address and reading back a single byte.
use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

use crate::codec::{CodecError, Wm8804Registers};

pub use cirrus_codecs::wm8804::{I2C_ADDR, I2C_ADDR_ALT};

/// Register map of a WM8804 connected to an I2C bus.
///
/// The bus is kept behind a critical section mutex so that register accesses from the SPDIF
/// status controls and from the clock governor do not interleave on the bus.
pub struct Wm8804Regmap<I2C> {
    i2c: Mutex<RefCell<I2C>>,
    addr: u8,
}

fn map_i2c_error(kind: ErrorKind) -> CodecError {
    match kind {
        ErrorKind::NoAcknowledge(_) => CodecError::Nack,
        _ => CodecError::Bus,
    }
}

impl<I2C: I2c> Wm8804Regmap<I2C> {
    /// Create a register map for the device at the given 7-bit address.
    pub const fn new(i2c: I2C, addr: u8) -> Self {
        Self {
            i2c: Mutex::new(RefCell::new(i2c)),
            addr,
        }
    }

    #[inline]
    pub const fn addr(&self) -> u8 {
        self.addr
    }

    /// Release the I2C bus.
    pub fn release(self) -> I2C {
        self.i2c.into_inner().into_inner()
    }
}

impl<I2C: I2c> Wm8804Registers for Wm8804Regmap<I2C> {
    fn read_register(&self, reg: u8) -> Result<u8, CodecError> {
        critical_section::with(|cs| {
            let mut i2c = self.i2c.borrow_ref_mut(cs);
            let mut value = [0u8; 1];
            i2c.write_read(self.addr, &[reg], &mut value)
                .map_err(|e| map_i2c_error(e.kind()))?;
            Ok(value[0])
        })
    }

    fn update_register(&self, reg: u8, mask: u8, value: u8) -> Result<bool, CodecError> {
        critical_section::with(|cs| {
            let mut i2c = self.i2c.borrow_ref_mut(cs);
            let mut current = [0u8; 1];
            i2c.write_read(self.addr, &[reg], &mut current)
                .map_err(|e| map_i2c_error(e.kind()))?;
            let new = (current[0] & !mask) | (value & mask);
            if new == current[0] {
                return Ok(false);
            }
            i2c.write(self.addr, &[reg, new])
                .map_err(|e| map_i2c_error(e.kind()))?;
            Ok(true)
        })
    }
}
