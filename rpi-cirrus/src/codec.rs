//! Hardware seams of the machine driver.
//!
//! The machine driver does not talk to the codec registers for clocking itself. It requests
//! clock configurations from the codec drivers through the traits in this module, in the same
//! way a ASoC machine driver calls into the component and DAI operations of its codecs.
//!
//! All methods take `&self`. Implementors are expected to serialize their own bus accesses,
//! which allows the SPDIF status registers to be accessed without holding the clock governor
//! lock.
use cirrus_codecs::{
    wm5102::{ClockId, ClockSource, Dai, FllId, FllSource},
    wm8804::{MclkDivider, SysclkSource},
};

use crate::time::Hertz;

/// Failure reported by a codec driver or its register access layer.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("bus error")]
    Bus,
    #[error("transfer not acknowledged")]
    Nack,
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("timeout")]
    Timeout,
}

/// Identifies the device a power domain event belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u32);

/// Operations of the WM5102 codec driver used by the machine driver.
pub trait PrimaryCodec {
    /// Device which owns the power domain of this codec.
    fn device_id(&self) -> DeviceId;

    /// Configure one of the FLL blocks.
    ///
    /// Passing [FllSource::None] together with zero frequencies disables the block.
    fn set_fll(
        &self,
        fll: FllId,
        source: FllSource,
        fref: Hertz,
        fout: Hertz,
    ) -> Result<(), CodecError>;

    /// Configure a clock domain. A frequency of zero disables the clock.
    fn set_sysclk(&self, clock: ClockId, source: ClockSource, freq: Hertz)
    -> Result<(), CodecError>;

    /// Configure the TDM slots of AIF1.
    fn set_tdm_slot(
        &self,
        tx_mask: u32,
        rx_mask: u32,
        slots: u8,
        slot_width: u8,
    ) -> Result<(), CodecError>;

    /// Assign an audio interface to a clock domain.
    fn set_dai_clock_domain(&self, dai: Dai, clock: ClockId) -> Result<(), CodecError>;

    /// Read-modify-write of a codec register. Returns whether the register value changed.
    fn update_bits(&self, reg: u16, mask: u16, value: u16) -> Result<bool, CodecError>;
}

/// Raw register access to the WM8804.
pub trait Wm8804Registers {
    fn read_register(&self, reg: u8) -> Result<u8, CodecError>;

    /// Read-modify-write of a register. Returns whether the register value changed.
    fn update_register(&self, reg: u8, mask: u8, value: u8) -> Result<bool, CodecError>;
}

/// Operations of the WM8804 DAI driver used by the machine driver.
pub trait SpdifTransceiver: Wm8804Registers {
    /// Configure the PLL to produce `fout` from the `fin` reference.
    fn set_pll(&self, fin: Hertz, fout: Hertz) -> Result<(), CodecError>;

    fn set_sysclk(&self, source: SysclkSource, freq: Hertz) -> Result<(), CodecError>;

    fn set_mclk_divider(&self, divider: MclkDivider) -> Result<(), CodecError>;
}

/// Operations of the host I2S controller.
pub trait I2sController {
    /// Set the bit clock to sample rate ratio.
    fn set_bclk_ratio(&self, ratio: u32) -> Result<(), CodecError>;
}
