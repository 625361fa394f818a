//! WM5102 (Arizona family) clocking identifiers and registers.
//!
//! The FLL and SYSCLK configuration itself is done by the codec driver. The identifiers here
//! select which block is configured and from which source.

/// Register controlling the 32 kHz clock.
pub const CLOCK_32K_1: u16 = 0x0100;
/// Register controlling SYSCLK.
pub const SYSTEM_CLOCK_1: u16 = 0x0101;

/// Synthesizer blocks of the WM5102.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FllId {
    /// Main output stage of FLL1.
    Fll1 = 1,
    /// FLL2.
    Fll2 = 2,
    /// Reference path of FLL1, which allows FLL1 to be locked against a synchronisation clock.
    Fll1Refclk = 3,
    Fll2Refclk = 4,
}

/// Input sources for the FLLs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FllSource {
    /// Disconnect the FLL input, which disables the FLL.
    None,
    Mclk1,
    Mclk2,
    Aif1Bclk,
    Aif2Bclk,
    Aif3Bclk,
}

impl FllSource {
    /// Raw value of the source selection field, [None] for [FllSource::None].
    pub const fn raw_value(&self) -> Option<u8> {
        match self {
            FllSource::None => None,
            FllSource::Mclk1 => Some(0x0),
            FllSource::Mclk2 => Some(0x1),
            FllSource::Aif1Bclk => Some(0x8),
            FllSource::Aif2Bclk => Some(0x9),
            FllSource::Aif3Bclk => Some(0xA),
        }
    }
}

/// Clock domains of the WM5102.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockId {
    Sysclk = 1,
    Asyncclk = 2,
    Opclk = 3,
    AsyncOpclk = 4,
}

/// Sources for a clock domain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockSource {
    Mclk1 = 0x0,
    Mclk2 = 0x1,
    Fll1 = 0x4,
    Fll2 = 0x5,
}

/// Audio interfaces of the WM5102 which are wired on the card.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dai {
    /// AIF1, connected to the I2S controller of the host.
    Aif1,
    /// AIF2, connected to the WM8804.
    Aif2,
}

#[bitbybit::bitenum(u2, exhaustive = true)]
#[derive(Debug, PartialEq, Eq)]
pub enum Clock32kSource {
    Mclk1 = 0b00,
    Mclk2 = 0b01,
    Sysclk = 0b10,
    Asyncclk = 0b11,
}

/// Mask of the source field inside [CLOCK_32K_1].
pub const CLK_32K_SRC_MASK: u16 = 0x0003;

#[bitbybit::bitfield(u16, default = 0x0)]
#[derive(Debug)]
pub struct Clock32k {
    #[bit(6, rw)]
    enable: bool,
    #[bits(0..=1, rw)]
    src: Clock32kSource,
}
