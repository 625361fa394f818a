//! WM8804 digital audio interface transceiver registers.
//!
//! The WM8804 uses 8-bit register addresses and 8-bit register values.

/// Default 7-bit I2C address when the CSB/GPO2 pin is pulled high.
pub const I2C_ADDR: u8 = 0x3B;
/// 7-bit I2C address when the CSB/GPO2 pin is pulled low.
pub const I2C_ADDR_ALT: u8 = 0x3A;

pub const RST_DEVID1: u8 = 0x00;
pub const DEVID2: u8 = 0x01;
pub const DEVREV: u8 = 0x02;
pub const PLL1: u8 = 0x03;
pub const PLL2: u8 = 0x04;
pub const PLL3: u8 = 0x05;
pub const PLL4: u8 = 0x06;
pub const PLL5: u8 = 0x07;
pub const PLL6: u8 = 0x08;
pub const SPDMODE: u8 = 0x09;
pub const INTMASK: u8 = 0x0A;
pub const INTSTAT: u8 = 0x0B;
pub const SPDSTAT: u8 = 0x0C;
/// First of the five received channel status registers.
pub const RXCHAN1: u8 = 0x0D;
pub const RXCHAN2: u8 = 0x0E;
pub const RXCHAN3: u8 = 0x0F;
pub const RXCHAN4: u8 = 0x10;
pub const RXCHAN5: u8 = 0x11;
/// First of the five transmitted channel status registers.
pub const SPDTX1: u8 = 0x12;
pub const SPDTX2: u8 = 0x13;
pub const SPDTX3: u8 = 0x14;
pub const SPDTX4: u8 = 0x15;
pub const SPDTX5: u8 = 0x16;

/// Number of channel status bytes exposed to the user.
pub const CHANNEL_STATUS_LEN: usize = 4;

/// Valid bits of the exposed channel status bytes. Only 6 bits of the fourth byte are backed
/// by the SPDTX4 and RXCHAN4 registers.
pub const CHANNEL_STATUS_MASK: [u8; CHANNEL_STATUS_LEN] = [0xff, 0xff, 0xff, 0x3f];

/// Frequency of the CLKOUT pin when it is driven by the crystal oscillator.
pub const CLKOUT_HZ: u32 = 12_000_000;

/// Lowest sample rate the WM8804 PLL can lock onto.
pub const MIN_SAMPLE_RATE_HZ: u32 = 32_000;

/// Clock identifiers accepted by the DAI system clock configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SysclkSource {
    /// Transmitter clocked from the MCLK pin.
    TxMclk = 1,
    /// Transmitter clocked from the PLL.
    TxPll = 2,
    /// CLKOUT driven by CLK1.
    ClkoutClk1 = 3,
    /// CLKOUT driven by the crystal oscillator.
    ClkoutOscclk = 4,
}

/// MCLK divider relative to the sample rate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MclkDivider {
    Fs256 = 0,
    Fs128 = 1,
}

impl MclkDivider {
    /// Multiplier between sample rate and MCLK frequency.
    pub const fn ratio(&self) -> u32 {
        match self {
            MclkDivider::Fs256 => 256,
            MclkDivider::Fs128 => 128,
        }
    }
}

/// Sample rate band detected by the SPDIF receiver.
#[bitbybit::bitenum(u2, exhaustive = true)]
#[derive(Debug, PartialEq, Eq)]
pub enum RecoveredFrequency {
    Khz176_4Or192 = 0b00,
    Khz88_2Or96 = 0b01,
    Khz44_1Or48 = 0b10,
    Khz32 = 0b11,
}

impl RecoveredFrequency {
    pub const fn label(&self) -> &'static str {
        match self {
            RecoveredFrequency::Khz176_4Or192 => "176.4/192 kHz",
            RecoveredFrequency::Khz88_2Or96 => "88.2/96 kHz",
            RecoveredFrequency::Khz44_1Or48 => "44.1/48 kHz",
            RecoveredFrequency::Khz32 => "32 kHz",
        }
    }
}

/// SPDIF receiver status register.
///
/// Several of these flags are active low, see the `_n` suffix.
#[bitbybit::bitfield(u8)]
#[derive(Debug)]
pub struct SpdifStatus {
    /// S/PDIF receiver PLL is not locked to the incoming stream.
    #[bit(6, r)]
    unlock: bool,
    #[bits(4..=5, r)]
    rec_freq: RecoveredFrequency,
    /// Pre-emphasis is signalled in the channel status.
    #[bit(3, r)]
    deemph: bool,
    /// 0: Copyright asserted. 1: No copyright.
    #[bit(2, r)]
    cpy_n: bool,
    /// 0: Stream carries PCM audio. 1: Non-PCM data.
    #[bit(1, r)]
    pcm_n: bool,
    /// 0: Stream carries audio. 1: Non-audio data.
    #[bit(0, r)]
    audio_n: bool,
}

/// Interrupt status register. Reading the register clears the latched bits.
#[bitbybit::bitfield(u8)]
#[derive(Debug)]
pub struct InterruptStatus {
    #[bit(7, r)]
    upd_rec_freq: bool,
    #[bit(6, r)]
    upd_deemph: bool,
    #[bit(5, r)]
    upd_cpy_n: bool,
    #[bit(4, r)]
    upd_non_audio: bool,
    /// Transmission error in the incoming stream.
    #[bit(3, r)]
    trans_err: bool,
    /// Channel status update.
    #[bit(2, r)]
    csud: bool,
    /// Invalid bit detected in the incoming stream.
    #[bit(1, r)]
    invalid: bool,
    #[bit(0, r)]
    upd_unlock: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spdif_status_decode() {
        let status = SpdifStatus::new_with_raw_value(0b0110_0101);
        assert!(status.unlock());
        assert_eq!(status.rec_freq(), RecoveredFrequency::Khz44_1Or48);
        assert!(status.cpy_n());
        assert!(!status.pcm_n());
        assert!(status.audio_n());
        assert_eq!(status.rec_freq().label(), "44.1/48 kHz");
    }

    #[test]
    fn interrupt_status_decode() {
        let irq = InterruptStatus::new_with_raw_value(0b1000_1010);
        assert!(irq.upd_rec_freq());
        assert!(irq.trans_err());
        assert!(irq.invalid());
        assert!(!irq.csud());
    }
}
