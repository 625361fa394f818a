//! # FLL1 programmer
//!
//! FLL1 of the WM5102 produces SYSCLK. It is either free-running, locked against the 12 MHz
//! CLKOUT of the WM8804, or synchronised to the bit clock the WM8804 recovers from the SPDIF
//! receiver. In the latter case the FLL1 reference path is locked against CLKOUT first, and
//! the main path is then locked against the AIF2 bit clock.
//!
//! The FLL can not be re-locked in place: any change of the programming goes through a full
//! clear of both the main and the reference path.
use core::fmt;

use cirrus_codecs::wm5102::{FllId, FllSource};
use embedded_hal::delay::DelayNs;

use crate::{
    codec::{CodecError, PrimaryCodec},
    time::{Hertz, Microseconds, Microseconds64},
};

/// Maximum SYSCLK for sample rates which are a multiple of 4 kHz (48 kHz, 96 kHz ...).
pub const FAMILY_48K_SYSCLK: Hertz = Hertz::from_raw(49_152_000);
/// Maximum SYSCLK for sample rates derived from 11.025 kHz (44.1 kHz, 88.2 kHz ...).
pub const FAMILY_44K1_SYSCLK: Hertz = Hertz::from_raw(45_158_400);

/// Ratio between the AIF2 bit clock and the sample rate on the WM8804 link.
pub const SYNC_BCLK_RATIO: u32 = 64;

/// Default time the FLL needs to settle after it was programmed.
pub const DEFAULT_SETTLE_TIME: Microseconds = Microseconds::from_ticks(1_000);

/// Coarse classification of sample rates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RateFamily {
    /// Integer multiple of 4 kHz.
    Khz48,
    /// Derived from 11.025 kHz.
    Khz44_1,
}

impl RateFamily {
    /// SYSCLK frequency used for all rates of this family.
    pub const fn sysclk(&self) -> Hertz {
        match self {
            RateFamily::Khz48 => FAMILY_48K_SYSCLK,
            RateFamily::Khz44_1 => FAMILY_44K1_SYSCLK,
        }
    }
}

pub const fn classify_rate_family(rate: Hertz) -> RateFamily {
    if rate.raw() % 4000 == 0 {
        RateFamily::Khz48
    } else {
        RateFamily::Khz44_1
    }
}

/// Target synthesizer frequency for a sample rate.
#[inline]
pub const fn sysclk_for_rate(rate: Hertz) -> Hertz {
    classify_rate_family(rate).sysclk()
}

/// Current programming of FLL1.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockMode {
    /// Main and reference path are disabled.
    Off,
    /// Locked against the CLKOUT crystal clock of the WM8804.
    FreeRunning(Hertz),
    /// Locked against the bit clock recovered from the SPDIF receiver.
    ExternalReference(Hertz),
}

impl ClockMode {
    #[inline]
    pub const fn is_off(&self) -> bool {
        matches!(self, ClockMode::Off)
    }

    /// Output frequency of FLL1, [None] if it is off.
    pub const fn frequency(&self) -> Option<Hertz> {
        match self {
            ClockMode::Off => None,
            ClockMode::FreeRunning(freq) | ClockMode::ExternalReference(freq) => Some(*freq),
        }
    }
}

impl fmt::Display for ClockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockMode::Off => write!(f, "off"),
            ClockMode::FreeRunning(freq) => write!(f, "{} Hz", freq.raw()),
            ClockMode::ExternalReference(freq) => write!(f, "{} Hz (sync)", freq.raw()),
        }
    }
}

/// Hardware programming step which failed.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProgramStage {
    #[error("clearing FLL1")]
    ClearFll1,
    #[error("clearing FLL1 reference path")]
    ClearFll1Refclk,
    #[error("locking FLL1 to CLKOUT")]
    LockFreeRunning,
    #[error("locking FLL1 reference path to CLKOUT")]
    LockReference,
    #[error("locking FLL1 to AIF2 bit clock")]
    LockSync,
    #[error("setting SYSCLK")]
    Sysclk,
    #[error("setting bit clock ratio")]
    BclkRatio,
    #[error("setting TDM slots")]
    TdmSlot,
    #[error("setting WM8804 PLL")]
    SpdifPll,
    #[error("setting WM8804 clock source")]
    SpdifSysclk,
    #[error("setting WM8804 MCLK divider")]
    SpdifMclkDivider,
    #[error("setting 32 kHz clock source")]
    Clock32k,
    #[error("setting DAI clock domain")]
    DaiClockDomain,
    #[error("reading SPDIF channel status")]
    ChannelStatus,
}

#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[error("{stage} failed: {source}")]
pub struct ProgramError {
    pub stage: ProgramStage,
    #[source]
    pub source: CodecError,
}

impl ProgramError {
    #[inline]
    pub const fn new(stage: ProgramStage, source: CodecError) -> Self {
        Self { stage, source }
    }
}

/// Counters of the FLL programmer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FllStats {
    /// Successful clears of both FLL paths.
    pub clears: u32,
    /// Successful locks, free-running or synchronised.
    pub locks: u32,
    /// Accumulated settle delay.
    pub settle_total: Microseconds64,
    /// Longest accumulated settle delay within one locked section.
    pub longest_section_settle: Microseconds,
}

/// Programs FLL1 and keeps track of its mode.
///
/// This structure only tracks state. Access to it has to be serialized by the owner, see
/// [crate::governor::ClockGovernor].
#[derive(Debug)]
pub struct FllProgrammer {
    mode: ClockMode,
    /// The reference path was locked without the main path following it.
    refclk_dangling: bool,
    clkout: Hertz,
    settle_time: Microseconds,
    section_settle: Microseconds,
    stats: FllStats,
}

impl FllProgrammer {
    /// `clkout` is the frequency of the WM8804 CLKOUT pin which is wired to MCLK1.
    pub const fn new(clkout: Hertz, settle_time: Microseconds) -> Self {
        Self {
            mode: ClockMode::Off,
            refclk_dangling: false,
            clkout,
            settle_time,
            section_settle: Microseconds::from_ticks(0),
            stats: FllStats {
                clears: 0,
                locks: 0,
                settle_total: Microseconds64::from_ticks(0),
                longest_section_settle: Microseconds::from_ticks(0),
            },
        }
    }

    #[inline]
    pub const fn mode(&self) -> ClockMode {
        self.mode
    }

    #[inline]
    pub const fn stats(&self) -> FllStats {
        self.stats
    }

    /// Any part of FLL1 may still be programmed, so the next lock has to clear first.
    #[inline]
    pub const fn needs_clear(&self) -> bool {
        !self.mode.is_off() || self.refclk_dangling
    }

    /// Disable both the main and the reference path of FLL1.
    ///
    /// Both paths are always cleared, the first failure is returned. On failure the tracked
    /// mode is left unchanged.
    pub fn clear<P: PrimaryCodec>(&mut self, codec: &P) -> Result<(), ProgramError> {
        let zero = Hertz::from_raw(0);
        let main = codec.set_fll(FllId::Fll1, FllSource::None, zero, zero);
        let refclk = codec.set_fll(FllId::Fll1Refclk, FllSource::None, zero, zero);

        if let Err(e) = main {
            log::warn!("setting FLL1 to zero failed: {}", e);
            return Err(ProgramError::new(ProgramStage::ClearFll1, e));
        }
        if let Err(e) = refclk {
            log::warn!("setting FLL1_REFCLK to zero failed: {}", e);
            return Err(ProgramError::new(ProgramStage::ClearFll1Refclk, e));
        }
        self.mode = ClockMode::Off;
        self.refclk_dangling = false;
        self.stats.clears += 1;
        Ok(())
    }

    /// Lock FLL1 to `target` using CLKOUT as reference.
    ///
    /// FLL1 is cleared first if any part of it is programmed.
    pub fn lock_free_running<P: PrimaryCodec, D: DelayNs>(
        &mut self,
        codec: &P,
        delay: &mut D,
        target: Hertz,
    ) -> Result<(), ProgramError> {
        if self.needs_clear() {
            self.clear(codec)?;
        }
        let result = codec.set_fll(FllId::Fll1, FllSource::Mclk1, self.clkout, target);
        self.settle(delay);
        if let Err(e) = result {
            log::error!("Failed to set FLL1 to {}: {}", target.raw(), e);
            return Err(ProgramError::new(ProgramStage::LockFreeRunning, e));
        }
        self.mode = ClockMode::FreeRunning(target);
        self.stats.locks += 1;
        Ok(())
    }

    /// Lock the reference path to `ref_freq` using CLKOUT, then lock the main path against
    /// the AIF2 bit clock running at `sync_freq`.
    ///
    /// FLL1 is cleared first if any part of it is programmed. A failure of the reference path
    /// aborts before the main path is touched. If the main path fails, the reference path stays
    /// locked and is cleared by the next [Self::clear] or lock.
    pub fn lock_external_reference<P: PrimaryCodec, D: DelayNs>(
        &mut self,
        codec: &P,
        delay: &mut D,
        ref_freq: Hertz,
        sync_freq: Hertz,
    ) -> Result<(), ProgramError> {
        if self.needs_clear() {
            self.clear(codec)?;
        }
        codec
            .set_fll(FllId::Fll1Refclk, FllSource::Mclk1, self.clkout, ref_freq)
            .map_err(|e| {
                log::error!("Failed to set FLL1_REFCLK to {}: {}", ref_freq.raw(), e);
                ProgramError::new(ProgramStage::LockReference, e)
            })?;
        self.refclk_dangling = true;

        let result = codec.set_fll(FllId::Fll1, FllSource::Aif2Bclk, sync_freq, ref_freq);
        self.settle(delay);
        if let Err(e) = result {
            log::error!(
                "Failed to set FLL1 with Sync Clock {} to {}: {}",
                sync_freq.raw(),
                ref_freq.raw(),
                e
            );
            return Err(ProgramError::new(ProgramStage::LockSync, e));
        }
        self.mode = ClockMode::ExternalReference(ref_freq);
        self.refclk_dangling = false;
        self.stats.locks += 1;
        Ok(())
    }

    pub(crate) fn begin_section(&mut self) {
        self.section_settle = Microseconds::from_ticks(0);
    }

    pub(crate) fn end_section(&mut self) {
        if self.section_settle > self.stats.longest_section_settle {
            self.stats.longest_section_settle = self.section_settle;
        }
    }

    fn settle<D: DelayNs>(&mut self, delay: &mut D) {
        let micros = self.settle_time.ticks();
        delay.delay_us(micros);
        self.section_settle = Microseconds::from_ticks(self.section_settle.ticks() + micros);
        self.stats.settle_total =
            Microseconds64::from_ticks(self.stats.settle_total.ticks() + u64::from(micros));
    }
}
