//! Sound card bring-up and the user visible controls.
use cirrus_codecs::wm8804::{CLKOUT_HZ, RecoveredFrequency};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;

use crate::{
    codec::{CodecError, I2sController, PrimaryCodec, SpdifTransceiver},
    fll::{DEFAULT_SETTLE_TIME, ProgramError, ProgramStage},
    governor::ClockGovernor,
    rate::{ControlError, RateLimiter, RateRange},
    spdif::{self, ChannelStatus, ChannelStatusCache, SpdifFlag},
    time::{Hertz, Microseconds},
};

/// Static configuration of the card.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CardConfig {
    /// Card rate assumed until the first stream is negotiated.
    pub default_rate: Hertz,
    /// Frequency of the WM8804 CLKOUT pin which feeds MCLK1 of the WM5102.
    pub clkout: Hertz,
    /// Settle delay after FLL1 was programmed.
    pub fll_settle_time: Microseconds,
    /// Initial selection of [crate::rate::MIN_RATES].
    pub min_rate_index: usize,
    /// Initial selection of [crate::rate::MAX_RATES].
    pub max_rate_index: usize,
}

impl CardConfig {
    pub const fn new() -> Self {
        Self {
            default_rate: Hertz::from_raw(44_100),
            clkout: Hertz::from_raw(CLKOUT_HZ),
            fll_settle_time: DEFAULT_SETTLE_TIME,
            min_rate_index: 1,
            max_rate_index: 0,
        }
    }
}

impl Default for CardConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Cirrus Logic Audio Card for the Raspberry Pi.
///
/// The card forwards all clocking relevant events to its [ClockGovernor]. Rate limits and the
/// SPDIF controls do not depend on the clock state and are served without taking the governor
/// lock.
pub struct CirrusCard<M: RawMutex, P, S, I, D> {
    governor: ClockGovernor<M, P, S, I, D>,
    rates: RateLimiter,
    channel_status: ChannelStatusCache,
}

impl<M, P, S, I, D> CirrusCard<M, P, S, I, D>
where
    M: RawMutex,
    P: PrimaryCodec,
    S: SpdifTransceiver,
    I: I2sController,
    D: DelayNs,
{
    pub fn new(config: CardConfig, primary: P, spdif: S, i2s: I, delay: D) -> Self {
        Self {
            governor: ClockGovernor::new(&config, primary, spdif, i2s, delay),
            rates: RateLimiter::new(config.min_rate_index, config.max_rate_index),
            channel_status: ChannelStatusCache::new(),
        }
    }

    /// Bring up the clocking of both codecs.
    ///
    /// Must be called once after all components of the card were bound, before any of the
    /// stream or power domain events are forwarded.
    pub fn init(&self) -> Result<(), ProgramError> {
        self.governor.init_primary()?;
        self.channel_status
            .load(self.governor.spdif())
            .map_err(|e| {
                log::error!("init_wm8804: Failed to read SPDIF channel status: {}", e);
                ProgramError::new(ProgramStage::ChannelStatus, e)
            })?;
        self.governor.init_spdif()?;
        self.governor.late_probe(&self.channel_status.get())?;
        log::info!("Cirrus Logic Audio Card initialised");
        Ok(())
    }

    #[inline]
    pub fn governor(&self) -> &ClockGovernor<M, P, S, I, D> {
        &self.governor
    }

    /// Constraint the framework applies to a stream which starts up.
    pub fn on_stream_startup(&self) -> Option<RateRange> {
        let range = self.rates.constraint();
        if let Some(range) = range {
            log::debug!(
                "startup: limiting rate to {}-{}",
                range.min.raw(),
                range.max.raw()
            );
        }
        range
    }

    #[inline]
    pub fn min_rate_index(&self) -> usize {
        self.rates.min_rate_index()
    }

    #[inline]
    pub fn max_rate_index(&self) -> usize {
        self.rates.max_rate_index()
    }

    pub fn set_min_rate_index(&self, index: usize) -> Result<bool, ControlError> {
        self.rates.set_min_rate_index(index)
    }

    pub fn set_max_rate_index(&self, index: usize) -> Result<bool, ControlError> {
        self.rates.set_max_rate_index(index)
    }

    /// Channel status sent with SPDIF playback.
    #[inline]
    pub fn playback_channel_status(&self) -> ChannelStatus {
        self.channel_status.get()
    }

    pub fn set_playback_channel_status(&self, status: &ChannelStatus) -> Result<bool, CodecError> {
        self.channel_status.put(self.governor.spdif(), status)
    }

    /// Bits of the channel status which can be written.
    #[inline]
    pub const fn channel_status_mask(&self) -> ChannelStatus {
        spdif::channel_status_mask()
    }

    /// Channel status of the received SPDIF stream.
    pub fn capture_channel_status(&self) -> Result<ChannelStatus, CodecError> {
        spdif::read_capture_status(self.governor.spdif())
    }

    pub fn spdif_flag(&self, flag: SpdifFlag) -> Result<bool, CodecError> {
        spdif::read_flag(self.governor.spdif(), flag)
    }

    pub fn recovered_frequency(&self) -> Result<RecoveredFrequency, CodecError> {
        spdif::read_recovered_frequency(self.governor.spdif())
    }
}
