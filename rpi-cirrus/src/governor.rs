//! # Clock governor
//!
//! The governor owns the clocking state of the card and serializes the independent
//! triggers which change it:
//!
//! - stream parameter negotiation and stream teardown,
//! - power domain transitions of the WM5102,
//! - power events of the SPDIF receive routing node.
//!
//! ## Locking
//!
//! All state lives behind a single blocking mutex. The lock is held across the FLL programming
//! sequences, including the settle delay after each lock, so a clear and the following re-lock
//! are atomic with respect to the other entry points. Contention is therefore bounded by the
//! settle delays of the longest sequence, which is the latency floor for all entry points. The
//! accumulated and worst per-section settle delays are exposed through [ClockGovernor::stats].
//!
//! The mutex flavor is selected with the `M` type parameter. On a host with threads or on a
//! multi-core target, use
//! [CriticalSectionRawMutex](embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex).
//! [NoopRawMutex](embassy_sync::blocking_mutex::raw::NoopRawMutex) is sufficient if all entry
//! points are called from the same executor.
//!
//! None of the entry points may be called from within another one. A recursive call panics.
//!
//! ## Precedence
//!
//! While the SPDIF receive path owns the clock, neither stream negotiation nor the power domain
//! prepare step touches FLL1. Only a power-down of the SPDIF receive node releases the clock,
//! and the next prepare or stream negotiation re-establishes the free-running mode.
use core::cell::RefCell;

use cirrus_codecs::{
    wm5102::{CLK_32K_SRC_MASK, CLOCK_32K_1, Clock32k, Clock32kSource, ClockId, ClockSource, Dai},
    wm8804::{self, MclkDivider, SysclkSource},
};
use embassy_sync::blocking_mutex::{Mutex, raw::RawMutex};
use embedded_hal::delay::DelayNs;

use crate::{
    card::CardConfig,
    codec::{DeviceId, I2sController, PrimaryCodec, SpdifTransceiver},
    fll::{
        ClockMode, FllProgrammer, ProgramError, ProgramStage, SYNC_BCLK_RATIO, sysclk_for_rate,
    },
    power::{BiasLevel, WidgetEvent},
    spdif::ChannelStatus,
    stream::{HwParams, LinkParams, OpenStreams, StreamDirection},
    time::{Hertz, Microseconds, Microseconds64},
};

/// Observable state of the governor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GovernorState {
    /// Rate of the last negotiated stream.
    pub card_rate: Hertz,
    pub clock_mode: ClockMode,
    /// The SPDIF receive path owns the clock.
    pub spdif_sync_active: bool,
    pub open_streams: OpenStreams,
    /// Parameters of the WM5102 to WM8804 link.
    pub link: LinkParams,
}

/// Latency and activity counters of the governor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GovernorStats {
    pub fll_clears: u32,
    pub fll_locks: u32,
    /// Settle delay spent while holding the governor lock, accumulated.
    pub settle_total: Microseconds64,
    /// Longest settle delay spent inside a single locked section.
    pub longest_locked_settle: Microseconds,
}

struct Shared<D> {
    card_rate: Hertz,
    spdif_sync_active: bool,
    open_streams: OpenStreams,
    link: LinkParams,
    fll: FllProgrammer,
    delay: D,
}

pub struct ClockGovernor<M: RawMutex, P, S, I, D> {
    primary: P,
    spdif: S,
    i2s: I,
    clkout: Hertz,
    shared: Mutex<M, RefCell<Shared<D>>>,
}

impl<M, P, S, I, D> ClockGovernor<M, P, S, I, D>
where
    M: RawMutex,
    P: PrimaryCodec,
    S: SpdifTransceiver,
    I: I2sController,
    D: DelayNs,
{
    pub fn new(config: &CardConfig, primary: P, spdif: S, i2s: I, delay: D) -> Self {
        Self {
            primary,
            spdif,
            i2s,
            clkout: config.clkout,
            shared: Mutex::new(RefCell::new(Shared {
                card_rate: config.default_rate,
                spdif_sync_active: false,
                open_streams: OpenStreams::none(),
                link: LinkParams::new(config.default_rate),
                fll: FllProgrammer::new(config.clkout, config.fll_settle_time),
                delay,
            })),
        }
    }

    #[inline]
    pub fn primary(&self) -> &P {
        &self.primary
    }

    #[inline]
    pub fn spdif(&self) -> &S {
        &self.spdif
    }

    /// Snapshot of the governor state.
    pub fn state(&self) -> GovernorState {
        self.locked(|shared| GovernorState {
            card_rate: shared.card_rate,
            clock_mode: shared.fll.mode(),
            spdif_sync_active: shared.spdif_sync_active,
            open_streams: shared.open_streams,
            link: shared.link,
        })
    }

    pub fn stats(&self) -> GovernorStats {
        self.locked(|shared| {
            let fll = shared.fll.stats();
            GovernorStats {
                fll_clears: fll.clears,
                fll_locks: fll.locks,
                settle_total: fll.settle_total,
                longest_locked_settle: fll.longest_section_settle,
            }
        })
    }

    fn locked<U>(&self, f: impl FnOnce(&mut Shared<D>) -> U) -> U {
        self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            shared.fll.begin_section();
            let result = f(&mut shared);
            shared.fll.end_section();
            result
        })
    }

    fn set_spdif_pll(&self, rate: Hertz) -> Result<(), ProgramError> {
        let mclk = Hertz::from_raw(rate.raw() * MclkDivider::Fs256.ratio());
        self.spdif.set_pll(self.clkout, mclk).map_err(|e| {
            log::error!("Failed to set WM8804 PLL to {}: {}", mclk.raw(), e);
            ProgramError::new(ProgramStage::SpdifPll, e)
        })?;
        self.spdif
            .set_sysclk(SysclkSource::TxPll, mclk)
            .map_err(|e| {
                log::error!("Failed to set MCLK as PLL Output: {}", e);
                ProgramError::new(ProgramStage::SpdifSysclk, e)
            })
    }

    /// Apply the negotiated hardware parameters of a stream.
    ///
    /// FLL1 is only re-programmed if it is free-running at a different frequency. An off FLL
    /// is brought up by the power domain prepare step, and a synchronised FLL belongs to the
    /// SPDIF receive path.
    pub fn on_stream_open(&self, params: &HwParams) -> Result<(), ProgramError> {
        let rate = params.rate;
        let sysclk = sysclk_for_rate(rate);
        self.locked(|shared| {
            log::debug!("hw_params: setting rate to {}", rate.raw());

            self.i2s
                .set_bclk_ratio(2 * u32::from(params.sample_width))
                .map_err(|e| {
                    log::error!("set_bclk_ratio failed: {}", e);
                    ProgramError::new(ProgramStage::BclkRatio, e)
                })?;
            self.primary
                .set_tdm_slot(0b11, 0b11, 2, params.sample_width)
                .map_err(|e| {
                    log::error!("set_tdm_slot failed: {}", e);
                    ProgramError::new(ProgramStage::TdmSlot, e)
                })?;

            // The WM8804 PLL can not lock below 32 kHz.
            if rate.raw() >= wm8804::MIN_SAMPLE_RATE_HZ {
                self.set_spdif_pll(rate)?;
            }

            self.primary
                .set_sysclk(ClockId::Sysclk, ClockSource::Fll1, sysclk)
                .map_err(|e| {
                    log::error!("Failed to set SYSCLK: {}", e);
                    ProgramError::new(ProgramStage::Sysclk, e)
                })?;

            if let ClockMode::FreeRunning(current) = shared.fll.mode() {
                if current != sysclk {
                    log::debug!(
                        "hw_params: changing FLL1 from {} to {}",
                        current.raw(),
                        sysclk.raw()
                    );
                    shared.fll.clear(&self.primary).inspect_err(|_| {
                        log::error!("hw_params: failed to clear FLLs");
                    })?;
                    shared
                        .fll
                        .lock_free_running(&self.primary, &mut shared.delay, sysclk)
                        .inspect_err(|_| log::error!("hw_params: failed to set FLL"))?;
                }
            }

            shared.card_rate = rate;
            shared.link.set_rate(rate);
            shared.open_streams.insert(params.direction);
            Ok(())
        })
    }

    /// Release the hardware parameters of a stream.
    ///
    /// SYSCLK is disabled when the last open stream goes away. A failure to do so is logged
    /// and not reported, the stream is already stopped.
    pub fn on_stream_close(&self, direction: StreamDirection) -> Result<(), ProgramError> {
        self.locked(|shared| {
            let was_open = !shared.open_streams.is_empty();
            shared.open_streams.remove(direction);
            if was_open && shared.open_streams.is_empty() {
                log::debug!("hw_free: Setting SYSCLK to Zero");
                if let Err(e) = self.primary.set_sysclk(
                    ClockId::Sysclk,
                    ClockSource::Fll1,
                    Hertz::from_raw(0),
                ) {
                    log::error!("hw_free: Failed to set SYSCLK to Zero: {}", e);
                }
            }
        });
        Ok(())
    }

    /// Power domain of `device` is about to enter the prepare level coming from `current`.
    ///
    /// Brings FLL1 up free-running for the current card rate unless the SPDIF receive path
    /// owns the clock. Nothing is done when the domain comes down from the fully active level.
    pub fn on_prepare(&self, device: DeviceId, current: BiasLevel) -> Result<(), ProgramError> {
        if device != self.primary.device_id() || current == BiasLevel::On {
            return Ok(());
        }
        self.locked(|shared| {
            if shared.spdif_sync_active {
                return Ok(());
            }
            let sysclk = sysclk_for_rate(shared.card_rate);
            let mode = shared.fll.mode();
            if mode == ClockMode::FreeRunning(sysclk) {
                return Ok(());
            }
            log::debug!("set_bias: changing FLL1 from {} to {}", mode, sysclk.raw());
            if shared.fll.needs_clear() {
                shared.fll.clear(&self.primary).inspect_err(|_| {
                    log::error!("set_bias: failed to clear FLLs");
                })?;
            }
            shared
                .fll
                .lock_free_running(&self.primary, &mut shared.delay, sysclk)
                .inspect_err(|_| log::error!("set_bias: Failed to set FLL1"))
        })
    }

    /// Power domain of `device` has reached the standby level.
    ///
    /// FLL1 is always cleared, also when it is already tracked as off, so that a partially
    /// programmed reference path does not keep running. A synchronised clock is lost and the SPDIF
    /// receive path has to lock again on its next power-up. A failure is logged and not
    /// reported, the power transition has to complete.
    pub fn on_standby(&self, device: DeviceId) -> Result<(), ProgramError> {
        if device != self.primary.device_id() {
            return Ok(());
        }
        self.locked(|shared| {
            log::debug!(
                "set_bias_post: changing FLL1 from {} to off",
                shared.fll.mode()
            );
            if shared.fll.clear(&self.primary).is_err() {
                log::error!("set_bias_post: failed to clear FLLs");
                return;
            }
            if shared.spdif_sync_active {
                log::warn!("set_bias_post: SPDIF sync clock released by standby");
                shared.spdif_sync_active = false;
            }
        });
        Ok(())
    }

    /// The SPDIF receive node was powered up. FLL1 is synchronised to the recovered bit clock.
    pub fn on_spdif_power_up(&self) -> Result<(), ProgramError> {
        self.locked(|shared| {
            shared.spdif_sync_active = false;
            let ref_freq = sysclk_for_rate(shared.card_rate);
            let sync_freq = Hertz::from_raw(SYNC_BCLK_RATIO * shared.card_rate.raw());
            log::debug!(
                "spdif_rx: changing FLL1 to use Ref Clock clk: {} spdif: {}",
                ref_freq.raw(),
                sync_freq.raw()
            );

            shared.fll.clear(&self.primary).inspect_err(|_| {
                log::error!("spdif_rx: failed to clear FLLs");
            })?;
            shared
                .fll
                .lock_external_reference(&self.primary, &mut shared.delay, ref_freq, sync_freq)
                .inspect_err(|_| log::error!("spdif_rx: failed to set FLLs"))?;
            shared.spdif_sync_active = true;
            Ok(())
        })
    }

    /// The SPDIF receive node was powered down.
    ///
    /// FLL1 is left as it is and re-evaluated by the next prepare step or stream negotiation.
    pub fn on_spdif_power_down(&self) -> Result<(), ProgramError> {
        self.locked(|shared| shared.spdif_sync_active = false);
        Ok(())
    }

    /// Power event of the SPDIF receive node.
    pub fn on_spdif_rx_event(&self, event: WidgetEvent) -> Result<(), ProgramError> {
        match event {
            WidgetEvent::PostPowerUp => self.on_spdif_power_up(),
            WidgetEvent::PostPowerDown => self.on_spdif_power_down(),
            _ => Ok(()),
        }
    }

    /// Called before the power domain of `device` moves from `current` to `target`.
    pub fn set_bias_level(
        &self,
        device: DeviceId,
        current: BiasLevel,
        target: BiasLevel,
    ) -> Result<(), ProgramError> {
        match target {
            BiasLevel::Prepare => self.on_prepare(device, current),
            _ => Ok(()),
        }
    }

    /// Called after the power domain of `device` reached `level`.
    pub fn set_bias_level_post(
        &self,
        device: DeviceId,
        level: BiasLevel,
    ) -> Result<(), ProgramError> {
        match level {
            BiasLevel::Standby => self.on_standby(device),
            _ => Ok(()),
        }
    }

    /// Initial WM5102 clock setup: 32 kHz clock derived from SYSCLK, FLL1 and SYSCLK off.
    pub fn init_primary(&self) -> Result<(), ProgramError> {
        let src_sysclk = Clock32k::new_with_raw_value(0)
            .with_src(Clock32kSource::Sysclk)
            .raw_value();
        self.primary
            .update_bits(CLOCK_32K_1, CLK_32K_SRC_MASK, src_sysclk)
            .map_err(|e| ProgramError::new(ProgramStage::Clock32k, e))?;

        self.locked(|shared| {
            if shared.fll.clear(&self.primary).is_err() {
                log::warn!("init_wm5102: failed to clear FLLs");
            }
        });

        self.primary
            .set_sysclk(ClockId::Sysclk, ClockSource::Fll1, Hertz::from_raw(0))
            .map_err(|e| {
                log::error!("Failed to set SYSCLK to Zero: {}", e);
                ProgramError::new(ProgramStage::Sysclk, e)
            })
    }

    /// Initial WM8804 clock setup: 256fs MCLK, oscillator on CLKOUT and the PLL running for
    /// the default card rate.
    pub fn init_spdif(&self) -> Result<(), ProgramError> {
        self.spdif
            .set_mclk_divider(MclkDivider::Fs256)
            .map_err(|e| {
                log::error!("init_wm8804: Failed to set MCLK_DIV to 256fs: {}", e);
                ProgramError::new(ProgramStage::SpdifMclkDivider, e)
            })?;

        if let Err(e) = self.spdif.set_sysclk(SysclkSource::ClkoutOscclk, self.clkout) {
            log::error!("init_wm8804: Failed to set CLKOUT as OSC Frequency: {}", e);
        }

        let rate = self.locked(|shared| shared.card_rate);
        self.set_spdif_pll(rate).inspect_err(|_| {
            log::error!("init_wm8804: Failed to setup PLL for {}Hz", rate.raw());
        })
    }

    /// Assign both WM5102 audio interfaces to the SYSCLK domain.
    pub fn late_probe(&self, channel_status: &ChannelStatus) -> Result<(), ProgramError> {
        log::debug!(
            "iec958_bits: {:02x} {:02x} {:02x} {:02x}",
            channel_status[0],
            channel_status[1],
            channel_status[2],
            channel_status[3]
        );
        self.primary
            .set_dai_clock_domain(Dai::Aif1, ClockId::Sysclk)
            .map_err(|e| {
                log::error!("Failed to set WM5102 codec dai clk domain: {}", e);
                ProgramError::new(ProgramStage::DaiClockDomain, e)
            })?;
        self.primary
            .set_dai_clock_domain(Dai::Aif2, ClockId::Sysclk)
            .map_err(|e| {
                log::error!("Failed to set WM8804 codec dai clk domain: {}", e);
                ProgramError::new(ProgramStage::DaiClockDomain, e)
            })
    }
}
