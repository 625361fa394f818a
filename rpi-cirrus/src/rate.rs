//! Sample rate limiter.
//!
//! The user can restrict the sample rates negotiated for new streams, for example to keep the
//! WM8804 within its supported range for SPDIF output.
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::time::Hertz;

/// One entry of the rate limiter enumeration. A value of zero means no limit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RateLimit {
    pub value: u32,
    pub label: &'static str,
}

pub const MIN_RATES: [RateLimit; 3] = [
    RateLimit {
        value: 0,
        label: "off",
    },
    RateLimit {
        value: 32_000,
        label: "32kHz",
    },
    RateLimit {
        value: 44_100,
        label: "44.1kHz",
    },
];

pub const MAX_RATES: [RateLimit; 3] = [
    RateLimit {
        value: 0,
        label: "off",
    },
    RateLimit {
        value: 48_000,
        label: "48kHz",
    },
    RateLimit {
        value: 96_000,
        label: "96kHz",
    },
];

#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("enumeration index {index} out of range (0..{items})")]
    InvalidIndex { index: usize, items: usize },
}

/// Inclusive range of sample rates the framework must constrain the negotiation to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RateRange {
    pub min: Hertz,
    pub max: Hertz,
}

impl RateRange {
    #[inline]
    pub fn contains(&self, rate: Hertz) -> bool {
        rate >= self.min && rate <= self.max
    }
}

/// Minimum and maximum sample rate selection.
///
/// The selections are plain values which are only read when a stream starts up, so they are
/// not protected by the clock governor lock.
#[derive(Debug)]
pub struct RateLimiter {
    min_idx: AtomicUsize,
    max_idx: AtomicUsize,
}

fn select(table: &[RateLimit], current: &AtomicUsize, index: usize) -> Result<bool, ControlError> {
    if index >= table.len() {
        return Err(ControlError::InvalidIndex {
            index,
            items: table.len(),
        });
    }
    if current.load(Ordering::Relaxed) == index {
        return Ok(false);
    }
    current.store(index, Ordering::Relaxed);
    Ok(true)
}

impl RateLimiter {
    pub const fn new(min_idx: usize, max_idx: usize) -> Self {
        Self {
            min_idx: AtomicUsize::new(min_idx),
            max_idx: AtomicUsize::new(max_idx),
        }
    }

    #[inline]
    pub fn min_rate_index(&self) -> usize {
        self.min_idx.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn max_rate_index(&self) -> usize {
        self.max_idx.load(Ordering::Relaxed)
    }

    /// Select a new minimum rate. Returns whether the selection changed.
    pub fn set_min_rate_index(&self, index: usize) -> Result<bool, ControlError> {
        select(&MIN_RATES, &self.min_idx, index)
    }

    /// Select a new maximum rate. Returns whether the selection changed.
    pub fn set_max_rate_index(&self, index: usize) -> Result<bool, ControlError> {
        select(&MAX_RATES, &self.max_idx, index)
    }

    /// Rate constraint for a stream which is starting up, [None] if both limits are off.
    pub fn constraint(&self) -> Option<RateRange> {
        let min = MIN_RATES
            .get(self.min_rate_index())
            .map_or(0, |limit| limit.value);
        let max = MAX_RATES
            .get(self.max_rate_index())
            .map_or(0, |limit| limit.value);
        if min == 0 && max == 0 {
            return None;
        }
        Some(RateRange {
            min: Hertz::from_raw(min),
            max: Hertz::from_raw(if max == 0 { u32::MAX } else { max }),
        })
    }
}
