//! Stream parameters and bookkeeping of the open stream directions.
use crate::time::Hertz;

/// Direction of a PCM substream.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive,
)]
#[repr(u8)]
pub enum StreamDirection {
    Playback = 0,
    Capture = 1,
}

/// Negotiated hardware parameters of a substream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HwParams {
    pub direction: StreamDirection,
    pub rate: Hertz,
    /// Sample width in bits.
    pub sample_width: u8,
}

impl HwParams {
    pub const fn new(direction: StreamDirection, rate: Hertz, sample_width: u8) -> Self {
        Self {
            direction,
            rate,
            sample_width,
        }
    }
}

/// Stream directions which currently have hardware parameters applied.
#[bitbybit::bitfield(u8, default = 0x0)]
#[derive(Debug, PartialEq, Eq)]
pub struct OpenStreams {
    #[bit(1, rw)]
    capture: bool,
    #[bit(0, rw)]
    playback: bool,
}

impl OpenStreams {
    #[inline]
    pub const fn none() -> Self {
        Self::new_with_raw_value(0)
    }

    #[inline]
    pub fn contains(&self, direction: StreamDirection) -> bool {
        match direction {
            StreamDirection::Playback => self.playback(),
            StreamDirection::Capture => self.capture(),
        }
    }

    #[inline]
    pub fn insert(&mut self, direction: StreamDirection) {
        self.set(direction, true);
    }

    #[inline]
    pub fn remove(&mut self, direction: StreamDirection) {
        self.set(direction, false);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw_value() == 0
    }

    fn set(&mut self, direction: StreamDirection, open: bool) {
        match direction {
            StreamDirection::Playback => self.set_playback(open),
            StreamDirection::Capture => self.set_capture(open),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SampleFormat {
    S24Le,
}

/// Stream parameters of the codec to codec link between WM5102 AIF2 and the WM8804.
///
/// The link mirrors the sample rate of the last stream opened on the card.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LinkParams {
    pub format: SampleFormat,
    pub channels_min: u8,
    pub channels_max: u8,
    pub rate_min: Hertz,
    pub rate_max: Hertz,
}

impl LinkParams {
    pub const fn new(rate: Hertz) -> Self {
        Self {
            format: SampleFormat::S24Le,
            channels_min: 2,
            channels_max: 2,
            rate_min: rate,
            rate_max: rate,
        }
    }

    #[inline]
    pub fn set_rate(&mut self, rate: Hertz) {
        self.rate_min = rate;
        self.rate_max = rate;
    }
}
