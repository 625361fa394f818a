//! # SPDIF channel status and receiver status
//!
//! The playback channel status is cached and written through to the SPDTX registers on change.
//! Capture status and receiver flags are read from the WM8804 on every access.
//!
//! None of this is synchronised with the clock governor. The channel status bytes are
//! independent from the clock state and concurrent writers simply race with last write wins.
use core::sync::atomic::{AtomicU8, Ordering};

use cirrus_codecs::wm8804::{
    CHANNEL_STATUS_LEN, CHANNEL_STATUS_MASK, INTSTAT, InterruptStatus, RXCHAN1, RecoveredFrequency,
    SPDSTAT, SPDTX1, SpdifStatus,
};

use crate::codec::{CodecError, Wm8804Registers};

pub type ChannelStatus = [u8; CHANNEL_STATUS_LEN];

/// Mask control value of the playback channel status.
#[inline]
pub const fn channel_status_mask() -> ChannelStatus {
    CHANNEL_STATUS_MASK
}

/// Cached IEC958 channel status for SPDIF playback.
#[derive(Debug)]
pub struct ChannelStatusCache {
    bytes: [AtomicU8; CHANNEL_STATUS_LEN],
}

impl Default for ChannelStatusCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelStatusCache {
    pub const fn new() -> Self {
        Self {
            bytes: [const { AtomicU8::new(0) }; CHANNEL_STATUS_LEN],
        }
    }

    pub fn get(&self) -> ChannelStatus {
        core::array::from_fn(|i| self.bytes[i].load(Ordering::Relaxed))
    }

    /// Fill the cache from the SPDTX registers.
    pub fn load<R: Wm8804Registers>(&self, regs: &R) -> Result<(), CodecError> {
        for (i, byte) in self.bytes.iter().enumerate() {
            let value = regs.read_register(SPDTX1 + i as u8)?;
            byte.store(value & CHANNEL_STATUS_MASK[i], Ordering::Relaxed);
        }
        Ok(())
    }

    /// Apply a new channel status. Only bytes which differ after masking are written to the
    /// hardware. Returns whether any byte changed.
    pub fn put<R: Wm8804Registers>(
        &self,
        regs: &R,
        status: &ChannelStatus,
    ) -> Result<bool, CodecError> {
        let mut changed = false;
        for (i, byte) in self.bytes.iter().enumerate() {
            let mask = CHANNEL_STATUS_MASK[i];
            let value = status[i] & mask;
            if byte.load(Ordering::Relaxed) & mask == value {
                continue;
            }
            regs.update_register(SPDTX1 + i as u8, mask, value)?;
            byte.store(value, Ordering::Relaxed);
            changed = true;
        }
        Ok(changed)
    }
}

/// Read the channel status of the incoming SPDIF stream.
pub fn read_capture_status<R: Wm8804Registers>(regs: &R) -> Result<ChannelStatus, CodecError> {
    let mut status = [0; CHANNEL_STATUS_LEN];
    for (i, byte) in status.iter_mut().enumerate() {
        *byte = regs.read_register(RXCHAN1 + i as u8)? & CHANNEL_STATUS_MASK[i];
    }
    Ok(status)
}

/// Boolean status flags of the SPDIF receiver.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpdifFlag {
    Audio,
    NonPcm,
    Copyright,
    DeEmphasis,
    Lock,
    Invalid,
    TransErr,
}

impl SpdifFlag {
    pub const ALL: [SpdifFlag; 7] = [
        SpdifFlag::Audio,
        SpdifFlag::NonPcm,
        SpdifFlag::Copyright,
        SpdifFlag::DeEmphasis,
        SpdifFlag::Lock,
        SpdifFlag::Invalid,
        SpdifFlag::TransErr,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            SpdifFlag::Audio => "Audio",
            SpdifFlag::NonPcm => "Non-PCM",
            SpdifFlag::Copyright => "Copyright",
            SpdifFlag::DeEmphasis => "De-Emphasis",
            SpdifFlag::Lock => "Lock",
            SpdifFlag::Invalid => "Invalid",
            SpdifFlag::TransErr => "TransErr",
        }
    }

    /// Register which holds the flag.
    pub const fn register(&self) -> u8 {
        match self {
            SpdifFlag::Invalid | SpdifFlag::TransErr => INTSTAT,
            _ => SPDSTAT,
        }
    }
}

pub fn read_flag<R: Wm8804Registers>(regs: &R, flag: SpdifFlag) -> Result<bool, CodecError> {
    let raw = regs.read_register(flag.register())?;
    let status = SpdifStatus::new_with_raw_value(raw);
    let irq = InterruptStatus::new_with_raw_value(raw);
    Ok(match flag {
        SpdifFlag::Audio => !status.audio_n(),
        SpdifFlag::NonPcm => status.pcm_n(),
        SpdifFlag::Copyright => !status.cpy_n(),
        SpdifFlag::DeEmphasis => status.deemph(),
        SpdifFlag::Lock => !status.unlock(),
        SpdifFlag::Invalid => irq.invalid(),
        SpdifFlag::TransErr => irq.trans_err(),
    })
}

pub fn read_recovered_frequency<R: Wm8804Registers>(
    regs: &R,
) -> Result<RecoveredFrequency, CodecError> {
    let status = SpdifStatus::new_with_raw_value(regs.read_register(SPDSTAT)?);
    Ok(status.rec_freq())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeSpdif;
    use cirrus_codecs::wm8804::{RXCHAN4, SPDTX2, SPDTX4};

    #[test]
    fn cache_is_loaded_masked() {
        let spdif = FakeSpdif::new();
        spdif.poke(SPDTX1, 0x04);
        spdif.poke(SPDTX4, 0xF1);
        let cache = ChannelStatusCache::new();
        cache.load(&spdif).unwrap();
        assert_eq!(cache.get(), [0x04, 0x00, 0x00, 0x31]);
    }

    #[test]
    fn put_writes_changed_bytes_only() {
        let spdif = FakeSpdif::new();
        let cache = ChannelStatusCache::new();
        cache.load(&spdif).unwrap();

        assert!(cache.put(&spdif, &[0x00, 0x82, 0x00, 0xC0]).unwrap());
        // Byte 3 is 0 after masking, so only SPDTX2 was touched.
        assert_eq!(spdif.register_writes(), [SPDTX2]);
        assert_eq!(cache.get(), [0x00, 0x82, 0x00, 0x00]);

        assert!(!cache.put(&spdif, &[0x00, 0x82, 0x00, 0x00]).unwrap());
        assert_eq!(spdif.register_writes().len(), 1);
    }

    #[test]
    fn put_preserves_reserved_bits_of_last_byte() {
        let spdif = FakeSpdif::new();
        spdif.poke(SPDTX4, 0xC0);
        let cache = ChannelStatusCache::new();
        cache.load(&spdif).unwrap();
        assert!(cache.put(&spdif, &[0, 0, 0, 0x3f]).unwrap());
        assert_eq!(spdif.peek(SPDTX4), 0xFF);
    }

    #[test]
    fn failed_write_keeps_cache() {
        let spdif = FakeSpdif::new();
        let cache = ChannelStatusCache::new();
        spdif.fail_register_access();
        assert_eq!(cache.put(&spdif, &[1, 0, 0, 0]), Err(CodecError::Bus));
        assert_eq!(cache.get(), [0; 4]);
    }

    #[test]
    fn capture_status_is_masked() {
        let spdif = FakeSpdif::new();
        spdif.poke(RXCHAN1, 0x01);
        spdif.poke(RXCHAN4, 0xFF);
        assert_eq!(read_capture_status(&spdif).unwrap(), [0x01, 0, 0, 0x3f]);
        assert_eq!(channel_status_mask(), [0xff, 0xff, 0xff, 0x3f]);
    }

    #[test]
    fn receiver_flags() {
        let spdif = FakeSpdif::new();
        // Locked PCM audio, no copyright, 44.1/48 kHz.
        spdif.poke(SPDSTAT, 0b0010_0100);
        assert!(read_flag(&spdif, SpdifFlag::Audio).unwrap());
        assert!(!read_flag(&spdif, SpdifFlag::NonPcm).unwrap());
        assert!(!read_flag(&spdif, SpdifFlag::Copyright).unwrap());
        assert!(!read_flag(&spdif, SpdifFlag::DeEmphasis).unwrap());
        assert!(read_flag(&spdif, SpdifFlag::Lock).unwrap());
        assert_eq!(
            read_recovered_frequency(&spdif).unwrap(),
            RecoveredFrequency::Khz44_1Or48
        );

        spdif.poke(SPDSTAT, 0b0100_1011);
        assert!(!read_flag(&spdif, SpdifFlag::Audio).unwrap());
        assert!(read_flag(&spdif, SpdifFlag::NonPcm).unwrap());
        assert!(read_flag(&spdif, SpdifFlag::Copyright).unwrap());
        assert!(read_flag(&spdif, SpdifFlag::DeEmphasis).unwrap());
        assert!(!read_flag(&spdif, SpdifFlag::Lock).unwrap());

        spdif.poke(INTSTAT, 0b0000_1010);
        assert!(read_flag(&spdif, SpdifFlag::Invalid).unwrap());
        assert!(read_flag(&spdif, SpdifFlag::TransErr).unwrap());
    }
}
