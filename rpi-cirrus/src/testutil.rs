//! Recording fakes of the codec seams.
use std::{sync::Mutex, vec::Vec};

use cirrus_codecs::{
    wm5102::{ClockId, ClockSource, Dai, FllId, FllSource},
    wm8804::{MclkDivider, SysclkSource},
};
use embedded_hal::{
    delay::DelayNs,
    i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress},
};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;

use crate::{
    card::CardConfig,
    codec::{CodecError, DeviceId, I2sController, PrimaryCodec, SpdifTransceiver, Wm8804Registers},
    governor::ClockGovernor,
    time::Hertz,
};

pub const PRIMARY_DEVICE: DeviceId = DeviceId(1);

pub type TestGovernor = ClockGovernor<NoopRawMutex, FakePrimary, FakeSpdif, FakeI2s, FakeDelay>;

pub fn governor() -> TestGovernor {
    ClockGovernor::new(
        &CardConfig::default(),
        FakePrimary::new(),
        FakeSpdif::new(),
        FakeI2s::new(),
        FakeDelay::default(),
    )
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Call {
    Fll(FllId, FllSource, Hertz, Hertz),
    Sysclk(ClockId, ClockSource, Hertz),
    Tdm(u32, u32, u8, u8),
    DaiDomain(Dai, ClockId),
    UpdateBits(u16, u16, u16),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FailPoint {
    Fll(FllId),
    Sysclk,
    Tdm,
    DaiDomain(Dai),
    UpdateBits,
}

impl FailPoint {
    fn matches(&self, call: &Call) -> bool {
        match (self, call) {
            (FailPoint::Fll(id), Call::Fll(called, ..)) => id == called,
            (FailPoint::DaiDomain(dai), Call::DaiDomain(called, _)) => dai == called,
            (FailPoint::Sysclk, Call::Sysclk(..))
            | (FailPoint::Tdm, Call::Tdm(..))
            | (FailPoint::UpdateBits, Call::UpdateBits(..)) => true,
            _ => false,
        }
    }
}

#[derive(Default)]
struct PrimaryInner {
    calls: Vec<Call>,
    /// Armed failures with the number of matching calls left until they fire.
    armed: Vec<(FailPoint, usize)>,
    failures: usize,
}

/// WM5102 fake which records every call and fails on demand.
#[derive(Default)]
pub struct FakePrimary {
    inner: Mutex<PrimaryInner>,
}

impl FakePrimary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Fail the next call matching `point`.
    pub fn fail_once(&self, point: FailPoint) {
        self.fail_on_nth(point, 1);
    }

    /// Fail the `nth` call matching `point`, counting from one.
    pub fn fail_on_nth(&self, point: FailPoint, nth: usize) {
        self.inner.lock().unwrap().armed.push((point, nth));
    }

    /// Number of armed failures which fired so far.
    pub fn failures(&self) -> usize {
        self.inner.lock().unwrap().failures
    }

    fn record(&self, call: Call) -> Result<(), CodecError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        let mut fired = None;
        for (idx, (point, left)) in inner.armed.iter_mut().enumerate() {
            if point.matches(&call) {
                *left -= 1;
                if *left == 0 {
                    fired = Some(idx);
                    break;
                }
            }
        }
        match fired {
            Some(idx) => {
                inner.armed.remove(idx);
                inner.failures += 1;
                Err(CodecError::Bus)
            }
            None => Ok(()),
        }
    }
}

impl PrimaryCodec for FakePrimary {
    fn device_id(&self) -> DeviceId {
        PRIMARY_DEVICE
    }

    fn set_fll(
        &self,
        fll: FllId,
        source: FllSource,
        fref: Hertz,
        fout: Hertz,
    ) -> Result<(), CodecError> {
        self.record(Call::Fll(fll, source, fref, fout))
    }

    fn set_sysclk(
        &self,
        clock: ClockId,
        source: ClockSource,
        freq: Hertz,
    ) -> Result<(), CodecError> {
        self.record(Call::Sysclk(clock, source, freq))
    }

    fn set_tdm_slot(
        &self,
        tx_mask: u32,
        rx_mask: u32,
        slots: u8,
        slot_width: u8,
    ) -> Result<(), CodecError> {
        self.record(Call::Tdm(tx_mask, rx_mask, slots, slot_width))
    }

    fn set_dai_clock_domain(&self, dai: Dai, clock: ClockId) -> Result<(), CodecError> {
        self.record(Call::DaiDomain(dai, clock))
    }

    fn update_bits(&self, reg: u16, mask: u16, value: u16) -> Result<bool, CodecError> {
        self.record(Call::UpdateBits(reg, mask, value))?;
        Ok(true)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpdifCall {
    Pll(Hertz, Hertz),
    Sysclk(SysclkSource, Hertz),
    MclkDivider(MclkDivider),
}

struct SpdifInner {
    regs: [u8; 0x20],
    calls: Vec<SpdifCall>,
    register_writes: Vec<u8>,
    fail_next_access: bool,
}

/// WM8804 fake with a plain register file.
pub struct FakeSpdif {
    inner: Mutex<SpdifInner>,
}

impl Default for FakeSpdif {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSpdif {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SpdifInner {
                regs: [0; 0x20],
                calls: Vec::new(),
                register_writes: Vec::new(),
                fail_next_access: false,
            }),
        }
    }

    pub fn poke(&self, reg: u8, value: u8) {
        self.inner.lock().unwrap().regs[reg as usize] = value;
    }

    pub fn peek(&self, reg: u8) -> u8 {
        self.inner.lock().unwrap().regs[reg as usize]
    }

    pub fn calls(&self) -> Vec<SpdifCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Registers passed to [Wm8804Registers::update_register], in call order.
    pub fn register_writes(&self) -> Vec<u8> {
        self.inner.lock().unwrap().register_writes.clone()
    }

    /// Fail the next register read or update with a bus error.
    pub fn fail_register_access(&self) {
        self.inner.lock().unwrap().fail_next_access = true;
    }
}

impl Wm8804Registers for FakeSpdif {
    fn read_register(&self, reg: u8) -> Result<u8, CodecError> {
        let mut inner = self.inner.lock().unwrap();
        if core::mem::take(&mut inner.fail_next_access) {
            return Err(CodecError::Bus);
        }
        Ok(inner.regs[reg as usize])
    }

    fn update_register(&self, reg: u8, mask: u8, value: u8) -> Result<bool, CodecError> {
        let mut inner = self.inner.lock().unwrap();
        if core::mem::take(&mut inner.fail_next_access) {
            return Err(CodecError::Bus);
        }
        inner.register_writes.push(reg);
        let old = inner.regs[reg as usize];
        let new = (old & !mask) | (value & mask);
        inner.regs[reg as usize] = new;
        Ok(old != new)
    }
}

impl SpdifTransceiver for FakeSpdif {
    fn set_pll(&self, fin: Hertz, fout: Hertz) -> Result<(), CodecError> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push(SpdifCall::Pll(fin, fout));
        Ok(())
    }

    fn set_sysclk(&self, source: SysclkSource, freq: Hertz) -> Result<(), CodecError> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push(SpdifCall::Sysclk(source, freq));
        Ok(())
    }

    fn set_mclk_divider(&self, divider: MclkDivider) -> Result<(), CodecError> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push(SpdifCall::MclkDivider(divider));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeI2s {
    ratios: Mutex<Vec<u32>>,
}

impl FakeI2s {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ratios(&self) -> Vec<u32> {
        self.ratios.lock().unwrap().clone()
    }
}

impl I2sController for FakeI2s {
    fn set_bclk_ratio(&self, ratio: u32) -> Result<(), CodecError> {
        self.ratios.lock().unwrap().push(ratio);
        Ok(())
    }
}

/// Delay which only accumulates the requested time.
#[derive(Debug, Default)]
pub struct FakeDelay {
    pub total_ns: u64,
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

/// Delay which actually blocks the calling thread.
pub struct SleepDelay;

impl DelayNs for SleepDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}

/// I2C bus with a single WM8804 register file behind `addr`.
pub struct FakeI2c {
    pub addr: u8,
    pub regs: [u8; 0x20],
    pub pointer: u8,
    /// Number of write transfers carrying register data.
    pub writes: usize,
}

impl FakeI2c {
    pub fn new(addr: u8) -> Self {
        Self {
            addr,
            regs: [0; 0x20],
            pointer: 0,
            writes: 0,
        }
    }
}

impl ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl I2c<SevenBitAddress> for FakeI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.addr {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    let Some((reg, data)) = bytes.split_first() else {
                        continue;
                    };
                    self.pointer = *reg;
                    if !data.is_empty() {
                        self.writes += 1;
                    }
                    for byte in data {
                        self.regs[self.pointer as usize] = *byte;
                        self.pointer += 1;
                    }
                }
                Operation::Read(buf) => {
                    for byte in buf.iter_mut() {
                        *byte = self.regs[self.pointer as usize];
                        self.pointer += 1;
                    }
                }
            }
        }
        Ok(())
    }
}
