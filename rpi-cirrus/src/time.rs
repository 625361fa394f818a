//! # Time units

/// Hertz
pub type Hertz = fugit::HertzU32;

/// Microseconds
pub type Microseconds = fugit::MicrosDurationU32;
/// Microseconds with a 64 bit tick counter, for accumulated durations.
pub type Microseconds64 = fugit::MicrosDurationU64;
