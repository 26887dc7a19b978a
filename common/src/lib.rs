pub mod checksum;
pub mod sample;

/// A raw 16-bit container word as read from the digitiser.
pub type RawAdc = u16;
/// A sign-extended digitiser sample.
pub type AdcValue = i16;
/// Scalar type used throughout the shaping and extraction path.
pub type Real = f64;

/// Index into a waveform, in digitiser timebins.
pub type SampleIndex = usize;

pub use checksum::fletcher32;
pub use sample::{prepare, sign_extend, to_real};
