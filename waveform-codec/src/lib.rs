//! Lossless compression of digitiser waveforms.
//!
//! The wire format is a Rice/Golomb bitstream packed big-bit-endian into
//! 32-bit words. Neither the Golomb parameter nor the sample count is
//! self-describing in-stream, so [`CompressedBlock`] carries both alongside
//! the words. Samples are usually delta pre-coded first (see [`delta`]) to
//! concentrate them near zero.
//!
//! The codec performs no integrity checking of its own: a corrupted block
//! decodes to silently wrong samples. Callers verify decoded waveforms
//! against the Fletcher-32 checksum stored with each record.

pub mod delta;
pub mod rice;

use thiserror::Error;
use waveform_common::AdcValue;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Golomb parameter must be a positive power of two, got {0}")]
    InvalidGolombParameter(u32),
}

/// A Rice-coded waveform along with the out-of-band parameters needed to
/// decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlock {
    /// The packed bitstream. The final word is left-justified and
    /// right-padded with zero bits.
    pub words: Vec<u32>,
    /// The Golomb parameter the block was produced with.
    pub golomb_m: u32,
    /// Number of samples in the original waveform.
    pub sample_count: usize,
}

impl CompressedBlock {
    pub fn decode(&self) -> Result<Vec<AdcValue>, CodecError> {
        rice::decode(&self.words, self.sample_count, self.golomb_m)
    }
}
