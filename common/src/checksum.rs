//! Fletcher-32 running checksum over 16-bit sample words.
//!
//! Each waveform record carries this value so the replay/ingest stage can
//! verify that a decompressed waveform matches what the digitiser wrote.

use crate::RawAdc;

/// Computes the Fletcher-32 checksum of a slice of 16-bit words.
///
/// The accumulators are 64-bit and unreduced until the end of the pass;
/// waveforms short enough to fit in memory cannot overflow them.
pub fn fletcher32(data: &[RawAdc]) -> u32 {
    let mut sum1: u64 = 0;
    let mut sum2: u64 = 0;
    for &word in data {
        sum1 += u64::from(word);
        sum2 += sum1;
    }
    sum1 %= 65535;
    sum2 %= 65535;
    ((sum2 as u32) << 16) | (sum1 as u32)
}
