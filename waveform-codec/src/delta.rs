//! First-difference pre-coding.
//!
//! Detector baselines drift slowly compared to the sample rate, so storing
//! each sample as the difference from its predecessor concentrates the
//! distribution near zero where the Rice code is cheapest. The first sample
//! is stored verbatim. Differences use wrapping 16-bit arithmetic, which the
//! running-sum inverse undoes exactly.

use waveform_common::AdcValue;

pub fn encode(samples: &[AdcValue]) -> Vec<AdcValue> {
    let mut out = Vec::with_capacity(samples.len());
    let mut last = 0;
    for (i, &v) in samples.iter().enumerate() {
        if i == 0 {
            out.push(v);
        } else {
            out.push(v.wrapping_sub(last));
        }
        last = v;
    }
    out
}

pub fn decode(encoded: &[AdcValue]) -> Vec<AdcValue> {
    let mut out = Vec::with_capacity(encoded.len());
    let mut last = 0;
    for (i, &v) in encoded.iter().enumerate() {
        let value = if i == 0 { v } else { v.wrapping_add(last) };
        out.push(value);
        last = value;
    }
    out
}
