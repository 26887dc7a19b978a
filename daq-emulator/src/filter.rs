//! The firmware's streaming trapezoidal filter.
//!
//! The hardware halves the sample rate, then feeds the stream through a
//! network of shift registers and running accumulators that implements a
//! bipolar (double) trapezoid recursively. The division at the output is a
//! fixed-point multiply, so the caller supplies `scale_factor` quantized the
//! way the firmware stores it (see [`daq_scale_factor`]).

use crate::delay::DelayLine;
use itertools::Itertools;
use rayon::prelude::*;
use waveform_common::{AdcValue, Real};

/// Fractional bits of the firmware's stored reciprocal.
const SCALE_FRACTION_BITS: u32 = 23;

/// The output scale factor `1/(tau·rise)` quantized to the firmware's
/// 24-bit word, 23 fractional bit convention.
pub fn daq_scale_factor(rise: usize, tau: Real) -> Real {
    let raw = 1.0 / (tau * rise as Real);
    let one = Real::from(1u32 << SCALE_FRACTION_BITS);
    (raw * one).round() / one
}

/// Halves the sample rate the way the hardware does: consecutive pairs are
/// summed, clamped to `[-16384, 16382]`, and floor-divided by two. An odd
/// trailing sample is not consumed.
pub fn downsample(waveform: &[AdcValue]) -> Vec<i32> {
    waveform
        .iter()
        .copied()
        .tuples::<(_, _)>()
        .map(|(a, b)| {
            let sum = (i32::from(a) + i32::from(b)).clamp(-16384, 16382);
            sum.div_euclid(2)
        })
        .collect()
}

/// One waveform's worth of filter state. Build a fresh instance per
/// waveform; the registers carry history and must never be reused across
/// streams.
pub struct FilterEmulator {
    tau: Real,
    scale_factor: Real,

    delay_b: DelayLine<Real>,
    delay_c: DelayLine<Real>,
    delay_d: DelayLine<Real>,
    delay_f: DelayLine<Real>,
    delay_k: DelayLine<Real>,
    delay_l: DelayLine<Real>,
    delay_n: DelayLine<i64>,
    delay_q: DelayLine<i64>,
    delay_s: DelayLine<i64>,
    delay_u: DelayLine<i64>,
    delay_y: DelayLine<i64>,
    delay_z: DelayLine<i64>,

    acc1: Real,
    acc2: i64,
    acc3: i64,
}

impl FilterEmulator {
    pub fn new(rise: usize, top: usize, tau: Real, scale_factor: Real) -> Self {
        Self {
            tau,
            scale_factor,
            delay_b: DelayLine::new(rise),
            delay_c: DelayLine::new(top),
            delay_d: DelayLine::new(rise),
            delay_f: DelayLine::new(1),
            delay_k: DelayLine::new(1),
            delay_l: DelayLine::new(2),
            delay_n: DelayLine::new(1),
            delay_q: DelayLine::new(1),
            delay_s: DelayLine::new(rise + top),
            delay_u: DelayLine::new(1),
            delay_y: DelayLine::new(1),
            delay_z: DelayLine::new(1),
            acc1: 0.0,
            acc2: 0,
            acc3: 0,
        }
    }

    /// Advances the pipeline by one downsampled input sample.
    pub fn step(&mut self, value: i32) -> i32 {
        let val = Real::from(value);
        let b = self.delay_b.push(val);
        let c = self.delay_c.push(b);
        let d = self.delay_d.push(c);
        let f = self.delay_f.push(val - b - c + d);

        self.acc1 += f;
        let k = self.delay_k.push(self.acc1);
        let l = self.delay_l.push((f * self.tau).trunc());
        let n = self.delay_n.push((k + l) as i64);

        self.acc2 += n;
        let q = self.delay_q.push(self.acc2);
        let s = self.delay_s.push(self.acc2);
        let u = self.delay_u.push(s);

        self.acc3 += q - self.acc2 + s - u;
        let y = self.delay_y.push(self.acc3);

        let scaled = (y as Real * self.scale_factor).round_ties_even() as i64;
        self.delay_z.push(scaled) as i32
    }
}

/// Runs the full hardware chain over one raw waveform: downsample by two,
/// then the recursive filter, one output sample per downsampled input.
pub fn emulate(
    waveform: &[AdcValue],
    rise: usize,
    top: usize,
    tau: Real,
    scale_factor: Real,
) -> Vec<i32> {
    let mut emulator = FilterEmulator::new(rise, top, tau, scale_factor);
    downsample(waveform)
        .into_iter()
        .map(|value| emulator.step(value))
        .collect()
}

/// Emulates many independent waveforms, one per worker task.
pub fn emulate_batch(
    waveforms: &[Vec<AdcValue>],
    rise: usize,
    top: usize,
    tau: Real,
    scale_factor: Real,
) -> Vec<Vec<i32>> {
    waveforms
        .par_iter()
        .map(|waveform| emulate(waveform, rise, top, tau, scale_factor))
        .collect()
}
