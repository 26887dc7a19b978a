//! Shaping-kernel builders.
//!
//! Kernels are value objects: the weight vector together with the shaping
//! parameters that produced it. They are recomputed whenever parameters
//! change, never mutated in place. The trapezoids follow the convolution
//! form of the Jordanov recursive filter (NIM A353 (1994) 261); the cusp is
//! built by a cumulative second-order polynomial recursion over its three
//! segments.

use crate::{Real, convolve::convolve};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KernelError {
    #[error("kernel length {requested} is shorter than the minimum {minimum} for rise {rise} and top {top}")]
    LengthTooShort {
        requested: usize,
        minimum: usize,
        rise: usize,
        top: usize,
    },
}

/// A shaping kernel ready to be convolved with a waveform, pre-scaled so
/// that a normalized convolution does not change the pulse amplitude scale.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterKernel {
    weights: Vec<Real>,
    rise: usize,
    top: usize,
    tau: Real,
}

impl FilterKernel {
    pub fn weights(&self) -> &[Real] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn rise(&self) -> usize {
        self.rise
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn tau(&self) -> Real {
        self.tau
    }

    /// Convolves a waveform with this kernel using the in-tree reference
    /// collaborator.
    pub fn apply(&self, waveform: &[Real]) -> Vec<Real> {
        convolve(waveform, &self.weights)
    }
}

fn resolve_length(
    length: Option<usize>,
    minimum: usize,
    rise: usize,
    top: usize,
) -> Result<usize, KernelError> {
    match length {
        None => Ok(minimum),
        Some(requested) if requested < minimum => {
            warn!("rejected kernel length {requested}: minimum for this geometry is {minimum}");
            Err(KernelError::LengthTooShort {
                requested,
                minimum,
                rise,
                top,
            })
        }
        Some(requested) => Ok(requested),
    }
}

/// Builds the single trapezoid: a rising ramp offset by `tau`, a flat top of
/// height `rise`, and a falling ramp, scaled by `1/(rise·tau)`. Any extra
/// `length` beyond `2·rise + top` is zero padding.
pub fn single_trapezoid(
    rise: usize,
    top: usize,
    tau: Real,
    length: Option<usize>,
) -> Result<FilterKernel, KernelError> {
    let minimum = 2 * rise + top;
    let n = resolve_length(length, minimum, rise, top)?;
    let mut weights = vec![0.0; n];
    for i in 0..rise {
        weights[i] = i as Real + tau;
        weights[i + rise + top] = rise as Real - tau - i as Real;
    }
    for weight in &mut weights[rise..rise + top] {
        *weight = rise as Real;
    }
    let scale = 1.0 / (rise as Real * tau);
    for weight in &mut weights {
        *weight *= scale;
    }
    Ok(FilterKernel {
        weights,
        rise,
        top,
        tau,
    })
}

/// Builds the double trapezoid used by the acquisition firmware: the single
/// trapezoid convolved with a two-tap differencer (`-1` at offset zero, `+1`
/// at offset `rise + top`). The natural span is `4·rise + 2·top`; longer
/// lengths are zero padded on the right.
pub fn double_trapezoid(
    rise: usize,
    top: usize,
    tau: Real,
    length: Option<usize>,
) -> Result<FilterKernel, KernelError> {
    let minimum = 4 * rise + 2 * top;
    let n = resolve_length(length, minimum, rise, top)?;
    let single = single_trapezoid(rise, top, tau, None)?;
    let mut differencer = vec![0.0; single.len() + 1];
    differencer[0] = -1.0;
    differencer[rise + top] = 1.0;
    let mut weights = convolve(single.weights(), &differencer);
    weights.resize(n, 0.0);
    Ok(FilterKernel {
        weights,
        rise,
        top,
        tau,
    })
}

/// Builds the cusp kernel via cumulative 0th/1st/2nd-order sums of a unit
/// impulse over the rising, flat and falling segments, combined with fixed
/// polynomial coefficients in `rise` and `tau` and normalized by
/// `0.5·rise·(rise+1)·(tau-0.5)`. Lengths beyond the natural `2·rise + top`
/// span continue the recursion tail rather than zero padding.
pub fn cusp(
    rise: usize,
    top: usize,
    tau: Real,
    length: Option<usize>,
) -> Result<FilterKernel, KernelError> {
    let span = 2 * rise + top;
    let n = resolve_length(length, span, rise, top)?;
    let total = n + span;

    let rise_r = rise as Real;
    let half_tau = tau - 0.5;
    let c0_1 = 0.5 * half_tau;
    let c1_1 = half_tau;
    let c0_2 = 0.5 * rise_r * (rise_r + 1.0);
    let c0_3 = 0.5 * (rise_r + rise_r * rise_r - half_tau - 2.0 * rise_r * half_tau);
    let c1_3 = -1.0 - rise_r + half_tau;
    let norm = 0.5 * rise_r * (rise_r + 1.0) * half_tau;
    let triangle = 0.5 * rise_r * (rise_r + 1.0);

    let mut impulse = vec![0.0; total];
    if total > 1 {
        impulse[1] = 1.0;
    }
    // Cumulative sums for each segment, offset by `span` so the recursion
    // can look back without underflowing.
    let mut p0_1 = vec![0.0; total];
    let mut p1_1 = vec![0.0; total];
    let mut p2_1 = vec![0.0; total];
    let mut p0_2 = vec![0.0; total];
    let mut p0_3 = vec![0.0; total];
    let mut p1_3 = vec![0.0; total];
    let mut p2_3 = vec![0.0; total];
    let mut weights = vec![0.0; n];

    for i in 0..n {
        let j = i + span;
        let in_now = impulse[i];
        let after_rise = if i >= rise { impulse[i - rise] } else { 0.0 };
        let after_flat = if i >= rise + top {
            impulse[i - rise - top]
        } else {
            0.0
        };
        let after_span = if i >= span { impulse[i - span] } else { 0.0 };

        p0_1[j] = p0_1[j - 1] + in_now - after_rise;
        p1_1[j] = p1_1[j - 1] + p0_1[j] - rise_r * after_rise;
        p2_1[j] = p2_1[j - 1] + p1_1[j] - triangle * after_rise;

        p0_2[j] = p0_2[j - 1] + after_rise - after_flat;

        p0_3[j] = p0_3[j - 1] + after_flat - after_span;
        p1_3[j] = p1_3[j - 1] + p0_3[j] - rise_r * after_span;
        p2_3[j] = p2_3[j - 1] + p1_3[j] - triangle * after_span;

        weights[i] = (c0_1 * p0_1[j]
            + c1_1 * p1_1[j]
            + p2_1[j]
            + c0_2 * p0_2[j]
            + c0_3 * p0_3[j]
            + c1_3 * p1_3[j]
            + p2_3[j])
            / norm;
    }
    Ok(FilterKernel {
        weights,
        rise,
        top,
        tau,
    })
}
