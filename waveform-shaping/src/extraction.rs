//! Percent-threshold energy/timing extraction.
//!
//! Given a filtered waveform, the extractor finds the pulse peak, walks out
//! to where the waveform crosses a fixed percentage of the peak on either
//! side, and reads energy and timing off the crossing midpoint. A failed
//! search is a per-waveform condition, not an error: it yields an
//! [`ExtractionResult`] with NaN fields and `valid` unset, and batches keep
//! going.

use crate::Real;
use tracing::debug;

/// Knobs shared by every extraction variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionConfig {
    /// Fraction of the peak value used as the crossing threshold.
    pub percentage: Real,
    /// Offset added to the crossing midpoint before the energy readout.
    pub shift: i64,
    /// Averaging window for the energy readout: zero reads a single sample,
    /// positive averages that many samples forward from the readout point,
    /// negative averages backward ending at the readout point.
    pub mean: i64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            percentage: 0.8,
            shift: 0,
            mean: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionResult {
    pub energy: Real,
    pub time: Real,
    pub valid: bool,
}

impl ExtractionResult {
    fn invalid() -> Self {
        Self {
            energy: Real::NAN,
            time: Real::NAN,
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Locations and values of the first global maximum and minimum.
fn extrema(filtered: &[Real]) -> Option<(usize, Real, usize, Real)> {
    let first = *filtered.first()?;
    let (mut max_loc, mut max_val) = (0, first);
    let (mut min_loc, mut min_val) = (0, first);
    for (i, &v) in filtered.iter().enumerate().skip(1) {
        if v > max_val {
            max_loc = i;
            max_val = v;
        }
        if v < min_val {
            min_loc = i;
            min_val = v;
        }
    }
    Some((max_loc, max_val, min_loc, min_val))
}

fn straddles(near: Real, far: Real, threshold: Real, negative: bool) -> bool {
    if negative {
        near <= threshold && far >= threshold
    } else {
        near >= threshold && far <= threshold
    }
}

/// Scans up to `window` samples either side of the peak for the adjacent
/// pairs that straddle the threshold. The scans clamp at the waveform
/// bounds; running off either end counts as exhaustion.
fn crossing_search(
    filtered: &[Real],
    peak: usize,
    threshold: Real,
    negative: bool,
    window: usize,
) -> Option<(usize, usize)> {
    let start = peak.saturating_sub(window).max(1);
    let left = (start..=peak)
        .rev()
        .find(|&i| straddles(filtered[i], filtered[i - 1], threshold, negative))
        .map(|i| i - 1)?;
    let end = (peak + window).min(filtered.len().checked_sub(2)?);
    let right = (peak..=end)
        .find(|&i| straddles(filtered[i], filtered[i + 1], threshold, negative))
        .map(|i| i + 1)?;
    Some((left, right))
}

/// Energy readout at the crossing midpoint, honouring shift and the signed
/// averaging window. A window reaching past the waveform yields `None`.
fn readout(filtered: &[Real], midpoint: Real, shift: i64, mean: i64) -> Option<Real> {
    let base = midpoint as i64 + shift;
    let len = filtered.len() as i64;
    if mean == 0 {
        return (0..len)
            .contains(&base)
            .then(|| filtered[base as usize]);
    }
    let (start, end) = if mean > 0 {
        (base, base + mean)
    } else {
        (base + mean + 1, base + 1)
    };
    if start < 0 || end > len {
        return None;
    }
    let window = &filtered[start as usize..end as usize];
    Some(window.iter().sum::<Real>() / window.len() as Real)
}

fn extract(
    filtered: &[Real],
    peak: usize,
    peak_val: Real,
    negative: bool,
    window: usize,
    time_offset: Real,
    config: ExtractionConfig,
) -> ExtractionResult {
    let threshold = peak_val * config.percentage;
    let Some((left, right)) = crossing_search(filtered, peak, threshold, negative, window) else {
        debug!("no threshold crossing within {window} samples of peak at {peak}");
        return ExtractionResult::invalid();
    };
    let midpoint = (left + right) as Real / 2.0;
    let Some(energy) = readout(filtered, midpoint, config.shift, config.mean) else {
        debug!("energy readout window out of bounds at midpoint {midpoint}");
        return ExtractionResult::invalid();
    };
    ExtractionResult {
        energy,
        time: midpoint - time_offset,
        valid: true,
    }
}

/// Single-trapezoid/cusp extraction pivoting on the global maximum only.
pub fn extract_positive_trap_results(
    filtered: &[Real],
    rise: usize,
    top: usize,
    config: ExtractionConfig,
) -> ExtractionResult {
    let Some((max_loc, max_val, _, _)) = extrema(filtered) else {
        return ExtractionResult::invalid();
    };
    extract(
        filtered,
        max_loc,
        max_val,
        false,
        rise + top,
        top as Real / 2.0 + rise as Real,
        config,
    )
}

/// Single-trapezoid extraction. The pulse polarity is decided by which
/// global extremum has the larger magnitude; negative-going pulses search
/// with inverted comparisons.
pub fn extract_trap_results(
    filtered: &[Real],
    rise: usize,
    top: usize,
    config: ExtractionConfig,
) -> ExtractionResult {
    let Some((max_loc, max_val, min_loc, min_val)) = extrema(filtered) else {
        return ExtractionResult::invalid();
    };
    let negative = min_val.abs() > max_val.abs();
    let (peak, peak_val) = if negative {
        (min_loc, min_val)
    } else {
        (max_loc, max_val)
    };
    extract(
        filtered,
        peak,
        peak_val,
        negative,
        rise + top,
        top as Real / 2.0 + rise as Real,
        config,
    )
}

/// Double-trapezoid extraction. The firmware's differencer makes the output
/// bipolar, so polarity is decided by which extremum comes later in time,
/// and the timing offset accounts for the extra rise/top span.
pub fn extract_double_trap_results(
    filtered: &[Real],
    rise: usize,
    top: usize,
    config: ExtractionConfig,
) -> ExtractionResult {
    let Some((max_loc, max_val, min_loc, min_val)) = extrema(filtered) else {
        return ExtractionResult::invalid();
    };
    let negative = min_loc > max_loc;
    let (peak, peak_val) = if negative {
        (min_loc, min_val)
    } else {
        (max_loc, max_val)
    };
    extract(
        filtered,
        peak,
        peak_val,
        negative,
        rise + top,
        7.0 * top as Real / 4.0 + 2.0 * rise as Real,
        config,
    )
}

/// Cusp extraction shares the trapezoid's crossing algorithm.
pub fn extract_cusp_results(
    filtered: &[Real],
    rise: usize,
    top: usize,
    config: ExtractionConfig,
) -> ExtractionResult {
    extract_trap_results(filtered, rise, top, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::single_trapezoid;
    use assert_approx_eq::assert_approx_eq;

    const RISE: usize = 100;
    const TOP: usize = 20;

    // An ideal trapezoid: onset ramp over RISE samples, flat top of TOP at
    // `peak`, symmetric fall, everything else zero.
    fn ideal_trapezoid(len: usize, onset: usize, peak: Real) -> Vec<Real> {
        let mut out = vec![0.0; len];
        for k in 0..=RISE {
            out[onset + k] = peak * k as Real / RISE as Real;
            out[onset + RISE + TOP + k] = peak * (RISE - k) as Real / RISE as Real;
        }
        for k in 0..TOP {
            out[onset + RISE + k] = peak;
        }
        out
    }

    #[test]
    fn trapezoid_energy_and_timing() {
        let filtered = ideal_trapezoid(1000, 400, 500.0);
        let result = extract_trap_results(&filtered, RISE, TOP, ExtractionConfig::default());
        // Crossings at 480 and 540, midpoint 510, inside the flat top.
        assert!(result.is_valid());
        assert_approx_eq!(result.energy, 500.0, 1e-9);
        assert_approx_eq!(result.time, 400.0, 1e-9);
    }

    #[test]
    fn positive_variant_matches_on_positive_pulse() {
        let filtered = ideal_trapezoid(1000, 400, 500.0);
        let result =
            extract_positive_trap_results(&filtered, RISE, TOP, ExtractionConfig::default());
        assert!(result.is_valid());
        assert_approx_eq!(result.energy, 500.0, 1e-9);
        assert_approx_eq!(result.time, 400.0, 1e-9);
    }

    #[test]
    fn negative_pulse_pivots_on_minimum() {
        let filtered: Vec<Real> = ideal_trapezoid(1000, 400, 500.0)
            .into_iter()
            .map(|v| -v)
            .collect();
        let result = extract_trap_results(&filtered, RISE, TOP, ExtractionConfig::default());
        assert!(result.is_valid());
        assert_approx_eq!(result.energy, -500.0, 1e-9);
        assert_approx_eq!(result.time, 400.0, 1e-9);
    }

    #[test]
    fn shift_and_mean_windows() {
        let filtered = ideal_trapezoid(1000, 400, 500.0);

        let shifted = extract_trap_results(
            &filtered,
            RISE,
            TOP,
            ExtractionConfig {
                shift: 15,
                ..Default::default()
            },
        );
        // Midpoint 510 shifted to 525, five samples down the falling edge.
        assert_approx_eq!(shifted.energy, 475.0, 1e-9);

        let forward = extract_trap_results(
            &filtered,
            RISE,
            TOP,
            ExtractionConfig {
                mean: 3,
                ..Default::default()
            },
        );
        assert_approx_eq!(forward.energy, 500.0, 1e-9);

        let backward = extract_trap_results(
            &filtered,
            RISE,
            TOP,
            ExtractionConfig {
                mean: -3,
                ..Default::default()
            },
        );
        assert_approx_eq!(backward.energy, 500.0, 1e-9);
    }

    #[test]
    fn readout_window_past_end_is_invalid() {
        let filtered = ideal_trapezoid(640, 400, 500.0);
        let result = extract_trap_results(
            &filtered,
            RISE,
            TOP,
            ExtractionConfig {
                shift: 200,
                ..Default::default()
            },
        );
        assert!(!result.is_valid());
        assert!(result.energy.is_nan());
    }

    #[test]
    fn flat_waveform_is_invalid() {
        let filtered = vec![250.0; 1000];
        let result = extract_trap_results(&filtered, RISE, TOP, ExtractionConfig::default());
        assert!(!result.is_valid());
        assert!(result.energy.is_nan());
        assert!(result.time.is_nan());
    }

    #[test]
    fn monotonic_ramp_is_invalid() {
        let filtered: Vec<Real> = (0..1000).map(|i| i as Real).collect();
        let result = extract_trap_results(&filtered, RISE, TOP, ExtractionConfig::default());
        assert!(!result.is_valid());
    }

    #[test]
    fn empty_waveform_is_invalid() {
        let result = extract_trap_results(&[], RISE, TOP, ExtractionConfig::default());
        assert!(!result.is_valid());
    }

    #[test]
    fn double_trap_pivots_on_later_extremum() {
        // Bipolar pulse: positive lobe at 400, equally deep negative lobe at
        // 700. Later-in-time wins, so the search pivots on the minimum.
        let mut filtered = ideal_trapezoid(1200, 400, 500.0);
        for (i, v) in ideal_trapezoid(1200, 700, 500.0).into_iter().enumerate() {
            filtered[i] -= v;
        }
        let result = extract_double_trap_results(&filtered, RISE, TOP, ExtractionConfig::default());
        assert!(result.is_valid());
        assert_approx_eq!(result.energy, -500.0, 1e-9);
        // Midpoint 810 minus 7·top/4 + 2·rise.
        assert_approx_eq!(result.time, 810.0 - 35.0 - 200.0, 1e-9);
    }

    // End-to-end: a decaying exponential pulse matched to the kernel (decay
    // factor (tau-1)/tau) shapes into an ideal trapezoid of height equal to
    // the pulse amplitude; the extractor recovers amplitude and onset.
    #[test]
    fn exponential_pulse_through_single_trapezoid() {
        let (rise, top, tau) = (624usize, 100usize, 1250.0);
        let (onset, amplitude) = (800usize, 1000.0);
        let decay: Real = (tau - 1.0) / tau;
        let waveform: Vec<Real> = (0..3500)
            .map(|n| {
                if n < onset {
                    0.0
                } else {
                    amplitude * decay.powi((n - onset) as i32)
                }
            })
            .collect();

        let kernel = single_trapezoid(rise, top, tau, None).unwrap();
        let filtered = kernel.apply(&waveform);
        let result = extract_trap_results(&filtered, rise, top, ExtractionConfig::default());

        assert!(result.is_valid());
        assert_approx_eq!(result.energy, amplitude, 0.1);
        assert!((result.time - onset as Real).abs() <= 1.0);
    }
}
