//! Shape-and-extract over a batch of waveforms.
//!
//! Waveforms are independent, so the batch fans out across worker threads
//! with one waveform per task; everything within a waveform stays
//! sequential. The kernel is built once and shared read-only.

use crate::{
    Real,
    extraction::{
        ExtractionConfig, ExtractionResult, extract_cusp_results, extract_double_trap_results,
        extract_trap_results,
    },
    kernel::{self, FilterKernel, KernelError},
    parameters::Mode,
};
use rayon::prelude::*;
use tracing::info;
use waveform_common::{AdcValue, sample::to_real};

type Extractor = fn(&[Real], usize, usize, ExtractionConfig) -> ExtractionResult;

/// Runs the shaping mode over every waveform, yielding one result per
/// waveform in order. Fails only on a bad kernel configuration; individual
/// waveforms that yield no usable pulse report an invalid result.
pub fn process(waveforms: &[Vec<AdcValue>], mode: &Mode) -> Result<Vec<ExtractionResult>, KernelError> {
    let (kernel, extractor, params): (FilterKernel, Extractor, _) = match mode {
        Mode::SingleTrap(params) => (
            kernel::single_trapezoid(params.shaping.rise, params.shaping.top, params.shaping.tau, None)?,
            extract_trap_results,
            params,
        ),
        Mode::DoubleTrap(params) => (
            kernel::double_trapezoid(params.shaping.rise, params.shaping.top, params.shaping.tau, None)?,
            extract_double_trap_results,
            params,
        ),
        Mode::Cusp(params) => (
            kernel::cusp(params.shaping.rise, params.shaping.top, params.shaping.tau, None)?,
            extract_cusp_results,
            params,
        ),
    };
    let config = params.extraction_config();
    let results: Vec<_> = waveforms
        .par_iter()
        .map(|waveform| {
            let filtered = kernel.apply(&to_real(waveform));
            extractor(&filtered, params.shaping.rise, params.shaping.top, config)
        })
        .collect();
    info!(
        "extracted {} of {} waveforms",
        results.iter().filter(|r| r.is_valid()).count(),
        results.len()
    );
    Ok(results)
}
