//! Pulse shaping and energy/timing extraction.
//!
//! A raw waveform is convolved with one of the shaping kernels built by
//! [`kernel`] (single trapezoid, double trapezoid, or cusp) and the filtered
//! result is handed to the percent-threshold extractor in [`extraction`],
//! which locates the pulse and derives an `(energy, time)` pair. Typical
//! usage over a batch of waveforms:
//!
//! ```ignore
//! let kernel = kernel::single_trapezoid(rise, top, tau, None)?;
//! let results: Vec<_> = waveforms
//!     .iter()
//!     .map(|wave| kernel.apply(wave))
//!     .map(|filtered| extraction::extract_trap_results(&filtered, rise, top, config))
//!     .collect();
//! ```
//!
//! Convolution is a pluggable collaborator: any backend producing output
//! aligned like a natural full convolution works, and [`convolve`] provides
//! the direct reference implementation.

pub mod batch;
pub mod convolve;
pub mod extraction;
pub mod kernel;
pub mod parameters;

pub use waveform_common::Real;
