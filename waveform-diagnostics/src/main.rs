//! Exercises the whole analysis chain on a synthetic waveform: shaping and
//! extraction, the hardware filter and trigger emulation, and the
//! compression round trip with checksum verification. Useful for sanity
//! checking parameter choices before pointing the real pipeline at data.

use anyhow::{Result, ensure};
use clap::Parser;
use daq_emulator::{daq_scale_factor, detect_triggers, emulate};
use rand::Rng;
use tracing::info;
use waveform_codec::{delta, rice};
use waveform_common::{AdcValue, Real, fletcher32, to_real};
use waveform_shaping::{
    extraction::{ExtractionConfig, extract_trap_results},
    kernel::single_trapezoid,
    parameters::ShapingParameters,
};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Kernel geometry as 'rise,top,tau'.
    #[clap(long, default_value = "625,100,1250")]
    shaping: ShapingParameters,

    /// Pulse amplitude in ADC units.
    #[clap(long, default_value = "2000")]
    amplitude: Real,

    /// Pulse onset in digitiser timebins.
    #[clap(long, default_value = "800")]
    onset: usize,

    /// Number of samples in the synthetic waveform.
    #[clap(long, default_value = "7000")]
    samples: usize,

    /// Peak-to-peak amplitude of the added uniform noise.
    #[clap(long, default_value = "8")]
    noise: i16,

    /// Trigger threshold for the emulated hardware, in DAQ ADC units.
    #[clap(long, default_value = "500")]
    trigger_threshold: i32,

    /// Golomb parameter for the compression round trip.
    #[clap(long, default_value = "8")]
    golomb_m: u32,
}

fn synthetic_waveform(args: &Cli) -> Vec<AdcValue> {
    let mut rng = rand::rng();
    let decay = (args.shaping.tau - 1.0) / args.shaping.tau;
    (0..args.samples)
        .map(|n| {
            let pulse = if n < args.onset {
                0.0
            } else {
                args.amplitude * decay.powi((n - args.onset) as i32)
            };
            let noise = rng.random_range(-args.noise..=args.noise);
            pulse.round() as AdcValue + noise
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Cli::parse();
    let ShapingParameters { rise, top, tau } = args.shaping.clone();
    let waveform = synthetic_waveform(&args);

    // Shaping and extraction.
    let kernel = single_trapezoid(rise, top, tau, None)?;
    let filtered = kernel.apply(&to_real(&waveform));
    let result = extract_trap_results(&filtered, rise, top, ExtractionConfig::default());
    ensure!(result.is_valid(), "no usable pulse in the synthetic waveform");
    info!(
        energy = result.energy,
        time = result.time,
        "extracted synthetic pulse"
    );

    // Hardware filter and trigger emulation.
    let emulated = emulate(&waveform, rise, top, tau, daq_scale_factor(rise, tau));
    let triggers = detect_triggers(&emulated, rise, top, args.trigger_threshold);
    info!("emulated DAQ produced {} trigger(s)", triggers.len());
    for trigger in &triggers {
        info!(
            energy = trigger.energy,
            sample_offset = trigger.sample_offset,
            "trigger"
        );
    }

    // Compression round trip, verified the way the replay stage would.
    let reference = fletcher32(&waveform.iter().map(|&v| v as u16).collect::<Vec<_>>());
    let block = rice::encode(&delta::encode(&waveform), args.golomb_m)?;
    let restored = delta::decode(&block.decode()?);
    let verified = fletcher32(&restored.iter().map(|&v| v as u16).collect::<Vec<_>>());
    ensure!(verified == reference, "compression round trip corrupted the waveform");
    info!(
        "compressed {} samples into {} words ({:.2} bits/sample), checksum {verified:#010x}",
        block.sample_count,
        block.words.len(),
        32.0 * block.words.len() as f64 / block.sample_count as f64,
    );

    Ok(())
}
