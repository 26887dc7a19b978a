//! The firmware's trigger-arming state machine.
//!
//! Runs over the emulated filter output. A sample beyond the threshold arms
//! the detector; the next sign change marks the zero cross; after a fixed
//! settling delay the event is read out; the detector then stays armed
//! until the output falls back inside the threshold. Offsets are reported
//! on the raw (pre-downsampling) time axis.

use tracing::debug;
use waveform_common::Real;

/// A trigger decision: the filter sample read out after the settling delay
/// and its location in raw digitiser timebins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerEvent {
    pub energy: Real,
    pub sample_offset: i64,
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
enum State {
    #[default]
    Idle,
    WaitZeroCross,
    WaitDelay {
        crossing: usize,
    },
    Armed,
}

#[derive(Debug, Clone)]
pub struct TriggerDetector {
    rise: usize,
    top: usize,
    threshold: i32,
    /// Samples between the zero cross and the energy readout.
    wait: usize,
    state: State,
    last_value: i32,
}

impl TriggerDetector {
    pub fn new(rise: usize, top: usize, threshold: i32) -> Self {
        Self {
            rise,
            top,
            threshold,
            wait: rise / 2 + (3 * top) / 4,
            state: State::default(),
            last_value: 0,
        }
    }

    /// Feeds one filter output sample; yields an event when the settling
    /// delay after a zero cross has elapsed.
    pub fn signal(&mut self, index: usize, value: i32) -> Option<TriggerEvent> {
        let mut event = None;
        match self.state {
            State::Idle => {
                if value.abs() >= self.threshold {
                    self.state = State::WaitZeroCross;
                }
            }
            State::WaitZeroCross => {
                if value.signum() != self.last_value.signum() {
                    self.state = State::WaitDelay { crossing: index };
                }
            }
            State::WaitDelay { crossing } => {
                if index - crossing > self.wait {
                    let offset = index as i64
                        - self.rise as i64
                        - ((3 * self.top) / 4) as i64
                        - self.top as i64
                        - self.rise as i64;
                    event = Some(TriggerEvent {
                        energy: Real::from(value),
                        // Factor of two restores the pre-downsampling axis.
                        sample_offset: 2 * offset,
                    });
                    self.state = State::Armed;
                }
            }
            State::Armed => {
                if value.abs() < self.threshold {
                    self.state = State::Idle;
                }
            }
        }
        self.last_value = value;
        event
    }
}

/// Runs the state machine over a whole filter output stream, skipping the
/// filter's startup transient of `3·rise + 2·top` samples. A stream shorter
/// than that yields no events, which is valid rather than an error.
pub fn detect_triggers(
    filtered: &[i32],
    rise: usize,
    top: usize,
    threshold: i32,
) -> Vec<TriggerEvent> {
    let mut detector = TriggerDetector::new(rise, top, threshold);
    let events: Vec<_> = filtered
        .iter()
        .enumerate()
        .skip(3 * rise + 2 * top)
        .filter_map(|(index, &value)| detector.signal(index, value))
        .collect();
    debug!("{} trigger(s) in {} filter samples", events.len(), filtered.len());
    events
}
