use tracing::debug;

use super::WakeGate;
use crate::audio::AudioFrame;

/// Sample rate the energy gate reports
pub const ENERGY_SAMPLE_RATE: u32 = 16000;

/// Frame length the energy gate reports (32ms at 16kHz)
pub const ENERGY_FRAME_LENGTH: usize = 512;

/// Keyword-free gate that fires on sustained loudness
///
/// Triggers once when `trigger_frames` consecutive frames have a normalized
/// RMS at or above `level`, then stays quiet until a frame drops below the
/// level again. Useful without an engine licence and in offline runs.
pub struct EnergyGate {
    level: f32,
    trigger_frames: usize,
    loud_run: usize,
    armed: bool,
}

impl EnergyGate {
    pub fn new(level: f32, trigger_frames: usize) -> Self {
        Self {
            level,
            trigger_frames: trigger_frames.max(1),
            loud_run: 0,
            armed: true,
        }
    }
}

/// RMS scaled to [0, 1]
fn normalized_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    ((sum / samples.len() as f64).sqrt() / 32768.0) as f32
}

impl WakeGate for EnergyGate {
    fn process(&mut self, frame: &AudioFrame) -> bool {
        let rms = normalized_rms(frame.samples());

        if rms < self.level {
            self.loud_run = 0;
            self.armed = true;
            return false;
        }

        self.loud_run += 1;
        if self.armed && self.loud_run >= self.trigger_frames {
            self.armed = false;
            debug!(rms, frames = self.loud_run, "Energy gate triggered");
            return true;
        }

        false
    }

    fn reset(&mut self) {
        self.loud_run = 0;
        self.armed = true;
    }

    fn sample_rate(&self) -> u32 {
        ENERGY_SAMPLE_RATE
    }

    fn frame_length(&self) -> usize {
        ENERGY_FRAME_LENGTH
    }

    fn cleanup(&mut self) {
        self.loud_run = 0;
    }

    fn name(&self) -> &str {
        "energy"
    }
}
