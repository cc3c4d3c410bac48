use std::f32::consts::PI;

use super::playback::play_samples;
use crate::Result;

/// Audible signal played when the wake word is detected
#[async_trait::async_trait]
pub trait WakeCue: Send + Sync {
    async fn play(&self) -> Result<()>;
}

/// Synthesize a sine tone as mono i16 PCM
pub fn sine_tone(frequency_hz: f32, duration_secs: f32, amplitude: f32, sample_rate: u32) -> Vec<i16> {
    let count = (sample_rate as f32 * duration_secs.max(0.0)) as usize;
    let amplitude = amplitude.clamp(0.0, 1.0);

    (0..count)
        .map(|n| {
            let t = n as f32 / sample_rate as f32;
            let value = (2.0 * PI * frequency_hz * t).sin() * amplitude;
            (value * f32::from(i16::MAX)) as i16
        })
        .collect()
}

/// Short beep on the default output device
pub struct ToneCue {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl ToneCue {
    pub fn new(frequency_hz: f32, duration_secs: f32, amplitude: f32, sample_rate: u32) -> Self {
        Self {
            samples: sine_tone(frequency_hz, duration_secs, amplitude, sample_rate),
            sample_rate,
        }
    }
}

#[async_trait::async_trait]
impl WakeCue for ToneCue {
    async fn play(&self) -> Result<()> {
        play_samples(&self.samples, self.sample_rate).await
    }
}
