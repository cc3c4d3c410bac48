use std::time::Duration;

/// One fixed-size block of mono 16-bit PCM captured in a single read
///
/// Every frame of a session has the same length and sample rate, both
/// dictated by the wake gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Raw samples (i16 PCM, mono)
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples in this frame
    pub fn frame_length(&self) -> usize {
        self.samples.len()
    }

    /// Largest absolute sample value; `i16::MIN` maps to 32768
    pub fn peak_amplitude(&self) -> u16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    /// A frame is silent when every sample stays strictly below `threshold`
    pub fn is_silent(&self, threshold: u16) -> bool {
        self.peak_amplitude() < threshold
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Frames accumulated while recording a prompt
///
/// Append-only; turned into one contiguous buffer once recording ends.
#[derive(Debug, Clone, Default)]
pub struct Utterance {
    frames: Vec<AudioFrame>,
    sample_rate: u32,
}

impl Utterance {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Vec::new(),
            sample_rate,
        }
    }

    pub fn push(&mut self, frame: AudioFrame) {
        self.frames.push(frame);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(AudioFrame::frame_length).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.sample_count() as f64 / self.sample_rate as f64)
    }

    /// Iterate over every sample in capture order
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.frames.iter().flat_map(|f| f.samples().iter().copied())
    }

    /// Concatenate all frames into a single sample buffer
    pub fn into_samples(self) -> Vec<i16> {
        let mut buffer = Vec::with_capacity(self.sample_count());
        for frame in self.frames {
            buffer.extend_from_slice(frame.samples());
        }
        buffer
    }
}
