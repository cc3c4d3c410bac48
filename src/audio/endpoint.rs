//! Silence endpointing
//!
//! Records frames after the wake word until the speaker has been quiet for
//! the configured duration. A frame counts as silent when its peak absolute
//! amplitude is strictly below the amplitude threshold. There is no minimum
//! speech length and no maximum recording length: a continuously loud input
//! keeps the recording open.

use tracing::{debug, warn};

use super::frame::Utterance;
use super::source::FrameSource;

/// Number of consecutive silent frames that ends a recording
///
/// `floor(silence_duration_secs * sample_rate / frame_length)`
pub fn silence_frame_threshold(
    silence_duration_secs: f64,
    sample_rate: u32,
    frame_length: usize,
) -> usize {
    if frame_length == 0 {
        return 0;
    }
    (silence_duration_secs * f64::from(sample_rate) / frame_length as f64).floor() as usize
}

/// Per-recording silence counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilenceState {
    consecutive_silent: usize,
    threshold_frames: usize,
}

impl SilenceState {
    pub fn new(threshold_frames: usize) -> Self {
        Self {
            consecutive_silent: 0,
            threshold_frames,
        }
    }

    /// Feed one frame classification; returns true once the run of silent
    /// frames reaches the threshold
    pub fn observe(&mut self, silent: bool) -> bool {
        if silent {
            self.consecutive_silent += 1;
            self.consecutive_silent >= self.threshold_frames
        } else {
            self.consecutive_silent = 0;
            false
        }
    }

    pub fn consecutive_silent(&self) -> usize {
        self.consecutive_silent
    }

    pub fn threshold_frames(&self) -> usize {
        self.threshold_frames
    }
}

/// Turns a live frame stream into one utterance
#[derive(Debug, Clone)]
pub struct SilenceEndpointer {
    amplitude_threshold: u16,
    threshold_frames: usize,
    sample_rate: u32,
}

impl SilenceEndpointer {
    pub fn new(
        amplitude_threshold: u16,
        silence_duration_secs: f64,
        sample_rate: u32,
        frame_length: usize,
    ) -> Self {
        Self {
            amplitude_threshold,
            threshold_frames: silence_frame_threshold(
                silence_duration_secs,
                sample_rate,
                frame_length,
            ),
            sample_rate,
        }
    }

    pub fn threshold_frames(&self) -> usize {
        self.threshold_frames
    }

    pub fn amplitude_threshold(&self) -> u16 {
        self.amplitude_threshold
    }

    /// Record until sustained silence
    ///
    /// A failed read ends the recording early and returns whatever was
    /// captured so far, possibly nothing. Errors never propagate; the caller
    /// decides what an empty utterance means.
    pub async fn record(&self, source: &mut dyn FrameSource) -> Utterance {
        let mut utterance = Utterance::new(self.sample_rate);
        let mut silence = SilenceState::new(self.threshold_frames);

        loop {
            let frame = match source.read_frame().await {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(
                        error = %e,
                        frames = utterance.frame_count(),
                        "Recording aborted by input error"
                    );
                    return utterance;
                }
            };

            let silent = frame.is_silent(self.amplitude_threshold);
            utterance.push(frame);

            if silence.observe(silent) {
                break;
            }
        }

        debug!(
            frames = utterance.frame_count(),
            duration_ms = utterance.duration().as_millis() as u64,
            "Recording ended on silence"
        );

        utterance
    }
}
