use std::path::PathBuf;

use super::file::WavFileSource;
use super::frame::AudioFrame;
use super::microphone::MicrophoneSource;
use crate::Result;

/// Configuration for a frame source
#[derive(Debug, Clone)]
pub struct FrameSourceConfig {
    /// Sample rate every frame must be captured at (set by the wake gate)
    pub sample_rate: u32,
    /// Samples per frame (set by the wake gate)
    pub frame_length: usize,
    /// Frames buffered between the capture thread and the session loop
    pub buffer_frames: usize,
}

impl FrameSourceConfig {
    pub fn new(sample_rate: u32, frame_length: usize) -> Self {
        Self {
            sample_rate,
            frame_length,
            ..Default::default()
        }
    }
}

impl Default for FrameSourceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // Porcupine and most STT models
            frame_length: 512,  // 32ms at 16kHz
            buffer_frames: 64,  // ~2s of headroom
        }
    }
}

/// Pull-based source of fixed-size audio frames
///
/// Implementations:
/// - Microphone: cpal default input device
/// - File: replay a mono 16-bit WAV file (testing / offline runs)
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Read the next frame
    ///
    /// `Error::Audio` means this read failed but the next one may succeed;
    /// `Error::StreamClosed` means no more frames will ever arrive.
    async fn read_frame(&mut self) -> Result<AudioFrame>;

    /// Throw away frames captured while the session was busy elsewhere
    fn discard_pending(&mut self) {}

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Where frames come from
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Default input device
    Microphone,
    /// WAV file replay
    File(PathBuf),
}

/// Frame source factory
pub struct FrameSourceFactory;

impl FrameSourceFactory {
    pub fn create(source: AudioSource, config: FrameSourceConfig) -> Result<Box<dyn FrameSource>> {
        match source {
            AudioSource::Microphone => Ok(Box::new(MicrophoneSource::open(config)?)),
            AudioSource::File(path) => Ok(Box::new(WavFileSource::open(path, config)?)),
        }
    }
}
