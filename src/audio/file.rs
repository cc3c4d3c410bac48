use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::info;

use super::frame::AudioFrame;
use super::source::{FrameSource, FrameSourceConfig};
use crate::{Error, Result};

/// A WAV file loaded into memory
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    /// Load a 16-bit integer PCM WAV file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)?;

        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(Error::Audio(format!(
                "{} is not 16-bit integer PCM ({:?}, {} bits)",
                path.display(),
                spec.sample_format,
                spec.bits_per_sample
            )));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

fn mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Encode mono samples as an in-memory WAV file (for STT uploads)
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, mono_spec(sample_rate))?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Write mono samples to a WAV file on disk
pub fn write_wav(path: impl AsRef<Path>, samples: &[i16], sample_rate: u32) -> Result<()> {
    let mut writer = WavWriter::create(path.as_ref(), mono_spec(sample_rate))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Replays a mono WAV file as fixed-size frames
///
/// The file must already be at the session sample rate; nothing is
/// resampled. The last frame is zero-padded to full length, and once the
/// file is exhausted every read reports `StreamClosed`.
pub struct WavFileSource {
    path: String,
    samples: Vec<i16>,
    position: usize,
    sample_rate: u32,
    frame_length: usize,
}

impl WavFileSource {
    pub fn open(path: impl AsRef<Path>, config: FrameSourceConfig) -> Result<Self> {
        Self::from_audio_file(AudioFile::open(path)?, config)
    }

    pub fn from_audio_file(audio: AudioFile, config: FrameSourceConfig) -> Result<Self> {
        if audio.channels != 1 {
            return Err(Error::Audio(format!(
                "{} has {} channels, expected mono",
                audio.path, audio.channels
            )));
        }

        if audio.sample_rate != config.sample_rate {
            return Err(Error::Audio(format!(
                "{} is {}Hz but the session runs at {}Hz",
                audio.path, audio.sample_rate, config.sample_rate
            )));
        }

        if config.frame_length == 0 {
            return Err(Error::Config("frame length must be positive".to_string()));
        }

        Ok(Self {
            path: audio.path,
            samples: audio.samples,
            position: 0,
            sample_rate: config.sample_rate,
            frame_length: config.frame_length,
        })
    }

    /// Frames left before end of file
    pub fn remaining_frames(&self) -> usize {
        let remaining = self.samples.len().saturating_sub(self.position);
        remaining.div_ceil(self.frame_length)
    }
}

#[async_trait::async_trait]
impl FrameSource for WavFileSource {
    async fn read_frame(&mut self) -> Result<AudioFrame> {
        if self.position >= self.samples.len() {
            return Err(Error::StreamClosed(format!("end of file {}", self.path)));
        }

        let end = (self.position + self.frame_length).min(self.samples.len());
        let mut frame = self.samples[self.position..end].to_vec();
        frame.resize(self.frame_length, 0);
        self.position = end;

        Ok(AudioFrame::new(frame, self.sample_rate))
    }

    async fn stop(&mut self) -> Result<()> {
        self.position = self.samples.len();
        Ok(())
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
