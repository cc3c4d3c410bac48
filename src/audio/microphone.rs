//! Microphone capture from the default input device
//!
//! cpal streams are not `Send`, so the stream lives on its own thread and
//! hands complete frames to the session loop over a bounded channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SampleRate, SizedSample, StreamConfig};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::frame::AudioFrame;
use super::source::{FrameSource, FrameSourceConfig};
use crate::{Error, Result};

/// Consecutive failed reads before the device is treated as lost
const MAX_CONSECUTIVE_ERRORS: usize = 10;

type CaptureResult = std::result::Result<AudioFrame, String>;

/// Frame source backed by the default cpal input device
pub struct MicrophoneSource {
    frames_rx: mpsc::Receiver<CaptureResult>,
    shutdown_tx: Option<std_mpsc::Sender<()>>,
    capture_thread: Option<JoinHandle<()>>,
    dropped_frames: Arc<AtomicUsize>,
    consecutive_errors: usize,
    device_name: String,
}

impl MicrophoneSource {
    /// Open the default input device and start capturing
    pub fn open(config: FrameSourceConfig) -> Result<Self> {
        let (frames_tx, frames_rx) = mpsc::channel(config.buffer_frames.max(1));
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<String>>(1);
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();
        let dropped_frames = Arc::new(AtomicUsize::new(0));

        let thread_dropped = Arc::clone(&dropped_frames);
        let capture_thread = std::thread::Builder::new()
            .name("gerald-capture".to_string())
            .spawn(move || {
                let stream = match open_input_stream(&config, frames_tx, thread_dropped) {
                    Ok((stream, device_name)) => {
                        ready_tx.send(Ok(device_name)).ok();
                        stream
                    }
                    Err(e) => {
                        ready_tx.send(Err(e)).ok();
                        return;
                    }
                };

                // Park until stop() signals or the source is dropped
                shutdown_rx.recv().ok();
                drop(stream);
                debug!("capture thread exiting");
            })?;

        let device_name = ready_rx
            .recv()
            .map_err(|_| Error::Audio("capture thread exited before opening the device".to_string()))??;

        Ok(Self {
            frames_rx,
            shutdown_tx: Some(shutdown_tx),
            capture_thread: Some(capture_thread),
            dropped_frames,
            consecutive_errors: 0,
            device_name,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

#[async_trait::async_trait]
impl FrameSource for MicrophoneSource {
    async fn read_frame(&mut self) -> Result<AudioFrame> {
        let dropped = self.dropped_frames.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            debug!(dropped, "input frames dropped while the session was busy");
        }

        match self.frames_rx.recv().await {
            Some(Ok(frame)) => {
                self.consecutive_errors = 0;
                Ok(frame)
            }
            Some(Err(message)) => {
                self.consecutive_errors += 1;
                if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    return Err(Error::StreamClosed(format!(
                        "{} consecutive input errors, last: {}",
                        self.consecutive_errors, message
                    )));
                }
                Err(Error::Audio(message))
            }
            None => Err(Error::StreamClosed("input stream ended".to_string())),
        }
    }

    fn discard_pending(&mut self) {
        let mut discarded = 0usize;
        while self.frames_rx.try_recv().is_ok() {
            discarded += 1;
        }
        self.dropped_frames.store(0, Ordering::Relaxed);

        if discarded > 0 {
            debug!(discarded, "discarded stale input frames");
        }
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            return Ok(());
        };

        info!("Stopping microphone capture");
        shutdown_tx.send(()).ok();

        if let Some(handle) = self.capture_thread.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|e| Error::Audio(format!("failed to join capture thread: {e}")))?
                .map_err(|_| Error::Audio("capture thread panicked".to_string()))?;
        }

        info!("Microphone capture stopped");
        Ok(())
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            shutdown_tx.send(()).ok();
        }
    }
}

/// Prefer native i16 input, then f32
fn sample_format_rank(format: SampleFormat) -> u8 {
    match format {
        SampleFormat::I16 => 0,
        SampleFormat::F32 => 1,
        _ => 2,
    }
}

fn open_input_stream(
    config: &FrameSourceConfig,
    frames_tx: mpsc::Sender<CaptureResult>,
    dropped: Arc<AtomicUsize>,
) -> Result<(cpal::Stream, String)> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or_else(|| Error::Audio("no input device available".to_string()))?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let rate = SampleRate(config.sample_rate);
    let supported = device
        .supported_input_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .filter(|c| c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
        .min_by_key(|c| (c.channels(), sample_format_rank(c.sample_format())))
        .ok_or_else(|| {
            Error::Audio(format!(
                "input device {} does not support {} Hz",
                device_name, config.sample_rate
            ))
        })?;

    let sample_format = supported.sample_format();
    let stream_config: StreamConfig = supported.with_sample_rate(rate).config();

    let stream = match sample_format {
        SampleFormat::I16 => {
            build_input::<i16>(&device, &stream_config, config.frame_length, frames_tx, dropped)
        }
        SampleFormat::F32 => {
            build_input::<f32>(&device, &stream_config, config.frame_length, frames_tx, dropped)
        }
        other => Err(Error::Audio(format!(
            "unsupported input sample format {other:?}"
        ))),
    }?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    info!(
        device = %device_name,
        sample_rate = config.sample_rate,
        frame_length = config.frame_length,
        channels = stream_config.channels,
        "Microphone capture started"
    );

    Ok((stream, device_name))
}

fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    frame_length: usize,
    frames_tx: mpsc::Sender<CaptureResult>,
    dropped: Arc<AtomicUsize>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let channels = usize::from(config.channels.max(1));
    let sample_rate = config.sample_rate.0;
    let error_tx = frames_tx.clone();
    let mut pending: Vec<i16> = Vec::with_capacity(frame_length);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Mono: keep the first channel of each interleaved group
                for &sample in data.iter().step_by(channels) {
                    pending.push(i16::from_sample_(sample));

                    if pending.len() == frame_length {
                        let samples =
                            std::mem::replace(&mut pending, Vec::with_capacity(frame_length));
                        if frames_tx
                            .try_send(Ok(AudioFrame::new(samples, sample_rate)))
                            .is_err()
                        {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            },
            move |err| {
                error_tx.try_send(Err(err.to_string())).ok();
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))
}
