//! Audio playback to the default output device
//!
//! Samples are queued from the async side and drained by the cpal output
//! callback; the stream itself lives on a dedicated thread because cpal
//! streams are not `Send`.

use std::collections::VecDeque;
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SampleRate, SizedSample, StreamConfig};
use tracing::{debug, warn};

use crate::{Error, Result};

/// How often the playback thread checks for completion
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Extra time allowed past the expected end of playback
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Small tail so the device flushes its last buffer
const TAIL: Duration = Duration::from_millis(100);

#[derive(Default)]
struct PlaybackQueue {
    samples: VecDeque<i16>,
    closed_at: Option<Instant>,
    remaining_at_close: usize,
    drained: bool,
    failure: Option<String>,
}

/// A mono i16 output stream fed incrementally
///
/// `write` may be called any number of times; `finish` blocks (async) until
/// everything written has been played.
pub struct PlaybackStream {
    queue: Arc<Mutex<PlaybackQueue>>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackStream {
    /// Open the default output device at `sample_rate`
    pub fn open(sample_rate: u32) -> Result<Self> {
        let queue = Arc::new(Mutex::new(PlaybackQueue::default()));
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<()>>(1);

        let thread_queue = Arc::clone(&queue);
        let thread = std::thread::Builder::new()
            .name("gerald-playback".to_string())
            .spawn(move || {
                let stream = match open_output_stream(sample_rate, Arc::clone(&thread_queue)) {
                    Ok(stream) => {
                        ready_tx.send(Ok(())).ok();
                        stream
                    }
                    Err(e) => {
                        ready_tx.send(Err(e)).ok();
                        return;
                    }
                };

                wait_for_drain(&thread_queue, sample_rate);
                std::thread::sleep(TAIL);
                drop(stream);
            })?;

        ready_rx
            .recv()
            .map_err(|_| Error::Audio("playback thread exited before opening the device".to_string()))??;

        Ok(Self {
            queue,
            thread: Some(thread),
        })
    }

    /// Queue samples for playback
    pub fn write(&self, samples: &[i16]) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.samples.extend(samples.iter().copied());
        }
    }

    /// Wait until every queued sample has been played
    pub async fn finish(mut self) -> Result<()> {
        self.close();

        if let Some(handle) = self.thread.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|e| Error::Audio(format!("failed to join playback thread: {e}")))?
                .map_err(|_| Error::Audio("playback thread panicked".to_string()))?;
        }

        let failure = self
            .queue
            .lock()
            .ok()
            .and_then(|mut queue| queue.failure.take());

        match failure {
            Some(message) => Err(Error::Audio(message)),
            None => Ok(()),
        }
    }

    fn close(&self) {
        if let Ok(mut queue) = self.queue.lock() {
            if queue.closed_at.is_none() {
                queue.remaining_at_close = queue.samples.len();
                queue.closed_at = Some(Instant::now());
            }
        }
    }
}

impl Drop for PlaybackStream {
    fn drop(&mut self) {
        if self.thread.is_some() {
            if let Ok(mut queue) = self.queue.lock() {
                queue.samples.clear();
            }
            self.close();
        }
    }
}

/// Play a complete buffer and wait for it to finish
pub async fn play_samples(samples: &[i16], sample_rate: u32) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let stream = PlaybackStream::open(sample_rate)?;
    stream.write(samples);
    stream.finish().await?;

    debug!(samples = samples.len(), sample_rate, "playback complete");
    Ok(())
}

fn wait_for_drain(queue: &Mutex<PlaybackQueue>, sample_rate: u32) {
    loop {
        std::thread::sleep(POLL_INTERVAL);

        let Ok(mut queue) = queue.lock() else {
            return;
        };

        if queue.drained || queue.failure.is_some() {
            return;
        }

        if let Some(closed_at) = queue.closed_at {
            let expected = Duration::from_secs_f64(
                queue.remaining_at_close as f64 / f64::from(sample_rate.max(1)),
            );
            if closed_at.elapsed() > expected + DRAIN_GRACE {
                warn!("playback did not drain in time");
                queue.failure = Some("playback timed out".to_string());
                return;
            }
        }
    }
}

/// Prefer mono, then native i16
fn output_rank(channels: u16, format: SampleFormat) -> (u16, u8) {
    let format_rank = match format {
        SampleFormat::I16 => 0,
        SampleFormat::F32 => 1,
        _ => 2,
    };
    (channels, format_rank)
}

fn open_output_stream(sample_rate: u32, queue: Arc<Mutex<PlaybackQueue>>) -> Result<cpal::Stream> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let rate = SampleRate(sample_rate);
    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .filter(|c| c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
        .min_by_key(|c| output_rank(c.channels(), c.sample_format()))
        .ok_or_else(|| Error::Audio(format!("no output config supports {sample_rate} Hz")))?;

    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.with_sample_rate(rate).config();

    let stream = match sample_format {
        SampleFormat::I16 => build_output::<i16>(&device, &config, queue),
        SampleFormat::F32 => build_output::<f32>(&device, &config, queue),
        other => Err(Error::Audio(format!(
            "unsupported output sample format {other:?}"
        ))),
    }?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    debug!(
        device = %device.name().unwrap_or_default(),
        sample_rate,
        channels = config.channels,
        "audio playback started"
    );

    Ok(stream)
}

fn build_output<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    queue: Arc<Mutex<PlaybackQueue>>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<i16>,
{
    let channels = usize::from(config.channels.max(1));
    let error_queue = Arc::clone(&queue);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let Ok(mut queue) = queue.lock() else {
                    data.fill(T::EQUILIBRIUM);
                    return;
                };

                for frame in data.chunks_mut(channels) {
                    let value = match queue.samples.pop_front() {
                        Some(sample) => T::from_sample_(sample),
                        None => {
                            if queue.closed_at.is_some() {
                                queue.drained = true;
                            }
                            T::EQUILIBRIUM
                        }
                    };
                    frame.fill(value);
                }
            },
            move |err| {
                tracing::error!(error = %err, "audio playback error");
                if let Ok(mut queue) = error_queue.lock() {
                    queue.failure = Some(err.to_string());
                }
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))
}
