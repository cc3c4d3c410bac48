// Scripted collaborators for driving a VoiceSession without audio hardware
// or network access.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gerald::audio::{AudioFrame, FrameSource};
use gerald::providers::{Responder, SpeechToText, TextToSpeech};
use gerald::session::{SessionConfig, SessionProviders, VoiceSession};
use gerald::wake::WakeGate;
use gerald::{ChatTurn, Error, Result};

pub const SAMPLE_RATE: u32 = 16000;
pub const FRAME_LENGTH: usize = 512;

pub const LOUD: i16 = 4000;
pub const QUIET: i16 = 20;

pub enum Step {
    Frame(i16),
    Fail,
}

pub fn loud(n: usize) -> impl Iterator<Item = Step> {
    (0..n).map(|_| Step::Frame(LOUD))
}

pub fn quiet(n: usize) -> impl Iterator<Item = Step> {
    (0..n).map(|_| Step::Frame(QUIET))
}

/// What the source does once its script runs out
#[derive(Clone, Copy)]
pub enum WhenExhausted {
    Close,
    Hang,
}

pub struct ScriptedSource {
    steps: VecDeque<Step>,
    when_exhausted: WhenExhausted,
    pub stops: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl FrameSource for ScriptedSource {
    async fn read_frame(&mut self) -> Result<AudioFrame> {
        match self.steps.pop_front() {
            Some(Step::Frame(level)) => Ok(AudioFrame::new(vec![level; FRAME_LENGTH], SAMPLE_RATE)),
            Some(Step::Fail) => Err(Error::Audio("input overflow".to_string())),
            None => match self.when_exhausted {
                WhenExhausted::Close => Err(Error::StreamClosed("script finished".to_string())),
                WhenExhausted::Hang => std::future::pending().await,
            },
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Fires on the listed 1-based frame counts it has been shown
pub struct ScriptedGate {
    triggers: Vec<usize>,
    seen: usize,
    sample_rate: u32,
    frame_length: usize,
    pub cleanups: Arc<AtomicUsize>,
    pub resets: Arc<AtomicUsize>,
}

impl WakeGate for ScriptedGate {
    fn process(&mut self, _frame: &AudioFrame) -> bool {
        self.seen += 1;
        self.triggers.contains(&self.seen)
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn cleanup(&mut self) {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub struct FakeStt {
    transcripts: Mutex<VecDeque<String>>,
    pub sample_counts: Arc<Mutex<Vec<usize>>>,
}

#[async_trait::async_trait]
impl SpeechToText for FakeStt {
    async fn transcribe(&self, samples: &[i16], _sample_rate: u32) -> Result<String> {
        self.sample_counts.lock().unwrap().push(samples.len());
        Ok(self.transcripts.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub enum Reply {
    Text(String),
    RateLimited,
    Failure,
}

pub struct FakeResponder {
    replies: Mutex<VecDeque<Reply>>,
    pub calls: Arc<Mutex<Vec<(String, Vec<ChatTurn>)>>>,
}

#[async_trait::async_trait]
impl Responder for FakeResponder {
    async fn respond(&self, prompt: &str, history: &[ChatTurn]) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), history.to_vec()));

        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::RateLimited) => Err(Error::RateLimited("fake".to_string())),
            Some(Reply::Failure) | None => Err(Error::Provider("upstream 500".to_string())),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub struct FakeTts {
    fail: bool,
    pub spoken: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl TextToSpeech for FakeTts {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Tts("speaker unplugged".to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Shared views into the fakes after the session has taken ownership
pub struct Probes {
    pub source_stops: Arc<AtomicUsize>,
    pub gate_cleanups: Arc<AtomicUsize>,
    pub gate_resets: Arc<AtomicUsize>,
    pub stt_sample_counts: Arc<Mutex<Vec<usize>>>,
    pub responder_calls: Arc<Mutex<Vec<(String, Vec<ChatTurn>)>>>,
    pub spoken: Arc<Mutex<Vec<String>>>,
}

impl Probes {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn stt_sample_counts(&self) -> Vec<usize> {
        self.stt_sample_counts.lock().unwrap().clone()
    }

    pub fn responder_calls(&self) -> Vec<(String, Vec<ChatTurn>)> {
        self.responder_calls.lock().unwrap().clone()
    }

    pub fn source_stops(&self) -> usize {
        self.source_stops.load(Ordering::SeqCst)
    }

    pub fn gate_cleanups(&self) -> usize {
        self.gate_cleanups.load(Ordering::SeqCst)
    }

    pub fn gate_resets(&self) -> usize {
        self.gate_resets.load(Ordering::SeqCst)
    }
}

pub struct Script {
    pub steps: Vec<Step>,
    pub when_exhausted: WhenExhausted,
    pub wake_on: Vec<usize>,
    pub gate_geometry: (u32, usize),
    pub transcripts: Vec<String>,
    pub replies: Vec<Reply>,
    pub tts_fails: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            when_exhausted: WhenExhausted::Close,
            wake_on: Vec::new(),
            gate_geometry: (SAMPLE_RATE, FRAME_LENGTH),
            transcripts: Vec::new(),
            replies: Vec::new(),
            tts_fails: false,
        }
    }
}

/// Session defaults without the startup announcement
pub fn quiet_config() -> SessionConfig {
    SessionConfig {
        startup_message: None,
        ..SessionConfig::new(SAMPLE_RATE, FRAME_LENGTH)
    }
}

pub fn build(config: SessionConfig, script: Script) -> (Result<VoiceSession>, Probes) {
    let probes = Probes {
        source_stops: Arc::new(AtomicUsize::new(0)),
        gate_cleanups: Arc::new(AtomicUsize::new(0)),
        gate_resets: Arc::new(AtomicUsize::new(0)),
        stt_sample_counts: Arc::new(Mutex::new(Vec::new())),
        responder_calls: Arc::new(Mutex::new(Vec::new())),
        spoken: Arc::new(Mutex::new(Vec::new())),
    };

    let providers = SessionProviders {
        source: Box::new(ScriptedSource {
            steps: script.steps.into_iter().collect(),
            when_exhausted: script.when_exhausted,
            stops: Arc::clone(&probes.source_stops),
        }),
        wake: Box::new(ScriptedGate {
            triggers: script.wake_on,
            seen: 0,
            sample_rate: script.gate_geometry.0,
            frame_length: script.gate_geometry.1,
            cleanups: Arc::clone(&probes.gate_cleanups),
            resets: Arc::clone(&probes.gate_resets),
        }),
        stt: Box::new(FakeStt {
            transcripts: Mutex::new(script.transcripts.into_iter().collect()),
            sample_counts: Arc::clone(&probes.stt_sample_counts),
        }),
        responder: Box::new(FakeResponder {
            replies: Mutex::new(script.replies.into_iter().collect()),
            calls: Arc::clone(&probes.responder_calls),
        }),
        tts: Box::new(FakeTts {
            fail: script.tts_fails,
            spoken: Arc::clone(&probes.spoken),
        }),
    };

    (VoiceSession::new(config, providers), probes)
}

/// Steps for one exchange: wake after `lead_in` frames, speak, then go quiet
pub fn exchange(lead_in: usize, speech_frames: usize) -> Vec<Step> {
    quiet(lead_in)
        .chain(loud(speech_frames))
        .chain(quiet(31))
        .collect()
}
