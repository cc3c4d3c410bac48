use std::future::Future;

use tracing::{debug, error, info, info_span, warn, Instrument};

use super::config::SessionConfig;
use super::state::SessionState;
use super::stats::SessionStats;
use crate::audio::{FrameSource, SilenceEndpointer, Utterance, UtteranceArchive, WakeCue};
use crate::dialogue::DialogueHistory;
use crate::providers::{Responder, SpeechToText, TextToSpeech};
use crate::wake::WakeGate;
use crate::{Error, Result};

/// Everything a session talks to, chosen once at startup
pub struct SessionProviders {
    pub source: Box<dyn FrameSource>,
    pub wake: Box<dyn WakeGate>,
    pub stt: Box<dyn SpeechToText>,
    pub responder: Box<dyn Responder>,
    pub tts: Box<dyn TextToSpeech>,
}

/// The wake → record → transcribe → respond → speak loop
///
/// Every step runs to completion before the next one starts, so capture and
/// playback never overlap and at most one provider call is in flight. The
/// frame source is stopped and the wake gate released exactly once, whichever
/// way the session ends.
pub struct VoiceSession {
    config: SessionConfig,
    source: Box<dyn FrameSource>,
    wake: Box<dyn WakeGate>,
    stt: Box<dyn SpeechToText>,
    responder: Box<dyn Responder>,
    tts: Box<dyn TextToSpeech>,
    cue: Option<Box<dyn WakeCue>>,
    archive: Option<UtteranceArchive>,
    endpointer: SilenceEndpointer,
    history: DialogueHistory,
    state: SessionState,
    stats: SessionStats,
    cleaned_up: bool,
}

impl VoiceSession {
    /// Assemble a session
    ///
    /// The wake gate is released before returning an error, so a failed
    /// construction still cleans up.
    pub fn new(config: SessionConfig, providers: SessionProviders) -> Result<Self> {
        let SessionProviders {
            source,
            mut wake,
            stt,
            responder,
            tts,
        } = providers;

        let checked = Self::check(&config, wake.as_ref()).and_then(|()| {
            DialogueHistory::new(
                config.persona_prompt.clone(),
                config.persona_ack.clone(),
                config.history_limit,
            )
        });

        let mut history = match checked {
            Ok(history) => history,
            Err(e) => {
                wake.cleanup();
                return Err(e);
            }
        };
        history.seed();

        let endpointer = SilenceEndpointer::new(
            config.silence_threshold,
            config.silence_duration_secs,
            config.sample_rate,
            config.frame_length,
        );

        let session_id = uuid::Uuid::new_v4().to_string();
        info!(
            session_id = %session_id,
            wake = wake.name(),
            source = source.name(),
            stt = stt.name(),
            responder = responder.name(),
            tts = tts.name(),
            silence_threshold = endpointer.amplitude_threshold(),
            silence_frames = endpointer.threshold_frames(),
            "Voice session created"
        );

        Ok(Self {
            config,
            source,
            wake,
            stt,
            responder,
            tts,
            cue: None,
            archive: None,
            endpointer,
            history,
            state: SessionState::WaitingForWake,
            stats: SessionStats::new(session_id),
            cleaned_up: false,
        })
    }

    fn check(config: &SessionConfig, wake: &dyn WakeGate) -> Result<()> {
        config.validate()?;

        if wake.sample_rate() != config.sample_rate || wake.frame_length() != config.frame_length {
            return Err(Error::Config(format!(
                "{} wake gate needs {} Hz / {} samples per frame, session is configured for {} Hz / {}",
                wake.name(),
                wake.sample_rate(),
                wake.frame_length(),
                config.sample_rate,
                config.frame_length
            )));
        }

        Ok(())
    }

    /// Play `cue` whenever the wake word is heard
    pub fn with_cue(mut self, cue: Box<dyn WakeCue>) -> Self {
        self.cue = Some(cue);
        self
    }

    /// Save every captured utterance
    pub fn with_archive(mut self, archive: UtteranceArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn history(&self) -> &DialogueHistory {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Run until Ctrl-C or a fatal error
    pub async fn run(&mut self) -> Result<SessionStats> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves or a fatal error ends the loop
    ///
    /// Cleanup runs on both paths. Interrupts abandon whatever step was in
    /// progress and return `Ok`.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<SessionStats>
    where
        F: Future<Output = ()>,
    {
        if self.cleaned_up {
            return Err(Error::Config("session has already ended".to_string()));
        }

        let span = info_span!("session", id = %self.stats.session_id);

        let outcome = async {
            tokio::select! {
                result = self.run_loop() => result,
                () = shutdown => {
                    info!("Shutdown requested");
                    Ok(())
                }
            }
        }
        .instrument(span.clone())
        .await;

        self.cleanup().instrument(span).await;

        match outcome {
            Ok(()) => Ok(self.stats.clone()),
            Err(e) => {
                error!(error = %e, "Voice session ended");
                Err(e)
            }
        }
    }

    async fn run_loop(&mut self) -> Result<()> {
        if let Some(message) = self.config.startup_message.clone() {
            self.set_state(SessionState::Speaking);
            self.speak(&message).await;
        }

        loop {
            self.run_cycle().await?;
        }
    }

    /// One full pass from waiting for the wake word back to waiting
    async fn run_cycle(&mut self) -> Result<()> {
        self.wait_for_wake().await?;
        self.stats.wake_detections += 1;

        if self.config.wake_cue {
            if let Some(cue) = &self.cue {
                if let Err(e) = cue.play().await {
                    warn!(error = %e, "Wake cue failed");
                }
            }
        }

        self.set_state(SessionState::Recording);
        let utterance = self.endpointer.record(self.source.as_mut()).await;

        if utterance.is_empty() {
            self.stats.empty_captures += 1;
            debug!("Nothing recorded");
            return Ok(());
        }

        if let Some(archive) = &mut self.archive {
            if let Err(e) = archive.save(&utterance) {
                warn!(error = %e, "Failed to archive utterance");
            }
        }

        self.handle_utterance(utterance).await
    }

    async fn wait_for_wake(&mut self) -> Result<()> {
        self.set_state(SessionState::WaitingForWake);

        // Frames queued while speaking would otherwise be fed to the gate
        self.source.discard_pending();
        self.wake.reset();

        loop {
            match self.source.read_frame().await {
                Ok(frame) => {
                    if self.wake.process(&frame) {
                        info!("Wake word detected");
                        return Ok(());
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(error = %e, "Skipping unreadable frame"),
            }
        }
    }

    async fn handle_utterance(&mut self, utterance: Utterance) -> Result<()> {
        self.set_state(SessionState::Transcribing);
        debug!(
            frames = utterance.frame_count(),
            duration_ms = utterance.duration().as_millis() as u64,
            "Transcribing utterance"
        );

        let samples = utterance.into_samples();
        let transcript = self.stt.transcribe(&samples, self.config.sample_rate).await?;
        let prompt = transcript.trim();

        if prompt.is_empty() {
            self.stats.unheard_prompts += 1;
            info!("Transcript was empty");
            self.set_state(SessionState::Speaking);
            let message = self.config.unheard_message.clone();
            self.speak(&message).await;
            return Ok(());
        }

        info!(prompt = %prompt, "User said");

        self.set_state(SessionState::Responding);
        let response = self.responder.respond(prompt, self.history.context()).await;
        let reply = match response {
            Ok(reply) => reply,
            Err(Error::RateLimited(provider)) => {
                warn!(provider = %provider, "Language model rate limited");
                self.stats.rate_limited_replies += 1;
                self.config.rate_limit_reply.clone()
            }
            Err(e) => return Err(e),
        };

        self.history.record(prompt, reply.clone());
        self.stats.exchanges += 1;
        info!(reply = %reply, history = self.history.len(), "Assistant replied");

        self.set_state(SessionState::Speaking);
        self.speak(&reply).await;

        Ok(())
    }

    /// Best-effort speech; failures are only logged
    async fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        if let Err(e) = self.tts.speak(text).await {
            warn!(error = %e, "Speech playback failed");
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "State change");
            self.state = state;
        }
    }

    async fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;
        self.state = SessionState::Stopped;

        if let Err(e) = self.source.stop().await {
            warn!(error = %e, "Failed to stop audio source");
        }
        self.wake.cleanup();

        info!(
            duration_secs = self.stats.duration_secs(),
            wake_detections = self.stats.wake_detections,
            exchanges = self.stats.exchanges,
            empty_captures = self.stats.empty_captures,
            unheard = self.stats.unheard_prompts,
            rate_limited = self.stats.rate_limited_replies,
            "Voice session stopped"
        );
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        // Sessions dropped without running still hold the gate
        if !self.cleaned_up {
            self.cleaned_up = true;
            self.wake.cleanup();
        }
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
