//! Process configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `GERALD_*` environment variables (`__` separates nesting, e.g.
//! `GERALD_SESSION__HISTORY_LIMIT=30`). API keys also fall back to the
//! conventional variables of each vendor.

use std::path::PathBuf;

use serde::Deserialize;

use crate::session::config::{
    SessionConfig, DEFAULT_HISTORY_LIMIT, DEFAULT_PERSONA_ACK, DEFAULT_PERSONA_PROMPT,
    DEFAULT_RATE_LIMIT_REPLY, DEFAULT_SILENCE_DURATION_SECS, DEFAULT_SILENCE_THRESHOLD,
    DEFAULT_STARTUP_MESSAGE, DEFAULT_UNHEARD_MESSAGE,
};
use crate::Result;

pub const ENV_PREFIX: &str = "GERALD";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionSettings,
    pub cue: CueConfig,
    pub wake: WakeConfig,
    pub stt: SttConfig,
    pub tts: TtsConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub silence_threshold: u16,
    pub silence_duration_secs: f64,
    pub history_limit: usize,
    pub persona_prompt: String,
    pub persona_ack: String,
    /// Empty string disables the announcement
    pub startup_message: String,
    pub unheard_message: String,
    pub rate_limit_reply: String,
    pub wake_cue: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            silence_duration_secs: DEFAULT_SILENCE_DURATION_SECS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            persona_prompt: DEFAULT_PERSONA_PROMPT.to_string(),
            persona_ack: DEFAULT_PERSONA_ACK.to_string(),
            startup_message: DEFAULT_STARTUP_MESSAGE.to_string(),
            unheard_message: DEFAULT_UNHEARD_MESSAGE.to_string(),
            rate_limit_reply: DEFAULT_RATE_LIMIT_REPLY.to_string(),
            wake_cue: true,
        }
    }
}

/// Wake beep
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CueConfig {
    pub frequency_hz: f32,
    pub duration_secs: f32,
    pub amplitude: f32,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 150.0,
            duration_secs: 0.3,
            amplitude: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WakeEngine {
    Porcupine,
    Energy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    pub engine: WakeEngine,
    /// Picovoice access key
    pub access_key: Option<String>,
    /// Keyword model files (`.ppn`)
    pub keyword_paths: Vec<PathBuf>,
    pub sensitivity: f32,
    /// Normalized RMS the energy gate treats as speech
    pub energy_level: f32,
    /// Consecutive loud frames before the energy gate fires
    pub energy_frames: usize,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            engine: WakeEngine::Porcupine,
            access_key: None,
            keyword_paths: Vec::new(),
            sensitivity: 0.5,
            energy_level: 0.08,
            energy_frames: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SttProviderKind {
    #[default]
    ElevenLabs,
    Whisper,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    pub provider: SttProviderKind,
    pub api_key: Option<String>,
    /// Provider default when unset
    pub model: Option<String>,
    /// Provider default when unset
    pub language: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model: String,
    pub sample_rate: u32,
    pub base_url: Option<String>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: "NOpBlnGInO9m6vDvFkFC".to_string(),
            model: "eleven_turbo_v2_5".to_string(),
            sample_rate: 24000,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// Attach the Google search tool
    pub grounding: bool,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash-lite".to_string(),
            grounding: true,
            base_url: None,
        }
    }
}

impl Config {
    /// Load from `path` (extension optional, file optional) and the environment
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("wake.keyword_paths"),
            )
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        config.fill_credentials(|name| std::env::var(name).ok());
        config.expand_paths();
        Ok(config)
    }

    /// Fill unset API keys from vendor variables
    pub fn fill_credentials(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn fill(slot: &mut Option<String>, value: Option<String>) {
            if slot.as_deref().map_or(true, str::is_empty) {
                if let Some(value) = value.filter(|v| !v.is_empty()) {
                    *slot = Some(value);
                }
            }
        }

        fill(&mut self.wake.access_key, lookup("PICOVOICE_ACCESS_KEY"));
        let stt_var = match self.stt.provider {
            SttProviderKind::ElevenLabs => "ELEVENLABS_API_KEY",
            SttProviderKind::Whisper => "OPENAI_API_KEY",
        };
        fill(&mut self.stt.api_key, lookup(stt_var));
        fill(&mut self.tts.api_key, lookup("ELEVENLABS_API_KEY"));
        fill(&mut self.llm.api_key, lookup("GEMINI_API_KEY"));
    }

    fn expand_paths(&mut self) {
        for path in &mut self.wake.keyword_paths {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            *path = PathBuf::from(expanded);
        }
    }

    /// Session settings for a gate running at `sample_rate` / `frame_length`
    pub fn session_config(&self, sample_rate: u32, frame_length: usize) -> SessionConfig {
        let s = &self.session;
        SessionConfig {
            frame_length,
            sample_rate,
            silence_threshold: s.silence_threshold,
            silence_duration_secs: s.silence_duration_secs,
            history_limit: s.history_limit,
            persona_prompt: s.persona_prompt.clone(),
            persona_ack: s.persona_ack.clone(),
            startup_message: Some(s.startup_message.clone()).filter(|m| !m.trim().is_empty()),
            unheard_message: s.unheard_message.clone(),
            rate_limit_reply: s.rate_limit_reply.clone(),
            wake_cue: s.wake_cue,
        }
    }
}
