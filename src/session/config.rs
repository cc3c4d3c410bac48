use serde::{Deserialize, Serialize};

use crate::audio::silence_frame_threshold;
use crate::dialogue::SEED_LEN;
use crate::{Error, Result};

pub const DEFAULT_SILENCE_THRESHOLD: u16 = 500;
pub const DEFAULT_SILENCE_DURATION_SECS: f64 = 1.0;
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

pub const DEFAULT_PERSONA_PROMPT: &str = "You are a helpful voice assistant named Gerald. \
You have the persona of a disgruntled cowboy from the American South during the Civil War Era. \
Keep responses under 100 words, shorter is better. \
Do not format any text, such as with bold, italics, or lists. \
Format responses to be easily input into a text-to-speech model. \
Your location is 26 Park Street, Bristol, United Kingdom.";
pub const DEFAULT_PERSONA_ACK: &str = "Understood! I'll be helpful, direct and concise.";
pub const DEFAULT_STARTUP_MESSAGE: &str = "Gerald is online.";
pub const DEFAULT_UNHEARD_MESSAGE: &str = "Sorry, I couldn't hear you.";
pub const DEFAULT_RATE_LIMIT_REPLY: &str = "Rate limit hit. Please try again later.";

/// Immutable settings for one voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Samples per frame (dictated by the wake gate)
    pub frame_length: usize,

    /// Capture sample rate (dictated by the wake gate)
    pub sample_rate: u32,

    /// Peak amplitude below which a frame is silent
    pub silence_threshold: u16,

    /// Sustained silence that ends a recording
    pub silence_duration_secs: f64,

    /// Maximum number of turns kept in the dialogue history, seed included
    pub history_limit: usize,

    /// Persona priming instruction (first seed turn)
    pub persona_prompt: String,

    /// Persona acknowledgment (second seed turn)
    pub persona_ack: String,

    /// Spoken once before listening starts
    pub startup_message: Option<String>,

    /// Spoken when the transcript comes back empty
    pub unheard_message: String,

    /// Reply spoken and recorded when the language model is rate limited
    pub rate_limit_reply: String,

    /// Play the audible cue on wake
    pub wake_cue: bool,
}

impl SessionConfig {
    /// Defaults for a gate running at `sample_rate` with `frame_length` frames
    pub fn new(sample_rate: u32, frame_length: usize) -> Self {
        Self {
            frame_length,
            sample_rate,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample rate must be positive".to_string()));
        }
        if self.frame_length == 0 {
            return Err(Error::Config("frame length must be positive".to_string()));
        }
        if self.silence_duration_secs.is_nan() || self.silence_duration_secs <= 0.0 {
            return Err(Error::Config(format!(
                "silence duration must be positive, got {}",
                self.silence_duration_secs
            )));
        }
        if self.history_limit < SEED_LEN {
            return Err(Error::Config(format!(
                "history limit must be at least {SEED_LEN}, got {}",
                self.history_limit
            )));
        }
        Ok(())
    }

    /// Consecutive silent frames that end a recording
    pub fn silence_frame_threshold(&self) -> usize {
        silence_frame_threshold(self.silence_duration_secs, self.sample_rate, self.frame_length)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_length: 512,  // Porcupine frame length
            sample_rate: 16000, // Porcupine sample rate
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            silence_duration_secs: DEFAULT_SILENCE_DURATION_SECS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            persona_prompt: DEFAULT_PERSONA_PROMPT.to_string(),
            persona_ack: DEFAULT_PERSONA_ACK.to_string(),
            startup_message: Some(DEFAULT_STARTUP_MESSAGE.to_string()),
            unheard_message: DEFAULT_UNHEARD_MESSAGE.to_string(),
            rate_limit_reply: DEFAULT_RATE_LIMIT_REPLY.to_string(),
            wake_cue: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_is_31_frames() {
        let config = SessionConfig::default();
        assert_eq!(config.silence_frame_threshold(), 31);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SessionConfig::new(0, 512);
        assert!(config.validate().is_err());

        config = SessionConfig::new(16000, 0);
        assert!(config.validate().is_err());

        config = SessionConfig::default();
        config.silence_duration_secs = 0.0;
        assert!(config.validate().is_err());

        config.silence_duration_secs = f64::NAN;
        assert!(config.validate().is_err());

        config = SessionConfig::default();
        config.history_limit = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sub_frame_duration_is_allowed() {
        let mut config = SessionConfig::default();
        config.silence_duration_secs = 0.01;
        assert!(config.validate().is_ok());
        assert_eq!(config.silence_frame_threshold(), 0);
    }
}
