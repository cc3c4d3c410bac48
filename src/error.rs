//! Error types for the voice assistant

use thiserror::Error;

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a voice session
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A single audio read/write failed; the stream is still usable
    #[error("audio error: {0}")]
    Audio(String),

    /// The audio stream is gone and cannot deliver more frames
    #[error("audio stream closed: {0}")]
    StreamClosed(String),

    /// Wake word engine error
    #[error("wake word error: {0}")]
    WakeWord(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// The language model provider refused the request because of a rate limit
    #[error("rate limited by {0}")]
    RateLimited(String),

    /// Any other language model provider failure
    #[error("provider error: {0}")]
    Provider(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// WAV encoding/decoding error
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error must end the session.
    ///
    /// Single-frame audio faults, rate limits and playback/transcription
    /// hiccups are absorbed by the session loop; everything else is fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Audio(_) | Self::RateLimited(_) | Self::Tts(_) | Self::WakeWord(_)
        )
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(!Error::Audio("overrun".into()).is_fatal());
        assert!(!Error::RateLimited("gemini".into()).is_fatal());
        assert!(!Error::Tts("device busy".into()).is_fatal());

        assert!(Error::StreamClosed("device unplugged".into()).is_fatal());
        assert!(Error::Provider("500".into()).is_fatal());
        assert!(Error::Config("missing key".into()).is_fatal());
    }
}
