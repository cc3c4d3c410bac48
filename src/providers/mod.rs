//! Speech-to-text, language model and text-to-speech providers
//!
//! The session only sees the three traits below; the concrete clients are
//! picked once from configuration when the session is assembled.

pub mod elevenlabs;
pub mod gemini;
pub mod whisper;

pub use elevenlabs::{ElevenLabsStt, ElevenLabsTts};
pub use gemini::GeminiResponder;
pub use whisper::WhisperStt;

use std::time::Duration;

use crate::config::{LlmConfig, SttConfig, SttProviderKind, TtsConfig};
use crate::dialogue::ChatTurn;
use crate::{Error, Result};

/// Request timeout for provider calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Converts a finished utterance to text
#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe mono 16-bit samples
    ///
    /// An empty string means nothing intelligible was said. Ordinary
    /// service failures are reported that way too rather than as errors.
    async fn transcribe(&self, samples: &[i16], sample_rate: u32) -> Result<String>;

    fn name(&self) -> &str;
}

/// Produces the assistant's reply
#[async_trait::async_trait]
pub trait Responder: Send + Sync {
    /// Answer `prompt` given the prior turns
    ///
    /// `history` never contains `prompt`; the responder appends it in its own
    /// wire format. Rate limiting is reported as `Error::RateLimited`.
    async fn respond(&self, prompt: &str, history: &[ChatTurn]) -> Result<String>;

    fn name(&self) -> &str;
}

/// Speaks text on the output device
#[async_trait::async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Returns once playback has finished or failed
    async fn speak(&self, text: &str) -> Result<()>;

    fn name(&self) -> &str;
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

pub(crate) fn require_key(key: Option<&String>, what: &str) -> Result<String> {
    key.filter(|k| !k.is_empty())
        .cloned()
        .ok_or_else(|| Error::Config(format!("{what} API key required")))
}

/// Build the configured speech-to-text client
pub fn create_stt(config: &SttConfig) -> Result<Box<dyn SpeechToText>> {
    match config.provider {
        SttProviderKind::ElevenLabs => Ok(Box::new(ElevenLabsStt::from_config(config)?)),
        SttProviderKind::Whisper => Ok(Box::new(WhisperStt::from_config(config)?)),
    }
}

/// Build the configured language model client
pub fn create_responder(config: &LlmConfig) -> Result<Box<dyn Responder>> {
    Ok(Box::new(GeminiResponder::from_config(config)?))
}

/// Build the configured text-to-speech client
pub fn create_tts(config: &TtsConfig) -> Result<Box<dyn TextToSpeech>> {
    Ok(Box::new(ElevenLabsTts::from_config(config)?))
}

/// Local HTTP endpoint answering every request with one fixed response
#[cfg(test)]
pub(crate) mod canned {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Serve `status` with a JSON `body`; returns the base URL to point a client at
    pub async fn serve(status: u16, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{addr}")
    }

    /// Consume one request so the client never sees a reset mid-upload
    async fn read_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 8192];

        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            request.extend_from_slice(&chunk[..n]);

            let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&request[..head_end]).to_ascii_lowercase();
            let body = &request[head_end + 4..];

            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok());

            let complete = match content_length {
                Some(len) => body.len() >= len,
                None if head.contains("transfer-encoding: chunked") => body.ends_with(b"0\r\n\r\n"),
                None => true,
            };
            if complete {
                return;
            }
        }
    }
}
