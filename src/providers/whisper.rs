use super::{http_client, require_key, SpeechToText};
use crate::audio::encode_wav;
use crate::config::SttConfig;
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "whisper-1";

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// OpenAI Whisper transcription
pub struct WhisperStt {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: Option<String>,
    base_url: String,
}

impl WhisperStt {
    pub fn from_config(config: &SttConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: require_key(config.api_key.as_ref(), "OpenAI")?,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            language: config.language.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    async fn request(&self, wav: Vec<u8>) -> Result<String> {
        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        Ok(result.text)
    }
}

#[async_trait::async_trait]
impl SpeechToText for WhisperStt {
    async fn transcribe(&self, samples: &[i16], sample_rate: u32) -> Result<String> {
        let wav = encode_wav(samples, sample_rate)?;
        tracing::debug!(audio_bytes = wav.len(), "starting Whisper transcription");

        match self.request(wav).await {
            Ok(text) => {
                tracing::info!(transcript = %text, "transcription complete");
                Ok(text)
            }
            Err(e) => {
                tracing::error!(error = %e, "Whisper transcription failed");
                Ok(String::new())
            }
        }
    }

    fn name(&self) -> &str {
        "whisper"
    }
}
