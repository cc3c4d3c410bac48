//! ElevenLabs speech-to-text and streaming text-to-speech

use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{http_client, require_key, SpeechToText, TextToSpeech};
use crate::audio::{encode_wav, PlaybackStream};
use crate::config::{SttConfig, TtsConfig};
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_STT_MODEL: &str = "scribe_v2";
pub const DEFAULT_STT_LANGUAGE: &str = "eng";

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Scribe transcription
pub struct ElevenLabsStt {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: String,
    base_url: String,
}

impl ElevenLabsStt {
    pub fn from_config(config: &SttConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: require_key(config.api_key.as_ref(), "ElevenLabs")?,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
            language: config
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_STT_LANGUAGE.to_string()),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    async fn request(&self, wav: Vec<u8>) -> Result<String> {
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("utterance.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model_id", self.model.clone())
            .text("language_code", self.language.clone());

        let response = self
            .client
            .post(format!("{}/v1/speech-to-text", self.base_url))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("ElevenLabs STT error {status}: {body}")));
        }

        let result: TranscriptionResponse = response.json().await?;
        Ok(result.text)
    }
}

#[async_trait::async_trait]
impl SpeechToText for ElevenLabsStt {
    async fn transcribe(&self, samples: &[i16], sample_rate: u32) -> Result<String> {
        let wav = encode_wav(samples, sample_rate)?;
        tracing::debug!(audio_bytes = wav.len(), "starting ElevenLabs transcription");

        match self.request(wav).await {
            Ok(text) => {
                tracing::info!(transcript = %text, "transcription complete");
                Ok(text)
            }
            Err(e) => {
                tracing::error!(error = %e, "ElevenLabs transcription failed");
                Ok(String::new())
            }
        }
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}

/// Reassembles little-endian i16 samples from arbitrarily split byte chunks
#[derive(Debug, Default)]
pub struct PcmDecoder {
    carry: Option<u8>,
}

impl PcmDecoder {
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<i16> {
        let mut samples = Vec::with_capacity(bytes.len().div_ceil(2));
        let mut rest = bytes;

        if let Some(low) = self.carry.take() {
            match rest.split_first() {
                Some((&high, tail)) => {
                    samples.push(i16::from_le_bytes([low, high]));
                    rest = tail;
                }
                None => {
                    self.carry = Some(low);
                    return samples;
                }
            }
        }

        let mut pairs = rest.chunks_exact(2);
        samples.extend(pairs.by_ref().map(|pair| i16::from_le_bytes([pair[0], pair[1]])));
        self.carry = pairs.remainder().first().copied();

        samples
    }

    /// Whether a dangling byte is waiting for its partner
    pub fn has_partial(&self) -> bool {
        self.carry.is_some()
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// Streaming synthesis played straight to the output device
pub struct ElevenLabsTts {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
    model: String,
    sample_rate: u32,
    base_url: String,
}

impl ElevenLabsTts {
    pub fn from_config(config: &TtsConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: require_key(config.api_key.as_ref(), "ElevenLabs")?,
            voice_id: config.voice_id.clone(),
            model: config.model.clone(),
            sample_rate: config.sample_rate,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}/stream?output_format=pcm_{}",
            self.base_url, self.voice_id, self.sample_rate
        )
    }
}

#[async_trait::async_trait]
impl TextToSpeech for ElevenLabsTts {
    async fn speak(&self, text: &str) -> Result<()> {
        let request = SynthesisRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(self.stream_url())
            .header("xi-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let playback = PlaybackStream::open(self.sample_rate)?;
        let mut decoder = PcmDecoder::default();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| Error::Tts(e.to_string()))?;
            playback.write(&decoder.decode(&chunk));
        }

        if decoder.has_partial() {
            tracing::warn!("TTS stream ended on an odd byte");
        }

        playback.finish().await
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}
