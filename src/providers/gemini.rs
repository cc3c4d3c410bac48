//! Google Gemini `generateContent` responder
//!
//! History turns map onto Gemini `contents` (`assistant` becomes `model`),
//! the prompt is appended as the final user turn, and the system instruction
//! carries the current local time so the model can answer "what time is it".

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{http_client, require_key, Responder};
use crate::config::LlmConfig;
use crate::dialogue::{ChatTurn, Role};
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

const TIME_FORMAT: &str = "%A, %B %d, %Y at %I:%M %p";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn to_content(turn: &ChatTurn) -> Content {
    let role = match turn.role {
        Role::User => "user",
        Role::Assistant => "model",
    };
    Content {
        role: role.to_string(),
        parts: vec![Part {
            text: Some(turn.text.clone()),
        }],
    }
}

fn build_request(prompt: &str, history: &[ChatTurn], now: &str, grounding: bool) -> GenerateRequest {
    let mut contents: Vec<Content> = history.iter().map(to_content).collect();
    contents.push(to_content(&ChatTurn::user(prompt)));

    GenerateRequest {
        contents,
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: Some(format!("Current time: {now}")),
            }],
        },
        tools: if grounding {
            vec![Tool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        },
    }
}

/// Concatenated text parts of the first candidate
fn response_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    Some(text)
}

pub struct GeminiResponder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    grounding: bool,
    base_url: String,
}

impl GeminiResponder {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: require_key(config.api_key.as_ref(), "Gemini")?,
            model: config.model.clone(),
            grounding: config.grounding,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait::async_trait]
impl Responder for GeminiResponder {
    async fn respond(&self, prompt: &str, history: &[ChatTurn]) -> Result<String> {
        let now = chrono::Local::now().format(TIME_FORMAT).to_string();
        let request = build_request(prompt, history, &now, self.grounding);

        tracing::debug!(turns = request.contents.len(), model = %self.model, "requesting reply");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited("gemini".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("Gemini API error {status}: {body}")));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("invalid Gemini response: {e}")))?;

        match response_text(body) {
            Some(text) => Ok(text),
            None => {
                tracing::warn!("Gemini returned no candidates");
                Ok(String::new())
            }
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::canned;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let history = vec![ChatTurn::user("be a cowboy"), ChatTurn::assistant("yeehaw")];
        let request = build_request("what time is it", &history, "Monday", true);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "be a cowboy" }] },
                    { "role": "model", "parts": [{ "text": "yeehaw" }] },
                    { "role": "user", "parts": [{ "text": "what time is it" }] }
                ],
                "systemInstruction": { "parts": [{ "text": "Current time: Monday" }] },
                "tools": [{ "googleSearch": {} }]
            })
        );
    }

    #[test]
    fn test_history_is_not_mutated() {
        let history = vec![ChatTurn::user("p"), ChatTurn::assistant("a")];
        let before = history.clone();
        let _ = build_request("q", &history, "now", false);
        assert_eq!(history, before);
    }

    #[test]
    fn test_tools_omitted_without_grounding() {
        let request = build_request("q", &[], "now", false);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Well " }, { "text": "howdy." }] }
            }]
        }))
        .unwrap();
        assert_eq!(response_text(response).as_deref(), Some("Well howdy."));

        let empty: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response_text(empty), None);
    }

    #[test]
    fn test_endpoint() {
        let config = LlmConfig {
            api_key: Some("k".to_string()),
            base_url: Some("http://localhost:8080".to_string()),
            ..LlmConfig::default()
        };
        let responder = GeminiResponder::from_config(&config).unwrap();
        assert_eq!(
            responder.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }

    fn responder_at(base_url: String) -> GeminiResponder {
        let config = LlmConfig {
            api_key: Some("k".to_string()),
            base_url: Some(base_url),
            ..LlmConfig::default()
        };
        GeminiResponder::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_too_many_requests_is_rate_limited() {
        let base_url = canned::serve(429, r#"{"error":{"code":429}}"#).await;
        let result = responder_at(base_url).respond("hello", &[]).await;

        assert!(matches!(result, Err(Error::RateLimited(ref who)) if who == "gemini"));
        assert!(!result.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_server_error_is_fatal_provider_error() {
        let base_url = canned::serve(500, r#"{"error":"boom"}"#).await;
        let err = responder_at(base_url).respond("hello", &[]).await.unwrap_err();

        assert!(matches!(err, Error::Provider(ref msg) if msg.contains("500")));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_reply_without_candidates_is_empty() {
        let base_url = canned::serve(200, "{}").await;
        let reply = responder_at(base_url).respond("hello", &[]).await.unwrap();
        assert_eq!(reply, "");
    }

    #[tokio::test]
    async fn test_reply_text_from_server() {
        let base_url = canned::serve(
            200,
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Howdy, partner."}]}}]}"#,
        )
        .await;
        let reply = responder_at(base_url).respond("hello", &[]).await.unwrap();
        assert_eq!(reply, "Howdy, partner.");
    }
}
