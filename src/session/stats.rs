use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters for one voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identifier (also the tracing span id)
    pub session_id: String,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Wake word detections
    pub wake_detections: usize,

    /// Completed exchanges recorded into the history
    pub exchanges: usize,

    /// Recordings that came back with no audio
    pub empty_captures: usize,

    /// Transcripts that came back blank
    pub unheard_prompts: usize,

    /// Exchanges answered with the rate limit reply
    pub rate_limited_replies: usize,
}

impl SessionStats {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            started_at: Utc::now(),
            wake_detections: 0,
            exchanges: 0,
            empty_captures: 0,
            unheard_prompts: 0,
            rate_limited_replies: 0,
        }
    }

    /// Seconds since the session started
    pub fn duration_secs(&self) -> f64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds() as f64
            / 1000.0
    }
}
