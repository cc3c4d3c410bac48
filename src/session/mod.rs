//! Voice session orchestration
//!
//! This module provides the `VoiceSession` state machine that ties together:
//! - Frame capture and wake word gating
//! - Silence-terminated recording
//! - Transcription, reply generation and speech
//! - Bounded dialogue history and session statistics

pub mod config;
mod session;
mod state;
mod stats;

pub use config::SessionConfig;
pub use session::{shutdown_signal, SessionProviders, VoiceSession};
pub use state::SessionState;
pub use stats::SessionStats;
