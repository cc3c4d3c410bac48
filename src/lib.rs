pub mod audio;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod providers;
pub mod session;
pub mod wake;

pub use audio::{AudioFrame, FrameSource, Utterance};
pub use config::Config;
pub use dialogue::{ChatTurn, DialogueHistory, Role};
pub use error::{Error, Result};
pub use session::{SessionConfig, SessionProviders, SessionState, SessionStats, VoiceSession};
pub use wake::WakeGate;
