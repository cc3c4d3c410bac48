use std::fmt;

/// Where the session is in its listen/answer cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    WaitingForWake,
    Recording,
    Transcribing,
    Responding,
    Speaking,
    /// Cleanup has run; the session cannot be restarted
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WaitingForWake => "waiting_for_wake",
            Self::Recording => "recording",
            Self::Transcribing => "transcribing",
            Self::Responding => "responding",
            Self::Speaking => "speaking",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
