use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Who said a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One side of an exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Number of persona entries pinned at the head of the history
pub const SEED_LEN: usize = 2;

/// Bounded conversation log
///
/// Entries 0 and 1 are the persona seed (a user priming instruction and the
/// assistant's acknowledgment) and survive every trim. Once the log grows
/// past `limit`, the oldest turns after the seed are dropped so exactly
/// `limit` entries remain.
#[derive(Debug, Clone)]
pub struct DialogueHistory {
    persona_prompt: String,
    persona_ack: String,
    limit: usize,
    turns: Vec<ChatTurn>,
}

impl DialogueHistory {
    pub fn new(
        persona_prompt: impl Into<String>,
        persona_ack: impl Into<String>,
        limit: usize,
    ) -> Result<Self> {
        if limit < SEED_LEN {
            return Err(Error::Config(format!(
                "history limit must be at least {SEED_LEN}, got {limit}"
            )));
        }

        Ok(Self {
            persona_prompt: persona_prompt.into(),
            persona_ack: persona_ack.into(),
            limit,
            turns: Vec::new(),
        })
    }

    /// Install the persona pair, discarding anything recorded before
    pub fn seed(&mut self) {
        self.turns.clear();
        self.turns.push(ChatTurn::user(self.persona_prompt.clone()));
        self.turns.push(ChatTurn::assistant(self.persona_ack.clone()));
    }

    /// Turns to hand to the responder, without the prompt being answered
    pub fn context(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Append a finished exchange and trim
    pub fn record(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>) {
        self.turns.push(ChatTurn::user(user_text));
        self.turns.push(ChatTurn::assistant(assistant_text));
        self.trim();
    }

    fn trim(&mut self) {
        let len = self.turns.len();
        if len <= self.limit {
            return;
        }

        let keep_recent = self.limit - SEED_LEN;
        self.turns.drain(SEED_LEN..len - keep_recent);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(limit: usize) -> DialogueHistory {
        let mut history = DialogueHistory::new("be a cowboy", "yeehaw", limit).unwrap();
        history.seed();
        history
    }

    #[test]
    fn test_seed_pair() {
        let history = seeded(20);
        assert_eq!(
            history.context(),
            &[ChatTurn::user("be a cowboy"), ChatTurn::assistant("yeehaw")]
        );
    }

    #[test]
    fn test_limit_below_seed_is_rejected() {
        assert!(DialogueHistory::new("p", "a", 1).is_err());
        assert!(DialogueHistory::new("p", "a", 2).is_ok());
    }

    #[test]
    fn test_eleven_exchanges_with_limit_twenty() {
        let mut history = seeded(20);
        for i in 0..11 {
            history.record(format!("q{i}"), format!("a{i}"));
        }

        let turns = history.context();
        assert_eq!(turns.len(), 20);
        assert_eq!(turns[0], ChatTurn::user("be a cowboy"));
        assert_eq!(turns[1], ChatTurn::assistant("yeehaw"));

        // The nine most recent exchanges: q2..q10
        for (n, i) in (2..11).enumerate() {
            assert_eq!(turns[2 + 2 * n], ChatTurn::user(format!("q{i}")));
            assert_eq!(turns[3 + 2 * n], ChatTurn::assistant(format!("a{i}")));
        }
    }

    #[test]
    fn test_no_trim_at_limit() {
        let mut history = seeded(6);
        history.record("q0", "a0");
        history.record("q1", "a1");
        assert_eq!(history.len(), 6);
        assert_eq!(history.context()[2], ChatTurn::user("q0"));
    }

    #[test]
    fn test_limit_of_two_keeps_only_seed() {
        let mut history = seeded(2);
        history.record("q0", "a0");
        assert_eq!(history.len(), 2);
        assert_eq!(history.context()[1], ChatTurn::assistant("yeehaw"));
    }

    #[test]
    fn test_odd_limit_keeps_latest_turns() {
        let mut history = seeded(5);
        history.record("q0", "a0");
        history.record("q1", "a1");

        let turns = history.context();
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[2], ChatTurn::assistant("a0"));
        assert_eq!(turns[3], ChatTurn::user("q1"));
        assert_eq!(turns[4], ChatTurn::assistant("a1"));
    }

    #[test]
    fn test_context_is_stable_between_records() {
        let mut history = seeded(20);
        history.record("q0", "a0");
        let first = history.context().to_vec();
        let second = history.context().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_turn_wire_format() {
        let json = serde_json::to_value(ChatTurn::assistant("howdy")).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "assistant", "text": "howdy" }));
    }
}
