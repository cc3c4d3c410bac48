// Integration tests for dialogue history windowing
//
// Exercise many limits and exchange counts and check that the seed pair is
// pinned, the length never exceeds the limit, and the retained tail is
// exactly the most recent turns in order.

use anyhow::Result;
use gerald::{ChatTurn, DialogueHistory, Role};

fn all_turns(exchanges: usize) -> Vec<ChatTurn> {
    (0..exchanges)
        .flat_map(|i| [ChatTurn::user(format!("q{i}")), ChatTurn::assistant(format!("a{i}"))])
        .collect()
}

#[test]
fn test_window_invariants_hold_for_every_limit() -> Result<()> {
    for limit in 2..=24 {
        let mut history = DialogueHistory::new("prime", "ack", limit)?;
        history.seed();
        let seed = history.context().to_vec();

        for exchanges in 1..=20 {
            history.record(format!("q{}", exchanges - 1), format!("a{}", exchanges - 1));
            let turns = history.context();

            assert!(turns.len() <= limit, "limit {limit}: {} turns", turns.len());
            assert_eq!(&turns[..2], &seed[..], "limit {limit}: seed moved");

            let recorded = all_turns(exchanges);
            let expected_tail = recorded.len().min(limit - 2);
            assert_eq!(turns.len(), 2 + expected_tail);
            assert_eq!(
                &turns[2..],
                &recorded[recorded.len() - expected_tail..],
                "limit {limit}, after {exchanges} exchanges"
            );
        }
    }

    Ok(())
}

#[test]
fn test_twenty_turn_window_after_eleven_exchanges() -> Result<()> {
    let mut history = DialogueHistory::new("prime", "ack", 20)?;
    history.seed();
    for i in 0..11 {
        history.record(format!("q{i}"), format!("a{i}"));
    }

    let turns = history.context();
    assert_eq!(turns.len(), 20);
    assert_eq!(turns[0], ChatTurn::user("prime"));
    assert_eq!(turns[1], ChatTurn::assistant("ack"));
    assert_eq!(&turns[2..], &all_turns(11)[4..]);

    Ok(())
}

#[test]
fn test_roles_alternate_after_trim() -> Result<()> {
    let mut history = DialogueHistory::new("prime", "ack", 10)?;
    history.seed();
    for i in 0..30 {
        history.record(format!("q{i}"), format!("a{i}"));
    }

    for (i, turn) in history.context().iter().enumerate() {
        let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
        assert_eq!(turn.role, expected, "turn {i}");
    }

    Ok(())
}

#[test]
fn test_context_wire_format() -> Result<()> {
    let mut history = DialogueHistory::new("prime", "ack", 20)?;
    history.seed();
    history.record("hello", "howdy");

    let json = serde_json::to_value(history.context())?;
    assert_eq!(
        json,
        serde_json::json!([
            { "role": "user", "text": "prime" },
            { "role": "assistant", "text": "ack" },
            { "role": "user", "text": "hello" },
            { "role": "assistant", "text": "howdy" }
        ])
    );

    Ok(())
}
