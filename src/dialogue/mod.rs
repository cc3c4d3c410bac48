pub mod history;

pub use history::{ChatTurn, DialogueHistory, Role, SEED_LEN};
