//! Conversation state and the loop that drives it

pub mod chat_loop;
pub mod goodbye;
pub mod params;
pub mod transcript;

pub use chat_loop::{
    Reply, Session, SessionOptions, SessionOutcome, SessionState, Step, Turn, DEFAULT_GREETING,
};
pub use goodbye::{GoodbyeMatcher, GoodbyeRule, DEFAULT_EXIT_PHRASE};
pub use params::{SessionParams, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
pub use transcript::Transcript;
