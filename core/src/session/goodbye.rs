//! Exit phrase detection

use serde::{Deserialize, Serialize};

/// Default phrase that ends a session
pub const DEFAULT_EXIT_PHRASE: &str = "goodbye";

/// How input is compared against the exit phrase
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoodbyeRule {
    /// Input starts with the phrase as a whole word ("Goodbye, thanks")
    #[default]
    LeadingToken,
    /// Input is exactly the phrase ("goodbye")
    Exact,
}

/// Case-insensitive exit phrase matcher
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoodbyeMatcher {
    phrase: String,
    rule: GoodbyeRule,
}

impl Default for GoodbyeMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EXIT_PHRASE, GoodbyeRule::default())
    }
}

impl GoodbyeMatcher {
    pub fn new(phrase: impl Into<String>, rule: GoodbyeRule) -> Self {
        Self {
            phrase: phrase.into().trim().to_lowercase(),
            rule,
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn rule(&self) -> GoodbyeRule {
        self.rule
    }

    /// Whether `input` asks to end the session
    pub fn is_goodbye(&self, input: &str) -> bool {
        if self.phrase.is_empty() {
            return false;
        }

        let input = input.trim().to_lowercase();
        match self.rule {
            GoodbyeRule::Exact => input == self.phrase,
            GoodbyeRule::LeadingToken => match input.strip_prefix(self.phrase.as_str()) {
                Some(rest) => rest.chars().next().map_or(true, |c| !c.is_alphanumeric()),
                None => false,
            },
        }
    }
}
