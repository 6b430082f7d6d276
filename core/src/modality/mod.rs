//! Input/output channels for a session
//!
//! The session loop talks to the user only through [`Modality`], so the
//! console and speech variants are interchangeable.

pub mod audio;
pub mod console;
pub mod speech;

pub use audio::{AlsaDevice, AudioDevice};
pub use console::ConsoleModality;
pub use speech::{AzureSpeechClient, SpeechModality, SpeechService, VoiceSettings};

use crate::error::ModalityError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Capability set the session loop depends on
#[async_trait]
pub trait Modality: Send {
    /// Wait for the next unit of user input; may be empty
    async fn listen(&mut self) -> Result<String, ModalityError>;

    /// Whether the most recent input was the exit phrase
    fn is_goodbye(&self) -> bool;

    /// Present a reply to the user
    async fn respond(&mut self, text: &str) -> Result<(), ModalityError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<M: Modality + ?Sized> Modality for Box<M> {
    async fn listen(&mut self) -> Result<String, ModalityError> {
        (**self).listen().await
    }

    fn is_goodbye(&self) -> bool {
        (**self).is_goodbye()
    }

    async fn respond(&mut self, text: &str) -> Result<(), ModalityError> {
        (**self).respond(text).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Which modality a session uses
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModalityKind {
    /// Typed input and printed replies
    #[default]
    Console,
    /// Microphone input and spoken replies
    Speech,
}

impl std::str::FromStr for ModalityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "console" | "text" => Ok(ModalityKind::Console),
            "speech" | "voice" => Ok(ModalityKind::Speech),
            _ => Err(format!("Unknown modality: {}", s)),
        }
    }
}

impl std::fmt::Display for ModalityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModalityKind::Console => write!(f, "console"),
            ModalityKind::Speech => write!(f, "speech"),
        }
    }
}
