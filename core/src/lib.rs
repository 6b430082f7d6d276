pub mod logger;
pub mod config;
pub mod error;
pub mod llm;
pub mod modality;
pub mod output;
pub mod session;
pub mod util;

// Re-exports for convenience
pub use config::Config;
pub use error::{ModalityError, ProviderError, SessionError};
pub use llm::{ChatCompletion, LlmClient};
pub use modality::Modality;
pub use session::{Session, SessionOptions, SessionOutcome};
