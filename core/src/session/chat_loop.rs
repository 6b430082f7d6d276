//! The conversation loop
//!
//! One [`Session::step`] waits for input, asks the completion client for a
//! reply and presents it. Provider failures become the reply instead of
//! ending the session.

use super::{SessionParams, Transcript};
use crate::error::{ModalityError, ProviderError, SessionError};
use crate::llm::ChatCompletion;
use crate::modality::Modality;
use crate::output::TranscriptFormatter;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Spoken or printed before the first turn
pub const DEFAULT_GREETING: &str = "Hello. Ask me a question or say goodbye to exit.";

/// Where the session loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Generating,
    Responding,
    Terminated,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The user said the exit phrase
    Goodbye,
    /// A shutdown signal arrived before the turn completed
    Cancelled,
    /// The input stream reached end-of-file
    InputClosed,
}

/// Reply produced for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Generated(String),
    /// Synthesized apology after the provider failed
    ProviderError(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Generated(text) | Reply::ProviderError(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::ProviderError(_))
    }
}

/// One completed input/reply cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub input: String,
    pub goodbye: bool,
    pub reply: Reply,
}

/// Result of a single [`Session::step`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Blank input was ignored
    Discarded,
    Turn(Turn),
    Finished(SessionOutcome),
}

/// Session behaviour that does not come from the generation parameters
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Emitted once before the first turn; empty disables it
    pub greeting: String,
    pub formatter: TranscriptFormatter,
    pub cancel_token: CancellationToken,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            formatter: TranscriptFormatter::for_terminal(),
            cancel_token: CancellationToken::new(),
        }
    }
}

impl SessionOptions {
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_formatter(mut self, formatter: TranscriptFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }
}

/// A single conversation between the user and the model
pub struct Session<C, M> {
    client: C,
    modality: M,
    params: SessionParams,
    options: SessionOptions,
    transcript: Transcript,
    state: SessionState,
    outcome: Option<SessionOutcome>,
    greeted: bool,
    sink: Box<dyn Write + Send>,
}

impl<C: ChatCompletion, M: Modality> Session<C, M> {
    pub fn new(client: C, modality: M, params: SessionParams, options: SessionOptions) -> Self {
        let transcript = Transcript::new(params.system_prompt.clone());
        Self {
            client,
            modality,
            params,
            options,
            transcript,
            state: SessionState::AwaitingInput,
            outcome: None,
            greeted: false,
            sink: Box::new(std::io::stdout()),
        }
    }

    /// Destination of the chat history printed on goodbye (stdout by default)
    pub fn with_sink(mut self, sink: Box<dyn Write + Send>) -> Self {
        self.sink = sink;
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Cancelling this token ends the session without completing the current turn
    pub fn cancel_token(&self) -> CancellationToken {
        self.options.cancel_token.clone()
    }

    /// Run until goodbye, cancellation or end of input
    pub async fn run(&mut self) -> Result<SessionOutcome, SessionError> {
        crate::info_log!(
            "Session started: modality={}, model={}",
            self.modality.name(),
            self.params.model
        );
        loop {
            if let Step::Finished(outcome) = self.step().await? {
                return Ok(outcome);
            }
        }
    }

    /// Advance the conversation by one input
    pub async fn step(&mut self) -> Result<Step, SessionError> {
        if let Some(outcome) = self.outcome {
            return Ok(Step::Finished(outcome));
        }

        if !self.greeted {
            self.greeted = true;
            if !self.options.greeting.trim().is_empty() {
                let greeting = self.options.greeting.clone();
                self.modality.respond(&greeting).await?;
            }
        }

        self.state = SessionState::AwaitingInput;
        let token = self.options.cancel_token.clone();
        if token.is_cancelled() {
            return Ok(self.finish(SessionOutcome::Cancelled));
        }

        let received = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.modality.listen() => Some(result),
        };
        let raw = match received {
            None => return Ok(self.finish(SessionOutcome::Cancelled)),
            Some(Err(ModalityError::InputClosed)) => {
                return Ok(self.finish(SessionOutcome::InputClosed))
            }
            Some(result) => result?,
        };

        let input = raw.trim();
        if input.is_empty() {
            crate::debug_log!("Discarded blank input");
            return Ok(Step::Discarded);
        }
        let input = input.to_string();

        self.state = SessionState::Generating;
        self.transcript.push_user(input.clone());
        let reply = match self
            .client
            .generate(self.transcript.messages(), &self.params)
            .await
        {
            Ok(text) => Reply::Generated(text),
            // Shutdown, not a provider failure: no reply for this input
            Err(ProviderError::Cancelled) => return Ok(self.finish(SessionOutcome::Cancelled)),
            Err(_) if token.is_cancelled() => return Ok(self.finish(SessionOutcome::Cancelled)),
            Err(e) => {
                crate::error_log!("{} request failed: {}", self.client.provider_name(), e);
                Reply::ProviderError(format!(
                    "{} returned an error ({}). Please try again.",
                    self.client.provider_name(),
                    e.message()
                ))
            }
        };
        self.transcript.push_assistant(reply.text());

        self.state = SessionState::Responding;
        self.modality.respond(reply.text()).await?;

        let goodbye = self.modality.is_goodbye();
        if goodbye {
            self.log_transcript()?;
            self.finish(SessionOutcome::Goodbye);
        } else {
            self.state = SessionState::AwaitingInput;
        }

        Ok(Step::Turn(Turn {
            input,
            goodbye,
            reply,
        }))
    }

    /// Write the chat history to the sink
    pub fn log_transcript(&mut self) -> Result<(), SessionError> {
        let rendered = self.options.formatter.render(&self.transcript);
        self.sink
            .write_all(rendered.as_bytes())
            .and_then(|_| self.sink.flush())
            .map_err(SessionError::Transcript)
    }

    fn finish(&mut self, outcome: SessionOutcome) -> Step {
        crate::info_log!(
            "Session finished: {:?} after {} turn(s)",
            outcome,
            self.transcript.user_turns()
        );
        self.state = SessionState::Terminated;
        self.outcome = Some(outcome);
        Step::Finished(outcome)
    }
}
