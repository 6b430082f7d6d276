//! Interactive text console modality

use super::Modality;
use crate::error::ModalityError;
use crate::session::GoodbyeMatcher;
use async_trait::async_trait;
use console::Style;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

/// Reads typed lines and prints replies
pub struct ConsoleModality<R, W> {
    reader: R,
    writer: W,
    matcher: GoodbyeMatcher,
    prompt: String,
    last_was_goodbye: bool,
}

impl ConsoleModality<BufReader<Stdin>, Stdout> {
    /// Console bound to the process stdin/stdout
    pub fn stdio(matcher: GoodbyeMatcher, styled: bool) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), matcher)
            .with_prompt(
                Style::new()
                    .green()
                    .bold()
                    .force_styling(styled)
                    .apply_to("> ")
                    .to_string(),
            )
    }
}

impl<R, W> ConsoleModality<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, matcher: GoodbyeMatcher) -> Self {
        Self {
            reader,
            writer,
            matcher,
            prompt: String::new(),
            last_was_goodbye: false,
        }
    }

    /// Text written before each read
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

#[async_trait]
impl<R, W> Modality for ConsoleModality<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn listen(&mut self) -> Result<String, ModalityError> {
        if !self.prompt.is_empty() {
            self.writer.write_all(self.prompt.as_bytes()).await?;
            self.writer.flush().await?;
        }

        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(ModalityError::InputClosed);
        }

        let line = line.trim_end_matches(['\r', '\n']).to_string();
        self.last_was_goodbye = self.matcher.is_goodbye(&line);
        Ok(line)
    }

    fn is_goodbye(&self) -> bool {
        self.last_was_goodbye
    }

    async fn respond(&mut self, text: &str) -> Result<(), ModalityError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console(input: &'static [u8]) -> ConsoleModality<&'static [u8], Vec<u8>> {
        ConsoleModality::new(input, Vec::new(), GoodbyeMatcher::default())
    }

    #[tokio::test]
    async fn test_listen_strips_line_endings() {
        let mut modality = console(b"Hello there\r\nsecond\n");
        assert_eq!(modality.listen().await.unwrap(), "Hello there");
        assert_eq!(modality.listen().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let mut modality = console(b"no newline");
        assert_eq!(modality.listen().await.unwrap(), "no newline");
        assert!(matches!(modality.listen().await, Err(ModalityError::InputClosed)));
    }

    #[tokio::test]
    async fn test_goodbye_flag_tracks_last_input() {
        let mut modality = console(b"Goodbye, thanks\nhello\n");
        modality.listen().await.unwrap();
        assert!(modality.is_goodbye());
        modality.listen().await.unwrap();
        assert!(!modality.is_goodbye());
    }

    #[tokio::test]
    async fn test_prompt_and_reply_are_written() {
        let mut modality = console(b"hi\n").with_prompt("> ");
        modality.listen().await.unwrap();
        modality.respond("Hello!").await.unwrap();
        assert_eq!(String::from_utf8_lossy(modality.writer()), "> Hello!\n\n");
    }

    #[tokio::test]
    async fn test_plain_stdio_prompt() {
        let modality = ConsoleModality::stdio(GoodbyeMatcher::default(), false);
        assert_eq!(modality.prompt, "> ");
    }
}
