//! Output formatting module
//!
//! Renders the chat transcript with one colored line per message. Styling is
//! forced on or off per formatter, so the same transcript always renders to
//! the same bytes regardless of terminal detection.

use crate::llm::{ChatMessage, MessageRole};
use crate::session::Transcript;
use console::Style;

/// One rendered transcript line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledLine {
    pub role: MessageRole,
    pub text: String,
}

impl std::fmt::Display for StyledLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Transcript formatter for the chat history printed on exit
#[derive(Debug, Clone)]
pub struct TranscriptFormatter {
    blue: Style,
    yellow: Style,
    green: Style,
    bold: Style,
    styled: bool,
}

impl Default for TranscriptFormatter {
    fn default() -> Self {
        Self::styled()
    }
}

impl TranscriptFormatter {
    fn with_styling(styled: bool) -> Self {
        Self {
            blue: Style::new().blue().force_styling(styled),
            yellow: Style::new().yellow().force_styling(styled),
            green: Style::new().green().force_styling(styled),
            bold: Style::new().bold().force_styling(styled),
            styled,
        }
    }

    /// Always emit ANSI colours
    pub fn styled() -> Self {
        Self::with_styling(true)
    }

    /// Never emit ANSI colours
    pub fn plain() -> Self {
        Self::with_styling(false)
    }

    /// Colours only when stdout is a terminal that supports them
    pub fn for_terminal() -> Self {
        Self::with_styling(console::colors_enabled())
    }

    pub fn is_styled(&self) -> bool {
        self.styled
    }

    /// Fixed-width label so message bodies line up
    pub fn role_label(role: MessageRole) -> &'static str {
        match role {
            MessageRole::System => "System:    ",
            MessageRole::User => "User:      ",
            MessageRole::Assistant => "Assistant: ",
        }
    }

    fn style_for(&self, role: MessageRole) -> &Style {
        match role {
            MessageRole::System => &self.blue,
            MessageRole::User => &self.yellow,
            MessageRole::Assistant => &self.green,
        }
    }

    pub fn format_line(&self, message: &ChatMessage) -> StyledLine {
        let line = format!("{}{}", Self::role_label(message.role), message.content);
        StyledLine {
            role: message.role,
            text: self.style_for(message.role).apply_to(line).to_string(),
        }
    }

    /// Full chat history block, one line per message
    pub fn render(&self, transcript: &Transcript) -> String {
        let mut out = String::new();
        out.push('\n');
        out.push_str(&self.bold.apply_to("Chat history:").to_string());
        out.push_str("\n\n");
        for message in transcript.messages() {
            out.push_str(&self.format_line(message).text);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Transcript {
        let mut transcript = Transcript::new("You are a helpful assistant.");
        transcript.push_user("Hello");
        transcript.push_assistant("Hi! How can I help?");
        transcript
    }

    #[test]
    fn test_plain_render() {
        let rendered = TranscriptFormatter::plain().render(&transcript());
        assert_eq!(
            rendered,
            "\nChat history:\n\n\
             System:    You are a helpful assistant.\n\
             User:      Hello\n\
             Assistant: Hi! How can I help?\n"
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let transcript = transcript();
        let formatter = TranscriptFormatter::styled();
        assert_eq!(formatter.render(&transcript), formatter.render(&transcript));
    }

    #[test]
    fn test_styled_lines_carry_role_colours() {
        let formatter = TranscriptFormatter::styled();
        let line = formatter.format_line(&ChatMessage::user("Hello"));
        assert_eq!(line.role, MessageRole::User);
        assert!(line.text.contains("\u{1b}["));
        assert!(console::strip_ansi_codes(&line.text).contains("User:      Hello"));

        let system = formatter.format_line(&ChatMessage::system("sys"));
        let assistant = formatter.format_line(&ChatMessage::assistant("hi"));
        assert_ne!(
            system.text.split("System").next(),
            assistant.text.split("Assistant").next()
        );
    }

    #[test]
    fn test_labels_have_equal_width() {
        let widths: Vec<usize> = [MessageRole::System, MessageRole::User, MessageRole::Assistant]
            .into_iter()
            .map(|r| TranscriptFormatter::role_label(r).len())
            .collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
    }
}
