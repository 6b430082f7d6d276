//! CLI argument parsing using clap 4.x derive macros

use clap::{Parser, Subcommand};
use consolegpt_core::modality::ModalityKind;
use std::path::PathBuf;

/// Chat with an OpenAI-compatible model from the console
///
/// Type a question and press Enter, or run with `--modality speech` to talk
/// through the microphone. Say "goodbye" to end the session.
#[derive(Parser, Debug)]
#[command(name = "consolegpt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// The command to execute (defaults to chat)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (default: ./consolegpt.toml or ~/.config/consolegpt/consolegpt.toml)
    #[arg(short = 'c', long = "config", id = "config_path", global = true)]
    pub config: Option<PathBuf>,

    /// Chat model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Input/output channel: console or speech
    #[arg(long, value_parser = parse_modality)]
    pub modality: Option<ModalityKind>,

    /// Disable colours in the chat history
    #[arg(long)]
    pub plain: bool,

    /// Print version information
    #[arg(long)]
    pub version: bool,
}

fn parse_modality(s: &str) -> Result<ModalityKind, String> {
    s.parse()
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the resolved configuration with secrets masked
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the configuration file path in use
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_chat_overrides() {
        let cli = Cli::parse_from(["consolegpt", "--modality", "speech", "-m", "gpt-4o", "--plain"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.modality, Some(ModalityKind::Speech));
        assert_eq!(cli.model.as_deref(), Some("gpt-4o"));
        assert!(cli.plain);
    }

    #[test]
    fn test_parse_config_commands() {
        let cli = Cli::parse_from(["consolegpt", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config { cmd: ConfigCommand::Init { force: true } })
        ));

        let cli = Cli::parse_from(["consolegpt", "-c", "/tmp/c.toml", "config", "show"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_unknown_modality_rejected() {
        assert!(Cli::try_parse_from(["consolegpt", "--modality", "telepathy"]).is_err());
    }
}
