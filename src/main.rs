//! `consolegpt` - chat with an OpenAI-compatible model from the console
//!
//! Runs one conversation per invocation, typed or spoken, and prints the
//! chat history when the user says goodbye.

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::Style;
use consolegpt_core::config::{find_config_file, Config};
use consolegpt_core::llm::LlmClient;
use consolegpt_core::modality::{
    AlsaDevice, AzureSpeechClient, ConsoleModality, Modality, ModalityKind, SpeechModality,
};
use consolegpt_core::output::TranscriptFormatter;
use consolegpt_core::session::{Session, SessionOptions, SessionOutcome};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Commands, ConfigCommand};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        let blue = Style::new().blue();
        println!(
            "{} v{} ({})",
            blue.apply_to("consolegpt"),
            env!("CARGO_PKG_VERSION"),
            env!("GIT_HASH")
        );
        return Ok(());
    }

    match &cli.command {
        Some(Commands::Config { cmd }) => handle_config(cmd, cli.config.as_deref()),
        Some(Commands::Chat) | None => {
            let config = load_config(&cli)?;
            run_chat(&cli, config).await
        }
    }
}

/// Config file in use: the explicit path, else the first one found
fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(find_config_file)
}

/// Load configuration and apply environment and command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };
    config.apply_env_overrides();

    if let Some(model) = &cli.model {
        config.openai.chat_model = model.clone();
    }
    if let Some(modality) = cli.modality {
        config.session.modality = modality;
    }

    config.validate()?;
    Ok(config)
}

fn handle_config(cmd: &ConfigCommand, explicit: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let mut config = match config_path(explicit) {
                Some(path) => Config::load_from(&path)
                    .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
                None => Config::default(),
            };
            config.apply_env_overrides();
            print!("{}", config.render_masked()?);
        }
        ConfigCommand::Init { force } => {
            let path = match explicit {
                Some(path) => path.to_path_buf(),
                None => Config::user_config_path()?,
            };
            if path.exists() && !force {
                bail!(
                    "{} already exists. Use --force to overwrite it.",
                    path.display()
                );
            }
            Config::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigCommand::Path => match config_path(explicit) {
            Some(path) => println!("{}", path.display()),
            None => println!("{} (not created)", Config::user_config_path()?.display()),
        },
    }
    Ok(())
}

fn build_modality(config: &Config, styled: bool) -> Result<Box<dyn Modality>> {
    let matcher = config.goodbye_matcher();
    let modality: Box<dyn Modality> = match config.session.modality {
        ModalityKind::Console => Box::new(ConsoleModality::stdio(matcher, styled)),
        ModalityKind::Speech => {
            let speech = &config.speech;
            let service = AzureSpeechClient::new(
                speech.region.as_deref().unwrap_or_default(),
                speech.key.as_deref().unwrap_or_default(),
                &speech.speech_recognition_language,
            )
            .context("Failed to set up the speech service")?;
            let device = AlsaDevice::new(
                speech.mic_device.clone(),
                speech.speaker_device.clone(),
                speech.record_secs,
            );
            Box::new(SpeechModality::new(
                service,
                device,
                config.voice_settings(),
                matcher,
            ))
        }
    };
    Ok(modality)
}

async fn run_chat(cli: &Cli, config: Config) -> Result<()> {
    if let Some(dir) = consolegpt_core::logger::default_log_dir() {
        consolegpt_core::logger::init(dir);
    }

    let cancel_token = CancellationToken::new();
    let client = LlmClient::new(config.llm_config()?)?;
    client.set_cancel_token(cancel_token.clone());

    let styled = !cli.plain && console::colors_enabled();
    let formatter = if styled {
        TranscriptFormatter::styled()
    } else {
        TranscriptFormatter::plain()
    };
    let modality = build_modality(&config, styled)?;

    let options = SessionOptions::default()
        .with_greeting(config.session.greeting.clone())
        .with_formatter(formatter)
        .with_cancel_token(cancel_token.clone());
    let mut session = Session::new(client, modality, config.session_params(), options);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_token.cancel();
        }
    });

    let outcome = session.run().await?;
    consolegpt_core::info_log!("Exiting: {:?}", outcome);

    if outcome == SessionOutcome::Cancelled {
        println!();
        // The blocking stdin reader cannot be interrupted; don't wait for it on shutdown
        std::process::exit(0);
    }
    Ok(())
}
