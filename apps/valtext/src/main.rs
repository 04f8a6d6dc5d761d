//! ValText entry point.

mod app;
mod cli;
mod config;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use valtext_protocol::Language;

use crate::cli::{Cli, Command};
use crate::config::{Config, config_path};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting ValText");

    let config = Config::load()?.with_overrides(cli.text, cli.voice);
    let settings = config.settings();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let rt = tokio::runtime::Runtime::new()?;
            match rt.block_on(app::run(&settings)) {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(e) => {
                    tracing::error!(error = %e, "run failed");
                    eprintln!("Error: {e}");
                    if let Some(hint) = e.hint() {
                        eprintln!("{hint}");
                    }
                    Ok(ExitCode::from(e.exit_code()))
                }
            }
        }
        Command::Stage { role } => {
            let asset = app::stage(&settings, role.to_domain())?;
            println!(
                "Staged {} into {}",
                asset.language,
                settings.store.language_dir(asset.language).display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Languages => {
            for &language in Language::all() {
                let mut marks = Vec::new();
                if language == settings.text {
                    marks.push("text");
                }
                if language == settings.voice {
                    marks.push("voice");
                }
                let staged = if settings.store.asset(language).is_staged() {
                    "staged"
                } else {
                    "-"
                };
                println!(
                    "{:<12} {:<8} {:<8} {}",
                    language.name(),
                    language.locale(),
                    staged,
                    marks.join(", ")
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            println!("# {}", config_path()?.display());
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
