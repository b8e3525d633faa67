//! Tingxie application entry point.
//!
//! `tingxie serve` hosts the dictation page, the page transport channel and
//! the translation proxy. `tingxie practice` runs a dictation session in the
//! terminal, either against a running server or a local word list.

mod cli;
mod practice;
mod prefs;
mod remote;
mod tts;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tingxie_api::{start_server, AppState, HttpDictionary};
use tingxie_core::{TingxieConfig, WordBook};

use cli::{CliArgs, Command};

async fn serve(config: TingxieConfig) -> Result<(), Box<dyn std::error::Error>> {
    let book = WordBook::load_or_empty(Path::new(&config.server.word_list));
    tracing::info!(
        path = %config.server.word_list,
        words = book.len(),
        "Word list loaded"
    );

    let dictionary = HttpDictionary::new(&config.dictionary)?;
    let state = AppState::new(config.clone(), book, Arc::new(dictionary));

    tokio::select! {
        result = start_server(&config, state) => {
            if let Err(ref e) = result {
                tracing::error!(error = %e, "Server stopped");
                tracing::error!(
                    "Try: TINGXIE_PORT={} tingxie serve",
                    config.server.port.wrapping_add(1)
                );
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = TingxieConfig::load_or_default(&config_file);
    args.apply_overrides(&mut config);

    // Logs go to stderr so the practice session owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Tingxie v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    match args.command() {
        Command::Serve(_) => serve(config).await,
        Command::Practice(practice_args) => practice::run(&config, &practice_args).await,
    }
}
