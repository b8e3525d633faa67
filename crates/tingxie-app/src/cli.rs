//! CLI argument definitions for the Tingxie application.
//!
//! Uses `clap` with derive macros. Priority resolution:
//! CLI args > env vars > config file > defaults.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tingxie_core::TingxieConfig;

const DEFAULT_PORT: u16 = 3001;

/// Tingxie - a vocabulary dictation trainer.
#[derive(Parser, Debug)]
#[command(name = "tingxie", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for preferences.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the dictation page, the page transport and the translation proxy.
    Serve(ServeArgs),
    /// Run a dictation session in the terminal.
    Practice(PracticeArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Port to listen on.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Address to bind.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Word list file, one word per line.
    #[arg(short = 'w', long = "words")]
    pub words: Option<PathBuf>,

    /// Static asset directory.
    #[arg(long = "public")]
    pub public_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PracticeArgs {
    /// Page transport endpoint of a running server, e.g. ws://127.0.0.1:3001/ws.
    /// Without it the word list is read locally.
    #[arg(short = 's', long = "server")]
    pub server: Option<String>,

    /// Word list file for local sessions.
    #[arg(short = 'w', long = "words")]
    pub words: Option<PathBuf>,

    /// Page to open first.
    #[arg(long = "page", default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,

    /// Words per page.
    #[arg(long = "page-size")]
    pub page_size: Option<u32>,

    /// Seconds spent on each word's repetitions.
    #[arg(long = "interval", allow_negative_numbers = true)]
    pub interval: Option<i64>,

    /// How many times each word is spoken.
    #[arg(long = "times", allow_negative_numbers = true)]
    pub times: Option<i64>,

    /// Speech synthesizer command (espeak-ng, espeak, say).
    #[arg(long = "speech-command")]
    pub speech_command: Option<String>,
}

impl CliArgs {
    /// The selected subcommand. `serve` when none is given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Serve(ServeArgs::default()))
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > TINGXIE_CONFIG env var > ~/.tingxie/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TINGXIE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply flag and env overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut TingxieConfig) {
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }

        match self.command() {
            Command::Serve(serve) => {
                let env_port = std::env::var("TINGXIE_PORT").ok();
                config.server.port =
                    resolve_port(serve.port, env_port.as_deref(), config.server.port);
                if let Some(host) = serve.host {
                    config.server.host = host;
                }
                if let Some(words) = serve.words {
                    config.server.word_list = words.to_string_lossy().to_string();
                }
                if let Some(public) = serve.public_dir {
                    config.server.public_dir = public.to_string_lossy().to_string();
                }
            }
            Command::Practice(practice) => {
                if let Some(words) = practice.words {
                    config.server.word_list = words.to_string_lossy().to_string();
                }
                if let Some(size) = practice.page_size {
                    config.server.default_page_size = size;
                }
                if let Some(secs) = practice.interval {
                    config.playback.total_interval_secs = secs.max(0) as u64;
                }
                if let Some(times) = practice.times {
                    config.playback.repeat_count = times.clamp(1, u32::MAX as i64) as u32;
                }
                if let Some(command) = practice.speech_command {
                    config.speech.command = command;
                    config.speech.args.clear();
                }
            }
        }
    }
}

/// Priority: --port flag > TINGXIE_PORT env var > config file value > 3001.
pub fn resolve_port(flag: Option<u16>, env: Option<&str>, config_port: u16) -> u16 {
    if let Some(p) = flag {
        return p;
    }
    if let Some(p) = env.and_then(|v| v.trim().parse::<u16>().ok()) {
        return p;
    }
    if config_port != 0 {
        return config_port;
    }
    DEFAULT_PORT
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".tingxie").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".tingxie").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_no_subcommand_defaults_to_serve() {
        let args = parse(&["tingxie"]);
        assert!(matches!(args.command(), Command::Serve(_)));
    }

    #[test]
    fn test_config_flag_wins() {
        let args = parse(&["tingxie", "--config", "/tmp/custom.toml", "serve"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["tingxie", "practice", "-l", "debug", "-d", "/tmp/tx"]);
        let mut config = TingxieConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.data_dir, "/tmp/tx");
    }

    #[test]
    fn test_resolve_port_priority() {
        assert_eq!(resolve_port(Some(4000), Some("5000"), 6000), 4000);
        assert_eq!(resolve_port(None, Some("5000"), 6000), 5000);
        assert_eq!(resolve_port(None, Some("not-a-port"), 6000), 6000);
        assert_eq!(resolve_port(None, None, 6000), 6000);
        assert_eq!(resolve_port(None, None, 0), DEFAULT_PORT);
    }

    #[test]
    fn test_serve_overrides() {
        let args = parse(&[
            "tingxie", "serve", "--port", "8080", "--host", "0.0.0.0", "--words", "/srv/words.txt",
        ]);
        let mut config = TingxieConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.word_list, "/srv/words.txt");
    }

    #[test]
    fn test_practice_overrides_clamp_playback() {
        let args = parse(&[
            "tingxie", "practice", "--interval", "-3", "--times", "0", "--page-size", "10",
            "--page", "-1", "--speech-command", "say",
        ]);
        let mut config = TingxieConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.playback.total_interval_secs, 0);
        assert_eq!(config.playback.repeat_count, 1);
        assert_eq!(config.server.default_page_size, 10);
        assert_eq!(config.speech.command, "say");
        assert!(config.speech.args.is_empty());
        match args.command() {
            Command::Practice(p) => assert_eq!(p.page, -1),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_practice_server_flag() {
        let args = parse(&["tingxie", "practice", "--server", "ws://127.0.0.1:3001/ws"]);
        match args.command() {
            Command::Practice(p) => {
                assert_eq!(p.server.as_deref(), Some("ws://127.0.0.1:3001/ws"));
                assert_eq!(p.page, 1);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
