use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TingxieError};
use crate::types::PlaybackConfig;
use crate::wordlist::DEFAULT_PAGE_SIZE;

/// Top-level configuration for Tingxie.
///
/// Loaded from `~/.tingxie/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TingxieConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub playback: PlaybackSettings,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub dictionary: DictionaryConfig,
}

impl TingxieConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TingxieConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TingxieError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory for client preferences.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.tingxie".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP / WebSocket server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path of the word list file served by the page provider.
    pub word_list: String,
    /// Directory of static assets served at the site root when present.
    pub public_dir: String,
    /// Page size used by `GET /` and by requests without a page size.
    pub default_page_size: u32,
    /// Maximum `/translate` requests per second.
    pub rate_limit_per_sec: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            word_list: "wordlist.txt".to_string(),
            public_dir: "public".to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            rate_limit_per_sec: 20,
        }
    }
}

/// Autoplay timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Seconds over which all repetitions of one word are spread.
    pub total_interval_secs: u64,
    /// How many times each word is spoken.
    pub repeat_count: u32,
    /// Pause between a graded answer and the next word.
    pub advance_delay_ms: u64,
    /// Pause between the last graded answer and the page summary.
    pub summary_delay_ms: u64,
    /// How long a page request may take before it is reported as failed.
    pub page_request_timeout_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            total_interval_secs: 6,
            repeat_count: 3,
            advance_delay_ms: 1_000,
            summary_delay_ms: 1_000,
            page_request_timeout_ms: 10_000,
        }
    }
}

impl PlaybackSettings {
    pub fn playback(&self) -> PlaybackConfig {
        PlaybackConfig::new(
            self.total_interval_secs.saturating_mul(1000),
            self.repeat_count,
        )
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// External synthesizer executable used by the terminal client.
    pub command: String,
    /// Extra arguments passed before the word.
    pub args: Vec<String>,
    /// Voice names tried in order (substring match).
    pub preferred_voices: Vec<String>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// Upper bound on one utterance; 0 disables the bound.
    pub utterance_timeout_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: "espeak-ng".to_string(),
            args: Vec::new(),
            preferred_voices: vec![
                "Google US English".to_string(),
                "Microsoft Aria Online (Natural)".to_string(),
                "Samantha".to_string(),
                "Alex".to_string(),
            ],
            rate: 0.85,
            pitch: 1.0,
            volume: 1.0,
            utterance_timeout_ms: 8_000,
        }
    }
}

/// Upstream dictionary used by `/translate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dictionaryapi.dev/api/v2/entries/en".to_string(),
            timeout_secs: 5,
        }
    }
}
