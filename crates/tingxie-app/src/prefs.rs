//! User display preferences, persisted as JSON in the data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tingxie_core::{DataDir, Result};
use tracing::warn;

const PREFS_FILE: &str = "prefs.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Prefs {
    /// Hide the word list behind star masks.
    pub words_hidden: bool,
}

impl Prefs {
    pub fn path_in(data_dir: &str) -> PathBuf {
        PathBuf::from(DataDir::new(data_dir.to_string()).0).join(PREFS_FILE)
    }

    /// Load preferences. A missing or unreadable file yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable preferences");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
