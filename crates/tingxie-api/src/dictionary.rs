//! Upstream dictionary lookups for `/translate/{word}`.
//!
//! The default upstream speaks the dictionaryapi.dev format: an array of
//! entries, each with `meanings[].partOfSpeech` and
//! `meanings[].definitions[].definition`. Entries are flattened into one
//! `partOfSpeech: definition` line per definition.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tingxie_core::config::DictionaryConfig;
use tingxie_core::{Result, TingxieError};
use tracing::debug;

/// Looks up the definition text for a word.
#[async_trait]
pub trait DictionaryClient: Send + Sync {
    /// Newline-separated `partOfSpeech: definition` lines.
    async fn define(&self, word: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
pub struct DictionaryEntry {
    #[serde(default)]
    pub meanings: Vec<Meaning>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meaning {
    #[serde(default)]
    pub part_of_speech: String,
    #[serde(default)]
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Deserialize)]
pub struct Definition {
    pub definition: String,
}

/// Flatten dictionary entries into `partOfSpeech: definition` lines.
pub fn flatten_entries(entries: &[DictionaryEntry]) -> String {
    entries
        .iter()
        .flat_map(|entry| &entry.meanings)
        .flat_map(|meaning| {
            meaning.definitions.iter().map(move |d| {
                if meaning.part_of_speech.is_empty() {
                    d.definition.clone()
                } else {
                    format!("{}: {}", meaning.part_of_speech, d.definition)
                }
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// HTTP client for a dictionaryapi.dev-compatible upstream.
#[derive(Clone)]
pub struct HttpDictionary {
    client: Client,
    base_url: Url,
}

impl HttpDictionary {
    pub fn new(config: &DictionaryConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TingxieError::Config(format!("invalid dictionary base_url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TingxieError::Config(format!(
                "dictionary base_url cannot carry a path: {}",
                config.base_url
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| TingxieError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    /// URL for `word`, percent-encoded as a single path segment.
    pub fn url_for(&self, word: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(word);
        }
        url
    }
}

#[async_trait]
impl DictionaryClient for HttpDictionary {
    async fn define(&self, word: &str) -> Result<String> {
        let url = self.url_for(word);
        debug!(word = %word, url = %url, "Dictionary lookup");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TingxieError::Translation(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TingxieError::Translation(format!(
                "no entry for '{}' (upstream status {})",
                word, status
            )));
        }

        let entries: Vec<DictionaryEntry> = response
            .json()
            .await
            .map_err(|e| TingxieError::Translation(format!("unexpected response: {}", e)))?;
        Ok(flatten_entries(&entries))
    }
}
