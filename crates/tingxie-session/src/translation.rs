//! On-hover translations: formatting and a per-session cache.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::SessionError;

/// Fetches the raw definition text for a word.
#[async_trait]
pub trait TranslationLookup: Send + Sync {
    async fn lookup(&self, word: &str) -> Result<String, SessionError>;
}

fn pos_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(noun|verb|adjective|adverb):").expect("part-of-speech pattern is valid")
    })
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Format raw definition text for display.
///
/// Blank lines are dropped, a leading part-of-speech tag is wrapped as
/// `【noun】`, runs of whitespace collapse to one space, and entries are
/// separated by a blank line.
pub fn format_translation(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let tagged = pos_tag_regex().replace(line, "【$1】");
            whitespace_regex().replace_all(&tagged, " ").into_owned()
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Caches formatted translations by word for the life of a session.
///
/// Failed lookups are not cached so a later hover can retry.
pub struct TranslationCache<L> {
    lookup: L,
    entries: Mutex<HashMap<String, String>>,
}

impl<L: TranslationLookup> TranslationCache<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Formatted translation for `word`, or an empty string if the lookup fails.
    pub async fn get(&self, word: &str) -> String {
        let cached = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(word)
            .cloned();
        if let Some(hit) = cached {
            debug!(word = %word, "Translation cache hit");
            return hit;
        }

        match self.lookup.lookup(word).await {
            Ok(raw) => {
                let formatted = format_translation(&raw);
                self.entries
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(word.to_string(), formatted.clone());
                formatted
            }
            Err(e) => {
                warn!(word = %word, error = %e, "Translation lookup failed");
                String::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
