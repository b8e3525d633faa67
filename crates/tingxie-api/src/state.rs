//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use tingxie_core::{TingxieConfig, WordBook};

use crate::dictionary::DictionaryClient;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. The word
/// book is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TingxieConfig>,
    /// The master word list.
    pub book: Arc<WordBook>,
    /// Upstream used by `/translate`.
    pub dictionary: Arc<dyn DictionaryClient>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: TingxieConfig,
        book: WordBook,
        dictionary: Arc<dyn DictionaryClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            book: Arc::new(book),
            dictionary,
            start_time: Instant::now(),
        }
    }

    /// Page size for `GET /` and for requests that omit one.
    pub fn default_page_size(&self) -> u32 {
        WordBook::effective_page_size(self.config.server.default_page_size)
    }
}
