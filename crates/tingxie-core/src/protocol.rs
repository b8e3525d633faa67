//! Wire messages exchanged over the page transport channel.
//!
//! Frames are JSON text tagged by `type`:
//!
//! ```text
//! -> {"type":"requestPage","page":2,"pageSize":20}
//! <- {"type":"wordList","words":["able","about"],"currentPage":2,"totalPages":3}
//! -> {"type":"checkAnswer","answer":"able","wordIndex":0,"currentPage":2,"pageSize":20}
//! <- {"type":"checkResult","isCorrect":true,"correctWord":"able"}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::WordPage;

/// Messages sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Ask for a page. A missing or zero page size means the server default.
    RequestPage {
        page: i64,
        #[serde(default)]
        page_size: Option<u32>,
    },
    /// Server-side grading of one answer by its position in the master list.
    CheckAnswer {
        answer: String,
        word_index: usize,
        current_page: u32,
        #[serde(default)]
        page_size: Option<u32>,
    },
    Ping,
}

/// Messages sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    WordList(WordPage),
    CheckResult {
        is_correct: bool,
        correct_word: String,
    },
    Error {
        message: String,
    },
    Pong,
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
