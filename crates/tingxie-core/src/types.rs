use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Identifies one client session (one connection, one controller).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Data directory path with `~` expanded to the user's home directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDir(pub String);

impl DataDir {
    pub fn new(path: String) -> Self {
        let expanded = if path.starts_with('~') {
            let home = std::env::var("USERPROFILE")
                .or_else(|_| std::env::var("HOME"))
                .unwrap_or_else(|_| ".".to_string());
            path.replacen('~', &home, 1)
        } else {
            path
        };
        Self(expanded)
    }
}

// =============================================================================
// Pages
// =============================================================================

/// One page of the master word list.
///
/// Produced fresh for every page request and replaced wholesale by the next
/// response. `current_page` is always inside `[1, total_pages]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPage {
    pub words: Vec<String>,
    pub current_page: u32,
    pub total_pages: u32,
}

impl WordPage {
    /// A placeholder page with no words, used before the first response arrives.
    pub fn empty() -> Self {
        Self {
            words: Vec::new(),
            current_page: 1,
            total_pages: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

// =============================================================================
// Answers
// =============================================================================

/// Placeholder answer used in summaries for words that were never answered.
pub const UNANSWERED: &str = "(未作答)";

/// One graded submission. Appended once per word per autoplay pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub word: String,
    pub user_answer: String,
    pub is_correct: bool,
}

impl AnswerRecord {
    /// Sentinel record for a word the pass never reached.
    pub fn unanswered(word: &str) -> Self {
        Self {
            word: word.to_string(),
            user_answer: UNANSWERED.to_string(),
            is_correct: false,
        }
    }
}

// =============================================================================
// Playback
// =============================================================================

/// How a single word is played: `repeat_count` utterances spread over
/// `total_interval_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackConfig {
    pub total_interval_ms: u64,
    pub repeat_count: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            total_interval_ms: 6_000,
            repeat_count: 3,
        }
    }
}

impl PlaybackConfig {
    /// Build a config, clamping the repeat count to at least 1.
    pub fn new(total_interval_ms: u64, repeat_count: u32) -> Self {
        Self {
            total_interval_ms,
            repeat_count: repeat_count.max(1),
        }
    }

    /// Build a config from user-entered values (seconds, times).
    ///
    /// Negative intervals become 0 and counts below 1 become 1.
    pub fn from_user_input(interval_secs: i64, times: i64) -> Self {
        let secs = interval_secs.max(0) as u64;
        let times = times.clamp(1, u32::MAX as i64) as u32;
        Self::new(secs.saturating_mul(1000), times)
    }

    /// Pause between two consecutive utterances of the same word.
    pub fn gap(&self) -> Duration {
        Duration::from_millis(self.total_interval_ms) / self.repeat_count.max(1)
    }
}
