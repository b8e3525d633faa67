use serde::Serialize;
use tingxie_core::{AnswerRecord, WordPage};

use crate::summary::Summary;

/// Everything a presentation adapter needs to render a session.
///
/// Emitted by the controller on a broadcast channel; subscribers that fall
/// behind lose the oldest events rather than blocking the autoplay pass.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    // =========================================================================
    // Pages
    // =========================================================================
    /// A new page replaced the previous one.
    PageLoaded { page: WordPage },

    /// A page request failed or timed out. The previous page stays current.
    PageRequestFailed { reason: String },

    // =========================================================================
    // Playback
    // =========================================================================
    /// Autoplay started from the first word of the page.
    PlaybackStarted { page: u32, word_count: usize },

    /// Playback of word `index` began.
    WordStarted { index: usize },

    /// Repetition `repeat` (1-based) of `of` for word `index` is being spoken.
    Utterance { index: usize, repeat: u32, of: u32 },

    /// All repetitions spoken; the answer input should be enabled.
    AwaitingAnswer { index: usize },

    /// A submission was graded.
    AnswerGraded {
        index: usize,
        record: AnswerRecord,
        feedback: String,
    },

    /// The pass was stopped manually. Carries a summary of what had been
    /// answered so far, if anything.
    PlaybackStopped {
        answered: usize,
        summary: Option<Summary>,
    },

    /// The last word of the page was graded.
    PageCompleted { summary: Summary },
}

impl SessionEvent {
    /// Returns the event name as a snake_case string.
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::PageLoaded { .. } => "page_loaded",
            SessionEvent::PageRequestFailed { .. } => "page_request_failed",
            SessionEvent::PlaybackStarted { .. } => "playback_started",
            SessionEvent::WordStarted { .. } => "word_started",
            SessionEvent::Utterance { .. } => "utterance",
            SessionEvent::AwaitingAnswer { .. } => "awaiting_answer",
            SessionEvent::AnswerGraded { .. } => "answer_graded",
            SessionEvent::PlaybackStopped { .. } => "playback_stopped",
            SessionEvent::PageCompleted { .. } => "page_completed",
        }
    }
}
