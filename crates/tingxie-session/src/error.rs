//! Error types for the dictation session.

use tingxie_core::TingxieError;

use crate::state::SessionPhase;

/// Errors raised by the session controller and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid state transition: {0} -> {1}")]
    InvalidTransition(SessionPhase, SessionPhase),
    #[error("The current page has no words")]
    EmptyPage,
    #[error("Speech engine error: {0}")]
    Speech(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Page request timed out after {0} ms")]
    PageTimeout(u64),
    #[error("Translation lookup failed: {0}")]
    Translation(String),
    #[error(transparent)]
    Core(#[from] TingxieError),
}
