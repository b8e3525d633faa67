//! Tingxie session crate - the autoplay dictation loop.
//!
//! A [`SessionController`] plays each word of the current page through a
//! [`SpeechDriver`], waits for a typed answer, grades it and summarizes the
//! page at the end. Phases follow a strict state machine:
//! Idle -> Playing -> AwaitingAnswer -> Grading -> Advancing | PageComplete,
//! with Stopped reachable from any active phase.

pub mod controller;
pub mod error;
pub mod events;
pub mod grader;
mod navigation;
pub mod speech;
pub mod state;
pub mod summary;
pub mod translation;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{SessionController, SessionState, SessionTiming, SubmitOutcome};
pub use error::SessionError;
pub use events::SessionEvent;
pub use grader::grade;
pub use speech::{select_voice, SpeechDriver, SpeechEngine, SpeechOutcome, Utterance, Voice};
pub use state::{SessionPhase, StateMachine};
pub use summary::{Summary, SummaryRow};
pub use translation::{format_translation, TranslationCache, TranslationLookup};
pub use transport::{LocalTransport, PageTransport};
