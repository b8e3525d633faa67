//! Autoplay session state machine.
//!
//! Valid transitions:
//! - Idle | Stopped -> Playing(0) (start autoplay)
//! - Playing(i) -> AwaitingAnswer(i) (all repetitions spoken)
//! - AwaitingAnswer(i) -> Grading(i) (non-blank submission received)
//! - Grading(i) -> Advancing | PageComplete
//! - Advancing -> Playing(i + 1)
//! - PageComplete -> Idle (summary shown)
//! - any active phase -> Stopped (manual stop)
//! - Stopped -> Idle (new page arrived)

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::SessionError;

/// Where the autoplay loop currently is. Indices are 0-based word positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No pass running. Ready to start.
    Idle,
    /// Speaking word `i`, possibly several times.
    Playing(usize),
    /// Waiting for the user to submit an answer for word `i`.
    AwaitingAnswer(usize),
    /// Comparing the submission for word `i`.
    Grading(usize),
    /// Grace period before the next word.
    Advancing,
    /// Last word graded; summary pending.
    PageComplete,
    /// Pass stopped by the user.
    Stopped,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::Playing(i) => write!(f, "Playing({})", i),
            SessionPhase::AwaitingAnswer(i) => write!(f, "AwaitingAnswer({})", i),
            SessionPhase::Grading(i) => write!(f, "Grading({})", i),
            SessionPhase::Advancing => write!(f, "Advancing"),
            SessionPhase::PageComplete => write!(f, "PageComplete"),
            SessionPhase::Stopped => write!(f, "Stopped"),
        }
    }
}

impl SessionPhase {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SessionPhase) -> bool {
        use SessionPhase::*;
        match (self, target) {
            (Idle | Stopped, Playing(0)) => true,
            (Playing(i), AwaitingAnswer(j)) => i == j,
            (AwaitingAnswer(i), Grading(j)) => i == j,
            (Grading(_), Advancing | PageComplete) => true,
            (Advancing, Playing(_)) => true,
            (PageComplete, Idle) => true,
            (Stopped, Idle) => true,
            (Idle | Stopped, Stopped) => false,
            (_, Stopped) => true,
            _ => false,
        }
    }

    /// Whether an autoplay pass is driving this phase.
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionPhase::Idle | SessionPhase::Stopped)
    }
}

/// Thread-safe state machine for autoplay phases.
///
/// All transitions are validated before being applied.
#[derive(Debug, Clone)]
pub struct StateMachine {
    phase: Arc<Mutex<SessionPhase>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            phase: Arc::new(Mutex::new(SessionPhase::Idle)),
        }
    }

    /// Returns the current phase.
    pub fn current(&self) -> SessionPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempt to transition to the target phase.
    pub fn transition(&self, target: SessionPhase) -> Result<(), SessionError> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if phase.can_transition_to(&target) {
            tracing::debug!("Session phase: {} -> {}", *phase, target);
            *phase = target;
            Ok(())
        } else {
            Err(SessionError::InvalidTransition(*phase, target))
        }
    }

    /// Force the machine back to Idle regardless of the current phase.
    pub fn reset(&self) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase != SessionPhase::Idle {
            tracing::debug!("Session phase reset to Idle from {}", *phase);
        }
        *phase = SessionPhase::Idle;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use SessionPhase::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(Idle.to_string(), "Idle");
        assert_eq!(Playing(2).to_string(), "Playing(2)");
        assert_eq!(AwaitingAnswer(0).to_string(), "AwaitingAnswer(0)");
        assert_eq!(PageComplete.to_string(), "PageComplete");
    }

    #[test]
    fn test_valid_transitions() {
        assert!(Idle.can_transition_to(&Playing(0)));
        assert!(Stopped.can_transition_to(&Playing(0)));
        assert!(Playing(3).can_transition_to(&AwaitingAnswer(3)));
        assert!(AwaitingAnswer(3).can_transition_to(&Grading(3)));
        assert!(Grading(3).can_transition_to(&Advancing));
        assert!(Grading(3).can_transition_to(&PageComplete));
        assert!(Advancing.can_transition_to(&Playing(4)));
        assert!(PageComplete.can_transition_to(&Idle));
        assert!(Stopped.can_transition_to(&Idle));
    }

    #[test]
    fn test_stop_reachable_from_every_active_phase() {
        for phase in [
            Playing(0),
            AwaitingAnswer(1),
            Grading(1),
            Advancing,
            PageComplete,
        ] {
            assert!(phase.can_transition_to(&Stopped), "{} -> Stopped", phase);
        }
        assert!(!Idle.can_transition_to(&Stopped));
        assert!(!Stopped.can_transition_to(&Stopped));
    }

    #[test]
    fn test_invalid_transitions() {
        // Start only from the first word.
        assert!(!Idle.can_transition_to(&Playing(1)));
        // Indices must line up.
        assert!(!Playing(1).can_transition_to(&AwaitingAnswer(2)));
        assert!(!AwaitingAnswer(1).can_transition_to(&Grading(0)));
        // No skipping.
        assert!(!Playing(0).can_transition_to(&Grading(0)));
        assert!(!Idle.can_transition_to(&AwaitingAnswer(0)));
        assert!(!Advancing.can_transition_to(&PageComplete));
        // No restarting mid-pass.
        assert!(!Playing(2).can_transition_to(&Playing(0)));
    }

    #[test]
    fn test_state_machine_full_page() {
        let sm = StateMachine::new();
        sm.transition(Playing(0)).unwrap();
        sm.transition(AwaitingAnswer(0)).unwrap();
        sm.transition(Grading(0)).unwrap();
        sm.transition(Advancing).unwrap();
        sm.transition(Playing(1)).unwrap();
        sm.transition(AwaitingAnswer(1)).unwrap();
        sm.transition(Grading(1)).unwrap();
        sm.transition(PageComplete).unwrap();
        sm.transition(Idle).unwrap();
        assert_eq!(sm.current(), Idle);
    }

    #[test]
    fn test_state_machine_invalid_transition_keeps_phase() {
        let sm = StateMachine::new();
        let result = sm.transition(Grading(0));
        match result {
            Err(SessionError::InvalidTransition(from, to)) => {
                assert_eq!(from, Idle);
                assert_eq!(to, Grading(0));
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
        assert_eq!(sm.current(), Idle);
    }

    #[test]
    fn test_state_machine_reset() {
        let sm = StateMachine::new();
        sm.transition(Playing(0)).unwrap();
        sm.transition(Stopped).unwrap();
        sm.reset();
        assert_eq!(sm.current(), Idle);
    }

    #[test]
    fn test_state_machine_clone_is_shared() {
        let sm1 = StateMachine::new();
        let sm2 = sm1.clone();
        sm1.transition(Playing(0)).unwrap();
        assert_eq!(sm2.current(), Playing(0));
    }

    #[test]
    fn test_is_active() {
        assert!(!Idle.is_active());
        assert!(!Stopped.is_active());
        assert!(Playing(0).is_active());
        assert!(Advancing.is_active());
    }
}
