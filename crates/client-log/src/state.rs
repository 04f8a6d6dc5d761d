//! Deduplicating patch lifecycle state machine.

use std::collections::HashSet;

use valtext_protocol::{LifecycleState, Transition};

use crate::matcher::match_transition;

/// Action bound to entering a lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchAction {
    /// Entered `OutOfDate`.
    UpdateAvailable,
    /// Entered `Updating`.
    UpdateInProgress,
    /// Entered `UpToDate`. Terminal.
    UpdateComplete,
}

impl PatchAction {
    fn for_state(state: LifecycleState) -> Option<Self> {
        match state {
            LifecycleState::Unknown => None,
            LifecycleState::OutOfDate => Some(PatchAction::UpdateAvailable),
            LifecycleState::Updating => Some(PatchAction::UpdateInProgress),
            LifecycleState::UpToDate => Some(PatchAction::UpdateComplete),
        }
    }
}

/// Tracks the recorded patch state and hands out each state's action once.
///
/// Repeated lines never re-fire: a transition to the recorded state is a
/// no-op, and a state whose action already fired stays quiet even if the
/// client bounces back into it. After [`PatchAction::UpdateComplete`] the
/// machine ignores all input.
#[derive(Debug, Default)]
pub struct PatchStateMachine {
    current: LifecycleState,
    fired: HashSet<LifecycleState>,
    finished: bool,
}

impl PatchStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last recorded state.
    pub fn current(&self) -> LifecycleState {
        self.current
    }

    /// Whether the terminal action has been handed out.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the action bound to `state` has fired.
    pub fn has_fired(&self, state: LifecycleState) -> bool {
        self.fired.contains(&state)
    }

    /// Applies a parsed transition and returns the action to run, if any.
    pub fn observe(&mut self, transition: &Transition) -> Option<PatchAction> {
        if self.finished {
            return None;
        }

        let Some(next) = transition.next_state() else {
            tracing::debug!(
                from = %transition.previous,
                to = %transition.next,
                "ignoring unrecognized patch state"
            );
            return None;
        };

        if next == self.current {
            return None;
        }

        tracing::debug!(
            recorded = %self.current,
            next = %next,
            logged_from = %transition.previous,
            "patch state changed"
        );
        self.current = next;

        if !self.fired.insert(next) {
            return None;
        }
        if next.is_terminal() {
            self.finished = true;
        }

        PatchAction::for_state(next)
    }

    /// Matches one log line and applies it.
    pub fn feed_line(&mut self, line: &str) -> Option<PatchAction> {
        if self.finished {
            return None;
        }
        match_transition(line).and_then(|t| self.observe(&t))
    }
}
