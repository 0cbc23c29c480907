//! Per-participant dialog state.

use std::collections::HashMap;

use tally_types::{ParticipantId, ShortCode};

/// Where a participant is in the multi-step voting dialog.
///
/// The candidate picked in `SelectingCandidateToVote` travels inside
/// `AssigningPoints`, so leaving that state (including via `menu`) drops it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Command,
    SelectingCandidateToVote,
    AssigningPoints {
        candidate: ShortCode,
    },
    SelectingCandidateToUnvote,
    ActivityCheck,
}

impl SessionState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            SessionState::Command => "command",
            SessionState::SelectingCandidateToVote => "selecting_candidate_to_vote",
            SessionState::AssigningPoints { .. } => "assigning_points",
            SessionState::SelectingCandidateToUnvote => "selecting_candidate_to_unvote",
            SessionState::ActivityCheck => "activity_check",
        }
    }
}

/// Storage for dialog states, keyed by participant.
///
/// Participants without an entry are in [`SessionState::Command`].
pub trait SessionStore {
    fn state(&self, participant: &ParticipantId) -> SessionState;

    fn set_state(&mut self, participant: &ParticipantId, state: SessionState);
}

/// Process-local session store. Dialog state is not persisted across restarts.
#[derive(Debug, Default)]
pub struct MemorySessions {
    states: HashMap<ParticipantId, SessionState>,
}

impl MemorySessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Participants currently outside the command menu.
    #[must_use]
    pub fn active(&self) -> usize {
        self.states.len()
    }
}

impl SessionStore for MemorySessions {
    fn state(&self, participant: &ParticipantId) -> SessionState {
        self.states.get(participant).cloned().unwrap_or_default()
    }

    fn set_state(&mut self, participant: &ParticipantId, state: SessionState) {
        if state == SessionState::Command {
            self.states.remove(participant);
        } else {
            self.states.insert(participant.clone(), state);
        }
    }
}
