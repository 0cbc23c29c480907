//! Voting engine for Tally.
//!
//! Business rules over a [`Poll`]: eligibility, vote mutation, budget
//! enforcement, progress and result aggregation. The engine holds no poll state
//! of its own; every operation borrows the poll it acts on, so callers decide
//! when to persist.

mod export;
mod seed;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tally_types::{ParticipantId, ParticipantState, Points, Poll, PollKind, Roster, View};

pub use export::{ExportError, ExportRecord, export_records};
pub use seed::{SeedEntry, SeedError, seed_poll};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("voting is closed")]
    PollClosed,
    #[error("no points left to distribute")]
    BudgetExhausted,
    #[error("cannot assign {requested} points: only {available} available")]
    QuotaExceeded { requested: Points, available: Points },
    #[error("already voted for {max} candidates", max = ParticipantState::MAX_VOTES)]
    TooManyChoices,
    #[error("points must be positive")]
    ZeroPoints,
    #[error("no candidate with short code '{0}'")]
    UnknownCandidate(String),
    #[error("cannot vote for your own candidate")]
    SelfVote,
    #[error("no vote for '{0}' to remove")]
    UnknownVote(String),
    #[error("no votes to remove")]
    NoVotes,
    #[error("only administrators can open or close voting")]
    NotAuthorized,
    #[error("voting is already closed")]
    PollAlreadyClosed,
    #[error("voting is not closed")]
    PollNotClosed,
    #[error("activity was already confirmed or declined")]
    ActivityAlreadyChecked,
}

/// Whether participants must answer the activity question before voting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCheck {
    #[default]
    Disabled,
    /// Ask once per round in standard polls; a "no" answer reduces the budget.
    Enabled,
}

impl ActivityCheck {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Enabled => "enabled",
        }
    }
}

/// Participants who can still vote, out of those taking part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub pending: Vec<ParticipantId>,
    /// Non-disabled roster members.
    pub total: usize,
}

impl Progress {
    #[must_use]
    pub fn voted(&self) -> usize {
        self.total.saturating_sub(self.pending.len())
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Voted: {}/{}", self.voted(), self.total)
    }
}

/// One participant's spending so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub used: Points,
    pub budget: Points,
    pub choices: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} points, {}/{} choices",
            self.used,
            self.budget,
            self.choices,
            ParticipantState::MAX_VOTES
        )
    }
}

/// Rules engine bound to one roster and activity policy.
#[derive(Debug, Clone)]
pub struct Engine {
    roster: Roster,
    activity_check: ActivityCheck,
}

impl Engine {
    #[must_use]
    pub fn new(roster: Roster) -> Self {
        Self {
            roster,
            activity_check: ActivityCheck::default(),
        }
    }

    #[must_use]
    pub fn with_activity_check(mut self, policy: ActivityCheck) -> Self {
        self.activity_check = policy;
        self
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn activity_check(&self) -> ActivityCheck {
        self.activity_check
    }

    // ------------------------------------------------------------------------
    // Eligibility
    // ------------------------------------------------------------------------

    pub fn check_vote(&self, poll: &Poll, participant: &ParticipantId) -> Result<(), VoteError> {
        if poll.is_closed() {
            return Err(VoteError::PollClosed);
        }
        Self::check_room(poll.participant(participant))
    }

    /// Budget and choice limits only; the open/closed flag is not consulted.
    fn check_room(state: &ParticipantState) -> Result<(), VoteError> {
        if state.points_used() >= state.max_points() {
            return Err(VoteError::BudgetExhausted);
        }
        if state.choices() >= ParticipantState::MAX_VOTES {
            return Err(VoteError::TooManyChoices);
        }
        Ok(())
    }

    #[must_use]
    pub fn can_vote(&self, poll: &Poll, participant: &ParticipantId) -> bool {
        self.check_vote(poll, participant).is_ok()
    }

    pub fn check_unvote(&self, poll: &Poll, participant: &ParticipantId) -> Result<(), VoteError> {
        if poll.is_closed() {
            return Err(VoteError::PollClosed);
        }
        if poll.participant(participant).choices() == 0 {
            return Err(VoteError::NoVotes);
        }
        Ok(())
    }

    #[must_use]
    pub fn can_unvote(&self, poll: &Poll, participant: &ParticipantId) -> bool {
        self.check_unvote(poll, participant).is_ok()
    }

    pub fn check_stop(&self, poll: &Poll, participant: &ParticipantId) -> Result<(), VoteError> {
        if !self.roster.is_admin(participant) {
            return Err(VoteError::NotAuthorized);
        }
        if poll.is_closed() {
            return Err(VoteError::PollAlreadyClosed);
        }
        Ok(())
    }

    #[must_use]
    pub fn can_stop(&self, poll: &Poll, participant: &ParticipantId) -> bool {
        self.check_stop(poll, participant).is_ok()
    }

    pub fn check_resume(&self, poll: &Poll, participant: &ParticipantId) -> Result<(), VoteError> {
        if !self.roster.is_admin(participant) {
            return Err(VoteError::NotAuthorized);
        }
        if !poll.is_closed() {
            return Err(VoteError::PollNotClosed);
        }
        Ok(())
    }

    #[must_use]
    pub fn can_resume(&self, poll: &Poll, participant: &ParticipantId) -> bool {
        self.check_resume(poll, participant).is_ok()
    }

    /// True when the participant must answer the activity question before
    /// their first vote of the round.
    #[must_use]
    pub fn needs_activity_check(&self, poll: &Poll, participant: &ParticipantId) -> bool {
        self.activity_check == ActivityCheck::Enabled
            && poll.kind() == PollKind::Standard
            && !poll.participant(participant).activity_checked()
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Set `participant`'s allocation for `code` to `points`.
    ///
    /// Replaces any earlier allocation to the same candidate; the previous
    /// points are returned to the budget before the new amount is checked.
    pub fn cast_vote(
        &self,
        poll: &mut Poll,
        participant: &ParticipantId,
        code: &str,
        points: Points,
    ) -> Result<(), VoteError> {
        if poll.is_closed() {
            return Err(VoteError::PollClosed);
        }
        if points == 0 {
            return Err(VoteError::ZeroPoints);
        }
        let candidate = poll
            .candidate(code)
            .ok_or_else(|| VoteError::UnknownCandidate(code.to_string()))?;
        if candidate.author() == participant {
            return Err(VoteError::SelfVote);
        }
        let short_code = candidate.short_code().clone();

        let state = poll.participant(participant);
        let previous = state.vote_for(code).map_or(0, |v| v.points);
        let available = state
            .max_points()
            .saturating_sub(state.points_used() - previous);
        if points > available {
            return Err(VoteError::QuotaExceeded {
                requested: points,
                available,
            });
        }
        if previous == 0 && state.choices() >= ParticipantState::MAX_VOTES {
            return Err(VoteError::TooManyChoices);
        }

        poll.participant_mut(participant).upsert_vote(short_code, points);
        tracing::debug!(participant = %participant, code, points, "Vote cast");
        Ok(())
    }

    pub fn remove_vote(
        &self,
        poll: &mut Poll,
        participant: &ParticipantId,
        code: &str,
    ) -> Result<(), VoteError> {
        if poll.is_closed() {
            return Err(VoteError::PollClosed);
        }
        if poll.participant(participant).vote_for(code).is_none() {
            return Err(VoteError::UnknownVote(code.to_string()));
        }
        poll.participant_mut(participant).remove_vote(code);
        tracing::debug!(participant = %participant, code, "Vote removed");
        Ok(())
    }

    /// Record the one-time activity answer. Declining reduces the budget, so it
    /// is refused while the participant already holds more than the reduced
    /// budget.
    pub fn set_activity_confirmation(
        &self,
        poll: &mut Poll,
        participant: &ParticipantId,
        confirmed: bool,
    ) -> Result<(), VoteError> {
        let state = poll.participant(participant);
        if state.activity_checked() {
            return Err(VoteError::ActivityAlreadyChecked);
        }
        let used = state.points_used();
        if !confirmed && used > ParticipantState::REDUCED_BUDGET {
            return Err(VoteError::QuotaExceeded {
                requested: used,
                available: ParticipantState::REDUCED_BUDGET,
            });
        }
        poll.participant_mut(participant).record_activity(confirmed);
        tracing::debug!(participant = %participant, confirmed, "Activity recorded");
        Ok(())
    }

    pub fn close(&self, poll: &mut Poll, participant: &ParticipantId) -> Result<(), VoteError> {
        self.check_stop(poll, participant)?;
        poll.set_closed(true);
        tracing::info!(by = %participant, "Voting closed");
        Ok(())
    }

    pub fn reopen(&self, poll: &mut Poll, participant: &ParticipantId) -> Result<(), VoteError> {
        self.check_resume(poll, participant)?;
        poll.set_closed(false);
        tracing::info!(by = %participant, "Voting reopened");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Candidates as `participant` sees them, with their own allocation.
    ///
    /// The participant's own candidates are never listed.
    #[must_use]
    pub fn view(&self, poll: &Poll, participant: &ParticipantId, not_empty_only: bool) -> Vec<View> {
        let state = poll.participant(participant);
        poll.candidates()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.author() != participant)
            .filter_map(|(i, c)| {
                let points = state.vote_for(c.short_code().as_str()).map_or(0, |v| v.points);
                (!not_empty_only || points > 0).then(|| View::new(i + 1, c, points))
            })
            .collect()
    }

    #[must_use]
    pub fn progress(&self, poll: &Poll) -> Progress {
        let mut progress = Progress::default();
        for member in self.roster.members() {
            if poll.participant(member).is_disabled() {
                continue;
            }
            progress.total += 1;
            if Self::check_room(poll.participant(member)).is_ok() {
                progress.pending.push(member.clone());
            }
        }
        progress
    }

    /// Total points per candidate, highest first.
    #[must_use]
    pub fn result(&self, poll: &Poll, include_zero: bool) -> Vec<View> {
        let mut totals: Vec<View> = poll
            .candidates()
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let total = poll
                    .participants()
                    .filter_map(|(_, state)| state.vote_for(c.short_code().as_str()))
                    .map(|v| v.points)
                    .sum();
                View::new(i + 1, c, total)
            })
            .filter(|v| include_zero || v.points > 0)
            .collect();
        totals.sort_by(|a, b| b.points.cmp(&a.points));
        totals
    }

    /// `@handle` mentions of everyone who can still vote.
    #[must_use]
    pub fn pending_mentions(&self, poll: &Poll) -> Vec<String> {
        self.progress(poll)
            .pending
            .iter()
            .map(ParticipantId::mention)
            .collect()
    }

    #[must_use]
    pub fn summary(&self, poll: &Poll, participant: &ParticipantId) -> Summary {
        let state = poll.participant(participant);
        Summary {
            used: state.points_used(),
            budget: state.max_points(),
            choices: state.choices(),
        }
    }
}

#[cfg(test)]
mod tests;
