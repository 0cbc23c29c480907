//! Session Dispatcher.
//!
//! Sequences each participant's voting dialog, delegates rules to the
//! [`Engine`], and persists the poll after every mutating command.
//!
//! ```text
//!            vote                  vote_select(c)            vote_points(n)
//! Command ---------> SelectingCandidateToVote ---> AssigningPoints ---> Command
//!    |   \                  ^
//!    |    \ vote            | activity(b)
//!    |     `-----> ActivityCheck
//!    | unvote                          unvote_select(c)
//!    `-----> SelectingCandidateToUnvote ---------------> Command
//! ```
//!
//! `menu` returns to `Command` from anywhere; `update`, `stop` and `resume`
//! leave the state where it is.

use thiserror::Error;

use tally_engine::{Engine, VoteError};
use tally_store::{PollStore, StoreError};
use tally_types::{ParticipantId, Poll, PollId, ShortCode};

use crate::{Command, MemorySessions, SessionState, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("participant '{0}' is not on the roster")]
    UnknownParticipant(ParticipantId),
    #[error("empty command")]
    EmptyCommand,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("{command} takes {expected} argument(s), got {found}")]
    BadArgumentCount {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid argument '{value}' for {command}")]
    BadArgument {
        command: &'static str,
        value: String,
    },
    #[error("{command} is not available in state {state}")]
    BadState {
        command: &'static str,
        state: &'static str,
    },
    #[error("activity check is not required")]
    ActivityCheckNotRequired,
    #[error(transparent)]
    Vote(#[from] VoteError),
}

/// Result of [`Dispatcher::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Rejected(DispatchError),
}

impl Outcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    #[must_use]
    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            Outcome::Applied => None,
            Outcome::Rejected(err) => Some(err),
        }
    }
}

/// Owns one open poll and the dialog state of everyone voting on it.
///
/// Every command takes `&mut self`: commands are applied and persisted one at
/// a time. A concurrent front end wraps the dispatcher in a `Mutex`.
#[derive(Debug)]
pub struct Dispatcher<S, Z = MemorySessions> {
    poll_id: PollId,
    poll: Poll,
    store: S,
    engine: Engine,
    sessions: Z,
    degraded: bool,
}

impl<S: PollStore> Dispatcher<S> {
    /// Load `poll_id` from `store` with process-local session state.
    pub fn open(store: S, poll_id: PollId, engine: Engine) -> Result<Self, StoreError> {
        Self::with_sessions(store, poll_id, engine, MemorySessions::new())
    }
}

impl<S: PollStore, Z: SessionStore> Dispatcher<S, Z> {
    pub fn with_sessions(
        store: S,
        poll_id: PollId,
        engine: Engine,
        sessions: Z,
    ) -> Result<Self, StoreError> {
        let poll = store.open(&poll_id)?;
        tracing::info!(
            poll = %poll_id,
            candidates = poll.candidates().len(),
            closed = poll.is_closed(),
            "Dispatcher ready"
        );
        Ok(Self {
            poll_id,
            poll,
            store,
            engine,
            sessions,
            degraded: false,
        })
    }

    #[must_use]
    pub fn poll(&self) -> &Poll {
        &self.poll
    }

    #[must_use]
    pub fn poll_id(&self) -> &PollId {
        &self.poll_id
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// True while the in-memory poll holds changes the store has not accepted.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    #[must_use]
    pub fn session_state(&self, participant: &ParticipantId) -> SessionState {
        self.sessions.state(participant)
    }

    /// Parse and apply `raw`. Rejections are logged, never propagated.
    ///
    /// Unknown participants are refused before the command is parsed.
    pub fn handle(&mut self, participant: &ParticipantId, raw: &str) -> Outcome {
        let result = self
            .check_member(participant)
            .and_then(|()| Command::parse(raw))
            .and_then(|command| self.dispatch(participant, command));
        match result {
            Ok(()) => Outcome::Applied,
            Err(err) => {
                tracing::warn!(participant = %participant, command = raw.trim(), "Command rejected: {err}");
                Outcome::Rejected(err)
            }
        }
    }

    /// Apply one command for `participant`.
    ///
    /// On error the session state is unchanged, except when `vote_select`
    /// finds the participant no longer eligible: that aborts to `Command`.
    pub fn dispatch(
        &mut self,
        participant: &ParticipantId,
        command: Command,
    ) -> Result<(), DispatchError> {
        self.check_member(participant)?;
        if self.degraded {
            self.persist();
        }

        let state = self.sessions.state(participant);
        let next = self.transition(participant, &command, &state)?;

        if next != state {
            tracing::debug!(
                participant = %participant,
                command = command.name(),
                from = state.name(),
                to = next.name(),
                "Session transition"
            );
            self.sessions.set_state(participant, next);
        }
        Ok(())
    }

    fn check_member(&self, participant: &ParticipantId) -> Result<(), DispatchError> {
        if self.engine.roster().is_member(participant) {
            Ok(())
        } else {
            Err(DispatchError::UnknownParticipant(participant.clone()))
        }
    }

    fn transition(
        &mut self,
        participant: &ParticipantId,
        command: &Command,
        state: &SessionState,
    ) -> Result<SessionState, DispatchError> {
        let bad_state = || DispatchError::BadState {
            command: command.name(),
            state: state.name(),
        };

        match command {
            Command::Menu => Ok(SessionState::Command),
            Command::Update => Ok(state.clone()),

            Command::Vote => {
                if *state != SessionState::Command {
                    return Err(bad_state());
                }
                self.engine.check_vote(&self.poll, participant)?;
                if self.engine.needs_activity_check(&self.poll, participant) {
                    Ok(SessionState::ActivityCheck)
                } else {
                    Ok(SessionState::SelectingCandidateToVote)
                }
            }

            Command::VoteSelect(code) => {
                if *state != SessionState::SelectingCandidateToVote {
                    return Err(bad_state());
                }
                if let Err(err) = self.engine.check_vote(&self.poll, participant) {
                    self.sessions.set_state(participant, SessionState::Command);
                    return Err(err.into());
                }
                let candidate = self
                    .poll
                    .candidate(code)
                    .ok_or_else(|| VoteError::UnknownCandidate(code.clone()))?;
                if candidate.author() == participant {
                    return Err(VoteError::SelfVote.into());
                }
                Ok(SessionState::AssigningPoints {
                    candidate: candidate.short_code().clone(),
                })
            }

            Command::VotePoints(points) => {
                let SessionState::AssigningPoints { candidate } = state else {
                    return Err(bad_state());
                };
                self.engine.check_vote(&self.poll, participant)?;
                self.engine
                    .cast_vote(&mut self.poll, participant, candidate.as_str(), *points)?;
                self.persist();
                Ok(SessionState::Command)
            }

            Command::Unvote => {
                if *state != SessionState::Command {
                    return Err(bad_state());
                }
                self.engine.check_unvote(&self.poll, participant)?;
                Ok(SessionState::SelectingCandidateToUnvote)
            }

            Command::UnvoteSelect(code) => {
                if *state != SessionState::SelectingCandidateToUnvote {
                    return Err(bad_state());
                }
                self.engine.check_unvote(&self.poll, participant)?;
                self.engine.remove_vote(&mut self.poll, participant, code)?;
                self.persist();
                Ok(SessionState::Command)
            }

            Command::Activity(confirmed) => {
                if *state != SessionState::ActivityCheck {
                    return Err(bad_state());
                }
                if !self.engine.needs_activity_check(&self.poll, participant) {
                    return Err(DispatchError::ActivityCheckNotRequired);
                }
                self.engine
                    .set_activity_confirmation(&mut self.poll, participant, *confirmed)?;
                self.persist();
                Ok(SessionState::SelectingCandidateToVote)
            }

            Command::Stop => {
                if *state != SessionState::Command {
                    return Err(bad_state());
                }
                self.engine.close(&mut self.poll, participant)?;
                self.persist();
                Ok(SessionState::Command)
            }

            Command::Resume => {
                if *state != SessionState::Command {
                    return Err(bad_state());
                }
                self.engine.reopen(&mut self.poll, participant)?;
                self.persist();
                Ok(SessionState::Command)
            }
        }
    }

    /// Save the poll. A failure keeps the change in memory and marks the
    /// dispatcher degraded; the next command retries.
    fn persist(&mut self) {
        match self.store.save(&self.poll_id, &self.poll) {
            Ok(()) => {
                if self.degraded {
                    tracing::info!(poll = %self.poll_id, "Poll saved, leaving degraded mode");
                }
                self.degraded = false;
            }
            Err(err) => {
                tracing::error!(poll = %self.poll_id, "Failed to save poll, changes kept in memory: {err}");
                self.degraded = true;
            }
        }
    }

    /// Candidate code cached for `participant`, if they are assigning points.
    #[must_use]
    pub fn pending_choice(&self, participant: &ParticipantId) -> Option<ShortCode> {
        match self.sessions.state(participant) {
            SessionState::AssigningPoints { candidate } => Some(candidate),
            _ => None,
        }
    }
}
