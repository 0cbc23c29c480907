//! Text and action rendering for the transport layer.

use std::fmt;

use tally_store::PollStore;
use tally_types::{ParticipantId, View, format_views};

use crate::{Command, Dispatcher, SessionState, SessionStore};

pub const NOT_LINKED: &str =
    "Your profile is not linked to this poll. Ask an administrator to add you to the roster.";
pub const DEGRADED_WARNING: &str =
    "Warning: recent changes could not be saved yet. They are kept and will be retried.";
const ACTIVITY_QUESTION: &str = "Last month, did you read the book or take part in the discussion? \
     (New participants answer yes.)";

/// A selectable option: a label to show and the command it sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub label: String,
    pub command: Command,
}

impl Action {
    fn new(label: impl Into<String>, command: Command) -> Self {
        Self {
            label: label.into(),
            command,
        }
    }

    /// Text the transport sends back when the action is chosen.
    #[must_use]
    pub fn payload(&self) -> String {
        self.command.to_string()
    }
}

/// Everything a participant sees: status text and ordered actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub actions: Vec<Action>,
}

impl Screen {
    #[must_use]
    pub fn payloads(&self) -> Vec<String> {
        self.actions.iter().map(Action::payload).collect()
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.trim_end())?;
        for action in &self.actions {
            write!(f, "\n[{}] {}", action.label, action.payload())?;
        }
        Ok(())
    }
}

fn selection_actions(views: &[View], to_command: fn(String) -> Command) -> Vec<Action> {
    views
        .iter()
        .map(|v| Action::new(v.label(), to_command(v.short_code.to_string())))
        .collect()
}

impl<S: PollStore, Z: SessionStore> Dispatcher<S, Z> {
    /// Render `participant`'s current screen.
    #[must_use]
    pub fn screen(&self, participant: &ParticipantId) -> Screen {
        if !self.engine().roster().is_member(participant) {
            return Screen {
                text: NOT_LINKED.to_string(),
                actions: Vec::new(),
            };
        }

        let state = self.session_state(participant);
        let mut text = String::new();
        if self.is_degraded() {
            text.push_str(DEGRADED_WARNING);
            text.push_str("\n\n");
        }
        text.push_str(&self.status_text(participant, &state));

        let mut actions = self.state_actions(participant, &state);
        actions.push(Action::new("Back to menu", Command::Menu));
        Screen { text, actions }
    }

    fn status_text(&self, participant: &ParticipantId, state: &SessionState) -> String {
        let poll = self.poll();
        let subject = poll.kind().subject();
        match state {
            SessionState::Command => self.menu_text(participant),
            SessionState::SelectingCandidateToVote | SessionState::SelectingCandidateToUnvote => {
                format!("Choose a {subject}")
            }
            SessionState::AssigningPoints { candidate } => {
                let name = poll
                    .candidate(candidate.as_str())
                    .map_or(candidate.as_str(), |c| c.text());
                format!("Choose the number of points for {name}")
            }
            SessionState::ActivityCheck => ACTIVITY_QUESTION.to_string(),
        }
    }

    fn menu_text(&self, participant: &ParticipantId) -> String {
        let poll = self.poll();
        let engine = self.engine();
        let votes = engine.view(poll, participant, true);
        let mut text = String::new();

        if poll.is_closed() {
            text.push_str("Voting is over!\n");
        } else if votes.is_empty() {
            text.push_str("You have not voted yet.\n");
        }
        if !votes.is_empty() {
            text.push_str("Your choice:\n");
            text.push_str(&format_views(&votes));
            text.push('\n');
        }
        if !poll.is_closed() {
            text.push_str(&format!("Used: {}\n", engine.summary(poll, participant)));
        }

        text.push('\n');
        text.push_str(&engine.progress(poll).to_string());
        text.push('\n');

        if engine.roster().is_admin(participant) || poll.is_closed() {
            text.push_str("\nResult:\n");
            text.push_str(&format_views(&engine.result(poll, false)));
            text.push('\n');
        }
        text
    }

    fn state_actions(&self, participant: &ParticipantId, state: &SessionState) -> Vec<Action> {
        let poll = self.poll();
        let engine = self.engine();
        match state {
            SessionState::Command => {
                let mut actions = vec![Action::new("Update", Command::Update)];
                if engine.can_vote(poll, participant) {
                    actions.push(Action::new("Vote", Command::Vote));
                }
                if engine.can_unvote(poll, participant) {
                    actions.push(Action::new("Remove a vote", Command::Unvote));
                }
                if engine.can_stop(poll, participant) {
                    actions.push(Action::new("Close voting", Command::Stop));
                }
                if engine.can_resume(poll, participant) {
                    actions.push(Action::new("Reopen voting", Command::Resume));
                }
                actions
            }
            SessionState::SelectingCandidateToVote => {
                selection_actions(&engine.view(poll, participant, false), Command::VoteSelect)
            }
            SessionState::SelectingCandidateToUnvote => {
                selection_actions(&engine.view(poll, participant, true), Command::UnvoteSelect)
            }
            SessionState::AssigningPoints { candidate } => {
                let state = poll.participant(participant);
                let previous = state.vote_for(candidate.as_str()).map_or(0, |v| v.points);
                let available = state.points_left() + previous;
                (1..=available)
                    .map(|n| Action::new(n.to_string(), Command::VotePoints(n)))
                    .collect()
            }
            SessionState::ActivityCheck => vec![
                Action::new("Yes", Command::Activity(true)),
                Action::new("No", Command::Activity(false)),
            ],
        }
    }
}
