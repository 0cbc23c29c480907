//! The poll document: candidates, per-participant state, open/closed flag.
//!
//! These types hold data and enforce structural invariants only (non-empty
//! candidate text, unique short codes, one vote per short code). Budget and
//! eligibility rules live in the voting engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ExternalId, NonEmptyString, ParticipantId, ShortCode};

/// Point count assigned to a candidate.
pub type Points = u32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("candidate text must not be empty")]
    EmptyCandidateText,
    #[error("candidate '{text}' has short code '{code}', already used by '{existing}'")]
    DuplicateShortCode {
        code: ShortCode,
        text: String,
        existing: String,
    },
}

/// Which kind of work the round votes on. Affects prompt wording only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollKind {
    #[default]
    Standard,
    Review,
}

impl PollKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Review => "review",
        }
    }

    /// Noun used in selection prompts.
    #[must_use]
    pub const fn subject(self) -> &'static str {
        match self {
            Self::Standard => "book",
            Self::Review => "review",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" | "book" => Some(Self::Standard),
            "review" | "report" => Some(Self::Review),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CandidateWire {
    text: NonEmptyString,
    author: ParticipantId,
    id: ExternalId,
}

/// An item participants can vote for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CandidateWire", into = "CandidateWire")]
pub struct Candidate {
    text: NonEmptyString,
    author: ParticipantId,
    id: ExternalId,
    short_code: ShortCode,
}

impl Candidate {
    pub fn new(
        text: impl Into<String>,
        author: ParticipantId,
        id: ExternalId,
    ) -> Result<Self, PollError> {
        let text = NonEmptyString::new(text.into().trim())
            .map_err(|_| PollError::EmptyCandidateText)?;
        Ok(Self::from(CandidateWire { text, author, id }))
    }

    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    #[must_use]
    pub fn author(&self) -> &ParticipantId {
        &self.author
    }

    #[must_use]
    pub fn id(&self) -> &ExternalId {
        &self.id
    }

    #[must_use]
    pub fn short_code(&self) -> &ShortCode {
        &self.short_code
    }
}

impl From<CandidateWire> for Candidate {
    fn from(wire: CandidateWire) -> Self {
        let short_code = ShortCode::derive(wire.text.as_str());
        Self {
            text: wire.text,
            author: wire.author,
            id: wire.id,
            short_code,
        }
    }
}

impl From<Candidate> for CandidateWire {
    fn from(candidate: Candidate) -> Self {
        Self {
            text: candidate.text,
            author: candidate.author,
            id: candidate.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub short_code: ShortCode,
    pub points: Points,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Voting state of one participant for the current round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantState {
    /// Excluded from progress counts; budget drops to zero.
    #[serde(default, skip_serializing_if = "is_false")]
    disabled: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    activity_checked: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    activity_confirmed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    votes: Vec<Vote>,
}

static UNTOUCHED: ParticipantState = ParticipantState::new();

impl ParticipantState {
    pub const MAX_VOTES: usize = 3;
    pub const FULL_BUDGET: Points = 10;
    pub const REDUCED_BUDGET: Points = 7;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            disabled: false,
            activity_checked: false,
            activity_confirmed: false,
            votes: Vec::new(),
        }
    }

    /// Total points this participant may distribute.
    #[must_use]
    pub fn max_points(&self) -> Points {
        if self.disabled {
            0
        } else if self.activity_checked && !self.activity_confirmed {
            Self::REDUCED_BUDGET
        } else {
            Self::FULL_BUDGET
        }
    }

    #[must_use]
    pub fn points_used(&self) -> Points {
        self.votes.iter().map(|v| v.points).sum()
    }

    #[must_use]
    pub fn points_left(&self) -> Points {
        self.max_points().saturating_sub(self.points_used())
    }

    /// Number of candidates holding a non-zero allocation.
    #[must_use]
    pub fn choices(&self) -> usize {
        self.votes.iter().filter(|v| v.points > 0).count()
    }

    #[must_use]
    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    #[must_use]
    pub fn vote_for(&self, code: &str) -> Option<&Vote> {
        self.votes.iter().find(|v| v.short_code == code)
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    #[must_use]
    pub fn activity_checked(&self) -> bool {
        self.activity_checked
    }

    #[must_use]
    pub fn activity_confirmed(&self) -> bool {
        self.activity_confirmed
    }

    /// Set the allocation for `code`, replacing any previous one.
    pub fn upsert_vote(&mut self, code: ShortCode, points: Points) {
        match self.votes.iter_mut().find(|v| v.short_code == code) {
            Some(existing) => existing.points = points,
            None => self.votes.push(Vote {
                short_code: code,
                points,
            }),
        }
    }

    pub fn remove_vote(&mut self, code: &str) -> Option<Vote> {
        let index = self.votes.iter().position(|v| v.short_code == code)?;
        Some(self.votes.remove(index))
    }

    pub fn record_activity(&mut self, confirmed: bool) {
        self.activity_checked = true;
        self.activity_confirmed = confirmed;
    }
}

/// One voting round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    version: u32,
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    participants: BTreeMap<ParticipantId, ParticipantState>,
    #[serde(default)]
    kind: PollKind,
    #[serde(default)]
    result_sink: String,
    #[serde(default)]
    closed: bool,
}

impl Default for Poll {
    fn default() -> Self {
        Self::new(PollKind::default(), String::new())
    }
}

impl Poll {
    /// Current document schema version.
    pub const CURRENT_VERSION: u32 = 1;

    #[must_use]
    pub fn new(kind: PollKind, result_sink: impl Into<String>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            candidates: Vec::new(),
            participants: BTreeMap::new(),
            kind,
            result_sink: result_sink.into(),
            closed: false,
        }
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.version == Self::CURRENT_VERSION
    }

    #[must_use]
    pub fn kind(&self) -> PollKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: PollKind) {
        self.kind = kind;
    }

    #[must_use]
    pub fn result_sink(&self) -> &str {
        &self.result_sink
    }

    pub fn set_result_sink(&mut self, sink: impl Into<String>) {
        self.result_sink = sink.into();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Append a candidate. Its short code must not collide with an existing one.
    pub fn add_candidate(&mut self, candidate: Candidate) -> Result<(), PollError> {
        if let Some(existing) = self.candidate(candidate.short_code().as_str()) {
            return Err(PollError::DuplicateShortCode {
                code: candidate.short_code().clone(),
                text: candidate.text().to_string(),
                existing: existing.text().to_string(),
            });
        }
        self.candidates.push(candidate);
        Ok(())
    }

    #[must_use]
    pub fn candidate(&self, code: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.short_code() == code)
    }

    /// State for `participant`, or the untouched default if they never acted.
    #[must_use]
    pub fn participant(&self, participant: &ParticipantId) -> &ParticipantState {
        self.participants.get(participant).unwrap_or(&UNTOUCHED)
    }

    /// Mutable state for `participant`, created on first access.
    pub fn participant_mut(&mut self, participant: &ParticipantId) -> &mut ParticipantState {
        self.participants.entry(participant.clone()).or_default()
    }

    pub fn participants(&self) -> impl Iterator<Item = (&ParticipantId, &ParticipantState)> {
        self.participants.iter()
    }
}
