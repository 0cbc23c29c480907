use serde::{Deserialize, Serialize};
use thiserror::Error;

use tally_types::{ExternalId, ParticipantId, Points, Poll, Roster};

/// One non-zero allocation, in workspace identities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExportRecord {
    pub participant: ExternalId,
    pub candidate: ExternalId,
    pub points: Points,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("voting is still open; close it before exporting")]
    PollNotClosed,
    #[error("participant '{0}' has votes but is not on the roster")]
    UnknownParticipant(ParticipantId),
    #[error("vote by '{participant}' references unknown short code '{code}'")]
    DanglingVote {
        participant: ParticipantId,
        code: String,
    },
}

/// Final tallies of a closed poll, sorted by participant then candidate.
pub fn export_records(poll: &Poll, roster: &Roster) -> Result<Vec<ExportRecord>, ExportError> {
    if !poll.is_closed() {
        return Err(ExportError::PollNotClosed);
    }

    let mut records = Vec::new();
    for (participant, state) in poll.participants() {
        let mut votes = state.votes().iter().filter(|v| v.points > 0).peekable();
        if votes.peek().is_none() {
            continue;
        }
        let external = roster
            .external_id(participant)
            .ok_or_else(|| ExportError::UnknownParticipant(participant.clone()))?;

        for vote in votes {
            let candidate = poll.candidate(vote.short_code.as_str()).ok_or_else(|| {
                ExportError::DanglingVote {
                    participant: participant.clone(),
                    code: vote.short_code.to_string(),
                }
            })?;
            records.push(ExportRecord {
                participant: external.clone(),
                candidate: candidate.id().clone(),
                points: vote.points,
            });
        }
    }

    records.sort();
    tracing::info!(records = records.len(), "Exported poll results");
    Ok(records)
}
