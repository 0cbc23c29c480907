//! Round initialization from workspace records.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tally_store::{PollStore, StoreError};
use tally_types::{Candidate, ExternalId, Poll, PollError, PollId, PollKind, Roster};

/// One nominated item as exported from the workspace database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEntry {
    pub text: String,
    /// Workspace identity of the person who proposed the item.
    pub proposer: ExternalId,
    /// Workspace record of the item itself.
    pub id: ExternalId,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("proposer '{proposer}' of '{text}' is not linked to any participant")]
    UnknownProposer { text: String, proposer: ExternalId },
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn build(poll: &mut Poll, roster: &Roster, entries: &[SeedEntry]) -> Result<(), SeedError> {
    for entry in entries {
        let author = roster.resolve_external(&entry.proposer).ok_or_else(|| {
            SeedError::UnknownProposer {
                text: entry.text.clone(),
                proposer: entry.proposer.clone(),
            }
        })?;
        poll.add_candidate(Candidate::new(
            entry.text.as_str(),
            author.clone(),
            entry.id.clone(),
        )?)?;
    }
    Ok(())
}

/// Create poll `id` holding one candidate per entry.
///
/// All or nothing: if any proposer is not on the roster, or any candidate is
/// rejected, the reserved record is removed again and nothing is left behind.
pub fn seed_poll<S: PollStore>(
    store: &mut S,
    id: &PollId,
    roster: &Roster,
    kind: PollKind,
    result_sink: &str,
    entries: &[SeedEntry],
) -> Result<Poll, SeedError> {
    store.create_empty(id)?;

    let mut poll = Poll::new(kind, result_sink);
    let outcome = build(&mut poll, roster, entries)
        .and_then(|()| store.save(id, &poll).map_err(SeedError::from));

    if let Err(err) = outcome {
        tracing::warn!(poll = %id, "Seeding failed, rolling back: {err}");
        if let Err(rollback) = store.remove(id) {
            tracing::error!(poll = %id, "Failed to remove partially seeded poll: {rollback}");
        }
        return Err(err);
    }

    tracing::info!(
        poll = %id,
        candidates = poll.candidates().len(),
        kind = kind.as_str(),
        "Poll seeded"
    );
    Ok(poll)
}
