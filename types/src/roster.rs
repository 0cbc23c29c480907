//! Known participants, their workspace identities, and the admin allow-list.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::{ExternalId, ParticipantId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("external id '{external}' is mapped to both '{first}' and '{second}'")]
    DuplicateExternalId {
        external: ExternalId,
        first: ParticipantId,
        second: ParticipantId,
    },
    #[error("admin '{0}' is not a known participant")]
    UnknownAdmin(ParticipantId),
}

/// Identity mapping between chat handles and workspace identities.
///
/// Only participants on the roster may interact with a poll. The mapping is
/// one-to-one so seeding (external → handle) and export (handle → external)
/// agree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    members: BTreeMap<ParticipantId, ExternalId>,
    by_external: BTreeMap<ExternalId, ParticipantId>,
    admins: BTreeSet<ParticipantId>,
}

impl Roster {
    pub fn new(
        members: impl IntoIterator<Item = (ParticipantId, ExternalId)>,
        admins: impl IntoIterator<Item = ParticipantId>,
    ) -> Result<Self, RosterError> {
        let mut roster = Self::default();
        for (participant, external) in members {
            if let Some(first) = roster.by_external.get(&external) {
                return Err(RosterError::DuplicateExternalId {
                    external,
                    first: first.clone(),
                    second: participant,
                });
            }
            roster
                .by_external
                .insert(external.clone(), participant.clone());
            roster.members.insert(participant, external);
        }
        for admin in admins {
            if !roster.members.contains_key(&admin) {
                return Err(RosterError::UnknownAdmin(admin));
            }
            roster.admins.insert(admin);
        }
        Ok(roster)
    }

    #[must_use]
    pub fn is_member(&self, participant: &ParticipantId) -> bool {
        self.members.contains_key(participant)
    }

    #[must_use]
    pub fn is_admin(&self, participant: &ParticipantId) -> bool {
        self.admins.contains(participant)
    }

    #[must_use]
    pub fn external_id(&self, participant: &ParticipantId) -> Option<&ExternalId> {
        self.members.get(participant)
    }

    /// Chat handle for a workspace identity.
    #[must_use]
    pub fn resolve_external(&self, external: &ExternalId) -> Option<&ParticipantId> {
        self.by_external.get(external)
    }

    pub fn members(&self) -> impl Iterator<Item = &ParticipantId> {
        self.members.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
