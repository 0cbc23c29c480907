//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::io;

use tally_engine::SeedEntry;
use tally_store::{MemoryStore, PollStore, StoreError};
use tally_types::{ExternalId, ParticipantId, Poll, PollId, Roster};

pub fn pid(handle: &str) -> ParticipantId {
    ParticipantId::new(handle)
}

pub fn poll_id() -> PollId {
    PollId::new("2026-10").unwrap()
}

/// alice (admin), bob, carol and dave, linked to workspace names.
pub fn roster() -> Roster {
    Roster::new(
        [
            (pid("alice"), ExternalId::new("Alice Smith")),
            (pid("bob"), ExternalId::new("Bob Jones")),
            (pid("carol"), ExternalId::new("Carol White")),
            (pid("dave"), ExternalId::new("Dave Brown")),
        ],
        [pid("alice")],
    )
    .unwrap()
}

pub fn entry(text: &str, proposer: &str, page: &str) -> SeedEntry {
    SeedEntry {
        text: text.to_string(),
        proposer: ExternalId::new(proposer),
        id: ExternalId::new(page),
    }
}

/// Four nominations: one each from bob and dave, two from carol.
pub fn nominations() -> Vec<SeedEntry> {
    vec![
        entry("Мастер и Маргарита", "Bob Jones", "page-1"),
        entry("Пикник на обочине", "Carol White", "page-2"),
        entry("Solaris", "Carol White", "page-3"),
        entry("The Left Hand of Darkness", "Dave Brown", "page-4"),
    ]
}

/// Store whose saves can be switched to fail, to exercise degraded mode.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_saves: bool,
    pub failed_saves: usize,
}

impl FlakyStore {
    pub fn seeded(id: &PollId, poll: &Poll) -> Self {
        let mut inner = MemoryStore::new();
        inner.create_empty(id).unwrap();
        inner.save(id, poll).unwrap();
        Self {
            inner,
            ..Self::default()
        }
    }
}

impl PollStore for FlakyStore {
    fn open(&self, id: &PollId) -> Result<Poll, StoreError> {
        self.inner.open(id)
    }

    fn create_empty(&mut self, id: &PollId) -> Result<Poll, StoreError> {
        self.inner.create_empty(id)
    }

    fn save(&mut self, id: &PollId, poll: &Poll) -> Result<(), StoreError> {
        if self.fail_saves {
            self.failed_saves += 1;
            return Err(StoreError::Io {
                location: format!("flaky:{id}"),
                source: io::Error::other("disk full"),
            });
        }
        self.inner.save(id, poll)
    }

    fn remove(&mut self, id: &PollId) -> Result<(), StoreError> {
        self.inner.remove(id)
    }

    fn exists(&self, id: &PollId) -> bool {
        self.inner.exists(id)
    }
}
