//! Poll Store - durable representation of one poll per id.
//!
//! Every operation touches exactly one record. A poll is created empty
//! (reserving its id), filled by the caller, and saved back in full after each
//! mutation. [`FileStore`] keeps one JSON document per poll and replaces it
//! atomically; [`MemoryStore`] is the map-backed equivalent for tests and dry runs.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use tally_types::{Poll, PollId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("poll '{0}' not found")]
    NotFound(PollId),
    #[error("poll '{0}' already exists")]
    AlreadyExists(PollId),
    #[error("failed to access {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {location}: {source}")]
    Encode {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{location} has schema version {found}, expected {expected}")]
    UnsupportedVersion {
        location: String,
        found: u32,
        expected: u32,
    },
}

/// Load/save lifecycle of polls.
pub trait PollStore {
    /// Load the poll stored under `id`.
    fn open(&self, id: &PollId) -> Result<Poll, StoreError>;

    /// Reserve `id` with an empty poll. Fails if a poll with that id exists.
    fn create_empty(&mut self, id: &PollId) -> Result<Poll, StoreError>;

    /// Replace the stored poll. After a crash the record holds either the old or
    /// the new document.
    fn save(&mut self, id: &PollId, poll: &Poll) -> Result<(), StoreError>;

    /// Drop the record. Only used to roll back a failed round initialization.
    fn remove(&mut self, id: &PollId) -> Result<(), StoreError>;

    fn exists(&self, id: &PollId) -> bool;
}

fn check_version(location: String, poll: &Poll) -> Result<(), StoreError> {
    if poll.is_compatible() {
        Ok(())
    } else {
        Err(StoreError::UnsupportedVersion {
            location,
            found: poll.version(),
            expected: Poll::CURRENT_VERSION,
        })
    }
}
