use std::collections::BTreeMap;

use tally_types::{Poll, PollId};

use crate::{PollStore, StoreError, check_version};

/// Map-backed store. Polls are kept serialized so every `open` returns an
/// independent copy, exactly like reading the file back.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<PollId, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn location(id: &PollId) -> String {
        format!("memory:{id}")
    }

    fn encode(id: &PollId, poll: &Poll) -> Result<String, StoreError> {
        serde_json::to_string(poll).map_err(|source| StoreError::Encode {
            location: Self::location(id),
            source,
        })
    }
}

impl PollStore for MemoryStore {
    fn open(&self, id: &PollId) -> Result<Poll, StoreError> {
        let raw = self
            .records
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let poll: Poll = serde_json::from_str(raw).map_err(|source| StoreError::Parse {
            location: Self::location(id),
            source,
        })?;
        check_version(Self::location(id), &poll)?;
        Ok(poll)
    }

    fn create_empty(&mut self, id: &PollId) -> Result<Poll, StoreError> {
        if self.records.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.clone()));
        }
        let poll = Poll::default();
        let raw = Self::encode(id, &poll)?;
        self.records.insert(id.clone(), raw);
        Ok(poll)
    }

    fn save(&mut self, id: &PollId, poll: &Poll) -> Result<(), StoreError> {
        let raw = Self::encode(id, poll)?;
        self.records.insert(id.clone(), raw);
        Ok(())
    }

    fn remove(&mut self, id: &PollId) -> Result<(), StoreError> {
        self.records.remove(id);
        Ok(())
    }

    fn exists(&self, id: &PollId) -> bool {
        self.records.contains_key(id)
    }
}
