use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tally_types::{Poll, PollId};
use tally_utils::{AtomicWriteOptions, atomic_write_new, atomic_write_with_options, recover_bak_file};

use crate::{PollStore, StoreError, check_version};

/// One pretty-printed JSON document per poll: `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    options: AtomicWriteOptions,
}

impl FileStore {
    pub const EXTENSION: &'static str = "json";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            options: AtomicWriteOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: AtomicWriteOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, id: &PollId) -> PathBuf {
        self.dir.join(format!("{id}.{}", Self::EXTENSION))
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            location: path.display().to_string(),
            source,
        }
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))
    }

    fn encode(path: &Path, poll: &Poll) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec_pretty(poll).map_err(|source| StoreError::Encode {
            location: path.display().to_string(),
            source,
        })
    }
}

impl PollStore for FileStore {
    fn open(&self, id: &PollId) -> Result<Poll, StoreError> {
        let path = self.path_for(id);
        recover_bak_file(&path);

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()));
            }
            Err(e) => return Err(Self::io_error(&path, e)),
        };
        let poll: Poll = serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            location: path.display().to_string(),
            source,
        })?;
        check_version(path.display().to_string(), &poll)?;

        tracing::debug!(poll = %id, path = %path.display(), "Opened poll");
        Ok(poll)
    }

    fn create_empty(&mut self, id: &PollId) -> Result<Poll, StoreError> {
        self.ensure_dir()?;
        let path = self.path_for(id);
        let poll = Poll::default();
        let bytes = Self::encode(&path, &poll)?;

        match atomic_write_new(&path, &bytes, self.options) {
            Ok(()) => {
                tracing::info!(poll = %id, path = %path.display(), "Created empty poll");
                Ok(poll)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(id.clone()))
            }
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    fn save(&mut self, id: &PollId, poll: &Poll) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let path = self.path_for(id);
        let bytes = Self::encode(&path, poll)?;
        atomic_write_with_options(&path, &bytes, self.options)
            .map_err(|e| Self::io_error(&path, e))?;
        tracing::debug!(poll = %id, bytes = bytes.len(), "Saved poll");
        Ok(())
    }

    fn remove(&mut self, id: &PollId) -> Result<(), StoreError> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(poll = %id, "Removed poll");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    fn exists(&self, id: &PollId) -> bool {
        self.path_for(id).exists()
    }
}
