//! Configuration for Tally.
//!
//! ```toml
//! [poll]
//! id = "2026-10"
//! data_dir = "polls"
//! kind = "standard"
//! result_sink = "${TALLY_RESULT_DB}"
//! activity_check = "disabled"
//!
//! [roster]
//! admins = ["alice"]
//!
//! [roster.participants]
//! alice = "Alice Smith"
//! bob = "Bob Jones"
//! ```
//!
//! String values may reference environment variables as `${VAR}`.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use tally_engine::ActivityCheck;
use tally_types::{ExternalId, ParticipantId, PollId, PollKind, Roster};

/// Overrides the default config location.
pub const CONFIG_ENV: &str = "TALLY_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config at {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path,
        }
    }
}

/// Raw file contents, before validation.
#[derive(Debug, Deserialize)]
pub struct TallyConfig {
    pub poll: PollConfig,
    #[serde(default)]
    pub roster: RosterConfig,
}

#[derive(Debug, Deserialize)]
pub struct PollConfig {
    pub id: String,
    /// Relative paths resolve against the config file's directory.
    pub data_dir: Option<String>,
    #[serde(default)]
    pub kind: PollKind,
    #[serde(default)]
    pub result_sink: String,
    #[serde(default)]
    pub activity_check: ActivityCheck,
}

#[derive(Debug, Default, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub admins: Vec<String>,
    /// Chat handle -> workspace identity.
    #[serde(default)]
    pub participants: BTreeMap<String, String>,
}

/// Validated settings ready to wire up a store, engine and dispatcher.
#[derive(Debug, Clone)]
pub struct Settings {
    pub path: PathBuf,
    pub poll_id: PollId,
    pub data_dir: PathBuf,
    pub kind: PollKind,
    pub result_sink: String,
    pub activity_check: ActivityCheck,
    pub roster: Roster,
}

/// Replace every `${VAR}` with the variable's value (empty if unset).
///
/// An unterminated `${` and an empty `${}` are kept verbatim.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                out.push_str(&env::var(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            Some(_) => {
                out.push_str("${}");
                rest = &after[1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Config file location: `$TALLY_CONFIG`, else `~/.tally/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    match env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => dirs::home_dir().map(|home| home.join(".tally").join("config.toml")),
    }
}

fn default_data_dir(config_dir: &Path) -> PathBuf {
    dirs::home_dir().map_or_else(
        || config_dir.join("polls"),
        |home| home.join(".tally").join("polls"),
    )
}

impl TallyConfig {
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), "Failed to read config: {err}");
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        let raw = match Self::parse(&content) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(path = %path.display(), "Failed to parse config: {err}");
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        raw.resolve(path)
    }

    /// Expand variables, validate ids and build the roster.
    pub fn resolve(self, path: &Path) -> Result<Settings, ConfigError> {
        let invalid = |message: String| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        };
        let config_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let poll_id = PollId::new(expand_env_vars(&self.poll.id))
            .map_err(|e| invalid(format!("poll.id: {e}")))?;

        let data_dir = match self.poll.data_dir.as_deref().map(expand_env_vars) {
            Some(dir) if dir.trim().is_empty() => {
                return Err(invalid("poll.data_dir must not be empty".to_string()));
            }
            Some(dir) => config_dir.join(dir),
            None => default_data_dir(config_dir),
        };

        let members = self.roster.participants.into_iter().map(|(handle, external)| {
            (
                ParticipantId::new(handle),
                ExternalId::new(expand_env_vars(&external)),
            )
        });
        let admins = self.roster.admins.into_iter().map(ParticipantId::new);
        let roster = Roster::new(members, admins).map_err(|e| invalid(format!("roster: {e}")))?;
        if roster.is_empty() {
            tracing::warn!(path = %path.display(), "Roster has no participants");
        }

        Ok(Settings {
            path: path.to_path_buf(),
            poll_id,
            data_dir,
            kind: self.poll.kind,
            result_sink: expand_env_vars(&self.poll.result_sink),
            activity_check: self.poll.activity_check,
            roster,
        })
    }

    /// Load from `explicit`, or from [`config_path`] when `None`.
    pub fn load(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => config_path().ok_or_else(|| ConfigError::Invalid {
                path: PathBuf::new(),
                message: format!("cannot locate home directory; set {CONFIG_ENV}"),
            })?,
        };
        Self::load_from(&path)
    }
}
