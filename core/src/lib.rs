//! Session layer for Tally.
//!
//! This crate turns a participant's raw commands into voting engine calls: it
//! tracks where each participant is in the voting dialog, enforces argument
//! counts and state preconditions, persists after mutations, and renders the
//! status text and actions a chat transport shows.

mod command;
mod dispatcher;
mod render;
mod session;

pub use command::Command;
pub use dispatcher::{DispatchError, Dispatcher, Outcome};
pub use render::{Action, DEGRADED_WARNING, NOT_LINKED, Screen};
pub use session::{MemorySessions, SessionState, SessionStore};
