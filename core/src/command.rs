//! Inbound command parsing.
//!
//! Commands arrive as plain text, either typed or sent back from an action
//! payload: a name followed by space-separated arguments.

use std::fmt;

use tally_types::Points;

use crate::DispatchError;

/// Parsed command with typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Menu,
    Update,
    Vote,
    VoteSelect(String),
    VotePoints(Points),
    Unvote,
    UnvoteSelect(String),
    Activity(bool),
    Stop,
    Resume,
}

fn expect_args(command: &'static str, args: &[&str], expected: usize) -> Result<(), DispatchError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(DispatchError::BadArgumentCount {
            command,
            expected,
            found: args.len(),
        })
    }
}

impl Command {
    /// Parse `name [args...]`. The argument count is checked here, before any
    /// state or eligibility check.
    pub fn parse(raw: &str) -> Result<Self, DispatchError> {
        let mut parts = raw.split_whitespace();
        let Some(name) = parts.next() else {
            return Err(DispatchError::EmptyCommand);
        };
        let args: Vec<&str> = parts.collect();

        let command = match name {
            "menu" => Command::Menu,
            "update" => Command::Update,
            "vote" => Command::Vote,
            "vote_select" | "vote_sel" => {
                expect_args("vote_select", &args, 1)?;
                Command::VoteSelect(args[0].to_string())
            }
            "vote_points" | "vote_cnt" => {
                expect_args("vote_points", &args, 1)?;
                match args[0].parse::<Points>() {
                    Ok(points) if points > 0 => Command::VotePoints(points),
                    _ => {
                        return Err(DispatchError::BadArgument {
                            command: "vote_points",
                            value: args[0].to_string(),
                        });
                    }
                }
            }
            "unvote" => Command::Unvote,
            "unvote_select" | "unvote_sel" => {
                expect_args("unvote_select", &args, 1)?;
                Command::UnvoteSelect(args[0].to_string())
            }
            "activity" => {
                expect_args("activity", &args, 1)?;
                match args[0] {
                    "true" => Command::Activity(true),
                    "false" => Command::Activity(false),
                    other => {
                        return Err(DispatchError::BadArgument {
                            command: "activity",
                            value: other.to_string(),
                        });
                    }
                }
            }
            "stop" => Command::Stop,
            "resume" => Command::Resume,
            other => return Err(DispatchError::UnknownCommand(other.to_string())),
        };

        if command.argc() == 0 {
            expect_args(command.name(), &args, 0)?;
        }
        Ok(command)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Command::Menu => "menu",
            Command::Update => "update",
            Command::Vote => "vote",
            Command::VoteSelect(_) => "vote_select",
            Command::VotePoints(_) => "vote_points",
            Command::Unvote => "unvote",
            Command::UnvoteSelect(_) => "unvote_select",
            Command::Activity(_) => "activity",
            Command::Stop => "stop",
            Command::Resume => "resume",
        }
    }

    const fn argc(&self) -> usize {
        match self {
            Command::VoteSelect(_)
            | Command::VotePoints(_)
            | Command::UnvoteSelect(_)
            | Command::Activity(_) => 1,
            _ => 0,
        }
    }
}

/// Canonical text form; `Command::parse` reads it back.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::VoteSelect(code) | Command::UnvoteSelect(code) => {
                write!(f, "{} {code}", self.name())
            }
            Command::VotePoints(points) => write!(f, "{} {points}", self.name()),
            Command::Activity(confirmed) => write!(f, "{} {confirmed}", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}
