//! Command argument vectors

use crate::CommandError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered, non-empty list of arguments submitted to a remctl server.
///
/// Argument 0 is conventionally the command verb, for example the name of
/// a subsystem configured on the server. Once built a `Command` cannot be
/// changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Command {
    args: Vec<String>,
}

impl Command {
    /// Build a command, validating that it is non-empty and NUL free
    pub fn new<I, S>(args: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        if args.is_empty() {
            return Err(CommandError::Empty);
        }

        if let Some(index) = args.iter().position(|arg| arg.contains('\0')) {
            return Err(CommandError::EmbeddedNul { index });
        }

        Ok(Self { args })
    }

    /// The command verb (argument 0)
    pub fn verb(&self) -> &str {
        &self.args[0]
    }

    /// All arguments, verb included
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Number of arguments, verb included
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Arguments as the byte strings a transport puts on the wire
    pub fn to_argv(&self) -> Vec<Vec<u8>> {
        self.args.iter().map(|arg| arg.as_bytes().to_vec()).collect()
    }
}

impl TryFrom<Vec<String>> for Command {
    type Error = CommandError;

    fn try_from(args: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(args)
    }
}

impl TryFrom<&[&str]> for Command {
    type Error = CommandError;

    fn try_from(args: &[&str]) -> Result<Self, Self::Error> {
        Self::new(args.iter().copied())
    }
}

impl From<Command> for Vec<String> {
    fn from(command: Command) -> Self {
        command.args
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}
