//! Line commands understood by the interactive loop.

use std::str::FromStr;
use std::time::Duration;

use crate::routes::{DeepLink, LinkError};

pub const HELP: &str = "\
commands:
  go <route>        navigate from the front screen, e.g. `go community`
  link <dom>/<rt>   deliver a deep link, e.g. `link authorized/notice:7`
  back              dismiss from the front screen
  root              pop the front router to its root
  foreground        replay the pending deep link
  signin | signout  change the session
  online | offline  change connectivity
  pending           show the persisted deep link
  show              render the current screen tree
  wait <ms>         let timers run
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go(String),
    Link(DeepLink),
    Back,
    Root,
    Foreground,
    SignIn,
    SignOut,
    Online,
    Offline,
    Pending,
    Show,
    Wait(Duration),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid duration {0:?}")]
    InvalidDuration(String),
    #[error(transparent)]
    Link(#[from] LinkError),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (line, None),
        };
        let require = |name: &'static str| arg.ok_or(CommandError::MissingArgument(name));

        let command = match verb.to_ascii_lowercase().as_str() {
            "" => return Err(CommandError::Empty),
            "go" | "push" => Command::Go(require("go")?.to_string()),
            "link" | "deeplink" => Command::Link(require("link")?.parse()?),
            "back" | "dismiss" => Command::Back,
            "root" | "pop-to-root" => Command::Root,
            "foreground" | "fg" => Command::Foreground,
            "signin" | "sign-in" => Command::SignIn,
            "signout" | "sign-out" => Command::SignOut,
            "online" => Command::Online,
            "offline" => Command::Offline,
            "pending" => Command::Pending,
            "show" | "render" => Command::Show,
            "wait" => {
                let raw = require("wait")?;
                let ms = raw
                    .parse::<u64>()
                    .map_err(|_| CommandError::InvalidDuration(raw.to_string()))?;
                Command::Wait(Duration::from_millis(ms))
            }
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}
