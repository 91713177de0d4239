//! Line commands read from stdin

use crate::error::{CliError, Result};
use cadence_session::SessionCommand;

pub const HELP: &str = "\
Commands:
  play | pause | toggle      control playback
  next | prev                skip forward / back
  seek <ratio>               jump to a fraction of the track (0.0 - 1.0)
  speed <rate>               set playback rate (e.g. 1.5)
  mode                       cycle sequence -> loop -> random
  select <n> | delete <n>    play / remove track n (as numbered by `list`)
  clear                      empty the playlist
  list | hide                show / hide the playlist
  full | small               enter / leave the expanded player
  quit                       stop and exit";

/// One parsed input line
#[derive(Debug, Clone)]
pub enum Line {
    Empty,
    Help,
    Command(SessionCommand),
}

/// Parse a line typed by the user
pub fn parse_line(line: &str) -> Result<Line> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(Line::Empty);
    };
    let name = name.to_ascii_lowercase();
    let arg = words.next();

    let command = match name.as_str() {
        "help" | "?" => return Ok(Line::Help),
        "play" => SessionCommand::Play,
        "pause" => SessionCommand::Pause,
        "toggle" => SessionCommand::TogglePlay,
        "next" => SessionCommand::Next,
        "prev" | "previous" => SessionCommand::Previous,
        "seek" => SessionCommand::Seek(number(&name, arg)?),
        "speed" => SessionCommand::SetSpeed(number(&name, arg)?),
        "mode" => SessionCommand::ChangeMode,
        "select" => SessionCommand::Select(track_number(&name, arg)?),
        "delete" => SessionCommand::Delete(track_number(&name, arg)?),
        "clear" => SessionCommand::Clear,
        "list" => SessionCommand::ShowList,
        "hide" => SessionCommand::HideList,
        "full" => SessionCommand::FullScreen(true),
        "small" => SessionCommand::FullScreen(false),
        "quit" | "exit" => SessionCommand::Shutdown,
        _ => return Err(CliError::UnknownCommand(name)),
    };

    if let Some(extra) = words.next() {
        return Err(invalid(&name, format!("unexpected argument {extra:?}")));
    }
    Ok(Line::Command(command))
}

fn invalid(command: &str, reason: impl Into<String>) -> CliError {
    CliError::InvalidArgument {
        command: command.to_string(),
        reason: reason.into(),
    }
}

fn number<T: std::str::FromStr>(command: &str, arg: Option<&str>) -> Result<T> {
    let arg = arg.ok_or_else(|| invalid(command, "missing value"))?;
    arg.parse()
        .map_err(|_| invalid(command, format!("{arg:?} is not a number")))
}

/// 1-based track number as shown by `list`, returned as an index
fn track_number(command: &str, arg: Option<&str>) -> Result<usize> {
    match number::<usize>(command, arg)? {
        0 => Err(invalid(command, "tracks are numbered from 1")),
        n => Ok(n - 1),
    }
}
