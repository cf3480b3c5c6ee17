//! Line protocol spoken between players and the server.
//!
//! Parsing and formatting are pure: [`parse`] turns one input line into a
//! [`Command`], and [`format`] turns a command together with the board's answer
//! into a [`Reply`] carrying the text to send and what to do with the
//! connection afterwards.

use crate::models::Pos;

pub const BOOM: &str = "BOOM!";
pub const BYE: &str = "Connection stopped";
pub const HELP: &str = "Type 'look' to see the board\n\
Type 'dig x y' to dig the square at column x, row y\n\
Type 'flag x y' to flag the square at column x, row y\n\
Type 'deflag x y' to remove the flag at column x, row y\n\
Type 'help' to show this message\n\
Type 'bye' to leave the game";

pub fn welcome(players: usize) -> String {
    format!(
        "Welcome to Minesweeper. {players} people are playing including you. Type 'help' for help."
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Look,
    Dig(Pos),
    Flag(Pos),
    Deflag(Pos),
    Help,
    Bye,
    Invalid,
}

/// What the board answered for a command that touched it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardReply {
    Render(String),
    Boom,
}

/// What happens to the connection once the reply has been written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Continue,
    CloseNormal,
    CloseBoom,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: Option<String>,
    pub action: Action,
}

impl Reply {
    fn send(text: impl Into<String>, action: Action) -> Self {
        Self {
            text: Some(text.into()),
            action,
        }
    }

    fn silent() -> Self {
        Self {
            text: None,
            action: Action::Continue,
        }
    }
}

/// Parses one line (without its terminator).
///
/// The grammar is strict: a single space between tokens, no leading or
/// trailing whitespace and coordinates made of ASCII digits only. Anything
/// else is [`Command::Invalid`].
pub fn parse(line: &str) -> Command {
    let mut tokens = line.split(' ');
    let verb = tokens.next().unwrap_or_default();
    let args: Vec<&str> = tokens.collect();

    match (verb, args.as_slice()) {
        ("look", []) => Command::Look,
        ("help", []) => Command::Help,
        ("bye", []) => Command::Bye,
        ("dig", [x, y]) => coords(x, y).map_or(Command::Invalid, Command::Dig),
        ("flag", [x, y]) => coords(x, y).map_or(Command::Invalid, Command::Flag),
        ("deflag", [x, y]) => coords(x, y).map_or(Command::Invalid, Command::Deflag),
        _ => Command::Invalid,
    }
}

fn coords(x: &str, y: &str) -> Option<Pos> {
    Some(Pos::new(coord(x)?, coord(y)?))
}

fn coord(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Values past usize::MAX cannot name a cell on any board.
    token.parse().ok()
}

/// Maps a command and the board's answer to the reply sent to the player.
///
/// `outcome` is `None` for commands that never reach the board.
pub fn format(command: &Command, outcome: Option<BoardReply>, debug: bool) -> Reply {
    match (command, outcome) {
        (Command::Help, _) => Reply::send(HELP, Action::Continue),
        (Command::Bye, _) => Reply::send(BYE, Action::CloseNormal),
        (Command::Invalid, _) => Reply::silent(),
        (Command::Dig(_), Some(BoardReply::Boom)) => {
            let action = if debug {
                Action::Continue
            } else {
                Action::CloseBoom
            };
            Reply::send(BOOM, action)
        }
        (_, Some(BoardReply::Render(board))) => Reply::send(board, Action::Continue),
        (_, Some(BoardReply::Boom) | None) => Reply::silent(),
    }
}
