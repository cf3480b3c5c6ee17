//! One player's connection: reads command lines, applies them to the shared
//! board and writes the reply back to that player only.

use std::{io, sync::Arc};

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use minesweeper_common::protocol::{self, Action, BoardReply, Command};

use crate::{
    logic::{Board, DigResult},
    players::PlayerSlot,
};

/// Longest accepted command line in bytes, terminator excluded.
pub const MAX_LINE: usize = 1024;

/// How a session came to an end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    Bye,
    Boom,
    Disconnected,
    /// The player sent more than [`MAX_LINE`] bytes without a newline.
    LineTooLong,
}

enum Line {
    Complete(Vec<u8>),
    TooLong,
    Eof,
}

pub struct Session {
    id: Uuid,
    board: Arc<Board>,
    slot: PlayerSlot,
    debug: bool,
}

/// Runs a command against the board, or returns `None` if it does not touch it.
///
/// Out of bounds coordinates leave the board alone and still answer with a render.
pub async fn apply(board: &Board, command: &Command) -> Option<BoardReply> {
    let outcome = match *command {
        Command::Look => return Some(BoardReply::Render(board.render().await)),
        Command::Dig(pos) => board.dig(pos).await.map(|result| match result {
            DigResult::Boom => BoardReply::Boom,
            DigResult::Dug(render) => BoardReply::Render(render),
        }),
        Command::Flag(pos) => board.flag(pos).await.map(BoardReply::Render),
        Command::Deflag(pos) => board.deflag(pos).await.map(BoardReply::Render),
        Command::Help | Command::Bye | Command::Invalid => return None,
    };

    match outcome {
        Ok(reply) => Some(reply),
        Err(err) => {
            debug!("Ignoring {:?}: {}", command, err);
            Some(BoardReply::Render(board.render().await))
        }
    }
}

/// Reads up to the next `\n`, never buffering more than [`MAX_LINE`] bytes of it.
async fn next_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Line> {
    let mut raw = Vec::new();
    let read = (&mut *reader)
        .take(MAX_LINE as u64 + 1)
        .read_until(b'\n', &mut raw)
        .await?;

    if read == 0 {
        return Ok(Line::Eof);
    }
    if raw.last() == Some(&b'\n') {
        raw.pop();
    } else if raw.len() > MAX_LINE {
        return Ok(Line::TooLong);
    }
    Ok(Line::Complete(raw))
}

fn decode(mut raw: Vec<u8>) -> Command {
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    match String::from_utf8(raw) {
        Ok(line) => protocol::parse(&line),
        Err(_) => Command::Invalid,
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> io::Result<()> {
    writer.write_all(format!("{text}\n").as_bytes()).await?;
    writer.flush().await
}

impl Session {
    pub fn new(board: Arc<Board>, slot: PlayerSlot, debug: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            board,
            slot,
            debug,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Drives the connection until the player leaves, blows up (outside debug
    /// mode) or disconnects. The player slot is released when this returns,
    /// whatever the outcome.
    #[instrument(level = "debug", skip_all, fields(session = %self.id))]
    pub async fn run<S>(self, stream: S) -> io::Result<SessionEnd>
    where
        S: AsyncRead + AsyncWrite,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        write_line(&mut writer, &protocol::welcome(self.slot.players().count())).await?;

        let end = loop {
            let raw = match next_line(&mut reader).await? {
                Line::Complete(raw) => raw,
                Line::TooLong => break SessionEnd::LineTooLong,
                Line::Eof => break SessionEnd::Disconnected,
            };

            let command = decode(raw);
            debug!("Received {:?}", command);

            let outcome = apply(&self.board, &command).await;
            let reply = protocol::format(&command, outcome, self.debug);
            if let Some(text) = &reply.text {
                write_line(&mut writer, text).await?;
            }

            match reply.action {
                Action::Continue => {}
                Action::CloseNormal => break SessionEnd::Bye,
                Action::CloseBoom => break SessionEnd::Boom,
            }
        };

        if let Err(err) = writer.shutdown().await {
            debug!("Shutdown after {:?} failed: {}", end, err);
        }
        debug!("Session ended: {:?}", end);
        Ok(end)
    }
}
