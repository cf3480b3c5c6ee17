use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use clap::Parser;

use minesweeper_common::models::GameParams;

use crate::{error::ConfigError, logic::Board};

pub const DEFAULT_PORT: u16 = 4444;

/// Multiplayer minesweeper over a plain text protocol.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "MINESWEEPER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Address to bind to
    #[arg(long, env = "MINESWEEPER_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,
    /// Report booms without closing the player's connection
    #[arg(short, long, env = "MINESWEEPER_DEBUG")]
    pub debug: bool,
    /// Random board size: `N` for an NxN board, or `WIDTH HEIGHT`
    #[arg(
        short,
        long,
        num_args = 1..=2,
        value_names = ["WIDTH", "HEIGHT"],
        conflicts_with = "file"
    )]
    pub size: Option<Vec<usize>>,
    /// Number of mines on a random board
    #[arg(short, long, conflicts_with = "file")]
    pub bombs: Option<usize>,
    /// Load the board from a file instead of generating one
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardSource {
    Random(GameParams),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub debug: bool,
    pub board: BoardSource,
}

impl TryFrom<Args> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let board = match args.file {
            Some(path) => BoardSource::File(path),
            None => {
                let mut params = match args.size.as_deref() {
                    None => GameParams::default(),
                    Some(&[size]) => GameParams::square(size),
                    Some(&[width, height]) => GameParams {
                        width,
                        height,
                        bombs: width.saturating_mul(height) / 4,
                    },
                    Some(_) => return Err(ConfigError::Size),
                };
                if params.width == 0 || params.height == 0 {
                    return Err(ConfigError::EmptyBoard);
                }
                if let Some(bombs) = args.bombs {
                    params.bombs = bombs;
                }
                BoardSource::Random(params)
            }
        };

        Ok(Self {
            addr: SocketAddr::new(args.host, args.port),
            debug: args.debug,
            board,
        })
    }
}

impl ServerConfig {
    pub async fn build_board(&self) -> Result<Board, ConfigError> {
        let board = match &self.board {
            BoardSource::Random(params) => Board::random(*params)?,
            BoardSource::File(path) => Board::from_file(path).await?,
        };
        Ok(board)
    }
}
