use derive_more::{Display, Error, From};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum BoardError {
    #[display("({x}, {y}) is outside the {width}x{height} board")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

/// Why a mine layout could not be turned into a board.
#[derive(Debug, Display, Error, From)]
pub enum LayoutError {
    #[display("cannot read board file: {_0}")]
    #[from]
    Io(std::io::Error),
    #[display("board header must be 'WIDTH HEIGHT', got {header:?}")]
    Header { header: String },
    #[display("expected {expected} rows, found {found}")]
    Rows { expected: usize, found: usize },
    #[display("row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[display("row {row}: cell {token:?} is neither 0 nor 1")]
    Cell { row: usize, token: String },
    #[display("layout has {found} cells, expected {expected}")]
    Mines { expected: usize, found: usize },
    #[display("board must have a positive width and height")]
    Empty,
    #[display("a {width}x{height} board has too many cells")]
    TooLarge { width: usize, height: usize },
}

#[derive(Debug, Display, Error, From)]
pub enum ConfigError {
    #[display("board width and height must be positive")]
    EmptyBoard,
    #[display("--size takes one value (N) or two values (WIDTH HEIGHT)")]
    Size,
    #[display("{_0}")]
    #[from]
    Layout(LayoutError),
}
