/// A cell coordinate: `x` is the column, `y` is the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Parameters for a randomly generated board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameParams {
    pub width: usize,
    pub height: usize,
    pub bombs: usize,
}

impl GameParams {
    /// A `size`×`size` board where a quarter of the cells hold mines.
    pub fn square(size: usize) -> Self {
        Self {
            width: size,
            height: size,
            bombs: size.saturating_mul(size) / 4,
        }
    }

    /// Cell count, saturating at `usize::MAX` for absurd dimensions.
    pub fn cells(&self) -> usize {
        self.width.saturating_mul(self.height)
    }
}

impl Default for GameParams {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            bombs: 25,
        }
    }
}
