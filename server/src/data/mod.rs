#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealedState {
    Untouched,
    Dug,
    Flagged,
}

#[derive(Debug)]
pub struct Cell {
    pub bomb: bool,
    pub revealed: RevealedState,
}

/// Row-major grid of cells; `bombs` counts the mines still on the field.
#[derive(Debug)]
pub struct Field {
    pub width: usize,
    pub height: usize,
    pub bombs: usize,
    pub cells: Vec<Cell>,
}
