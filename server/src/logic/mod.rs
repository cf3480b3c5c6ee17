use std::{cmp::min, path::Path};

use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use minesweeper_common::models::{GameParams, Pos};

use crate::{
    data::{Cell, Field, RevealedState},
    error::{BoardError, LayoutError},
};

/// The shared game board.
///
/// All state lives behind one lock, so every operation (including a whole
/// flood reveal) is observed by other players as a single step.
#[derive(Debug)]
pub struct Board {
    width: usize,
    height: usize,
    field: Mutex<Field>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DigResult {
    /// The dig went through (or was a no-op); carries the render taken right after it.
    Dug(String),
    Boom,
}

/// Largest board accepted, in cells.
pub const MAX_CELLS: usize = 1 << 24;

fn check_dimensions(width: usize, height: usize) -> Result<usize, LayoutError> {
    if width == 0 || height == 0 {
        return Err(LayoutError::Empty);
    }
    match width.checked_mul(height) {
        Some(cells) if cells <= MAX_CELLS => Ok(cells),
        _ => Err(LayoutError::TooLarge { width, height }),
    }
}

fn validate_params(params: &mut GameParams) {
    params.bombs = min(params.bombs, params.cells())
}

fn generate_bombs(params: &GameParams, rng: &mut impl Rng) -> Vec<bool> {
    let mut bombs = Vec::with_capacity(params.cells());

    let mut bombs_left = params.bombs;
    for cells_left in (1..=params.cells()).rev() {
        let value = rng.random_ratio(bombs_left as u32, cells_left as u32);
        bombs.push(value);
        if value {
            bombs_left -= 1;
        }
    }

    bombs
}

impl Field {
    fn new(width: usize, height: usize, bombs: Vec<bool>) -> Self {
        Self {
            width,
            height,
            bombs: bombs.iter().filter(|bomb| **bomb).count(),
            cells: bombs
                .into_iter()
                .map(|bomb| Cell {
                    bomb,
                    revealed: RevealedState::Untouched,
                })
                .collect(),
        }
    }

    fn offset(&self, pos: Pos) -> Result<usize, BoardError> {
        if pos.x < self.width && pos.y < self.height {
            Ok(pos.x + pos.y * self.width)
        } else {
            Err(BoardError::OutOfBounds {
                x: pos.x,
                y: pos.y,
                width: self.width,
                height: self.height,
            })
        }
    }

    fn neighbors(&self, pos: Pos) -> Vec<Pos> {
        let mut neighbors = Vec::with_capacity(8);

        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }

                if let (Some(x), Some(y)) =
                    (pos.x.checked_add_signed(dx), pos.y.checked_add_signed(dy))
                    && x < self.width
                    && y < self.height
                {
                    neighbors.push(Pos { x, y });
                }
            }
        }

        neighbors
    }

    fn adjacent_bombs(&self, pos: Pos) -> usize {
        self.neighbors(pos)
            .into_iter()
            .filter(|n| self.cells[n.x + n.y * self.width].bomb)
            .count()
    }

    /// Returns `true` when the dig set off a mine.
    fn dig(&mut self, pos: Pos) -> Result<bool, BoardError> {
        let index = self.offset(pos)?;
        let cell = &mut self.cells[index];

        if cell.revealed != RevealedState::Untouched {
            return Ok(false);
        }

        cell.revealed = RevealedState::Dug;
        if cell.bomb {
            // The mine is spent; later digs and reads see a plain cell.
            cell.bomb = false;
            self.bombs -= 1;
            return Ok(true);
        }

        self.reveal_from(pos);
        Ok(false)
    }

    /// Flood reveal starting at an already dug cell.
    fn reveal_from(&mut self, start: Pos) {
        let mut pending = vec![start];

        while let Some(pos) = pending.pop() {
            if self.adjacent_bombs(pos) != 0 {
                continue;
            }

            for next in self.neighbors(pos) {
                let cell = &mut self.cells[next.x + next.y * self.width];
                if cell.revealed == RevealedState::Untouched && !cell.bomb {
                    cell.revealed = RevealedState::Dug;
                    pending.push(next);
                }
            }
        }
    }

    fn flag(&mut self, pos: Pos) -> Result<(), BoardError> {
        let index = self.offset(pos)?;
        let cell = &mut self.cells[index];
        if cell.revealed == RevealedState::Untouched {
            cell.revealed = RevealedState::Flagged;
        }
        Ok(())
    }

    fn deflag(&mut self, pos: Pos) -> Result<(), BoardError> {
        let index = self.offset(pos)?;
        let cell = &mut self.cells[index];
        if cell.revealed == RevealedState::Flagged {
            cell.revealed = RevealedState::Untouched;
        }
        Ok(())
    }

    fn symbol(&self, pos: Pos, cell: &Cell) -> char {
        match cell.revealed {
            RevealedState::Untouched => '-',
            RevealedState::Flagged => 'F',
            RevealedState::Dug => match self.adjacent_bombs(pos) {
                0 => ' ',
                n => char::from(b'0' + n as u8),
            },
        }
    }

    fn render(&self) -> String {
        self.cells
            .chunks(self.width)
            .enumerate()
            .map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .map(|(x, cell)| self.symbol(Pos { x, y }, cell).to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Board {
    fn new(field: Field) -> Self {
        Self {
            width: field.width,
            height: field.height,
            field: Mutex::new(field),
        }
    }

    pub fn random(params: GameParams) -> Result<Self, LayoutError> {
        Self::random_with(params, &mut rand::rng())
    }

    #[instrument(level = "debug", skip(rng))]
    pub fn random_with(mut params: GameParams, rng: &mut impl Rng) -> Result<Self, LayoutError> {
        check_dimensions(params.width, params.height)?;
        validate_params(&mut params);

        let bombs = generate_bombs(&params, rng);
        info!(
            "Generated {}x{} board with {} bombs",
            params.width, params.height, params.bombs
        );
        Ok(Self::new(Field::new(params.width, params.height, bombs)))
    }

    /// Builds a board from a row-major mine layout.
    pub fn from_mines(width: usize, height: usize, bombs: Vec<bool>) -> Result<Self, LayoutError> {
        let cells = check_dimensions(width, height)?;
        if bombs.len() != cells {
            return Err(LayoutError::Mines {
                expected: cells,
                found: bombs.len(),
            });
        }
        Ok(Self::new(Field::new(width, height, bombs)))
    }

    /// Parses a board description: a `WIDTH HEIGHT` header followed by
    /// `HEIGHT` rows of `WIDTH` space separated `0`/`1` values.
    pub fn from_description(text: &str) -> Result<Self, LayoutError> {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

        let header = lines.next().unwrap_or_default();
        let dims: Vec<usize> = header
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| LayoutError::Header {
                header: header.to_string(),
            })?;
        let [width, height] = dims[..] else {
            return Err(LayoutError::Header {
                header: header.to_string(),
            });
        };

        let cells = check_dimensions(width, height)?;

        let rows: Vec<&str> = lines.collect();
        if rows.len() != height {
            return Err(LayoutError::Rows {
                expected: height,
                found: rows.len(),
            });
        }

        let mut bombs = Vec::with_capacity(cells);
        for (row, line) in rows.into_iter().enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != width {
                return Err(LayoutError::RowWidth {
                    row,
                    expected: width,
                    found: tokens.len(),
                });
            }
            for token in tokens {
                match token {
                    "0" => bombs.push(false),
                    "1" => bombs.push(true),
                    _ => {
                        return Err(LayoutError::Cell {
                            row,
                            token: token.to_string(),
                        });
                    }
                }
            }
        }

        Self::from_mines(width, height, bombs)
    }

    #[instrument(level = "debug")]
    pub async fn from_file(path: &Path) -> Result<Self, LayoutError> {
        let text = tokio::fs::read_to_string(path).await?;
        let board = Self::from_description(&text)?;
        info!(
            "Loaded {}x{} board from {}",
            board.width,
            board.height,
            path.display()
        );
        Ok(board)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Mines still on the board.
    pub async fn bombs(&self) -> usize {
        self.field.lock().await.bombs
    }

    pub async fn has_mine(&self, pos: Pos) -> Result<bool, BoardError> {
        let field = self.field.lock().await;
        let index = field.offset(pos)?;
        Ok(field.cells[index].bomb)
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn dig(&self, pos: Pos) -> Result<DigResult, BoardError> {
        let mut field = self.field.lock().await;
        if field.dig(pos)? {
            debug!("Mine at ({}, {}) went off", pos.x, pos.y);
            return Ok(DigResult::Boom);
        }
        Ok(DigResult::Dug(field.render()))
    }

    /// Flags an untouched cell and returns the render taken under the same lock.
    pub async fn flag(&self, pos: Pos) -> Result<String, BoardError> {
        let mut field = self.field.lock().await;
        field.flag(pos)?;
        Ok(field.render())
    }

    pub async fn deflag(&self, pos: Pos) -> Result<String, BoardError> {
        let mut field = self.field.lock().await;
        field.deflag(pos)?;
        Ok(field.render())
    }

    pub async fn render(&self) -> String {
        self.field.lock().await.render()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn board(description: &str) -> Board {
        Board::from_description(description).expect("valid description")
    }

    fn dug(render: &str) -> DigResult {
        DigResult::Dug(render.to_string())
    }

    #[tokio::test]
    async fn fresh_board_is_untouched() {
        let board = board("3 2\n0 1 0\n0 0 0\n");
        assert_eq!(board.render().await, "- - -\n- - -");
        assert_eq!(board.bombs().await, 1);
    }

    #[tokio::test]
    async fn flag_then_deflag_restores_render() {
        let board = board("3 2\n0 1 0\n0 0 0");
        let before = board.render().await;

        let flagged = board.flag(Pos::new(2, 1)).await.unwrap();
        assert_eq!(flagged, "- - -\n- - F");
        assert_eq!(board.render().await, flagged);

        let restored = board.deflag(Pos::new(2, 1)).await.unwrap();
        assert_eq!(restored, before);
        assert_eq!(board.render().await, before);
    }

    #[tokio::test]
    async fn flag_and_deflag_are_idempotent() {
        let board = board("2 1\n0 1");
        board.flag(Pos::new(0, 0)).await.unwrap();
        board.flag(Pos::new(0, 0)).await.unwrap();
        assert_eq!(board.render().await, "F -");

        board.deflag(Pos::new(0, 0)).await.unwrap();
        board.deflag(Pos::new(0, 0)).await.unwrap();
        board.deflag(Pos::new(1, 0)).await.unwrap();
        assert_eq!(board.render().await, "- -");
    }

    #[tokio::test]
    async fn flag_on_dug_cell_is_ignored() {
        let board = board("2 1\n0 1");
        board.dig(Pos::new(0, 0)).await.unwrap();
        board.flag(Pos::new(0, 0)).await.unwrap();
        assert_eq!(board.render().await, "1 -");
    }

    #[tokio::test]
    async fn second_dig_is_a_no_op() {
        let board = board("3 1\n1 0 0");
        let first = board.dig(Pos::new(1, 0)).await.unwrap();
        assert_eq!(first, dug("- 1 -"));
        assert_eq!(board.dig(Pos::new(1, 0)).await.unwrap(), first);
    }

    #[tokio::test]
    async fn digging_flagged_cell_does_nothing() {
        let board = board("2 1\n1 0");
        board.flag(Pos::new(0, 0)).await.unwrap();
        assert_eq!(board.dig(Pos::new(0, 0)).await.unwrap(), dug("F -"));
        assert!(board.has_mine(Pos::new(0, 0)).await.unwrap());
    }

    #[tokio::test]
    async fn empty_board_floods_completely() {
        let board = Board::from_mines(8, 8, vec![false; 64]).unwrap();
        let DigResult::Dug(render) = board.dig(Pos::new(3, 3)).await.unwrap() else {
            panic!("no mines on this board");
        };

        let row = vec![" "; 8].join(" ");
        assert_eq!(render, vec![row; 8].join("\n"));
    }

    #[tokio::test]
    async fn flood_stops_at_numbered_cells_and_mines() {
        let board = board("4 3\n0 0 0 1\n0 0 0 0\n0 0 0 0");
        let result = board.dig(Pos::new(0, 0)).await.unwrap();
        assert_eq!(result, dug("    1 -\n    1 1\n       "));
    }

    #[tokio::test]
    async fn flood_does_not_cross_flags() {
        let board = board("5 1\n0 0 0 0 0");
        board.flag(Pos::new(2, 0)).await.unwrap();
        let result = board.dig(Pos::new(0, 0)).await.unwrap();
        assert_eq!(result, dug("    F - -"));
    }

    #[tokio::test]
    async fn boom_consumes_the_mine() {
        let board = board("3 1\n1 0 0");
        board.dig(Pos::new(1, 0)).await.unwrap();

        assert!(board.has_mine(Pos::new(0, 0)).await.unwrap());
        assert_eq!(board.dig(Pos::new(0, 0)).await.unwrap(), DigResult::Boom);
        assert!(!board.has_mine(Pos::new(0, 0)).await.unwrap());
        assert_eq!(board.bombs().await, 0);

        // Neighbor counts follow the remaining mines.
        assert_eq!(board.render().await, "    -");
        assert_eq!(board.dig(Pos::new(0, 0)).await.unwrap(), dug("    -"));
    }

    #[tokio::test]
    async fn out_of_bounds_is_reported_and_harmless() {
        let board = board("2 2\n0 1\n0 0");
        let before = board.render().await;
        let outside = Pos::new(2, 0);
        let expected = BoardError::OutOfBounds {
            x: 2,
            y: 0,
            width: 2,
            height: 2,
        };

        assert_eq!(board.dig(outside).await, Err(expected));
        assert_eq!(board.flag(outside).await, Err(expected));
        assert!(board.deflag(Pos::new(0, 9)).await.is_err());
        assert_eq!(board.has_mine(outside).await, Err(expected));
        assert_eq!(board.render().await, before);
    }

    #[tokio::test]
    async fn render_is_stable_without_mutation() {
        let board = board("3 3\n1 0 0\n0 0 0\n0 0 1");
        board.dig(Pos::new(2, 0)).await.unwrap();
        assert_eq!(board.render().await, board.render().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_digs_boom_once() {
        let board = Arc::new(board("3 3\n0 0 0\n0 1 0\n0 0 0"));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let board = Arc::clone(&board);
                tokio::spawn(async move { board.dig(Pos::new(1, 1)).await })
            })
            .collect();

        let mut booms = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                DigResult::Boom => booms += 1,
                DigResult::Dug(render) => assert_eq!(render, "- - -\n-   -\n- - -"),
            }
        }
        assert_eq!(booms, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_floods_are_never_seen_half_done() {
        let board = Arc::new(Board::from_mines(40, 40, vec![false; 1600]).unwrap());
        let untouched = board.render().await;
        let revealed = vec![vec![" "; 40].join(" "); 40].join("\n");

        let digger = {
            let board = Arc::clone(&board);
            tokio::spawn(async move { board.dig(Pos::new(20, 20)).await })
        };
        let readers: Vec<_> = (0..8)
            .map(|_| {
                let board = Arc::clone(&board);
                tokio::spawn(async move { board.render().await })
            })
            .collect();

        digger.await.unwrap().unwrap();
        for reader in readers {
            let seen = reader.await.unwrap();
            assert!(seen == untouched || seen == revealed);
        }
    }

    #[test]
    fn random_board_places_exact_bomb_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let params = GameParams {
            width: 12,
            height: 9,
            bombs: 20,
        };
        let bombs = generate_bombs(&params, &mut rng);
        assert_eq!(bombs.len(), 108);
        assert_eq!(bombs.iter().filter(|b| **b).count(), 20);
    }

    #[tokio::test]
    async fn random_board_clamps_bombs() {
        let mut rng = StdRng::seed_from_u64(1);
        let params = GameParams {
            width: 2,
            height: 2,
            bombs: 50,
        };
        let board = Board::random_with(params, &mut rng).unwrap();
        assert_eq!(board.bombs().await, 4);
    }

    #[test]
    fn empty_dimensions_are_rejected() {
        let params = GameParams {
            width: 0,
            height: 5,
            bombs: 0,
        };
        assert!(matches!(Board::random(params), Err(LayoutError::Empty)));
        assert!(matches!(
            Board::from_mines(3, 0, Vec::new()),
            Err(LayoutError::Empty)
        ));
        assert!(matches!(
            Board::from_description("0 0"),
            Err(LayoutError::Empty)
        ));
    }

    #[test]
    fn oversized_boards_are_rejected() {
        assert!(matches!(
            Board::from_description("18446744073709551615 1\n0"),
            Err(LayoutError::TooLarge { height: 1, .. })
        ));
        assert!(matches!(
            Board::from_description("9223372036854775808 2\n0\n0"),
            Err(LayoutError::TooLarge { .. })
        ));
        assert!(matches!(
            Board::from_description("5000 5000\n0"),
            Err(LayoutError::TooLarge {
                width: 5000,
                height: 5000
            })
        ));
        assert!(matches!(
            Board::from_mines(usize::MAX, 2, Vec::new()),
            Err(LayoutError::TooLarge { .. })
        ));
        assert!(matches!(
            Board::random(GameParams::square(5_000_000_000)),
            Err(LayoutError::TooLarge { .. })
        ));
    }

    #[test]
    fn malformed_descriptions_are_rejected() {
        assert!(matches!(
            Board::from_description("3"),
            Err(LayoutError::Header { .. })
        ));
        assert!(matches!(
            Board::from_description("a b\n0"),
            Err(LayoutError::Header { .. })
        ));
        assert!(matches!(
            Board::from_description("2 2\n0 0"),
            Err(LayoutError::Rows {
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            Board::from_description("2 1\n0 0 1"),
            Err(LayoutError::RowWidth { row: 0, .. })
        ));
        assert!(matches!(
            Board::from_description("2 1\n0 2"),
            Err(LayoutError::Cell { row: 0, .. })
        ));
        assert!(matches!(
            Board::from_mines(2, 2, vec![true]),
            Err(LayoutError::Mines {
                expected: 4,
                found: 1
            })
        ));
    }
}
