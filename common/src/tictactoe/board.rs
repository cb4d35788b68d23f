use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::mark::Mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("position ({x}, {y}) is outside a {size}x{size} board")]
    OutOfBounds { x: usize, y: usize, size: usize },
    #[error("cell ({x}, {y}) is already occupied")]
    CellOccupied { x: usize, y: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("board rows must all be as long as the number of rows")]
pub struct NotSquare;

/// Square board addressed as `cells[x][y]`, `x` being the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<Mark>>", try_from = "Vec<Vec<Mark>>")]
pub struct Board {
    cells: Vec<Vec<Mark>>,
}

impl TryFrom<Vec<Vec<Mark>>> for Board {
    type Error = NotSquare;

    fn try_from(cells: Vec<Vec<Mark>>) -> Result<Self, Self::Error> {
        Self::from_rows(cells).ok_or(NotSquare)
    }
}

impl From<Board> for Vec<Vec<Mark>> {
    fn from(board: Board) -> Self {
        board.cells
    }
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![vec![Mark::Empty; size]; size],
        }
    }

    /// Builds a board from explicit rows. Rows must all have the same length
    /// as the number of rows.
    pub fn from_rows(cells: Vec<Vec<Mark>>) -> Option<Self> {
        let size = cells.len();
        if cells.iter().any(|row| row.len() != size) {
            return None;
        }
        Some(Self { cells })
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn rows(&self) -> &[Vec<Mark>] {
        &self.cells
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Mark> {
        self.cells.get(x).and_then(|row| row.get(y)).copied()
    }

    pub fn check_move(&self, x: usize, y: usize) -> Result<(), MoveError> {
        let size = self.size();
        match self.get(x, y) {
            None => Err(MoveError::OutOfBounds { x, y, size }),
            Some(Mark::Empty) => Ok(()),
            Some(_) => Err(MoveError::CellOccupied { x, y }),
        }
    }

    pub fn apply_move(&mut self, x: usize, y: usize, mark: Mark) -> Result<(), MoveError> {
        self.check_move(x, y)?;
        self.cells[x][y] = mark;
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.cells
            .iter()
            .all(|row| row.iter().all(|cell| !cell.is_empty()))
    }

    pub fn filled_cells(&self) -> usize {
        self.cells
            .iter()
            .map(|row| row.iter().filter(|cell| !cell.is_empty()).count())
            .sum()
    }
}
