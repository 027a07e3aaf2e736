//! The 3×3 board and its win detection rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Number of cells on the board.
pub const BOARD_CELLS: usize = 9;

/// The eight index triples that complete a game: three rows, three
/// columns, then the two diagonals.
///
/// The order is fixed. [`Board::winner`] reports the first line that
/// matches, which keeps results deterministic for tests.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// The mark a player places. The first seat plays `X`, the second `O`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// The symbol that moves first in every game.
    pub const FIRST: Symbol = Symbol::X;

    /// Returns the opposing symbol.
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::O => write!(f, "O"),
        }
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Nine cells, row-major, each holding a symbol or nothing.
///
/// Serializes as a flat array such as `["X", null, "O", ...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [Option<Symbol>; BOARD_CELLS],
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from explicit cells. Mostly useful in tests.
    pub fn from_cells(cells: [Option<Symbol>; BOARD_CELLS]) -> Self {
        Self { cells }
    }

    /// Checks that `position` addresses a cell.
    pub fn check_position(position: usize) -> Result<usize, ProtocolError> {
        if position < BOARD_CELLS {
            Ok(position)
        } else {
            Err(ProtocolError::InvalidPosition(position))
        }
    }

    /// The symbol at `position`, or `None` if the cell is empty or the
    /// position is off the board.
    pub fn get(&self, position: usize) -> Option<Symbol> {
        self.cells.get(position).copied().flatten()
    }

    /// Returns `true` if `position` is on the board and empty.
    pub fn is_empty_at(&self, position: usize) -> bool {
        position < BOARD_CELLS && self.cells[position].is_none()
    }

    /// Writes `symbol` into `position`.
    ///
    /// Callers validate the move first; an off-board position is
    /// rejected here too so the board can never index out of range.
    pub fn place(
        &mut self,
        position: usize,
        symbol: Symbol,
    ) -> Result<(), ProtocolError> {
        let position = Self::check_position(position)?;
        self.cells[position] = Some(symbol);
        Ok(())
    }

    /// Empties every cell.
    pub fn clear(&mut self) {
        self.cells = [None; BOARD_CELLS];
    }

    /// Read access to the raw cells.
    pub fn cells(&self) -> &[Option<Symbol>; BOARD_CELLS] {
        &self.cells
    }

    /// Number of occupied cells.
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Returns `true` once all nine cells are occupied.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Returns `true` if every cell is empty.
    pub fn is_clear(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// The symbol owning the first completed line, if any.
    ///
    /// A pure function of the cells: the order in which they were filled
    /// has no influence.
    pub fn winner(&self) -> Option<Symbol> {
        WINNING_LINES.iter().find_map(|&[a, b, c]| {
            let first = self.cells[a]?;
            (self.cells[b] == Some(first) && self.cells[c] == Some(first))
                .then_some(first)
        })
    }

    /// Returns `true` if `symbol` owns at least one completed line.
    pub fn has_line(&self, symbol: Symbol) -> bool {
        WINNING_LINES
            .iter()
            .any(|line| line.iter().all(|&i| self.cells[i] == Some(symbol)))
    }

    /// Full board with no completed line.
    pub fn is_draw(&self) -> bool {
        self.is_full() && self.winner().is_none()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, cells) in self.cells.chunks(3).enumerate() {
            if row > 0 {
                writeln!(f)?;
            }
            let marks: Vec<String> = cells
                .iter()
                .map(|c| c.map_or_else(|| ".".to_string(), |s| s.to_string()))
                .collect();
            write!(f, "{}", marks.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: Option<Symbol> = Some(Symbol::X);
    const O: Option<Symbol> = Some(Symbol::O);
    const E: Option<Symbol> = None;

    #[test]
    fn test_winner_detects_every_line() {
        for line in WINNING_LINES {
            let mut board = Board::new();
            for i in line {
                board.place(i, Symbol::O).unwrap();
            }
            assert_eq!(board.winner(), Some(Symbol::O), "line {line:?}");
            assert!(board.has_line(Symbol::O));
            assert!(!board.has_line(Symbol::X));
        }
    }

    #[test]
    fn test_winner_none_on_partial_board() {
        let board = Board::from_cells([X, O, X, E, O, E, E, E, E]);
        assert_eq!(board.winner(), None);
        assert!(!board.is_full());
        assert_eq!(board.filled(), 4);
    }

    #[test]
    fn test_draw_board() {
        let board = Board::from_cells([X, O, X, O, X, O, O, X, O]);
        assert!(board.is_full());
        assert!(board.is_draw());
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn test_full_board_with_line_is_not_draw() {
        let board = Board::from_cells([X, O, X, O, X, O, O, X, X]);
        assert!(board.is_full());
        assert_eq!(board.winner(), Some(Symbol::X));
        assert!(!board.is_draw());
    }

    #[test]
    fn test_winner_independent_of_insertion_order() {
        let order_a = [0, 4, 8, 1, 3];
        let order_b = [3, 1, 8, 4, 0];
        let marks = |pos: usize| if pos == 1 || pos == 3 { Symbol::O } else { Symbol::X };

        let mut a = Board::new();
        for p in order_a {
            a.place(p, marks(p)).unwrap();
        }
        let mut b = Board::new();
        for p in order_b {
            b.place(p, marks(p)).unwrap();
        }
        assert_eq!(a, b);
        assert_eq!(a.winner(), Some(Symbol::X));
        assert_eq!(a.winner(), b.winner());
    }

    #[test]
    fn test_place_rejects_off_board() {
        let mut board = Board::new();
        assert_eq!(
            board.place(9, Symbol::X),
            Err(ProtocolError::InvalidPosition(9))
        );
        assert!(board.is_clear());
        assert_eq!(board.get(42), None);
        assert!(!board.is_empty_at(9));
    }

    #[test]
    fn test_clear_resets_cells() {
        let mut board = Board::from_cells([X, O, X, O, X, O, O, X, O]);
        board.clear();
        assert!(board.is_clear());
    }

    #[test]
    fn test_symbol_other() {
        assert_eq!(Symbol::X.other(), Symbol::O);
        assert_eq!(Symbol::O.other(), Symbol::X);
        assert_eq!(Symbol::FIRST, Symbol::X);
    }

    #[test]
    fn test_board_display() {
        let board = Board::from_cells([X, E, E, E, O, E, E, E, X]);
        assert_eq!(board.to_string(), "X . .\n. O .\n. . X");
    }
}
