use itertools::iproduct;
use std::fmt;

/// A single board coordinate. Ordering is row-major, which is also the
/// order in which the agent hands out safe moves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Cell { row, col }
    }
}

impl From<(usize, usize)> for Cell {
    fn from((row, col): (usize, usize)) -> Self {
        Cell { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Board dimensions, shared by the game and the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Grid {
    pub height: usize,
    pub width: usize,
}

impl Grid {
    pub const fn new(height: usize, width: usize) -> Self {
        Grid { height, width }
    }

    /// Number of cells, or `None` when it does not fit in a `usize`.
    pub fn area(&self) -> Option<usize> {
        self.height.checked_mul(self.width)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    /// Every cell of the board in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + use<> {
        iproduct!(0..self.height, 0..self.width).map(Cell::from)
    }

    /// The up to eight cells touching `cell`, clipped to the board edges.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + use<> {
        let Grid { height, width } = *self;

        iproduct!(-1isize..=1, -1isize..=1).filter_map(move |(dr, dc)| {
            // Skip the center cell itself
            if dr == 0 && dc == 0 {
                return None;
            }

            let row = cell.row.checked_add_signed(dr)?;
            let col = cell.col.checked_add_signed(dc)?;

            if row < height && col < width {
                Some(Cell { row, col })
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_are_clipped() {
        let grid = Grid::new(3, 3);

        // Corner, edge and center cells
        assert_eq!(grid.neighbors(Cell::new(0, 0)).count(), 3);
        assert_eq!(grid.neighbors(Cell::new(0, 1)).count(), 5);
        assert_eq!(grid.neighbors(Cell::new(1, 1)).count(), 8);
        assert_eq!(grid.neighbors(Cell::new(2, 2)).count(), 3);
    }

    #[test]
    fn test_neighbors_do_not_wrap() {
        // A single row board: the last column must not see the first one.
        let grid = Grid::new(1, 4);
        let neighbors: Vec<Cell> = grid.neighbors(Cell::new(0, 3)).collect();
        assert_eq!(neighbors, vec![Cell::new(0, 2)]);
    }

    #[test]
    fn test_non_square_bounds() {
        let grid = Grid::new(2, 5);
        assert!(grid.contains(Cell::new(1, 4)));
        assert!(!grid.contains(Cell::new(4, 1)));
        assert_eq!(grid.cells().count(), 10);
        assert_eq!(grid.cells().last(), Some(Cell::new(1, 4)));
        assert_eq!(grid.area(), Some(10));
    }

    #[test]
    fn test_huge_area_does_not_overflow() {
        assert_eq!(Grid::new(usize::MAX, 2).area(), None);
    }
}
