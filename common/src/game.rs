use crate::cell::{Cell, Grid};
use rand::Rng;
use rand::seq::index;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;

/// The visible state of a single tile on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Tile {
    Hidden,
    Flagged,
    Revealed(u8), // The u8 is the number of adjacent mines.
}

/// Represents the current state of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

/// What happened when a cell was revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reveal {
    /// The cell was a mine; the game is lost.
    Mine,
    /// Every newly revealed cell with its neighbor mine count. More than one
    /// cell when a zero cascades.
    Safe(Vec<(Cell, u8)>),
}

/// A board with hidden mines and the tiles the player can see.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Game {
    pub grid: Grid,
    /// Mine layout, fixed at construction.
    mines: BTreeSet<Cell>,
    /// The visible state of the board, indexed `[row][col]`.
    pub board: Vec<Vec<Tile>>,
    pub game_state: GameState,
}

impl Game {
    /// Places `mines` mines uniformly at random.
    pub fn new<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        mines: usize,
        rng: &mut R,
    ) -> anyhow::Result<Self> {
        let area = Grid::new(height, width)
            .area()
            .ok_or_else(|| anyhow::anyhow!("board_too_large"))?;
        if mines >= area {
            anyhow::bail!("too_many_mines");
        }

        let layout = index::sample(rng, area, mines)
            .into_iter()
            .map(|i| Cell::new(i / width, i % width));
        Self::with_mines(height, width, layout)
    }

    /// Builds a board from a known mine layout.
    pub fn with_mines(
        height: usize,
        width: usize,
        mines: impl IntoIterator<Item = Cell>,
    ) -> anyhow::Result<Self> {
        let grid = Grid::new(height, width);
        let area = grid
            .area()
            .ok_or_else(|| anyhow::anyhow!("board_too_large"))?;
        let mines: BTreeSet<Cell> = mines.into_iter().collect();
        if let Some(cell) = mines.iter().find(|&&cell| !grid.contains(cell)) {
            anyhow::bail!("mine {cell} is outside the board");
        }
        if mines.len() >= area {
            anyhow::bail!("too_many_mines");
        }

        Ok(Game {
            grid,
            mines,
            board: vec![vec![Tile::Hidden; width]; height],
            game_state: GameState::Playing,
        })
    }

    /// Deserializes a game state from bytes, rejecting boards whose shape
    /// does not match their dimensions.
    pub fn deserialize(bts: &[u8]) -> anyhow::Result<Self> {
        let game: Game = bcs::from_bytes(bts)?;
        game.check_shape()?;
        Ok(game)
    }

    /// Serializes the game state to bytes.
    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    /// Every row of `board` has `width` tiles, there are `height` rows, and
    /// every mine is on the board.
    pub fn check_shape(&self) -> anyhow::Result<()> {
        let Grid { height, width } = self.grid;
        if self.board.len() != height || self.board.iter().any(|row| row.len() != width) {
            anyhow::bail!("board_shape_mismatch");
        }
        if self.mines.iter().any(|&cell| !self.grid.contains(cell)) {
            anyhow::bail!("mine_out_of_bounds");
        }
        Ok(())
    }

    pub fn total_mines(&self) -> usize {
        self.mines.len()
    }

    pub fn tile(&self, cell: Cell) -> Tile {
        self.board[cell.row][cell.col]
    }

    pub fn is_mine(&self, cell: Cell) -> bool {
        self.mines.contains(&cell)
    }

    /// Number of mines among the up to eight neighbors of `cell`.
    pub fn nearby_mines(&self, cell: Cell) -> u8 {
        self.grid
            .neighbors(cell)
            .filter(|neighbor| self.mines.contains(neighbor))
            .count() as u8
    }

    /// Reveals a cell. Hitting a mine ends the game; a zero keeps revealing
    /// its neighbors. Revealing an already revealed cell yields nothing new.
    pub fn reveal_cell(&mut self, at: Cell) -> anyhow::Result<Reveal> {
        if !self.grid.contains(at) {
            anyhow::bail!("out_of_bounds");
        }
        if self.game_state != GameState::Playing {
            anyhow::bail!("game_ended");
        }
        if matches!(self.tile(at), Tile::Revealed(_)) {
            return Ok(Reveal::Safe(Vec::new()));
        }

        if self.is_mine(at) {
            self.game_state = GameState::Lost;
            return Ok(Reveal::Mine);
        }

        let revealed = self.flood_fill_reveal(at);

        if self.check_win_condition() {
            self.game_state = GameState::Won;
        }

        Ok(Reveal::Safe(revealed))
    }

    /// Marks a hidden cell as a suspected mine. Only changes the display.
    pub fn flag(&mut self, at: Cell) -> anyhow::Result<()> {
        if !self.grid.contains(at) {
            anyhow::bail!("out_of_bounds");
        }
        if self.tile(at) == Tile::Hidden {
            self.board[at.row][at.col] = Tile::Flagged;
        }
        Ok(())
    }

    /// Won once every safe cell is revealed.
    pub fn check_win_condition(&self) -> bool {
        let revealed = self
            .board
            .iter()
            .flatten()
            .filter(|tile| matches!(tile, Tile::Revealed(_)))
            .count();
        self.grid.area() == Some(revealed + self.mines.len())
    }

    fn flood_fill_reveal(&mut self, start: Cell) -> Vec<(Cell, u8)> {
        let mut revealed = Vec::new();
        let mut queue = VecDeque::from([start]);
        let mut visited = HashSet::from([start]);

        while let Some(cell) = queue.pop_front() {
            // Flags are left alone, the player may know better
            if self.tile(cell) != Tile::Hidden && cell != start {
                continue;
            }

            let count = self.nearby_mines(cell);
            self.board[cell.row][cell.col] = Tile::Revealed(count);
            revealed.push((cell, count));

            // If it's a 0, add its neighbors to the queue
            if count == 0 {
                for neighbor in self.grid.neighbors(cell) {
                    if self.tile(neighbor) == Tile::Hidden && visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        revealed
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header
        write!(f, "   ")?;
        for col in 0..self.grid.width {
            write!(f, "{:^3}", col)?;
        }
        writeln!(f, "\n  +{}", "---".repeat(self.grid.width))?;

        for (row, tiles) in self.board.iter().enumerate() {
            write!(f, "{:^2}|", row)?;
            for (col, tile) in tiles.iter().enumerate() {
                let shown = match tile {
                    Tile::Hidden if self.game_state == GameState::Lost
                        && self.is_mine(Cell::new(row, col)) =>
                    {
                        " * ".to_string()
                    }
                    Tile::Hidden => " ■ ".to_string(),
                    Tile::Flagged => " F ".to_string(),
                    Tile::Revealed(0) => " . ".to_string(),
                    Tile::Revealed(n) => format!(" {} ", n),
                };
                write!(f, "{}", shown)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_game_initialization() {
        let mut rng = SmallRng::seed_from_u64(3);
        let game = Game::new(5, 6, 7, &mut rng).unwrap();
        assert_eq!(game.grid, Grid::new(5, 6));
        assert_eq!(game.total_mines(), 7);
        assert_eq!(game.game_state, GameState::Playing);

        // Verify all cells start as hidden
        assert!(game.board.iter().flatten().all(|&t| t == Tile::Hidden));
        assert_eq!(game.board.len(), 5);
        assert_eq!(game.board[0].len(), 6);
    }

    #[test]
    fn test_game_initialization_too_many_mines() {
        let mut rng = SmallRng::seed_from_u64(3);
        assert!(Game::new(3, 3, 9, &mut rng).is_err());
        assert!(Game::with_mines(1, 2, [Cell::new(0, 5)]).is_err());
        assert!(Game::new(usize::MAX, 2, 1, &mut rng).is_err());
        assert!(Game::with_mines(usize::MAX, 2, Vec::new()).is_err());
    }

    #[test]
    fn test_nearby_mines() {
        let game = Game::with_mines(3, 3, [Cell::new(0, 0), Cell::new(2, 2)]).unwrap();
        assert_eq!(game.nearby_mines(Cell::new(1, 1)), 2);
        assert_eq!(game.nearby_mines(Cell::new(0, 1)), 1);
        assert_eq!(game.nearby_mines(Cell::new(2, 0)), 0);
    }

    #[test]
    fn test_zero_cascades() {
        // Mine in the far corner: revealing the opposite corner opens
        // everything except the mine.
        let mut game = Game::with_mines(3, 3, [Cell::new(2, 2)]).unwrap();
        let Reveal::Safe(revealed) = game.reveal_cell(Cell::new(0, 0)).unwrap() else {
            panic!("not a mine");
        };
        assert_eq!(revealed.len(), 8);
        assert_eq!(revealed[0], (Cell::new(0, 0), 0));
        assert!(revealed.contains(&(Cell::new(1, 1), 1)));
        assert_eq!(game.game_state, GameState::Won);
    }

    #[test]
    fn test_hitting_mine() {
        let mut game = Game::with_mines(2, 2, [Cell::new(1, 1)]).unwrap();
        assert_eq!(game.reveal_cell(Cell::new(1, 1)).unwrap(), Reveal::Mine);
        assert_eq!(game.game_state, GameState::Lost);
        assert!(game.reveal_cell(Cell::new(0, 0)).is_err());
    }

    #[test]
    fn test_revealing_twice_yields_nothing() {
        let mut game = Game::with_mines(2, 3, [Cell::new(0, 2)]).unwrap();
        let first = game.reveal_cell(Cell::new(0, 1)).unwrap();
        assert_eq!(first, Reveal::Safe(vec![(Cell::new(0, 1), 1)]));
        let second = game.reveal_cell(Cell::new(0, 1)).unwrap();
        assert_eq!(second, Reveal::Safe(Vec::new()));
    }

    #[test]
    fn test_flag_only_hidden_tiles() {
        let mut game = Game::with_mines(2, 3, [Cell::new(0, 2)]).unwrap();
        game.reveal_cell(Cell::new(0, 1)).unwrap();
        game.flag(Cell::new(0, 1)).unwrap();
        game.flag(Cell::new(0, 2)).unwrap();
        assert_eq!(game.tile(Cell::new(0, 1)), Tile::Revealed(1));
        assert_eq!(game.tile(Cell::new(0, 2)), Tile::Flagged);
    }

    #[test]
    fn test_serialization_preserves_state() {
        let mut game = Game::with_mines(3, 4, [Cell::new(2, 3)]).unwrap();
        game.reveal_cell(Cell::new(0, 0)).unwrap();

        let restored = Game::deserialize(&game.serialize().unwrap()).unwrap();
        assert_eq!(restored.board, game.board);
        assert_eq!(restored.game_state, game.game_state);
        assert!(restored.is_mine(Cell::new(2, 3)));
    }

    #[test]
    fn test_deserialize_rejects_mismatched_board() {
        let mut game = Game::with_mines(3, 4, [Cell::new(2, 3)]).unwrap();
        game.board.pop();
        assert!(Game::deserialize(&game.serialize().unwrap()).is_err());

        let mut game = Game::with_mines(3, 4, [Cell::new(2, 3)]).unwrap();
        game.board[1].push(Tile::Hidden);
        assert!(Game::deserialize(&game.serialize().unwrap()).is_err());

        let mut game = Game::with_mines(3, 4, [Cell::new(2, 3)]).unwrap();
        game.grid = Grid::new(5, 4);
        assert!(Game::deserialize(&game.serialize().unwrap()).is_err());
    }
}
