use crate::agent::Agent;
use crate::cell::Cell;
use crate::game::{Game, GameState, Reveal};
use rand::Rng;

/// A single move made by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub cell: Cell,
    /// Whether the agent knew the cell was safe, as opposed to guessing.
    pub certain: bool,
    pub hit_mine: bool,
}

/// Summary of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub state: GameState,
    pub moves: usize,
    pub guesses: usize,
    pub mines_found: usize,
}

impl Outcome {
    pub fn won(&self) -> bool {
        self.state == GameState::Won
    }
}

/// A game together with the agent playing it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Bot {
    pub game: Game,
    pub agent: Agent,
}

impl Bot {
    pub fn new(game: Game) -> Self {
        let agent = Agent::new(game.grid.height, game.grid.width);
        Bot { game, agent }
    }

    /// Deserializes a session, rejecting one whose board shape or agent
    /// dimensions do not match the game.
    pub fn deserialize(bts: &[u8]) -> anyhow::Result<Self> {
        let bot: Bot = bcs::from_bytes(bts)?;
        bot.game.check_shape()?;
        if bot.agent.grid() != bot.game.grid {
            anyhow::bail!("agent_grid_mismatch");
        }
        Ok(bot)
    }

    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    /// Plays one move: a known safe cell when there is one, a random guess
    /// otherwise. Returns `None` when the game is over or nothing is left to
    /// try.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> anyhow::Result<Option<Move>> {
        if self.game.game_state != GameState::Playing {
            return Ok(None);
        }

        let (cell, certain) = match self.agent.safe_move() {
            Some(cell) => (cell, true),
            None => match self.agent.random_move(rng) {
                Some(cell) => (cell, false),
                None => {
                    tracing::warn!("no moves left");
                    return Ok(None);
                }
            },
        };

        if certain {
            tracing::info!(%cell, "revealing known safe cell");
        } else {
            tracing::info!(%cell, "no safe move known, guessing");
        }

        let hit_mine = match self.game.reveal_cell(cell)? {
            Reveal::Mine => {
                tracing::info!(%cell, "hit a mine");
                true
            }
            Reveal::Safe(revealed) => {
                self.absorb(&revealed)?;
                false
            }
        };

        Ok(Some(Move {
            cell,
            certain,
            hit_mine,
        }))
    }

    /// Steps until the game ends or the bot runs out of moves.
    pub fn play<R: Rng + ?Sized>(&mut self, rng: &mut R) -> anyhow::Result<Outcome> {
        let mut moves = 0;
        let mut guesses = 0;
        while let Some(mv) = self.step(rng)? {
            moves += 1;
            if !mv.certain {
                guesses += 1;
            }
        }
        Ok(self.outcome(moves, guesses))
    }

    pub fn outcome(&self, moves: usize, guesses: usize) -> Outcome {
        Outcome {
            state: self.game.game_state,
            moves,
            guesses,
            mines_found: self.agent.mines().len(),
        }
    }

    /// Feeds every revealed cell to the agent. A rejected observation does
    /// not stop the rest from being absorbed, so the agent stays in step with
    /// the board; the first rejection is returned afterwards.
    fn absorb(&mut self, revealed: &[(Cell, u8)]) -> anyhow::Result<()> {
        let mut rejected = None;
        for &(at, count) in revealed {
            if let Err(e) = self.agent.add_knowledge(at, count as usize) {
                tracing::warn!(cell = %at, count, error = %e, "observation rejected");
                rejected.get_or_insert(e);
            }
        }
        self.flag_known_mines()?;

        match rejected {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn flag_known_mines(&mut self) -> anyhow::Result<()> {
        for &mine in self.agent.mines() {
            self.game.flag(mine)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Tile;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_certain_moves_never_hit_mines() {
        for seed in 0..30 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let game = Game::new(9, 9, 10, &mut rng).unwrap();
            let mut bot = Bot::new(game);

            while let Some(mv) = bot.step(&mut rng).unwrap() {
                if mv.certain {
                    assert!(!mv.hit_mine, "seed {seed}: certain move {} hit a mine", mv.cell);
                }
            }
            assert_ne!(bot.game.game_state, GameState::Playing);

            // Every mine the agent proved is a real one
            for &mine in bot.agent.mines() {
                assert!(bot.game.is_mine(mine));
            }
        }
    }

    #[test]
    fn test_mines_get_flagged() {
        // Single row, mine in the middle: after revealing the left end the
        // agent knows where the mine is and the board shows a flag.
        let game = Game::with_mines(1, 3, [Cell::new(0, 1)]).unwrap();
        let mut bot = Bot::new(game);
        bot.game.reveal_cell(Cell::new(0, 0)).unwrap();
        bot.agent.add_knowledge(Cell::new(0, 0), 1).unwrap();

        let mut rng = SmallRng::seed_from_u64(0);
        let mv = bot.step(&mut rng).unwrap().unwrap();
        assert_eq!(mv.cell, Cell::new(0, 2));
        assert!(!mv.certain);
        assert!(!mv.hit_mine);
        assert_eq!(bot.game.tile(Cell::new(0, 1)), Tile::Flagged);
        assert_eq!(bot.game.game_state, GameState::Won);
        assert_eq!(bot.step(&mut rng).unwrap(), None);
    }

    #[test]
    fn test_play_reports_outcome() {
        // One mine in the corner. Either the bot finishes with the mine
        // proven, or a guess (never a certain move) ended the game.
        for seed in 0..10 {
            let game = Game::with_mines(4, 4, [Cell::new(3, 3)]).unwrap();
            let mut bot = Bot::new(game);
            let mut rng = SmallRng::seed_from_u64(seed);

            let outcome = bot.play(&mut rng).unwrap();
            assert!(outcome.moves >= 1);
            assert!(outcome.guesses >= 1);
            if outcome.won() {
                assert_eq!(outcome.mines_found, 1);
                assert_eq!(bot.game.tile(Cell::new(3, 3)), Tile::Flagged);
            } else {
                assert_eq!(outcome.state, GameState::Lost);
            }
        }
    }

    #[test]
    fn test_rejected_observation_does_not_stop_the_rest() {
        // The agent was told (0, 0) sees a mine, which the board disagrees
        // with. Revealing (0, 0) cascades into (0, 1) and (0, 2); the first
        // two are rejected but (0, 2) must still be absorbed.
        let game = Game::with_mines(1, 4, [Cell::new(0, 3)]).unwrap();
        let mut bot = Bot::new(game);
        bot.agent.add_knowledge(Cell::new(0, 0), 1).unwrap();

        let Reveal::Safe(revealed) = bot.game.reveal_cell(Cell::new(0, 0)).unwrap() else {
            panic!("not a mine");
        };
        assert_eq!(revealed.len(), 3);

        assert!(bot.absorb(&revealed).is_err());
        assert!(bot.agent.has_played(Cell::new(0, 2)));
        assert_eq!(bot.game.tile(Cell::new(0, 1)), Tile::Revealed(0));
    }

    #[test]
    fn test_session_roundtrip() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut bot = Bot::new(Game::new(6, 6, 5, &mut rng).unwrap());
        bot.step(&mut rng).unwrap();

        let restored = Bot::deserialize(&bot.serialize().unwrap()).unwrap();
        assert_eq!(restored.agent, bot.agent);
        assert_eq!(restored.game.board, bot.game.board);
    }

    #[test]
    fn test_deserialize_rejects_malformed_session() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut bot = Bot::new(Game::new(6, 6, 5, &mut rng).unwrap());
        bot.game.board.truncate(2);
        assert!(Bot::deserialize(&bot.serialize().unwrap()).is_err());

        let game = Game::new(6, 6, 5, &mut rng).unwrap();
        let bot = Bot {
            game,
            agent: Agent::new(3, 3),
        };
        assert!(Bot::deserialize(&bot.serialize().unwrap()).is_err());
    }
}
