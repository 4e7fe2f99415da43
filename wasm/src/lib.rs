use minesweeper_agent as ms;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn create_session(
    height: usize,
    width: usize,
    mines: usize,
    seed: u64,
) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut rng = SmallRng::seed_from_u64(seed);
    let game = ms::Game::new(height, width, mines, &mut rng).map_err(|e| e.to_string())?;
    ms::Bot::new(game).serialize().map_err(|e| e.to_string())
}

/// Lets the bot make one move. The last byte of the result is 0 for a
/// certain move, 1 for a guess, 2 when no move was made.
#[wasm_bindgen]
pub fn step(bts: Vec<u8>, seed: u64) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut bot = ms::Bot::deserialize(&bts).map_err(|e| e.to_string())?;
    let mut rng = SmallRng::seed_from_u64(seed);
    let mv = bot.step(&mut rng).map_err(|e| e.to_string())?;
    let mut xs = bot.serialize().map_err(|e| e.to_string())?;
    xs.push(match mv {
        Some(mv) if mv.certain => 0,
        Some(_) => 1,
        None => 2,
    });
    Ok(xs)
}

/// 0 playing, 1 won, 2 lost.
#[wasm_bindgen]
pub fn status(bts: Vec<u8>) -> Result<u8, String> {
    console_error_panic_hook::set_once();

    let bot = ms::Bot::deserialize(&bts).map_err(|e| e.to_string())?;
    Ok(match bot.game.game_state {
        ms::GameState::Playing => 0,
        ms::GameState::Won => 1,
        ms::GameState::Lost => 2,
    })
}

#[wasm_bindgen]
pub fn get_cells(bts: Vec<u8>) -> Result<Vec<i8>, String> {
    console_error_panic_hook::set_once();

    let bot = ms::Bot::deserialize(&bts).map_err(|e| e.to_string())?;
    Ok(bot
        .game
        .board
        .into_iter()
        .flat_map(|row| {
            row.into_iter().map(|tile| match tile {
                ms::Tile::Hidden => -1,
                ms::Tile::Flagged => -2,
                ms::Tile::Revealed(n) => n as i8,
            })
        })
        .collect())
}

/// Mines proven by the agent, flattened as `row * width + col`.
#[wasm_bindgen]
pub fn known_mines(bts: Vec<u8>) -> Result<Vec<u32>, String> {
    console_error_panic_hook::set_once();

    let bot = ms::Bot::deserialize(&bts).map_err(|e| e.to_string())?;
    let width = bot.agent.grid().width;
    Ok(bot
        .agent
        .mines()
        .iter()
        .map(|cell| (cell.row * width + cell.col) as u32)
        .collect())
}
