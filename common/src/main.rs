use minesweeper_agent::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::thread;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    // --- 1. Initialization ---
    let config = Config::from_args(std::env::args())?;
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(config.log_level))
        .with_target(false)
        .init();

    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    println!("--- Knowledge Base Minesweeper Bot ---");
    println!(
        "Board: {}x{} with {} mines, {} game(s)",
        config.height, config.width, config.mines, config.games
    );

    // --- 2. Game Loop ---
    let mut wins = 0;
    let mut total_guesses = 0;
    for round in 1..=config.games {
        let outcome = play_one(&config, &mut rng)?;
        if outcome.won() {
            wins += 1;
        }
        total_guesses += outcome.guesses;
        tracing::info!(
            round,
            state = ?outcome.state,
            moves = outcome.moves,
            guesses = outcome.guesses,
            mines_found = outcome.mines_found,
            "game finished"
        );
    }

    // --- 3. Final Result ---
    println!("\n--- Results ---");
    println!(
        "Won {wins} of {} game(s) ({:.1}%), {total_guesses} guess(es) in total",
        config.games,
        100.0 * wins as f64 / config.games as f64
    );
    Ok(())
}

fn play_one(config: &Config, rng: &mut SmallRng) -> anyhow::Result<Outcome> {
    let game = Game::new(config.height, config.width, config.mines, rng)?;
    let mut bot = Bot::new(game);

    let mut moves = 0;
    let mut guesses = 0;
    while let Some(mv) = bot.step(rng)? {
        moves += 1;
        if !mv.certain {
            guesses += 1;
        }

        if config.show_board {
            let how = if mv.certain { "known safe" } else { "guess" };
            println!("\n--- Move #{moves}: ({}, {}) [{how}] ---", mv.cell.row, mv.cell.col);
            print!("{}", bot.game);
        }

        // Add a delay to make the game watchable
        if config.delay_ms > 0 {
            thread::sleep(Duration::from_millis(config.delay_ms));
        }
    }

    let outcome = bot.outcome(moves, guesses);
    if config.show_board {
        match outcome.state {
            GameState::Won => println!("Result: the bot won!"),
            GameState::Lost => println!("Result: the bot hit a mine and lost."),
            GameState::Playing => println!("Result: the game ended unexpectedly."),
        }
    }
    Ok(outcome)
}
