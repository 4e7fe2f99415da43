//! A Minesweeper player built on a small knowledge base.
//!
//! The [`Agent`] keeps sentences of the form "exactly N of these cells are
//! mines", learns one revealed cell at a time and deduces safe cells and
//! mines from them. [`Game`] and [`Bot`] provide a board to play on.

pub mod agent;
pub mod bot;
pub mod cell;
pub mod config;
pub mod error;
pub mod game;
pub mod sentence;

pub use agent::Agent;
pub use bot::{Bot, Move, Outcome};
pub use cell::{Cell, Grid};
pub use config::{Config, LogLevel};
pub use error::KnowledgeError;
pub use game::{Game, GameState, Reveal, Tile};
pub use sentence::Sentence;
