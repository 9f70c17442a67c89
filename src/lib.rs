//! A search engine for playing or analysing the board game 'Connect 4'
//!
//! Two strategies share one packed bitboard representation: a depth-bounded
//! alpha-beta Minimax with move ordering, a transposition table and killer moves,
//! and a Monte Carlo Tree Search with a stochastic rollout policy and a
//! symmetry-aware transposition table.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_search::{bitboard::BitBoard, engine::{Budget, Engine}, Player};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! // Player One has three in a row along the bottom, column 3 completes it
//! let board = BitBoard::from_moves("051526")?;
//! let mut engine = Engine::new();
//! let result = engine.select_move(&board, Player::One, Budget::Depth(4))?;
//!
//! assert_eq!(result.column, 3);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

use std::fmt;

pub mod bitboard;

pub mod evaluation;

pub mod transposition_table;

pub mod minimax;

pub mod mcts;

pub mod engine;

pub mod game;

pub mod arena;

mod test;

pub use bitboard::{BitBoard, BoardError, Cell, Grid};
pub use engine::{Budget, Engine, SearchError, SearchResult};
pub use game::{Game, GameState};

/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

/// Bits reserved per column in the packed representation: `HEIGHT` cells
/// followed by a 3 bit height counter
pub const COLUMN_BITS: usize = 9;

// the packed columns must fit in a u64 and leave room for the height counter
const_assert!(WIDTH * COLUMN_BITS <= 64);
const_assert!(HEIGHT + 3 <= COLUMN_BITS);
const_assert!(HEIGHT < (1 << 3));

/// One of the two sides of a game
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Index for per-player arrays
    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::One => write!(f, "Player 1"),
            Player::Two => write!(f, "Player 2"),
        }
    }
}
