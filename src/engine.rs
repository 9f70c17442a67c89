//! A single entry point over both search strategies
//!
//! [`Engine::select_move`] takes a [`Budget`] which doubles as the strategy
//! choice: a depth runs Minimax, an iteration count runs MCTS. Both strategies
//! share the same root tactics, so they never disagree on a forced move.

use log::{debug, warn};
use thiserror::Error;

use std::time::Duration;

use crate::bitboard::{center_order, BitBoard};
use crate::mcts::{Mcts, MctsConfig, MctsOutcome};
use crate::minimax::{Minimax, MinimaxConfig, SearchStats, WIN_SCORE};
use crate::{Player, WIDTH};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    #[error("no legal moves, the position is a draw")]
    NoLegalMoves,
}

/// How much search a move is allowed, and with which strategy
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Budget {
    /// Minimax to a fixed number of plies
    Depth(u32),
    /// MCTS for a number of iterations, cut short by the optional time limit
    Mcts {
        iterations: u32,
        time_limit: Option<Duration>,
    },
}

impl Budget {
    pub fn iterations(iterations: u32) -> Self {
        Budget::Mcts {
            iterations,
            time_limit: None,
        }
    }
}

/// A move decided without searching
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tactic {
    /// the move completes four in a row
    ImmediateWin,
    /// the opponent would win in this column on its next move
    ForcedBlock,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostics {
    Minimax {
        /// score of every legal column, searched one ply shallower
        column_scores: [Option<i32>; WIDTH],
        stats: SearchStats,
    },
    Mcts {
        column_visits: [u32; WIDTH],
        column_win_rates: [Option<f64>; WIDTH],
        iterations: u32,
        exploration: f64,
        elapsed: Duration,
        from_table: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub column: usize,
    /// Minimax score of the move, from the searching player's point of view
    pub score: Option<i32>,
    pub tactic: Option<Tactic>,
    pub diagnostics: Option<Diagnostics>,
}

pub struct Engine {
    minimax: Minimax,
    mcts: Mcts,
    diagnostics: bool,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_configs(MinimaxConfig::default(), MctsConfig::default())
    }

    pub fn with_configs(minimax: MinimaxConfig, mcts: MctsConfig) -> Self {
        Self {
            minimax: Minimax::with_config(minimax),
            mcts: Mcts::with_config(mcts),
            diagnostics: false,
        }
    }

    pub fn with_minimax_config(mut self, config: MinimaxConfig) -> Self {
        self.minimax = Minimax::with_config(config);
        self
    }

    pub fn with_mcts_config(mut self, config: MctsConfig) -> Self {
        self.mcts = Mcts::with_config(config);
        self
    }

    /// Also report per-column scores or visit counts with every move
    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn minimax(&mut self) -> &mut Minimax {
        &mut self.minimax
    }

    pub fn mcts(&mut self) -> &mut Mcts {
        &mut self.mcts
    }

    /// Picks a column for `player` on `board`
    ///
    /// An immediate win is always played, and a single opponent threat is always
    /// blocked, before any search is started. With diagnostics enabled the
    /// budget's search still runs for its per-column report, without changing
    /// the move.
    pub fn select_move(
        &mut self,
        board: &BitBoard,
        player: Player,
        budget: Budget,
    ) -> Result<SearchResult, SearchError> {
        if !board.has_legal_moves() {
            return Err(SearchError::NoLegalMoves);
        }
        if let Some(winner) = board.winner() {
            warn!("searching a position already won by {}", winner);
        }

        if let Some((column, tactic)) = root_tactic(board, player) {
            debug!("engine: column {} by {:?}", column, tactic);
            let (score, diagnostics) = match budget {
                Budget::Depth(depth) => {
                    if tactic == Tactic::ImmediateWin && !self.diagnostics {
                        (Some(WIN_SCORE + depth.max(1) as i32 - 1), None)
                    } else {
                        // scores of every column, the tactic still decides the move
                        self.minimax.clear();
                        let column_scores = self.minimax.column_scores(board, player, depth);
                        let diagnostics = if self.diagnostics {
                            Some(Diagnostics::Minimax {
                                column_scores,
                                stats: self.minimax.stats(),
                            })
                        } else {
                            None
                        };
                        (column_scores[column], diagnostics)
                    }
                }
                Budget::Mcts {
                    iterations,
                    time_limit,
                } => {
                    let diagnostics = if self.diagnostics {
                        let outcome = self
                            .mcts
                            .select_move(board, player, iterations, time_limit)?;
                        Some(mcts_diagnostics(&outcome))
                    } else {
                        None
                    };
                    (None, diagnostics)
                }
            };
            return Ok(SearchResult {
                column,
                score,
                tactic: Some(tactic),
                diagnostics,
            });
        }

        match budget {
            Budget::Depth(depth) => {
                let outcome = self.minimax.select_move(board, player, depth)?;
                let diagnostics = if self.diagnostics {
                    Some(Diagnostics::Minimax {
                        column_scores: self.minimax.column_scores(board, player, depth),
                        stats: outcome.stats,
                    })
                } else {
                    None
                };
                Ok(SearchResult {
                    column: outcome.column,
                    score: Some(outcome.score),
                    tactic: None,
                    diagnostics,
                })
            }
            Budget::Mcts {
                iterations,
                time_limit,
            } => {
                let outcome = self
                    .mcts
                    .select_move(board, player, iterations, time_limit)?;
                let diagnostics = if self.diagnostics {
                    Some(mcts_diagnostics(&outcome))
                } else {
                    None
                };
                Ok(SearchResult {
                    column: outcome.column,
                    score: None,
                    tactic: None,
                    diagnostics,
                })
            }
        }
    }
}

fn mcts_diagnostics(outcome: &MctsOutcome) -> Diagnostics {
    Diagnostics::Mcts {
        column_visits: outcome.column_visits,
        column_win_rates: outcome.column_win_rates,
        iterations: outcome.iterations,
        exploration: outcome.exploration,
        elapsed: outcome.elapsed,
        from_table: outcome.from_table,
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// A winning column for `player`, or else the only column the opponent could
/// win in next move
pub fn root_tactic(board: &BitBoard, player: Player) -> Option<(usize, Tactic)> {
    let legal = move || center_order().into_iter().filter(move |&c| board.is_legal(c));

    if let Some(column) = legal().find(|&c| board.check_winning_move(c, player)) {
        return Some((column, Tactic::ImmediateWin));
    }

    let mut threats = legal().filter(|&c| board.check_winning_move(c, player.opponent()));
    match (threats.next(), threats.next()) {
        (Some(column), None) => Some((column, Tactic::ForcedBlock)),
        // with two threats the game is lost anyway, let the search decide
        _ => None,
    }
}
