//! A depth-bounded alpha-beta agent for Connect 4

use log::{debug, trace, warn};

use std::time::Instant;

use crate::bitboard::{center_order, BitBoard};
use crate::engine::SearchError;
use crate::evaluation::evaluate_to_move;
use crate::transposition_table::{Bound, TranspositionTable, TABLE_DEFAULT_SIZE};
use crate::{Player, WIDTH};

/// Base score of a proven win, above any heuristic score
///
/// A terminal position scores `WIN_SCORE + remaining depth` for the winner, so a
/// win found sooner scores higher and a loss found later scores less badly.
pub const WIN_SCORE: i32 = 1_000_000_000;

const INFINITY: i32 = 2 * WIN_SCORE;

// move ordering tiers, above any evaluator score
const PRIORITY_BLOCK: i64 = 1 << 40;
const PRIORITY_KILLER: i64 = 1 << 36;

/// Whether a score is a proven win or loss rather than a heuristic estimate
pub fn is_win_score(score: i32) -> bool {
    score.abs() >= WIN_SCORE
}

struct MoveSorter {
    size: usize,
    // column and priority
    moves: [(usize, i64); WIDTH],
}

impl MoveSorter {
    pub fn new() -> Self {
        Self {
            size: 0,
            moves: [(0, 0); WIDTH],
        }
    }
    pub fn push(&mut self, column: usize, priority: i64) {
        let mut pos = self.size;
        self.size += 1;
        while pos != 0 && self.moves[pos - 1].1 > priority {
            self.moves[pos] = self.moves[pos - 1];
            pos -= 1;
        }
        self.moves[pos] = (column, priority);
    }
}

impl Iterator for MoveSorter {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        match self.size {
            0 => None,
            _ => {
                self.size -= 1;
                Some(self.moves[self.size].0)
            }
        }
    }
}

enum OrderedMoves {
    /// a move that wins on the spot, nothing else needs ordering
    Winning(usize),
    Sorted(MoveSorter),
}

/// Columns that recently caused a cutoff, per remaining depth
///
/// Only the 2 most recent distinct columns are kept for each depth. They are
/// advisory: they change the order moves are searched in, never the result.
#[derive(Clone, Debug, Default)]
pub struct KillerMoves {
    slots: Vec<[Option<usize>; 2]>,
}

impl KillerMoves {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, depth: u32, column: usize) {
        let depth = depth as usize;
        if self.slots.len() <= depth {
            self.slots.resize(depth + 1, [None, None]);
        }
        let slot = &mut self.slots[depth];
        if slot[0] == Some(column) {
            return;
        }
        slot[1] = slot[0];
        slot[0] = Some(column);
    }

    pub fn get(&self, depth: u32) -> [Option<usize>; 2] {
        self.slots.get(depth as usize).copied().unwrap_or([None, None])
    }

    pub fn contains(&self, depth: u32, column: usize) -> bool {
        self.get(depth).contains(&Some(column))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Counters of a single search episode
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SearchStats {
    pub nodes: u64,
    pub cutoffs: u64,
    pub table_hits: u64,
}

#[derive(Clone, Debug)]
pub struct MinimaxConfig {
    /// Number of slots in the transposition table
    pub table_size: usize,
    /// Moves are ordered with the evaluator when more than this many plies remain
    pub ordering_eval_depth: u32,
}

impl Default for MinimaxConfig {
    fn default() -> Self {
        Self {
            table_size: TABLE_DEFAULT_SIZE,
            ordering_eval_depth: 2,
        }
    }
}

impl MinimaxConfig {
    pub fn with_table_size(mut self, table_size: usize) -> Self {
        self.table_size = table_size;
        self
    }

    pub fn with_ordering_eval_depth(mut self, depth: u32) -> Self {
        self.ordering_eval_depth = depth;
        self
    }
}

/// Result of a top-level Minimax search
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MinimaxOutcome {
    pub column: usize,
    /// score of the chosen move from the searching player's point of view
    pub score: i32,
    pub stats: SearchStats,
}

/// Alpha-beta game tree search with a heuristic horizon
///
/// # Notes
/// The search is a negamax: every score is from the point of view of the player
/// to move at that node. Leaves are scored with [`evaluate_to_move`] once the depth is
/// exhausted, and with `±(WIN_SCORE + remaining depth)` when the game is over.
///
/// The transposition table and killer moves only hold for one search episode,
/// since scores depend on the remaining depth bookkeeping of that episode. Both
/// are cleared at the start of every [`Minimax::select_move`].
#[derive(Clone)]
pub struct Minimax {
    config: MinimaxConfig,
    transposition_table: TranspositionTable,
    killer_moves: KillerMoves,
    stats: SearchStats,
}

impl Minimax {
    pub fn new() -> Self {
        Self::with_config(MinimaxConfig::default())
    }

    pub fn with_config(config: MinimaxConfig) -> Self {
        Self {
            transposition_table: TranspositionTable::with_size(config.table_size),
            killer_moves: KillerMoves::new(),
            stats: SearchStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &MinimaxConfig {
        &self.config
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    pub fn killer_moves(&self) -> &KillerMoves {
        &self.killer_moves
    }

    pub fn transposition_table(&self) -> &TranspositionTable {
        &self.transposition_table
    }

    /// Resets the per-episode caches and counters
    pub fn clear(&mut self) {
        self.transposition_table.clear();
        self.killer_moves.clear();
        self.stats = SearchStats::default();
    }

    /// Searches `depth` plies ahead and returns the best column for `player`
    pub fn select_move(
        &mut self,
        board: &BitBoard,
        player: Player,
        depth: u32,
    ) -> Result<MinimaxOutcome, SearchError> {
        if !board.has_legal_moves() {
            return Err(SearchError::NoLegalMoves);
        }
        let depth = checked_depth(depth);

        self.clear();
        let start = Instant::now();
        let (column, score) = self.search(board, player, depth);

        debug!(
            "minimax: depth {}, column {}, score {}, {} nodes, {} cutoffs, {} table hits, {} table entries, {:?}",
            depth,
            column,
            score,
            self.stats.nodes,
            self.stats.cutoffs,
            self.stats.table_hits,
            self.transposition_table.occupied(),
            start.elapsed()
        );
        Ok(MinimaxOutcome {
            column,
            score,
            stats: self.stats,
        })
    }

    /// Scores every legal column with a search of `depth - 1` plies after it
    ///
    /// Meant to follow [`Minimax::select_move`] on the same position and depth, so
    /// the tables of that episode are reused. The chosen move is not affected.
    pub fn column_scores(&mut self, board: &BitBoard, player: Player, depth: u32) -> [Option<i32>; WIDTH] {
        let depth = checked_depth(depth);
        let mut scores = [None; WIDTH];
        for column in board.legal_moves() {
            let score = if board.check_winning_move(column, player) {
                WIN_SCORE + depth as i32 - 1
            } else {
                let mut next = *board;
                next.play(column, player);
                -self.negamax(&next, player.opponent(), depth - 1, -INFINITY, INFINITY, Some(column))
            };
            trace!("minimax: column {} scores {}", column, score);
            scores[column] = Some(score);
        }
        scores
    }

    /// Plain minimax without pruning, transposition table or killer moves
    ///
    /// The root moves are searched in the same order as [`Minimax::select_move`]
    /// searches them, so both pick the same column among equal scores. Only
    /// useful to measure what the pruning saves.
    pub fn minimax_full(
        &mut self,
        board: &BitBoard,
        player: Player,
        depth: u32,
    ) -> Result<MinimaxOutcome, SearchError> {
        if !board.has_legal_moves() {
            return Err(SearchError::NoLegalMoves);
        }
        let depth = checked_depth(depth);
        self.clear();

        let root_moves: Vec<usize> = match self.order_moves(board, player, depth) {
            OrderedMoves::Winning(column) => std::iter::once(column)
                .chain(
                    center_order()
                        .iter()
                        .copied()
                        .filter(|&c| c != column && board.is_legal(c)),
                )
                .collect(),
            OrderedMoves::Sorted(moves) => moves.collect(),
        };

        self.stats.nodes += 1;
        let mut best = (WIDTH, -INFINITY);
        for column in root_moves {
            let mut next = *board;
            next.play(column, player);
            let score = -self.full_search(&next, player.opponent(), depth - 1, Some(column));
            if score > best.1 {
                best = (column, score);
            }
        }
        Ok(MinimaxOutcome {
            column: best.0,
            score: best.1,
            stats: self.stats,
        })
    }

    fn full_search(&mut self, board: &BitBoard, player: Player, depth: u32, last_move: Option<usize>) -> i32 {
        self.stats.nodes += 1;
        if let Some(score) = terminal_score(board, depth, last_move) {
            return score;
        }
        if depth == 0 {
            return evaluate_to_move(board, player, player);
        }
        let mut best = -INFINITY;
        for column in board.legal_moves() {
            let mut next = *board;
            next.play(column, player);
            best = best.max(-self.full_search(&next, player.opponent(), depth - 1, Some(column)));
        }
        best
    }

    /// Performs the root search, returning the best column and its score
    fn search(&mut self, board: &BitBoard, player: Player, depth: u32) -> (usize, i32) {
        self.stats.nodes += 1;

        let moves = match self.order_moves(board, player, depth) {
            OrderedMoves::Winning(column) => return (column, WIN_SCORE + depth as i32 - 1),
            OrderedMoves::Sorted(moves) => moves,
        };

        let mut alpha = -INFINITY;
        let mut best = (WIDTH, -INFINITY);
        for column in moves {
            let mut next = *board;
            next.play(column, player);
            // the search window is flipped for the other player
            let score = -self.negamax(&next, player.opponent(), depth - 1, -INFINITY, -alpha, Some(column));
            trace!("minimax: root column {} scores {}", column, score);
            if score > best.1 {
                best = (column, score);
            }
            if score > alpha {
                alpha = score;
            }
        }

        self.transposition_table
            .set(board, depth, best.1, best.0, Bound::Exact);
        best
    }

    /// Scores a position from the point of view of `player`, the side to move
    fn negamax(
        &mut self,
        board: &BitBoard,
        player: Player,
        depth: u32,
        mut alpha: i32,
        beta: i32,
        last_move: Option<usize>,
    ) -> i32 {
        self.stats.nodes += 1;

        if let Some(score) = terminal_score(board, depth, last_move) {
            return score;
        }
        if depth == 0 {
            return evaluate_to_move(board, player, player);
        }

        // try to fetch the score, or a bound of it that is enough for a cutoff,
        // from the transposition table
        if let Some(hit) = self.transposition_table.get(board) {
            // a shallower result cannot answer a deeper query
            if hit.depth >= depth {
                let usable = match hit.bound {
                    Bound::Exact => true,
                    Bound::Lower => hit.score >= beta,
                    Bound::Upper => hit.score <= alpha,
                };
                if usable {
                    self.stats.table_hits += 1;
                    return hit.score;
                }
            }
        }

        let moves = match self.order_moves(board, player, depth) {
            OrderedMoves::Winning(column) => {
                let score = WIN_SCORE + depth as i32 - 1;
                self.transposition_table
                    .set(board, depth, score, column, Bound::Exact);
                return score;
            }
            OrderedMoves::Sorted(moves) => moves,
        };

        let alpha_start = alpha;
        let mut best = (WIDTH, -INFINITY);
        for column in moves {
            let mut next = *board;
            next.play(column, player);
            let score = -self.negamax(&next, player.opponent(), depth - 1, -beta, -alpha, Some(column));
            if score > best.1 {
                best = (column, score);
            }
            if score > alpha {
                alpha = score;
            }
            // the opponent will not allow this branch, prune the remaining siblings
            if alpha >= beta {
                self.stats.cutoffs += 1;
                self.killer_moves.record(depth, column);
                break;
            }
        }

        let bound = if best.1 <= alpha_start {
            Bound::Upper
        } else if best.1 >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.transposition_table
            .set(board, depth, best.1, best.0, bound);
        best.1
    }

    /// Orders the legal moves of `player`: a winning move short-circuits everything,
    /// then moves blocking an opponent win, then killer moves, then the rest by
    /// evaluator score (deep enough nodes only) and by distance to the center
    fn order_moves(&self, board: &BitBoard, player: Player, depth: u32) -> OrderedMoves {
        let order = center_order();
        if let Some(&column) = order
            .iter()
            .find(|&&c| board.is_legal(c) && board.check_winning_move(c, player))
        {
            return OrderedMoves::Winning(column);
        }

        let mut moves = MoveSorter::new();
        // pushing edges first makes the center win ties, as the sorter pops the
        // latest of equal priorities first
        for &column in order.iter().rev() {
            if !board.is_legal(column) {
                continue;
            }
            let mut priority = 0;
            if board.check_winning_move(column, player.opponent()) {
                priority += PRIORITY_BLOCK;
            }
            if self.killer_moves.contains(depth, column) {
                priority += PRIORITY_KILLER;
            }
            if depth > self.config.ordering_eval_depth {
                let mut next = *board;
                next.play(column, player);
                priority += evaluate_to_move(&next, player, player.opponent()) as i64;
            }
            moves.push(column, priority);
        }
        OrderedMoves::Sorted(moves)
    }
}

impl Default for Minimax {
    fn default() -> Self {
        Self::new()
    }
}

fn checked_depth(depth: u32) -> u32 {
    if depth == 0 {
        warn!("depth 0 is not supported, using a minimum depth of 1");
        1
    } else {
        depth
    }
}

// score of a finished game for the player to move, who has just been beaten
// when the last move completed an alignment
fn terminal_score(board: &BitBoard, depth: u32, last_move: Option<usize>) -> Option<i32> {
    if let Some(column) = last_move {
        if board.wins_through(column) {
            return Some(-(WIN_SCORE + depth as i32));
        }
    }
    if !board.has_legal_moves() {
        return Some(0);
    }
    None
}
