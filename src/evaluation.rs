//! Static evaluation of a position
//!
//! The score of a position for a player is built from three parts:
//! - a positional weight for every piece, favouring cells that many lines pass through
//! - counts of line patterns in every window of 4 cells (four in a row, three with
//!   a gap, two with two gaps) and of 5 cells (a three closed on one side)
//! - an extra weight on the open threes of the side to move, which can be
//!   converted or must be answered on the very next move
//!
//! The final score is the player's weighted sum minus the opponent's. Every part
//! only depends on the position, so `evaluate(p, A) == -evaluate(p, B)`.

use static_assertions::*;

use crate::bitboard::{cell_bit, BitBoard};
use crate::{Player, HEIGHT, WIDTH};

/// Weight of a completed four in a row
pub const SCORE_FOUR: i32 = 1_000_000;
/// Weight of three pieces and one empty cell in a window of four
pub const SCORE_THREE_OPEN: i32 = 200_000;
/// Weight of three pieces blocked by the opponent on exactly one side
pub const SCORE_THREE_CLOSED: i32 = 10_000;
/// Weight of two pieces and two empty cells in a window of four
pub const SCORE_TWO: i32 = 6_000;
/// Extra weight on each open three of the side to move
pub const SCORE_THREAT: i32 = 600_000;

/// Positional weights, indexed `[row][column]`
pub const POSITION_WEIGHTS: [[i32; WIDTH]; HEIGHT] = [
    [300, 400, 500, 700, 500, 400, 300],
    [400, 600, 800, 1000, 800, 600, 400],
    [500, 800, 1100, 1300, 1100, 800, 500],
    [500, 800, 1100, 1300, 1100, 800, 500],
    [400, 600, 800, 1000, 800, 600, 400],
    [300, 400, 500, 700, 500, 400, 300],
];

// (row step, column step): horizontal, vertical, diagonal /, diagonal \
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

const fn window_fits(row: usize, column: usize, direction: (isize, isize), length: usize) -> bool {
    let end_row = row as isize + direction.0 * (length as isize - 1);
    let end_column = column as isize + direction.1 * (length as isize - 1);
    end_row >= 0 && end_row < HEIGHT as isize && end_column >= 0 && end_column < WIDTH as isize
}

const fn window_cell(row: usize, column: usize, direction: (isize, isize), offset: usize) -> u64 {
    let r = row as isize + direction.0 * offset as isize;
    let c = column as isize + direction.1 * offset as isize;
    cell_bit(r as usize, c as usize)
}

const fn count_windows(length: usize) -> usize {
    let mut count = 0;
    let mut d = 0;
    while d < DIRECTIONS.len() {
        let mut row = 0;
        while row < HEIGHT {
            let mut column = 0;
            while column < WIDTH {
                if window_fits(row, column, DIRECTIONS[d], length) {
                    count += 1;
                }
                column += 1;
            }
            row += 1;
        }
        d += 1;
    }
    count
}

const NUM_FOUR_WINDOWS: usize = count_windows(4);
const NUM_FIVE_WINDOWS: usize = count_windows(5);

// 24 horizontal, 21 vertical and 12 per diagonal direction
const_assert_eq!(NUM_FOUR_WINDOWS, 69);
const_assert_eq!(NUM_FIVE_WINDOWS, 44);

const fn four_windows() -> [u64; NUM_FOUR_WINDOWS] {
    let mut windows = [0; NUM_FOUR_WINDOWS];
    let mut i = 0;
    let mut d = 0;
    while d < DIRECTIONS.len() {
        let mut row = 0;
        while row < HEIGHT {
            let mut column = 0;
            while column < WIDTH {
                if window_fits(row, column, DIRECTIONS[d], 4) {
                    let mut offset = 0;
                    while offset < 4 {
                        windows[i] |= window_cell(row, column, DIRECTIONS[d], offset);
                        offset += 1;
                    }
                    i += 1;
                }
                column += 1;
            }
            row += 1;
        }
        d += 1;
    }
    windows
}

/// A window of 5 cells split into its two end cells and the three in between
#[derive(Copy, Clone)]
struct FiveWindow {
    first: u64,
    middle: u64,
    last: u64,
}

const fn five_windows() -> [FiveWindow; NUM_FIVE_WINDOWS] {
    let mut windows = [FiveWindow {
        first: 0,
        middle: 0,
        last: 0,
    }; NUM_FIVE_WINDOWS];
    let mut i = 0;
    let mut d = 0;
    while d < DIRECTIONS.len() {
        let mut row = 0;
        while row < HEIGHT {
            let mut column = 0;
            while column < WIDTH {
                if window_fits(row, column, DIRECTIONS[d], 5) {
                    let direction = DIRECTIONS[d];
                    windows[i] = FiveWindow {
                        first: window_cell(row, column, direction, 0),
                        middle: window_cell(row, column, direction, 1)
                            | window_cell(row, column, direction, 2)
                            | window_cell(row, column, direction, 3),
                        last: window_cell(row, column, direction, 4),
                    };
                    i += 1;
                }
                column += 1;
            }
            row += 1;
        }
        d += 1;
    }
    windows
}

static FOUR_WINDOWS: [u64; NUM_FOUR_WINDOWS] = four_windows();
static FIVE_WINDOWS: [FiveWindow; NUM_FIVE_WINDOWS] = five_windows();

/// Line patterns found for one player
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PatternCounts {
    pub four: u32,
    pub three_open: u32,
    pub three_closed: u32,
    pub two: u32,
}

impl PatternCounts {
    /// Counts the patterns of `player` on `board`
    ///
    /// Cells are read through height-bounded masks: a clear bit above a column's
    /// height is neither a Player One piece nor counted as an empty cell twice.
    pub fn count(board: &BitBoard, player: Player) -> Self {
        let own = board.player_mask(player);
        let opponent = board.player_mask(player.opponent());
        let empty = board.empty_mask();

        let mut counts = Self::default();
        for &window in FOUR_WINDOWS.iter() {
            let pieces = (own & window).count_ones();
            let gaps = (empty & window).count_ones();
            match (pieces, gaps) {
                (4, _) => counts.four += 1,
                (3, 1) => counts.three_open += 1,
                (2, 2) => counts.two += 1,
                _ => {}
            }
        }

        for window in FIVE_WINDOWS.iter() {
            if own & window.middle != window.middle {
                continue;
            }
            let blocked_first = opponent & window.first != 0 && empty & window.last != 0;
            let blocked_last = opponent & window.last != 0 && empty & window.first != 0;
            if blocked_first || blocked_last {
                counts.three_closed += 1;
            }
        }
        counts
    }

    fn weighted(&self) -> i32 {
        SCORE_FOUR * self.four as i32
            + SCORE_THREE_OPEN * self.three_open as i32
            + SCORE_THREE_CLOSED * self.three_closed as i32
            + SCORE_TWO * self.two as i32
    }
}

/// Sum of the positional weights of `player`'s pieces
pub fn positional_score(board: &BitBoard, player: Player) -> i32 {
    let pieces = board.player_mask(player);
    let mut score = 0;
    for (row, weights) in POSITION_WEIGHTS.iter().enumerate() {
        for (column, &weight) in weights.iter().enumerate() {
            if pieces & cell_bit(row, column) != 0 {
                score += weight;
            }
        }
    }
    score
}

/// Heuristic score of `board` from `player`'s point of view, positive when
/// `player` is better off
///
/// The side to move is derived from the piece counts. Use
/// [`evaluate_to_move`] when it is known to differ.
pub fn evaluate(board: &BitBoard, player: Player) -> i32 {
    evaluate_to_move(board, player, board.side_to_move())
}

/// Like [`evaluate`] with the side to move given explicitly
pub fn evaluate_to_move(board: &BitBoard, player: Player, to_move: Player) -> i32 {
    let own = PatternCounts::count(board, player);
    let opponent = PatternCounts::count(board, player.opponent());

    let mut score = own.weighted() + positional_score(board, player)
        - opponent.weighted()
        - positional_score(board, player.opponent());

    // open threes of the side to move decide the next move
    if to_move == player {
        score += SCORE_THREAT * own.three_open as i32;
    } else {
        score -= SCORE_THREAT * opponent.three_open as i32;
    }
    score
}
