use std::collections::HashMap;

use crate::bitboard::{mirror_column, BitBoard};
use crate::Player;

/// How a stored Minimax score relates to the true value of the position
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Bound {
    /// the score is the value of the position
    Exact,
    /// the search failed high, the value is at least the score
    Lower,
    /// the search failed low, the value is at most the score
    Upper,
}

#[derive(Copy, Clone)]
struct Entry {
    key: u64,
    score: i32,
    depth: u8,
    best_move: u8,
    bound: Bound,
}

// no position packs to all ones, the top bit of the key is always clear
const EMPTY_KEY: u64 = u64::MAX;

impl Entry {
    pub fn new() -> Self {
        Self {
            key: EMPTY_KEY,
            score: 0,
            depth: 0,
            best_move: 0,
            bound: Bound::Exact,
        }
    }
}

/// A Minimax result read back from the table, already oriented for the queried board
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TableHit {
    pub depth: u32,
    pub score: i32,
    pub best_move: usize,
    pub bound: Bound,
}

pub const TABLE_DEFAULT_SIZE: usize = (1 << 20) + 7; // prime value

/// Fixed-size table of Minimax results keyed by canonical position
///
/// A position and its mirror image share one slot; the best move is stored in
/// the orientation of the canonical position and mirrored back on lookup.
/// Entries keep the full key, so a slot collision is a miss, never a false hit.
#[derive(Clone)]
pub struct TranspositionTable {
    entries: Vec<Entry>,
    occupied: usize,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::with_size(TABLE_DEFAULT_SIZE)
    }

    pub fn with_size(size: usize) -> Self {
        Self {
            entries: vec![Entry::new(); size.max(1)],
            occupied: 0,
        }
    }

    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|entry| *entry = Entry::new());
        self.occupied = 0;
    }

    /// Number of filled slots
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn set(&mut self, board: &BitBoard, depth: u32, score: i32, best_move: usize, bound: Bound) {
        let (key, mirrored) = board.canonical_key();
        let best_move = if mirrored { mirror_column(best_move) } else { best_move };

        let len = self.entries.len();
        let slot = &mut self.entries[(key % len as u64) as usize];
        if slot.key == EMPTY_KEY {
            self.occupied += 1;
        }
        *slot = Entry {
            key,
            score,
            depth: depth.min(u8::MAX as u32) as u8,
            best_move: best_move as u8,
            bound,
        };
    }

    pub fn get(&self, board: &BitBoard) -> Option<TableHit> {
        let (key, mirrored) = board.canonical_key();
        let entry = self.entries[(key % self.entries.len() as u64) as usize];
        if entry.key != key {
            return None;
        }
        let best_move = entry.best_move as usize;
        Some(TableHit {
            depth: entry.depth as u32,
            score: entry.score,
            best_move: if mirrored { mirror_column(best_move) } else { best_move },
            bound: entry.bound,
        })
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulated MCTS statistics of a searched root position
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VisitEntry {
    pub visits: u32,
    pub wins: f64,
    pub best_move: usize,
}

/// MCTS results keyed by canonical position and the player searched for, with
/// the same mirroring rules as [`TranspositionTable`]
#[derive(Clone, Default)]
pub struct VisitTable {
    entries: HashMap<(u64, Player), VisitEntry>,
}

impl VisitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn set(&mut self, board: &BitBoard, player: Player, entry: VisitEntry) {
        let (key, mirrored) = board.canonical_key();
        let best_move = if mirrored {
            mirror_column(entry.best_move)
        } else {
            entry.best_move
        };
        self.entries.insert((key, player), VisitEntry { best_move, ..entry });
    }

    pub fn get(&self, board: &BitBoard, player: Player) -> Option<VisitEntry> {
        let (key, mirrored) = board.canonical_key();
        self.entries.get(&(key, player)).map(|entry| VisitEntry {
            best_move: if mirrored {
                mirror_column(entry.best_move)
            } else {
                entry.best_move
            },
            ..*entry
        })
    }
}
