//! Monte Carlo Tree Search
//!
//! Every iteration runs the four classic phases:
//! 1. selection: descend through fully expanded nodes following the highest UCB1 value
//! 2. expansion: attach one untried move, picked uniformly at random
//! 3. simulation: play the game out with a [`RolloutPolicy`]
//! 4. backpropagation: credit the result to every node on the path back to the root
//!
//! Nodes live in a flat arena and refer to each other by index, the tree is dropped
//! at the end of every search. Root results are kept across searches in a
//! [`VisitTable`] keyed by canonical position and searching player.

use log::{debug, trace, warn};
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use std::time::{Duration, Instant};

use crate::bitboard::{center_order, BitBoard};
use crate::engine::SearchError;
use crate::transposition_table::{VisitEntry, VisitTable};
use crate::{Player, WIDTH};

/// Index of a node in the search arena
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(u32);

#[derive(Clone, Debug)]
struct Node {
    board: BitBoard,
    parent: Option<NodeId>,
    /// the move that led here, `None` for the root
    column: Option<usize>,
    /// the player who made that move
    mover: Player,
    children: Vec<NodeId>,
    /// legal columns not yet expanded, one bit per column
    untried: u8,
    visits: u32,
    /// accumulated result from `mover`'s point of view
    wins: f64,
    /// set on won or drawn positions, which are never expanded
    terminal: Option<Option<Player>>,
}

impl Node {
    fn new(board: BitBoard, parent: Option<NodeId>, column: Option<usize>, mover: Player) -> Self {
        let won = column.map_or(false, |c| board.wins_through(c));
        let terminal = if won {
            Some(Some(mover))
        } else if !board.has_legal_moves() {
            Some(None)
        } else {
            None
        };
        let untried = match terminal {
            Some(_) => 0,
            None => board.legal_moves().fold(0u8, |mask, c| mask | (1 << c)),
        };
        Self {
            board,
            parent,
            column,
            mover,
            children: Vec::new(),
            untried,
            visits: 0,
            wins: 0.0,
            terminal,
        }
    }

    fn ucb1(&self, parent_visits_ln: f64, exploration: f64) -> f64 {
        if self.visits == 0 {
            return f64::INFINITY;
        }
        let visits = self.visits as f64;
        self.wins / visits + exploration * (parent_visits_ln / visits).sqrt()
    }
}

/// Arena of search nodes, the root is always the first node
#[derive(Clone, Debug)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn new(board: BitBoard, player: Player) -> Self {
        Self {
            nodes: vec![Node::new(board, None, None, player.opponent())],
        }
    }

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn add_child(&mut self, parent: NodeId, column: usize) -> NodeId {
        let parent_node = self.get(parent);
        let mover = parent_node.mover.opponent();
        let mut board = parent_node.board;
        board.play(column, mover);

        let id = NodeId(self.nodes.len() as u32);
        self.nodes
            .push(Node::new(board, Some(parent), Some(column), mover));
        let parent_node = self.get_mut(parent);
        parent_node.children.push(id);
        parent_node.untried &= !(1 << column);
        id
    }

    /// The child with the highest UCB1 value, the first one on ties
    fn select_child(&self, id: NodeId, exploration: f64) -> Option<NodeId> {
        let node = self.get(id);
        let parent_visits_ln = (node.visits.max(1) as f64).ln();
        let mut best: Option<(NodeId, f64)> = None;
        for &child in node.children.iter() {
            let value = self.get(child).ucb1(parent_visits_ln, exploration);
            if best.map_or(true, |(_, best_value)| value > best_value) {
                best = Some((child, value));
            }
        }
        best.map(|(child, _)| child)
    }

    /// The most visited child of the root, the first one on ties
    fn most_visited(&self) -> Option<NodeId> {
        let mut best: Option<(NodeId, u32)> = None;
        for &child in self.get(self.root()).children.iter() {
            let visits = self.get(child).visits;
            if best.map_or(true, |(_, best_visits)| visits > best_visits) {
                best = Some((child, visits));
            }
        }
        best.map(|(child, _)| child)
    }
}

/// Move choice during simulation
///
/// With probability `randomness` a uniformly random legal move is played.
/// Otherwise an immediate win is taken, an immediate opponent win is blocked, and
/// failing both the most central legal column is played.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RolloutPolicy {
    pub randomness: f64,
    /// a simulation longer than this is scored as a draw
    pub move_cap: u32,
}

impl RolloutPolicy {
    pub fn choose<R: Rng>(&self, board: &BitBoard, player: Player, rng: &mut R) -> Option<usize> {
        if rng.random::<f64>() < self.randomness {
            let legal: Vec<usize> = board.legal_moves().collect();
            return legal.choose(rng).copied();
        }

        let order = center_order();
        let legal = move || order.into_iter().filter(move |&c| board.is_legal(c));
        legal()
            .find(|&c| board.check_winning_move(c, player))
            .or_else(|| legal().find(|&c| board.check_winning_move(c, player.opponent())))
            .or_else(|| legal().next())
    }

    /// Plays the game out from `board` with `player` to move, returning the winner
    /// or `None` for a draw
    pub fn simulate<R: Rng>(&self, board: &BitBoard, player: Player, rng: &mut R) -> Option<Player> {
        let mut board = *board;
        let mut player = player;
        for _ in 0..self.move_cap {
            let column = self.choose(&board, player, rng)?;
            board.play(column, player);
            if board.wins_through(column) {
                return Some(player);
            }
            player = player.opponent();
        }
        None
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MctsConfig {
    /// the UCB1 exploration constant
    pub exploration: f64,
    pub rollout_randomness: f64,
    pub rollout_move_cap: u32,
    /// a table entry with more visits than this is answered without searching
    pub trust_visits: u32,
    pub use_transposition_table: bool,
    /// fixed seed for reproducible searches, seeded from the thread RNG when `None`
    pub seed: Option<u64>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            exploration: 1.41,
            rollout_randomness: 0.1,
            rollout_move_cap: 50,
            trust_visits: 500,
            use_transposition_table: true,
            seed: None,
        }
    }
}

impl MctsConfig {
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_rollout_randomness(mut self, randomness: f64) -> Self {
        self.rollout_randomness = randomness;
        self
    }

    pub fn with_rollout_move_cap(mut self, move_cap: u32) -> Self {
        self.rollout_move_cap = move_cap;
        self
    }

    pub fn with_trust_visits(mut self, visits: u32) -> Self {
        self.trust_visits = visits;
        self
    }

    pub fn with_transposition_table(mut self, enabled: bool) -> Self {
        self.use_transposition_table = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rollout_policy(&self) -> RolloutPolicy {
        RolloutPolicy {
            randomness: self.rollout_randomness,
            move_cap: self.rollout_move_cap,
        }
    }
}

/// Result of a top-level MCTS search
#[derive(Clone, Debug, PartialEq)]
pub struct MctsOutcome {
    pub column: usize,
    /// iterations actually run, 0 when answered from the table
    pub iterations: u32,
    pub column_visits: [u32; WIDTH],
    /// win rate of each expanded root move for the searching player
    pub column_win_rates: [Option<f64>; WIDTH],
    pub exploration: f64,
    pub elapsed: Duration,
    pub from_table: bool,
    pub tree_size: usize,
}

pub struct Mcts {
    config: MctsConfig,
    policy: RolloutPolicy,
    table: VisitTable,
    rng: Xoshiro256PlusPlus,
}

impl Mcts {
    pub fn new() -> Self {
        Self::with_config(MctsConfig::default())
    }

    pub fn with_config(config: MctsConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::seed_from_u64(rand::random()),
        };
        Self {
            policy: config.rollout_policy(),
            table: VisitTable::new(),
            rng,
            config,
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    pub fn table(&self) -> &VisitTable {
        &self.table
    }

    pub fn clear_table(&mut self) {
        self.table.clear();
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    }

    /// Searches for up to `iterations` iterations or until `time_limit` has elapsed,
    /// whichever comes first, and returns the most visited root move
    ///
    /// The time limit is checked before each iteration, a running simulation is
    /// never interrupted.
    pub fn select_move(
        &mut self,
        board: &BitBoard,
        player: Player,
        iterations: u32,
        time_limit: Option<Duration>,
    ) -> Result<MctsOutcome, SearchError> {
        if !board.has_legal_moves() {
            return Err(SearchError::NoLegalMoves);
        }
        let start = Instant::now();

        if self.config.use_transposition_table {
            if let Some(entry) = self.table.get(board, player) {
                if entry.visits > self.config.trust_visits && board.is_legal(entry.best_move) {
                    debug!(
                        "mcts: column {} from the table ({} visits)",
                        entry.best_move, entry.visits
                    );
                    return Ok(MctsOutcome {
                        column: entry.best_move,
                        iterations: 0,
                        column_visits: [0; WIDTH],
                        column_win_rates: [None; WIDTH],
                        exploration: self.config.exploration,
                        elapsed: start.elapsed(),
                        from_table: true,
                        tree_size: 0,
                    });
                }
            }
        }

        let mut tree = Tree::new(*board, player);
        let mut completed = 0;
        while completed < iterations {
            if let Some(limit) = time_limit {
                if start.elapsed() >= limit {
                    break;
                }
            }
            self.iterate(&mut tree, player);
            completed += 1;
        }

        let root = tree.get(tree.root());
        let mut column_visits = [0; WIDTH];
        let mut column_win_rates = [None; WIDTH];
        for &child in root.children.iter() {
            let node = tree.get(child);
            if let Some(column) = node.column {
                column_visits[column] = node.visits;
                if node.visits > 0 {
                    column_win_rates[column] = Some(node.wins / node.visits as f64);
                }
                trace!(
                    "mcts: column {} visited {} times, win rate {:?}",
                    column,
                    node.visits,
                    column_win_rates[column]
                );
            }
        }

        let column = match tree.most_visited().and_then(|child| tree.get(child).column) {
            Some(column) => column,
            None => {
                warn!("mcts: no iteration completed, falling back to the most central legal column");
                center_order()
                    .iter()
                    .copied()
                    .find(|&c| board.is_legal(c))
                    .ok_or(SearchError::NoLegalMoves)?
            }
        };

        if self.config.use_transposition_table && root.visits > 0 {
            self.table.set(
                board,
                player,
                VisitEntry {
                    visits: root.visits,
                    // root statistics are credited to the previous mover
                    wins: root.visits as f64 - root.wins,
                    best_move: column,
                },
            );
        }

        let elapsed = start.elapsed();
        debug!(
            "mcts: column {}, {} iterations, {} nodes, {} table entries, {:?}",
            column,
            completed,
            tree.len(),
            self.table.len(),
            elapsed
        );
        Ok(MctsOutcome {
            column,
            iterations: completed,
            column_visits,
            column_win_rates,
            exploration: self.config.exploration,
            elapsed,
            from_table: false,
            tree_size: tree.len(),
        })
    }

    fn iterate(&mut self, tree: &mut Tree, root_player: Player) {
        // selection
        let mut id = tree.root();
        while tree.get(id).untried == 0 {
            match tree.select_child(id, self.config.exploration) {
                Some(child) => id = child,
                None => break,
            }
        }

        // expansion
        let untried = tree.get(id).untried;
        if untried != 0 {
            let column = nth_set_bit(untried, self.rng.random_range(0..untried.count_ones()));
            id = tree.add_child(id, column);
        }

        // simulation
        let node = tree.get(id);
        let winner = match node.terminal {
            Some(winner) => winner,
            None => self
                .policy
                .simulate(&node.board, node.mover.opponent(), &mut self.rng),
        };
        let mut reward = match winner {
            Some(p) if p == root_player => 1.0,
            Some(_) => 0.0,
            None => 0.5,
        };

        // backpropagation, levels alternate the player who moved
        if node.mover != root_player {
            reward = 1.0 - reward;
        }
        let mut current = Some(id);
        while let Some(id) = current {
            let node = tree.get_mut(id);
            node.visits += 1;
            node.wins += reward;
            reward = 1.0 - reward;
            current = node.parent;
        }
    }
}

impl Default for Mcts {
    fn default() -> Self {
        Self::new()
    }
}

// column of the n-th (0 based) set bit of a move mask
fn nth_set_bit(mask: u8, n: u32) -> usize {
    let mut mask = mask;
    for _ in 0..n {
        mask &= mask - 1;
    }
    mask.trailing_zeros() as usize
}
