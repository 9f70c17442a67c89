//! Engine versus engine matches
//!
//! Games of a match are independent, so they are spread over the rayon thread
//! pool. Every game builds its own engines, no table is shared between games.

use anyhow::{Context, Result};
use log::info;
use rayon::prelude::*;

use std::time::{Duration, Instant};

use crate::engine::{Budget, Engine};
use crate::game::{Game, GameState};
use crate::mcts::MctsConfig;
use crate::minimax::MinimaxConfig;
use crate::Player;

/// An engine setup taking part in a match
#[derive(Clone, Debug)]
pub struct Contestant {
    pub name: String,
    pub budget: Budget,
    pub minimax: MinimaxConfig,
    pub mcts: MctsConfig,
}

impl Contestant {
    pub fn new<S: Into<String>>(name: S, budget: Budget) -> Self {
        Self {
            name: name.into(),
            budget,
            minimax: MinimaxConfig::default(),
            mcts: MctsConfig::default(),
        }
    }

    pub fn with_minimax_config(mut self, config: MinimaxConfig) -> Self {
        self.minimax = config;
        self
    }

    pub fn with_mcts_config(mut self, config: MctsConfig) -> Self {
        self.mcts = config;
        self
    }

    fn engine(&self, seed: u64) -> Engine {
        // a fixed seed on the contestant wins over the per-game seed
        let mcts = match self.mcts.seed {
            Some(_) => self.mcts.clone(),
            None => self.mcts.clone().with_seed(seed),
        };
        Engine::with_configs(self.minimax.clone(), mcts)
    }
}

/// How a single game went
#[derive(Clone, Debug)]
pub struct GameRecord {
    /// columns played, as a string of digits
    pub moves: String,
    pub state: GameState,
    /// total thinking time, indexed by [`Player::index`]
    pub think_time: [Duration; 2],
    /// moves made, indexed by [`Player::index`]
    pub move_count: [u32; 2],
}

impl GameRecord {
    pub fn winner(&self) -> Option<Player> {
        match self.state {
            GameState::Won(player) => Some(player),
            _ => None,
        }
    }
}

/// Plays one game, `one` moving first
pub fn play_game(one: &Contestant, two: &Contestant, seed: u64) -> Result<GameRecord> {
    let mut engines = [one.engine(seed), two.engine(seed.wrapping_add(1))];
    let budgets = [one.budget, two.budget];

    let mut game = Game::new();
    let mut think_time = [Duration::default(); 2];
    let mut move_count = [0; 2];

    while !game.is_over() {
        let player = game.to_move();
        let i = player.index();

        let start = Instant::now();
        let result = engines[i].select_move(game.board(), player, budgets[i])?;
        think_time[i] += start.elapsed();
        move_count[i] += 1;

        game.play(result.column)
            .with_context(|| format!("engine returned an illegal move after '{}'", game.history()))?;
    }

    Ok(GameRecord {
        moves: game.history().to_string(),
        state: game.state(),
        think_time,
        move_count,
    })
}

#[derive(Clone, Debug)]
pub struct MatchConfig {
    pub first: Contestant,
    pub second: Contestant,
    pub games: usize,
    /// base seed, every game derives its own from it
    pub seed: u64,
}

/// Aggregated results of a match, from the point of view of the contestants
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchSummary {
    pub games: usize,
    pub wins_first: usize,
    pub wins_second: usize,
    pub draws: usize,
    pub mean_move_time_first: Duration,
    pub mean_move_time_second: Duration,
}

/// Plays `config.games` games in parallel, the contestants taking turns to start
///
/// `on_game` is called from the worker threads as soon as each game finishes.
pub fn run_match<F>(config: &MatchConfig, on_game: F) -> Result<MatchSummary>
where
    F: Fn(&GameRecord) + Sync,
{
    let records = (0..config.games)
        .into_par_iter()
        .map(|i| -> Result<(bool, GameRecord)> {
            let seed = config.seed.wrapping_add(2 * i as u64);
            // on odd games the second contestant moves first
            let swapped = i % 2 == 1;
            let record = if swapped {
                play_game(&config.second, &config.first, seed)?
            } else {
                play_game(&config.first, &config.second, seed)?
            };
            on_game(&record);
            Ok((swapped, record))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut summary = MatchSummary {
        games: records.len(),
        ..MatchSummary::default()
    };
    let mut time = [Duration::default(); 2];
    let mut moves = [0u32; 2];

    for (swapped, record) in records.iter() {
        // contestant index of Player One and Player Two in this game
        let seats = if *swapped { [1, 0] } else { [0, 1] };
        for player in [Player::One, Player::Two] {
            time[seats[player.index()]] += record.think_time[player.index()];
            moves[seats[player.index()]] += record.move_count[player.index()];
        }
        match record.winner() {
            Some(player) if seats[player.index()] == 0 => summary.wins_first += 1,
            Some(_) => summary.wins_second += 1,
            None => summary.draws += 1,
        }
    }

    summary.mean_move_time_first = time[0] / moves[0].max(1);
    summary.mean_move_time_second = time[1] / moves[1].max(1);

    info!(
        "{} vs {}: {} - {} with {} draws over {} games",
        config.first.name,
        config.second.name,
        summary.wins_first,
        summary.wins_second,
        summary.draws,
        summary.games
    );
    Ok(summary)
}
