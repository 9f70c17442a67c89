use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use std::io::{stdin, stdout, Write};
use std::time::{Duration, Instant};

use connect4_search::arena::{run_match, Contestant, MatchConfig};
use connect4_search::mcts::MctsConfig;
use connect4_search::minimax::{Minimax, MinimaxConfig};
use connect4_search::*;

mod display;
use display::*;

#[derive(Parser, Debug)]
#[command(name = "connect4", version, about = "Connect 4 search engines: play, engine matches and benchmarks")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a game in the terminal
    Play {
        /// Which players are engine controlled
        #[arg(long, value_enum, default_value_t = AiPlayers::Two)]
        ai: AiPlayers,

        /// Moves to start from, as column digits
        #[arg(long, default_value = "")]
        moves: String,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Play Minimax against MCTS
    Arena {
        /// Minimax search depth
        #[arg(long, default_value_t = 4)]
        depth: u32,

        /// MCTS iterations per move
        #[arg(long, default_value_t = 2000)]
        iterations: u32,

        /// MCTS time limit per move, in seconds
        #[arg(long)]
        time_limit: Option<f64>,

        #[arg(long, default_value_t = 10)]
        games: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Compare alpha-beta with plain minimax
    Bench {
        #[arg(long, default_value_t = 5)]
        depth: u32,

        /// Positions to search, as column digits
        #[arg(long, value_delimiter = ',', default_value = ",3,3344,334455,2233,3322115,0123456")]
        positions: Vec<String>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum AiPlayers {
    None,
    One,
    Two,
    Both,
}

impl AiPlayers {
    fn controls(self, player: Player) -> bool {
        matches!(
            (self, player),
            (AiPlayers::Both, _) | (AiPlayers::One, Player::One) | (AiPlayers::Two, Player::Two)
        )
    }
}

#[derive(Args, Debug, Clone)]
struct EngineArgs {
    /// Minimax search depth
    #[arg(long, default_value_t = 6)]
    depth: u32,

    /// Search with MCTS for this many iterations instead of Minimax
    #[arg(long)]
    iterations: Option<u32>,

    /// MCTS time limit per move, in seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Seed for MCTS
    #[arg(long)]
    seed: Option<u64>,

    /// Print per-column scores after every engine move
    #[arg(long)]
    diagnostics: bool,
}

impl EngineArgs {
    fn budget(&self) -> Budget {
        match self.iterations {
            Some(iterations) => Budget::Mcts {
                iterations,
                time_limit: self.time_limit.map(Duration::from_secs_f64),
            },
            None => Budget::Depth(self.depth),
        }
    }

    fn engine(&self) -> Engine {
        let mut mcts = MctsConfig::default();
        if let Some(seed) = self.seed {
            mcts = mcts.with_seed(seed);
        }
        Engine::with_configs(MinimaxConfig::default(), mcts).with_diagnostics(self.diagnostics)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    )
    .init();

    match cli.command {
        Command::Play { ai, moves, engine } => play(ai, &moves, &engine),
        Command::Arena {
            depth,
            iterations,
            time_limit,
            games,
            seed,
        } => arena(depth, iterations, time_limit, games, seed),
        Command::Bench { depth, positions } => bench(depth, &positions),
    }
}

fn play(ai: AiPlayers, moves: &str, args: &EngineArgs) -> Result<()> {
    let mut game = Game::from_moves(moves)?;
    let mut engine = args.engine();
    let budget = args.budget();
    let stdin = stdin();

    println!("Welcome to Connect 4\n");

    // game loop
    loop {
        draw_board(game.board())?;

        match game.state() {
            GameState::Playing => {
                let player = game.to_move();
                let next_move = if ai.controls(player) {
                    println!("AI is thinking...");
                    stdout().flush()?;

                    // slow down play if both players are AI
                    if ai == AiPlayers::Both {
                        std::thread::sleep(Duration::new(1, 0));
                    }

                    let result = engine.select_move(game.board(), player, budget)?;
                    if args.diagnostics {
                        print_diagnostics(&result);
                    }
                    println!("{} plays column {}", player, result.column);
                    result.column

                // human player
                } else {
                    print!("Move input > ");
                    stdout().flush()?;
                    let mut input_str = String::new();
                    if stdin.read_line(&mut input_str)? == 0 {
                        return Err(anyhow!("input closed before the end of the game"));
                    }

                    match input_str.trim().parse::<usize>() {
                        Err(_) => {
                            println!("Invalid number: {}", input_str.trim());
                            continue;
                        }
                        Ok(column) => column,
                    }
                };

                if let Err(err) = game.play(next_move) {
                    println!("{}", err);
                    // try the move again
                    continue;
                }
            }

            // end states
            GameState::Won(player) => {
                println!("{} wins!", player);
                break;
            }
            GameState::Draw => {
                println!("Draw!");
                break;
            }
        }
    }
    println!("Moves: {}", game.history());
    Ok(())
}

fn arena(depth: u32, iterations: u32, time_limit: Option<f64>, games: usize, seed: u64) -> Result<()> {
    let config = MatchConfig {
        first: Contestant::new(format!("minimax (depth {})", depth), Budget::Depth(depth)),
        second: Contestant::new(
            format!("mcts ({} iterations)", iterations),
            Budget::Mcts {
                iterations,
                time_limit: time_limit.map(Duration::from_secs_f64),
            },
        ),
        games,
        seed,
    };

    let progress = ProgressBar::new(games as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("Playing games: {bar:40.cyan/blue} {pos}/{len} ~{eta} remaining")
            .progress_chars("█▓▒░  "),
    );

    let start = Instant::now();
    let summary = run_match(&config, |_| progress.inc(1))?;
    progress.finish();

    println!(
        "{} games in {:.1}s",
        summary.games,
        start.elapsed().as_secs_f64()
    );
    println!(
        "{:<24} {:>5} wins, {:>8.1}ms per move",
        config.first.name,
        summary.wins_first,
        summary.mean_move_time_first.as_secs_f64() * 1000.0
    );
    println!(
        "{:<24} {:>5} wins, {:>8.1}ms per move",
        config.second.name,
        summary.wins_second,
        summary.mean_move_time_second.as_secs_f64() * 1000.0
    );
    println!("{:<24} {:>5}", "draws", summary.draws);
    Ok(())
}

fn bench(depth: u32, positions: &[String]) -> Result<()> {
    let mut minimax = Minimax::new();

    println!(
        "{:<10} {:>6} {:>12} {:>10} {:>12} {:>10} {:>8}",
        "position", "column", "alpha-beta", "time", "minimax", "time", "saved"
    );
    for moves in positions {
        let board = BitBoard::from_moves(moves)?;
        let player = board.side_to_move();

        let start = Instant::now();
        let pruned = minimax.select_move(&board, player, depth)?;
        let pruned_time = start.elapsed();

        let start = Instant::now();
        let full = minimax.minimax_full(&board, player, depth)?;
        let full_time = start.elapsed();

        if pruned.column != full.column {
            println!("warning: searches disagree on '{}'", moves);
        }

        let saved = 100.0 * (1.0 - pruned.stats.nodes as f64 / full.stats.nodes.max(1) as f64);
        println!(
            "{:<10} {:>6} {:>12} {:>9.1}ms {:>12} {:>9.1}ms {:>7.1}%",
            if moves.is_empty() { "(empty)" } else { moves.as_str() },
            pruned.column,
            pruned.stats.nodes,
            pruned_time.as_secs_f64() * 1000.0,
            full.stats.nodes,
            full_time.as_secs_f64() * 1000.0,
            saved
        );
    }
    Ok(())
}
