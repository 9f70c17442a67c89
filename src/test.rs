#[cfg(test)]
pub mod test {
    use anyhow::{anyhow, Result};
    use rand::seq::IndexedRandom;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use crate::arena::{play_game, run_match, Contestant, MatchConfig};
    use crate::bitboard::{center_order, mirror_column};
    use crate::engine::{root_tactic, Diagnostics, Tactic};
    use crate::evaluation::{
        evaluate, evaluate_to_move, positional_score, PatternCounts, SCORE_THREAT,
        SCORE_THREE_OPEN, SCORE_TWO,
    };
    use crate::mcts::{Mcts, MctsConfig, RolloutPolicy};
    use crate::minimax::{KillerMoves, Minimax, MinimaxConfig, WIN_SCORE};
    use crate::transposition_table::{Bound, TranspositionTable, VisitEntry, VisitTable};
    use crate::*;

    // a complete game without any four in a row
    const DRAWN_GAME: &str = "000000166116611661422442244224533553355335";

    // Player One completes the bottom row in column 3
    const WIN_IN_3: &str = "051526";

    // Player Two threatens the bottom row in column 2, Player One to move
    const THREAT_IN_2: &str = "630405";

    fn small_minimax() -> Minimax {
        Minimax::with_config(MinimaxConfig::default().with_table_size((1 << 16) + 1))
    }

    // every position with at least one legal move and no winner met in random games
    fn random_positions(seed: u64, games: usize) -> Result<Vec<BitBoard>> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut positions = vec![];
        for _ in 0..games {
            let mut board = BitBoard::new();
            let mut player = Player::One;
            while board.has_legal_moves() {
                positions.push(board);
                let legal: Vec<usize> = board.legal_moves().collect();
                let column = *legal.choose(&mut rng).ok_or(anyhow!("no legal move"))?;
                board.drop(column, player)?;
                if board.wins_through(column) {
                    break;
                }
                player = player.opponent();
            }
        }
        Ok(positions)
    }

    fn drawn_grid() -> Grid {
        let mut grid = [[Cell::Empty; WIDTH]; HEIGHT];
        for (row, cells) in grid.iter_mut().enumerate() {
            for (column, cell) in cells.iter_mut().enumerate() {
                *cell = if (row + column / 2) % 2 == 0 {
                    Cell::PlayerOne
                } else {
                    Cell::PlayerTwo
                };
            }
        }
        grid
    }

    #[test]
    pub fn drop_and_read_cells() -> Result<()> {
        let mut board = BitBoard::new();
        assert_eq!(board.drop(3, Player::One)?, 0);
        assert_eq!(board.drop(3, Player::Two)?, 1);

        assert_eq!(board.cell(0, 3), Cell::PlayerOne);
        assert_eq!(board.cell(1, 3), Cell::PlayerTwo);
        // clear bits above the height are not Player One pieces
        assert_eq!(board.cell(2, 3), Cell::Empty);
        assert_eq!(board.cell(0, 0), Cell::Empty);

        assert_eq!(board.height(3), 2);
        assert_eq!(board.num_moves(), 2);
        assert_eq!(board.side_to_move(), Player::One);
        assert!(board.is_consistent());
        Ok(())
    }

    #[test]
    pub fn full_column_is_rejected() -> Result<()> {
        let mut board = BitBoard::from_moves("000000")?;
        let before = board;

        assert_eq!(board.drop(0, Player::One), Err(BoardError::ColumnFull(0)));
        assert_eq!(board.drop(7, Player::One), Err(BoardError::ColumnOutOfRange(7)));
        assert_eq!(board, before);

        assert!(!board.is_legal(0));
        assert_eq!(board.legal_moves().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
        Ok(())
    }

    #[test]
    pub fn move_strings() -> Result<()> {
        assert_eq!(BitBoard::from_moves("9"), Err(BoardError::ColumnOutOfRange(9)));
        assert_eq!(BitBoard::from_moves("3a"), Err(BoardError::UnparsableMove('a')));
        assert_eq!(BitBoard::from_moves("0000000"), Err(BoardError::ColumnFull(0)));
        // Player One has four in column 0 after the seventh move
        assert!(BitBoard::from_moves("0101010")?.is_win(Player::One));
        assert_eq!(BitBoard::from_moves("01010101"), Err(BoardError::GameOver));
        Ok(())
    }

    #[test]
    pub fn display() -> Result<()> {
        let board = BitBoard::from_moves("33")?;
        assert_eq!(
            board.to_string(),
            ".......\n.......\n.......\n.......\n...O...\n...X...\n0123456"
        );
        Ok(())
    }

    #[test]
    pub fn center_order_starts_in_the_middle() {
        assert_eq!(center_order(), [3, 2, 4, 1, 5, 0, 6]);
    }

    #[test]
    pub fn drawn_board_is_terminal() -> Result<()> {
        let board = BitBoard::from_moves(DRAWN_GAME)?;

        assert_eq!(board, BitBoard::from_grid(&drawn_grid())?);
        assert!(!board.has_legal_moves());
        assert_eq!(board.winner(), None);
        assert!(board.is_terminal());

        let mut engine = Engine::new();
        assert_eq!(
            engine.select_move(&board, Player::One, Budget::Depth(4)),
            Err(SearchError::NoLegalMoves)
        );
        assert_eq!(
            engine.select_move(&board, Player::One, Budget::iterations(100)),
            Err(SearchError::NoLegalMoves)
        );
        Ok(())
    }

    #[test]
    pub fn grid_round_trip() -> Result<()> {
        for board in random_positions(1, 50)? {
            let grid = board.to_grid();
            assert_eq!(BitBoard::from_grid(&grid)?, board);
            assert!(board.is_consistent());
        }
        Ok(())
    }

    #[test]
    pub fn floating_piece_is_rejected() {
        let mut grid = [[Cell::Empty; WIDTH]; HEIGHT];
        grid[0][2] = Cell::PlayerOne;
        grid[2][2] = Cell::PlayerTwo;
        assert_eq!(
            BitBoard::from_grid(&grid),
            Err(BoardError::FloatingPiece { row: 2, column: 2 })
        );
    }

    #[test]
    pub fn incremental_win_matches_full_scan() -> Result<()> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let mut wins = 0;
        for _ in 0..200 {
            let mut board = BitBoard::new();
            let mut player = Player::One;
            while board.has_legal_moves() {
                let legal: Vec<usize> = board.legal_moves().collect();
                let column = *legal.choose(&mut rng).ok_or(anyhow!("no legal move"))?;

                let predicted = board.check_winning_move(column, player);
                board.drop(column, player)?;
                assert_eq!(board.wins_through(column), board.is_win(player));
                assert_eq!(predicted, board.is_win(player));
                assert!(!board.is_win(player.opponent()));

                if board.is_win(player) {
                    wins += 1;
                    break;
                }
                player = player.opponent();
            }
        }
        assert!(wins > 0);
        Ok(())
    }

    #[test]
    pub fn canonical_keys_only_join_mirrors() -> Result<()> {
        let mut seen: HashMap<u64, BitBoard> = HashMap::new();
        for board in random_positions(3, 200)? {
            let mirror = board.mirror();
            assert_eq!(mirror.mirror(), board);
            assert!(mirror.is_consistent());

            let (key, mirrored) = board.canonical_key();
            let (mirror_key, mirror_mirrored) = mirror.canonical_key();
            assert_eq!(key, mirror_key);
            if board != mirror {
                assert_ne!(mirrored, mirror_mirrored);
            }

            if let Some(other) = seen.insert(key, board) {
                assert!(other == board || other == mirror, "{:?} collides with {:?}", board, other);
            }
        }
        Ok(())
    }

    #[test]
    pub fn transposition_table_mirrors_best_move() -> Result<()> {
        let board = BitBoard::from_moves("0")?;
        let mut table = TranspositionTable::with_size(1021);
        table.set(&board, 3, 42, 1, Bound::Lower);

        let hit = table.get(&board).ok_or(anyhow!("missing entry"))?;
        assert_eq!((hit.depth, hit.score, hit.best_move, hit.bound), (3, 42, 1, Bound::Lower));

        let hit = table.get(&board.mirror()).ok_or(anyhow!("missing mirrored entry"))?;
        assert_eq!(hit.best_move, 5);

        assert_eq!(table.get(&BitBoard::from_moves("1")?), None);
        assert_eq!(table.occupied(), 1);
        table.clear();
        assert_eq!(table.get(&board), None);

        let mut visits = VisitTable::new();
        visits.set(
            &board.mirror(),
            Player::One,
            VisitEntry {
                visits: 600,
                wins: 300.0,
                best_move: 6,
            },
        );
        let entry = visits.get(&board, Player::One).ok_or(anyhow!("missing visit entry"))?;
        assert_eq!(entry.best_move, 0);
        assert_eq!(entry.visits, 600);
        assert_eq!(visits.get(&board, Player::Two), None);
        Ok(())
    }

    #[test]
    pub fn evaluation_is_antisymmetric() -> Result<()> {
        for board in random_positions(4, 100)? {
            assert_eq!(evaluate(&board, Player::One), -evaluate(&board, Player::Two));
        }
        Ok(())
    }

    #[test]
    pub fn floating_cells_are_not_scored() -> Result<()> {
        let empty = BitBoard::new();
        assert_eq!(evaluate(&empty, Player::One), 0);
        assert_eq!(PatternCounts::count(&empty, Player::One), PatternCounts::default());
        assert_eq!(PatternCounts::count(&empty, Player::Two), PatternCounts::default());

        let board = BitBoard::from_moves("3")?;
        assert_eq!(positional_score(&board, Player::One), 700);
        assert_eq!(positional_score(&board, Player::Two), 0);
        assert_eq!(PatternCounts::count(&board, Player::One), PatternCounts::default());
        Ok(())
    }

    #[test]
    pub fn pattern_counts() -> Result<()> {
        // bottom row: _ X X _ _ _ O
        let board = BitBoard::from_moves("1626")?;
        assert_eq!(
            PatternCounts::count(&board, Player::One),
            PatternCounts {
                two: 2,
                ..PatternCounts::default()
            }
        );
        assert_eq!(
            PatternCounts::count(&board, Player::Two),
            PatternCounts {
                two: 1,
                ..PatternCounts::default()
            }
        );

        // bottom row: _ X X X _ _ O
        let board = BitBoard::from_moves("16263")?;
        assert_eq!(
            PatternCounts::count(&board, Player::One),
            PatternCounts {
                three_open: 2,
                two: 1,
                ..PatternCounts::default()
            }
        );

        // bottom row: _ O X X X _ O, closed on the left only
        let board = BitBoard::from_moves("21364")?;
        assert_eq!(
            PatternCounts::count(&board, Player::One),
            PatternCounts {
                three_open: 1,
                three_closed: 1,
                ..PatternCounts::default()
            }
        );
        Ok(())
    }

    #[test]
    pub fn open_threes_weigh_more_for_the_side_to_move() -> Result<()> {
        // bottom row: _ X X X _ _ O with a second O above, Player Two to move
        let board = BitBoard::from_moves("16263")?;
        let pieces = (400 + 500 + 700) - (300 + 400);
        assert_eq!(
            evaluate(&board, Player::One),
            2 * SCORE_THREE_OPEN + SCORE_TWO - SCORE_TWO + pieces
        );

        // bottom row: _ X X X _ O O, Player One to move and threatening twice
        let board = BitBoard::from_moves("162635")?;
        let pieces = (400 + 500 + 700) - (400 + 300 + 400);
        assert_eq!(
            evaluate(&board, Player::One),
            2 * SCORE_THREE_OPEN + 2 * SCORE_THREAT - SCORE_TWO + pieces
        );
        assert_eq!(evaluate(&board, Player::Two), -evaluate(&board, Player::One));
        Ok(())
    }

    #[test]
    pub fn threat_weight_follows_the_given_side_to_move() -> Result<()> {
        // bottom row: _ X X X _ _ O with a second O above, Player Two to move
        let board = BitBoard::from_moves("16263")?;
        let pieces = (400 + 500 + 700) - (300 + 400);
        let base = 2 * SCORE_THREE_OPEN + SCORE_TWO - SCORE_TWO + pieces;

        assert_eq!(evaluate_to_move(&board, Player::One, Player::Two), base);
        assert_eq!(evaluate_to_move(&board, Player::One, Player::Two), evaluate(&board, Player::One));
        // Player One moving again turns both open threes into threats
        assert_eq!(
            evaluate_to_move(&board, Player::One, Player::One),
            base + 2 * SCORE_THREAT
        );
        assert_eq!(
            evaluate_to_move(&board, Player::Two, Player::One),
            -evaluate_to_move(&board, Player::One, Player::One)
        );
        Ok(())
    }

    #[test]
    pub fn killer_moves_keep_two_most_recent() {
        let mut killers = KillerMoves::new();
        killers.record(3, 1);
        killers.record(3, 2);
        killers.record(3, 2);
        assert_eq!(killers.get(3), [Some(2), Some(1)]);

        killers.record(3, 4);
        assert_eq!(killers.get(3), [Some(4), Some(2)]);
        assert!(!killers.contains(3, 1));
        assert_eq!(killers.get(5), [None, None]);

        killers.clear();
        assert_eq!(killers.get(3), [None, None]);
    }

    #[test]
    pub fn minimax_empty_board() -> Result<()> {
        let mut minimax = small_minimax();
        let outcome = minimax.select_move(&BitBoard::new(), Player::One, 1)?;
        assert_eq!(outcome.column, 3);

        // depth 0 searches one ply anyway
        let outcome = minimax.select_move(&BitBoard::new(), Player::One, 0)?;
        assert_eq!(outcome.column, 3);
        Ok(())
    }

    #[test]
    pub fn minimax_takes_immediate_win() -> Result<()> {
        let board = BitBoard::from_moves(WIN_IN_3)?;
        let outcome = small_minimax().select_move(&board, Player::One, 4)?;
        assert_eq!(outcome.column, 3);
        assert_eq!(outcome.score, WIN_SCORE + 3);
        Ok(())
    }

    #[test]
    pub fn minimax_blocks_threat() -> Result<()> {
        let board = BitBoard::from_moves(THREAT_IN_2)?;
        assert_eq!(board.side_to_move(), Player::One);
        for depth in 2..=5 {
            let outcome = small_minimax().select_move(&board, Player::One, depth)?;
            assert_eq!(outcome.column, 2, "depth {}", depth);
        }
        Ok(())
    }

    #[test]
    pub fn alpha_beta_matches_full_minimax() -> Result<()> {
        let mut minimax = small_minimax();
        let mut pruned_nodes = 0;
        let mut full_nodes = 0;

        for board in random_positions(5, 4)?.into_iter().step_by(3) {
            let player = board.side_to_move();
            for depth in 1..=4 {
                let pruned = minimax.select_move(&board, player, depth)?;
                let full = minimax.minimax_full(&board, player, depth)?;

                assert_eq!(pruned.column, full.column, "{:?} at depth {}", board, depth);
                assert_eq!(pruned.score, full.score, "{:?} at depth {}", board, depth);
                assert!(pruned.stats.nodes <= full.stats.nodes);

                pruned_nodes += pruned.stats.nodes;
                full_nodes += full.stats.nodes;
            }
        }
        println!(
            "alpha-beta: {} nodes, minimax: {} nodes, {:.1}% saved",
            pruned_nodes,
            full_nodes,
            100.0 * (1.0 - pruned_nodes as f64 / full_nodes as f64)
        );
        Ok(())
    }

    #[test]
    pub fn searches_do_not_share_tables() -> Result<()> {
        let board = BitBoard::from_moves("3344")?;
        let mut minimax = small_minimax();
        let first = minimax.select_move(&board, Player::One, 5)?;
        assert!(minimax.transposition_table().occupied() > 0);

        let second = minimax.select_move(&board, Player::One, 5)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    pub fn minimax_diagnostics() -> Result<()> {
        let board = BitBoard::from_moves("3")?;
        let mut engine = Engine::new()
            .with_minimax_config(MinimaxConfig::default().with_table_size((1 << 16) + 1))
            .with_diagnostics(true);
        let result = engine.select_move(&board, Player::Two, Budget::Depth(3))?;
        let score = result.score.ok_or(anyhow!("missing score"))?;

        match result.diagnostics {
            Some(Diagnostics::Minimax { column_scores, stats }) => {
                assert!(column_scores.iter().all(|s| s.is_some()));
                assert_eq!(column_scores[result.column], Some(score));
                assert_eq!(column_scores.iter().flatten().max(), Some(&score));
                assert!(stats.nodes > 0);
            }
            other => return Err(anyhow!("unexpected diagnostics {:?}", other)),
        }
        Ok(())
    }

    #[test]
    pub fn rollout_policy() -> Result<()> {
        let policy = RolloutPolicy {
            randomness: 0.0,
            move_cap: 50,
        };
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(6);

        let board = BitBoard::from_moves(WIN_IN_3)?;
        assert_eq!(policy.choose(&board, Player::One, &mut rng), Some(3));
        let board = BitBoard::from_moves(THREAT_IN_2)?;
        assert_eq!(policy.choose(&board, Player::One, &mut rng), Some(2));
        assert_eq!(policy.choose(&BitBoard::new(), Player::One, &mut rng), Some(3));

        let full = BitBoard::from_moves(DRAWN_GAME)?;
        assert_eq!(policy.choose(&full, Player::One, &mut rng), None);
        assert_eq!(policy.simulate(&full, Player::One, &mut rng), None);

        // with no moves allowed every simulation is a draw
        let capped = RolloutPolicy {
            randomness: 0.5,
            move_cap: 0,
        };
        assert_eq!(capped.simulate(&BitBoard::new(), Player::One, &mut rng), None);
        Ok(())
    }

    #[test]
    pub fn mcts_returns_legal_columns() -> Result<()> {
        let mut mcts = Mcts::with_config(
            MctsConfig::default()
                .with_seed(7)
                .with_transposition_table(false),
        );
        for board in random_positions(8, 5)? {
            let player = board.side_to_move();
            for iterations in [1, 50] {
                let outcome = mcts.select_move(&board, player, iterations, None)?;
                assert!(board.is_legal(outcome.column));
                assert_eq!(outcome.iterations, iterations);
                assert_eq!(outcome.column_visits.iter().sum::<u32>(), iterations);
            }
        }
        Ok(())
    }

    #[test]
    pub fn mcts_takes_immediate_win() -> Result<()> {
        let board = BitBoard::from_moves(WIN_IN_3)?;
        let mut mcts = Mcts::with_config(MctsConfig::default().with_seed(9));
        let outcome = mcts.select_move(&board, Player::One, 2000, None)?;
        assert_eq!(outcome.column, 3);
        assert!(!outcome.from_table);
        assert_eq!(outcome.column_win_rates[3], Some(1.0));
        Ok(())
    }

    #[test]
    pub fn mcts_blocks_threat() -> Result<()> {
        let board = BitBoard::from_moves(THREAT_IN_2)?;
        for seed in 0..10 {
            let mut mcts = Mcts::with_config(
                MctsConfig::default()
                    .with_seed(seed)
                    .with_transposition_table(false),
            );
            let outcome = mcts.select_move(&board, Player::One, 1000, None)?;
            assert_eq!(outcome.column, 2, "seed {}", seed);
            assert!(!outcome.from_table);
        }
        Ok(())
    }

    #[test]
    pub fn mcts_table_is_keyed_by_side() -> Result<()> {
        let board = BitBoard::from_moves("01")?;
        let mut mcts = Mcts::with_config(MctsConfig::default().with_seed(17));

        mcts.select_move(&board, Player::One, 1000, None)?;
        assert!(mcts.select_move(&board, Player::One, 100, None)?.from_table);

        let other_side = mcts.select_move(&board, Player::Two, 100, None)?;
        assert!(!other_side.from_table);
        assert_eq!(other_side.iterations, 100);
        assert_eq!(mcts.table().len(), 2);
        Ok(())
    }

    #[test]
    pub fn mcts_mirrors_through_table() -> Result<()> {
        let board = BitBoard::from_moves("01")?;
        let mut mcts = Mcts::with_config(MctsConfig::default().with_seed(10));

        let outcome = mcts.select_move(&board, Player::One, 1000, None)?;
        assert!(!outcome.from_table);
        assert_eq!(mcts.table().len(), 1);

        let mirrored = mcts.select_move(&board.mirror(), Player::One, 1000, None)?;
        assert!(mirrored.from_table);
        assert_eq!(mirrored.iterations, 0);
        assert_eq!(mirror_column(mirrored.column), outcome.column);

        mcts.clear_table();
        let searched = mcts.select_move(&board.mirror(), Player::One, 100, None)?;
        assert!(!searched.from_table);
        Ok(())
    }

    #[test]
    pub fn mcts_untrusted_entries_are_searched_again() -> Result<()> {
        let board = BitBoard::from_moves("01")?;
        let mut mcts = Mcts::with_config(MctsConfig::default().with_seed(11));
        mcts.select_move(&board, Player::One, 100, None)?;
        let outcome = mcts.select_move(&board, Player::One, 100, None)?;
        assert!(!outcome.from_table);
        assert_eq!(outcome.iterations, 100);
        Ok(())
    }

    #[test]
    pub fn mcts_stops_at_time_limit() -> Result<()> {
        let mut mcts = Mcts::with_config(
            MctsConfig::default()
                .with_seed(12)
                .with_transposition_table(false),
        );
        let start = Instant::now();
        let outcome = mcts.select_move(
            &BitBoard::new(),
            Player::One,
            u32::MAX,
            Some(Duration::from_millis(50)),
        )?;
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(outcome.iterations > 0);
        assert!(outcome.iterations < u32::MAX);
        assert!(BitBoard::new().is_legal(outcome.column));
        Ok(())
    }

    #[test]
    pub fn engine_tactics() -> Result<()> {
        let mut engine = Engine::new()
            .with_minimax_config(MinimaxConfig::default().with_table_size((1 << 16) + 1))
            .with_mcts_config(MctsConfig::default().with_seed(13));

        let win = BitBoard::from_moves(WIN_IN_3)?;
        let threat = BitBoard::from_moves(THREAT_IN_2)?;
        assert_eq!(root_tactic(&win, Player::One), Some((3, Tactic::ImmediateWin)));
        assert_eq!(root_tactic(&threat, Player::One), Some((2, Tactic::ForcedBlock)));
        assert_eq!(root_tactic(&BitBoard::new(), Player::One), None);

        for budget in [Budget::Depth(4), Budget::iterations(500)] {
            let result = engine.select_move(&win, Player::One, budget)?;
            assert_eq!(result.column, 3);
            assert_eq!(result.tactic, Some(Tactic::ImmediateWin));

            let result = engine.select_move(&threat, Player::One, budget)?;
            assert_eq!(result.column, 2);
            assert_eq!(result.tactic, Some(Tactic::ForcedBlock));
        }
        Ok(())
    }

    #[test]
    pub fn engine_tactics_keep_diagnostics() -> Result<()> {
        let mut engine = Engine::new()
            .with_minimax_config(MinimaxConfig::default().with_table_size((1 << 16) + 1))
            .with_mcts_config(MctsConfig::default().with_seed(18))
            .with_diagnostics(true);
        let threat = BitBoard::from_moves(THREAT_IN_2)?;

        let result = engine.select_move(&threat, Player::One, Budget::Depth(4))?;
        assert_eq!(result.column, 2);
        assert_eq!(result.tactic, Some(Tactic::ForcedBlock));
        match result.diagnostics {
            Some(Diagnostics::Minimax {
                column_scores,
                stats,
            }) => {
                for column in 0..WIDTH {
                    assert_eq!(column_scores[column].is_some(), threat.is_legal(column));
                }
                assert!(column_scores[2].is_some());
                assert_eq!(result.score, column_scores[2]);
                // every other column lets Player Two complete the row
                for column in (0..WIDTH).filter(|&c| c != 2) {
                    assert!(column_scores[column] < column_scores[2]);
                }
                assert!(stats.nodes > 0);
            }
            other => return Err(anyhow!("unexpected diagnostics {:?}", other)),
        }

        let result = engine.select_move(&threat, Player::One, Budget::iterations(200))?;
        assert_eq!(result.column, 2);
        match result.diagnostics {
            Some(Diagnostics::Mcts {
                column_visits,
                iterations,
                from_table,
                ..
            }) => {
                assert_eq!(iterations, 200);
                assert_eq!(column_visits.iter().sum::<u32>(), 200);
                assert!(!from_table);
            }
            other => return Err(anyhow!("unexpected diagnostics {:?}", other)),
        }

        // without diagnostics a forced block is still scored
        let mut engine = Engine::with_configs(
            MinimaxConfig::default().with_table_size((1 << 16) + 1),
            MctsConfig::default(),
        );
        let result = engine.select_move(&threat, Player::One, Budget::Depth(4))?;
        assert_eq!(result.column, 2);
        assert!(result.score.is_some());
        assert_eq!(result.diagnostics, None);
        Ok(())
    }

    #[test]
    pub fn engine_mcts_diagnostics() -> Result<()> {
        let mut engine = Engine::new()
            .with_mcts_config(
                MctsConfig::default()
                    .with_seed(14)
                    .with_exploration(2.0),
            )
            .with_diagnostics(true);
        let result = engine.select_move(&BitBoard::new(), Player::One, Budget::iterations(200))?;
        assert_eq!(result.score, None);

        match result.diagnostics {
            Some(Diagnostics::Mcts {
                column_visits,
                iterations,
                exploration,
                from_table,
                ..
            }) => {
                assert_eq!(iterations, 200);
                assert_eq!(column_visits.iter().sum::<u32>(), 200);
                assert_eq!(column_visits[result.column], *column_visits.iter().max().unwrap_or(&0));
                assert_eq!(exploration, 2.0);
                assert!(!from_table);
            }
            other => return Err(anyhow!("unexpected diagnostics {:?}", other)),
        }
        Ok(())
    }

    #[test]
    pub fn game_states() -> Result<()> {
        let mut game = Game::from_moves("010101")?;
        assert_eq!(game.to_move(), Player::One);
        assert_eq!(game.play(9), Err(BoardError::ColumnOutOfRange(9)));
        assert_eq!(game.history(), "010101");

        assert_eq!(game.play(0)?, GameState::Won(Player::One));
        assert!(game.is_over());
        assert_eq!(game.play(1), Err(BoardError::GameOver));
        assert_eq!(game.history(), "0101010");

        let game = Game::from_moves(DRAWN_GAME)?;
        assert_eq!(game.state(), GameState::Draw);
        assert_eq!(game.board().num_moves(), WIDTH * HEIGHT);
        Ok(())
    }

    #[test]
    pub fn arena_match() -> Result<()> {
        let minimax = Contestant::new("minimax", Budget::Depth(2))
            .with_minimax_config(MinimaxConfig::default().with_table_size((1 << 12) + 1));
        let mcts = Contestant::new("mcts", Budget::iterations(100));

        let record = play_game(&minimax, &mcts, 15)?;
        assert_ne!(record.state, GameState::Playing);
        assert_eq!(
            record.moves.len() as u32,
            record.move_count.iter().sum::<u32>()
        );
        let replay = Game::from_moves(&record.moves)?;
        assert_eq!(replay.state(), record.state);

        let config = MatchConfig {
            first: minimax,
            second: mcts,
            games: 4,
            seed: 16,
        };
        let finished = AtomicUsize::new(0);
        let summary = run_match(&config, |_| {
            finished.fetch_add(1, Ordering::SeqCst);
        })?;

        assert_eq!(finished.load(Ordering::SeqCst), 4);
        assert_eq!(summary.games, 4);
        assert_eq!(summary.wins_first + summary.wins_second + summary.draws, 4);
        Ok(())
    }
}
