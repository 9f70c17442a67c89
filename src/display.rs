use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdout, Write};

use connect4_search::engine::{Diagnostics, SearchResult};
use connect4_search::{BitBoard, Cell, HEIGHT, WIDTH};

/// Draws the board below the cursor, with the column numbers on top
pub fn draw_board(board: &BitBoard) -> Result<()> {
    let mut stdout = stdout();

    let cols: String = (0..WIDTH).map(|x| x.to_string()).collect();
    stdout.queue(PrintStyledContent(style(cols + "\n")))?;
    for _ in 0..HEIGHT {
        stdout.queue(PrintStyledContent(style("\n")))?;
    }
    stdout.flush()?;

    let (origin_x, origin_y) = crossterm::cursor::position()?;

    let grid = board.to_grid();
    for (row, cells) in grid.iter().enumerate() {
        for (column, cell) in cells.iter().enumerate() {
            let (pos_x, pos_y) = (origin_x + column as u16, origin_y - row as u16);

            stdout
                .queue(MoveTo(pos_x, pos_y))?
                .queue(PrintStyledContent(
                    style("O")
                        .attribute(Attribute::Bold)
                        .on(Color::DarkBlue)
                        .with(match cell {
                            Cell::PlayerOne => Color::Red,
                            Cell::PlayerTwo => Color::Yellow,
                            Cell::Empty => Color::DarkBlue,
                        }),
                ))?;
        }
    }
    stdout
        .queue(MoveTo(origin_x + WIDTH as u16, origin_y))?
        .queue(PrintStyledContent(style("\n")))?;
    stdout.flush()?;
    Ok(())
}

/// Prints the per-column breakdown of a search, if there is one
pub fn print_diagnostics(result: &SearchResult) {
    if let Some(tactic) = result.tactic {
        println!("Forced move: {:?}", tactic);
    }
    match &result.diagnostics {
        Some(Diagnostics::Minimax {
            column_scores,
            stats,
        }) => {
            for (column, score) in column_scores.iter().enumerate() {
                if let Some(score) = score {
                    println!("  column {}: {}", column, score);
                }
            }
            println!(
                "  {} nodes, {} cutoffs, {} table hits",
                stats.nodes, stats.cutoffs, stats.table_hits
            );
        }
        Some(Diagnostics::Mcts {
            column_visits,
            column_win_rates,
            iterations,
            exploration,
            elapsed,
            from_table,
        }) => {
            for (column, visits) in column_visits.iter().enumerate() {
                if let Some(rate) = column_win_rates[column] {
                    println!("  column {}: {} visits, {:.1}% wins", column, visits, rate * 100.0);
                }
            }
            println!(
                "  {} iterations in {:.2}s, c = {}{}",
                iterations,
                elapsed.as_secs_f64(),
                exploration,
                if *from_table { ", answered from the table" } else { "" }
            );
        }
        None => {}
    }
}
