use crate::bitboard::{BitBoard, BoardError};
use crate::Player;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GameState {
    Playing,
    Won(Player),
    Draw,
}

/// A game in progress: the position, whose turn it is and how it got there
#[derive(Clone, Debug)]
pub struct Game {
    board: BitBoard,
    to_move: Player,
    history: String,
    state: GameState,
}

impl Game {
    pub fn new() -> Self {
        Self {
            board: BitBoard::new(),
            to_move: Player::One,
            history: String::new(),
            state: GameState::Playing,
        }
    }

    /// Replays a string of column digits, Player One moving first
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self, BoardError> {
        let mut game = Self::new();
        for column_char in moves.as_ref().chars() {
            let column = column_char
                .to_digit(10)
                .ok_or(BoardError::UnparsableMove(column_char))?;
            game.play(column as usize)?;
        }
        Ok(game)
    }

    pub fn board(&self) -> &BitBoard {
        &self.board
    }

    pub fn to_move(&self) -> Player {
        self.to_move
    }

    /// Columns played so far, as a string of digits
    pub fn history(&self) -> &str {
        &self.history
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_over(&self) -> bool {
        self.state != GameState::Playing
    }

    /// Plays `column` for the side to move and returns the new state
    ///
    /// Nothing changes when the move is rejected.
    pub fn play(&mut self, column: usize) -> Result<GameState, BoardError> {
        if self.is_over() {
            return Err(BoardError::GameOver);
        }
        self.board.drop(column, self.to_move)?;
        self.history.push_str(&column.to_string());

        self.state = if self.board.wins_through(column) {
            GameState::Won(self.to_move)
        } else if !self.board.has_legal_moves() {
            GameState::Draw
        } else {
            GameState::Playing
        };
        self.to_move = self.to_move.opponent();
        Ok(self.state)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
