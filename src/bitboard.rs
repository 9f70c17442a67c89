use thiserror::Error;

use std::fmt;

use crate::{Player, COLUMN_BITS, HEIGHT, WIDTH};

mod static_masks {
    use crate::{COLUMN_BITS, HEIGHT, WIDTH};

    pub const fn bottom_mask() -> u64 {
        let mut mask = 0;
        let mut column = 0;
        while column < WIDTH {
            mask |= 1 << (column * COLUMN_BITS);
            column += 1;
        }
        mask
    }
    pub const fn cell_mask() -> u64 {
        bottom_mask() * ((1 << HEIGHT as u64) - 1)
    }
    pub const fn height_field_mask() -> u64 {
        (bottom_mask() << HEIGHT) * 0b111
    }
}

/// Mask of every playable cell, excluding the height counters
pub const CELL_MASK: u64 = static_masks::cell_mask();

/// Returns the single bit of the cell at `row` (0 is the bottom) in `column`
pub const fn cell_bit(row: usize, column: usize) -> u64 {
    1 << (column * COLUMN_BITS + row)
}

/// The column a move lands in once the board is mirrored left-to-right
pub const fn mirror_column(column: usize) -> usize {
    WIDTH - 1 - column
}

/// Columns ordered from the middle outwards, as the middle columns are
/// often better moves
pub const fn center_order() -> [usize; WIDTH] {
    let mut order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        order[i] = (WIDTH / 2) + (1 - i % 2) * (i / 2) - (i % 2) * (i / 2 + 1);
        i += 1;
    }
    order
}

/// Errors raised when a move or a position is rejected by the rules
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    #[error("invalid move, column {0} out of range. Columns must be between 0 and {max}", max = WIDTH - 1)]
    ColumnOutOfRange(usize),
    #[error("invalid move, column {0} full")]
    ColumnFull(usize),
    #[error("could not parse '{0}' as a valid move")]
    UnparsableMove(char),
    #[error("invalid position, game is over")]
    GameOver,
    #[error("invalid position, floating piece at row {row} of column {column}")]
    FloatingPiece { row: usize, column: usize },
}

/// The content of a single cell
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Cell {
    PlayerOne,
    PlayerTwo,
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn player(&self) -> Option<Player> {
        match self {
            Cell::PlayerOne => Some(Player::One),
            Cell::PlayerTwo => Some(Player::Two),
            Cell::Empty => None,
        }
    }
}

impl From<Player> for Cell {
    fn from(player: Player) -> Self {
        match player {
            Player::One => Cell::PlayerOne,
            Player::Two => Cell::PlayerTwo,
        }
    }
}

/// Plain grid form of a position, indexed `[row][column]` with row 0 at the bottom
pub type Grid = [[Cell; WIDTH]; HEIGHT];

/// A Connect 4 position packed into a single 63 bit word
///
/// # Layout
/// Each column owns a group of `COLUMN_BITS` (9) bits. The low `HEIGHT` (6) bits
/// hold the cells from the bottom up, a set bit marking a Player Two piece and a
/// clear bit a Player One piece. The top 3 bits count the pieces in the column.
///
/// A clear cell bit is ambiguous on its own: it is either a Player One piece or a
/// cell above the column height. Every read is therefore bounded by the height,
/// which is mirrored in a small array so "next open row" queries are O(1).
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct BitBoard {
    packed: u64,
    heights: [u8; WIDTH],
}

impl BitBoard {
    pub fn new() -> Self {
        Self {
            packed: 0,
            heights: [0; WIDTH],
        }
    }

    /// Builds a position from a string of column digits (0 to 6), with Player One
    /// moving first and the players alternating
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self, BoardError> {
        let mut board = Self::new();
        let mut player = Player::One;

        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column) if column < WIDTH => {
                    if !board.is_legal(column) {
                        return Err(BoardError::ColumnFull(column));
                    }
                    // abort if the position is won at any point
                    if board.winner().is_some() {
                        return Err(BoardError::GameOver);
                    }
                    board.play(column, player);
                    player = player.opponent();
                }
                Some(column) => return Err(BoardError::ColumnOutOfRange(column)),
                None => return Err(BoardError::UnparsableMove(column_char)),
            }
        }
        Ok(board)
    }

    /// Rebuilds a position from its grid form
    ///
    /// Heights and occupancy are reconstructed from the cells alone, bottom-up per
    /// column, so the result does not depend on the order the pieces were played in.
    pub fn from_grid(grid: &Grid) -> Result<Self, BoardError> {
        let mut board = Self::new();
        for column in 0..WIDTH {
            for row in 0..HEIGHT {
                if let Some(player) = grid[row][column].player() {
                    if board.height(column) != row {
                        return Err(BoardError::FloatingPiece { row, column });
                    }
                    board.play(column, player);
                }
            }
        }
        Ok(board)
    }

    pub fn to_grid(&self) -> Grid {
        let mut grid = [[Cell::Empty; WIDTH]; HEIGHT];
        for (row, cells) in grid.iter_mut().enumerate() {
            for (column, cell) in cells.iter_mut().enumerate() {
                *cell = self.cell(row, column);
            }
        }
        grid
    }

    /// Height-bounded read of a single cell
    pub fn cell(&self, row: usize, column: usize) -> Cell {
        if row >= self.height(column) {
            // the bit here is clear but it is not a Player One piece
            return Cell::Empty;
        }
        if self.packed & cell_bit(row, column) != 0 {
            Cell::PlayerTwo
        } else {
            Cell::PlayerOne
        }
    }

    /// Number of pieces in `column`, which is also the next open row
    pub fn height(&self, column: usize) -> usize {
        self.heights[column] as usize
    }

    pub fn num_moves(&self) -> usize {
        self.heights.iter().map(|&h| h as usize).sum()
    }

    pub fn is_legal(&self, column: usize) -> bool {
        column < WIDTH && self.height(column) < HEIGHT
    }

    /// Legal columns in ascending order
    pub fn legal_moves(&self) -> impl Iterator<Item = usize> {
        let board = *self;
        (0..WIDTH).filter(move |&column| board.is_legal(column))
    }

    pub fn has_legal_moves(&self) -> bool {
        (0..WIDTH).any(|column| self.is_legal(column))
    }

    /// Drops a piece for `player` into `column`, returning the row it lands on
    ///
    /// A full or out of range column is rejected before anything is modified.
    pub fn drop(&mut self, column: usize, player: Player) -> Result<usize, BoardError> {
        if column >= WIDTH {
            return Err(BoardError::ColumnOutOfRange(column));
        }
        if !self.is_legal(column) {
            return Err(BoardError::ColumnFull(column));
        }
        Ok(self.play(column, player))
    }

    /// Unchecked drop for the search engines, the caller guarantees `is_legal(column)`
    pub(crate) fn play(&mut self, column: usize, player: Player) -> usize {
        debug_assert!(self.is_legal(column));
        let row = self.height(column);
        if player == Player::Two {
            self.packed |= cell_bit(row, column);
        }
        let height = row as u64 + 1;
        let shift = column * COLUMN_BITS + HEIGHT;
        self.packed = (self.packed & !(0b111 << shift)) | (height << shift);
        self.heights[column] += 1;
        row
    }

    /// Mask of every occupied cell, derived from the column heights
    pub fn occupied_mask(&self) -> u64 {
        let mut mask = 0;
        for column in 0..WIDTH {
            mask |= ((1 << self.heights[column]) - 1) << (column * COLUMN_BITS);
        }
        mask
    }

    /// Mask of the cells holding `player`'s pieces, bounded by the column heights
    pub fn player_mask(&self, player: Player) -> u64 {
        let occupied = self.occupied_mask();
        match player {
            Player::One => occupied & !self.packed,
            Player::Two => occupied & self.packed,
        }
    }

    /// Mask of the genuinely empty cells of the board
    pub fn empty_mask(&self) -> u64 {
        CELL_MASK & !self.occupied_mask()
    }

    /// Whether `player` has four in a row anywhere on the board
    pub fn is_win(&self, player: Player) -> bool {
        has_alignment(self.player_mask(player))
    }

    pub fn winner(&self) -> Option<Player> {
        if self.is_win(Player::One) {
            Some(Player::One)
        } else if self.is_win(Player::Two) {
            Some(Player::Two)
        } else {
            None
        }
    }

    /// Either side has won, or no legal moves remain
    pub fn is_terminal(&self) -> bool {
        self.winner().is_some() || !self.has_legal_moves()
    }

    /// Whether dropping a piece for `player` in `column` would complete four in a
    /// row, without modifying the board. `column` must be legal.
    pub fn check_winning_move(&self, column: usize, player: Player) -> bool {
        let pos = self.player_mask(player) | cell_bit(self.height(column), column);
        has_alignment(pos)
    }

    /// Whether the top piece of `column` is part of four in a row
    ///
    /// Only the four lines through that piece are walked. Called right after a
    /// drop on a position that was not yet won, this gives the same answer as a
    /// full `is_win` scan for the player who moved.
    pub fn wins_through(&self, column: usize) -> bool {
        let height = self.height(column);
        if height == 0 {
            return false;
        }
        let row = height - 1;
        let owner = self.cell(row, column);

        // (row step, column step) for vertical, horizontal and both diagonals
        for &(d_row, d_column) in [(1isize, 0isize), (0, 1), (1, 1), (-1, 1)].iter() {
            let mut run = 1;
            for &sign in [-1isize, 1].iter() {
                let mut r = row as isize + sign * d_row;
                let mut c = column as isize + sign * d_column;
                while r >= 0
                    && r < HEIGHT as isize
                    && c >= 0
                    && c < WIDTH as isize
                    && self.cell(r as usize, c as usize) == owner
                {
                    run += 1;
                    r += sign * d_row;
                    c += sign * d_column;
                }
            }
            if run >= 4 {
                return true;
            }
        }
        false
    }

    /// The player whose turn it is, assuming Player One moved first
    pub fn side_to_move(&self) -> Player {
        let one = self.player_mask(Player::One).count_ones();
        let two = self.player_mask(Player::Two).count_ones();
        if one > two {
            Player::Two
        } else {
            Player::One
        }
    }

    // key for transposition tables, the packed word is unique per position
    pub fn key(&self) -> u64 {
        self.packed
    }

    /// The same position reflected left-to-right
    pub fn mirror(&self) -> Self {
        let group = (1u64 << COLUMN_BITS) - 1;
        let mut mirrored = Self::new();
        for column in 0..WIDTH {
            let bits = (self.packed >> (column * COLUMN_BITS)) & group;
            let target = mirror_column(column);
            mirrored.packed |= bits << (target * COLUMN_BITS);
            mirrored.heights[target] = self.heights[column];
        }
        mirrored
    }

    /// The smaller of the key of this position and the key of its mirror image,
    /// and whether the mirror was the smaller one
    pub fn canonical_key(&self) -> (u64, bool) {
        let key = self.key();
        let mirrored = self.mirror().key();
        if mirrored < key {
            (mirrored, true)
        } else {
            (key, false)
        }
    }

    /// Checks that the packed height counters agree with the height cache and that
    /// no cell bit is set above a column's height
    pub fn is_consistent(&self) -> bool {
        if self.packed & !(CELL_MASK | static_masks::height_field_mask()) != 0 {
            return false;
        }
        (0..WIDTH).all(|column| {
            let group = self.packed >> (column * COLUMN_BITS);
            let height = self.heights[column] as u64;
            let above = ((1u64 << HEIGHT) - 1) & !((1u64 << height) - 1);
            height <= HEIGHT as u64 && (group >> HEIGHT) & 0b111 == height && group & above == 0
        })
    }
}

// check a mask of one player's pieces for any alignment of four
fn has_alignment(pos: u64) -> bool {
    // check horizontal alignment
    // mark all horizontal runs of 2
    let mut m = pos & (pos >> COLUMN_BITS);
    // check for runs of 2 * (runs of 2)
    if m & (m >> (2 * COLUMN_BITS)) != 0 {
        return true;
    }

    // check diagonal alignment /
    m = pos & (pos >> (COLUMN_BITS + 1));
    if m & (m >> (2 * (COLUMN_BITS + 1))) != 0 {
        return true;
    }

    // check diagonal alignment \
    m = pos & (pos >> (COLUMN_BITS - 1));
    if m & (m >> (2 * (COLUMN_BITS - 1))) != 0 {
        return true;
    }

    // check vertical alignment
    m = pos & (pos >> 1);
    if m & (m >> 2) != 0 {
        return true;
    }

    // no alignments
    false
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BitBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..HEIGHT).rev() {
            for column in 0..WIDTH {
                let symbol = match self.cell(row, column) {
                    Cell::PlayerOne => 'X',
                    Cell::PlayerTwo => 'O',
                    Cell::Empty => '.',
                };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        let columns: String = (0..WIDTH).map(|c| c.to_string()).collect();
        write!(f, "{}", columns)
    }
}

impl fmt::Debug for BitBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BitBoard({:#018x})", self.packed)?;
        write!(f, "{}", self)
    }
}
