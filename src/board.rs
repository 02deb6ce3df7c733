use crate::error::CodecError;
use crate::grid::Grid;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

pub const DEFAULT_DIMENSION: usize = 4; // 4x4 board
pub const CHANCE_FOR_FOUR: f64 = 0.25;
pub const BOARD_HEADER_SIZE: usize = 2; // width, height
pub const MAX_TILE_EXPONENT: u8 = 31; // 2^31 still fits a u32 cell
pub const MAX_ENCODED_DIMENSION: usize = u8::MAX as usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Fixed enumeration order, used wherever moves are listed.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn to_u8(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    pub fn from_u8(value: u8) -> Result<Self, CodecError> {
        match value {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Down),
            2 => Ok(Direction::Left),
            3 => Ok(Direction::Right),
            _ => Err(CodecError::InvalidDirection(value)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        };
        f.write_str(name)
    }
}

/// Board state: a grid of tiles, 0 for empty, otherwise a power of two >= 2.
///
/// Cloning is a deep copy and equality compares dimensions and every cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    grid: Grid,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        Board {
            grid: Grid::new(width, height),
        }
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<u32>) -> Self {
        Board {
            grid: Grid::from_cells(width, height, cells),
        }
    }

    /// Build a board from rows, top row first. All rows must share a length.
    pub fn from_rows(rows: &[&[u32]]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.len());
        let cells: Vec<u32> = rows.iter().flat_map(|row| row.iter().copied()).collect();
        Board::from_cells(width, height, cells)
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn get_cell(&self, x: isize, y: isize) -> u32 {
        self.grid.get(x, y)
    }

    pub fn set_cell(&mut self, x: isize, y: isize, value: u32) {
        self.grid.set(x, y, value);
    }

    pub fn cells(&self) -> &[u32] {
        self.grid.cells()
    }

    pub fn occupied_count(&self) -> usize {
        self.grid.occupied_count()
    }

    pub fn has_empty_cell(&self) -> bool {
        self.grid.cells().iter().any(|&value| value == 0)
    }

    pub fn tile_sum(&self) -> u64 {
        self.grid.cells().iter().map(|&value| value as u64).sum()
    }

    pub fn max_tile(&self) -> u32 {
        self.grid.cells().iter().copied().max().unwrap_or(0)
    }

    /// Place `n` starting tiles in the first `n` cells, each a 2 or (25%) a 4.
    pub fn populate<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) {
        assert!(
            n <= self.grid.cells().len(),
            "Cannot populate {} tiles on a board of {} cells",
            n,
            self.grid.cells().len()
        );
        for cell in self.grid.cells_mut().iter_mut().take(n) {
            *cell = random_tile(rng);
        }
    }

    /// Fisher-Yates shuffle of every cell.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.grid.cells_mut().shuffle(rng);
    }

    /// Put a 2 or (25%) a 4 on a uniformly chosen empty cell.
    ///
    /// Panics on a full board.
    pub fn spawn<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let available = self.grid.empty_cells();
        assert!(!available.is_empty(), "Cannot spawn a tile on a full board");

        let index = available[rng.gen_range(0..available.len())];
        self.grid.cells_mut()[index] = random_tile(rng);
    }

    /// Slide every line toward `direction`, returning the new board and the
    /// score earned by merges. `self` is consumed; clone first to keep it.
    pub fn slide(mut self, direction: Direction) -> (Board, u64) {
        let score = self.slide_in_place(direction);
        (self, score)
    }

    pub fn slide_up(self) -> (Board, u64) {
        self.slide(Direction::Up)
    }

    pub fn slide_down(self) -> (Board, u64) {
        self.slide(Direction::Down)
    }

    pub fn slide_left(self) -> (Board, u64) {
        self.slide(Direction::Left)
    }

    pub fn slide_right(self) -> (Board, u64) {
        self.slide(Direction::Right)
    }

    /// Whether sliding toward `direction` would change anything.
    pub fn can_slide(&self, direction: Direction) -> bool {
        let (slid, _) = self.clone().slide(direction);
        slid != *self
    }

    fn slide_in_place(&mut self, direction: Direction) -> u64 {
        let mut score = 0;
        for line in self.lines(direction) {
            score += slide_line(self.grid.cells_mut(), &line);
        }
        score
    }

    /// Absolute cell indices of every line, each ordered from the edge the
    /// tiles travel toward back to the opposite edge.
    fn lines(&self, direction: Direction) -> Vec<Vec<usize>> {
        let width = self.width() as isize;
        let height = self.height() as isize;

        match direction {
            Direction::Up => (0..width)
                .map(|x| (0..height).map(|y| self.grid.index(x, y)).collect())
                .collect(),
            Direction::Down => (0..width)
                .map(|x| (0..height).rev().map(|y| self.grid.index(x, y)).collect())
                .collect(),
            Direction::Left => (0..height)
                .map(|y| (0..width).map(|x| self.grid.index(x, y)).collect())
                .collect(),
            Direction::Right => (0..height)
                .map(|y| (0..width).rev().map(|x| self.grid.index(x, y)).collect())
                .collect(),
        }
    }

    /// Panics if a dimension does not fit the one-byte header.
    pub fn to_binary(&self) -> Vec<u8> {
        assert!(
            self.width() <= MAX_ENCODED_DIMENSION && self.height() <= MAX_ENCODED_DIMENSION,
            "Cannot encode a {}x{} board, dimensions are limited to {}",
            self.width(),
            self.height(),
            MAX_ENCODED_DIMENSION
        );
        let mut binary = Vec::with_capacity(BOARD_HEADER_SIZE + self.cells().len());
        binary.push(self.width() as u8);
        binary.push(self.height() as u8);
        for &value in self.cells() {
            // Empty cells encode as 0, tiles as their exponent
            binary.push(if value == 0 { 0 } else { value.trailing_zeros() as u8 });
        }
        binary
    }

    pub fn from_binary(binary: &[u8]) -> Result<Self, CodecError> {
        if binary.len() < BOARD_HEADER_SIZE {
            return Err(CodecError::InvalidLength {
                expected: BOARD_HEADER_SIZE,
                got: binary.len(),
            });
        }

        let width = binary[0] as usize;
        let height = binary[1] as usize;
        if width == 0 || height == 0 {
            return Err(CodecError::InvalidDimensions { width, height });
        }

        let expected = Self::binary_len(width, height);
        if binary.len() != expected {
            return Err(CodecError::InvalidLength {
                expected,
                got: binary.len(),
            });
        }

        let mut cells = Vec::with_capacity(width * height);
        for (index, &exponent) in binary[BOARD_HEADER_SIZE..].iter().enumerate() {
            match exponent {
                0 => cells.push(0),
                1..=MAX_TILE_EXPONENT => cells.push(1u32 << exponent),
                _ => return Err(CodecError::InvalidTile { index, exponent }),
            }
        }

        Ok(Board::from_cells(width, height, cells))
    }

    /// Encoded size of a board with the given dimensions.
    pub fn binary_len(width: usize, height: usize) -> usize {
        BOARD_HEADER_SIZE + width * height
    }
}

fn random_tile<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    if rng.gen::<f64>() < CHANCE_FOR_FOUR {
        4
    } else {
        2
    }
}

/// Compact one line toward its first cell, merging equal neighbours once.
///
/// `limit` is the lowest position a tile may still reach: it moves past each
/// merge so a merged tile is neither merged again nor jumped over.
fn slide_line(cells: &mut [u32], line: &[usize]) -> u64 {
    let mut score = 0;
    let mut limit = 0;

    for start in 1..line.len() {
        if cells[line[start]] == 0 {
            continue;
        }

        let mut z = start;
        while z > limit {
            let current = cells[line[z]];
            let next = cells[line[z - 1]];

            if next == 0 {
                cells[line[z - 1]] = current;
                cells[line[z]] = 0;
                z -= 1;
                continue;
            }

            // The largest tile has no room to double and blocks like any other
            if next == current {
                if let Some(merged) = current.checked_mul(2) {
                    cells[line[z - 1]] = merged;
                    cells[line[z]] = 0;
                    score += merged as u64;
                    limit = z;
                }
            }

            break;
        }
    }

    score
}
