use crate::board::{Board, Direction};
use crate::error::CodecError;
use log::debug;
use rand::Rng;

pub const INITIAL_TILES: usize = 2;
const SCORE_SIZE: usize = 8; // u64, little endian

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameState {
    Play,
    Retry,
    Quit,
}

/// Outcome of a single `Game::apply_move` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveResult {
    /// Whether the board changed (and a tile was spawned).
    pub changed: bool,
    /// Points earned from merges.
    pub gained: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    pub board: Board,
    pub score: u64,
    pub state: GameState,
}

impl Game {
    /// Start a game with two random tiles scattered over an empty board.
    pub fn new<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Self {
        let mut board = Board::new(width, height);
        board.populate(INITIAL_TILES.min(width * height), rng);
        board.shuffle(rng);
        Game::from_board(board)
    }

    pub fn from_board(board: Board) -> Self {
        Game {
            board,
            score: 0,
            state: GameState::Play,
        }
    }

    /// Slide toward `direction`; a tile is spawned only if the board changed.
    pub fn apply_move<R: Rng + ?Sized>(&mut self, direction: Direction, rng: &mut R) -> MoveResult {
        let (slid, gained) = self.board.clone().slide(direction);
        if slid == self.board {
            return MoveResult {
                changed: false,
                gained: 0,
            };
        }

        self.board = slid;
        self.score = self.score.saturating_add(gained);
        self.board.spawn(rng);

        MoveResult {
            changed: true,
            gained,
        }
    }

    /// Apply a move to a copy, leaving `self` untouched.
    pub fn apply_move_copy<R: Rng + ?Sized>(&self, direction: Direction, rng: &mut R) -> Game {
        let mut copy = self.clone();
        copy.apply_move(direction, rng);
        copy
    }

    /// Every direction whose slide changes the board, in `Direction::ALL` order.
    pub fn moves(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&direction| self.board.can_slide(direction))
            .collect()
    }

    pub fn moves_left(&self) -> bool {
        Direction::ALL
            .iter()
            .any(|&direction| self.board.can_slide(direction))
    }

    /// Move from PLAY to RETRY once no legal move remains.
    pub fn check_game_over(&mut self) -> bool {
        if self.state == GameState::Play && !self.moves_left() {
            debug!(
                "Game over: score {}, max tile {}",
                self.score,
                self.board.max_tile()
            );
            self.state = GameState::Retry;
        }
        self.state == GameState::Retry
    }

    pub fn quit(&mut self) {
        self.state = GameState::Quit;
    }

    /// Replace this game with a fresh one of the same dimensions.
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        *self = Game::new(self.board.width(), self.board.height(), rng);
    }

    pub fn to_binary(&self) -> Vec<u8> {
        let mut binary = self.board.to_binary();
        binary.extend_from_slice(&self.score.to_le_bytes());
        binary
    }

    pub fn from_binary(binary: &[u8]) -> Result<Self, CodecError> {
        if binary.len() < SCORE_SIZE {
            return Err(CodecError::InvalidLength {
                expected: SCORE_SIZE,
                got: binary.len(),
            });
        }

        let (board_bytes, score_bytes) = binary.split_at(binary.len() - SCORE_SIZE);
        let board = Board::from_binary(board_bytes).map_err(|err| match err {
            CodecError::InvalidLength { expected, got } => CodecError::InvalidLength {
                expected: expected + SCORE_SIZE,
                got: got + SCORE_SIZE,
            },
            other => other,
        })?;

        let mut score = [0u8; SCORE_SIZE];
        score.copy_from_slice(score_bytes);

        let mut game = Game::from_board(board);
        game.score = u64::from_le_bytes(score);
        game.check_game_over();
        Ok(game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_game_has_two_starting_tiles() {
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let game = Game::new(4, 4, &mut rng);
            let cells = game.board.cells();
            assert_eq!(cells.iter().filter(|&&v| v != 0).count(), 2);
            assert_eq!(cells.iter().filter(|&&v| v == 0).count(), 14);
            assert!(cells.iter().all(|&v| v == 0 || v == 2 || v == 4));
            assert_eq!(game.score, 0);
            assert_eq!(game.state, GameState::Play);
        }
    }

    #[test]
    fn test_new_game_is_reproducible() {
        let a = Game::new(4, 4, &mut StdRng::seed_from_u64(42));
        let b = Game::new(4, 4, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_merge_move_scores_and_spawns() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = Game::from_board(Board::from_rows(&[
            &[2, 2, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
        ]));

        let result = game.apply_move(Direction::Left, &mut rng);
        assert_eq!(
            result,
            MoveResult {
                changed: true,
                gained: 4
            }
        );
        assert_eq!(game.score, 4);
        assert_eq!(game.board.get_cell(0, 0), 4);
        assert_eq!(game.board.occupied_count(), 2);

        let spawned: Vec<u32> = game.board.cells()[1..]
            .iter()
            .copied()
            .filter(|&v| v != 0)
            .collect();
        assert_eq!(spawned.len(), 1);
        assert!(spawned[0] == 2 || spawned[0] == 4);
    }

    #[test]
    fn test_no_op_move_has_no_side_effect() {
        let mut rng = StdRng::seed_from_u64(1);
        let board = Board::from_rows(&[&[2, 4, 0, 0], &[0, 0, 0, 0]]);
        let mut game = Game::from_board(board.clone());

        let result = game.apply_move(Direction::Left, &mut rng);
        assert!(!result.changed);
        assert_eq!(result.gained, 0);
        assert_eq!(game.board, board);
        assert_eq!(game.score, 0);
    }

    #[test]
    fn test_apply_move_copy_leaves_original() {
        let mut rng = StdRng::seed_from_u64(2);
        let game = Game::from_board(Board::from_rows(&[&[0, 2], &[0, 0]]));
        let moved = game.apply_move_copy(Direction::Left, &mut rng);
        assert_eq!(game.board.get_cell(1, 0), 2);
        assert_eq!(moved.board.get_cell(0, 0), 2);
    }

    #[test]
    fn test_moves_exclude_no_op_directions() {
        let game = Game::from_board(Board::from_rows(&[
            &[2, 0, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
        ]));
        assert_eq!(game.moves(), vec![Direction::Down, Direction::Right]);

        let game = Game::from_board(Board::from_rows(&[
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 2],
        ]));
        assert_eq!(game.moves(), vec![Direction::Up, Direction::Left]);
    }

    #[test]
    fn test_moves_check_right_independently() {
        let game = Game::from_board(Board::from_rows(&[&[0, 0, 2, 0]]));
        assert_eq!(game.moves(), vec![Direction::Left, Direction::Right]);

        let game = Game::from_board(Board::from_rows(&[&[2, 0, 0, 0]]));
        assert_eq!(game.moves(), vec![Direction::Right]);
    }

    #[test]
    fn test_full_board_without_pairs_has_no_moves() {
        let mut game = Game::from_board(Board::from_rows(&[
            &[2, 4, 2, 4],
            &[4, 2, 4, 2],
            &[2, 4, 2, 4],
            &[4, 2, 4, 2],
        ]));
        assert!(game.moves().is_empty());
        assert!(!game.moves_left());
        assert!(game.check_game_over());
        assert_eq!(game.state, GameState::Retry);
    }

    #[test]
    fn test_full_board_with_pair_has_moves() {
        let game = Game::from_board(Board::from_rows(&[
            &[2, 4, 2, 4],
            &[4, 2, 4, 2],
            &[2, 4, 2, 4],
            &[8, 16, 32, 32],
        ]));
        assert!(game.moves_left());
        assert_eq!(game.moves(), vec![Direction::Left, Direction::Right]);
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut game = Game::new(4, 4, &mut rng);
        assert!(!game.check_game_over());
        assert_eq!(game.state, GameState::Play);

        game.quit();
        assert_eq!(game.state, GameState::Quit);

        game.score = 100;
        game.restart(&mut rng);
        assert_eq!(game.state, GameState::Play);
        assert_eq!(game.score, 0);
        assert_eq!(game.board.occupied_count(), 2);
    }

    #[test]
    fn test_score_never_decreases_in_random_play() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut game = Game::new(4, 4, &mut rng);
        let mut last_score = 0;
        while game.moves_left() {
            let moves = game.moves();
            let direction = moves[rng.gen_range(0..moves.len())];
            let result = game.apply_move(direction, &mut rng);
            assert!(result.changed);
            assert!(game.score >= last_score);
            last_score = game.score;
        }
        assert!(game.check_game_over());
    }

    #[test]
    fn test_binary_encoding() {
        let mut game = Game::from_board(Board::from_rows(&[&[2, 0], &[0, 4]]));
        game.score = 1234;
        let binary = game.to_binary();
        assert_eq!(binary.len(), 4 + 2 + 8);

        let decoded = Game::from_binary(&binary).unwrap();
        assert_eq!(decoded, game);
    }

    #[test]
    fn test_binary_decoding_restores_retry_state() {
        let game = Game::from_board(Board::from_rows(&[&[2, 4], &[4, 2]]));
        let decoded = Game::from_binary(&game.to_binary()).unwrap();
        assert_eq!(decoded.state, GameState::Retry);
    }

    #[test]
    fn test_decoded_largest_tiles_do_not_overflow() {
        let mut binary = vec![2, 1, 31, 31];
        binary.extend_from_slice(&0u64.to_le_bytes());
        let game = Game::from_binary(&binary).unwrap();
        assert!(game.moves().is_empty());
        assert_eq!(game.state, GameState::Retry);
    }

    #[test]
    fn test_score_saturates() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut game = Game::from_board(Board::from_rows(&[&[2, 2, 0, 0]]));
        game.score = u64::MAX - 1;
        let result = game.apply_move(Direction::Left, &mut rng);
        assert_eq!(result.gained, 4);
        assert_eq!(game.score, u64::MAX);
    }

    #[test]
    fn test_binary_decoding_reports_full_length() {
        let game = Game::from_board(Board::new(4, 4));
        let mut binary = game.to_binary();
        binary.pop();
        assert_matches!(
            Game::from_binary(&binary),
            Err(CodecError::InvalidLength { expected: 26, got: 25 })
        );
        assert_matches!(
            Game::from_binary(&[1, 2]),
            Err(CodecError::InvalidLength { expected: 8, got: 2 })
        );
    }
}
