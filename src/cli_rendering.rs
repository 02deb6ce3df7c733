use crate::{Board, Game, GameState};

const MIN_CELL_WIDTH: usize = 4;

pub fn cell_width(board: &Board) -> usize {
    board.max_tile().to_string().len().max(MIN_CELL_WIDTH)
}

pub fn tile_to_string(value: u32) -> String {
    if value == 0 {
        String::new()
    } else {
        value.to_string()
    }
}

pub fn render_board(board: &Board) -> String {
    let width = cell_width(board);
    let separator = format!("\n|{}\n", format!("{}|", "-".repeat(width)).repeat(board.width()));

    let rows: Vec<String> = board
        .cells()
        .chunks(board.width())
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|&value| format!("{:>width$}|", tile_to_string(value), width = width))
                .collect();
            format!("|{}", cells)
        })
        .collect();

    rows.join(&separator)
}

pub fn render_game(game: &Game) -> String {
    let status = match game.state {
        GameState::Play => "",
        GameState::Retry => " - game over",
        GameState::Quit => " - quit",
    };
    format!("Score: {}{}\n{}", game.score, status, render_board(&game.board))
}

pub fn display_game(game: &Game) {
    println!("{}\n", render_game(game));
}
