use crate::{cli_rendering::tile_to_string, Direction, Game, GameState, MctsEngine};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use rand::rngs::StdRng;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color as RatatuiColor, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

const AUTOPLAY_TICK: Duration = Duration::from_millis(60);
const TUI_CELL_WIDTH: usize = 6;

pub struct App {
    game: Game,
    rng: StdRng,
    engine: MctsEngine,
    autoplay: bool,
    hint: Option<Direction>,
    last_move: Option<Direction>,
    message: Option<String>,
}

impl App {
    pub fn new(game: Game, rng: StdRng, engine: MctsEngine) -> Self {
        let mut app = App {
            game,
            rng,
            engine,
            autoplay: false,
            hint: None,
            last_move: None,
            message: None,
        };
        app.game.check_game_over();
        app
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn is_autoplay(&self) -> bool {
        self.autoplay
    }

    pub fn hint(&self) -> Option<Direction> {
        self.hint
    }

    fn is_over(&self) -> bool {
        self.game.state != GameState::Play
    }

    /// Applies a move and updates the game state, handling game over.
    pub fn handle_direction(&mut self, direction: Direction) {
        if self.is_over() {
            return;
        }

        let result = self.game.apply_move(direction, &mut self.rng);
        if result.changed {
            self.last_move = Some(direction);
            self.hint = None;
            self.message = None;
        } else {
            self.message = Some(format!("{} does not move anything", direction));
        }

        if self.game.check_game_over() {
            self.autoplay = false;
            info!("Game over with score {}", self.game.score);
        }
    }

    /// Ask the engine for a move without playing it.
    pub fn handle_hint(&mut self) {
        if self.is_over() {
            return;
        }
        match self.engine.find_best_move(&self.game, &mut self.rng) {
            Ok(direction) => self.hint = Some(direction),
            Err(e) => {
                warn!("Hint failed: {}", e);
                self.message = Some(e.to_string());
            }
        }
    }

    /// Let the engine choose and play one move.
    pub fn step_engine(&mut self) {
        if self.is_over() {
            self.autoplay = false;
            return;
        }
        match self.engine.find_best_move(&self.game, &mut self.rng) {
            Ok(direction) => self.handle_direction(direction),
            Err(e) => {
                warn!("Engine move failed: {}", e);
                self.message = Some(e.to_string());
                self.autoplay = false;
            }
        }
    }

    pub fn toggle_autoplay(&mut self) {
        self.autoplay = !self.autoplay && !self.is_over();
    }

    pub fn handle_restart(&mut self) {
        if self.game.state != GameState::Retry {
            return;
        }
        self.game.restart(&mut self.rng);
        self.hint = None;
        self.last_move = None;
        self.message = None;
    }
}

pub fn run_tui(game: Game, rng: StdRng, engine: MctsEngine) -> Result<Game, Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(game, rng, engine);

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    app.game.quit();
    Ok(app.game)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeyAction {
    Quit,
    Slide(Direction),
    Hint,
    EngineMove,
    ToggleAutoplay,
    Restart,
}

fn key_action(code: KeyCode) -> Option<KeyAction> {
    match code {
        KeyCode::Char('q') => Some(KeyAction::Quit),
        KeyCode::Up | KeyCode::Char('w') => Some(KeyAction::Slide(Direction::Up)),
        KeyCode::Down | KeyCode::Char('s') => Some(KeyAction::Slide(Direction::Down)),
        KeyCode::Left | KeyCode::Char('a') => Some(KeyAction::Slide(Direction::Left)),
        KeyCode::Right | KeyCode::Char('d') => Some(KeyAction::Slide(Direction::Right)),
        KeyCode::Char('h') => Some(KeyAction::Hint),
        KeyCode::Char('m') => Some(KeyAction::EngineMove),
        KeyCode::Char(' ') => Some(KeyAction::ToggleAutoplay),
        KeyCode::Char('r') => Some(KeyAction::Restart),
        _ => None,
    }
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if app.autoplay && !event::poll(AUTOPLAY_TICK)? {
            app.step_engine();
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key_action(key.code) {
                Some(KeyAction::Quit) => return Ok(()),
                Some(KeyAction::Slide(direction)) => app.handle_direction(direction),
                Some(KeyAction::Hint) => app.handle_hint(),
                Some(KeyAction::EngineMove) => app.step_engine(),
                Some(KeyAction::ToggleAutoplay) => app.toggle_autoplay(),
                Some(KeyAction::Restart) => app.handle_restart(),
                None => {}
            }
        }
    }
}

fn tile_color(value: u32) -> RatatuiColor {
    match value {
        0 => RatatuiColor::DarkGray,
        2 => RatatuiColor::White,
        4 => RatatuiColor::Yellow,
        8 => RatatuiColor::LightRed,
        16 => RatatuiColor::Red,
        32 => RatatuiColor::LightMagenta,
        64 => RatatuiColor::Magenta,
        128 => RatatuiColor::LightBlue,
        256 => RatatuiColor::Blue,
        512 => RatatuiColor::LightCyan,
        1024 => RatatuiColor::Cyan,
        _ => RatatuiColor::LightGreen,
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(12),   // Board
            Constraint::Length(5), // Instructions
        ])
        .split(f.area());

    // Title
    let title = match app.game.state {
        GameState::Play if app.autoplay => format!("Score: {} - engine playing", app.game.score),
        GameState::Play => format!("Score: {}", app.game.score),
        GameState::Retry => format!("GAME OVER - final score {}", app.game.score),
        GameState::Quit => "Quit".to_string(),
    };

    let title_paragraph = Paragraph::new(title)
        .block(Block::default().borders(Borders::ALL).title("Merge"))
        .alignment(Alignment::Center);
    f.render_widget(title_paragraph, chunks[0]);

    // Board
    render_board(f, app, chunks[1]);

    // Instructions
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let instructions = if app.is_over() {
        vec![
            Line::from(vec![
                Span::styled("Game Over!", bold),
                Span::raw(" Press "),
                Span::styled("R", bold),
                Span::raw(" to play again, "),
                Span::styled("Q", bold),
                Span::raw(" to quit"),
            ]),
            Line::from(""),
        ]
    } else {
        vec![
            Line::from(vec![
                Span::raw("Use "),
                Span::styled("Arrow Keys", bold),
                Span::raw(" or "),
                Span::styled("WASD", bold),
                Span::raw(" to slide, "),
                Span::styled("H", bold),
                Span::raw(" for a hint"),
            ]),
            Line::from(vec![
                Span::styled("M", bold),
                Span::raw(" for one engine move, "),
                Span::styled("Space", bold),
                Span::raw(" to toggle autoplay, "),
                Span::styled("Q", bold),
                Span::raw(" to quit"),
            ]),
        ]
    };

    let instructions_paragraph = Paragraph::new(instructions)
        .block(Block::default().borders(Borders::ALL).title("Controls"))
        .alignment(Alignment::Center);
    f.render_widget(instructions_paragraph, chunks[2]);
}

fn render_board(f: &mut Frame, app: &App, area: Rect) {
    let board = &app.game.board;

    let block = Block::default().borders(Borders::ALL).title("Board");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rule = format!("+{}", format!("{}+", "-".repeat(TUI_CELL_WIDTH)).repeat(board.width()));
    let mut board_lines = vec![Line::from(rule.clone())];

    for row in board.cells().chunks(board.width()) {
        let mut row_spans = vec![Span::raw("|")];
        for &value in row {
            let style = Style::default()
                .fg(tile_color(value))
                .add_modifier(if value >= 2048 { Modifier::BOLD } else { Modifier::empty() });
            row_spans.push(Span::styled(
                format!("{:^width$}", tile_to_string(value), width = TUI_CELL_WIDTH),
                style,
            ));
            row_spans.push(Span::raw("|"));
        }
        board_lines.push(Line::from(row_spans));
        board_lines.push(Line::from(rule.clone()));
    }

    board_lines.push(Line::from(""));

    let mut status = Vec::new();
    if let Some(direction) = app.last_move {
        status.push(Span::raw(format!("Last move: {}  ", direction)));
    }
    if let Some(direction) = app.hint {
        status.push(Span::styled(
            format!("Hint: {}  ", direction),
            Style::default().fg(RatatuiColor::Green).add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(ref message) = app.message {
        status.push(Span::styled(message.clone(), Style::default().fg(RatatuiColor::Red)));
    }
    board_lines.push(Line::from(status));

    let board_paragraph = Paragraph::new(board_lines).alignment(Alignment::Center);
    f.render_widget(board_paragraph, inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Board, EngineConfig};
    use rand::SeedableRng;

    fn app_with(board: Board) -> App {
        let engine = MctsEngine::with_config(EngineConfig {
            iterations: 20,
            ..EngineConfig::default()
        })
        .unwrap();
        App::new(Game::from_board(board), StdRng::seed_from_u64(1), engine)
    }

    #[test]
    fn test_direction_moves_and_clears_hint() {
        let mut app = app_with(Board::from_rows(&[&[0, 2, 0, 0], &[0, 0, 0, 0]]));
        app.handle_hint();
        assert!(app.hint().is_some());

        app.handle_direction(Direction::Left);
        assert_eq!(app.game().board.get_cell(0, 0), 2);
        assert!(app.hint().is_none());
        assert_eq!(app.last_move, Some(Direction::Left));
    }

    #[test]
    fn test_no_op_direction_sets_message() {
        let mut app = app_with(Board::from_rows(&[&[2, 0], &[0, 0]]));
        app.handle_direction(Direction::Left);
        assert!(app.message.is_some());
        assert!(app.last_move.is_none());
    }

    #[test]
    fn test_finished_game_enters_retry_and_restarts() {
        let mut app = app_with(Board::from_rows(&[&[2, 4], &[4, 2]]));
        assert_eq!(app.game().state, GameState::Retry);

        app.toggle_autoplay();
        assert!(!app.is_autoplay());

        app.handle_restart();
        assert_eq!(app.game().state, GameState::Play);
        assert_eq!(app.game().board.occupied_count(), 2);
    }

    #[test]
    fn test_engine_step_plays_legal_move() {
        let mut app = app_with(Board::from_rows(&[&[2, 0, 0, 0]]));
        app.step_engine();
        assert_eq!(app.last_move, Some(Direction::Right));
        assert_eq!(app.game().board.get_cell(3, 0), 2);
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(key_action(KeyCode::Char('q')), Some(KeyAction::Quit));
        assert_eq!(key_action(KeyCode::Up), Some(KeyAction::Slide(Direction::Up)));
        assert_eq!(key_action(KeyCode::Char('s')), Some(KeyAction::Slide(Direction::Down)));
        assert_eq!(key_action(KeyCode::Char('a')), Some(KeyAction::Slide(Direction::Left)));
        assert_eq!(key_action(KeyCode::Right), Some(KeyAction::Slide(Direction::Right)));
        assert_eq!(key_action(KeyCode::Char('h')), Some(KeyAction::Hint));
        assert_eq!(key_action(KeyCode::Char('m')), Some(KeyAction::EngineMove));
        assert_eq!(key_action(KeyCode::Char(' ')), Some(KeyAction::ToggleAutoplay));
        assert_eq!(key_action(KeyCode::Char('r')), Some(KeyAction::Restart));
        assert_eq!(key_action(KeyCode::Char('x')), None);
    }
}
