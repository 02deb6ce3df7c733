use base64::{engine::general_purpose, Engine as _};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use merge_mcts::{
    board::MAX_ENCODED_DIMENSION,
    cli_rendering::{display_game, render_game},
    logging::setup_logging,
    run_tui, CodecError, EngineConfig, Game, GameState, MctsEngine, DEFAULT_DIMENSION,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufRead};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Board width
    #[arg(long, default_value_t = DEFAULT_DIMENSION)]
    width: usize,

    /// Board height
    #[arg(long, default_value_t = DEFAULT_DIMENSION)]
    height: usize,

    /// Seed for the random source (entropy when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// MCTS iterations per tree
    #[arg(long, default_value_t = merge_mcts::engine::DEFAULT_ITERATIONS)]
    iterations: u32,

    /// Independent trees searched in parallel
    #[arg(long, default_value_t = 1)]
    trees: usize,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory for the log file (the TUI always logs to a file)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    Play,
    Auto(AutoArgs),
    Export,
    Import(ImportArgs),
    ShowMoves(ShowMovesArgs),
}

#[derive(Args)]
struct AutoArgs {
    /// Stop after this many games instead of prompting to play again
    #[arg(long)]
    games: Option<u32>,
}

#[derive(Args)]
struct ImportArgs {
    /// Base64 encoded game data to import
    data: String,
}

#[derive(Args)]
struct ShowMovesArgs {
    /// Base64 encoded game data; a new game when omitted
    data: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let is_tui = matches!(cli.command, None | Some(Commands::Play));
    let log_dir = match (&cli.log_dir, is_tui) {
        (Some(dir), _) => Some(dir.clone()),
        (None, true) => Some(std::env::temp_dir().join("merge-mcts")),
        (None, false) => None,
    };
    let _logger = match setup_logging(&cli.log_level, log_dir.as_deref()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to start logging: {}", e);
            None
        }
    };

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let dimensions = 1..=MAX_ENCODED_DIMENSION;
    if !dimensions.contains(&cli.width) || !dimensions.contains(&cli.height) {
        eprintln!("Board dimensions must be between 1 and {}", MAX_ENCODED_DIMENSION);
        std::process::exit(1);
    }

    let config = EngineConfig {
        iterations: cli.iterations,
        trees: cli.trees,
        time_budget: None,
    };
    let engine = MctsEngine::with_config(config).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let game = Game::new(cli.width, cli.height, &mut rng);

    match &cli.command {
        Some(Commands::Auto(args)) => {
            let stdin = io::stdin();
            play_auto(game, engine, rng, args.games, &mut stdin.lock());
        }
        Some(Commands::Export) => {
            println!("{}", general_purpose::STANDARD.encode(game.to_binary()));
        }
        Some(Commands::Import(args)) => match decode_game(&args.data) {
            Ok(imported_game) => display_game(&imported_game),
            Err(e) => {
                eprintln!("Failed to import game: {}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::ShowMoves(args)) => {
            let game = match &args.data {
                Some(data) => decode_game(data).unwrap_or_else(|e| {
                    eprintln!("Failed to import game: {}", e);
                    std::process::exit(1);
                }),
                None => game,
            };
            display_game(&game);
            show_moves(&game);
        }
        _ => {
            if let Err(e) = run_tui(game, rng, engine) {
                eprintln!("TUI error: {}", e);
            }
        }
    }

    fn decode_game(data: &str) -> Result<Game, CodecError> {
        let bytes = general_purpose::STANDARD.decode(data)?;
        Game::from_binary(&bytes)
    }

    fn show_moves(game: &Game) {
        let moves = game.moves();
        if moves.is_empty() {
            println!("No moves available.");
            return;
        }
        println!("Available moves:");
        for direction in moves {
            println!(" - {}", direction);
        }
    }

    /// Let the engine play, prompting to play again after each game over.
    fn play_auto(
        mut game: Game,
        mut engine: MctsEngine,
        mut rng: StdRng,
        games: Option<u32>,
        input: &mut impl BufRead,
    ) {
        let mut played = 0;
        display_game(&game);

        loop {
            if game.state == GameState::Play {
                match engine.find_best_move(&game, &mut rng) {
                    Ok(direction) => {
                        game.apply_move(direction, &mut rng);
                        println!("{}", direction);
                        display_game(&game);
                    }
                    Err(e) => error!("Engine failed: {}", e),
                }
                game.check_game_over();
            }

            if game.state == GameState::Retry {
                played += 1;
                info!(
                    "Game {} finished: score {}, max tile {}",
                    played,
                    game.score,
                    game.board.max_tile()
                );
                game.quit();

                let again = match games {
                    Some(limit) => played < limit,
                    None => retry(&mut *input),
                };
                if again {
                    game.restart(&mut rng);
                    display_game(&game);
                }
            }

            if game.state == GameState::Quit {
                println!("{}", render_game(&game));
                break;
            }
        }
    }

    /// Ask whether to play again; anything but y/yes means no.
    fn retry(input: &mut impl BufRead) -> bool {
        println!("Game over. Do you want to play again?");
        let mut line = String::new();
        if let Err(e) = input.read_line(&mut line) {
            error!("Failed to read answer: {}", e);
            return false;
        }
        matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
    }
}
