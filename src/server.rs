use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use clap::Parser;
use log::{error, info, warn};
use merge_mcts::logging::setup_logging;
use merge_mcts::{Direction, EngineConfig, EngineError, Game, MctsEngine, DEFAULT_DIMENSION};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};

#[derive(Parser)]
#[command(author, version, about = "HTTP front end for the merge puzzle engine", long_about = None)]
struct ServerArgs {
    #[arg(long, default_value_t = 3000)]
    port: u16,

    #[arg(long, default_value_t = merge_mcts::engine::DEFAULT_ITERATIONS)]
    iterations: u32,

    #[arg(long, default_value_t = 1)]
    trees: usize,

    /// Seed for the server's random source (entropy when omitted)
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

// Shared engine state
struct AppState {
    engine: Mutex<MctsEngine>,
    rng: Mutex<StdRng>,
}

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();
    let _logger = setup_logging(&args.log_level, None).unwrap_or_else(|e| {
        eprintln!("Failed to start logging: {}", e);
        std::process::exit(1);
    });

    let config = EngineConfig {
        iterations: args.iterations,
        trees: args.trees,
        time_budget: None,
    };
    let engine = MctsEngine::with_config(config).unwrap_or_else(|e| {
        error!("Failed to initialize engine: {}", e);
        std::process::exit(1);
    });
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let state = Arc::new(AppState {
        engine: Mutex::new(engine),
        rng: Mutex::new(rng),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/new", get(new_game))
        .route("/moves", post(post_moves))
        .route("/play", post(play_move))
        .route("/engine-move", post(engine_move))
        .with_state(state)
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}

async fn new_game(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, StatusCode> {
    let mut rng = state
        .rng
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let game = Game::new(DEFAULT_DIMENSION, DEFAULT_DIMENSION, &mut *rng);
    info!("New game");
    Ok((StatusCode::OK, game.to_binary()))
}

async fn post_moves(payload: Bytes) -> Result<Vec<u8>, StatusCode> {
    list_moves(&payload)
}

async fn play_move(
    State(state): State<Arc<AppState>>,
    payload: Bytes,
) -> Result<Vec<u8>, StatusCode> {
    let mut rng = state
        .rng
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    apply_move(&payload, &mut *rng)
}

async fn engine_move(
    State(state): State<Arc<AppState>>,
    payload: Bytes,
) -> Result<Vec<u8>, StatusCode> {
    // The search is CPU bound, keep it off the async workers
    tokio::task::spawn_blocking(move || {
        let mut engine = state
            .engine
            .lock()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let mut rng = state
            .rng
            .lock()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        choose_move(&payload, &mut engine, &mut *rng)
    })
    .await
    .map_err(|e| {
        error!("Engine task failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
}

fn decode_game(bytes: &[u8]) -> Result<Game, StatusCode> {
    Game::from_binary(bytes).map_err(|e| {
        warn!("Rejected game payload: {}", e);
        StatusCode::BAD_REQUEST
    })
}

/// Body: game bytes. Response: one direction code per legal move.
fn list_moves(payload: &[u8]) -> Result<Vec<u8>, StatusCode> {
    let game = decode_game(payload)?;
    let moves = game.moves();
    info!("Listed {} moves", moves.len());
    Ok(moves.into_iter().map(Direction::to_u8).collect())
}

/// Body: direction code followed by game bytes. Response: game bytes.
fn apply_move(payload: &[u8], rng: &mut StdRng) -> Result<Vec<u8>, StatusCode> {
    let (&code, game_bytes) = payload.split_first().ok_or(StatusCode::BAD_REQUEST)?;
    let direction = Direction::from_u8(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    let mut game = decode_game(game_bytes)?;
    let result = game.apply_move(direction, rng);
    game.check_game_over();
    info!(
        "Played {} (+{}), score {}, state {:?}",
        direction, result.gained, game.score, game.state
    );
    Ok(game.to_binary())
}

/// Body: game bytes. Response: the engine's direction code.
fn choose_move(
    payload: &[u8],
    engine: &mut MctsEngine,
    rng: &mut StdRng,
) -> Result<Vec<u8>, StatusCode> {
    let game = decode_game(payload)?;
    match engine.find_best_move(&game, rng) {
        Ok(direction) => {
            info!("Engine move: {}", direction);
            Ok(vec![direction.to_u8()])
        }
        Err(EngineError::NoLegalMoves) => Err(StatusCode::UNPROCESSABLE_ENTITY),
        Err(e) => {
            error!("Engine error: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merge_mcts::Board;

    fn encoded(rows: &[&[u32]]) -> Vec<u8> {
        Game::from_board(Board::from_rows(rows)).to_binary()
    }

    #[test]
    fn test_list_moves() {
        let payload = encoded(&[&[2, 0], &[0, 0]]);
        assert_eq!(
            list_moves(&payload).unwrap(),
            vec![Direction::Down.to_u8(), Direction::Right.to_u8()]
        );
        assert_eq!(list_moves(&[1, 2, 3]), Err(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_apply_move() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut payload = vec![Direction::Left.to_u8()];
        payload.extend(encoded(&[&[2, 2, 0, 0], &[0, 0, 0, 0]]));

        let game = Game::from_binary(&apply_move(&payload, &mut rng).unwrap()).unwrap();
        assert_eq!(game.score, 4);
        assert_eq!(game.board.get_cell(0, 0), 4);
        assert_eq!(game.board.occupied_count(), 2);
    }

    #[test]
    fn test_apply_move_rejects_bad_payload() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(apply_move(&[], &mut rng), Err(StatusCode::BAD_REQUEST));

        let mut payload = vec![9];
        payload.extend(encoded(&[&[2, 0]]));
        assert_eq!(apply_move(&payload, &mut rng), Err(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_choose_move() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut engine = MctsEngine::with_config(EngineConfig {
            iterations: 20,
            ..EngineConfig::default()
        })
        .unwrap();

        let payload = encoded(&[&[2, 0, 0, 0]]);
        assert_eq!(
            choose_move(&payload, &mut engine, &mut rng).unwrap(),
            vec![Direction::Right.to_u8()]
        );

        let finished = encoded(&[&[2, 4], &[4, 2]]);
        assert_eq!(
            choose_move(&finished, &mut engine, &mut rng),
            Err(StatusCode::UNPROCESSABLE_ENTITY)
        );
    }
}
