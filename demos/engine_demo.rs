use merge_mcts::cli_rendering::render_board;
use merge_mcts::engine::{EngineConfig, MctsEngine};
use merge_mcts::Game;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() {
    println!("Merge Engine - MCTS Example");
    println!("===========================\n");

    let mut rng = StdRng::seed_from_u64(2048);
    let mut game = Game::new(4, 4, &mut rng);

    println!("Available budgets:");
    println!("1. Quick    (iterations: 100, trees: 1)");
    println!("2. Standard (iterations: 250, trees: 1)");
    println!("3. Strong   (iterations: 500, trees: 4)");
    println!();

    // For this example, we'll use the standard budget
    let config = EngineConfig {
        iterations: 250,
        trees: 1,
        time_budget: None,
    };

    let mut engine = match MctsEngine::with_config(config) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("✗ Failed to create engine: {}", e);
            return;
        }
    };

    println!("Playing the first 10 moves with the engine:\n");
    println!("{}\n", render_board(&game.board));

    for move_num in 1..=10 {
        if game.check_game_over() {
            println!("Game over!");
            break;
        }

        let best_move = match engine.find_best_move(&game, &mut rng) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("✗ Failed to find move: {}", e);
                break;
            }
        };

        let stats = engine.get_statistics();
        let result = game.apply_move(best_move, &mut rng);
        println!(
            "Move {}: {} (+{}, {} nodes, avg rollout {:.1} moves)",
            move_num,
            best_move,
            result.gained,
            stats.nodes_created,
            stats.avg_rollout_length()
        );
        for child in &stats.root_children {
            println!(
                "  {:<5} visits {:>3}  mean score {:>8.1}",
                child.direction.to_string(),
                child.visits,
                child.mean_score()
            );
        }
        println!("{}\n", render_board(&game.board));
    }

    println!("Score after the demo: {}", game.score);
    println!("\nConfiguration tips:");
    println!("- Increase iterations for stronger play (but slower)");
    println!("- Increase trees to spread the search over more cores");
    println!("- Set time_budget to cap the time spent per move");
}
