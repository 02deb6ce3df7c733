//! Monte Carlo Tree Search engine for the merge puzzle
//!
//! The engine treats the game as a black-box simulator. Each iteration works on
//! a private copy of the caller's game and runs the four classic phases:
//!
//! 1. **Selection**: descend through fully expanded nodes by UCT.
//! 2. **Expansion**: add one child for a random untried move.
//! 3. **Simulation**: play uniformly random moves until none is left.
//! 4. **Backpropagation**: add the final score to every node on the path.
//!
//! Once the budget is spent, the most visited root child ("robust child")
//! gives the move.
//!
//! # Features
//!
//! - Arena-backed tree, discarded after every decision
//! - Explicit random source for reproducible searches
//! - Optional root parallelisation over independent trees with Rayon
//! - Optional time budget on top of the iteration budget
//! - Statistics for the last search plus cumulative counters
//!
//! # Example
//!
//! ```no_run
//! use merge_mcts::engine::{EngineConfig, MctsEngine};
//! use merge_mcts::Game;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let game = Game::new(4, 4, &mut rng);
//!
//! let config = EngineConfig {
//!     iterations: 500,
//!     trees: 4,
//!     time_budget: None,
//! };
//! let mut engine = MctsEngine::with_config(config).expect("valid configuration");
//!
//! let best_move = engine.find_best_move(&game, &mut rng).expect("No legal moves");
//! println!("Best move: {}", best_move);
//!
//! let stats = engine.get_statistics();
//! println!("Iterations: {}", stats.iterations);
//! println!("Rollout moves: {}", stats.rollout_moves);
//! ```

use crate::board::Direction;
use crate::error::EngineError;
use crate::game::Game;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod tree;
pub use tree::{random_move, Node, NodeId, SearchTree};

/// UCT exploration constant.
pub const EXPLORATION_CONSTANT: f64 = std::f64::consts::SQRT_2;

pub const DEFAULT_ITERATIONS: u32 = 250;

/// Engine configuration
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Iterations per tree
    pub iterations: u32,
    /// Number of independent trees searched in parallel and merged at the root
    pub trees: usize,
    /// Stop early once this much time has passed
    pub time_budget: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            trees: 1,
            time_budget: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.iterations == 0 {
            return Err(EngineError::InvalidConfig(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.trees == 0 {
            return Err(EngineError::InvalidConfig(
                "trees must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Root-level statistics for one move
#[derive(Clone, Debug, PartialEq)]
pub struct ChildStatistics {
    pub direction: Direction,
    pub visits: u32,
    pub score_sum: u64,
}

impl ChildStatistics {
    pub fn mean_score(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.score_sum as f64 / self.visits as f64
        }
    }
}

/// Statistics for MCTS search
#[derive(Clone, Debug, Default)]
pub struct SearchStatistics {
    /// Iterations completed in the most recent search, over all trees
    pub iterations: u64,
    /// Random moves played during rollouts in the most recent search
    pub rollout_moves: u64,
    /// Tree nodes created in the most recent search, roots included
    pub nodes_created: u64,
    /// Deepest node reached in the most recent search
    pub max_depth: u32,
    /// Wall time of the most recent search
    pub elapsed: Duration,
    /// Root children of the most recent search, merged over all trees
    pub root_children: Vec<ChildStatistics>,
    /// Number of searches run since the last reset
    pub total_searches: u64,
    /// Iterations run since the last reset
    pub total_iterations: u64,
    /// Rollout moves played since the last reset
    pub total_rollout_moves: u64,
}

impl SearchStatistics {
    /// Get average rollout length
    pub fn avg_rollout_length(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            self.rollout_moves as f64 / self.iterations as f64
        }
    }

    /// Sum of visits over the root children
    pub fn root_visits(&self) -> u64 {
        self.root_children.iter().map(|c| c.visits as u64).sum()
    }
}

/// Outcome of searching a single tree
struct TreeOutcome {
    children: Vec<ChildStatistics>,
    iterations: u64,
    rollout_moves: u64,
    nodes_created: u64,
    max_depth: u32,
}

/// Monte Carlo Tree Search Engine
#[derive(Debug)]
pub struct MctsEngine {
    config: EngineConfig,
    last: SearchStatistics,
    stats: Arc<AtomicStats>,
}

/// Atomic statistics for thread-safe updates
#[derive(Debug)]
struct AtomicStats {
    searches: AtomicU64,
    iterations: AtomicU64,
    rollout_moves: AtomicU64,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            searches: AtomicU64::new(0),
            iterations: AtomicU64::new(0),
            rollout_moves: AtomicU64::new(0),
        }
    }

    fn fill(&self, stats: &mut SearchStatistics) {
        stats.total_searches = self.searches.load(Ordering::Relaxed);
        stats.total_iterations = self.iterations.load(Ordering::Relaxed);
        stats.total_rollout_moves = self.rollout_moves.load(Ordering::Relaxed);
    }

    fn reset(&self) {
        self.searches.store(0, Ordering::Relaxed);
        self.iterations.store(0, Ordering::Relaxed);
        self.rollout_moves.store(0, Ordering::Relaxed);
    }
}

impl Default for MctsEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            last: SearchStatistics::default(),
            stats: Arc::new(AtomicStats::new()),
        }
    }
}

impl MctsEngine {
    /// Create a new MCTS engine with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new MCTS engine with custom configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Search from `game` and return the most visited root move.
    ///
    /// `game` is never modified. Fails when the game has no legal move.
    pub fn find_best_move<R: Rng + ?Sized>(
        &mut self,
        game: &Game,
        rng: &mut R,
    ) -> Result<Direction, EngineError> {
        if !game.moves_left() {
            return Err(EngineError::NoLegalMoves);
        }

        let start = Instant::now();
        let deadline = self.config.time_budget.map(|budget| start + budget);

        let outcomes: Vec<TreeOutcome> = if self.config.trees == 1 {
            vec![self.search_tree(game, deadline, rng)]
        } else {
            // One seed per tree keeps the result independent of scheduling
            let seeds: Vec<u64> = (0..self.config.trees).map(|_| rng.gen()).collect();
            seeds
                .par_iter()
                .map(|&seed| {
                    let mut tree_rng = StdRng::seed_from_u64(seed);
                    self.search_tree(game, deadline, &mut tree_rng)
                })
                .collect()
        };

        let mut last = SearchStatistics {
            elapsed: start.elapsed(),
            ..SearchStatistics::default()
        };
        for outcome in &outcomes {
            last.iterations += outcome.iterations;
            last.rollout_moves += outcome.rollout_moves;
            last.nodes_created += outcome.nodes_created;
            last.max_depth = last.max_depth.max(outcome.max_depth);
            merge_children(&mut last.root_children, &outcome.children);
        }

        self.stats.searches.fetch_add(1, Ordering::Relaxed);
        self.stats.iterations.fetch_add(last.iterations, Ordering::Relaxed);
        self.stats
            .rollout_moves
            .fetch_add(last.rollout_moves, Ordering::Relaxed);
        self.stats.fill(&mut last);

        let best = robust_child(&last.root_children).ok_or(EngineError::NoLegalMoves)?;
        let best_move = best.direction;

        debug!(
            "Search chose {} after {} iterations in {:?} ({} visits, mean score {:.1})",
            best_move,
            last.iterations,
            last.elapsed,
            best.visits,
            best.mean_score()
        );

        self.last = last;
        Ok(best_move)
    }

    /// Run one tree to its budget and report its root children.
    fn search_tree<R: Rng + ?Sized>(
        &self,
        game: &Game,
        deadline: Option<Instant>,
        rng: &mut R,
    ) -> TreeOutcome {
        let mut tree = SearchTree::new(game);
        let root = tree.root();
        let mut iterations = 0u64;
        let mut rollout_moves = 0u64;
        let mut max_depth = 0u32;

        while iterations < self.config.iterations as u64 {
            // Always complete at least one iteration so the root has a child
            if iterations > 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }

            let mut node = root;
            let mut state = game.clone();

            // Selection
            while tree[node].untried_moves().is_empty() {
                let Some(child) = tree.best_child(node, EXPLORATION_CONSTANT) else {
                    break;
                };
                node = child;
                if let Some(mv) = tree[node].mv() {
                    state.apply_move(mv, rng);
                }
            }

            // Expansion
            if !tree[node].untried_moves().is_empty() {
                let mv = random_move(tree[node].untried_moves(), rng);
                state.apply_move(mv, rng);
                node = tree.add_child(node, mv, &state);
            }

            // Simulation
            loop {
                let moves = state.moves();
                if moves.is_empty() {
                    break;
                }
                state.apply_move(random_move(&moves, rng), rng);
                rollout_moves += 1;
            }

            // Backpropagation
            max_depth = max_depth.max(tree[node].depth());
            tree.backpropagate(node, state.score);

            iterations += 1;
        }

        let children = tree[root]
            .children()
            .iter()
            .filter_map(|&child| {
                let node = &tree[child];
                node.mv().map(|direction| ChildStatistics {
                    direction,
                    visits: node.visits(),
                    score_sum: node.score_sum(),
                })
            })
            .collect();

        trace!(
            "Tree finished: {} iterations, {} nodes, depth {}",
            iterations,
            tree.len(),
            max_depth
        );

        TreeOutcome {
            children,
            iterations,
            rollout_moves,
            nodes_created: tree.len() as u64,
            max_depth,
        }
    }

    /// Get search statistics
    pub fn get_statistics(&self) -> SearchStatistics {
        let mut stats = self.last.clone();
        self.stats.fill(&mut stats);
        stats
    }

    /// Reset search statistics
    pub fn reset_statistics(&mut self) {
        self.stats.reset();
        self.last = SearchStatistics::default();
    }

    /// Get the current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Update the configuration
    pub fn set_config(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }
}

/// Fold `children` into `merged`, keeping first-seen order.
fn merge_children(merged: &mut Vec<ChildStatistics>, children: &[ChildStatistics]) {
    for child in children {
        match merged.iter_mut().find(|m| m.direction == child.direction) {
            Some(existing) => {
                existing.visits += child.visits;
                existing.score_sum += child.score_sum;
            }
            None => merged.push(child.clone()),
        }
    }
}

/// Most visited child; the first one wins ties.
fn robust_child(children: &[ChildStatistics]) -> Option<&ChildStatistics> {
    let mut best: Option<&ChildStatistics> = None;
    for child in children {
        match best {
            Some(current) if child.visits <= current.visits => {}
            _ => best = Some(child),
        }
    }
    best
}

/// Pick a move for `game` with the default 250-iteration search.
///
/// Panics if `game` has no legal move; check `Game::moves_left` first.
pub fn mcts<R: Rng + ?Sized>(game: &Game, rng: &mut R) -> Direction {
    match MctsEngine::new().find_best_move(game, rng) {
        Ok(direction) => direction,
        Err(e) => panic!("MCTS called on a finished game: {}", e),
    }
}
