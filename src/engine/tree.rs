//! Arena-backed search tree.
//!
//! Nodes own their children through indices into the arena; the parent link
//! is a plain index as well, so dropping the arena tears the whole tree down.

use crate::board::Direction;
use crate::game::Game;
use rand::Rng;
use std::ops::{Index, IndexMut};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    untried_moves: Vec<Direction>,
    mv: Option<Direction>,
    visits: u32,
    score_sum: u64,
    depth: u32,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn untried_moves(&self) -> &[Direction] {
        &self.untried_moves
    }

    /// The move that produced this node; `None` for the root.
    pub fn mv(&self) -> Option<Direction> {
        self.mv
    }

    pub fn visits(&self) -> u32 {
        self.visits
    }

    pub fn score_sum(&self) -> u64 {
        self.score_sum
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn mean_score(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.score_sum as f64 / self.visits as f64
        }
    }

    pub fn update(&mut self, score: u64) {
        self.visits += 1;
        self.score_sum += score;
    }
}

#[derive(Clone, Debug)]
pub struct SearchTree {
    nodes: Vec<Node>,
}

impl SearchTree {
    /// Create a tree holding a single root for `game`.
    pub fn new(game: &Game) -> Self {
        SearchTree {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                untried_moves: game.moves(),
                mv: None,
                visits: 0,
                score_sum: 0,
                depth: 0,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a child reached by `mv`; its untried moves come from `game`, which
    /// must already be in the post-move position.
    pub fn add_child(&mut self, parent: NodeId, mv: Direction, game: &Game) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = self[parent].depth + 1;

        let untried = &mut self[parent].untried_moves;
        if let Some(position) = untried.iter().position(|&m| m == mv) {
            untried.swap_remove(position);
        }

        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            untried_moves: game.moves(),
            mv: Some(mv),
            visits: 0,
            score_sum: 0,
            depth,
        });
        self[parent].children.push(id);
        id
    }

    /// UCT value of `node`; an unvisited node is always preferred.
    pub fn uct(&self, node: NodeId, exploration: f64) -> f64 {
        let n = &self[node];
        if n.visits == 0 {
            return f64::INFINITY;
        }
        let parent_visits = n.parent.map_or(n.visits, |p| self[p].visits);
        let exploitation = n.score_sum as f64 / n.visits as f64;
        let exploration_term = ((parent_visits as f64).ln() / n.visits as f64).sqrt();
        exploitation + exploration * exploration_term
    }

    /// Child with the highest UCT value; the first one wins ties.
    pub fn best_child(&self, node: NodeId, exploration: f64) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &self[node].children {
            let value = self.uct(child, exploration);
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((child, value)),
            }
        }
        best.map(|(child, _)| child)
    }

    /// Child with the most visits; the first one wins ties.
    pub fn most_visited_child(&self, node: NodeId) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        for &child in &self[node].children {
            match best {
                Some(current) if self[child].visits <= self[current].visits => {}
                _ => best = Some(child),
            }
        }
        best
    }

    /// Add `score` to `node` and each of its ancestors up to the root.
    pub fn backpropagate(&mut self, node: NodeId, score: u64) {
        let mut current = Some(node);
        while let Some(id) = current {
            self[id].update(score);
            current = self[id].parent;
        }
    }
}

impl Index<NodeId> for SearchTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for SearchTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

/// Uniformly random element of `moves`.
///
/// Panics on an empty slice.
pub fn random_move<R: Rng + ?Sized>(moves: &[Direction], rng: &mut R) -> Direction {
    assert!(!moves.is_empty(), "Cannot pick a random move from an empty set");
    moves[rng.gen_range(0..moves.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f64::consts::SQRT_2;

    fn open_game() -> Game {
        Game::from_board(Board::from_rows(&[
            &[0, 0, 0, 0],
            &[0, 2, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
        ]))
    }

    #[test]
    fn test_root_takes_moves_from_game() {
        let tree = SearchTree::new(&open_game());
        let root = &tree[tree.root()];
        assert_eq!(root.untried_moves(), &Direction::ALL);
        assert!(root.parent().is_none());
        assert!(root.mv().is_none());
        assert_eq!(root.visits(), 0);
    }

    #[test]
    fn test_add_child_shrinks_untried_moves() {
        let game = open_game();
        let mut tree = SearchTree::new(&game);
        let root = tree.root();

        let mut rng = StdRng::seed_from_u64(4);
        let after = game.apply_move_copy(Direction::Left, &mut rng);
        let child = tree.add_child(root, Direction::Left, &after);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[root].untried_moves().len(), 3);
        assert!(!tree[root].untried_moves().contains(&Direction::Left));
        assert_eq!(tree[root].children(), &[child]);
        assert_eq!(tree[child].parent(), Some(root));
        assert_eq!(tree[child].mv(), Some(Direction::Left));
        assert_eq!(tree[child].depth(), 1);
        assert_eq!(tree[child].untried_moves(), after.moves().as_slice());
    }

    #[test]
    fn test_unvisited_child_has_infinite_uct() {
        let game = open_game();
        let mut tree = SearchTree::new(&game);
        let root = tree.root();
        let child = tree.add_child(root, Direction::Up, &game);
        tree.backpropagate(root, 10);

        let value = tree.uct(child, SQRT_2);
        assert!(value.is_infinite() && value > 0.0);
        assert!(!value.is_nan());
    }

    #[test]
    fn test_uct_formula() {
        let game = open_game();
        let mut tree = SearchTree::new(&game);
        let root = tree.root();
        let a = tree.add_child(root, Direction::Up, &game);
        let b = tree.add_child(root, Direction::Down, &game);
        tree.backpropagate(a, 100);
        tree.backpropagate(a, 50);
        tree.backpropagate(b, 20);

        let expected = 75.0 + SQRT_2 * ((3.0f64).ln() / 2.0).sqrt();
        assert!((tree.uct(a, SQRT_2) - expected).abs() < 1e-9);
        assert_eq!(tree.best_child(root, SQRT_2), Some(a));
    }

    #[test]
    fn test_best_child_prefers_unvisited_then_first() {
        let game = open_game();
        let mut tree = SearchTree::new(&game);
        let root = tree.root();
        let a = tree.add_child(root, Direction::Up, &game);
        let b = tree.add_child(root, Direction::Down, &game);
        let c = tree.add_child(root, Direction::Left, &game);
        tree.backpropagate(a, 1000);

        assert_eq!(tree.best_child(root, SQRT_2), Some(b));
        tree.backpropagate(b, 0);
        assert_eq!(tree.best_child(root, SQRT_2), Some(c));
    }

    #[test]
    fn test_most_visited_child_breaks_ties_by_order() {
        let game = open_game();
        let mut tree = SearchTree::new(&game);
        let root = tree.root();
        let a = tree.add_child(root, Direction::Up, &game);
        let b = tree.add_child(root, Direction::Down, &game);
        tree.backpropagate(a, 1);
        tree.backpropagate(b, 1);
        assert_eq!(tree.most_visited_child(root), Some(a));

        tree.backpropagate(b, 1);
        assert_eq!(tree.most_visited_child(root), Some(b));
    }

    #[test]
    fn test_backpropagate_reaches_root() {
        let game = open_game();
        let mut tree = SearchTree::new(&game);
        let root = tree.root();
        let child = tree.add_child(root, Direction::Right, &game);
        let grandchild = tree.add_child(child, Direction::Left, &game);

        tree.backpropagate(grandchild, 12);
        for id in [root, child, grandchild] {
            assert_eq!(tree[id].visits(), 1);
            assert_eq!(tree[id].score_sum(), 12);
        }
        assert_eq!(tree[grandchild].depth(), 2);
    }

    #[test]
    #[should_panic]
    fn test_random_move_from_empty_set_panics() {
        let mut rng = StdRng::seed_from_u64(0);
        random_move(&[], &mut rng);
    }

    #[test]
    fn test_random_move_is_member() {
        let mut rng = StdRng::seed_from_u64(0);
        let moves = [Direction::Down, Direction::Right];
        for _ in 0..50 {
            assert!(moves.contains(&random_move(&moves, &mut rng)));
        }
    }
}
