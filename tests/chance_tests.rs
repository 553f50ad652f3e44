//! Chance-node tests: sampling frequencies, shared children and
//! distribution checks.

mod common;

use rust_azero::core::GameRng;
use rust_azero::error::{ContractViolation, SearchError, SelfPlayError};
use rust_azero::game::Game;
use rust_azero::mcts::{ExplorationConfig, MCTSConfig, MCTSNode, MCTSSearch, SearchBudget};
use rust_azero::nn::UniformEvaluator;
use rust_azero::training::{SelfPlayConfig, SelfPlayWorker};

use common::{single_flip, Fixed, Spot, Table};

/// Chance node reached through the root's only edge.
fn chance_child<'t, S>(tree: &'t rust_azero::mcts::MCTSTree<S>) -> &'t MCTSNode {
    let node = tree.get(tree.root_node().edges[0].child);
    assert!(node.is_chance());
    node
}

fn table_evaluator(game: &Table) -> Fixed {
    Fixed::new(
        vec![1.0 / game.actions as f32; game.actions],
        vec![0.0; game.players],
    )
}

#[test]
fn test_coin_flip_frequencies() {
    let game = single_flip(0.7);
    let evaluator = table_evaluator(&game);
    let mut rng = GameRng::new(99);
    let (state, player) = game.initial_state(&mut rng);

    let mut search = MCTSSearch::new(&game, &evaluator, MCTSConfig::default());
    let result = search
        .search(&state, player, &SearchBudget::simulations(10_000), &mut rng)
        .unwrap();

    let chance = chance_child(search.tree());
    assert_eq!(chance.edges.len(), 2);

    let total = chance.visits as f64;
    assert_eq!(chance.visits, 10_000);
    let heads = chance.edges.iter().find(|e| e.action == 0).unwrap();
    assert!((heads.visits as f64 / total - 0.7).abs() < 0.02);
    assert!((result.root_value.as_slice()[0] - 0.7).abs() < 0.02);
}

#[test]
fn test_chance_frequencies_chi_square() {
    let probabilities = [0.5, 0.3, 0.2];
    let mut spots = vec![
        Spot::Decision {
            player: 0,
            moves: vec![(0, 1)],
        },
        Spot::Chance {
            outcomes: probabilities
                .iter()
                .enumerate()
                .map(|(o, &p)| (o, p, o + 2))
                .collect(),
        },
    ];
    spots.extend((0..3).map(|o| Spot::Terminal {
        values: vec![o as f64],
        score: 0.0,
    }));
    let game = Table::new(1, 1, spots);
    let evaluator = table_evaluator(&game);
    let mut rng = GameRng::new(123);
    let (state, player) = game.initial_state(&mut rng);

    let mut search = MCTSSearch::new(&game, &evaluator, MCTSConfig::default());
    search
        .search(&state, player, &SearchBudget::simulations(6_001), &mut rng)
        .unwrap();

    let chance = chance_child(search.tree());
    let n = f64::from(chance.visits);
    let chi_square: f64 = chance
        .edges
        .iter()
        .map(|edge| {
            let expected = n * probabilities[edge.action];
            (f64::from(edge.visits) - expected).powi(2) / expected
        })
        .sum();

    // Two degrees of freedom, p = 0.001.
    assert!(chi_square < 13.82, "chi-square {chi_square}");
}

#[test]
fn test_outcomes_with_same_key_share_a_child() {
    let game = Table::new(
        1,
        1,
        vec![
            Spot::Decision {
                player: 0,
                moves: vec![(0, 1)],
            },
            Spot::Chance {
                outcomes: vec![(0, 0.5, 2), (1, 0.3, 2), (2, 0.2, 3)],
            },
            Spot::Terminal {
                values: vec![1.0],
                score: 0.0,
            },
            Spot::Terminal {
                values: vec![0.0],
                score: 0.0,
            },
        ],
    );
    let evaluator = table_evaluator(&game);
    let mut rng = GameRng::new(17);
    let (state, player) = game.initial_state(&mut rng);

    let mut search = MCTSSearch::new(&game, &evaluator, MCTSConfig::default());
    search
        .search(&state, player, &SearchBudget::simulations(2_001), &mut rng)
        .unwrap();

    let tree = search.tree();
    let chance = chance_child(tree);
    assert_eq!(chance.edges.len(), 2);

    let shared = chance
        .edges
        .iter()
        .find(|e| *tree.state(e.child) == 2)
        .unwrap();
    assert!((f64::from(shared.visits) / f64::from(chance.visits) - 0.8).abs() < 0.03);

    // Root, chance node and the two distinct terminals.
    assert_eq!(tree.len(), 4);
}

#[test]
fn test_chance_search_on_card_reveal_keeps_shape() {
    let game = rust_azero::games::CardReveal::new(2);
    let evaluator = UniformEvaluator::new(game.action_count(), game.player_count());
    let mut rng = GameRng::new(2);
    let (state, player) = game.initial_state(&mut rng);

    let mut search = MCTSSearch::new(&game, &evaluator, MCTSConfig::default());
    search
        .search(&state, player, &SearchBudget::simulations(500), &mut rng)
        .unwrap();

    let tree = search.tree();
    for (_, node) in tree.iter().filter(|(_, n)| n.is_chance()) {
        // One edge per distinct card value still in the deck.
        assert!(node.edges.len() <= 3);
        let mass: f32 = node.edges.iter().map(|e| e.prior).sum();
        assert!(mass <= 1.0 + 1e-5);
        assert_eq!(node.visits, node.edge_visits());
    }
}

fn leaky_coin() -> Table {
    Table::new(
        1,
        1,
        vec![
            Spot::Decision {
                player: 0,
                moves: vec![(0, 1)],
            },
            Spot::Chance {
                outcomes: vec![(0, 0.6, 2), (1, 0.3, 2)],
            },
            Spot::Terminal {
                values: vec![1.0],
                score: 0.0,
            },
        ],
    )
}

#[test]
fn test_bad_distribution_fails_search() {
    let game = leaky_coin();
    let evaluator = table_evaluator(&game);
    let mut rng = GameRng::new(0);
    let (state, player) = game.initial_state(&mut rng);

    let mut search = MCTSSearch::new(&game, &evaluator, MCTSConfig::default());
    let err = search
        .search(&state, player, &SearchBudget::simulations(5), &mut rng)
        .unwrap_err();

    assert!(matches!(
        err,
        SearchError::Contract(ContractViolation::ChanceDistribution(_))
    ));
}

#[test]
fn test_bad_distribution_fails_self_play() {
    // The game opens on the broken chance event, so self-play meets it
    // before any search.
    let game = Table::new(
        1,
        1,
        vec![
            Spot::Chance {
                outcomes: vec![(0, 0.6, 1), (1, 0.3, 1)],
            },
            Spot::Terminal {
                values: vec![1.0],
                score: 0.0,
            },
        ],
    );
    let evaluator = table_evaluator(&game);
    let config = SelfPlayConfig::default().with_exploration(ExplorationConfig::plain(4));
    let worker = SelfPlayWorker::new(game, evaluator, config);

    let err = worker.play_game(3).unwrap_err();
    assert!(err.is_contract_violation());
    assert!(matches!(
        err,
        SelfPlayError::Contract {
            seed: 3,
            source: ContractViolation::ChanceDistribution(_)
        }
    ));
}
