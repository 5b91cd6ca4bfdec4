use downstack_mcts::policy::{
    MaxAggregation, MeanAggregation, PuctPolicy, SelectionPolicy, SquareOfRankPolicy,
};
use downstack_mcts::{ActionStats, Node};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn action(visits: u32, reward: f32, prior: f32, eval: f32) -> ActionStats<u8> {
    ActionStats {
        mv: 0,
        visits,
        reward,
        prior,
        eval,
    }
}

fn node(actions: Vec<ActionStats<u8>>) -> Node<u8> {
    let visits = 1 + actions.iter().map(|a| a.visits).sum::<u32>();
    Node {
        fingerprint: 1,
        visits,
        reward_buffer: 0.0,
        actions,
    }
}

#[test]
fn puct_samples_unvisited_actions_first() {
    let policy = PuctPolicy::new(1.414, 512.0);
    let mut rng = StdRng::seed_from_u64(1);

    // Action 1 is unvisited; it must win regardless of action 0's score.
    let node = node(vec![
        action(50, 50.0, 0.9, 1.0),
        action(0, 0.0, 0.01, -1.0),
        action(3, 1.0, 0.09, 0.0),
    ]);
    assert_eq!(policy.pick(&node, 0, &MeanAggregation, &mut rng), 1);
}

#[test]
fn puct_prefers_higher_mean_reward_when_priors_match() {
    let policy = PuctPolicy::new(1.414, 512.0);
    let mut rng = StdRng::seed_from_u64(1);

    let node = node(vec![
        action(10, 2.0, 0.5, 0.0),
        action(10, 8.0, 0.5, 0.0),
    ]);
    assert_eq!(policy.pick(&node, 0, &MeanAggregation, &mut rng), 1);
}

#[test]
fn puct_reads_q_through_the_aggregation_rule() {
    let policy = PuctPolicy::new(1.414, 512.0);
    let mut rng = StdRng::seed_from_u64(1);

    // Under max aggregation the stored R is already the action value. The
    // heavily visited action carries the higher maximum and must win; a mean
    // reading (R divided by visits) would invert the comparison and send the
    // search down the weaker branch.
    let node = node(vec![
        action(100, 0.9, 0.05, 0.0),
        action(10, 0.5, 0.05, 0.0),
    ]);
    assert_eq!(policy.pick(&node, 0, &MaxAggregation, &mut rng), 0);
}

#[test]
fn puct_exploration_term_lifts_high_prior_actions() {
    let policy = PuctPolicy::new(1.414, 512.0);
    let mut rng = StdRng::seed_from_u64(1);

    // Equal rewards, very different priors and visit counts: the lightly
    // visited high-prior action gets the bigger exploration bonus.
    let node = node(vec![
        action(100, 50.0, 0.1, 0.0),
        action(1, 0.5, 0.9, 0.0),
    ]);
    assert_eq!(policy.pick(&node, 0, &MeanAggregation, &mut rng), 1);
}

#[test]
fn puct_ties_break_to_the_first_action() {
    let policy = PuctPolicy::new(1.414, 512.0);
    let mut rng = StdRng::seed_from_u64(1);

    let node = node(vec![
        action(5, 2.5, 0.25, 0.0),
        action(5, 2.5, 0.25, 0.0),
        action(5, 2.5, 0.25, 0.0),
    ]);
    assert_eq!(policy.pick(&node, 0, &MeanAggregation, &mut rng), 0);
}

#[test]
fn puct_constant_grows_with_visits_and_depth() {
    let policy = PuctPolicy::new(1.414, 512.0);
    let shallow = policy.c_puct(10, 0);
    let deep = policy.c_puct(10, 40);
    let heavy = policy.c_puct(10_000, 0);

    assert!((policy.c_puct(0, 0) - 1.414).abs() < 1e-3);
    assert!(deep > shallow);
    assert!(heavy > deep);
}

#[test]
fn square_of_rank_concentrates_on_the_best_ranked_action() {
    let policy = SquareOfRankPolicy::new();
    let mut rng = StdRng::seed_from_u64(7);

    // Action 2 ranks first on max(eval, value).
    let node = node(vec![
        action(1, 0.1, 0.2, 0.3),
        action(1, 0.2, 0.2, 0.1),
        action(1, 0.9, 0.2, 0.4),
    ]);

    let mut counts = [0usize; 3];
    for _ in 0..4000 {
        counts[policy.pick(&node, 0, &MeanAggregation, &mut rng)] += 1;
    }

    // Weights are 1/1, 1/4, 1/9 over ranks, so the top action should take
    // roughly 70% of the draws and every action should appear.
    assert!(counts[2] > counts[0] && counts[2] > counts[1]);
    assert!(counts[2] > 2000);
    assert!(counts.iter().all(|&c| c > 0));
}

#[test]
fn square_of_rank_uses_eval_when_reward_is_cold() {
    let policy = SquareOfRankPolicy::new();
    let mut rng = StdRng::seed_from_u64(11);

    let node = node(vec![
        action(0, 0.0, 0.5, 2.0),
        action(0, 0.0, 0.5, -2.0),
    ]);

    let mut first = 0usize;
    for _ in 0..1000 {
        if policy.pick(&node, 0, &MeanAggregation, &mut rng) == 0 {
            first += 1;
        }
    }
    // Rank 1 carries 4/5 of the mass.
    assert!(first > 650);
}

#[test]
fn square_of_rank_ranks_by_the_aggregated_value() {
    let policy = SquareOfRankPolicy::new();
    let mut rng = StdRng::seed_from_u64(13);

    // A large reward sum over many visits is a mediocre mean; the second
    // action's smaller sum over one visit ranks higher.
    let node = node(vec![
        action(100, 10.0, 0.5, 0.0),
        action(1, 0.8, 0.5, 0.0),
    ]);

    let mut second = 0usize;
    for _ in 0..2000 {
        if policy.pick(&node, 0, &MeanAggregation, &mut rng) == 1 {
            second += 1;
        }
    }
    // Rank 1 carries 4/5 of the mass of the 1/r² distribution.
    assert!(second > 1300);
}
