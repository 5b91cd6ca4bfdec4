use downstack_mcts::{ActionStats, Evaluator, GameState, Node, TreeStore};

#[derive(Clone, Debug)]
struct Countdown {
    value: u32,
}

impl GameState for Countdown {
    type Move = u32;

    fn legal_moves(&self) -> Vec<u32> {
        if self.is_terminal() {
            return vec![];
        }
        vec![1, 2, 3]
    }

    fn apply(&self, mv: &u32) -> Self {
        Countdown {
            value: self.value.saturating_sub(*mv),
        }
    }

    fn is_terminal(&self) -> bool {
        self.value == 0
    }

    fn fingerprint(&self) -> u32 {
        self.value
    }
}

struct PreferSmall;

impl Evaluator<Countdown> for PreferSmall {
    fn static_value(&self, _state: &Countdown, mv: &u32) -> f32 {
        -(*mv as f32)
    }
}

struct Flat;

impl Evaluator<Countdown> for Flat {
    fn static_value(&self, _state: &Countdown, _mv: &u32) -> f32 {
        0.5
    }
}

fn bare_node(fingerprint: u32) -> Node<u32> {
    Node {
        fingerprint,
        visits: 1,
        reward_buffer: 0.0,
        actions: vec![ActionStats {
            mv: 1,
            visits: 0,
            reward: 0.0,
            prior: 1.0,
            eval: 0.0,
        }],
    }
}

#[test]
fn from_state_normalises_priors() {
    let node = Node::from_state(&Countdown { value: 10 }, &PreferSmall);
    assert_eq!(node.fingerprint, 10);
    assert_eq!(node.visits, 1);
    assert_eq!(node.actions.len(), 3);

    let total: f32 = node.actions.iter().map(|a| a.prior).sum();
    assert!((total - 1.0).abs() < 1e-5);
    // Higher static value, higher prior.
    assert!(node.actions[0].prior > node.actions[1].prior);
    assert!(node.actions[1].prior > node.actions[2].prior);
    assert_eq!(node.actions[2].prior, 0.0);
}

#[test]
fn from_state_falls_back_to_uniform_priors() {
    let node = Node::from_state(&Countdown { value: 10 }, &Flat);
    for action in &node.actions {
        assert!((action.prior - 1.0 / 3.0).abs() < 1e-5);
    }
}

#[test]
fn from_state_on_terminal_has_no_actions() {
    let node = Node::from_state(&Countdown { value: 0 }, &Flat);
    assert!(node.actions.is_empty());
}

#[test]
fn ownership_is_fingerprint_modulo_workers() {
    let tree: TreeStore<u32> = TreeStore::new(4);
    assert_eq!(tree.worker_count(), 4);
    assert_eq!(tree.owner(0), 0);
    assert_eq!(tree.owner(5), 1);
    assert_eq!(tree.owner(7), 3);
    assert_eq!(tree.owner(8), 0);
}

#[test]
fn insert_is_idempotent() {
    let tree: TreeStore<u32> = TreeStore::new(2);
    let owner = tree.owner(6);

    tree.insert(bare_node(6), owner);
    tree.with_node_mut(6, owner, |node| node.visits = 99).unwrap();
    // A second insert of the same fingerprint must not clobber statistics.
    tree.insert(bare_node(6), owner);

    assert_eq!(tree.with_node(6, |node| node.visits), Some(99));
    assert_eq!(tree.node_count(), 1);
}

#[test]
fn with_node_mut_on_missing_node_returns_none() {
    let tree: TreeStore<u32> = TreeStore::new(2);
    assert!(tree.with_node_mut(3, tree.owner(3), |_| ()).is_none());
    assert!(!tree.contains(3));
}

#[test]
fn collect_rescales_and_drops_untouched_nodes() {
    let tree: TreeStore<u32> = TreeStore::new(1);
    let mut node = bare_node(5);
    node.visits = 10;
    node.reward_buffer = 3.0;
    node.actions[0].visits = 9;
    node.actions[0].reward = 6.0;
    tree.insert(node, 0);
    tree.insert(bare_node(8), 0);

    tree.collect(0.5);
    assert_eq!(tree.node_count(), 2);

    // Touch 5, leave 8 alone, then collect again.
    tree.with_node_mut(5, 0, |node| node.visits += 1).unwrap();
    tree.collect(0.5);

    assert!(tree.contains(5));
    assert!(!tree.contains(8));

    tree.with_node(5, |node| {
        assert_eq!(node.reward_buffer, 0.0);
        assert!(node.visits >= 1);
        assert!(node.actions[0].reward < 6.0);
    })
    .unwrap();
}

#[test]
fn collect_keeps_at_least_one_node_visit() {
    let tree: TreeStore<u32> = TreeStore::new(1);
    tree.insert(bare_node(2), 0);
    tree.collect(0.0);
    assert_eq!(tree.with_node(2, |node| node.visits), Some(1));
}

#[test]
fn promotion_on_touch_survives_the_next_collect() {
    let tree: TreeStore<u32> = TreeStore::new(1);
    tree.insert(bare_node(4), 0);
    tree.collect(1.0);

    // Owner touch moves the node back into the write generation.
    tree.with_node_mut(4, 0, |node| node.visits += 1).unwrap();
    tree.collect(1.0);
    assert!(tree.contains(4));

    // Non-owner touch (work stealing) mutates in place without promoting.
    let tree: TreeStore<u32> = TreeStore::new(2);
    tree.insert(bare_node(6), tree.owner(6));
    tree.collect(1.0);
    let thief = (tree.owner(6) + 1) % 2;
    assert!(tree.with_node_mut(6, thief, |node| node.visits += 1).is_some());
    assert_eq!(tree.with_node(6, |node| node.visits), Some(2));
    tree.collect(1.0);
    assert!(!tree.contains(6));
}

#[test]
fn for_each_visits_every_node_with_its_shard() {
    let tree: TreeStore<u32> = TreeStore::new(3);
    for fp in [0u32, 1, 2, 3, 4, 5] {
        tree.insert(bare_node(fp), tree.owner(fp));
    }

    let mut seen = 0;
    tree.for_each(|shard, node| {
        assert_eq!(shard, tree.owner(node.fingerprint));
        seen += 1;
    });
    assert_eq!(seen, 6);
}
