//! Shape tests for the path fixture against the in-memory store.

use std::collections::{HashMap, HashSet, VecDeque};

use grove_store::{ConceptId, GraphSession, MemoryGraph};
use grove_testkit::{
    fixtures::path::{expected_edge_count, expected_node_count, vertex_label, ROOT_LABEL},
    init_test_logging, FixtureError, IndexError, PathGraph,
};

/// `(from, to)` pairs of every `arc` in the store.
fn arcs(graph: &MemoryGraph, fixture: &PathGraph<'_, MemoryGraph>) -> Vec<(ConceptId, ConceptId)> {
    let schema = fixture.schema();
    graph
        .relations(&schema.arc)
        .unwrap()
        .into_iter()
        .map(|r| {
            (
                r.player(&schema.arc_from).unwrap(),
                r.player(&schema.arc_to).unwrap(),
            )
        })
        .collect()
}

fn all_labels(depth: u32, branching: u64) -> Vec<String> {
    let mut labels = vec![ROOT_LABEL.to_string()];
    for level in 1..=depth {
        for position in 0..branching.pow(level) {
            labels.push(vertex_label(level, position));
        }
    }
    labels
}

#[test]
fn depth_two_binary_tree_has_exact_shape() {
    init_test_logging();
    let graph = MemoryGraph::new();
    let fixture = PathGraph::new(&graph).unwrap();
    let summary = fixture.build(2, 2).unwrap();
    assert_eq!((summary.nodes, summary.edges), (7, 6));

    let index = fixture.index();
    let id = |label: &str| index.resolve(label).unwrap().id();

    let root = index.resolve("a0").unwrap();
    assert_eq!(root.type_label(), "start-vertex");
    for label in ["a1,0", "a1,1", "a2,0", "a2,1", "a2,2", "a2,3"] {
        assert_eq!(index.resolve(label).unwrap().type_label(), "vertex");
    }

    let expected: HashSet<_> = [
        ("a0", "a1,0"),
        ("a0", "a1,1"),
        ("a1,0", "a2,0"),
        ("a1,0", "a2,1"),
        ("a1,1", "a2,2"),
        ("a1,1", "a2,3"),
    ]
    .into_iter()
    .map(|(from, to)| (id(from), id(to)))
    .collect();
    let actual: HashSet<_> = arcs(&graph, &fixture).into_iter().collect();
    assert_eq!(actual, expected);
}

#[test]
fn counts_follow_the_closed_form() {
    init_test_logging();
    for (depth, branching) in [(0, 3), (1, 1), (1, 4), (3, 2), (2, 5), (4, 3)] {
        let graph = MemoryGraph::new();
        let summary = PathGraph::load(&graph, depth, branching).unwrap();
        let nodes = expected_node_count(depth, branching).unwrap();
        let edges = expected_edge_count(depth, branching).unwrap();

        assert_eq!(summary.nodes, nodes, "nodes for ({depth}, {branching})");
        assert_eq!(summary.edges, edges, "edges for ({depth}, {branching})");

        let counts = graph.committed_counts();
        assert_eq!(counts.entities as u64, nodes);
        assert_eq!(counts.resources as u64, nodes);
        // One has-index per node on top of the arcs.
        assert_eq!(counts.relations as u64, edges + nodes);
    }
}

#[test]
fn every_node_is_reachable_through_one_parent() {
    init_test_logging();
    let graph = MemoryGraph::new();
    let fixture = PathGraph::new(&graph).unwrap();
    fixture.build(3, 3).unwrap();

    let edges = arcs(&graph, &fixture);
    let mut incoming: HashMap<ConceptId, usize> = HashMap::new();
    let mut children: HashMap<ConceptId, Vec<ConceptId>> = HashMap::new();
    for &(from, to) in &edges {
        *incoming.entry(to).or_default() += 1;
        children.entry(from).or_default().push(to);
    }

    let root = fixture.index().resolve(ROOT_LABEL).unwrap().id();
    assert!(!incoming.contains_key(&root));
    assert!(incoming.values().all(|&n| n == 1));

    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        for &child in children.get(&node).into_iter().flatten() {
            assert!(seen.insert(child), "{child} reached twice");
            queue.push_back(child);
        }
    }
    assert_eq!(seen.len() as u64, expected_node_count(3, 3).unwrap());
}

#[test]
fn every_label_resolves_to_a_distinct_instance() {
    init_test_logging();
    let graph = MemoryGraph::new();
    let fixture = PathGraph::new(&graph).unwrap();
    fixture.build(3, 2).unwrap();

    let ids: HashSet<_> = all_labels(3, 2)
        .iter()
        .map(|label| fixture.index().resolve(label).unwrap().id())
        .collect();
    assert_eq!(ids.len(), 15);

    for missing in ["a4,0", "a1,2", "b0", ""] {
        assert_eq!(
            fixture.index().resolve(missing).unwrap_err(),
            IndexError::NotFound(missing.to_string())
        );
    }
}

#[test]
fn rebuilding_into_a_populated_store_fails() {
    init_test_logging();
    let graph = MemoryGraph::new();
    PathGraph::load(&graph, 2, 2).unwrap();

    let again = PathGraph::new(&graph).unwrap();
    assert_eq!(
        again.build(1, 1).unwrap_err(),
        FixtureError::AlreadyPopulated(ROOT_LABEL.to_string())
    );
    assert_eq!(graph.counts().unwrap().entities, 7);
}

#[test]
fn zero_branching_is_rejected_before_writing() {
    init_test_logging();
    let graph = MemoryGraph::new();
    let fixture = PathGraph::new(&graph).unwrap();
    assert_eq!(fixture.build(3, 0).unwrap_err(), FixtureError::InvalidBranching);
    assert_eq!(graph.counts().unwrap().entities, 0);
}

#[test]
fn load_commits_once_at_the_end() {
    init_test_logging();
    let graph = MemoryGraph::new();

    let fixture = PathGraph::new(&graph).unwrap();
    fixture.build(2, 3).unwrap();
    assert_eq!(graph.committed_counts().entities, 0);
    assert_eq!(graph.counts().unwrap().entities, 13);
    graph.rollback().unwrap();
    assert_eq!(graph.counts().unwrap().entities, 0);

    PathGraph::load(&graph, 2, 3).unwrap();
    assert_eq!(graph.committed_counts().entities, 13);
}
