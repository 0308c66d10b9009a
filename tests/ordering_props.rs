/// Property tests for cycle detection and execution ordering over random DAGs

use blueprint_engine::nodes;
use blueprint_engine::Blueprint;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

/// Node count plus forward edges `(i, j)` with `i < j`, so the graph is acyclic
fn dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..12).prop_flat_map(|n| {
        let edge = (0..n, 0..n).prop_filter_map("forward edges only", |(a, b)| {
            (a < b).then_some((a, b))
        });
        (Just(n), prop::collection::vec(edge, 1..24))
    })
}

fn build(n: usize, edges: &[(usize, usize)]) -> Blueprint {
    let mut bp = Blueprint::with_id("prop", "random dag");
    for i in 0..n {
        let id = format!("n{i}");
        bp.add_node(nodes::transform(id.clone(), id, "identity"));
    }
    for (a, b) in edges {
        bp.connect(&format!("n{a}"), &format!("n{b}"));
    }
    bp
}

proptest! {
    #[test]
    fn acyclic_order_respects_every_edge((n, edges) in dag()) {
        let bp = build(n, &edges);
        prop_assert!(!bp.has_cycles());

        let order = bp.execution_order();
        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

        let connected: HashSet<String> = edges
            .iter()
            .flat_map(|(a, b)| [format!("n{a}"), format!("n{b}")])
            .collect();
        prop_assert_eq!(order.len(), connected.len());

        for (a, b) in &edges {
            let (from, to) = (format!("n{a}"), format!("n{b}"));
            prop_assert!(position[from.as_str()] < position[to.as_str()]);
        }
    }

    #[test]
    fn back_edge_creates_a_cycle((n, edges) in dag()) {
        let mut bp = build(n, &edges);
        let (a, b) = edges[0];
        bp.connect(&format!("n{b}"), &format!("n{a}"));
        prop_assert!(bp.has_cycles());
    }
}
