//! Tests for the layout engine

use super::*;
use crate::explain::{PlanBuilder, PlanContent};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn plan_of(root: PlanNode) -> Plan {
    PlanBuilder::new().create_plan("layout", PlanContent::new(root), "")
}

fn with_children(node_type: &str, children: Vec<PlanNode>) -> PlanNode {
    PlanNode {
        children,
        ..PlanNode::new(node_type)
    }
}

//      Hash Join (1)
//      /          \
//  Seq Scan (2)   Hash (3)
//                   |
//                Seq Scan (4)
fn join_plan() -> Plan {
    plan_of(with_children(
        "Hash Join",
        vec![
            PlanNode::new("Seq Scan"),
            with_children("Hash", vec![PlanNode::new("Seq Scan")]),
        ],
    ))
}

fn cte(name: &str, children: Vec<PlanNode>) -> PlanNode {
    PlanNode {
        parent_relationship: Some("InitPlan".to_string()),
        subplan_name: Some(format!("CTE {name}")),
        ..with_children("Seq Scan", children)
    }
}

// CTE Scan (1) with CTE bodies a (2 -> 3) and b (4)
fn cte_plan() -> Plan {
    plan_of(with_children(
        "CTE Scan",
        vec![cte("a", vec![PlanNode::new("Sort")]), cte("b", Vec::new())],
    ))
}

fn engine(plan: Plan) -> LayoutEngine {
    LayoutEngine::with_rng(
        plan,
        HighlightType::Duration,
        StdRng::seed_from_u64(5),
        LayoutConfig::default(),
    )
}

fn edge(graph: &LayoutGraph, source: u32, target: u32) -> Option<&LayoutEdge> {
    let id = edge_key(source, target);
    graph.edges.iter().find(|edge| edge.id == id)
}

fn position(graph: &LayoutGraph, node_id: u32) -> Position {
    graph
        .node(node_id)
        .map(|node| node.position)
        .expect("node is laid out")
}

#[test]
fn test_unmeasured_nodes_are_zero_sized() {
    let graph = engine(join_plan()).build_layout();

    assert_eq!(position(&graph, 1), Position { x: 0.0, y: 0.0 });
    assert_eq!(position(&graph, 2), Position { x: -25.0, y: 75.0 });
    assert_eq!(position(&graph, 3), Position { x: 25.0, y: 75.0 });
    assert_eq!(position(&graph, 4), Position { x: 0.0, y: 150.0 });
}

#[test]
fn test_levels_use_measured_sizes() {
    let mut engine = engine(join_plan());
    engine.register_node_dimensions("node-1", NodeDimensions::new(200.0, 80.0));
    engine.register_node_dimensions("node-2", NodeDimensions::new(100.0, 60.0));
    engine.register_node_dimensions("node-3", NodeDimensions::new(150.0, 40.0));
    engine.register_node_dimensions("node-4", NodeDimensions::new(120.0, 30.0));

    let graph = engine.run_frame().expect("frame scheduled");

    assert_eq!(position(&graph, 1), Position { x: -100.0, y: 0.0 });
    assert_eq!(position(&graph, 2), Position { x: -150.0, y: 155.0 });
    assert_eq!(position(&graph, 3), Position { x: 0.0, y: 155.0 });
    assert_eq!(position(&graph, 4), Position { x: -60.0, y: 290.0 });
}

#[test]
fn test_nodes_and_edges_in_preorder() {
    let graph = engine(join_plan()).build_layout();

    let ids: Vec<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(ids, vec!["node-1", "node-2", "node-3", "node-4"]);

    let edges: Vec<(&str, &str, &str)> = graph
        .edges
        .iter()
        .map(|edge| (edge.id.as_str(), edge.source.as_str(), edge.target.as_str()))
        .collect();
    assert_eq!(
        edges,
        vec![
            ("edge-1-2", "node-1", "node-2"),
            ("edge-1-3", "node-1", "node-3"),
            ("edge-3-4", "node-3", "node-4"),
        ]
    );
}

#[test]
fn test_cte_clusters_are_anchored() {
    let graph = engine(cte_plan()).build_layout();

    assert_eq!(position(&graph, 1), Position { x: 0.0, y: 0.0 });
    assert_eq!(position(&graph, 2), Position { x: -500.0, y: -200.0 });
    assert_eq!(position(&graph, 3), Position { x: -500.0, y: -125.0 });
    assert_eq!(position(&graph, 4), Position { x: -100.0, y: -200.0 });

    assert!(edge(&graph, 2, 3).is_some());
    assert!(edge(&graph, 1, 2).is_none());
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.nodes.len(), 4);
}

#[test]
fn test_cte_anchor_uses_root_position() {
    let mut engine = engine(cte_plan());
    engine.register_node_dimensions("node-2", NodeDimensions::new(100.0, 40.0));
    engine.register_node_dimensions("node-3", NodeDimensions::new(60.0, 20.0));

    let graph = engine.build_layout();

    assert_eq!(position(&graph, 2), Position { x: -500.0, y: -200.0 });
    assert_eq!(position(&graph, 3), Position { x: -480.0, y: -85.0 });
}

#[test]
fn test_edge_width_follows_rows() {
    let mut root = with_children(
        "Append",
        vec![PlanNode::new("Seq Scan"), PlanNode::new("Seq Scan")],
    );
    root.actual_rows = Some(100.0);
    root.children[0].actual_rows = Some(100.0);
    root.children[1].actual_rows = Some(0.0);
    let graph = engine(plan_of(root)).build_layout();

    assert_eq!(edge(&graph, 1, 2).map(|edge| edge.stroke_width), Some(8.0));
    assert_eq!(edge(&graph, 1, 3).map(|edge| edge.stroke_width), Some(1.0));

    let estimated = engine(join_plan()).build_layout();
    assert!(estimated.edges.iter().all(|edge| edge.stroke_width == 2.0));
}

#[test]
fn test_colors_stable_across_passes() {
    let mut engine = engine(join_plan());
    let first = engine.build_layout();

    engine.register_node_dimensions("node-2", NodeDimensions::new(300.0, 120.0));
    let second = engine.run_frame().expect("frame scheduled");
    engine.set_highlight(HighlightType::Rows);
    let third = engine.run_frame().expect("frame scheduled");

    let colors = |graph: &LayoutGraph| {
        graph
            .edges
            .iter()
            .map(|edge| (edge.id.clone(), edge.color))
            .collect::<Vec<_>>()
    };
    assert_eq!(colors(&first), colors(&second));
    assert_eq!(colors(&first), colors(&third));
}

#[test]
fn test_sibling_edges_get_distinct_colors() {
    let graph = engine(join_plan()).build_layout();

    let left = edge(&graph, 1, 2).map(|edge| edge.color);
    let right = edge(&graph, 1, 3).map(|edge| edge.color);
    let below = edge(&graph, 3, 4).map(|edge| edge.color);
    assert_ne!(left, right);
    assert_ne!(right, below);
}

#[test]
fn test_same_seed_same_layout() {
    let first = engine(join_plan()).build_layout();
    let second = engine(join_plan()).build_layout();

    assert_eq!(first.edges, second.edges);
}

#[test]
fn test_frames_coalesce() {
    let mut engine = engine(join_plan());
    assert!(engine.has_pending_frame());
    assert!(engine.run_frame().is_some());
    assert!(engine.run_frame().is_none());

    for id in ["node-1", "node-2", "node-3"] {
        assert!(engine.register_node_dimensions(id, NodeDimensions::new(10.0, 10.0)));
    }
    assert!(engine.has_pending_frame());
    assert!(engine.run_frame().is_some());
    assert!(!engine.has_pending_frame());
}

#[test]
fn test_unchanged_dimensions_do_not_schedule() {
    let mut engine = engine(join_plan());
    engine.register_node_dimensions("node-1", NodeDimensions::new(10.0, 20.0));
    engine.run_frame();

    assert!(!engine.register_node_dimensions("node-1", NodeDimensions::new(10.0, 20.0)));
    assert!(!engine.has_pending_frame());

    assert!(engine.register_node_dimensions("node-1", NodeDimensions::new(10.0, 21.0)));
    assert!(engine.has_pending_frame());
}

#[test]
fn test_build_layout_cancels_pending_frame() {
    let mut engine = engine(join_plan());
    engine.build_layout();

    assert!(!engine.has_pending_frame());
    assert!(engine.run_frame().is_none());
}

#[test]
fn test_set_highlight() {
    let mut engine = engine(join_plan());
    engine.run_frame();

    engine.set_highlight(HighlightType::Duration);
    assert!(!engine.has_pending_frame());

    engine.set_highlight(HighlightType::Cost);
    assert!(engine.has_pending_frame());
    let graph = engine.run_frame().expect("frame scheduled");
    assert!(
        graph
            .nodes
            .iter()
            .all(|node| node.data.highlight == HighlightType::Cost)
    );
}

#[test]
fn test_set_plan_clears_state() {
    let mut engine = engine(join_plan());
    engine.register_node_dimensions("node-1", NodeDimensions::new(10.0, 20.0));
    engine.run_frame();

    engine.set_plan(cte_plan());

    assert_eq!(engine.dimensions("node-1"), None);
    assert!(engine.has_pending_frame());
    let graph = engine.run_frame().expect("frame scheduled");
    assert_eq!(graph.nodes.len(), 4);
    assert_eq!(engine.plan().ctes.len(), 2);
}

#[test]
fn test_render_data_carries_plan_maxima() {
    let mut root = with_children("Append", vec![PlanNode::new("Seq Scan")]);
    root.actual_total_time = Some(20.0);
    root.children[0].actual_total_time = Some(15.0);
    let plan = plan_of(root);
    let graph = engine(plan).build_layout();

    let node = graph.node(1).expect("root");
    assert_eq!(node.data.max_duration, Some(15.0));
    assert_eq!(node.data.display_name, "Append");
    assert!(node.data.node.children.is_empty());
}

proptest! {
    #[test]
    fn prop_siblings_separated_by_gap(
        widths in prop::collection::vec(1.0f64..500.0, 1..8),
        root_width in 1.0f64..500.0,
    ) {
        let children = widths.iter().map(|_| PlanNode::new("Seq Scan")).collect();
        let mut engine = engine(plan_of(with_children("Append", children)));
        engine.register_node_dimensions("node-1", NodeDimensions::new(root_width, 50.0));
        for (index, width) in widths.iter().enumerate() {
            engine.register_node_dimensions(
                &node_key(index as u32 + 2),
                NodeDimensions::new(*width, 40.0),
            );
        }

        let graph = engine.build_layout();
        let gap = LayoutConfig::default().horizontal_gap;

        for pair in (0..widths.len()).collect::<Vec<_>>().windows(2) {
            let left = position(&graph, pair[0] as u32 + 2);
            let right = position(&graph, pair[1] as u32 + 2);
            let left_end = left.x + widths[pair[0]];
            prop_assert!(right.x - left_end >= gap - 1e-6);
            prop_assert_eq!(left.y, right.y);
        }
    }
}
