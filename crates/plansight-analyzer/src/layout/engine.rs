//! Layered tree layout for a built [`Plan`]
//!
//! Nodes are bucketed by depth. Each level is a row centred on `x = 0`, with
//! siblings in source order separated by the horizontal gap; each row sits
//! below the tallest node of the previous one. CTE trees get the same
//! treatment and are then moved so their roots line up in a row of clusters
//! above the main tree.
//!
//! Node sizes are only known once a renderer has drawn them, so the engine
//! keeps the last reported size of every node and lays out again on the next
//! frame whenever one changes. Nodes that were never measured count as
//! zero-sized boxes.

use crate::explain::{Plan, PlanNode, PlanStats};
use crate::layout::config::LayoutConfig;
use crate::layout::edges::{EdgePalette, stroke_width};
use crate::layout::frame::FrameScheduler;
use crate::render::{HighlightType, NodeRenderData};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Measured size of a rendered node box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeDimensions {
    pub width: f64,
    pub height: f64,
}

impl NodeDimensions {
    pub const ZERO: NodeDimensions = NodeDimensions {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Top-left corner of a node box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
    /// `node-<node_id>`
    pub id: String,
    pub node_id: u32,
    pub position: Position,
    pub data: NodeRenderData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutEdge {
    /// `edge-<parent>-<child>`
    pub id: String,
    pub source: String,
    pub target: String,
    pub color: &'static str,
    pub stroke_width: f64,
}

/// Output of one layout pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutGraph {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

impl LayoutGraph {
    pub fn node(&self, node_id: u32) -> Option<&LayoutNode> {
        self.nodes.iter().find(|node| node.node_id == node_id)
    }
}

/// Renderer-facing id of a plan node
pub fn node_key(node_id: u32) -> String {
    format!("node-{node_id}")
}

fn edge_key(source: u32, target: u32) -> String {
    format!("edge-{source}-{target}")
}

/// Owns all layout state for one rendered plan
#[derive(Debug)]
pub struct LayoutEngine<R = StdRng> {
    plan: Plan,
    highlight: HighlightType,
    config: LayoutConfig,
    dimensions: HashMap<String, NodeDimensions>,
    palette: EdgePalette,
    frames: FrameScheduler,
    rng: R,
}

impl LayoutEngine<StdRng> {
    /// Creates an engine with default spacing and an entropy-seeded RNG
    pub fn new(plan: Plan, highlight: HighlightType) -> Self {
        Self::with_rng(
            plan,
            highlight,
            StdRng::from_entropy(),
            LayoutConfig::default(),
        )
    }
}

impl<R: Rng> LayoutEngine<R> {
    /// Creates an engine and schedules its first pass
    pub fn with_rng(plan: Plan, highlight: HighlightType, rng: R, config: LayoutConfig) -> Self {
        let mut frames = FrameScheduler::new();
        frames.request();
        Self {
            plan,
            highlight,
            config,
            dimensions: HashMap::new(),
            palette: EdgePalette::new(),
            frames,
            rng,
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn highlight(&self) -> HighlightType {
        self.highlight
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Replaces the plan, forgetting every measured size and edge colour
    pub fn set_plan(&mut self, plan: Plan) {
        tracing::debug!(plan = %plan.id, nodes = plan.node_count(), "layout plan changed");
        self.plan = plan;
        self.dimensions.clear();
        self.palette.clear();
        self.frames.request();
    }

    pub fn set_highlight(&mut self, highlight: HighlightType) {
        if self.highlight == highlight {
            return;
        }
        self.highlight = highlight;
        self.frames.request();
    }

    /// Records the measured size of `node-<id>`. Returns false, without
    /// scheduling a pass, when the size is unchanged.
    pub fn register_node_dimensions(&mut self, id: &str, dimensions: NodeDimensions) -> bool {
        if self.dimensions.get(id) == Some(&dimensions) {
            return false;
        }
        tracing::trace!(
            node = id,
            width = dimensions.width,
            height = dimensions.height,
            "node dimensions changed"
        );
        self.dimensions.insert(id.to_string(), dimensions);
        self.frames.request();
        true
    }

    pub fn dimensions(&self, id: &str) -> Option<NodeDimensions> {
        self.dimensions.get(id).copied()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.frames.is_pending()
    }

    /// Runs the scheduled pass, if any
    pub fn run_frame(&mut self) -> Option<LayoutGraph> {
        self.frames.take()?;
        Some(self.build_layout())
    }

    /// Lays out the whole plan now, cancelling any scheduled pass
    pub fn build_layout(&mut self) -> LayoutGraph {
        self.frames.cancel();

        let Self {
            plan,
            highlight,
            config,
            dimensions,
            palette,
            rng,
            ..
        } = self;

        let mut writer = GraphWriter {
            palette,
            rng,
            highlight: *highlight,
            stats: &plan.stats,
            graph: LayoutGraph::default(),
        };

        let root = &plan.content.plan;
        let positions = place_levels(root, dimensions, config);
        writer.add_subtree(root, None, &positions);

        for (index, cte) in plan.ctes.iter().enumerate() {
            let mut positions = place_levels(cte, dimensions, config);
            let anchor = config.cte_anchor(index);
            if let Some(origin) = positions.get(&cte.node_id).copied() {
                let (dx, dy) = (anchor.x - origin.x, anchor.y - origin.y);
                for position in positions.values_mut() {
                    position.x += dx;
                    position.y += dy;
                }
            }
            writer.add_subtree(cte, None, &positions);
        }

        let graph = writer.graph;
        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "layout pass complete"
        );
        graph
    }
}

/// Buckets a tree by depth, keeping source order within each level
fn levels(root: &PlanNode) -> Vec<Vec<&PlanNode>> {
    fn visit<'a>(node: &'a PlanNode, depth: usize, levels: &mut Vec<Vec<&'a PlanNode>>) {
        if levels.len() <= depth {
            levels.push(Vec::new());
        }
        levels[depth].push(node);
        for child in &node.children {
            visit(child, depth + 1, levels);
        }
    }

    let mut levels = Vec::new();
    visit(root, 0, &mut levels);
    levels
}

fn place_levels(
    root: &PlanNode,
    dimensions: &HashMap<String, NodeDimensions>,
    config: &LayoutConfig,
) -> HashMap<u32, Position> {
    let mut positions = HashMap::new();
    let mut y = 0.0;

    for level in levels(root) {
        let sizes: Vec<NodeDimensions> = level
            .iter()
            .map(|node| {
                dimensions
                    .get(&node_key(node.node_id))
                    .copied()
                    .unwrap_or(NodeDimensions::ZERO)
            })
            .collect();

        let total_width: f64 = sizes.iter().map(|size| size.width).sum();
        let gaps = level.len().saturating_sub(1) as f64 * config.horizontal_gap;
        let max_height = sizes.iter().map(|size| size.height).fold(0.0, f64::max);

        let mut x = -(total_width + gaps) / 2.0;
        for (node, size) in level.iter().zip(&sizes) {
            positions.insert(node.node_id, Position { x, y });
            x += size.width + config.horizontal_gap;
        }
        y += max_height + config.vertical_gap;
    }

    positions
}

struct GraphWriter<'a, R> {
    palette: &'a mut EdgePalette,
    rng: &'a mut R,
    highlight: HighlightType,
    stats: &'a PlanStats,
    graph: LayoutGraph,
}

impl<R: Rng> GraphWriter<'_, R> {
    /// Emits a node, the edge from its parent and then its subtree
    fn add_subtree(
        &mut self,
        node: &PlanNode,
        parent: Option<u32>,
        positions: &HashMap<u32, Position>,
    ) {
        self.graph.nodes.push(LayoutNode {
            id: node_key(node.node_id),
            node_id: node.node_id,
            position: positions.get(&node.node_id).copied().unwrap_or_default(),
            data: NodeRenderData::new(node, self.highlight, self.stats),
        });

        if let Some(parent) = parent {
            self.graph.edges.push(LayoutEdge {
                id: edge_key(parent, node.node_id),
                source: node_key(parent),
                target: node_key(node.node_id),
                color: self.palette.color_for(parent, node.node_id, &mut *self.rng),
                stroke_width: stroke_width(node.stats.revised.actual_rows, self.stats.max_rows),
            });
        }

        for child in &node.children {
            self.add_subtree(child, Some(node.node_id), positions);
        }
    }
}

#[cfg(test)]
mod tests;
