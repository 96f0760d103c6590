//! Edge styling: stroke width from row flow and stable colour assignment

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};

/// Palette edges are coloured from
pub const EDGE_COLORS: [&str; 12] = [
    "#3b82f6", // blue
    "#10b981", // green
    "#8b5cf6", // purple
    "#f59e0b", // amber
    "#ef4444", // red
    "#06b6d4", // cyan
    "#ec4899", // pink
    "#f97316", // orange
    "#14b8a6", // teal
    "#a855f7", // violet
    "#84cc16", // lime
    "#6366f1", // indigo
];

pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;
pub const MIN_STROKE_WIDTH: f64 = 1.0;
pub const MAX_STROKE_WIDTH: f64 = 8.0;

/// Width of the edge into a child, scaled by the share of the plan's
/// largest row count the child produces
pub fn stroke_width(child_rows: Option<f64>, max_rows: Option<f64>) -> f64 {
    match (child_rows, max_rows) {
        (Some(rows), Some(max)) if max > 0.0 && !rows.is_nan() => {
            let ratio = rows / max;
            (MIN_STROKE_WIDTH + ratio * (MAX_STROKE_WIDTH - MIN_STROKE_WIDTH))
                .clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH)
        }
        _ => DEFAULT_STROKE_WIDTH,
    }
}

/// Remembers the colour of every parent/child edge and the colours already
/// touching each node.
///
/// A new edge gets a random colour unused at both endpoints; once the
/// palette is exhausted at an endpoint any colour may be picked. An edge
/// keeps its colour until [`EdgePalette::clear`].
#[derive(Debug, Default, Clone)]
pub struct EdgePalette {
    edge_colors: HashMap<(u32, u32), &'static str>,
    node_colors: HashMap<u32, HashSet<&'static str>>,
}

impl EdgePalette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color_for<R: Rng + ?Sized>(
        &mut self,
        source: u32,
        target: u32,
        rng: &mut R,
    ) -> &'static str {
        if let Some(color) = self.assigned(source, target) {
            return color;
        }

        let used_at = |node: u32, color: &str| {
            self.node_colors
                .get(&node)
                .is_some_and(|colors| colors.contains(color))
        };
        let available: Vec<&'static str> = EDGE_COLORS
            .into_iter()
            .filter(|color| !used_at(source, color) && !used_at(target, color))
            .collect();

        let color = available
            .choose(rng)
            .copied()
            .or_else(|| EDGE_COLORS.choose(rng).copied())
            .unwrap_or(EDGE_COLORS[0]);

        self.edge_colors.insert((source, target), color);
        self.node_colors.entry(source).or_default().insert(color);
        self.node_colors.entry(target).or_default().insert(color);
        color
    }

    /// Returns the colour already assigned to an edge
    pub fn assigned(&self, source: u32, target: u32) -> Option<&'static str> {
        self.edge_colors.get(&(source, target)).copied()
    }

    pub fn len(&self) -> usize {
        self.edge_colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_colors.is_empty()
    }

    pub fn clear(&mut self) {
        self.edge_colors.clear();
        self.node_colors.clear();
    }
}
