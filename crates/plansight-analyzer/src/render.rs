//! Render data attached to every laid out node
//!
//! Everything a node box needs to draw itself: the annotated node, the
//! active highlight dimension with the plan maxima it is scaled against,
//! the display name and the highlight bar.

use crate::explain::{Plan, PlanNode, PlanStats};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Metric that drives the highlight bar on each node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightType {
    None,
    #[default]
    Duration,
    Rows,
    Cost,
}

impl HighlightType {
    pub const ALL: [HighlightType; 4] = [Self::None, Self::Duration, Self::Rows, Self::Cost];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Duration => "duration",
            Self::Rows => "rows",
            Self::Cost => "cost",
        }
    }

    /// Returns true if the plan has the data this highlight needs.
    /// Durations need an ANALYZE run; rows need actual rows on the root.
    pub fn is_available(&self, plan: &Plan) -> bool {
        match self {
            Self::None | Self::Cost => true,
            Self::Duration => plan.is_analyze,
            Self::Rows => plan
                .content
                .plan
                .actual_rows
                .is_some_and(|rows| rows != 0.0),
        }
    }

    /// Every highlight type with its availability for `plan`
    pub fn availability(plan: &Plan) -> Vec<(HighlightType, bool)> {
        Self::ALL
            .into_iter()
            .map(|kind| (kind, kind.is_available(plan)))
            .collect()
    }
}

impl fmt::Display for HighlightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown highlight type {0:?} (expected none, duration, rows or cost)")]
pub struct ParseHighlightError(String);

impl FromStr for HighlightType {
    type Err = ParseHighlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseHighlightError(s.to_string()))
    }
}

/// Filled bar shown under a node for the active highlight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightBar {
    /// Share of the plan maximum, rounded to a whole percent
    pub percent: f64,
    /// Formatted metric value
    pub label: String,
    /// `rgb(..)` colour from green (0%) to red (100%)
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRenderData {
    /// The node without its children
    pub node: PlanNode,
    pub highlight: HighlightType,
    pub max_duration: Option<f64>,
    pub max_rows: Option<f64>,
    pub max_cost: Option<f64>,
    pub display_name: String,
    pub highlight_bar: Option<HighlightBar>,
}

impl NodeRenderData {
    pub fn new(node: &PlanNode, highlight: HighlightType, stats: &PlanStats) -> Self {
        Self {
            node: node.detached(),
            highlight,
            max_duration: stats.max_duration,
            max_rows: stats.max_rows,
            max_cost: stats.max_cost,
            display_name: display_name(node),
            highlight_bar: highlight_bar(node, highlight, stats),
        }
    }
}

/// `[Parallel ][<partial mode> ]<node type>[ <scan direction>]`, where a
/// forward scan direction is left out
pub fn display_name(node: &PlanNode) -> String {
    let mut name = String::new();
    if node.parallel_aware == Some(true) {
        name.push_str("Parallel ");
    }
    if let Some(mode) = node.partial_mode.as_deref().filter(|m| !m.is_empty()) {
        name.push_str(mode);
        name.push(' ');
    }
    name.push_str(&node.node_type);
    if let Some(direction) = node
        .scan_direction
        .as_deref()
        .filter(|d| !d.is_empty() && *d != "Forward")
    {
        name.push(' ');
        name.push_str(direction);
    }
    name
}

fn highlight_bar(
    node: &PlanNode,
    highlight: HighlightType,
    stats: &PlanStats,
) -> Option<HighlightBar> {
    let (value, max, format): (Option<f64>, Option<f64>, fn(Option<f64>) -> String) =
        match highlight {
            HighlightType::None => return None,
            HighlightType::Duration => (
                node.stats.exclusive_duration,
                stats.max_duration,
                format_duration,
            ),
            HighlightType::Rows => (node.stats.revised.actual_rows, stats.max_rows, format_rows),
            HighlightType::Cost => (node.stats.exclusive_cost, stats.max_cost, format_cost),
        };
    let value = value?;
    let max = max.filter(|max| *max != 0.0)?;

    let percent = (value / max * 100.0).round();
    let percent = if percent.is_finite() { percent } else { 0.0 };

    Some(HighlightBar {
        percent,
        label: format(Some(value)),
        color: number_to_color_hsl(percent),
    })
}

const NOT_AVAILABLE: &str = "N/A";

/// Formats milliseconds as `0.123 ms`, `12.34 ms` or `1.50 s`
pub fn format_duration(ms: Option<f64>) -> String {
    match ms.filter(|ms| !ms.is_nan()) {
        None => NOT_AVAILABLE.to_string(),
        Some(ms) if ms < 1.0 => format!("{ms:.3} ms"),
        Some(ms) if ms < 1000.0 => format!("{ms:.2} ms"),
        Some(ms) => format!("{:.2} s", ms / 1000.0),
    }
}

/// Formats a row count as `999`, `1.5K`, `2.0M` or `3.1B`
pub fn format_rows(rows: Option<f64>) -> String {
    match rows.filter(|rows| !rows.is_nan()) {
        None => NOT_AVAILABLE.to_string(),
        Some(rows) if rows < 1e3 => format!("{rows:.0}"),
        Some(rows) if rows < 1e6 => format!("{:.1}K", rows / 1e3),
        Some(rows) if rows < 1e9 => format!("{:.1}M", rows / 1e6),
        Some(rows) => format!("{:.1}B", rows / 1e9),
    }
}

/// Formats a planner cost as `12.50`, `1.5K` or `2.0M`
pub fn format_cost(cost: Option<f64>) -> String {
    match cost.filter(|cost| !cost.is_nan()) {
        None => NOT_AVAILABLE.to_string(),
        Some(cost) if cost < 1e3 => format!("{cost:.2}"),
        Some(cost) if cost < 1e6 => format!("{:.1}K", cost / 1e3),
        Some(cost) => format!("{:.1}M", cost / 1e6),
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value.filter(|value| !value.is_nan()) {
        None => NOT_AVAILABLE.to_string(),
        Some(value) => format!("{value:.1}%"),
    }
}

/// Maps 0..=100 onto a colour from green (0) to red (100)
pub fn number_to_color_hsl(value: f64) -> String {
    let hue = (100.0 - value) * 1.2 / 360.0;
    let [r, g, b] = hsl_to_rgb(hue, 0.9, 0.4);
    format!("rgb({r},{g},{b})")
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [u8; 3] {
    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_rgb(p, q, h + 1.0 / 3.0),
            hue_to_rgb(p, q, h),
            hue_to_rgb(p, q, h - 1.0 / 3.0),
        )
    };

    [r, g, b].map(|channel| (channel * 255.0).floor().clamp(0.0, 255.0) as u8)
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests;
