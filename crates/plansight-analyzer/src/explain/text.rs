//! Text-format EXPLAIN reader
//!
//! Reads the default PostgreSQL text output of `EXPLAIN ANALYZE` into the same
//! [`PlanNode`] model the JSON reader produces, so both go through the same
//! plan builder. Node lines carry their details inside the type label
//! (`Seq Scan on users u`), which is split by the label grammar.
//!
//! MySQL `EXPLAIN ANALYZE` tree output shares the `->` layout and cost
//! groups, so it is read structurally, but its labels follow a different
//! vocabulary and are kept verbatim as the node type.
//!
//! ```text
//! Hash Join  (cost=1.09..2.19 rows=4 width=64) (actual time=0.040..0.045 rows=4 loops=1)
//!   Hash Cond: (o.user_id = u.id)
//!   ->  Seq Scan on orders o  (cost=0.00..1.04 rows=4 width=32) (actual time=0.01..0.01 rows=4 loops=1)
//!   ->  Hash  (cost=1.04..1.04 rows=4 width=32) (actual time=0.02..0.02 rows=4 loops=1)
//! Planning Time: 0.123 ms
//! Execution Time: 0.456 ms
//! ```

use crate::explain::error::{PlanParseError, Result};
use crate::explain::node::{BufferKind, NodeProp, PlanNode, PropKind};
use crate::explain::plan::PlanContent;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static COST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\(cost=(?P<startup>\d+(?:\.\d+)?)(?:\.\.(?P<total>\d+(?:\.\d+)?))?\s+rows=(?P<rows>\d+(?:\.\d+)?)(?:\s+width=(?P<width>\d+))?\)",
    )
    .expect("valid regex")
});

static ACTUAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\(actual\s+(?:time=(?P<startup>\d+(?:\.\d+)?)\.\.(?P<total>\d+(?:\.\d+)?)\s+)?rows=(?P<rows>\d+(?:\.\d+)?)\s+loops=(?P<loops>\d+)\)",
    )
    .expect("valid regex")
});

static TIMING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>Planning [Tt]ime|Execution [Tt]ime|Total runtime):\s*(?P<ms>[\d.]+)\s*ms")
        .expect("valid regex")
});

static SUBPLAN_HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>InitPlan|SubPlan|CTE)\s+\S+").expect("valid regex")
});

static PSQL_FOOTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d+ rows?\)$").expect("valid regex"));

/// Markers that end the label part of a node line
const LABEL_TERMINATORS: [&str; 3] = [" (cost=", " (actual", " (never executed)"];

/// A node whose children are still being read
struct Frame {
    indent: usize,
    node: PlanNode,
}

/// An `InitPlan`/`SubPlan`/`CTE` line announcing the node below it
struct SubplanHeader {
    indent: usize,
    relationship: &'static str,
    name: String,
}

/// Parses text-format EXPLAIN output into plan content
pub fn parse_text_plan(text: &str) -> Result<PlanContent> {
    if text.trim().is_empty() {
        return Err(PlanParseError::EmptyInput);
    }

    let mut stack: Vec<Frame> = Vec::new();
    let mut header: Option<SubplanHeader> = None;
    let mut root_indent = 0;
    let mut in_trailer = false;
    let mut trailer = PlanContent::default();

    for line in text.lines() {
        let content = line.trim();
        if is_decoration(content) {
            continue;
        }
        let indent = count_indent(line);

        if let Some(caps) = TIMING_REGEX.captures(content) {
            let ms = caps["ms"].parse::<f64>().ok();
            match &caps["kind"] {
                "Total runtime" => trailer.total_runtime = ms,
                kind if kind.starts_with("Planning") => trailer.planning_time = ms,
                _ => trailer.execution_time = ms,
            }
            continue;
        }

        if stack.is_empty() {
            root_indent = indent;
        }
        let label = match content.strip_prefix("->") {
            Some(rest) => Some(rest.trim()),
            None if stack.is_empty() => Some(content),
            None => None,
        };

        if let Some(label) = label {
            if in_trailer {
                tracing::trace!(line = content, "ignoring node line after plan trailer");
                continue;
            }
            let mut node = parse_node_line(label);
            // A header closes the siblings printed before it, so its body
            // attaches to the node that owns the header.
            let mut close_from = indent;
            if let Some(pending) = header.take_if(|h| indent > h.indent) {
                close_from = pending.indent;
                node.parent_relationship
                    .get_or_insert_with(|| pending.relationship.to_string());
                node.subplan_name.get_or_insert(pending.name);
            }
            header = None;
            close_frames(&mut stack, close_from);
            stack.push(Frame { indent, node });
            continue;
        }

        if indent <= root_indent {
            in_trailer = true;
        }

        if in_trailer {
            if let Some((key, value)) = content.split_once(':') {
                trailer
                    .extra
                    .insert(key.trim().to_string(), Value::String(value.trim().to_string()));
            }
            continue;
        }

        if let Some(caps) = SUBPLAN_HEADER_REGEX.captures(content) {
            let relationship = match &caps["kind"] {
                "SubPlan" => "SubPlan",
                _ => "InitPlan",
            };
            header = Some(SubplanHeader {
                indent,
                relationship,
                name: content.to_string(),
            });
            continue;
        }

        if let Some(frame) = stack.last_mut() {
            apply_detail(&mut frame.node, content);
        }
    }

    close_frames(&mut stack, 0);
    let root = stack.pop().ok_or(PlanParseError::NoPlanNodes)?;

    Ok(PlanContent {
        plan: root.node,
        ..trailer
    })
}

/// Pops every open frame at or below `indent` into its parent.
/// The root frame always stays open.
fn close_frames(stack: &mut Vec<Frame>, indent: usize) {
    while stack.len() > 1 && stack.last().is_some_and(|frame| frame.indent >= indent) {
        if let Some(frame) = stack.pop()
            && let Some(parent) = stack.last_mut()
        {
            parent.node.children.push(frame.node);
        }
    }
}

fn is_decoration(content: &str) -> bool {
    content.is_empty()
        || content == "QUERY PLAN"
        || content.chars().all(|c| c == '-' || c == '+')
        || PSQL_FOOTER_REGEX.is_match(content)
}

fn count_indent(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Parses `"<label>  (cost=..) (actual ..)"` into a node
fn parse_node_line(line: &str) -> PlanNode {
    let label_end = LABEL_TERMINATORS
        .iter()
        .filter_map(|marker| line.find(marker))
        .min()
        .unwrap_or(line.len());
    let mut node = PlanNode::from_label(line[..label_end].trim());
    let measures = &line[label_end..];

    if let Some(caps) = COST_REGEX.captures(measures) {
        let first = parse_number(&caps["startup"]);
        match caps.name("total") {
            Some(total) => {
                node.startup_cost = first;
                node.total_cost = parse_number(total.as_str());
            }
            // Single-value costs only carry the total
            None => node.total_cost = first,
        }
        node.plan_rows = parse_number(&caps["rows"]);
        node.plan_width = caps.name("width").and_then(|w| parse_number(w.as_str()));
    }

    if let Some(caps) = ACTUAL_REGEX.captures(measures) {
        node.actual_startup_time = caps.name("startup").and_then(|m| parse_number(m.as_str()));
        node.actual_total_time = caps.name("total").and_then(|m| parse_number(m.as_str()));
        node.actual_rows = parse_number(&caps["rows"]);
        node.actual_loops = parse_number(&caps["loops"]);
    } else if measures.contains("(never executed)") {
        node.actual_startup_time = Some(0.0);
        node.actual_total_time = Some(0.0);
        node.actual_rows = Some(0.0);
        node.actual_loops = Some(0.0);
    }

    node
}

/// Applies a `Key: value` detail line to a node
fn apply_detail(node: &mut PlanNode, line: &str) {
    let Some((key, value)) = line.split_once(": ") else {
        tracing::trace!(line, "skipping detail line without a value");
        return;
    };
    let value = value.trim();

    match key {
        "Buffers" => apply_buffers(node, value),
        "Sort Method" => apply_sort_method(node, value),
        _ => match NodeProp::from_key(key) {
            Some(prop) => apply_prop(node, prop, key, value),
            None => {
                node.extra
                    .insert(key.to_string(), Value::String(value.to_string()));
            }
        },
    }
}

fn apply_prop(node: &mut PlanNode, prop: NodeProp, key: &str, value: &str) {
    match prop.kind() {
        PropKind::Text => node.set_text(prop, value.to_string()),
        PropKind::Number => match parse_number(value) {
            Some(number) => {
                if let Some(slot) = node.number_slot(prop) {
                    *slot = Some(number);
                }
            }
            None => {
                node.extra
                    .insert(key.to_string(), Value::String(value.to_string()));
            }
        },
        PropKind::Bool => node.parallel_aware = Some(value == "true"),
        PropKind::TextList => {
            if let Some(slot) = node.list_slot(prop) {
                *slot = value.split(", ").map(String::from).collect();
            }
        }
    }
}

/// `shared hit=4 read=2, temp read=1 written=1`
fn apply_buffers(node: &mut PlanNode, value: &str) {
    for group in value.split(", ") {
        let mut tokens = group.split_whitespace();
        let Some(scope) = tokens.next() else {
            continue;
        };
        for token in tokens {
            let Some((counter, count)) = token.split_once('=') else {
                continue;
            };
            if let Some(kind) = BufferKind::from_text(scope, counter) {
                *node.buffers.slot_mut(kind) = parse_number(count);
            }
        }
    }
}

/// `quicksort  Memory: 25kB`
fn apply_sort_method(node: &mut PlanNode, value: &str) {
    let (method, space) = match value.split_once("  ") {
        Some((method, space)) => (method.trim(), Some(space.trim())),
        None => (value, None),
    };
    node.sort_method = Some(method.to_string());

    if let Some((space_type, amount)) = space.and_then(|s| s.split_once(": ")) {
        node.sort_space_used = parse_number(amount);
        node.extra.insert(
            "Sort Space Type".to_string(),
            Value::String(space_type.to_string()),
        );
    }
}

/// Parses a number, ignoring a trailing unit such as `kB` or `ms`
fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .trim()
        .parse()
        .ok()
}
