//! Plan Builder - turns EXPLAIN output into an annotated query plan
//!
//! A build is a single synchronous pass over the raw tree:
//! - node ids are assigned in pre-order starting at 1
//! - planner estimate errors are computed on the way down
//! - CTE bodies are hoisted into [`Plan::ctes`] and timings, costs and buffer
//!   counters are made exclusive on the way back up
//! - finally the main tree and every CTE tree are flattened once to find the
//!   maxima the renderer scales against

use crate::explain::error::{PlanParseError, Result};
use crate::explain::node::{BufferKind, EstimateDirection, PlanNode, RowCounter};
use crate::explain::text::parse_text_plan;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of every [`Plan::id`]
pub const PLAN_TAG: &str = "plan_";

/// Raw content of one EXPLAIN run plus the maxima computed over it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanContent {
    /// Root node of the main plan tree
    pub plan: PlanNode,
    /// Execution time in milliseconds (EXPLAIN ANALYZE)
    pub execution_time: Option<f64>,
    /// Execution time as reported by servers older than 9.4
    pub total_runtime: Option<f64>,
    /// Planning time in milliseconds
    pub planning_time: Option<f64>,
    pub query_text: Option<String>,
    pub max_rows: Option<f64>,
    pub max_cost: Option<f64>,
    pub max_total_cost: Option<f64>,
    pub max_duration: Option<f64>,
    pub max_estimate_factor: Option<f64>,
    /// Top-level keys such as "Triggers" or "JIT", in input order
    pub extra: IndexMap<String, Value>,
}

impl PlanContent {
    /// Creates content around an already parsed root node
    pub fn new(plan: PlanNode) -> Self {
        Self {
            plan,
            ..Self::default()
        }
    }

    /// Reads content from the JSON EXPLAIN document.
    ///
    /// PostgreSQL wraps the plan in a one-element array; a bare object is
    /// accepted as well.
    pub fn from_json(value: &Value) -> Result<Self> {
        let value = match value {
            Value::Array(items) => items.first().ok_or(PlanParseError::MissingPlan)?,
            other => other,
        };
        let object = value.as_object().ok_or(PlanParseError::MissingPlan)?;
        let plan = object
            .get("Plan")
            .and_then(Value::as_object)
            .ok_or(PlanParseError::MissingPlan)?;

        let mut content = Self::new(PlanNode::from_json(plan)?);
        for (key, value) in object {
            match key.as_str() {
                "Plan" => {}
                "Execution Time" => content.execution_time = number(key, value)?,
                "Total Runtime" => content.total_runtime = number(key, value)?,
                "Planning Time" => content.planning_time = number(key, value)?,
                "Query Text" => {
                    content.query_text = value.as_str().map(String::from);
                }
                _ => {
                    content.extra.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(content)
    }
}

fn number(key: &str, value: &Value) -> Result<Option<f64>> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_f64()
        .map(Some)
        .ok_or_else(|| PlanParseError::InvalidProperty {
            property: key.to_string(),
            expected: "a number",
        })
}

/// Run-level figures shown next to the plan and used for per-node scaling.
///
/// Zero or missing values are reported as `None`, so consumers never
/// divide by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStats {
    pub execution_time: Option<f64>,
    pub planning_time: Option<f64>,
    pub max_rows: Option<f64>,
    pub max_cost: Option<f64>,
    pub max_duration: Option<f64>,
    pub max_estimate_factor: f64,
}

impl PlanStats {
    fn from_content(content: &PlanContent) -> Self {
        Self {
            execution_time: nonzero(content.execution_time).or(nonzero(content.total_runtime)),
            planning_time: nonzero(content.planning_time),
            max_rows: nonzero(content.max_rows),
            max_cost: nonzero(content.max_cost),
            max_duration: nonzero(content.max_duration),
            max_estimate_factor: content.max_estimate_factor.unwrap_or(1.0),
        }
    }
}

fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

/// The annotated result of one EXPLAIN analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    /// Query text with interior whitespace runs collapsed
    pub query: String,
    pub created_on: DateTime<Utc>,
    pub content: PlanContent,
    pub stats: PlanStats,
    /// CTE bodies hoisted out of the main tree, in encounter order
    pub ctes: Vec<PlanNode>,
    /// True when the plan carries actual row counts (EXPLAIN ANALYZE)
    pub is_analyze: bool,
}

impl Plan {
    /// Returns every node of the main tree followed by every CTE tree
    pub fn all_nodes(&self) -> impl Iterator<Item = &PlanNode> {
        self.content
            .plan
            .iter()
            .chain(self.ctes.iter().flat_map(PlanNode::iter))
    }

    /// Finds a node by id in the main tree or any CTE tree
    pub fn node(&self, node_id: u32) -> Option<&PlanNode> {
        self.all_nodes().find(|node| node.node_id == node_id)
    }

    pub fn node_count(&self) -> usize {
        self.all_nodes().count()
    }
}

/// Builds [`Plan`]s from EXPLAIN output
#[derive(Debug)]
pub struct PlanBuilder {
    next_node_id: u32,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self { next_node_id: 1 }
    }

    /// Parses JSON EXPLAIN output into plan content
    pub fn from_source(&self, source: &str) -> Result<PlanContent> {
        let value: Value = serde_json::from_str(source).inspect_err(|err| {
            tracing::warn!(error = %err, "failed to parse plan JSON");
        })?;
        PlanContent::from_json(&value).inspect_err(|err| {
            tracing::warn!(error = %err, "invalid plan document");
        })
    }

    /// Parses text-format EXPLAIN output into plan content
    pub fn from_text_source(&self, source: &str) -> Result<PlanContent> {
        parse_text_plan(source).inspect_err(|err| {
            tracing::warn!(error = %err, "failed to parse text plan");
        })
    }

    /// Returns true if the node is a CTE body that belongs in [`Plan::ctes`]
    pub fn is_cte(node: &PlanNode) -> bool {
        node.is_cte()
    }

    /// Annotates the content and wraps it into a [`Plan`]
    pub fn create_plan(&mut self, name: &str, mut content: PlanContent, query: &str) -> Plan {
        let created_on = Utc::now();
        let is_analyze = content.plan.actual_rows.is_some();

        self.next_node_id = 1;
        let mut cte_slots = Vec::new();
        self.process_node(&mut content.plan, &mut cte_slots);
        let ctes: Vec<PlanNode> = cte_slots.into_iter().flatten().collect();

        let maxima = Maxima::collect(content.plan.iter().chain(ctes.iter().flat_map(PlanNode::iter)));
        maxima.apply(&mut content);
        let stats = PlanStats::from_content(&content);

        let name = if name.is_empty() {
            format!("plan created on {}", created_on.format("%a %b %d %Y"))
        } else {
            name.to_string()
        };

        tracing::debug!(
            nodes = self.next_node_id - 1,
            ctes = ctes.len(),
            is_analyze,
            "built query plan"
        );

        Plan {
            id: format!("{PLAN_TAG}{}", created_on.timestamp_millis()),
            name,
            query: normalize_query(query),
            created_on,
            content,
            stats,
            ctes,
            is_analyze,
        }
    }

    /// Numbers and annotates one subtree.
    ///
    /// CTE children reserve their slot in `ctes` before being visited, so
    /// nested CTEs keep pre-order encounter order.
    fn process_node(&mut self, node: &mut PlanNode, ctes: &mut Vec<Option<PlanNode>>) {
        node.node_id = self.next_node_id;
        self.next_node_id += 1;
        calculate_planner_estimate(node);

        let workers_planned = node
            .workers_planned
            .filter(|w| *w != 0.0)
            .or(node.stats.workers_planned_by_gather);
        let workers_launched = node
            .workers_launched
            .filter(|w| *w != 0.0)
            .or(node.stats.workers_launched_by_gather);

        let mut reserved = Vec::new();
        for child in node.children.iter_mut() {
            let is_cte = child.is_cte();
            let runs_once = matches!(
                child.parent_relationship.as_deref(),
                Some("InitPlan") | Some("SubPlan")
            );
            if !is_cte && !runs_once {
                child.stats.workers_planned_by_gather = workers_planned;
                child.stats.workers_launched_by_gather = workers_launched;
            }
            if is_cte {
                reserved.push(ctes.len());
                ctes.push(None);
            }
            self.process_node(child, ctes);
        }

        if !reserved.is_empty() {
            let mut slots = reserved.into_iter();
            for child in std::mem::take(&mut node.children) {
                if child.is_cte()
                    && let Some(slot) = slots.next()
                {
                    ctes[slot] = Some(child);
                } else {
                    node.children.push(child);
                }
            }
        }

        calculate_actuals(node);
        calculate_exclusives(node);
    }
}

/// Parses JSON EXPLAIN output and builds the plan the visualizer shows
pub fn build_plan(source: &str) -> Result<Plan> {
    let mut builder = PlanBuilder::new();
    let content = builder.from_source(source)?;
    Ok(builder.create_plan("Query Plan", content, ""))
}

fn calculate_planner_estimate(node: &mut PlanNode) {
    let (Some(actual), Some(planned)) = (node.actual_rows, node.plan_rows) else {
        return;
    };

    let (factor, direction) = if actual > planned {
        (actual / planned, EstimateDirection::Under)
    } else if actual < planned {
        (planned / actual, EstimateDirection::Over)
    } else {
        (1.0, EstimateDirection::None)
    };

    node.stats.estimate_factor = Some(factor);
    node.stats.estimate_direction = Some(direction);
}

fn calculate_actuals(node: &mut PlanNode) {
    if let Some(total_time) = node.actual_total_time {
        let workers = node.stats.workers_planned_by_gather.unwrap_or(0.0) + 1.0;
        let loops = node.actual_loops.unwrap_or(1.0);
        let total_time = total_time * loops / workers;
        node.actual_total_time = Some(total_time);
        node.actual_startup_time = node
            .actual_startup_time
            .map(|startup| startup * loops / workers);

        let is_result = node.node_type == "Result";
        let children_time: f64 = node
            .children
            .iter()
            .filter(|child| is_result || child.parent_relationship.as_deref() != Some("InitPlan"))
            .filter_map(|child| child.actual_total_time)
            .sum();
        node.stats.exclusive_duration = Some((total_time - children_time).max(0.0));
    }

    if let Some(total_cost) = node.total_cost {
        let children_cost: f64 = node.children.iter().filter_map(|child| child.total_cost).sum();
        node.stats.exclusive_cost = Some((total_cost - children_cost).max(0.0));
    }

    let loops = node.actual_loops.filter(|l| *l != 0.0).unwrap_or(1.0);
    for counter in RowCounter::ALL {
        if let Some(raw) = node.number(counter.prop()) {
            node.stats.revised.set(counter, raw * loops);
        }
    }
}

fn calculate_exclusives(node: &mut PlanNode) {
    for kind in BufferKind::ALL {
        let Some(own) = node.buffers.get(kind) else {
            continue;
        };
        let children: f64 = node
            .children
            .iter()
            .filter(|child| child.subplan_name.as_deref().is_none_or(str::is_empty))
            .filter_map(|child| child.buffers.get(kind))
            .sum();
        *node.stats.exclusive_buffers.slot_mut(kind) = Some(round3(own - round3(children)));
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Maxima over every node of a plan
#[derive(Debug, Default)]
struct Maxima {
    rows: Option<f64>,
    cost: Option<f64>,
    total_cost: Option<f64>,
    duration: Option<f64>,
    estimate_factor: Option<f64>,
}

impl Maxima {
    fn collect<'a>(nodes: impl Iterator<Item = &'a PlanNode>) -> Self {
        nodes.fold(Self::default(), |acc, node| Self {
            rows: max(acc.rows, node.stats.revised.actual_rows),
            cost: max(acc.cost, node.stats.exclusive_cost),
            total_cost: max(acc.total_cost, node.total_cost),
            duration: max(acc.duration, node.stats.exclusive_duration),
            estimate_factor: max(
                acc.estimate_factor,
                node.stats.estimate_factor.filter(|f| f.is_finite()),
            ),
        })
    }

    fn apply(self, content: &mut PlanContent) {
        content.max_rows = self.rows;
        content.max_cost = self.cost;
        content.max_total_cost = self.total_cost;
        content.max_duration = self.duration;
        let factor = self.estimate_factor.map(|f| f * 2.0);
        content.max_estimate_factor = Some(nonzero(factor).unwrap_or(1.0));
    }
}

fn max(current: Option<f64>, candidate: Option<f64>) -> Option<f64> {
    match (current, candidate.filter(|v| !v.is_nan())) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Collapses interior whitespace runs of two or more characters to a single
/// space. Runs that reach the end of the text or start with a line break are
/// kept as they are.
pub fn normalize_query(query: &str) -> String {
    let chars: Vec<char> = query.chars().collect();
    let mut normalized = String::with_capacity(query.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        normalized.push(c);
        i += 1;
        if c.is_whitespace() {
            continue;
        }

        let run_end = chars[i..]
            .iter()
            .position(|c| !c.is_whitespace())
            .map(|offset| i + offset);
        if let Some(end) = run_end
            && end - i >= 2
            && !is_line_break(chars[i])
        {
            normalized.push(' ');
            i = end;
        }
    }

    normalized
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}
