//! Plan Node Model - one operation in an EXPLAIN tree
//!
//! Well-known EXPLAIN properties are stored as typed fields. The mapping from
//! the JSON key to the field lives in one place, [`NodeProp`], and is checked
//! when a node is read: a well-known key with the wrong JSON type is rejected
//! instead of being carried along. Keys that are not well known are kept
//! verbatim in [`PlanNode::extra`].

use crate::explain::error::{PlanParseError, Result};
use crate::explain::node_type::parse_node_label;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON key holding the child plans of a node
pub const PLANS_KEY: &str = "Plans";

/// Shape of the JSON value a [`NodeProp`] accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    Text,
    Number,
    Bool,
    /// Either a single string or an array of strings
    TextList,
}

/// Well-known EXPLAIN node properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeProp {
    NodeType,
    RelationName,
    Schema,
    Alias,
    IndexName,
    CteName,
    FunctionName,
    SubplanName,
    ParentRelationship,
    JoinType,
    ScanDirection,
    PartialMode,
    Filter,
    HashCondition,
    SortMethod,
    ParallelAware,
    StartupCost,
    TotalCost,
    PlanRows,
    PlanWidth,
    ActualRows,
    ActualLoops,
    ActualStartupTime,
    ActualTotalTime,
    RowsRemovedByFilter,
    RowsRemovedByJoinFilter,
    RowsRemovedByIndexRecheck,
    WorkersPlanned,
    WorkersLaunched,
    SortSpaceUsed,
    SortKey,
    GroupKey,
    Output,
    Buffer(BufferKind),
}

impl NodeProp {
    const SCALARS: [NodeProp; 33] = [
        Self::NodeType,
        Self::RelationName,
        Self::Schema,
        Self::Alias,
        Self::IndexName,
        Self::CteName,
        Self::FunctionName,
        Self::SubplanName,
        Self::ParentRelationship,
        Self::JoinType,
        Self::ScanDirection,
        Self::PartialMode,
        Self::Filter,
        Self::HashCondition,
        Self::SortMethod,
        Self::ParallelAware,
        Self::StartupCost,
        Self::TotalCost,
        Self::PlanRows,
        Self::PlanWidth,
        Self::ActualRows,
        Self::ActualLoops,
        Self::ActualStartupTime,
        Self::ActualTotalTime,
        Self::RowsRemovedByFilter,
        Self::RowsRemovedByJoinFilter,
        Self::RowsRemovedByIndexRecheck,
        Self::WorkersPlanned,
        Self::WorkersLaunched,
        Self::SortSpaceUsed,
        Self::SortKey,
        Self::GroupKey,
        Self::Output,
    ];

    /// Returns every well-known property
    pub fn all() -> impl Iterator<Item = NodeProp> {
        Self::SCALARS
            .into_iter()
            .chain(BufferKind::ALL.into_iter().map(Self::Buffer))
    }

    /// The key PostgreSQL uses for this property in JSON output
    pub fn key(&self) -> &'static str {
        match self {
            Self::NodeType => "Node Type",
            Self::RelationName => "Relation Name",
            Self::Schema => "Schema",
            Self::Alias => "Alias",
            Self::IndexName => "Index Name",
            Self::CteName => "CTE Name",
            Self::FunctionName => "Function Name",
            Self::SubplanName => "Subplan Name",
            Self::ParentRelationship => "Parent Relationship",
            Self::JoinType => "Join Type",
            Self::ScanDirection => "Scan Direction",
            Self::PartialMode => "Partial Mode",
            Self::Filter => "Filter",
            Self::HashCondition => "Hash Cond",
            Self::SortMethod => "Sort Method",
            Self::ParallelAware => "Parallel Aware",
            Self::StartupCost => "Startup Cost",
            Self::TotalCost => "Total Cost",
            Self::PlanRows => "Plan Rows",
            Self::PlanWidth => "Plan Width",
            Self::ActualRows => "Actual Rows",
            Self::ActualLoops => "Actual Loops",
            Self::ActualStartupTime => "Actual Startup Time",
            Self::ActualTotalTime => "Actual Total Time",
            Self::RowsRemovedByFilter => "Rows Removed by Filter",
            Self::RowsRemovedByJoinFilter => "Rows Removed by Join Filter",
            Self::RowsRemovedByIndexRecheck => "Rows Removed by Index Recheck",
            Self::WorkersPlanned => "Workers Planned",
            Self::WorkersLaunched => "Workers Launched",
            Self::SortSpaceUsed => "Sort Space Used",
            Self::SortKey => "Sort Key",
            Self::GroupKey => "Group Key",
            Self::Output => "Output",
            Self::Buffer(kind) => kind.key(),
        }
    }

    /// Looks up a property by its JSON key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().find(|prop| prop.key() == key)
    }

    pub fn kind(&self) -> PropKind {
        match self {
            Self::NodeType
            | Self::RelationName
            | Self::Schema
            | Self::Alias
            | Self::IndexName
            | Self::CteName
            | Self::FunctionName
            | Self::SubplanName
            | Self::ParentRelationship
            | Self::JoinType
            | Self::ScanDirection
            | Self::PartialMode
            | Self::Filter
            | Self::HashCondition
            | Self::SortMethod => PropKind::Text,
            Self::ParallelAware => PropKind::Bool,
            Self::SortKey | Self::GroupKey | Self::Output => PropKind::TextList,
            _ => PropKind::Number,
        }
    }
}

/// Buffer and temp-file block counters reported with `BUFFERS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferKind {
    SharedHit,
    SharedRead,
    SharedDirtied,
    SharedWritten,
    TempRead,
    TempWritten,
    LocalHit,
    LocalRead,
    LocalDirtied,
    LocalWritten,
}

impl BufferKind {
    pub const ALL: [BufferKind; 10] = [
        Self::SharedHit,
        Self::SharedRead,
        Self::SharedDirtied,
        Self::SharedWritten,
        Self::TempRead,
        Self::TempWritten,
        Self::LocalHit,
        Self::LocalRead,
        Self::LocalDirtied,
        Self::LocalWritten,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::SharedHit => "Shared Hit Blocks",
            Self::SharedRead => "Shared Read Blocks",
            Self::SharedDirtied => "Shared Dirtied Blocks",
            Self::SharedWritten => "Shared Written Blocks",
            Self::TempRead => "Temp Read Blocks",
            Self::TempWritten => "Temp Written Blocks",
            Self::LocalHit => "Local Hit Blocks",
            Self::LocalRead => "Local Read Blocks",
            Self::LocalDirtied => "Local Dirtied Blocks",
            Self::LocalWritten => "Local Written Blocks",
        }
    }

    /// Resolves a `Buffers:` text entry such as `shared` + `hit`
    pub fn from_text(scope: &str, counter: &str) -> Option<Self> {
        match (scope, counter) {
            ("shared", "hit") => Some(Self::SharedHit),
            ("shared", "read") => Some(Self::SharedRead),
            ("shared", "dirtied") => Some(Self::SharedDirtied),
            ("shared", "written") => Some(Self::SharedWritten),
            ("temp", "read") => Some(Self::TempRead),
            ("temp", "written") => Some(Self::TempWritten),
            ("local", "hit") => Some(Self::LocalHit),
            ("local", "read") => Some(Self::LocalRead),
            ("local", "dirtied") => Some(Self::LocalDirtied),
            ("local", "written") => Some(Self::LocalWritten),
            _ => None,
        }
    }
}

/// One value per [`BufferKind`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferCounters {
    pub shared_hit: Option<f64>,
    pub shared_read: Option<f64>,
    pub shared_dirtied: Option<f64>,
    pub shared_written: Option<f64>,
    pub temp_read: Option<f64>,
    pub temp_written: Option<f64>,
    pub local_hit: Option<f64>,
    pub local_read: Option<f64>,
    pub local_dirtied: Option<f64>,
    pub local_written: Option<f64>,
}

impl BufferCounters {
    pub fn get(&self, kind: BufferKind) -> Option<f64> {
        match kind {
            BufferKind::SharedHit => self.shared_hit,
            BufferKind::SharedRead => self.shared_read,
            BufferKind::SharedDirtied => self.shared_dirtied,
            BufferKind::SharedWritten => self.shared_written,
            BufferKind::TempRead => self.temp_read,
            BufferKind::TempWritten => self.temp_written,
            BufferKind::LocalHit => self.local_hit,
            BufferKind::LocalRead => self.local_read,
            BufferKind::LocalDirtied => self.local_dirtied,
            BufferKind::LocalWritten => self.local_written,
        }
    }

    pub fn slot_mut(&mut self, kind: BufferKind) -> &mut Option<f64> {
        match kind {
            BufferKind::SharedHit => &mut self.shared_hit,
            BufferKind::SharedRead => &mut self.shared_read,
            BufferKind::SharedDirtied => &mut self.shared_dirtied,
            BufferKind::SharedWritten => &mut self.shared_written,
            BufferKind::TempRead => &mut self.temp_read,
            BufferKind::TempWritten => &mut self.temp_written,
            BufferKind::LocalHit => &mut self.local_hit,
            BufferKind::LocalRead => &mut self.local_read,
            BufferKind::LocalDirtied => &mut self.local_dirtied,
            BufferKind::LocalWritten => &mut self.local_written,
        }
    }

    /// Returns true if any counter carries a non-zero value
    pub fn any_nonzero(&self) -> bool {
        BufferKind::ALL
            .iter()
            .any(|kind| self.get(*kind).is_some_and(|v| v != 0.0))
    }
}

/// Row counters that EXPLAIN reports per loop and that get a loop-adjusted total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowCounter {
    ActualRows,
    PlanRows,
    RowsRemovedByFilter,
    RowsRemovedByJoinFilter,
    RowsRemovedByIndexRecheck,
}

impl RowCounter {
    pub const ALL: [RowCounter; 5] = [
        Self::ActualRows,
        Self::PlanRows,
        Self::RowsRemovedByFilter,
        Self::RowsRemovedByJoinFilter,
        Self::RowsRemovedByIndexRecheck,
    ];

    pub fn prop(&self) -> NodeProp {
        match self {
            Self::ActualRows => NodeProp::ActualRows,
            Self::PlanRows => NodeProp::PlanRows,
            Self::RowsRemovedByFilter => NodeProp::RowsRemovedByFilter,
            Self::RowsRemovedByJoinFilter => NodeProp::RowsRemovedByJoinFilter,
            Self::RowsRemovedByIndexRecheck => NodeProp::RowsRemovedByIndexRecheck,
        }
    }
}

/// Loop-adjusted totals of the [`RowCounter`]s
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevisedRows {
    pub actual_rows: Option<f64>,
    pub plan_rows: Option<f64>,
    pub rows_removed_by_filter: Option<f64>,
    pub rows_removed_by_join_filter: Option<f64>,
    pub rows_removed_by_index_recheck: Option<f64>,
}

impl RevisedRows {
    pub fn get(&self, counter: RowCounter) -> Option<f64> {
        match counter {
            RowCounter::ActualRows => self.actual_rows,
            RowCounter::PlanRows => self.plan_rows,
            RowCounter::RowsRemovedByFilter => self.rows_removed_by_filter,
            RowCounter::RowsRemovedByJoinFilter => self.rows_removed_by_join_filter,
            RowCounter::RowsRemovedByIndexRecheck => self.rows_removed_by_index_recheck,
        }
    }

    pub fn set(&mut self, counter: RowCounter, value: f64) {
        let slot = match counter {
            RowCounter::ActualRows => &mut self.actual_rows,
            RowCounter::PlanRows => &mut self.plan_rows,
            RowCounter::RowsRemovedByFilter => &mut self.rows_removed_by_filter,
            RowCounter::RowsRemovedByJoinFilter => &mut self.rows_removed_by_join_filter,
            RowCounter::RowsRemovedByIndexRecheck => &mut self.rows_removed_by_index_recheck,
        };
        *slot = Some(value);
    }
}

/// Direction of the planner's row estimate error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateDirection {
    /// Estimate matched the actual row count
    None,
    /// More rows than estimated
    Under,
    /// Fewer rows than estimated
    Over,
}

/// Statistics derived while building a plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    /// Total cost minus the total cost of the direct children
    pub exclusive_cost: Option<f64>,
    /// Actual time minus the actual time of the direct children, in ms
    pub exclusive_duration: Option<f64>,
    pub revised: RevisedRows,
    pub estimate_factor: Option<f64>,
    pub estimate_direction: Option<EstimateDirection>,
    pub exclusive_buffers: BufferCounters,
    /// Workers planned by the closest Gather above this node
    pub workers_planned_by_gather: Option<f64>,
    /// Workers launched by the closest Gather above this node
    pub workers_launched_by_gather: Option<f64>,
}

/// A single node of an EXPLAIN plan tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    /// Pre-order position in the plan, starting at 1; 0 until the plan is built
    pub node_id: u32,
    pub node_type: String,
    pub relation_name: Option<String>,
    pub schema: Option<String>,
    pub alias: Option<String>,
    pub index_name: Option<String>,
    pub cte_name: Option<String>,
    pub function_name: Option<String>,
    pub subplan_name: Option<String>,
    pub parent_relationship: Option<String>,
    pub join_type: Option<String>,
    pub scan_direction: Option<String>,
    pub partial_mode: Option<String>,
    pub filter: Option<String>,
    pub hash_condition: Option<String>,
    pub sort_method: Option<String>,
    pub parallel_aware: Option<bool>,
    pub startup_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub plan_rows: Option<f64>,
    pub plan_width: Option<f64>,
    pub actual_rows: Option<f64>,
    pub actual_loops: Option<f64>,
    pub actual_startup_time: Option<f64>,
    pub actual_total_time: Option<f64>,
    pub rows_removed_by_filter: Option<f64>,
    pub rows_removed_by_join_filter: Option<f64>,
    pub rows_removed_by_index_recheck: Option<f64>,
    pub workers_planned: Option<f64>,
    pub workers_launched: Option<f64>,
    pub sort_space_used: Option<f64>,
    pub sort_key: Vec<String>,
    pub group_key: Vec<String>,
    pub output: Vec<String>,
    pub buffers: BufferCounters,
    pub stats: NodeStats,
    pub children: Vec<PlanNode>,
    /// Properties that are not well known, in input order
    pub extra: IndexMap<String, Value>,
}

impl PlanNode {
    /// Creates a node with the given type and no properties
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            ..Self::default()
        }
    }

    /// Creates a node from a textual type label such as
    /// `"Index Scan Backward using users_pkey on users u"`, extracting the
    /// details the label encodes.
    pub fn from_label(label: &str) -> Self {
        let mut node = Self::new(label);
        node.apply_label();
        node
    }

    /// Reads a node (and its children) from a JSON plan object
    pub fn from_json(object: &Map<String, Value>) -> Result<Self> {
        let mut node = Self::default();

        for (key, value) in object {
            if key == PLANS_KEY {
                let plans = value.as_array().ok_or_else(|| invalid(PLANS_KEY, "an array"))?;
                for child in plans {
                    let child = child
                        .as_object()
                        .ok_or_else(|| invalid(PLANS_KEY, "an array of objects"))?;
                    node.children.push(Self::from_json(child)?);
                }
            } else if let Some(prop) = NodeProp::from_key(key) {
                node.set_prop(prop, value)?;
            } else {
                node.extra.insert(key.clone(), value.clone());
            }
        }

        node.apply_label();
        Ok(node)
    }

    /// Assigns a well-known property from its JSON value.
    ///
    /// `null` leaves the property unset.
    pub fn set_prop(&mut self, prop: NodeProp, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }

        match prop.kind() {
            PropKind::Text => {
                let text = value
                    .as_str()
                    .ok_or_else(|| invalid(prop.key(), "a string"))?;
                self.set_text(prop, text.to_string());
            }
            PropKind::Number => {
                let number = value
                    .as_f64()
                    .ok_or_else(|| invalid(prop.key(), "a number"))?;
                if let Some(slot) = self.number_slot(prop) {
                    *slot = Some(number);
                }
            }
            PropKind::Bool => {
                let flag = value
                    .as_bool()
                    .ok_or_else(|| invalid(prop.key(), "a boolean"))?;
                self.parallel_aware = Some(flag);
            }
            PropKind::TextList => {
                let items = match value {
                    Value::String(s) => vec![s.clone()],
                    Value::Array(items) => items
                        .iter()
                        .map(|item| {
                            item.as_str()
                                .map(String::from)
                                .ok_or_else(|| invalid(prop.key(), "a list of strings"))
                        })
                        .collect::<Result<Vec<_>>>()?,
                    _ => return Err(invalid(prop.key(), "a string or a list of strings")),
                };
                if let Some(slot) = self.list_slot(prop) {
                    *slot = items;
                }
            }
        }

        Ok(())
    }

    /// Sets a text property; ignored for properties of another kind
    pub fn set_text(&mut self, prop: NodeProp, text: String) {
        if prop == NodeProp::NodeType {
            self.node_type = text;
        } else if let Some(slot) = self.text_slot(prop) {
            *slot = Some(text);
        }
    }

    /// Reads a text property
    pub fn text(&self, prop: NodeProp) -> Option<&str> {
        match prop {
            NodeProp::NodeType => Some(self.node_type.as_str()),
            NodeProp::RelationName => self.relation_name.as_deref(),
            NodeProp::Schema => self.schema.as_deref(),
            NodeProp::Alias => self.alias.as_deref(),
            NodeProp::IndexName => self.index_name.as_deref(),
            NodeProp::CteName => self.cte_name.as_deref(),
            NodeProp::FunctionName => self.function_name.as_deref(),
            NodeProp::SubplanName => self.subplan_name.as_deref(),
            NodeProp::ParentRelationship => self.parent_relationship.as_deref(),
            NodeProp::JoinType => self.join_type.as_deref(),
            NodeProp::ScanDirection => self.scan_direction.as_deref(),
            NodeProp::PartialMode => self.partial_mode.as_deref(),
            NodeProp::Filter => self.filter.as_deref(),
            NodeProp::HashCondition => self.hash_condition.as_deref(),
            NodeProp::SortMethod => self.sort_method.as_deref(),
            _ => None,
        }
    }

    /// Reads a numeric property
    pub fn number(&self, prop: NodeProp) -> Option<f64> {
        match prop {
            NodeProp::StartupCost => self.startup_cost,
            NodeProp::TotalCost => self.total_cost,
            NodeProp::PlanRows => self.plan_rows,
            NodeProp::PlanWidth => self.plan_width,
            NodeProp::ActualRows => self.actual_rows,
            NodeProp::ActualLoops => self.actual_loops,
            NodeProp::ActualStartupTime => self.actual_startup_time,
            NodeProp::ActualTotalTime => self.actual_total_time,
            NodeProp::RowsRemovedByFilter => self.rows_removed_by_filter,
            NodeProp::RowsRemovedByJoinFilter => self.rows_removed_by_join_filter,
            NodeProp::RowsRemovedByIndexRecheck => self.rows_removed_by_index_recheck,
            NodeProp::WorkersPlanned => self.workers_planned,
            NodeProp::WorkersLaunched => self.workers_launched,
            NodeProp::SortSpaceUsed => self.sort_space_used,
            NodeProp::Buffer(kind) => self.buffers.get(kind),
            _ => None,
        }
    }

    fn text_slot(&mut self, prop: NodeProp) -> Option<&mut Option<String>> {
        match prop {
            NodeProp::RelationName => Some(&mut self.relation_name),
            NodeProp::Schema => Some(&mut self.schema),
            NodeProp::Alias => Some(&mut self.alias),
            NodeProp::IndexName => Some(&mut self.index_name),
            NodeProp::CteName => Some(&mut self.cte_name),
            NodeProp::FunctionName => Some(&mut self.function_name),
            NodeProp::SubplanName => Some(&mut self.subplan_name),
            NodeProp::ParentRelationship => Some(&mut self.parent_relationship),
            NodeProp::JoinType => Some(&mut self.join_type),
            NodeProp::ScanDirection => Some(&mut self.scan_direction),
            NodeProp::PartialMode => Some(&mut self.partial_mode),
            NodeProp::Filter => Some(&mut self.filter),
            NodeProp::HashCondition => Some(&mut self.hash_condition),
            NodeProp::SortMethod => Some(&mut self.sort_method),
            _ => None,
        }
    }

    pub(crate) fn number_slot(&mut self, prop: NodeProp) -> Option<&mut Option<f64>> {
        match prop {
            NodeProp::StartupCost => Some(&mut self.startup_cost),
            NodeProp::TotalCost => Some(&mut self.total_cost),
            NodeProp::PlanRows => Some(&mut self.plan_rows),
            NodeProp::PlanWidth => Some(&mut self.plan_width),
            NodeProp::ActualRows => Some(&mut self.actual_rows),
            NodeProp::ActualLoops => Some(&mut self.actual_loops),
            NodeProp::ActualStartupTime => Some(&mut self.actual_startup_time),
            NodeProp::ActualTotalTime => Some(&mut self.actual_total_time),
            NodeProp::RowsRemovedByFilter => Some(&mut self.rows_removed_by_filter),
            NodeProp::RowsRemovedByJoinFilter => Some(&mut self.rows_removed_by_join_filter),
            NodeProp::RowsRemovedByIndexRecheck => Some(&mut self.rows_removed_by_index_recheck),
            NodeProp::WorkersPlanned => Some(&mut self.workers_planned),
            NodeProp::WorkersLaunched => Some(&mut self.workers_launched),
            NodeProp::SortSpaceUsed => Some(&mut self.sort_space_used),
            NodeProp::Buffer(kind) => Some(self.buffers.slot_mut(kind)),
            _ => None,
        }
    }

    pub(crate) fn list_slot(&mut self, prop: NodeProp) -> Option<&mut Vec<String>> {
        match prop {
            NodeProp::SortKey => Some(&mut self.sort_key),
            NodeProp::GroupKey => Some(&mut self.group_key),
            NodeProp::Output => Some(&mut self.output),
            _ => None,
        }
    }

    /// Rewrites `node_type` through the label grammar. Details extracted from
    /// the label only fill properties the input did not already set.
    fn apply_label(&mut self) {
        let label = parse_node_label(&self.node_type);
        self.node_type = label.node_type;
        fill(&mut self.relation_name, label.relation_name);
        fill(&mut self.alias, label.alias);
        fill(&mut self.index_name, label.index_name);
        fill(&mut self.scan_direction, label.scan_direction);
        fill(&mut self.cte_name, label.cte_name);
        fill(&mut self.function_name, label.function_name);
        fill(&mut self.join_type, label.join_type);
        if label.parallel_aware && self.parallel_aware.is_none() {
            self.parallel_aware = Some(true);
        }
    }

    /// Returns true if this node is a CTE body hoisted out of its parent
    pub fn is_cte(&self) -> bool {
        self.parent_relationship.as_deref() == Some("InitPlan")
            && self
                .subplan_name
                .as_deref()
                .is_some_and(|name| name.starts_with("CTE"))
    }

    /// Returns a copy of this node without its children
    pub fn detached(&self) -> Self {
        Self {
            node_id: self.node_id,
            node_type: self.node_type.clone(),
            relation_name: self.relation_name.clone(),
            schema: self.schema.clone(),
            alias: self.alias.clone(),
            index_name: self.index_name.clone(),
            cte_name: self.cte_name.clone(),
            function_name: self.function_name.clone(),
            subplan_name: self.subplan_name.clone(),
            parent_relationship: self.parent_relationship.clone(),
            join_type: self.join_type.clone(),
            scan_direction: self.scan_direction.clone(),
            partial_mode: self.partial_mode.clone(),
            filter: self.filter.clone(),
            hash_condition: self.hash_condition.clone(),
            sort_method: self.sort_method.clone(),
            parallel_aware: self.parallel_aware,
            startup_cost: self.startup_cost,
            total_cost: self.total_cost,
            plan_rows: self.plan_rows,
            plan_width: self.plan_width,
            actual_rows: self.actual_rows,
            actual_loops: self.actual_loops,
            actual_startup_time: self.actual_startup_time,
            actual_total_time: self.actual_total_time,
            rows_removed_by_filter: self.rows_removed_by_filter,
            rows_removed_by_join_filter: self.rows_removed_by_join_filter,
            rows_removed_by_index_recheck: self.rows_removed_by_index_recheck,
            workers_planned: self.workers_planned,
            workers_launched: self.workers_launched,
            sort_space_used: self.sort_space_used,
            sort_key: self.sort_key.clone(),
            group_key: self.group_key.clone(),
            output: self.output.clone(),
            buffers: self.buffers.clone(),
            stats: self.stats.clone(),
            children: Vec::new(),
            extra: self.extra.clone(),
        }
    }

    /// Returns an iterator over this subtree (depth-first, pre-order)
    pub fn iter(&self) -> PlanNodeIterator<'_> {
        PlanNodeIterator::new(self)
    }

    /// Returns the total number of nodes in this subtree (including self)
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn invalid(property: &str, expected: &'static str) -> PlanParseError {
    PlanParseError::InvalidProperty {
        property: property.to_string(),
        expected,
    }
}

/// Iterator for traversing plan nodes depth-first
pub struct PlanNodeIterator<'a> {
    stack: Vec<&'a PlanNode>,
}

impl<'a> PlanNodeIterator<'a> {
    fn new(root: &'a PlanNode) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for PlanNodeIterator<'a> {
    type Item = &'a PlanNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push children in reverse order so we visit them in order
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}
