//! EXPLAIN Plan Builder Module
//!
//! Turns raw PostgreSQL EXPLAIN output into an annotated [`Plan`]:
//! - JSON format (`EXPLAIN (ANALYZE, COSTS, VERBOSE, BUFFERS, FORMAT JSON)`)
//! - Text format (`EXPLAIN ANALYZE`), read into the same node model
//!
//! # Example
//!
//! ```
//! use plansight_analyzer::explain::{build_plan, EstimateDirection};
//!
//! let json = r#"{"Plan": {"Node Type": "Seq Scan on users", "Actual Rows": 500,
//!     "Plan Rows": 100, "Actual Loops": 1, "Actual Total Time": 12.5, "Total Cost": 50}}"#;
//! let plan = build_plan(json).unwrap();
//! let root = &plan.content.plan;
//! assert_eq!(root.node_type, "Seq Scan");
//! assert_eq!(root.relation_name.as_deref(), Some("users"));
//! assert_eq!(root.stats.estimate_direction, Some(EstimateDirection::Under));
//! ```

pub mod error;
pub mod node;
pub mod node_type;
pub mod plan;
pub mod text;

pub use error::PlanParseError;
pub use node::{
    BufferCounters, BufferKind, EstimateDirection, NodeProp, NodeStats, PlanNode, PlanNodeIterator,
    PropKind, RevisedRows, RowCounter,
};
pub use node_type::{NodeLabel, parse_node_label};
pub use plan::{PLAN_TAG, Plan, PlanBuilder, PlanContent, PlanStats, build_plan, normalize_query};
pub use text::parse_text_plan;
