//! Plansight Analyzer - EXPLAIN plan analysis and layout
//!
//! This crate provides functionality for:
//! - Parsing PostgreSQL EXPLAIN output (JSON and text formats) into an annotated plan tree
//! - Per-node statistics (exclusive cost/duration, estimate errors, buffer usage)
//! - Layered tree layout with stable edge colouring for rendering

pub mod explain;
pub mod layout;
pub mod render;

pub use explain::*;
pub use layout::*;
pub use render::*;
