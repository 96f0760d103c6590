//! Layout Engine Module
//!
//! Positions the nodes of a built plan for a layered tree renderer:
//! - one row per tree depth, centred, using the sizes nodes report back
//! - CTE trees as separate clusters above the main tree
//! - edges scaled by row flow, with colours that stay stable between passes
//!
//! Passes are coalesced per frame: any number of triggers before
//! [`LayoutEngine::run_frame`] yield a single pass.

pub mod config;
pub mod edges;
pub mod engine;
pub mod frame;

pub use config::{ConfigError, LayoutConfig};
pub use edges::{
    DEFAULT_STROKE_WIDTH, EDGE_COLORS, EdgePalette, MAX_STROKE_WIDTH, MIN_STROKE_WIDTH,
    stroke_width,
};
pub use engine::{
    LayoutEdge, LayoutEngine, LayoutGraph, LayoutNode, NodeDimensions, Position, node_key,
};
pub use frame::{FrameScheduler, FrameToken};
