//! plansight: analyze and lay out PostgreSQL EXPLAIN output from the terminal
//!
//! ```text
//! psql -XqAt -c "EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON) SELECT ..." | plansight --output summary
//! plansight plan.txt --format text --highlight rows --seed 7
//! ```

mod logging;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::{Cell, CellAlignment, Table, presets::UTF8_FULL};
use plansight_analyzer::{
    EstimateDirection, HighlightType, LayoutConfig, LayoutEngine, LayoutGraph, NodeDimensions,
    NodeRenderData, Plan, PlanBuilder, PlanNode, PlanStats, format_cost, format_duration,
    format_percent, format_rows, node_key,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "plansight")]
#[command(version, about = "Analyze and lay out PostgreSQL EXPLAIN plans", long_about = None)]
struct Cli {
    /// File with EXPLAIN output; reads stdin when absent or "-"
    file: Option<PathBuf>,

    /// Input format of the EXPLAIN output
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    format: InputFormat,

    /// Metric that drives the per-node highlight bar (none, duration, rows, cost)
    #[arg(long, env = "PLANSIGHT_HIGHLIGHT", default_value = "duration")]
    highlight: HighlightType,

    /// Size assumed for every node box, as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_node_size)]
    node_size: Option<NodeDimensions>,

    /// Seed for edge colours, for reproducible output
    #[arg(long, env = "PLANSIGHT_SEED")]
    seed: Option<u64>,

    /// What to print
    #[arg(long, value_enum, default_value_t = OutputFormat::Graph)]
    output: OutputFormat,

    /// Layout configuration file (TOML)
    #[arg(long, env = "PLANSIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Name stored with the plan
    #[arg(long, default_value = "Query Plan")]
    name: String,

    /// Query text stored with the plan
    #[arg(long)]
    query: Option<String>,

    /// Also write JSON logs to the log directory
    #[arg(long)]
    log_json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// JSON when the input starts with `{` or `[`, text otherwise
    Auto,
    Json,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Positioned nodes and edges as JSON
    Graph,
    /// Per-node statistics as a table
    Summary,
}

/// JSON document printed by `--output graph`
#[derive(Serialize)]
struct GraphDocument<'a> {
    id: &'a str,
    name: &'a str,
    query: &'a str,
    is_analyze: bool,
    stats: &'a PlanStats,
    layout: &'a LayoutGraph,
}

fn main() {
    let cli = Cli::parse();

    let mut config = if cfg!(debug_assertions) {
        logging::LoggingConfig::development()
    } else {
        logging::LoggingConfig::production()
    };
    config.enable_json_logs = cli.log_json;

    let _guard = match logging::init(config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: failed to initialize logging: {e:#}");
            None
        }
    };

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "plansight failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let source = read_input(cli.file.as_deref())?;
    let config = load_config(cli.config.as_deref())?;

    let plan = build_plan(
        &source,
        cli.format,
        &cli.name,
        cli.query.as_deref().unwrap_or(""),
    )?;
    if !cli.highlight.is_available(&plan) {
        tracing::warn!(highlight = %cli.highlight, "highlight has no data in this plan");
    }

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let node_size = cli.node_size.unwrap_or(config.default_node_size);
    let mut engine = LayoutEngine::with_rng(plan, cli.highlight, rng, config);
    let graph = layout(&mut engine, node_size);

    let mut stdout = std::io::stdout().lock();
    match cli.output {
        OutputFormat::Graph => {
            let plan = engine.plan();
            let document = GraphDocument {
                id: &plan.id,
                name: &plan.name,
                query: &plan.query,
                is_analyze: plan.is_analyze,
                stats: &plan.stats,
                layout: &graph,
            };
            serde_json::to_writer_pretty(&mut stdout, &document)
                .context("Failed to write layout JSON")?;
            writeln!(stdout)?;
        }
        OutputFormat::Summary => {
            writeln!(stdout, "{}", summary(engine.plan(), cli.highlight))?;
        }
    }

    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read EXPLAIN output from {:?}", path)),
        _ => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read EXPLAIN output from stdin")?;
            Ok(source)
        }
    }
}

/// Loads `--config`, or `<config dir>/plansight/layout.toml` when present
fn load_config(path: Option<&Path>) -> Result<LayoutConfig> {
    if let Some(path) = path {
        return LayoutConfig::load(path).context("Failed to load layout config");
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            LayoutConfig::load(&path).context("Failed to load layout config")
        }
        _ => Ok(LayoutConfig::default()),
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("plansight").join("layout.toml"))
}

fn detect_format(source: &str) -> InputFormat {
    match source.trim_start().chars().next() {
        Some('{' | '[') => InputFormat::Json,
        _ => InputFormat::Text,
    }
}

fn build_plan(source: &str, format: InputFormat, name: &str, query: &str) -> Result<Plan> {
    let format = match format {
        InputFormat::Auto => detect_format(source),
        explicit => explicit,
    };

    let mut builder = PlanBuilder::new();
    let content = match format {
        InputFormat::Text => builder.from_text_source(source),
        _ => builder.from_source(source),
    }
    .context("Failed to parse EXPLAIN output")?;

    Ok(builder.create_plan(name, content, query))
}

/// Reports `node_size` for every node and runs the resulting pass
fn layout(engine: &mut LayoutEngine, node_size: NodeDimensions) -> LayoutGraph {
    let ids: Vec<u32> = engine.plan().all_nodes().map(|node| node.node_id).collect();
    for id in ids {
        engine.register_node_dimensions(&node_key(id), node_size);
    }
    engine.run_frame().unwrap_or_else(|| engine.build_layout())
}

/// Parses `WIDTHxHEIGHT`, e.g. `250x110`
fn parse_node_size(value: &str) -> Result<NodeDimensions, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;

    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .ok_or_else(|| format!("invalid size {part:?} in {value:?}"))
    };

    Ok(NodeDimensions::new(parse(width)?, parse(height)?))
}

fn summary(plan: &Plan, highlight: HighlightType) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec![
            "#",
            "Node",
            "Rows",
            "Estimate",
            "Exclusive Time",
            "Exclusive Cost",
            highlight.as_str(),
        ]);

    let mut rows = Vec::new();
    collect_rows(&plan.content.plan, 0, &mut rows);
    for cte in &plan.ctes {
        collect_rows(cte, 0, &mut rows);
    }

    for (depth, node) in rows {
        let data = NodeRenderData::new(node, highlight, &plan.stats);
        let bar = data
            .highlight_bar
            .map(|bar| format!("{} {}", format_percent(Some(bar.percent)), bar.label))
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(node.node_id).set_alignment(CellAlignment::Right),
            Cell::new(format!("{}{}", "  ".repeat(depth), data.display_name)),
            Cell::new(format_rows(node.stats.revised.actual_rows.or(node.plan_rows)))
                .set_alignment(CellAlignment::Right),
            Cell::new(estimate_label(node)),
            Cell::new(format_duration(node.stats.exclusive_duration))
                .set_alignment(CellAlignment::Right),
            Cell::new(format_cost(node.stats.exclusive_cost)).set_alignment(CellAlignment::Right),
            Cell::new(bar),
        ]);
    }

    let mut footer = Vec::new();
    if let Some(ms) = plan.stats.planning_time {
        footer.push(format!("Planning: {}", format_duration(Some(ms))));
    }
    if let Some(ms) = plan.stats.execution_time {
        footer.push(format!("Execution: {}", format_duration(Some(ms))));
    }
    if !plan.ctes.is_empty() {
        footer.push(format!("CTEs: {}", plan.ctes.len()));
    }

    if footer.is_empty() {
        table.to_string()
    } else {
        format!("{table}\n{}", footer.join("  "))
    }
}

fn collect_rows<'a>(node: &'a PlanNode, depth: usize, rows: &mut Vec<(usize, &'a PlanNode)>) {
    rows.push((depth, node));
    for child in &node.children {
        collect_rows(child, depth + 1, rows);
    }
}

/// `12.5x under`, or empty when the node has no row estimate to compare
fn estimate_label(node: &PlanNode) -> String {
    let direction = match node.stats.estimate_direction {
        Some(EstimateDirection::Under) => "under",
        Some(EstimateDirection::Over) => "over",
        Some(EstimateDirection::None) | None => return String::new(),
    };
    match node.stats.estimate_factor {
        Some(factor) if factor.is_finite() => format!("{factor:.1}x {direction}"),
        _ => String::new(),
    }
}

#[cfg(test)]
#[path = "cli/tests.rs"]
mod tests;
