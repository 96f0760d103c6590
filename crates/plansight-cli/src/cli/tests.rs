use super::*;
use indoc::indoc;
use pretty_assertions::assert_eq;

const JSON_PLAN: &str = r#"[{"Plan": {"Node Type": "Hash Join", "Actual Rows": 500,
    "Plan Rows": 100, "Actual Loops": 1, "Actual Total Time": 12.5, "Total Cost": 50,
    "Plans": [{"Node Type": "Seq Scan", "Actual Rows": 500, "Plan Rows": 500,
    "Actual Loops": 1, "Actual Total Time": 4.0, "Total Cost": 20}]},
    "Planning Time": 0.25, "Execution Time": 12.5}]"#;

const TEXT_PLAN: &str = indoc! {"
    Sort  (cost=10.00..10.50 rows=200 width=8)
      Sort Key: id
      ->  Seq Scan on users  (cost=0.00..5.00 rows=200 width=8)
"};

#[test]
fn test_parse_node_size() {
    assert_eq!(
        parse_node_size("250x110"),
        Ok(NodeDimensions::new(250.0, 110.0))
    );
    assert_eq!(
        parse_node_size("80.5X40"),
        Ok(NodeDimensions::new(80.5, 40.0))
    );
    assert!(parse_node_size("250").is_err());
    assert!(parse_node_size("wide x 10").is_err());
    assert!(parse_node_size("-5x10").is_err());
}

#[test]
fn test_detect_format() {
    assert_eq!(detect_format(JSON_PLAN), InputFormat::Json);
    assert_eq!(detect_format("  \n{\"Plan\": {}}"), InputFormat::Json);
    assert_eq!(detect_format(TEXT_PLAN), InputFormat::Text);
    assert_eq!(detect_format(""), InputFormat::Text);
}

#[test]
fn test_cli_defaults() {
    let cli = Cli::try_parse_from(["plansight"]).expect("valid arguments");

    assert_eq!(cli.file, None);
    assert_eq!(cli.format, InputFormat::Auto);
    assert_eq!(cli.output, OutputFormat::Graph);
    assert_eq!(cli.name, "Query Plan");
    assert_eq!(cli.node_size, None);
    assert!(!cli.log_json);
}

#[test]
fn test_cli_options() {
    let cli = Cli::try_parse_from([
        "plansight",
        "plan.json",
        "--format",
        "text",
        "--highlight",
        "rows",
        "--node-size",
        "200x90",
        "--seed",
        "7",
        "--output",
        "summary",
    ])
    .expect("valid arguments");

    assert_eq!(cli.file, Some(PathBuf::from("plan.json")));
    assert_eq!(cli.format, InputFormat::Text);
    assert_eq!(cli.highlight, HighlightType::Rows);
    assert_eq!(cli.node_size, Some(NodeDimensions::new(200.0, 90.0)));
    assert_eq!(cli.seed, Some(7));
    assert_eq!(cli.output, OutputFormat::Summary);

    assert!(Cli::try_parse_from(["plansight", "--highlight", "bogus"]).is_err());
    assert!(Cli::try_parse_from(["plansight", "--node-size", "big"]).is_err());
}

#[test]
fn test_build_plan_auto_detects_format() {
    let json = build_plan(JSON_PLAN, InputFormat::Auto, "json", "").expect("json plan");
    assert!(json.is_analyze);
    assert_eq!(json.node_count(), 2);

    let text = build_plan(TEXT_PLAN, InputFormat::Auto, "text", "").expect("text plan");
    assert!(!text.is_analyze);
    assert_eq!(text.node_count(), 2);
    assert_eq!(text.content.plan.node_type, "Sort");
}

#[test]
fn test_build_plan_explicit_format_is_respected() {
    assert!(build_plan(TEXT_PLAN, InputFormat::Json, "text", "").is_err());
}

#[test]
fn test_layout_measures_every_node() {
    let plan = build_plan(JSON_PLAN, InputFormat::Json, "json", "").expect("json plan");
    let mut engine = LayoutEngine::with_rng(
        plan,
        HighlightType::Duration,
        StdRng::seed_from_u64(1),
        LayoutConfig::default(),
    );

    let graph = layout(&mut engine, NodeDimensions::new(100.0, 40.0));

    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(
        engine.dimensions(&node_key(2)),
        Some(NodeDimensions::new(100.0, 40.0))
    );
    assert!(!engine.has_pending_frame());
}

#[test]
fn test_summary_table() {
    let plan = build_plan(JSON_PLAN, InputFormat::Json, "json", "").expect("json plan");
    let table = summary(&plan, HighlightType::Duration);

    assert!(table.contains("Hash Join"));
    assert!(table.contains("  Seq Scan"));
    assert!(table.contains("5.0x under"));
    assert!(table.contains("duration"));
    assert!(table.ends_with("Planning: 0.250 ms  Execution: 12.50 ms"));
}

#[test]
fn test_estimate_label() {
    let mut node = PlanNode::new("Seq Scan");
    assert_eq!(estimate_label(&node), "");

    node.stats.estimate_factor = Some(4.0);
    node.stats.estimate_direction = Some(EstimateDirection::Over);
    assert_eq!(estimate_label(&node), "4.0x over");

    node.stats.estimate_direction = Some(EstimateDirection::None);
    assert_eq!(estimate_label(&node), "");
}
