//! Tests for render data and formatting helpers

use super::*;
use crate::explain::build_plan;
use pretty_assertions::assert_eq;

const APPEND_PLAN: &str = r#"{"Plan": {
    "Node Type": "Append", "Actual Total Time": 25, "Actual Loops": 1, "Total Cost": 100,
    "Actual Rows": 20, "Plan Rows": 20,
    "Plans": [
        {"Node Type": "Seq Scan on a", "Actual Total Time": 10, "Actual Loops": 1, "Total Cost": 40, "Actual Rows": 8, "Plan Rows": 10},
        {"Node Type": "Seq Scan on b", "Actual Total Time": 10, "Actual Loops": 1, "Total Cost": 45, "Actual Rows": 12, "Plan Rows": 10}
    ]
}}"#;

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(Some(0.5)), "0.500 ms");
    assert_eq!(format_duration(Some(12.5)), "12.50 ms");
    assert_eq!(format_duration(Some(1500.0)), "1.50 s");
    assert_eq!(format_duration(None), "N/A");
    assert_eq!(format_duration(Some(f64::NAN)), "N/A");
}

#[test]
fn test_format_rows() {
    assert_eq!(format_rows(Some(999.0)), "999");
    assert_eq!(format_rows(Some(1500.0)), "1.5K");
    assert_eq!(format_rows(Some(2_000_000.0)), "2.0M");
    assert_eq!(format_rows(Some(3_100_000_000.0)), "3.1B");
    assert_eq!(format_rows(None), "N/A");
}

#[test]
fn test_format_cost() {
    assert_eq!(format_cost(Some(12.5)), "12.50");
    assert_eq!(format_cost(Some(1500.0)), "1.5K");
    assert_eq!(format_cost(Some(2_500_000.0)), "2.5M");
    assert_eq!(format_cost(Some(f64::NAN)), "N/A");
}

#[test]
fn test_format_percent() {
    assert_eq!(format_percent(Some(42.0)), "42.0%");
    assert_eq!(format_percent(Some(99.94)), "99.9%");
    assert_eq!(format_percent(None), "N/A");
}

#[test]
fn test_number_to_color_hsl_endpoints() {
    assert_eq!(number_to_color_hsl(0.0), "rgb(10,193,10)");
    assert_eq!(number_to_color_hsl(100.0), "rgb(193,10,10)");
}

#[test]
fn test_display_name() {
    let mut node = PlanNode::new("HashAggregate");
    assert_eq!(display_name(&node), "HashAggregate");

    node.parallel_aware = Some(true);
    node.partial_mode = Some("Partial".to_string());
    assert_eq!(display_name(&node), "Parallel Partial HashAggregate");

    let mut scan = PlanNode::from_label("Index Scan Backward using idx on t");
    assert_eq!(display_name(&scan), "Index Scan Backward");

    scan.scan_direction = Some("Forward".to_string());
    assert_eq!(display_name(&scan), "Index Scan");
}

#[test]
fn test_duration_highlight_bar() {
    let plan = build_plan(APPEND_PLAN).expect("valid plan");
    let data = NodeRenderData::new(&plan.content.plan, HighlightType::Duration, &plan.stats);

    assert_eq!(data.max_duration, Some(10.0));
    assert_eq!(
        data.highlight_bar,
        Some(HighlightBar {
            percent: 50.0,
            label: "5.00 ms".to_string(),
            color: number_to_color_hsl(50.0),
        })
    );
    assert!(data.node.children.is_empty());
    assert_eq!(data.display_name, "Append");
}

#[test]
fn test_rows_and_cost_highlight_bars() {
    let plan = build_plan(APPEND_PLAN).expect("valid plan");
    let scan = &plan.content.plan.children[0];

    let rows = NodeRenderData::new(scan, HighlightType::Rows, &plan.stats);
    let bar = rows.highlight_bar.expect("rows bar");
    assert_eq!(bar.percent, 40.0);
    assert_eq!(bar.label, "8");

    let cost = NodeRenderData::new(&plan.content.plan, HighlightType::Cost, &plan.stats);
    let bar = cost.highlight_bar.expect("cost bar");
    assert_eq!(bar.percent, 33.0);
    assert_eq!(bar.label, "15.00");
}

#[test]
fn test_no_bar_without_data() {
    let plan = build_plan(r#"{"Plan": {"Node Type": "Result", "Total Cost": 1}}"#).expect("valid");
    let root = &plan.content.plan;

    let none = NodeRenderData::new(root, HighlightType::None, &plan.stats);
    assert_eq!(none.highlight_bar, None);

    let duration = NodeRenderData::new(root, HighlightType::Duration, &plan.stats);
    assert_eq!(duration.highlight_bar, None);

    let rows = NodeRenderData::new(root, HighlightType::Rows, &plan.stats);
    assert_eq!(rows.highlight_bar, None);
}

#[test]
fn test_highlight_availability() {
    let analyzed = build_plan(APPEND_PLAN).expect("valid plan");
    assert!(HighlightType::ALL.iter().all(|kind| kind.is_available(&analyzed)));

    let estimated = build_plan(r#"{"Plan": {"Node Type": "Result"}}"#).expect("valid");
    assert_eq!(
        HighlightType::availability(&estimated),
        vec![
            (HighlightType::None, true),
            (HighlightType::Duration, false),
            (HighlightType::Rows, false),
            (HighlightType::Cost, true),
        ]
    );

    let empty = build_plan(r#"{"Plan": {"Node Type": "Result", "Actual Rows": 0}}"#).expect("valid");
    assert!(HighlightType::Duration.is_available(&empty));
    assert!(!HighlightType::Rows.is_available(&empty));
}

#[test]
fn test_highlight_type_parsing() {
    assert_eq!("rows".parse::<HighlightType>(), Ok(HighlightType::Rows));
    assert_eq!("Duration".parse::<HighlightType>(), Ok(HighlightType::Duration));
    assert_eq!(
        "bogus".parse::<HighlightType>(),
        Err(ParseHighlightError("bogus".to_string()))
    );
    assert_eq!(HighlightType::Cost.to_string(), "cost");
    assert_eq!(HighlightType::default(), HighlightType::Duration);
}
