//! Node Type Label Grammar
//!
//! EXPLAIN text output (and some JSON producers) fold scan details into the
//! node type itself: `"Index Scan Backward using users_pkey on users u"`.
//! [`parse_node_label`] splits such a label into the bare node type and the
//! details it carries.
//!
//! Matching happens in three independent passes:
//! 1. the first label matcher that accepts the whole label extracts its fields;
//! 2. a leading `Parallel ` is stripped and recorded;
//! 3. a trailing ` Join` has its `Full`/`Left`/`Right`/`Anti` modifier pulled out.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SCAN_OR_MODIFY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^((?:Parallel\s+)?(?:Seq|Tid.*|Bitmap\s+Heap|WorkTable|(?:Async\s+)?Foreign)\s+Scan|Update|Insert|Delete|Merge)\son\s(\S+)(?:\s+(\S+))?$",
    )
    .expect("valid regex")
});

static BITMAP_INDEX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Bitmap\s+Index\s+Scan)\son\s(\S+)$").expect("valid regex"));

static INDEX_SCAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^((?:Parallel\s+)?Index(?:\sOnly)?\sScan)(\sBackward)?\susing\s(\S+)\son\s(\S+)(?:\s+(\S+))?$",
    )
    .expect("valid regex")
});

static CTE_SCAN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(CTE\sScan)\son\s(\S+)(?:\s+(\S+))?$").expect("valid regex"));

static FUNCTION_SCAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Function\sScan)\son\s(\S+)(?:\s+(\S+))?$").expect("valid regex")
});

static SUBQUERY_SCAN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Subquery\sScan)\son\s(.+)$").expect("valid regex"));

static PARALLEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Parallel\s+(.*)$").expect("valid regex"));

static JOIN_MODIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\s+(Full|Left|Right|Anti)").expect("valid regex"));

/// Details extracted from a node type label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLabel {
    pub node_type: String,
    pub relation_name: Option<String>,
    pub alias: Option<String>,
    pub index_name: Option<String>,
    /// `"Forward"` or `"Backward"`, only for index scans
    pub scan_direction: Option<String>,
    pub cte_name: Option<String>,
    pub function_name: Option<String>,
    pub parallel_aware: bool,
    pub join_type: Option<String>,
}

impl NodeLabel {
    fn plain(node_type: &str) -> Self {
        Self {
            node_type: node_type.to_string(),
            ..Self::default()
        }
    }
}

/// Result of one label matcher
#[derive(Debug, Clone, PartialEq, Eq)]
enum LabelMatch {
    Relation {
        node_type: String,
        relation: String,
        alias: Option<String>,
    },
    BitmapIndex {
        node_type: String,
        index: String,
    },
    Index {
        node_type: String,
        backward: bool,
        index: String,
        relation: String,
        alias: Option<String>,
    },
    Cte {
        node_type: String,
        cte: String,
        alias: Option<String>,
    },
    Function {
        node_type: String,
        function: String,
        alias: Option<String>,
    },
    Subquery {
        node_type: String,
        alias: String,
    },
}

type Matcher = fn(&str) -> Option<LabelMatch>;

/// Label matchers in priority order
const MATCHERS: [Matcher; 6] = [
    match_scan_or_modify,
    match_bitmap_index,
    match_index_scan,
    match_cte_scan,
    match_function_scan,
    match_subquery_scan,
];

fn group(captures: &regex::Captures<'_>, index: usize) -> Option<String> {
    captures.get(index).map(|m| m.as_str().to_string())
}

fn match_scan_or_modify(label: &str) -> Option<LabelMatch> {
    let caps = SCAN_OR_MODIFY_REGEX.captures(label)?;
    Some(LabelMatch::Relation {
        node_type: group(&caps, 1)?,
        relation: group(&caps, 2)?,
        alias: group(&caps, 3),
    })
}

fn match_bitmap_index(label: &str) -> Option<LabelMatch> {
    let caps = BITMAP_INDEX_REGEX.captures(label)?;
    Some(LabelMatch::BitmapIndex {
        node_type: group(&caps, 1)?,
        index: group(&caps, 2)?,
    })
}

fn match_index_scan(label: &str) -> Option<LabelMatch> {
    let caps = INDEX_SCAN_REGEX.captures(label)?;
    Some(LabelMatch::Index {
        node_type: group(&caps, 1)?,
        backward: caps.get(2).is_some(),
        index: group(&caps, 3)?,
        relation: group(&caps, 4)?,
        alias: group(&caps, 5),
    })
}

fn match_cte_scan(label: &str) -> Option<LabelMatch> {
    let caps = CTE_SCAN_REGEX.captures(label)?;
    Some(LabelMatch::Cte {
        node_type: group(&caps, 1)?,
        cte: group(&caps, 2)?,
        alias: group(&caps, 3),
    })
}

fn match_function_scan(label: &str) -> Option<LabelMatch> {
    let caps = FUNCTION_SCAN_REGEX.captures(label)?;
    Some(LabelMatch::Function {
        node_type: group(&caps, 1)?,
        function: group(&caps, 2)?,
        alias: group(&caps, 3),
    })
}

fn match_subquery_scan(label: &str) -> Option<LabelMatch> {
    let caps = SUBQUERY_SCAN_REGEX.captures(label)?;
    Some(LabelMatch::Subquery {
        node_type: group(&caps, 1)?,
        alias: group(&caps, 2)?,
    })
}

impl From<LabelMatch> for NodeLabel {
    fn from(matched: LabelMatch) -> Self {
        match matched {
            LabelMatch::Relation {
                node_type,
                relation,
                alias,
            } => Self {
                node_type,
                relation_name: Some(relation),
                alias,
                ..Self::default()
            },
            LabelMatch::BitmapIndex { node_type, index } => Self {
                node_type,
                index_name: Some(index),
                ..Self::default()
            },
            LabelMatch::Index {
                node_type,
                backward,
                index,
                relation,
                alias,
            } => Self {
                node_type,
                index_name: Some(index),
                scan_direction: Some(if backward { "Backward" } else { "Forward" }.to_string()),
                relation_name: Some(relation),
                alias,
                ..Self::default()
            },
            LabelMatch::Cte {
                node_type,
                cte,
                alias,
            } => Self {
                node_type,
                cte_name: Some(cte),
                alias,
                ..Self::default()
            },
            LabelMatch::Function {
                node_type,
                function,
                alias,
            } => Self {
                node_type,
                function_name: Some(function),
                alias,
                ..Self::default()
            },
            LabelMatch::Subquery { node_type, alias } => Self {
                node_type,
                alias: Some(alias),
                ..Self::default()
            },
        }
    }
}

/// Splits a `Parallel ` prefix off a node type
fn strip_parallel(node_type: &str) -> Option<String> {
    PARALLEL_REGEX
        .captures(node_type)
        .and_then(|caps| group(&caps, 1))
}

/// Normalizes a join node type, returning the type and its join modifier.
///
/// `"Hash Anti Join"` becomes `("Hash Join", Some("Anti"))`. Returns `None`
/// for types that are not joins.
fn split_join(node_type: &str) -> Option<(String, Option<String>)> {
    let base = node_type.strip_suffix(" Join")?;
    let parsed = match JOIN_MODIFIER_REGEX.captures(base) {
        Some(caps) => (
            format!("{} Join", caps.get(1).map_or("", |m| m.as_str())),
            group(&caps, 2),
        ),
        None => (format!("{base} Join"), None),
    };
    Some(parsed)
}

/// Parses a node type label into its bare type and extracted details
pub fn parse_node_label(label: &str) -> NodeLabel {
    let mut parsed = MATCHERS
        .iter()
        .find_map(|matcher| matcher(label))
        .map(NodeLabel::from)
        .unwrap_or_else(|| NodeLabel::plain(label));

    if let Some(rest) = strip_parallel(&parsed.node_type) {
        parsed.node_type = rest;
        parsed.parallel_aware = true;
    }

    if let Some((node_type, join_type)) = split_join(&parsed.node_type) {
        parsed.node_type = node_type;
        parsed.join_type = join_type;
    }

    parsed
}
