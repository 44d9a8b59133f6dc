//! Read-only text renderings of a tree for operator inspection.
//!
//! Three formats: a dot-format body for graph tooling ([`display`]), a
//! recursive indented dump ([`print`]), and a per-node surrogate report
//! ([`surr_display`]). All take caller-supplied name tables and never
//! mutate the tree.
//!
//! Dot conventions are part of the external contract: leaves render as
//! `shape=box`, internal nodes as `shape=ellipse`, the true-branch edge is
//! labeled `yes` and the false-branch edge `no`; double quotes and
//! backslashes in names are escaped.

use std::fmt::Write;

use crate::repr::node::{false_child, true_child, NodeKind};
use crate::repr::tree::DecisionTree;

/// Name tables used to render features, levels and classes.
///
/// `cat_level_names` is flattened over all categorical features;
/// `cat_n_levels` gives the per-feature lengths.
#[derive(Debug, Clone, Copy)]
pub struct TreeLabels<'a> {
    pub cat_feature_names: &'a [&'a str],
    pub con_feature_names: &'a [&'a str],
    pub cat_level_names: &'a [&'a str],
    pub cat_n_levels: &'a [u32],
    pub class_labels: &'a [&'a str],
}

fn escape_quotes(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `{level,...,level}` set of a categorical feature, codes
/// `start..=end`, clamped to the available names.
fn cat_label_set(labels: &TreeLabels<'_>, feature: usize, start: usize, end: usize) -> String {
    let skip: usize = labels.cat_n_levels[..feature].iter().sum::<u32>() as usize;
    let n_levels = labels.cat_n_levels[feature] as usize;
    let names = &labels.cat_level_names[skip..skip + n_levels];
    let end = end.min(n_levels.saturating_sub(1));
    let mut out = String::from("{");
    for (i, name) in names[start..=end].iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(name);
    }
    out.push('}');
    out
}

/// Human-readable form of one split test.
fn print_split(
    labels: &TreeLabels<'_>,
    is_cat: bool,
    is_reverse: bool,
    feature: usize,
    threshold: f64,
) -> String {
    if !is_cat {
        let comparison = if is_reverse { ">" } else { "<=" };
        format!("{} {} {}", labels.con_feature_names[feature], comparison, threshold)
    } else {
        let n_levels = labels.cat_n_levels[feature] as usize;
        let (start, end) = if is_reverse {
            (threshold as usize + 1, n_levels - 1)
        } else {
            (0, threshold as usize)
        };
        format!(
            "{} in {}",
            labels.cat_feature_names[feature],
            cat_label_set(labels, feature, start, end)
        )
    }
}

fn leaf_prediction_label(tree: &DecisionTree, labels: &TreeLabels<'_>, node: usize) -> String {
    if tree.is_regression() {
        format!("{}", tree.predict_response_at(node))
    } else {
        let class = tree.predict_response_at(node) as usize;
        escape_quotes(labels.class_labels[class])
    }
}

fn display_leaf_node(
    tree: &DecisionTree,
    labels: &TreeLabels<'_>,
    node: usize,
    id_prefix: &str,
) -> String {
    format!(
        "\"{id_prefix}{node}\" [label=\"{}\",shape=box];",
        leaf_prediction_label(tree, labels, node)
    )
}

fn display_internal_node(
    tree: &DecisionTree,
    labels: &TreeLabels<'_>,
    node: usize,
    id_prefix: &str,
) -> String {
    let label = if tree.node_is_categorical(node) {
        let NodeKind::Split(feature) = tree.node_kind(node) else {
            unreachable!("internal node expected");
        };
        format!(
            "{} in {}",
            escape_quotes(labels.cat_feature_names[feature]),
            cat_label_set(labels, feature, 0, tree.threshold(node) as usize)
        )
    } else {
        let NodeKind::Split(feature) = tree.node_kind(node) else {
            unreachable!("internal node expected");
        };
        format!(
            "{} <= {}",
            escape_quotes(labels.con_feature_names[feature]),
            tree.threshold(node)
        )
    };
    format!("\"{id_prefix}{node}\" [label=\"{label}\", shape=ellipse];")
}

// =============================================================================
// Renderers
// =============================================================================

/// Dot-format body: one statement per node and edge.
///
/// The caller owns the surrounding `digraph {{ ... }}` frame; `id_prefix`
/// namespaces node identifiers when several trees share one graph.
pub fn display(tree: &DecisionTree, labels: &TreeLabels<'_>, id_prefix: &str) -> String {
    let mut out = String::new();
    if tree.node_kind(0) == NodeKind::FinishedLeaf {
        let _ = writeln!(out, "{}", display_leaf_node(tree, labels, 0, id_prefix));
        return out;
    }
    for node in 0..tree.n_nodes() / 2 {
        if !matches!(tree.node_kind(node), NodeKind::Split(_)) {
            continue;
        }
        let _ = writeln!(out, "{}", display_internal_node(tree, labels, node, id_prefix));

        for (child, edge) in [(true_child(node), "yes"), (false_child(node), "no")] {
            let kind = tree.node_kind(child);
            if kind == NodeKind::NonExisting {
                continue;
            }
            let _ = writeln!(
                out,
                "\"{id_prefix}{node}\" -> \"{id_prefix}{child}\"[label=\"{edge}\"];"
            );
            if kind.is_leaf() {
                let _ = writeln!(out, "{}", display_leaf_node(tree, labels, child, id_prefix));
            }
        }
    }
    out
}

/// Indented plain-text dump, one node per line.
pub fn print(tree: &DecisionTree, labels: &TreeLabels<'_>) -> String {
    let mut out = String::new();
    print_node(tree, labels, 0, 1, &mut out);
    out
}

fn print_node(
    tree: &DecisionTree,
    labels: &TreeLabels<'_>,
    current: usize,
    recursion_depth: usize,
    out: &mut String,
) {
    if tree.node_kind(current) == NodeKind::NonExisting {
        return;
    }
    let _ = write!(out, "({current})[");
    if tree.is_regression() {
        let _ = write!(
            out,
            "{}, {}",
            tree.node_weighted_count(current),
            tree.predict_response_at(current)
        );
    } else {
        let counts = &tree.predictions(current)[..tree.n_y_labels() as usize];
        for (i, count) in counts.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{count}");
        }
    }
    let _ = write!(out, "]  ");

    if let NodeKind::Split(feature) = tree.node_kind(current) {
        let label = print_split(
            labels,
            tree.node_is_categorical(current),
            false,
            feature,
            tree.threshold(current),
        );
        let _ = writeln!(out, "{label}");
        let indentation = " ".repeat(recursion_depth * 3);
        out.push_str(&indentation);
        print_node(tree, labels, true_child(current), recursion_depth + 1, out);
        out.push_str(&indentation);
        print_node(tree, labels, false_child(current), recursion_depth + 1, out);
    } else {
        let _ = write!(out, "*");
        if !tree.is_regression() {
            let class = tree.predict_response_at(current) as usize;
            let _ = write!(out, " --> {}", labels.class_labels[class]);
        }
        out.push('\n');
    }
}

/// Per-node report of stored surrogates and the majority-branch baseline.
pub fn surr_display(tree: &DecisionTree, labels: &TreeLabels<'_>) -> String {
    if tree.max_n_surr() == 0 {
        return String::new();
    }
    let mut out = String::new();
    let indentation = " ".repeat(5);
    for node in 0..tree.n_nodes() / 2 {
        let NodeKind::Split(feature) = tree.node_kind(node) else {
            continue;
        };
        let primary = print_split(
            labels,
            tree.node_is_categorical(node),
            false,
            feature,
            tree.threshold(node),
        );
        let _ = writeln!(out, "({node}) {primary}");
        for slot in 0..tree.max_n_surr() as usize {
            let Some(surr) = tree.surrogate(node, slot) else {
                break;
            };
            let label = print_split(
                labels,
                surr.status.is_categorical,
                surr.status.is_reverse,
                surr.feature,
                surr.threshold,
            );
            let _ = writeln!(
                out,
                "{indentation}{}: {label}    [common rows = {}]",
                slot + 1,
                surr.agreement
            );
        }
        let _ = writeln!(out, "{indentation}[Majority branch = {} ]", tree.majority_count(node));
        out.push('\n');
    }
    out
}
