use crate::dist::{CDist, DDist, LeafDist};
use crate::metrics::{self, Metric};
use crate::schema::Row;
use crate::tree::config::TreeConfig;
use crate::tree::node::Node;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Result of recursively building one subtree: either a fully-formed child
/// node (the split continues), or a leaf distribution to be recorded
/// directly on the parent via `Node::set_leaf_dist` without materializing a
/// child node at all.
pub(crate) enum BuildOutcome {
    Leaf(LeafDist),
    Split(Node),
}

fn dataset_entropy_of_rows(rows: &[&Row], class_attr: &str, metric: Metric) -> f64 {
    let mut counts: HashMap<Option<Value>, f64> = HashMap::new();
    for row in rows {
        *counts.entry(row.get(class_attr).cloned()).or_insert(0.0) += 1.0;
    }
    metrics::dataset_entropy(&counts, metric)
}

fn dataset_variance_of_rows(rows: &[&Row], class_attr: &str) -> f64 {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.get(class_attr).and_then(|v| v.as_f64()))
        .collect();
    metrics::dataset_variance(&values)
}

fn group_by_attr<'a>(rows: &[&'a Row], attr: &str) -> HashMap<Option<Value>, Vec<&'a Row>> {
    let mut groups: HashMap<Option<Value>, Vec<&Row>> = HashMap::new();
    for row in rows {
        groups.entry(row.get(attr).cloned()).or_default().push(row);
    }
    groups
}

fn discrete_gain(rows: &[&Row], attr: &str, class_attr: &str, metric: Metric) -> f64 {
    let total = rows.len() as f64;
    let groups = group_by_attr(rows, attr);
    let subset_entropy: f64 = groups
        .values()
        .map(|subset| (subset.len() as f64 / total) * dataset_entropy_of_rows(subset, class_attr, metric))
        .sum();
    dataset_entropy_of_rows(rows, class_attr, metric) - subset_entropy
}

fn continuous_gain(rows: &[&Row], attr: &str, class_attr: &str) -> f64 {
    let total = rows.len() as f64;
    let groups = group_by_attr(rows, attr);
    let subset_entropy: f64 = groups
        .values()
        .map(|subset| (subset.len() as f64 / total) * dataset_variance_of_rows(subset, class_attr))
        .sum();
    dataset_variance_of_rows(rows, class_attr) - subset_entropy
}

fn choose_attribute(
    rows: &[&Row],
    attributes: &[String],
    class_attr: &str,
    config: &TreeConfig,
) -> Option<String> {
    let continuous = !config.metric.is_discrete();
    let mut best: Option<(f64, String)> = None;
    for attr in attributes {
        if attr == class_attr {
            continue;
        }
        let gain = if continuous {
            continuous_gain(rows, attr, class_attr)
        } else {
            discrete_gain(rows, attr, class_attr, config.metric)
        };
        best = Some(match best {
            None => (gain, attr.clone()),
            Some((best_gain, best_attr)) => {
                let better = match gain.partial_cmp(&best_gain) {
                    Some(Ordering::Greater) => true,
                    Some(Ordering::Equal) => attr > &best_attr,
                    _ => false,
                };
                if better {
                    (gain, attr.clone())
                } else {
                    (best_gain, best_attr)
                }
            }
        });
    }
    best.map(|(_, attr)| attr)
}

fn stop_value(rows: &[&Row], class_attr: &str, continuous: bool) -> LeafDist {
    if continuous {
        let dist = CDist::from_values(
            rows.iter()
                .filter_map(|r| r.get(class_attr).and_then(|v| v.as_f64())),
        );
        LeafDist::Continuous(dist)
    } else {
        let dist = DDist::from_values(rows.iter().filter_map(|r| r.get(class_attr).cloned()));
        LeafDist::Discrete(dist)
    }
}

fn should_stop(dist: &LeafDist, leaf_threshold: Option<f64>) -> bool {
    match dist {
        LeafDist::Discrete(d) => d.distinct_values() <= 1,
        LeafDist::Continuous(c) => match (c.variance(), leaf_threshold) {
            (Some(var), Some(threshold)) => var <= threshold,
            _ => false,
        },
    }
}

/// Recursively builds a subtree over `rows`, restricted to `attributes`
/// (which still includes the class attribute, mirroring the reference so
/// the "no attributes left" check can just compare `attributes.len() <= 1`).
pub(crate) fn build_recursive(
    rows: &[&Row],
    attributes: &[String],
    class_attr: &str,
    config: &TreeConfig,
    leaf_count: &mut usize,
) -> BuildOutcome {
    let continuous = config.class_is_continuous();
    let dist = stop_value(rows, class_attr, continuous);

    if rows.is_empty() || attributes.len() <= 1 || should_stop(&dist, config.leaf_threshold) {
        *leaf_count += 1;
        return BuildOutcome::Leaf(dist);
    }

    let best_attr = match choose_attribute(rows, attributes, class_attr, config) {
        Some(attr) => attr,
        None => {
            *leaf_count += 1;
            return BuildOutcome::Leaf(dist);
        }
    };

    let mut node = Node::new();
    node.set_n(rows.len());
    node.set_attr_name(best_attr.clone());

    let remaining: Vec<String> = attributes.iter().filter(|a| **a != best_attr).cloned().collect();
    let groups = group_by_attr(rows, &best_attr);

    for (value, subset) in groups {
        let value = value.expect("batch build requires fully populated rows");
        match build_recursive(&subset, &remaining, class_attr, config, leaf_count) {
            BuildOutcome::Leaf(leaf) => node.set_leaf_dist(value, leaf),
            BuildOutcome::Split(child) => node.attach_branch(value, child),
        }
    }

    BuildOutcome::Split(node)
}
