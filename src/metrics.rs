use crate::error::ConfigError;
use std::collections::HashMap;

/// Metric used to score candidate splits, tagged with the class-value kind
/// it applies to so an incompatible pairing (e.g. `Entropy1` over a
/// continuous class) is a [`ConfigError`] rather than a runtime panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Entropy1,
    Entropy2,
    Entropy3,
    Variance1,
    Variance2,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Entropy1 => "entropy1",
            Metric::Entropy2 => "entropy2",
            Metric::Entropy3 => "entropy3",
            Metric::Variance1 => "variance1",
            Metric::Variance2 => "variance2",
        }
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, Metric::Entropy1 | Metric::Entropy2 | Metric::Entropy3)
    }

    /// Validate that this metric is usable given whether the class
    /// attribute is continuous.
    pub fn check_compatible(&self, class_is_continuous: bool) -> Result<(), ConfigError> {
        if self.is_discrete() == class_is_continuous {
            Err(ConfigError::IncompatibleMetric {
                metric: self.name(),
                class_kind: if class_is_continuous {
                    "continuous"
                } else {
                    "discrete"
                },
            })
        } else {
            Ok(())
        }
    }
}

/// Dataset-level (batch-path) entropy of a discrete count map with `total`
/// samples. Unlike [`node_entropy`], the entropy2/entropy3 penalty term is
/// *subtracted* as `(U-1)/T`, and both `T` and `A` collapse to the dataset
/// total. This asymmetry with the node-cached formula is carried over from
/// the system this engine reproduces and is intentional.
pub fn dataset_entropy<K>(counts: &HashMap<K, f64>, metric: Metric) -> f64 {
    let len_data: f64 = counts.values().sum();
    let total = len_data;
    let u = counts.len().max(2) as f64;
    let base = u;

    let sum: f64 = counts
        .values()
        .map(|&count| {
            let p = count / len_data;
            -(p * p.log(base))
        })
        .sum();

    let distinct = counts.len() as f64;
    match metric {
        Metric::Entropy1 => sum,
        Metric::Entropy2 => sum - (distinct - 1.0) / total,
        Metric::Entropy3 => sum - 100.0 * (distinct - 1.0) / total,
        Metric::Variance1 | Metric::Variance2 => {
            unreachable!("dataset_entropy called with a continuous metric")
        }
    }
}

/// Node-level (online/cached-statistics) entropy of a discrete count map.
/// `total` is the count backing `counts` (e.g. the count of one attribute
/// value), `attr_total` is the attribute's grand total across all its
/// values, and `distinct_attr_values` is the number of distinct values the
/// attribute itself has taken (not the number of distinct classes in
/// `counts`). The entropy2/entropy3 penalty is *added* as `U/A`.
pub fn node_entropy<K>(
    counts: &HashMap<K, usize>,
    total: usize,
    attr_total: usize,
    distinct_attr_values: usize,
    metric: Metric,
) -> f64 {
    let total_f = total as f64;
    let base = (counts.len().max(2)) as f64;

    let sum: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / total_f;
            -(p * p.log(base))
        })
        .sum();

    match metric {
        Metric::Entropy1 => sum,
        Metric::Entropy2 => sum + distinct_attr_values as f64 / attr_total as f64,
        Metric::Entropy3 => sum + 100.0 * distinct_attr_values as f64 / attr_total as f64,
        Metric::Variance1 | Metric::Variance2 => {
            unreachable!("node_entropy called with a continuous metric")
        }
    }
}

/// Node-level variance metric. `variance1` is the plain variance; `variance2`
/// scales it by the ratio of distinct attribute values to the attribute's
/// total observation count. When no attribute is given (the node's own
/// marginal variance) the scaling never applies, matching the reference.
pub fn node_variance(
    variance: f64,
    distinct_attr_values: Option<usize>,
    attr_total: Option<usize>,
    metric: Metric,
) -> f64 {
    match (metric, distinct_attr_values, attr_total) {
        (Metric::Variance2, Some(u), Some(a)) if a > 0 => variance * (u as f64 / a as f64),
        _ => variance,
    }
}

/// Plain population variance of a list of values — used as the batch-path
/// dataset-level variance metric, which (per the reference) ignores the
/// configured metric entirely and always behaves like `variance1`.
pub fn dataset_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn entropy1_is_zero_for_pure_set() {
        let mut counts = HashMap::new();
        counts.insert("a", 4.0);
        assert!(approx_eq(dataset_entropy(&counts, Metric::Entropy1), 0.0, EPS));
    }

    #[test]
    fn entropy1_is_one_for_even_binary_split() {
        let mut counts = HashMap::new();
        counts.insert("a", 2.0);
        counts.insert("b", 2.0);
        assert!(approx_eq(dataset_entropy(&counts, Metric::Entropy1), 1.0, EPS));
    }

    #[test]
    fn node_entropy_adds_penalty_dataset_entropy_subtracts() {
        let mut counts = HashMap::new();
        counts.insert("a", 2usize);
        counts.insert("b", 2usize);
        let added = node_entropy(&counts, 4, 4, 2, Metric::Entropy2);
        assert!(approx_eq(added, 1.0 + 2.0 / 4.0, EPS));

        let mut counts_f = HashMap::new();
        counts_f.insert("a", 2.0);
        counts_f.insert("b", 2.0);
        let subtracted = dataset_entropy(&counts_f, Metric::Entropy2);
        assert!(approx_eq(subtracted, 1.0 - 1.0 / 4.0, EPS));
    }

    #[test]
    fn variance2_scales_by_attribute_diversity() {
        let v = node_variance(4.0, Some(2), Some(8), Metric::Variance2);
        assert!(approx_eq(v, 1.0, EPS));
        let v1 = node_variance(4.0, Some(2), Some(8), Metric::Variance1);
        assert!(approx_eq(v1, 4.0, EPS));
    }

    #[test]
    fn metric_compatibility_check() {
        assert!(Metric::Entropy1.check_compatible(false).is_ok());
        assert!(Metric::Entropy1.check_compatible(true).is_err());
        assert!(Metric::Variance1.check_compatible(true).is_ok());
        assert!(Metric::Variance1.check_compatible(false).is_err());
    }
}
