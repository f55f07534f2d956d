use crate::dist::{CDist, DDist, LeafDist};
use crate::error::PredictError;
use crate::metrics;
use crate::schema::Row;
use crate::tree::config::{MissingValuePolicy, TreeConfig};
use crate::utils::memory::{MemoryMeter, MemorySized};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// A single vertex of a decision tree.
///
/// A `Node` owns its children exclusively (`Box` in a `HashMap` keyed by
/// split-attribute value) and holds no reference back to the owning
/// [`crate::tree::Tree`] — every method that needs shared configuration
/// (metric, thresholds, schema) takes a `&TreeConfig` parameter instead.
#[derive(Clone, Debug, Default)]
pub struct Node {
    n: usize,
    attr_name: Option<String>,
    branches: HashMap<Value, Box<Node>>,
    attr_value_counts: HashMap<String, HashMap<Value, usize>>,
    attr_value_count_totals: HashMap<String, usize>,
    attr_class_value_counts: HashMap<String, HashMap<Value, HashMap<Value, usize>>>,
    attr_value_cdist: HashMap<String, HashMap<Value, CDist>>,
    class_ddist: DDist,
    class_cdist: CDist,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn attr_name(&self) -> Option<&str> {
        self.attr_name.as_deref()
    }

    pub fn branch(&self, value: &Value) -> Option<&Node> {
        self.branches.get(value).map(|b| b.as_ref())
    }

    pub fn branches(&self) -> impl Iterator<Item = (&Value, &Node)> {
        self.branches.iter().map(|(k, v)| (k, v.as_ref()))
    }

    pub fn ready_to_predict(&self) -> bool {
        self.n > 0
    }

    fn split_attributes(&self) -> impl Iterator<Item = &String> {
        self.attr_value_counts.keys()
    }

    /// Unique values observed for `attr` at this node: from cached counts,
    /// cached continuous statistics, and (if `attr` is the split attribute)
    /// materialized branches.
    pub fn get_values(&self, attr: &str) -> HashSet<Value> {
        let mut values = HashSet::new();
        if let Some(m) = self.attr_value_counts.get(attr) {
            values.extend(m.keys().cloned());
        }
        if let Some(m) = self.attr_value_cdist.get(attr) {
            values.extend(m.keys().cloned());
        }
        if self.attr_name.as_deref() == Some(attr) {
            values.extend(self.branches.keys().cloned());
        }
        values
    }

    pub fn get_value_prob(&self, attr: &str, value: &Value) -> Option<f64> {
        let total = *self.attr_value_count_totals.get(attr)?;
        if total == 0 {
            return None;
        }
        let n = self
            .attr_value_counts
            .get(attr)
            .and_then(|m| m.get(value))
            .copied()
            .unwrap_or(0);
        Some(n as f64 / total as f64)
    }

    /// Reconstructs the class distribution observed jointly with
    /// `(attr, value)`, used both at prediction time and by the batch
    /// builder when it records a leaf distribution without materializing a
    /// full child node.
    pub fn get_value_ddist(&self, attr: &str, value: &Value) -> DDist {
        let mut dist = DDist::new();
        if let Some(per_value) = self
            .attr_class_value_counts
            .get(attr)
            .and_then(|m| m.get(value))
        {
            for (cls, count) in per_value {
                dist.add(cls.clone(), *count);
            }
        }
        dist
    }

    pub fn get_value_cdist(&self, attr: &str, value: &Value) -> CDist {
        self.attr_value_cdist
            .get(attr)
            .and_then(|m| m.get(value))
            .copied()
            .unwrap_or_default()
    }

    /// Entropy/variance at this node, either the marginal (`attr = None`) or
    /// conditioned on a specific `(attr, value)` pair.
    pub fn get_entropy(&self, config: &TreeConfig, attr: Option<&str>, value: Option<&Value>) -> f64 {
        if config.metric.is_discrete() {
            match (attr, value) {
                (None, _) => {
                    let counts: HashMap<Value, usize> =
                        self.class_ddist.counts().map(|(k, c)| (k.clone(), *c)).collect();
                    let total = self.class_ddist.total();
                    let distinct = counts.len();
                    metrics::node_entropy(&counts, total, total, distinct, config.metric)
                }
                (Some(a), Some(v)) => {
                    let counts = self
                        .attr_class_value_counts
                        .get(a)
                        .and_then(|m| m.get(v))
                        .cloned()
                        .unwrap_or_default();
                    let total = self
                        .attr_value_counts
                        .get(a)
                        .and_then(|m| m.get(v))
                        .copied()
                        .unwrap_or(0);
                    let attr_total = self.attr_value_count_totals.get(a).copied().unwrap_or(0);
                    let distinct_attr_values =
                        self.attr_value_counts.get(a).map(|m| m.len()).unwrap_or(0);
                    metrics::node_entropy(&counts, total, attr_total, distinct_attr_values, config.metric)
                }
                (Some(_), None) => 0.0,
            }
        } else {
            match (attr, value) {
                (None, _) => self.class_cdist.variance().unwrap_or(0.0),
                (Some(a), Some(v)) => {
                    let var = self
                        .attr_value_cdist
                        .get(a)
                        .and_then(|m| m.get(v))
                        .and_then(|c| c.variance())
                        .unwrap_or(0.0);
                    let distinct = self.attr_value_counts.get(a).map(|m| m.len());
                    let attr_total = self.attr_value_count_totals.get(a).copied();
                    metrics::node_variance(var, distinct, attr_total, config.metric)
                }
                (Some(_), None) => 0.0,
            }
        }
    }

    pub fn main_entropy(&self, config: &TreeConfig) -> f64 {
        self.get_entropy(config, None, None)
    }

    pub fn get_gain(&self, config: &TreeConfig, attr: &str) -> f64 {
        let main_entropy = self.main_entropy(config);
        let mut subset_entropy = 0.0;
        if let Some(counts) = self.attr_value_counts.get(attr) {
            for value in counts.keys() {
                let p = self.get_value_prob(attr, value).unwrap_or(0.0);
                let e = self.get_entropy(config, Some(attr), Some(value));
                subset_entropy += p * e;
            }
        }
        main_entropy - subset_entropy
    }

    pub fn get_best_splitting_attr(&self, config: &TreeConfig) -> Option<String> {
        let mut best: Option<(f64, String)> = None;
        for attr in self.split_attributes() {
            let gain = self.get_gain(config, attr);
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

    pub fn ready_to_split(&self, config: &TreeConfig) -> bool {
        if let Some(threshold) = config.leaf_threshold {
            if config.metric.is_discrete() {
                if let Some(best_prob) = self.class_ddist.best_prob() {
                    if best_prob >= threshold {
                        return false;
                    }
                }
            } else if let Some(var) = self.class_cdist.variance() {
                if var <= threshold {
                    return false;
                }
            }
        }
        config.auto_grow && self.attr_name.is_none() && self.n >= config.splitting_n
    }

    /// Records a leaf distribution for a branch value without materializing
    /// a full child node (the batch builder's shortcut when a subset ran out
    /// of attributes or was already pure).
    pub(crate) fn set_leaf_dist(&mut self, attr_value: Value, dist: LeafDist) {
        let attr_name = self
            .attr_name
            .clone()
            .expect("set_leaf_dist requires a split attribute");
        match dist {
            LeafDist::Continuous(c) => {
                self.attr_value_cdist
                    .entry(attr_name)
                    .or_default()
                    .insert(attr_value, c);
            }
            LeafDist::Discrete(d) => {
                *self
                    .attr_value_counts
                    .entry(attr_name.clone())
                    .or_default()
                    .entry(attr_value.clone())
                    .or_insert(0) += 1;
                *self.attr_value_count_totals.entry(attr_name.clone()).or_insert(0) += 1;
                let per_value = self
                    .attr_class_value_counts
                    .entry(attr_name)
                    .or_default()
                    .entry(attr_value)
                    .or_default();
                for (cls, count) in d.counts() {
                    *per_value.entry(cls.clone()).or_insert(0) += count;
                }
            }
        }
    }

    /// Attaches an already-built child node for a branch value (the batch
    /// builder's path when a subtree is a real subtree, not a leaf shortcut).
    pub(crate) fn attach_branch(&mut self, attr_value: Value, child: Node) {
        self.branches.insert(attr_value, Box::new(child));
    }

    pub fn set_n(&mut self, n: usize) {
        self.n = n;
    }

    pub fn set_attr_name(&mut self, attr_name: String) {
        self.attr_name = Some(attr_name);
    }

    /// Directly assigns this (unsplit) node's marginal distribution. Used
    /// only by the batch builder for the degenerate case where the whole
    /// tree collapses to a single leaf.
    pub(crate) fn set_marginal(&mut self, dist: LeafDist) {
        match dist {
            LeafDist::Discrete(d) => self.class_ddist = d,
            LeafDist::Continuous(c) => self.class_cdist = c,
        }
    }

    /// Incrementally folds one training row into this node's statistics and,
    /// once ready, lazily splits. Returns the net change in leaf count so
    /// the owning [`crate::tree::Tree`] can keep its running total current.
    pub fn update(&mut self, config: &TreeConfig, mut record: Row) -> i64 {
        self.n += 1;
        let class_name = config.schema.class_name().to_string();
        let class_value = record
            .get(&class_name)
            .cloned()
            .expect("row validated against schema upstream");

        if config.metric.is_discrete() {
            self.class_ddist.add(class_value.clone(), 1);
        } else {
            self.class_cdist
                .add(class_value.as_f64().expect("continuous class value"));
        }

        for (attr_name, attr_value) in record.iter() {
            if *attr_name == class_name {
                continue;
            }
            *self
                .attr_value_counts
                .entry(attr_name.clone())
                .or_default()
                .entry(attr_value.clone())
                .or_insert(0) += 1;
            *self
                .attr_value_count_totals
                .entry(attr_name.clone())
                .or_insert(0) += 1;

            if config.metric.is_discrete() {
                let per_value = self
                    .attr_class_value_counts
                    .entry(attr_name.clone())
                    .or_default()
                    .entry(attr_value.clone())
                    .or_default();
                *per_value.entry(class_value.clone()).or_insert(0) += 1;
            } else {
                self.attr_value_cdist
                    .entry(attr_name.clone())
                    .or_default()
                    .entry(attr_value.clone())
                    .or_insert_with(CDist::new)
                    .add(class_value.as_f64().expect("continuous class value"));
            }
        }

        let mut leaf_delta = 0i64;
        if self.attr_name.is_none() && self.ready_to_split(config) {
            if let Some(best_attr) = self.get_best_splitting_attr(config) {
                self.attr_name = Some(best_attr.clone());
                leaf_delta -= 1;
                let values: Vec<Value> = self
                    .attr_value_counts
                    .get(&best_attr)
                    .map(|m| m.keys().cloned().collect())
                    .unwrap_or_default();
                for v in values {
                    self.branches.insert(v, Box::new(Node::new()));
                    leaf_delta += 1;
                }
            }
        }

        if let Some(split_attr) = self.attr_name.clone() {
            if let Some(value) = record.remove(&split_attr) {
                let child = self
                    .branches
                    .entry(value)
                    .or_insert_with(|| Box::new(Node::new()));
                leaf_delta += child.update(config, record);
            }
        }

        leaf_delta
    }

    fn resolve_attribute_value(
        &self,
        config: &TreeConfig,
        attr: &str,
        record: &Row,
    ) -> Result<Value, PredictError> {
        let query = record
            .get(attr)
            .cloned()
            .ok_or_else(|| PredictError::MissingPolicy {
                attr: attr.to_string(),
                value: "<absent>".to_string(),
            })?;

        let known = self.get_values(attr);
        if known.contains(&query) {
            return Ok(query);
        }

        let policy = config
            .missing_value_policy
            .get(attr)
            .ok_or_else(|| PredictError::MissingPolicy {
                attr: attr.to_string(),
                value: query.to_string(),
            })?;

        match policy {
            MissingValuePolicy::UseNearest => {
                let query_f = query
                    .as_f64()
                    .ok_or_else(|| PredictError::MissingPolicy {
                        attr: attr.to_string(),
                        value: query.to_string(),
                    })?;
                known
                    .iter()
                    .filter_map(|v| v.as_f64().map(|f| (f, v)))
                    .min_by(|(a, _), (b, _)| {
                        (a - query_f)
                            .abs()
                            .partial_cmp(&(b - query_f).abs())
                            .unwrap_or(Ordering::Equal)
                    })
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| PredictError::MissingPolicy {
                        attr: attr.to_string(),
                        value: query.to_string(),
                    })
            }
        }
    }

    pub fn predict(&self, config: &TreeConfig, record: &Row) -> Result<LeafDist, PredictError> {
        if !self.ready_to_predict() {
            return Err(PredictError::NotReadyToPredict);
        }

        if let Some(attr) = self.attr_name.clone() {
            let attr_value = self.resolve_attribute_value(config, &attr, record)?;

            if let Some(child) = self.branches.get(&attr_value) {
                match child.predict(config, record) {
                    Ok(dist) => return Ok(dist),
                    Err(PredictError::NotReadyToPredict) => {}
                    Err(e) => return Err(e),
                }
            }

            return Ok(if config.metric.is_discrete() {
                LeafDist::Discrete(self.get_value_ddist(&attr, &attr_value))
            } else {
                LeafDist::Continuous(self.get_value_cdist(&attr, &attr_value))
            });
        }

        Ok(if config.metric.is_discrete() {
            LeafDist::Discrete(self.class_ddist.clone())
        } else {
            LeafDist::Continuous(self.class_cdist.clone())
        })
    }
}

impl MemorySized for Node {
    fn inline_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn extra_heap_size(&self, meter: &mut MemoryMeter) -> usize {
        meter.measure_field(&self.branches)
            + meter.measure_field(&self.attr_name)
            + meter.measure_field(&self.attr_value_counts)
            + meter.measure_field(&self.attr_value_count_totals)
            + meter.measure_field(&self.attr_class_value_counts)
            + meter.measure_field(&self.attr_value_cdist)
            + meter.measure_field(&self.class_ddist)
            + meter.measure_field(&self.class_cdist)
    }
}
