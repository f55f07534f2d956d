use crate::utils::memory::{MemoryMeter, MemorySized};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Incrementally tracks the probability distribution of a discrete value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DDist {
    counts: HashMap<Value, usize>,
    total: usize,
}

/// Orders values of the same variant so ties in [`DDist::best`] resolve
/// deterministically (mirrors Python's native tuple ordering over
/// `(count, key)` pairs, which the reference relies on).
fn value_rank(v: &Value) -> (u8, Option<&str>, Option<i64>, Option<f64>) {
    match v {
        Value::Nominal(s) => (0, Some(s.as_str()), None, None),
        Value::Discrete(i) => (1, None, Some(*i), None),
        Value::Continuous(f) => (2, None, None, Some(*f)),
    }
}

fn value_cmp(a: &Value, b: &Value) -> Ordering {
    let (ta, sa, ia, fa) = value_rank(a);
    let (tb, sb, ib, fb) = value_rank(b);
    ta.cmp(&tb)
        .then_with(|| sa.cmp(&sb))
        .then_with(|| ia.cmp(&ib))
        .then_with(|| fa.partial_cmp(&fb).unwrap_or(Ordering::Equal))
}

impl DDist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<I: IntoIterator<Item = Value>>(values: I) -> Self {
        let mut dist = Self::new();
        for v in values {
            dist.add(v, 1);
        }
        dist
    }

    pub fn add(&mut self, k: Value, count: usize) {
        *self.counts.entry(k).or_insert(0) += count;
        self.total += count;
    }

    pub fn merge(&mut self, other: &DDist) {
        for (k, c) in &other.counts {
            *self.counts.entry(k.clone()).or_insert(0) += c;
        }
        self.total += other.total;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn probability(&self, k: &Value) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.counts.get(k).copied().unwrap_or(0) as f64 / self.total as f64
    }

    pub fn count_of(&self, k: &Value) -> usize {
        self.counts.get(k).copied().unwrap_or(0)
    }

    pub fn distinct_values(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> impl Iterator<Item = (&Value, &usize)> {
        self.counts.iter()
    }

    pub fn probs(&self) -> Vec<(Value, f64)> {
        self.counts
            .iter()
            .map(|(k, c)| (k.clone(), *c as f64 / self.total as f64))
            .collect()
    }

    /// The value with the highest count, ties broken by the greatest value
    /// of the same variant.
    pub fn best(&self) -> Option<&Value> {
        self.counts
            .iter()
            .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then_with(|| value_cmp(ka, kb)))
            .map(|(k, _)| k)
    }

    pub fn best_prob(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        self.counts
            .values()
            .copied()
            .max()
            .map(|c| c as f64 / self.total as f64)
    }
}

impl MemorySized for DDist {
    fn inline_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn extra_heap_size(&self, meter: &mut MemoryMeter) -> usize {
        meter.measure_field(&self.counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= EPS
    }

    fn nom(s: &str) -> Value {
        Value::Nominal(s.to_string())
    }

    #[test]
    fn add_and_best_basic() {
        let dist = DDist::from_values([nom("a"), nom("a"), nom("b"), nom("c")]);
        assert_eq!(dist.total(), 4);
        assert!(approx_eq(dist.probability(&nom("a")), 0.5));
        assert_eq!(dist.best(), Some(&nom("a")));
        assert!(approx_eq(dist.best_prob().unwrap(), 0.5));
    }

    #[test]
    fn empty_distribution() {
        let dist = DDist::new();
        assert_eq!(dist.total(), 0);
        assert!(approx_eq(dist.probability(&nom("a")), 0.0));
        assert_eq!(dist.best(), None);
        assert_eq!(dist.best_prob(), None);
    }

    #[test]
    fn ties_broken_by_greatest_key() {
        let dist = DDist::from_values([nom("a"), nom("b")]);
        assert_eq!(dist.best(), Some(&nom("b")));
    }

    #[test]
    fn merge_combines_counts() {
        let mut a = DDist::from_values([nom("x"), nom("y")]);
        let b = DDist::from_values([nom("x"), nom("x")]);
        a.merge(&b);
        assert_eq!(a.total(), 4);
        assert_eq!(a.count_of(&nom("x")), 3);
        assert_eq!(a.count_of(&nom("y")), 1);
    }
}
