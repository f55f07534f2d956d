use crate::dist::{CDist, LeafDist};
use crate::error::{ConfigError, PredictError, RowValidationError};
use crate::schema::Row;
use crate::tree::batch::{self, BuildOutcome};
use crate::tree::config::{MissingValuePolicy, TreeConfig};
use crate::tree::node::Node;
use crate::utils::memory::{MemoryMeter, MemorySized};

/// A single grown or built decision tree: owns a root [`Node`] and the
/// [`TreeConfig`] handed down to every node operation.
pub struct Tree {
    config: TreeConfig,
    root: Node,
    leaf_count: usize,
}

impl Tree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: Node::new(),
            leaf_count: 0,
        }
    }

    /// Builds a tree in a single batch over the full training set, using the
    /// ID3-style recursive procedure: at each step pick the attribute with
    /// the highest gain, partition on its observed values, and recurse.
    pub fn build(config: TreeConfig, rows: Vec<Row>) -> Result<Self, RowValidationError> {
        let expected_arity = config.schema.attributes().len();
        for row in &rows {
            config.schema.validate_row(row)?;
            if row.len() != expected_arity {
                return Err(RowValidationError::ArityMismatch {
                    expected: expected_arity,
                    got: row.len(),
                });
            }
        }

        let attributes: Vec<String> = config
            .schema
            .attributes()
            .iter()
            .map(|a| a.name.clone())
            .collect();
        let class_attr = config.schema.class_name().to_string();
        let refs: Vec<&Row> = rows.iter().collect();

        let mut leaf_count = 0usize;
        let outcome = batch::build_recursive(&refs, &attributes, &class_attr, &config, &mut leaf_count);

        let root = match outcome {
            BuildOutcome::Split(node) => node,
            BuildOutcome::Leaf(dist) => {
                let mut node = Node::new();
                node.set_n(rows.len());
                node.set_marginal(dist);
                node
            }
        };

        Ok(Self {
            config,
            root,
            leaf_count,
        })
    }

    /// Folds one row into the tree's online statistics, splitting the
    /// relevant node lazily once it has accumulated enough evidence.
    pub fn update(&mut self, row: Row) -> Result<(), RowValidationError> {
        self.config.schema.validate_row(&row)?;
        let class_name = self.config.schema.class_name();
        if !row.contains_key(class_name) {
            return Err(RowValidationError::MissingClassValue(class_name.to_string()));
        }
        let delta = self.root.update(&self.config, row);
        self.leaf_count = (self.leaf_count as i64 + delta).max(0) as usize;
        Ok(())
    }

    pub fn predict(&self, row: &Row) -> Result<LeafDist, PredictError> {
        self.root.predict(&self.config, row)
    }

    /// Iterates the given rows, predicting each, and aggregates either
    /// mean-absolute error (continuous class) or accuracy (discrete class)
    /// into a running [`CDist`].
    pub fn test(&self, rows: &[Row]) -> Result<CDist, PredictError> {
        let class_name = self.config.schema.class_name();
        let mut agg = CDist::new();
        for row in rows {
            let predicted = self.predict(row)?;
            match predicted {
                LeafDist::Continuous(c) => {
                    let actual = row
                        .get(class_name)
                        .and_then(|v| v.as_f64())
                        .expect("row validated against schema upstream");
                    let predicted_mean = c.mean().unwrap_or(0.0);
                    agg.add((predicted_mean - actual).abs());
                }
                LeafDist::Discrete(d) => {
                    let actual = row
                        .get(class_name)
                        .cloned()
                        .expect("row validated against schema upstream");
                    agg.add(if d.best() == Some(&actual) { 1.0 } else { 0.0 });
                }
            }
        }
        Ok(agg)
    }

    pub fn set_missing_value_policy(
        &mut self,
        policy: MissingValuePolicy,
        target: Option<&str>,
    ) -> Result<(), ConfigError> {
        self.config.set_missing_value_policy(policy, target)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

impl MemorySized for Tree {
    fn inline_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn extra_heap_size(&self, meter: &mut MemoryMeter) -> usize {
        meter.measure_field(&self.root) + meter.measure_field(&self.config.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metric;
    use crate::schema::{AttributeDescriptor, Schema};
    use crate::value::{AttributeType, Value};

    fn nominal_row(pairs: &[(&str, &str)]) -> Row {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.insert((*k).to_string(), Value::Nominal((*v).to_string()));
        }
        row
    }

    #[test]
    fn batch_build_perfectly_classifies_pure_attribute() {
        let schema = Schema::new(vec![
            AttributeDescriptor::new("a", AttributeType::Nominal, false),
            AttributeDescriptor::new("cls", AttributeType::Nominal, true),
        ])
        .unwrap();
        let config = TreeConfig::new(schema, Some(Metric::Entropy1)).unwrap();

        let rows = vec![
            nominal_row(&[("a", "x"), ("cls", "yes")]),
            nominal_row(&[("a", "x"), ("cls", "yes")]),
            nominal_row(&[("a", "y"), ("cls", "no")]),
            nominal_row(&[("a", "y"), ("cls", "no")]),
        ];

        let tree = Tree::build(config, rows.clone()).unwrap();
        for row in &rows {
            let predicted = tree.predict(row).unwrap();
            let expected = row.get("cls").unwrap();
            assert_eq!(predicted.as_discrete().unwrap().best(), Some(expected));
        }
    }

    #[test]
    fn predict_before_any_data_fails() {
        let schema = Schema::new(vec![AttributeDescriptor::new(
            "cls",
            AttributeType::Nominal,
            true,
        )])
        .unwrap();
        let config = TreeConfig::new(schema, None).unwrap();
        let tree = Tree::new(config);
        let mut row = Row::new();
        row.insert("cls".to_string(), Value::Nominal("yes".to_string()));
        assert_eq!(tree.predict(&row).unwrap_err(), PredictError::NotReadyToPredict);
    }

    #[test]
    fn online_update_rejects_row_without_class() {
        let schema = Schema::new(vec![
            AttributeDescriptor::new("a", AttributeType::Nominal, false),
            AttributeDescriptor::new("cls", AttributeType::Nominal, true),
        ])
        .unwrap();
        let config = TreeConfig::new(schema, None).unwrap();
        let mut tree = Tree::new(config);
        let mut row = Row::new();
        row.insert("a".to_string(), Value::Nominal("x".to_string()));
        assert!(matches!(
            tree.update(row),
            Err(RowValidationError::MissingClassValue(_))
        ));
    }

    fn buyer_schema() -> Schema {
        Schema::new(vec![
            AttributeDescriptor::new("Age", AttributeType::Nominal, false),
            AttributeDescriptor::new("Marital Status", AttributeType::Nominal, false),
            AttributeDescriptor::new("Outcome", AttributeType::Nominal, true),
        ])
        .unwrap()
    }

    fn buyer_row(age: &str, marital: &str, outcome: &str) -> Row {
        let mut r = Row::new();
        r.insert("Age".to_string(), Value::Nominal(age.to_string()));
        r.insert("Marital Status".to_string(), Value::Nominal(marital.to_string()));
        r.insert("Outcome".to_string(), Value::Nominal(outcome.to_string()));
        r
    }

    /// Every "under-36" and "over-55" row buys the same way regardless of
    /// marital status (so Age alone resolves them); the "36-55" band is the
    /// only one where marital status still matters, so a correctly built
    /// batch tree must split on Age first and Marital Status second.
    fn buyer_rows() -> Vec<Row> {
        vec![
            buyer_row("under-36", "single", "won't buy"),
            buyer_row("under-36", "single", "won't buy"),
            buyer_row("under-36", "married", "won't buy"),
            buyer_row("over-55", "married", "won't buy"),
            buyer_row("over-55", "married", "won't buy"),
            buyer_row("over-55", "single", "won't buy"),
            buyer_row("36-55", "single", "will buy"),
            buyer_row("36-55", "single", "will buy"),
            buyer_row("36-55", "married", "won't buy"),
            buyer_row("36-55", "married", "won't buy"),
        ]
    }

    #[test]
    fn batch_classification_splits_age_then_marital_status() {
        let config = TreeConfig::new(buyer_schema(), None).unwrap();
        let rows = buyer_rows();
        let tree = Tree::build(config, rows.clone()).unwrap();

        assert_eq!(tree.root().attr_name(), Some("Age"));

        let mut query = Row::new();
        query.insert("Age".to_string(), Value::Nominal("36-55".to_string()));
        query.insert(
            "Marital Status".to_string(),
            Value::Nominal("single".to_string()),
        );
        let predicted = tree.predict(&query).unwrap();
        assert_eq!(
            predicted.as_discrete().unwrap().best(),
            Some(&Value::Nominal("will buy".to_string()))
        );

        let result = tree.test(&rows).unwrap();
        assert!((result.mean().unwrap() - 1.0).abs() < 1e-9);
    }

    /// With no leaf threshold, a regression batch tree keeps splitting on
    /// `uid` (one distinct value per row) until every row sits alone in its
    /// own leaf; installing a threshold large enough to satisfy the root's
    /// own variance collapses the whole tree to a single leaf.
    fn regression_rows() -> Vec<Row> {
        (0..16)
            .map(|i| {
                let mut r = Row::new();
                r.insert("uid".to_string(), Value::Discrete(i));
                r.insert("value".to_string(), Value::Continuous(i as f64));
                r
            })
            .collect()
    }

    fn regression_schema() -> Schema {
        Schema::new(vec![
            AttributeDescriptor::new("uid", AttributeType::Discrete, false),
            AttributeDescriptor::new("value", AttributeType::Continuous, true),
        ])
        .unwrap()
    }

    #[test]
    fn batch_regression_leaf_count_tracks_threshold() {
        let rows = regression_rows();

        let mut config = TreeConfig::new(regression_schema(), None).unwrap();
        config.leaf_threshold = None;
        let tree = Tree::build(config, rows.clone()).unwrap();
        assert_eq!(tree.leaf_count(), rows.len());

        let mut config = TreeConfig::new(regression_schema(), None).unwrap();
        config.leaf_threshold = Some(1000.0);
        let tree = Tree::build(config, rows.clone()).unwrap();
        assert_eq!(tree.leaf_count(), 1);
    }

    /// `a`, `b`, and `c` each perfectly determine the class in
    /// [`super::super::node::tests::four_attr_dataset`]-style data; streamed
    /// online with a splitting threshold above one full pass, the tree
    /// starts out predicting the marginal majority class and only reaches
    /// perfect accuracy once enough evidence accumulates to trigger a split.
    fn dividing_dataset() -> Vec<Row> {
        let raw: &[(i64, i64, &str)] = &[
            (1, 1, "a"),
            (1, 1, "a"),
            (1, 2, "a"),
            (1, 2, "a"),
            (1, 3, "a"),
            (1, 3, "a"),
            (1, 4, "a"),
            (1, 4, "a"),
            (2, 5, "b"),
            (2, 5, "b"),
            (2, 6, "b"),
            (2, 6, "b"),
            (2, 7, "b"),
            (2, 7, "b"),
            (2, 8, "b"),
            (2, 8, "b"),
        ];
        raw.iter()
            .map(|(a, b, cls)| {
                let mut r = Row::new();
                r.insert("a".to_string(), Value::Discrete(*a));
                r.insert("b".to_string(), Value::Discrete(*b));
                r.insert("cls".to_string(), Value::Nominal((*cls).to_string()));
                r
            })
            .collect()
    }

    #[test]
    fn online_tree_grows_from_marginal_guess_to_perfect_accuracy() {
        let schema = Schema::new(vec![
            AttributeDescriptor::new("a", AttributeType::Discrete, false),
            AttributeDescriptor::new("b", AttributeType::Discrete, false),
            AttributeDescriptor::new("cls", AttributeType::Nominal, true),
        ])
        .unwrap();
        let mut config = TreeConfig::new(schema, Some(Metric::Entropy2)).unwrap();
        config.auto_grow = true;
        config.splitting_n = 20;

        let mut tree = Tree::new(config);
        let rows = dividing_dataset();

        for row in &rows {
            tree.update(row.clone()).unwrap();
        }
        let first_pass_accuracy = tree.test(&rows).unwrap().mean().unwrap();
        assert!(first_pass_accuracy < 1.0);

        for _ in 0..5 {
            for row in &rows {
                tree.update(row.clone()).unwrap();
            }
        }
        let grown_accuracy = tree.test(&rows).unwrap().mean().unwrap();
        assert!((grown_accuracy - 1.0).abs() < 1e-9);

        for (_, branch) in tree.root().branches() {
            assert!(!branch.ready_to_split(tree.config()));
        }
    }

    #[test]
    fn missing_value_policy_resolves_nearest_observed_value() {
        let schema = Schema::new(vec![
            AttributeDescriptor::new("a", AttributeType::Discrete, false),
            AttributeDescriptor::new("cls", AttributeType::Nominal, true),
        ])
        .unwrap();
        let mut config = TreeConfig::new(schema, None).unwrap();
        config.auto_grow = true;
        config.splitting_n = 2;
        let mut tree = Tree::new(config);

        let mut r1 = Row::new();
        r1.insert("a".to_string(), Value::Discrete(1));
        r1.insert("cls".to_string(), Value::Nominal("low".to_string()));
        tree.update(r1).unwrap();

        let mut r2 = Row::new();
        r2.insert("a".to_string(), Value::Discrete(100));
        r2.insert("cls".to_string(), Value::Nominal("high".to_string()));
        tree.update(r2).unwrap();

        let mut query = Row::new();
        query.insert("a".to_string(), Value::Discrete(90));
        assert!(matches!(
            tree.predict(&query).unwrap_err(),
            PredictError::MissingPolicy { .. }
        ));

        tree.set_missing_value_policy(MissingValuePolicy::UseNearest, Some("a"))
            .unwrap();
        let predicted = tree.predict(&query).unwrap();
        assert_eq!(
            predicted.as_discrete().unwrap().best(),
            Some(&Value::Nominal("high".to_string()))
        );
    }
}
