use crate::error::ConfigError;
use crate::metrics::Metric;
use crate::schema::Schema;
use crate::value::AttributeType;
use std::collections::HashMap;

/// Rule consulted when prediction-time descent hits an attribute value that
/// was never observed during training.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingValuePolicy {
    /// Descend into the known value numerically closest to the query value.
    /// Only valid for discrete or continuous attributes.
    UseNearest,
}

impl MissingValuePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "use-nearest" => Some(MissingValuePolicy::UseNearest),
            _ => None,
        }
    }
}

/// The shared, non-owned configuration handed to every [`crate::tree::Node`]
/// operation. Nodes never hold a reference back to their owning [`Tree`];
/// instead every method that needs the schema, metric, or thresholds takes
/// a `&TreeConfig` parameter.
///
/// [`Tree`]: crate::tree::Tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub schema: Schema,
    pub metric: Metric,
    pub splitting_n: usize,
    pub leaf_threshold: Option<f64>,
    pub auto_grow: bool,
    pub missing_value_policy: HashMap<String, MissingValuePolicy>,
}

impl TreeConfig {
    pub fn new(schema: Schema, metric: Option<Metric>) -> Result<Self, ConfigError> {
        let class_is_continuous = schema.class_attribute().attr_type == AttributeType::Continuous;
        let metric = metric.unwrap_or(if class_is_continuous {
            Metric::Variance1
        } else {
            Metric::Entropy1
        });
        metric.check_compatible(class_is_continuous)?;

        let leaf_threshold = Some(if class_is_continuous { 0.0 } else { 1.0 });

        Ok(Self {
            schema,
            metric,
            splitting_n: 100,
            leaf_threshold,
            auto_grow: false,
            missing_value_policy: HashMap::new(),
        })
    }

    pub fn class_is_continuous(&self) -> bool {
        self.schema.class_attribute().attr_type == AttributeType::Continuous
    }

    /// Install a missing-value policy, either for a single named attribute
    /// or (when `target` is `None`) for every non-class, non-nominal
    /// attribute. Rejecting `use-nearest` on a named nominal attribute is an
    /// eager `ConfigError`; a blanket install silently skips nominal
    /// attributes, leaving them to fail with `PredictError::MissingPolicy`
    /// at query time if exercised.
    pub fn set_missing_value_policy(
        &mut self,
        policy: MissingValuePolicy,
        target: Option<&str>,
    ) -> Result<(), ConfigError> {
        match target {
            Some(name) => {
                let attr = self
                    .schema
                    .attribute(name)
                    .ok_or_else(|| ConfigError::UnknownPolicy(name.to_string()))?;
                if attr.attr_type == AttributeType::Nominal {
                    return Err(ConfigError::NearestOnNominal(name.to_string()));
                }
                self.missing_value_policy.insert(name.to_string(), policy);
                Ok(())
            }
            None => {
                for attr in self.schema.non_class_attributes() {
                    if attr.attr_type != AttributeType::Nominal {
                        self.missing_value_policy.insert(attr.name.clone(), policy);
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeDescriptor;

    fn schema() -> Schema {
        Schema::new(vec![
            AttributeDescriptor::new("Age", AttributeType::Discrete, false),
            AttributeDescriptor::new("Name", AttributeType::Nominal, false),
            AttributeDescriptor::new("Outcome", AttributeType::Nominal, true),
        ])
        .unwrap()
    }

    #[test]
    fn defaults_match_class_kind() {
        let cfg = TreeConfig::new(schema(), None).unwrap();
        assert_eq!(cfg.metric, Metric::Entropy1);
        assert_eq!(cfg.leaf_threshold, Some(1.0));
        assert!(!cfg.auto_grow);
    }

    #[test]
    fn rejects_incompatible_metric() {
        assert!(TreeConfig::new(schema(), Some(Metric::Variance1)).is_err());
    }

    #[test]
    fn rejects_nearest_on_named_nominal() {
        let mut cfg = TreeConfig::new(schema(), None).unwrap();
        assert_eq!(
            cfg.set_missing_value_policy(MissingValuePolicy::UseNearest, Some("Name"))
                .unwrap_err(),
            ConfigError::NearestOnNominal("Name".to_string())
        );
    }

    #[test]
    fn blanket_install_skips_nominal() {
        let mut cfg = TreeConfig::new(schema(), None).unwrap();
        cfg.set_missing_value_policy(MissingValuePolicy::UseNearest, None)
            .unwrap();
        assert!(cfg.missing_value_policy.contains_key("Age"));
        assert!(!cfg.missing_value_policy.contains_key("Name"));
    }
}
