use crate::utils::memory::{MemoryMeter, MemorySized};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The type an [`crate::schema::Schema`] attribute is declared as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Nominal,
    Discrete,
    Continuous,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Nominal => "nominal",
            AttributeType::Discrete => "discrete",
            AttributeType::Continuous => "continuous",
        }
    }

    pub fn parse(s: &str) -> Option<AttributeType> {
        match s {
            "nominal" => Some(AttributeType::Nominal),
            "discrete" => Some(AttributeType::Discrete),
            "continuous" => Some(AttributeType::Continuous),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attribute value, typed according to the schema's declaration for
/// that attribute.
///
/// `Continuous` compares and hashes by the bit pattern of its `f64` rather
/// than by numeric equality, so two `NaN`s are equal to each other but not to
/// `0.0 / 0.0`'s numeric neighbours, matching how the reference
/// implementation relies on native float hashing to key its count maps.
#[derive(Clone, Debug)]
pub enum Value {
    Nominal(String),
    Discrete(i64),
    Continuous(f64),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nominal(_) => "nominal",
            Value::Discrete(_) => "discrete",
            Value::Continuous(_) => "continuous",
        }
    }

    /// Numeric projection used by the `use-nearest` missing-value policy.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Discrete(i) => Some(*i as f64),
            Value::Continuous(f) => Some(*f),
            Value::Nominal(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nominal(s) => f.write_str(s),
            Value::Discrete(i) => write!(f, "{i}"),
            Value::Continuous(x) => write!(f, "{x}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nominal(a), Value::Nominal(b)) => a == b,
            (Value::Discrete(a), Value::Discrete(b)) => a == b,
            (Value::Continuous(a), Value::Continuous(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Nominal(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Value::Discrete(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            Value::Continuous(x) => {
                2u8.hash(state);
                x.to_bits().hash(state);
            }
        }
    }
}

impl MemorySized for Value {
    fn inline_size(&self) -> usize {
        std::mem::size_of::<Value>()
    }

    fn extra_heap_size(&self, meter: &mut MemoryMeter) -> usize {
        match self {
            Value::Nominal(s) => meter.measure_field(s),
            Value::Discrete(_) | Value::Continuous(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_equality_is_bitwise() {
        assert_eq!(Value::Continuous(1.0), Value::Continuous(1.0));
        assert_ne!(Value::Continuous(f64::NAN), Value::Continuous(0.0));
        let nan = Value::Continuous(f64::NAN);
        assert_ne!(nan, Value::Continuous(f64::NAN.copysign(-1.0)));
    }

    #[test]
    fn discrete_and_nominal_never_equal() {
        assert_ne!(Value::Discrete(1), Value::Nominal("1".to_string()));
    }

    #[test]
    fn parses_known_type_names() {
        assert_eq!(AttributeType::parse("nominal"), Some(AttributeType::Nominal));
        assert_eq!(AttributeType::parse("discrete"), Some(AttributeType::Discrete));
        assert_eq!(AttributeType::parse("continuous"), Some(AttributeType::Continuous));
        assert_eq!(AttributeType::parse("bogus"), None);
    }
}
