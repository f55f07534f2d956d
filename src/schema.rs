use crate::error::{RowValidationError, SchemaError};
use crate::utils::memory::{MemoryMeter, MemorySized};
use crate::value::{AttributeType, Value};
use std::collections::HashMap;

/// A single declared row: attribute name to typed value.
pub type Row = HashMap<String, Value>;

/// One attribute slot in a [`Schema`]: its name, declared type, and whether
/// it is the class attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: String,
    pub attr_type: AttributeType,
    pub is_class: bool,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, attr_type: AttributeType, is_class: bool) -> Self {
        Self {
            name: name.into(),
            attr_type,
            is_class,
        }
    }
}

impl MemorySized for AttributeDescriptor {
    fn inline_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn extra_heap_size(&self, meter: &mut MemoryMeter) -> usize {
        meter.measure_field(&self.name)
    }
}

/// Ordered collection of [`AttributeDescriptor`]s with exactly one class
/// attribute.
#[derive(Clone, Debug)]
pub struct Schema {
    attributes: Vec<AttributeDescriptor>,
    class_index: usize,
}

impl Schema {
    /// Build a schema directly from declared attributes. Used by callers
    /// that already know their attribute shape (the engine's own batch/online
    /// entry points); unlike [`Schema::from_header_cells`] this does not
    /// reject non-class continuous attributes.
    pub fn new(attributes: Vec<AttributeDescriptor>) -> Result<Self, SchemaError> {
        let mut class_index = None;
        let mut seen = std::collections::HashSet::new();

        for (i, attr) in attributes.iter().enumerate() {
            if !seen.insert(attr.name.clone()) {
                return Err(SchemaError::DuplicateAttribute(attr.name.clone()));
            }
            if attr.is_class {
                if class_index.is_some() {
                    return Err(SchemaError::DuplicateClass);
                }
                if attr.attr_type == AttributeType::Continuous {
                    return Err(SchemaError::ContinuousClass(attr.name.clone()));
                }
                class_index = Some(i);
            }
        }

        let class_index = class_index.ok_or(SchemaError::MissingClass)?;
        Ok(Self {
            attributes,
            class_index,
        })
    }

    /// Build a schema from CSV-style header cells (`name:type[:class]`),
    /// rejecting any non-class continuous attribute, matching the loader
    /// this engine is designed to be driven by.
    pub fn from_header_cells(cells: &[&str]) -> Result<Self, SchemaError> {
        let mut attributes = Vec::with_capacity(cells.len());
        for cell in cells {
            attributes.push(parse_header_cell(cell)?);
        }
        for attr in &attributes {
            if !attr.is_class && attr.attr_type == AttributeType::Continuous {
                return Err(SchemaError::UnsupportedContinuous(attr.name.clone()));
            }
        }
        Self::new(attributes)
    }

    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn class_attribute(&self) -> &AttributeDescriptor {
        &self.attributes[self.class_index]
    }

    pub fn class_name(&self) -> &str {
        &self.attributes[self.class_index].name
    }

    pub fn non_class_attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter().filter(|a| !a.is_class)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Validate that a row's keys and value types match this schema. Does
    /// not mutate the row; callers that need positional-cell coercion should
    /// use [`Schema::coerce_cells`].
    pub fn validate_row(&self, row: &Row) -> Result<(), RowValidationError> {
        for (name, value) in row {
            let attr = self
                .attribute(name)
                .ok_or_else(|| RowValidationError::UnknownAttribute(name.clone()))?;
            let matches = match (attr.attr_type, value) {
                (AttributeType::Nominal, Value::Nominal(_)) => true,
                (AttributeType::Discrete, Value::Discrete(_)) => true,
                (AttributeType::Continuous, Value::Continuous(_)) => true,
                _ => false,
            };
            if !matches {
                return Err(RowValidationError::NotCoercible {
                    attr: name.clone(),
                    expected_type: attr.attr_type.as_str().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Coerce a positional sequence of raw text cells (zipped with
    /// declaration order) into a typed [`Row`].
    pub fn coerce_cells(&self, cells: &[&str]) -> Result<Row, RowValidationError> {
        if cells.len() != self.attributes.len() {
            return Err(RowValidationError::ArityMismatch {
                expected: self.attributes.len(),
                got: cells.len(),
            });
        }
        let mut row = Row::with_capacity(cells.len());
        for (attr, cell) in self.attributes.iter().zip(cells.iter()) {
            let value = match attr.attr_type {
                AttributeType::Nominal => Value::Nominal((*cell).to_string()),
                AttributeType::Discrete => {
                    let parsed: i64 =
                        cell.parse().map_err(|_| RowValidationError::NotCoercible {
                            attr: attr.name.clone(),
                            expected_type: "discrete".to_string(),
                        })?;
                    Value::Discrete(parsed)
                }
                AttributeType::Continuous => {
                    let parsed: f64 =
                        cell.parse().map_err(|_| RowValidationError::NotCoercible {
                            attr: attr.name.clone(),
                            expected_type: "continuous".to_string(),
                        })?;
                    Value::Continuous(parsed)
                }
            };
            row.insert(attr.name.clone(), value);
        }
        Ok(row)
    }
}

impl MemorySized for Schema {
    fn inline_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn extra_heap_size(&self, meter: &mut MemoryMeter) -> usize {
        meter.measure_field(&self.attributes)
    }
}

/// Parse a single CSV-style header cell of the form `name:type[:class]`.
pub fn parse_header_cell(cell: &str) -> Result<AttributeDescriptor, SchemaError> {
    let parts: Vec<&str> = cell.split(':').collect();
    match parts.as_slice() {
        [name, type_name] => {
            let attr_type = AttributeType::parse(type_name)
                .ok_or_else(|| SchemaError::UnknownType((*type_name).to_string()))?;
            Ok(AttributeDescriptor::new(*name, attr_type, false))
        }
        [name, type_name, class_marker] if *class_marker == "class" => {
            let attr_type = AttributeType::parse(type_name)
                .ok_or_else(|| SchemaError::UnknownType((*type_name).to_string()))?;
            Ok(AttributeDescriptor::new(*name, attr_type, true))
        }
        _ => Err(SchemaError::MalformedHeaderCell(cell.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descr(name: &str, t: AttributeType, class: bool) -> AttributeDescriptor {
        AttributeDescriptor::new(name, t, class)
    }

    #[test]
    fn parses_plain_and_class_cells() {
        let plain = parse_header_cell("Age:discrete").unwrap();
        assert_eq!(plain, descr("Age", AttributeType::Discrete, false));

        let class = parse_header_cell("Outcome:nominal:class").unwrap();
        assert_eq!(class, descr("Outcome", AttributeType::Nominal, true));
    }

    #[test]
    fn rejects_malformed_cells() {
        assert!(parse_header_cell("no-colon").is_err());
        assert!(parse_header_cell("a:b:c:d").is_err());
        assert!(parse_header_cell("a:weird").is_err());
    }

    #[test]
    fn from_header_cells_rejects_non_class_continuous() {
        let err = Schema::from_header_cells(&["x:continuous", "y:nominal:class"]).unwrap_err();
        assert_eq!(err, SchemaError::UnsupportedContinuous("x".to_string()));
    }

    #[test]
    fn new_allows_non_class_continuous() {
        let schema = Schema::new(vec![
            descr("x", AttributeType::Continuous, false),
            descr("y", AttributeType::Nominal, true),
        ])
        .unwrap();
        assert_eq!(schema.class_name(), "y");
    }

    #[test]
    fn requires_exactly_one_class() {
        assert_eq!(
            Schema::new(vec![descr("x", AttributeType::Nominal, false)]).unwrap_err(),
            SchemaError::MissingClass
        );
        assert_eq!(
            Schema::new(vec![
                descr("x", AttributeType::Nominal, true),
                descr("y", AttributeType::Nominal, true),
            ])
            .unwrap_err(),
            SchemaError::DuplicateClass
        );
    }

    #[test]
    fn coerce_cells_produces_typed_row() {
        let schema = Schema::new(vec![
            descr("Age", AttributeType::Discrete, false),
            descr("Outcome", AttributeType::Nominal, true),
        ])
        .unwrap();
        let row = schema.coerce_cells(&["30", "yes"]).unwrap();
        assert_eq!(row.get("Age"), Some(&Value::Discrete(30)));
        assert_eq!(row.get("Outcome"), Some(&Value::Nominal("yes".to_string())));
    }

    #[test]
    fn validate_row_flags_unknown_attribute() {
        let schema = Schema::new(vec![descr("y", AttributeType::Nominal, true)]).unwrap();
        let mut row = Row::new();
        row.insert("z".to_string(), Value::Nominal("x".to_string()));
        assert!(matches!(
            schema.validate_row(&row),
            Err(RowValidationError::UnknownAttribute(_))
        ));
    }
}
