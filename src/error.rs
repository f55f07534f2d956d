use thiserror::Error;

/// Failure building or validating a [`crate::schema::Schema`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("header cell `{0}` is not of the form name:type[:class]")]
    MalformedHeaderCell(String),

    #[error("unknown attribute type `{0}`")]
    UnknownType(String),

    #[error("schema declares no class attribute")]
    MissingClass,

    #[error("schema declares more than one class attribute")]
    DuplicateClass,

    #[error("continuous attribute `{0}` cannot be used as the class attribute")]
    ContinuousClass(String),

    #[error("non-class attribute `{0}` is continuous, which this schema source rejects")]
    UnsupportedContinuous(String),

    #[error("duplicate attribute name `{0}`")]
    DuplicateAttribute(String),
}

/// Failure coercing a row of raw values against a [`crate::schema::Schema`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowValidationError {
    #[error("row has {got} values but schema declares {expected}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),

    #[error("value for attribute `{attr}` is not a valid {expected_type}")]
    NotCoercible { attr: String, expected_type: String },

    #[error("row is missing required class attribute `{0}`")]
    MissingClassValue(String),
}

/// Failure constructing or reconfiguring a [`crate::tree::Tree`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("metric `{metric}` cannot be used with a {class_kind} class attribute")]
    IncompatibleMetric {
        metric: &'static str,
        class_kind: &'static str,
    },

    #[error("unknown missing-value policy `{0}`")]
    UnknownPolicy(String),

    #[error("missing-value policy `use-nearest` cannot be applied to nominal attribute `{0}`")]
    NearestOnNominal(String),
}

/// Failure during prediction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PredictError {
    #[error("tree has not observed any training rows yet")]
    NotReadyToPredict,

    #[error("value `{value}` of split attribute `{attr}` was never observed and no missing-value policy is configured")]
    MissingPolicy { attr: String, value: String },
}
