//! An incremental and batch decision tree engine for mixed-type tabular
//! data: nominal, discrete, and continuous attributes, with either a
//! discrete (classification) or continuous (regression) class attribute.
//!
//! Two training modes are supported: [`tree::Tree::build`] grows a tree in
//! a single ID3-style batch pass over the full dataset, while
//! [`tree::Tree::update`] feeds one row at a time into an online model that
//! lazily splits a node once it has accumulated enough evidence.

pub mod dist;
pub mod error;
pub mod metrics;
pub mod schema;
pub mod tree;
pub mod utils;
pub mod value;

pub use dist::{CDist, DDist, LeafDist};
pub use error::{ConfigError, PredictError, RowValidationError, SchemaError};
pub use metrics::Metric;
pub use schema::{AttributeDescriptor, Row, Schema};
pub use tree::{MissingValuePolicy, Node, Tree, TreeConfig};
pub use value::{AttributeType, Value};
