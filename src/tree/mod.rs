mod batch;
mod config;
mod node;
#[allow(clippy::module_inception)]
mod tree;

pub use config::{MissingValuePolicy, TreeConfig};
pub use node::Node;
pub use tree::Tree;
