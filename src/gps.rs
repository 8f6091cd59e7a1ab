//! Node addressing: the reference grammar, addressable nodes and the finder
//! that resolves references against them.

mod error;
mod finder;
mod node;
mod reference;

pub use error::GpsError;
pub use finder::Finder;
pub use node::{Context, Node, NodeId, NodeLike};
pub use reference::{Reference, Selector, is_node_reference};
