//! The graph model rules read from and infer into.

mod node;
mod store;
mod triple;

pub use node::{Literal, Node};
pub use store::{Dataset, Graph, MemoryGraph};
pub use triple::{Triple, TriplePattern};

use thiserror::Error;

/// A specialized `Result` type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Errors raised by graph implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A lock guarding the graph was poisoned by a panicking writer.
    #[error("graph lock poisoned")]
    LockPoisoned,

    /// A storage-specific failure.
    #[error("storage error: {0}")]
    Storage(String),
}
