//! Graph storage seen by rules: the `Graph` trait, an in-memory graph and the dataset.

use indexmap::IndexSet;
use std::fmt;
use std::sync::{Arc, RwLock};

use super::{GraphError, GraphResult, Triple, TriplePattern};

/// Read/write access to a set of triples.
///
/// Implementations use interior mutability so a graph can be shared between
/// the engine, the script views wrapping it and the inference sink.
pub trait Graph: Send + Sync {
    /// Finds all triples matching the pattern, in insertion order.
    fn find(&self, pattern: &TriplePattern) -> GraphResult<Vec<Triple>>;

    /// Returns `true` if the graph contains the triple.
    fn contains(&self, triple: &Triple) -> GraphResult<bool>;

    /// Adds a triple. Returns `false` if it was already present.
    fn insert(&self, triple: Triple) -> GraphResult<bool>;

    /// Number of triples in the graph.
    fn len(&self) -> GraphResult<usize>;

    /// Returns `true` if the graph holds no triples.
    fn is_empty(&self) -> GraphResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// An insertion-ordered, duplicate-free in-memory graph.
#[derive(Default)]
pub struct MemoryGraph {
    triples: RwLock<IndexSet<Triple>>,
}

impl MemoryGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph holding the given triples.
    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        Self {
            triples: RwLock::new(triples.into_iter().collect()),
        }
    }

    /// Adds a batch of triples, skipping duplicates. Returns how many were new.
    pub fn insert_batch(&self, triples: impl IntoIterator<Item = Triple>) -> GraphResult<usize> {
        let mut set = self
            .triples
            .write()
            .map_err(|_| GraphError::LockPoisoned)?;
        Ok(triples.into_iter().filter_map(|t| set.insert(t).then_some(())).count())
    }

    /// Returns a snapshot of every triple, in insertion order.
    pub fn triples(&self) -> GraphResult<Vec<Triple>> {
        let set = self.triples.read().map_err(|_| GraphError::LockPoisoned)?;
        Ok(set.iter().cloned().collect())
    }

    /// Removes every triple.
    pub fn clear(&self) -> GraphResult<()> {
        self.triples
            .write()
            .map_err(|_| GraphError::LockPoisoned)?
            .clear();
        Ok(())
    }
}

impl Graph for MemoryGraph {
    fn find(&self, pattern: &TriplePattern) -> GraphResult<Vec<Triple>> {
        let set = self.triples.read().map_err(|_| GraphError::LockPoisoned)?;
        Ok(set.iter().filter(|t| pattern.matches(t)).cloned().collect())
    }

    fn contains(&self, triple: &Triple) -> GraphResult<bool> {
        let set = self.triples.read().map_err(|_| GraphError::LockPoisoned)?;
        Ok(set.contains(triple))
    }

    fn insert(&self, triple: Triple) -> GraphResult<bool> {
        let mut set = self
            .triples
            .write()
            .map_err(|_| GraphError::LockPoisoned)?;
        Ok(set.insert(triple))
    }

    fn len(&self) -> GraphResult<usize> {
        let set = self.triples.read().map_err(|_| GraphError::LockPoisoned)?;
        Ok(set.len())
    }
}

impl fmt::Debug for MemoryGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryGraph")
            .field("len", &self.len().ok())
            .finish()
    }
}

/// The dataset a rule engine operates on.
#[derive(Clone)]
pub struct Dataset {
    default_graph: Arc<dyn Graph>,
}

impl Dataset {
    /// Creates a dataset around an existing default graph.
    pub fn new(default_graph: Arc<dyn Graph>) -> Self {
        Self { default_graph }
    }

    /// Creates a dataset with an empty in-memory default graph.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryGraph::new()))
    }

    /// The default graph: the graph surfaced to scripts as `data` and `shapes`.
    pub fn default_graph(&self) -> Arc<dyn Graph> {
        Arc::clone(&self.default_graph)
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::memory()
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("default_graph_len", &self.default_graph.len().ok())
            .finish()
    }
}
