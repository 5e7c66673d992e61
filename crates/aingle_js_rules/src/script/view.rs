//! Graph views: scoped adapters exposing a graph to script functions.
//!
//! A [`GraphView`] owns the view and releases it exactly once, either through
//! [`GraphView::release`] or on drop. Scripts only ever see
//! [`GraphViewRef`] handles; once the owner is released every query through
//! a handle fails with [`ScriptError::ClosedView`].

use std::fmt;
use std::sync::{Arc, RwLock};

use log::trace;

use super::{ScriptError, ScriptingContext};
use crate::graph::{Graph, Triple, TriplePattern};

struct ViewInner {
    name: String,
    graph: RwLock<Option<Arc<dyn Graph>>>,
}

/// A clonable handle to a graph view, as stored in ambient bindings.
#[derive(Clone)]
pub struct GraphViewRef {
    inner: Arc<ViewInner>,
}

impl GraphViewRef {
    /// The variable name this view was opened for.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns `true` until the owning view is released.
    pub fn is_open(&self) -> bool {
        self.inner
            .graph
            .read()
            .map(|graph| graph.is_some())
            .unwrap_or(false)
    }

    fn graph(&self) -> Result<Arc<dyn Graph>, ScriptError> {
        let slot = self
            .inner
            .graph
            .read()
            .map_err(|_| ScriptError::ClosedView(self.inner.name.clone()))?;
        slot.as_ref()
            .map(Arc::clone)
            .ok_or_else(|| ScriptError::ClosedView(self.inner.name.clone()))
    }

    /// Finds the triples matching a pattern.
    pub fn find(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, ScriptError> {
        Ok(self.graph()?.find(pattern)?)
    }

    /// Returns `true` if the viewed graph contains the triple.
    pub fn contains(&self, triple: &Triple) -> Result<bool, ScriptError> {
        Ok(self.graph()?.contains(triple)?)
    }

    /// Number of triples in the viewed graph.
    pub fn len(&self) -> Result<usize, ScriptError> {
        Ok(self.graph()?.len()?)
    }

    pub fn is_empty(&self) -> Result<bool, ScriptError> {
        Ok(self.len()? == 0)
    }
}

impl fmt::Debug for GraphViewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphViewRef")
            .field("name", &self.inner.name)
            .field("open", &self.is_open())
            .finish()
    }
}

/// The owning side of a graph view.
pub struct GraphView {
    handle: GraphViewRef,
    context: Arc<ScriptingContext>,
    released: bool,
}

impl GraphView {
    pub(crate) fn open(
        context: Arc<ScriptingContext>,
        name: impl Into<String>,
        graph: Arc<dyn Graph>,
    ) -> Self {
        let name = name.into();
        trace!("Opening graph view '{}'", name);
        context.record_view_opened();
        Self {
            handle: GraphViewRef {
                inner: Arc::new(ViewInner {
                    name,
                    graph: RwLock::new(Some(graph)),
                }),
            },
            context,
            released: false,
        }
    }

    /// A handle for binding into a scripting context.
    pub fn handle(&self) -> GraphViewRef {
        self.handle.clone()
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Releases the view. Returns `false` if it was already released.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;

        // A poisoned slot still gets cleared.
        let mut slot = self
            .handle
            .inner
            .graph
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        slot.take();
        drop(slot);

        trace!("Released graph view '{}'", self.handle.name());
        self.context.record_view_released();
        true
    }
}

impl Drop for GraphView {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for GraphView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphView")
            .field("name", &self.handle.name())
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MemoryGraph, Node};
    use crate::script::NativeRuntime;

    fn context() -> Arc<ScriptingContext> {
        Arc::new(ScriptingContext::new(&NativeRuntime::new()).unwrap())
    }

    fn graph() -> Arc<dyn Graph> {
        Arc::new(MemoryGraph::from_triples(vec![Triple::new(
            Node::iri("urn:a"),
            Node::iri("urn:p"),
            Node::iri("urn:b"),
        )]))
    }

    #[test]
    fn test_view_queries_while_open() {
        let view = GraphView::open(context(), "data", graph());
        let handle = view.handle();

        assert!(handle.is_open());
        assert_eq!(handle.len().unwrap(), 1);
        assert_eq!(handle.find(&TriplePattern::any()).unwrap().len(), 1);
    }

    #[test]
    fn test_release_exactly_once() {
        let ctx = context();
        let mut view = GraphView::open(Arc::clone(&ctx), "data", graph());
        let handle = view.handle();

        assert!(view.release());
        assert!(!view.release());
        drop(view);

        assert_eq!(ctx.views_opened(), 1);
        assert_eq!(ctx.views_released(), 1);
        assert!(!handle.is_open());
        assert_eq!(
            handle.len(),
            Err(ScriptError::ClosedView("data".to_string()))
        );
    }

    #[test]
    fn test_drop_releases() {
        let ctx = context();
        {
            let _view = GraphView::open(Arc::clone(&ctx), "shapes", graph());
            assert_eq!(ctx.open_views(), 1);
        }
        assert_eq!(ctx.open_views(), 0);
    }
}
