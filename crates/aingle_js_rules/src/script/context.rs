//! Reentrant scripting contexts.
//!
//! A [`ContextManager`] hands out one [`ScriptingContext`] per thread. The
//! first `begin` on a thread creates the context and returns `true`; nested
//! `begin` calls reuse it and return `false`. Each `end` lowers the
//! thread's nesting depth, and the context is torn down by whichever `end`
//! brings it back to zero, even one passed `false`. Such an `end(false)`,
//! or an `end(true)` with entries still open, is logged as a mismatch.
//!
//! Contexts belong to the thread that entered them, so [`ContextGuard`] and
//! [`AmbientBinding`] cannot be sent to another thread.
//!
//! ```
//! use std::sync::Arc;
//! use aingle_js_rules::{ContextManager, NativeRuntime};
//!
//! let manager = ContextManager::new(Arc::new(NativeRuntime::new()));
//! let outer = manager.begin().unwrap();
//! let inner = manager.begin().unwrap();
//! assert!(outer && !inner);
//!
//! manager.end(inner);
//! assert!(manager.is_active());
//! manager.end(outer);
//! assert!(!manager.is_active());
//! ```

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use thiserror::Error;

use super::{
    Ambient, CallFrame, GraphView, InvocationError, ScriptEngine, ScriptError, ScriptRuntime,
    ScriptScope, ScriptValue,
};
use crate::graph::Graph;

/// Default limit on nested `begin` calls per thread.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 16;

/// Errors raised while acquiring a scripting context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    /// Too many nested evaluations are active on this thread.
    #[error("scripting context nesting too deep: {depth} active, max {max}")]
    NestingTooDeep { depth: usize, max: usize },

    /// `current_context` was called outside any `begin`/`end` pair.
    #[error("no active scripting context on this thread")]
    NoActiveContext,

    /// The runtime could not create an engine.
    #[error("failed to create script engine: {0}")]
    Engine(#[from] ScriptError),
}

/// Library scripts a rule needs loaded before its function runs.
///
/// Dependencies in `libraries` are loaded first, depth-first, then `urls`
/// in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLibrary {
    /// Script URLs published by this library.
    #[serde(default)]
    pub urls: Vec<String>,
    /// Libraries this one depends on.
    #[serde(default)]
    pub libraries: Vec<ScriptLibrary>,
}

impl ScriptLibrary {
    /// A library with a single script URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            libraries: Vec::new(),
        }
    }

    /// Adds a script URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    /// Adds a dependency.
    pub fn with_dependency(mut self, library: ScriptLibrary) -> Self {
        self.libraries.push(library);
        self
    }
}

/// One engine instance plus everything bound on it for an evaluation tree.
pub struct ScriptingContext {
    engine: Box<dyn ScriptEngine>,
    bindings: RwLock<IndexMap<String, Ambient>>,
    loaded: Mutex<IndexSet<String>>,
    views_opened: AtomicUsize,
    views_released: AtomicUsize,
}

impl ScriptingContext {
    /// Creates a context around a new engine from `runtime`.
    pub fn new(runtime: &dyn ScriptRuntime) -> Result<Self, ScriptError> {
        Ok(Self {
            engine: runtime.create_engine()?,
            bindings: RwLock::new(IndexMap::new()),
            loaded: Mutex::new(IndexSet::new()),
            views_opened: AtomicUsize::new(0),
            views_released: AtomicUsize::new(0),
        })
    }

    /// Opens a view of `graph` owned by the caller.
    pub fn open_view(
        self: &Arc<Self>,
        name: impl Into<String>,
        graph: Arc<dyn Graph>,
    ) -> GraphView {
        GraphView::open(Arc::clone(self), name, graph)
    }

    /// Binds an ambient variable until the returned guard is dropped.
    ///
    /// Dropping the guard restores whatever was bound before.
    pub fn bind_ambient(&self, name: impl Into<String>, value: Ambient) -> AmbientBinding<'_> {
        let name = name.into();
        let previous = self.write_bindings().insert(name.clone(), value);
        AmbientBinding {
            context: self,
            name,
            previous,
            _not_send: PhantomData,
        }
    }

    /// Binds a view under its own name.
    pub fn bind_view(&self, view: &GraphView) -> AmbientBinding<'_> {
        self.bind_ambient(view.name().to_string(), Ambient::Graph(view.handle()))
    }

    /// A snapshot of the current ambient bindings.
    pub fn scope(&self) -> ScriptScope {
        let bindings = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        ScriptScope::new(bindings.clone())
    }

    /// Loads libraries and their dependencies. Returns how many URLs were new.
    pub fn load_libraries(&self, libraries: &[ScriptLibrary]) -> Result<usize, InvocationError> {
        let mut loaded = 0;
        for library in libraries {
            loaded += self.load_libraries(&library.libraries)?;
            for url in &library.urls {
                if self.load_url(url)? {
                    loaded += 1;
                }
            }
        }
        Ok(loaded)
    }

    /// Loads a single script URL unless this context already has it.
    pub fn load_url(&self, url: &str) -> Result<bool, InvocationError> {
        if self.is_loaded(url) {
            return Ok(false);
        }
        trace!("Loading script library {}", url);
        self.engine.load_library(url)?;
        Ok(self.lock_loaded().insert(url.to_string()))
    }

    /// Returns `true` if the URL has been loaded into this context.
    pub fn is_loaded(&self, url: &str) -> bool {
        self.lock_loaded().contains(url)
    }

    /// Loaded URLs in load order.
    pub fn loaded_libraries(&self) -> Vec<String> {
        self.lock_loaded().iter().cloned().collect()
    }

    /// Invokes a function with the current ambient bindings.
    ///
    /// No lock is held while the function runs.
    pub fn invoke(&self, function: &str, frame: &CallFrame) -> Result<ScriptValue, InvocationError> {
        let scope = self.scope();
        self.engine.invoke_function(function, frame, &scope)
    }

    /// Views opened in this context so far.
    pub fn views_opened(&self) -> usize {
        self.views_opened.load(Ordering::SeqCst)
    }

    /// Views released in this context so far.
    pub fn views_released(&self) -> usize {
        self.views_released.load(Ordering::SeqCst)
    }

    /// Views opened but not yet released.
    pub fn open_views(&self) -> usize {
        self.views_opened().saturating_sub(self.views_released())
    }

    pub(crate) fn record_view_opened(&self) {
        self.views_opened.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_view_released(&self) {
        self.views_released.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown(&self) {
        let open = self.open_views();
        if open > 0 {
            warn!("Scripting context torn down with {} open graph views", open);
        }
        self.write_bindings().clear();
        self.engine.shutdown();
    }

    fn write_bindings(&self) -> std::sync::RwLockWriteGuard<'_, IndexMap<String, Ambient>> {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_loaded(&self) -> MutexGuard<'_, IndexSet<String>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ScriptingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptingContext")
            .field("loaded", &self.loaded_libraries())
            .field("views_opened", &self.views_opened())
            .field("views_released", &self.views_released())
            .finish()
    }
}

/// Restores an ambient binding when dropped.
#[must_use = "the binding is removed again when the guard is dropped"]
pub struct AmbientBinding<'a> {
    context: &'a ScriptingContext,
    name: String,
    previous: Option<Ambient>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for AmbientBinding<'_> {
    fn drop(&mut self) {
        let mut bindings = self.context.write_bindings();
        match self.previous.take() {
            Some(previous) => {
                bindings.insert(std::mem::take(&mut self.name), previous);
            }
            None => {
                bindings.shift_remove(&self.name);
            }
        }
    }
}

/// Counters describing context manager activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Outermost contexts created.
    pub contexts_created: usize,
    /// Contexts torn down.
    pub contexts_destroyed: usize,
    /// `begin` calls that reused an active context.
    pub nested_entries: usize,
    /// Deepest nesting observed.
    pub max_depth_seen: usize,
    /// `begin` calls rejected for nesting too deep.
    pub rejected_entries: usize,
}

struct ActiveContext {
    context: Arc<ScriptingContext>,
    depth: usize,
}

struct ManagerInner {
    runtime: Arc<dyn ScriptRuntime>,
    max_depth: usize,
    active: Mutex<HashMap<ThreadId, ActiveContext>>,
    stats: Mutex<ContextStats>,
}

/// Hands out reentrant scripting contexts, one per thread.
///
/// Cloning is cheap and every clone shares the same state, so a script
/// function can begin a nested evaluation on the manager that started it.
#[derive(Clone)]
pub struct ContextManager {
    inner: Arc<ManagerInner>,
}

impl ContextManager {
    /// Creates a manager with the default nesting limit.
    pub fn new(runtime: Arc<dyn ScriptRuntime>) -> Self {
        Self::with_max_nesting_depth(runtime, DEFAULT_MAX_NESTING_DEPTH)
    }

    /// Creates a manager that rejects nesting deeper than `max_depth`.
    pub fn with_max_nesting_depth(runtime: Arc<dyn ScriptRuntime>, max_depth: usize) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                runtime,
                max_depth,
                active: Mutex::new(HashMap::new()),
                stats: Mutex::new(ContextStats::default()),
            }),
        }
    }

    /// Enters a context on the current thread.
    ///
    /// Returns `true` if a new context was created, `false` if an active one
    /// was reused. Every call must be paired with [`end`](Self::end).
    pub fn begin(&self) -> Result<bool, ContextError> {
        let thread = thread::current().id();
        let max = self.inner.max_depth;

        if let Some(entry) = self.lock_active().get_mut(&thread) {
            if entry.depth >= max {
                self.lock_stats().rejected_entries += 1;
                return Err(ContextError::NestingTooDeep {
                    depth: entry.depth,
                    max,
                });
            }
            entry.depth += 1;
            let depth = entry.depth;

            let mut stats = self.lock_stats();
            stats.nested_entries += 1;
            stats.max_depth_seen = stats.max_depth_seen.max(depth);
            debug!("Reusing scripting context at depth {}", depth);
            return Ok(false);
        }

        // Engine creation runs without the map locked. Only this thread can
        // insert its own entry, so nothing races us here.
        let context = Arc::new(ScriptingContext::new(self.inner.runtime.as_ref())?);
        self.lock_active()
            .insert(thread, ActiveContext { context, depth: 1 });

        let mut stats = self.lock_stats();
        stats.contexts_created += 1;
        stats.max_depth_seen = stats.max_depth_seen.max(1);
        debug!(
            "Created {} scripting context on {:?}",
            self.inner.runtime.name(),
            thread
        );
        Ok(true)
    }

    /// Leaves a context entered with [`begin`](Self::begin).
    ///
    /// Pass the value `begin` returned. The context is torn down once the
    /// last entry on this thread ends.
    pub fn end(&self, fresh: bool) {
        let thread = thread::current().id();

        let finished = {
            let mut active = self.lock_active();
            let Some(entry) = active.get_mut(&thread) else {
                warn!("Scripting context ended on {:?} without a matching begin", thread);
                return;
            };

            entry.depth -= 1;
            if entry.depth > 0 {
                if fresh {
                    warn!(
                        "Outermost scripting context ended with {} nested entries still open",
                        entry.depth
                    );
                }
                return;
            }
            if !fresh {
                warn!("Nested scripting context was the last to end on {:?}", thread);
            }
            active.remove(&thread)
        };

        if let Some(entry) = finished {
            entry.context.shutdown();
            self.lock_stats().contexts_destroyed += 1;
            debug!("Tore down scripting context on {:?}", thread);
        }
    }

    /// Enters a context and returns a guard that ends it on drop.
    pub fn enter(&self) -> Result<ContextGuard, ContextError> {
        let fresh = self.begin()?;
        let context = match self.current_context() {
            Ok(context) => context,
            Err(err) => {
                self.end(fresh);
                return Err(err);
            }
        };
        Ok(ContextGuard {
            manager: self.clone(),
            context,
            fresh,
            _not_send: PhantomData,
        })
    }

    /// The context active on the current thread.
    pub fn current_context(&self) -> Result<Arc<ScriptingContext>, ContextError> {
        self.lock_active()
            .get(&thread::current().id())
            .map(|entry| Arc::clone(&entry.context))
            .ok_or(ContextError::NoActiveContext)
    }

    /// Nesting depth on the current thread. Zero when no context is active.
    pub fn depth(&self) -> usize {
        self.lock_active()
            .get(&thread::current().id())
            .map(|entry| entry.depth)
            .unwrap_or(0)
    }

    /// Returns `true` if the current thread has an active context.
    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    /// The configured nesting limit.
    pub fn max_nesting_depth(&self) -> usize {
        self.inner.max_depth
    }

    pub fn stats(&self) -> ContextStats {
        self.lock_stats().clone()
    }

    fn lock_active(&self) -> MutexGuard<'_, HashMap<ThreadId, ActiveContext>> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_stats(&self) -> MutexGuard<'_, ContextStats> {
        self.inner
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextManager")
            .field("runtime", &self.inner.runtime.name())
            .field("max_depth", &self.inner.max_depth)
            .field("stats", &self.stats())
            .finish()
    }
}

/// An entered context. Dropping the guard ends it.
///
/// The guard ends the context of the thread it is dropped on, so it must
/// stay on the thread that entered it:
///
/// ```compile_fail
/// use std::sync::Arc;
/// use aingle_js_rules::{ContextManager, NativeRuntime};
///
/// let manager = ContextManager::new(Arc::new(NativeRuntime::new()));
/// let guard = manager.enter().unwrap();
/// std::thread::spawn(move || drop(guard));
/// ```
#[must_use = "the context ends as soon as the guard is dropped"]
pub struct ContextGuard {
    manager: ContextManager,
    context: Arc<ScriptingContext>,
    fresh: bool,
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    /// The active context.
    pub fn context(&self) -> &Arc<ScriptingContext> {
        &self.context
    }

    /// Returns `true` if this guard created the context.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.manager.end(self.fresh);
    }
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGuard")
            .field("fresh", &self.fresh)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use crate::script::{NativeLibrary, NativeRuntime};

    fn manager() -> ContextManager {
        ContextManager::new(Arc::new(NativeRuntime::new()))
    }

    #[test]
    fn test_nesting_tears_down_once() {
        let manager = manager();

        assert!(manager.begin().unwrap());
        assert!(!manager.begin().unwrap());
        assert_eq!(manager.depth(), 2);

        manager.end(false);
        assert!(manager.is_active());
        assert_eq!(manager.stats().contexts_destroyed, 0);

        manager.end(true);
        assert!(!manager.is_active());

        let stats = manager.stats();
        assert_eq!(stats.contexts_created, 1);
        assert_eq!(stats.contexts_destroyed, 1);
        assert_eq!(stats.nested_entries, 1);
        assert_eq!(stats.max_depth_seen, 2);
    }

    #[test]
    fn test_nested_entries_share_context() {
        let manager = manager();
        let outer = manager.enter().unwrap();
        let inner = manager.enter().unwrap();

        assert!(outer.is_fresh());
        assert!(!inner.is_fresh());
        assert!(Arc::ptr_eq(outer.context(), inner.context()));
    }

    #[test]
    fn test_guard_drop_ends_context() {
        let manager = manager();
        {
            let _guard = manager.enter().unwrap();
            assert!(manager.current_context().is_ok());
        }
        assert_eq!(
            manager.current_context().unwrap_err(),
            ContextError::NoActiveContext
        );
    }

    #[test]
    fn test_nesting_limit() {
        let manager = ContextManager::with_max_nesting_depth(Arc::new(NativeRuntime::new()), 2);
        let _a = manager.enter().unwrap();
        let _b = manager.enter().unwrap();

        let err = manager.enter().unwrap_err();
        assert_eq!(err, ContextError::NestingTooDeep { depth: 2, max: 2 });
        assert_eq!(manager.depth(), 2);
        assert_eq!(manager.stats().rejected_entries, 1);
    }

    #[test]
    fn test_unmatched_end_is_ignored() {
        let manager = manager();
        manager.end(true);
        assert_eq!(manager.stats().contexts_destroyed, 0);
    }

    #[test]
    fn test_teardown_follows_depth() {
        let manager = manager();
        let outer = manager.begin().unwrap();
        let inner = manager.begin().unwrap();

        // Ended out of order: the outermost end only lowers the depth.
        manager.end(outer);
        assert!(manager.is_active());
        assert_eq!(manager.stats().contexts_destroyed, 0);

        manager.end(inner);
        assert!(!manager.is_active());
        assert_eq!(manager.stats().contexts_destroyed, 1);
    }

    #[test]
    fn test_guard_dropped_on_entering_thread() {
        let manager = manager();
        let other = manager.clone();

        std::thread::spawn(move || {
            let guard = other.enter().unwrap();
            assert!(guard.is_fresh());
            drop(guard);
            assert!(!other.is_active());
        })
        .join()
        .unwrap();

        let stats = manager.stats();
        assert_eq!(stats.contexts_created, 1);
        assert_eq!(stats.contexts_destroyed, 1);
    }

    #[test]
    fn test_threads_are_isolated() {
        let manager = manager();
        let _guard = manager.enter().unwrap();

        let other = manager.clone();
        std::thread::spawn(move || {
            assert!(!other.is_active());
            let guard = other.enter().unwrap();
            assert!(guard.is_fresh());
        })
        .join()
        .unwrap();

        assert_eq!(manager.depth(), 1);
        assert_eq!(manager.stats().contexts_created, 2);
    }

    #[test]
    fn test_ambient_binding_restores_previous() {
        let manager = manager();
        let guard = manager.enter().unwrap();
        let context = guard.context();

        let outer = context.bind_ambient("limit", Ambient::Value(ScriptValue::from(1i64)));
        {
            let _inner = context.bind_ambient("limit", Ambient::Value(ScriptValue::from(2i64)));
            assert_eq!(context.scope().value("limit"), Ok(&ScriptValue::Number(2.0)));
        }
        assert_eq!(context.scope().value("limit"), Ok(&ScriptValue::Number(1.0)));
        drop(outer);
        assert!(!context.scope().is_bound("limit"));
    }

    #[test]
    fn test_bind_view_by_name() {
        let manager = manager();
        let guard = manager.enter().unwrap();
        let context = guard.context();

        let view = context.open_view("data", Arc::new(MemoryGraph::new()));
        let _binding = context.bind_view(&view);
        assert!(context.scope().data().unwrap().is_open());
    }

    #[test]
    fn test_libraries_load_once_dependencies_first() {
        let runtime = NativeRuntime::new()
            .with_library(NativeLibrary::new("urn:lib:base"))
            .with_library(NativeLibrary::new("urn:lib:app"));
        let manager = ContextManager::new(Arc::new(runtime));
        let guard = manager.enter().unwrap();

        let library = ScriptLibrary::url("urn:lib:app")
            .with_dependency(ScriptLibrary::url("urn:lib:base"));

        let context = guard.context();
        assert_eq!(context.load_libraries(std::slice::from_ref(&library)).unwrap(), 2);
        assert_eq!(context.load_libraries(&[library]).unwrap(), 0);
        assert_eq!(
            context.loaded_libraries(),
            vec!["urn:lib:base".to_string(), "urn:lib:app".to_string()]
        );
    }

    #[test]
    fn test_unknown_library() {
        let manager = manager();
        let guard = manager.enter().unwrap();

        let err = guard
            .context()
            .load_libraries(&[ScriptLibrary::url("urn:lib:missing")])
            .unwrap_err();
        assert_eq!(err, InvocationError::LibraryNotFound("urn:lib:missing".to_string()));
        assert!(!guard.context().is_loaded("urn:lib:missing"));
    }

    #[test]
    fn test_library_serde() {
        let library: ScriptLibrary = serde_json::from_str(
            r#"{"urls": ["urn:lib:a"], "libraries": [{"urls": ["urn:lib:b"]}]}"#,
        )
        .unwrap();
        assert_eq!(library.libraries[0].urls, vec!["urn:lib:b".to_string()]);
    }
}
