//! An in-process script runtime whose functions are Rust closures.
//!
//! Functions registered on the runtime are defined in every engine it
//! creates. Functions registered on a [`NativeLibrary`] become available
//! only after the library's URL has been loaded into an engine.

use indexmap::IndexMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use log::trace;

use super::{
    CallFrame, InvocationError, ScriptEngine, ScriptError, ScriptRuntime, ScriptScope,
    ScriptValue,
};

/// A script function implemented in Rust.
pub type NativeFn =
    Arc<dyn Fn(&CallFrame, &ScriptScope) -> Result<ScriptValue, ScriptError> + Send + Sync>;

/// A bundle of functions published under a URL.
#[derive(Clone)]
pub struct NativeLibrary {
    url: String,
    functions: IndexMap<String, NativeFn>,
    load_error: Option<String>,
    loads: Arc<AtomicUsize>,
}

impl NativeLibrary {
    /// Creates an empty library.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            functions: IndexMap::new(),
            load_error: None,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Defines a function provided by this library.
    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&CallFrame, &ScriptScope) -> Result<ScriptValue, ScriptError>
            + Send
            + Sync
            + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    /// Makes every load of this library fail with a script error.
    pub fn fail_on_load(mut self, message: impl Into<String>) -> Self {
        self.load_error = Some(message.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// How many times engines have loaded this library.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("url", &self.url)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("loads", &self.load_count())
            .finish()
    }
}

#[derive(Default)]
struct RuntimeCounters {
    engines_created: AtomicUsize,
    engines_shut_down: AtomicUsize,
    invocations: AtomicUsize,
}

/// A runtime of registered Rust closures.
///
/// # Examples
///
/// ```
/// use aingle_js_rules::{NativeRuntime, ScriptValue};
///
/// let runtime = NativeRuntime::new()
///     .with_function("nothing", |_frame, _scope| Ok(ScriptValue::Undefined));
/// assert!(runtime.has_function("nothing"));
/// ```
#[derive(Default)]
pub struct NativeRuntime {
    functions: IndexMap<String, NativeFn>,
    libraries: IndexMap<String, NativeLibrary>,
    counters: Arc<RuntimeCounters>,
}

impl NativeRuntime {
    /// Creates a runtime with no functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a function available in every engine.
    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&CallFrame, &ScriptScope) -> Result<ScriptValue, ScriptError>
            + Send
            + Sync
            + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    /// Publishes a library under its URL.
    pub fn with_library(mut self, library: NativeLibrary) -> Self {
        self.libraries.insert(library.url.clone(), library);
        self
    }

    /// Returns `true` if a global function with this name is defined.
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// How many times the library under `url` has been loaded.
    pub fn library_loads(&self, url: &str) -> usize {
        self.libraries
            .get(url)
            .map(NativeLibrary::load_count)
            .unwrap_or(0)
    }

    pub fn engines_created(&self) -> usize {
        self.counters.engines_created.load(Ordering::SeqCst)
    }

    pub fn engines_shut_down(&self) -> usize {
        self.counters.engines_shut_down.load(Ordering::SeqCst)
    }

    /// Function invocations across all engines, including failed lookups.
    pub fn invocations(&self) -> usize {
        self.counters.invocations.load(Ordering::SeqCst)
    }
}

impl ScriptRuntime for NativeRuntime {
    fn create_engine(&self) -> Result<Box<dyn ScriptEngine>, ScriptError> {
        self.counters.engines_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(NativeEngine {
            functions: RwLock::new(self.functions.clone()),
            libraries: self.libraries.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }

    fn name(&self) -> &str {
        "native"
    }
}

impl fmt::Debug for NativeRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRuntime")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("libraries", &self.libraries.keys().collect::<Vec<_>>())
            .field("engines_created", &self.engines_created())
            .finish()
    }
}

struct NativeEngine {
    functions: RwLock<IndexMap<String, NativeFn>>,
    libraries: IndexMap<String, NativeLibrary>,
    counters: Arc<RuntimeCounters>,
}

impl ScriptEngine for NativeEngine {
    fn load_library(&self, url: &str) -> Result<(), InvocationError> {
        let library = self
            .libraries
            .get(url)
            .ok_or_else(|| InvocationError::LibraryNotFound(url.to_string()))?;
        library.loads.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &library.load_error {
            return Err(ScriptError::Library {
                url: url.to_string(),
                message: message.clone(),
            }
            .into());
        }

        let mut functions = self
            .functions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for (name, function) in &library.functions {
            functions.insert(name.clone(), Arc::clone(function));
        }
        Ok(())
    }

    fn invoke_function(
        &self,
        name: &str,
        frame: &CallFrame,
        scope: &ScriptScope,
    ) -> Result<ScriptValue, InvocationError> {
        self.counters.invocations.fetch_add(1, Ordering::SeqCst);

        // Clone the handle so the function runs without the table locked.
        let function = self
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| InvocationError::FunctionNotFound(name.to_string()))?;

        trace!("Invoking native function {}", name);
        function(frame, scope).map_err(InvocationError::Script)
    }

    fn shutdown(&self) {
        self.counters.engines_shut_down.fetch_add(1, Ordering::SeqCst);
        self.functions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;

    fn echo_this(frame: &CallFrame, _scope: &ScriptScope) -> Result<ScriptValue, ScriptError> {
        Ok(frame.this().map(ScriptValue::from).unwrap_or_default())
    }

    #[test]
    fn test_invoke_global_function() {
        let runtime = NativeRuntime::new().with_function("echo", echo_this);
        let engine = runtime.create_engine().unwrap();

        let frame = CallFrame::for_focus(&Node::iri("urn:a"));
        let value = engine
            .invoke_function("echo", &frame, &ScriptScope::default())
            .unwrap();
        assert_eq!(value, ScriptValue::Node(Node::iri("urn:a")));
        assert_eq!(runtime.invocations(), 1);
        assert_eq!(runtime.engines_created(), 1);
    }

    #[test]
    fn test_missing_function() {
        let runtime = NativeRuntime::new();
        let engine = runtime.create_engine().unwrap();

        let err = engine
            .invoke_function("nope", &CallFrame::new(), &ScriptScope::default())
            .unwrap_err();
        assert_eq!(err, InvocationError::FunctionNotFound("nope".to_string()));
    }

    #[test]
    fn test_library_functions_need_loading() {
        let runtime = NativeRuntime::new()
            .with_library(NativeLibrary::new("urn:lib:echo").with_function("echo", echo_this));
        let engine = runtime.create_engine().unwrap();
        let frame = CallFrame::new();
        let scope = ScriptScope::default();

        assert!(engine.invoke_function("echo", &frame, &scope).is_err());
        engine.load_library("urn:lib:echo").unwrap();
        assert!(engine.invoke_function("echo", &frame, &scope).is_ok());
        assert_eq!(runtime.library_loads("urn:lib:echo"), 1);
    }

    #[test]
    fn test_failing_library() {
        let runtime = NativeRuntime::new()
            .with_library(NativeLibrary::new("urn:lib:bad").fail_on_load("syntax error"));
        let engine = runtime.create_engine().unwrap();

        let err = engine.load_library("urn:lib:bad").unwrap_err();
        assert!(matches!(
            err,
            InvocationError::Script(ScriptError::Library { ref message, .. }) if message == "syntax error"
        ));
    }

    #[test]
    fn test_thrown_error_passes_through() {
        let runtime = NativeRuntime::new()
            .with_function("fail", |_, _| Err(ScriptError::thrown("fail", "bad input")));
        let engine = runtime.create_engine().unwrap();

        let err = engine
            .invoke_function("fail", &CallFrame::new(), &ScriptScope::default())
            .unwrap_err();
        assert_eq!(err, InvocationError::Script(ScriptError::thrown("fail", "bad input")));
    }

    #[test]
    fn test_shutdown_counts() {
        let runtime = NativeRuntime::new();
        let engine = runtime.create_engine().unwrap();
        engine.shutdown();
        assert_eq!(runtime.engines_shut_down(), 1);
    }
}
