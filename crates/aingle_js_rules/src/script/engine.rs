//! The function invocation bridge: runtime and engine traits plus their errors.

use thiserror::Error;

use super::{CallFrame, ScriptScope, ScriptValue};
use crate::graph::GraphError;

/// A failure raised by script code itself.
///
/// These errors reach the caller of a rule unchanged so the original
/// diagnostic survives.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// A script function threw.
    #[error("{function} threw: {message}")]
    Thrown { function: String, message: String },

    /// A library script failed while being loaded.
    #[error("library {url} failed: {message}")]
    Library { url: String, message: String },

    /// A graph view was queried after it had been released.
    #[error("graph view '{0}' has been released")]
    ClosedView(String),

    /// A script referenced an ambient variable that is not bound.
    #[error("variable '{0}' is not bound")]
    Unbound(String),

    /// A graph query issued by a script failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ScriptError {
    /// Convenience constructor for a thrown error.
    pub fn thrown(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Thrown {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// The outcome of asking an engine to run something.
///
/// Only [`InvocationError::Script`] is a failure of the script; every other
/// variant is an infrastructure problem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    /// The script ran and failed.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// No function with this name is defined in the context.
    #[error("script function not found: {0}")]
    FunctionNotFound(String),

    /// No library is known under this URL.
    #[error("script library not found: {0}")]
    LibraryNotFound(String),

    /// The engine itself failed.
    #[error("script engine failure: {0}")]
    Engine(String),
}

/// Creates script engines.
///
/// The context manager asks the runtime for a new engine only when an
/// outermost context begins. Nested contexts reuse that engine.
pub trait ScriptRuntime: Send + Sync {
    /// Creates a fresh engine instance.
    fn create_engine(&self) -> Result<Box<dyn ScriptEngine>, ScriptError>;

    /// Name used in log messages.
    fn name(&self) -> &str {
        "script"
    }
}

/// One live engine instance.
///
/// All methods take `&self`: a function running inside the engine may start
/// a nested rule evaluation that reuses the same engine.
pub trait ScriptEngine: Send + Sync {
    /// Loads the library script published under `url`.
    fn load_library(&self, url: &str) -> Result<(), InvocationError>;

    /// Invokes the named function with the given frame and ambient scope.
    fn invoke_function(
        &self,
        name: &str,
        frame: &CallFrame,
        scope: &ScriptScope,
    ) -> Result<ScriptValue, InvocationError>;

    /// Releases engine resources. Called once, when the outermost context ends.
    fn shutdown(&self) {}
}
