//! Call frames and ambient scopes handed to an invoked function.

use indexmap::IndexMap;

use super::{GraphViewRef, ScriptError, ScriptValue};
use crate::graph::Node;
use crate::vocab::{DATA_VAR, SHAPES_VAR, THIS_VAR};

/// Named variables passed as the arguments of one function call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallFrame {
    vars: IndexMap<String, ScriptValue>,
}

impl CallFrame {
    /// Creates an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the frame a rule uses: `this` bound to the focus node.
    pub fn for_focus(focus: &Node) -> Self {
        Self::new().bind(THIS_VAR, focus.clone())
    }

    /// Binds a variable, replacing any previous value.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<ScriptValue>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Looks up a variable.
    pub fn get(&self, name: &str) -> Option<&ScriptValue> {
        self.vars.get(name)
    }

    /// The focus node bound as `this`, if any.
    pub fn this(&self) -> Option<&Node> {
        self.get(THIS_VAR).and_then(ScriptValue::as_node)
    }

    /// Iterates over the variables in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScriptValue)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// A value bound on a scripting context rather than passed as an argument.
#[derive(Debug, Clone)]
pub enum Ambient {
    /// A graph exposed through a view.
    Graph(GraphViewRef),
    /// Any other value.
    Value(ScriptValue),
}

/// Snapshot of the ambient bindings visible to one invocation.
#[derive(Debug, Clone, Default)]
pub struct ScriptScope {
    bindings: IndexMap<String, Ambient>,
}

impl ScriptScope {
    pub(crate) fn new(bindings: IndexMap<String, Ambient>) -> Self {
        Self { bindings }
    }

    /// The graph view bound under `name`.
    pub fn graph(&self, name: &str) -> Result<&GraphViewRef, ScriptError> {
        match self.bindings.get(name) {
            Some(Ambient::Graph(view)) => Ok(view),
            _ => Err(ScriptError::Unbound(name.to_string())),
        }
    }

    /// The data graph view.
    pub fn data(&self) -> Result<&GraphViewRef, ScriptError> {
        self.graph(DATA_VAR)
    }

    /// The shapes graph view.
    pub fn shapes(&self) -> Result<&GraphViewRef, ScriptError> {
        self.graph(SHAPES_VAR)
    }

    /// A plain value bound under `name`.
    pub fn value(&self, name: &str) -> Result<&ScriptValue, ScriptError> {
        match self.bindings.get(name) {
            Some(Ambient::Value(value)) => Ok(value),
            _ => Err(ScriptError::Unbound(name.to_string())),
        }
    }

    /// Returns `true` if anything is bound under `name`.
    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}
