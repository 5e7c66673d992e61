//! Values exchanged with script functions.
//!
//! `ScriptValue` mirrors the dynamic values a scripting runtime hands back:
//! primitives, arrays, plain objects and wrapped graph nodes.

use indexmap::IndexMap;
use std::fmt;

use crate::graph::Node;

/// A dynamically typed value produced or consumed by a script function.
///
/// # Examples
///
/// ```
/// use aingle_js_rules::{Node, ScriptValue};
///
/// let triple = ScriptValue::triple(
///     Node::iri("urn:alice"),
///     Node::iri("urn:knows"),
///     Node::iri("urn:bob"),
/// );
/// assert!(triple.is_array_like());
/// assert_eq!(triple.as_array().map(|a| a.len()), Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScriptValue {
    /// The absence of a value (`undefined`).
    #[default]
    Undefined,
    /// `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. Scripts do not distinguish integers from floats.
    Number(f64),
    /// A string.
    String(String),
    /// A finite ordered sequence.
    Array(Vec<ScriptValue>),
    /// A plain object with named fields, in insertion order.
    Object(IndexMap<String, ScriptValue>),
    /// A graph node wrapped for the scripting side.
    Node(Node),
}

impl ScriptValue {
    /// Builds a positional `[subject, predicate, object]` triple.
    pub fn triple(
        subject: impl Into<ScriptValue>,
        predicate: impl Into<ScriptValue>,
        object: impl Into<ScriptValue>,
    ) -> Self {
        Self::Array(vec![subject.into(), predicate.into(), object.into()])
    }

    /// Builds a `{subject, predicate, object}` triple object.
    pub fn labeled_triple(
        subject: impl Into<ScriptValue>,
        predicate: impl Into<ScriptValue>,
        object: impl Into<ScriptValue>,
    ) -> Self {
        let mut fields = IndexMap::with_capacity(3);
        fields.insert("subject".to_string(), subject.into());
        fields.insert("predicate".to_string(), predicate.into());
        fields.insert("object".to_string(), object.into());
        Self::Object(fields)
    }

    /// Builds an object from `(name, value)` pairs.
    pub fn object<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ScriptValue>,
    {
        Self::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns `true` for `undefined` and `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Returns `true` if the value is a finite ordered sequence.
    pub fn is_array_like(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Returns the elements if the value is array-like.
    pub fn as_array(&self) -> Option<&[ScriptValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the fields if the value is a plain object.
    pub fn as_object(&self) -> Option<&IndexMap<String, ScriptValue>> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Looks up a field of a plain object.
    pub fn get(&self, field: &str) -> Option<&ScriptValue> {
        self.as_object().and_then(|fields| fields.get(field))
    }

    /// Returns the string if the value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the wrapped node if the value is a node handle.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// A short name of the value's shape, used in diagnostics.
    pub fn kind(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(_) => "boolean".to_string(),
            Self::Number(_) => "number".to_string(),
            Self::String(_) => "string".to_string(),
            Self::Array(items) => format!("array of {}", items.len()),
            Self::Object(_) => "object".to_string(),
            Self::Node(_) => "node".to_string(),
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Object(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            Self::Node(node) => write!(f, "{}", node),
        }
    }
}

impl From<Node> for ScriptValue {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<&Node> for ScriptValue {
    fn from(node: &Node) -> Self {
        Self::Node(node.clone())
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for ScriptValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for ScriptValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<Vec<ScriptValue>> for ScriptValue {
    fn from(items: Vec<ScriptValue>) -> Self {
        Self::Array(items)
    }
}

impl<T: Into<ScriptValue>> From<Option<T>> for ScriptValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Undefined)
    }
}

impl From<serde_json::Value> for ScriptValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(fields) => Self::Object(
                fields
                    .into_iter()
                    .map(|(name, value)| (name, value.into()))
                    .collect(),
            ),
        }
    }
}
