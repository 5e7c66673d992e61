//! Triples and triple patterns.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Node;

/// A `(subject, predicate, object)` fact.
///
/// This is the unit a rule hands to the engine's inference sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    /// The subject.
    pub subject: Node,
    /// The predicate.
    pub predicate: Node,
    /// The object.
    pub object: Node,
}

impl Triple {
    /// Creates a new triple.
    pub fn new(subject: Node, predicate: Node, object: Node) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A pattern for matching triples. `None` acts as a wildcard.
///
/// # Examples
///
/// ```
/// use aingle_js_rules::{Node, Triple, TriplePattern};
///
/// let pattern = TriplePattern::any().with_subject(Node::iri("urn:alice"));
/// let triple = Triple::new(Node::iri("urn:alice"), Node::iri("urn:knows"), Node::iri("urn:bob"));
/// assert!(pattern.matches(&triple));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriplePattern {
    /// Optional subject constraint.
    pub subject: Option<Node>,
    /// Optional predicate constraint.
    pub predicate: Option<Node>,
    /// Optional object constraint.
    pub object: Option<Node>,
}

impl TriplePattern {
    /// A pattern matching every triple.
    pub fn any() -> Self {
        Self::default()
    }

    /// Adds a subject constraint.
    pub fn with_subject(mut self, subject: Node) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Adds a predicate constraint.
    pub fn with_predicate(mut self, predicate: Node) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Adds an object constraint.
    pub fn with_object(mut self, object: Node) -> Self {
        self.object = Some(object);
        self
    }

    /// Returns `true` if no position is constrained.
    pub fn is_wildcard(&self) -> bool {
        self.subject.is_none() && self.predicate.is_none() && self.object.is_none()
    }

    /// Returns `true` if every constrained position equals the triple's.
    pub fn matches(&self, triple: &Triple) -> bool {
        self.subject.as_ref().is_none_or(|s| *s == triple.subject)
            && self.predicate.as_ref().is_none_or(|p| *p == triple.predicate)
            && self.object.as_ref().is_none_or(|o| *o == triple.object)
    }
}
