//! Graph nodes: IRIs, blank nodes and literals.
//!
//! A `Node` can appear in any position of a [`Triple`](crate::graph::Triple).
//! Focus nodes handed to a rule and every component of an inferred triple
//! are `Node`s.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vocab::{RDF_LANG_STRING, XSD_BOOLEAN, XSD_DOUBLE, XSD_INTEGER, XSD_STRING};

/// A node of the knowledge graph.
///
/// # Examples
///
/// ```
/// use aingle_js_rules::Node;
///
/// let alice = Node::iri("http://example.org/Alice");
/// assert!(alice.is_iri());
/// assert_eq!(alice.to_string(), "<http://example.org/Alice>");
///
/// let age = Node::integer(42);
/// assert!(age.is_literal());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Node {
    /// A node named by an IRI.
    Iri(String),

    /// An anonymous node with a locally scoped label.
    Blank(String),

    /// A literal value.
    Literal(Literal),
}

impl Node {
    /// Creates an IRI node.
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    /// Creates a blank node with the given label.
    pub fn blank(label: impl Into<String>) -> Self {
        Self::Blank(label.into())
    }

    /// Creates an `xsd:string` literal.
    pub fn literal(lexical: impl Into<String>) -> Self {
        Self::Literal(Literal::typed(lexical, XSD_STRING))
    }

    /// Creates a literal with an explicit datatype IRI.
    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal(Literal::typed(lexical, datatype))
    }

    /// Creates a language-tagged string literal.
    pub fn lang_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal(Literal::lang(lexical, language))
    }

    /// Creates an `xsd:integer` literal.
    pub fn integer(value: i64) -> Self {
        Self::typed_literal(value.to_string(), XSD_INTEGER)
    }

    /// Creates an `xsd:double` literal.
    pub fn double(value: f64) -> Self {
        Self::typed_literal(value.to_string(), XSD_DOUBLE)
    }

    /// Creates an `xsd:boolean` literal.
    pub fn boolean(value: bool) -> Self {
        Self::typed_literal(value.to_string(), XSD_BOOLEAN)
    }

    /// Returns `true` if this is an IRI node.
    pub fn is_iri(&self) -> bool {
        matches!(self, Self::Iri(_))
    }

    /// Returns `true` if this is a blank node.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank(_))
    }

    /// Returns `true` if this is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Returns the IRI if this is an IRI node.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Returns the literal if this is a literal node.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{}>", iri),
            Self::Blank(label) => write!(f, "_:{}", label),
            Self::Literal(lit) => write!(f, "{}", lit),
        }
    }
}

impl From<Literal> for Node {
    fn from(lit: Literal) -> Self {
        Self::Literal(lit)
    }
}

/// A literal value with its datatype and optional language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    lexical: String,
    datatype: String,
    language: Option<String>,
}

impl Literal {
    /// Creates a literal with an explicit datatype.
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: datatype.into(),
            language: None,
        }
    }

    /// Creates a language-tagged literal. The datatype is `rdf:langString`.
    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: RDF_LANG_STRING.to_string(),
            language: Some(language.into().to_ascii_lowercase()),
        }
    }

    /// The lexical form.
    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    /// The datatype IRI.
    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    /// The language tag, if any.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.lexical.replace('\\', "\\\\").replace('"', "\\\""))?;
        match &self.language {
            Some(lang) => write!(f, "@{}", lang),
            None if self.datatype == XSD_STRING => Ok(()),
            None => write!(f, "^^<{}>", self.datatype),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iri_node() {
        let node = Node::iri("http://example.org/Alice");
        assert!(node.is_iri());
        assert!(!node.is_literal());
        assert_eq!(node.as_iri(), Some("http://example.org/Alice"));
    }

    #[test]
    fn test_literal_constructors() {
        let lit = Node::integer(7);
        let lit = lit.as_literal().unwrap();
        assert_eq!(lit.lexical(), "7");
        assert_eq!(lit.datatype(), XSD_INTEGER);

        let lang = Node::lang_literal("Hallo", "DE");
        assert_eq!(lang.as_literal().unwrap().language(), Some("de"));
        assert_eq!(lang.as_literal().unwrap().datatype(), RDF_LANG_STRING);
    }

    #[test]
    fn test_display() {
        assert_eq!(Node::iri("urn:a").to_string(), "<urn:a>");
        assert_eq!(Node::blank("b0").to_string(), "_:b0");
        assert_eq!(Node::literal("x").to_string(), "\"x\"");
        assert_eq!(Node::lang_literal("x", "en").to_string(), "\"x\"@en");
        assert_eq!(
            Node::boolean(true).to_string(),
            format!("\"true\"^^<{}>", XSD_BOOLEAN)
        );
    }

    #[test]
    fn test_display_escapes_quotes() {
        assert_eq!(Node::literal("say \"hi\"").to_string(), "\"say \\\"hi\\\"\"");
    }
}
