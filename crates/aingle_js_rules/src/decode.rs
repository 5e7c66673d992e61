//! Decoding the values returned by rule functions into triples.
//!
//! A function returns either nothing or a sequence of triples. Each element
//! is classified once into a [`TripleShape`] and then extracted uniformly:
//!
//! - `[s, p, o]`: a positional triple
//! - `{subject, predicate, object}`: a labeled triple
//!
//! Anything that is not a sequence produces no triples. A malformed element
//! fails the whole decode and nothing from it onward is emitted.

use indexmap::IndexMap;
use log::trace;
use thiserror::Error;

use crate::graph::{Node, Triple};
use crate::script::ScriptValue;
use crate::vocab::{XSD_BOOLEAN, XSD_DOUBLE, XSD_INTEGER};

/// A value that could not be turned into a graph node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {found} to a node: {reason}")]
pub struct ConversionError {
    /// Shape of the offending value.
    pub found: String,
    /// Why it was rejected.
    pub reason: String,
}

impl ConversionError {
    fn new(value: &ScriptValue, reason: impl Into<String>) -> Self {
        Self {
            found: value.kind(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while decoding a function result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The element is neither a 3-element sequence nor an object.
    #[error("result element {index} is not a triple: found {found}")]
    Malformed { index: usize, found: String },

    /// A labeled triple lacks one of its fields.
    #[error("result element {index} has no {component}")]
    MissingComponent {
        index: usize,
        component: &'static str,
    },

    /// A component could not be converted to a node.
    #[error("result element {index}, {component}: {source}")]
    Conversion {
        index: usize,
        component: &'static str,
        #[source]
        source: ConversionError,
    },
}

impl DecodeError {
    /// Index of the offending element in the returned sequence.
    pub fn index(&self) -> usize {
        match self {
            Self::Malformed { index, .. }
            | Self::MissingComponent { index, .. }
            | Self::Conversion { index, .. } => *index,
        }
    }
}

const COMPONENTS: [&str; 3] = ["subject", "predicate", "object"];

/// The shape of one returned element.
#[derive(Debug, Clone, PartialEq)]
pub enum TripleShape<'a> {
    /// A sequence of exactly three values.
    Positional([&'a ScriptValue; 3]),
    /// An object expected to carry `subject`, `predicate` and `object`.
    Labeled(&'a IndexMap<String, ScriptValue>),
    /// Anything else.
    NotATriple { found: String },
}

impl<'a> TripleShape<'a> {
    /// Classifies a returned element.
    pub fn classify(value: &'a ScriptValue) -> Self {
        match value {
            ScriptValue::Array(items) => match items.as_slice() {
                [s, p, o] => Self::Positional([s, p, o]),
                _ => Self::NotATriple { found: value.kind() },
            },
            ScriptValue::Object(fields) => Self::Labeled(fields),
            other => Self::NotATriple { found: other.kind() },
        }
    }

    /// The three raw components, in subject, predicate, object order.
    pub fn components(&self, index: usize) -> Result<[&'a ScriptValue; 3], DecodeError> {
        match self {
            Self::Positional(components) => Ok(*components),
            Self::Labeled(fields) => {
                let fields: &'a IndexMap<String, ScriptValue> = *fields;
                let field = move |component: &'static str| {
                    fields
                        .get(component)
                        .ok_or(DecodeError::MissingComponent { index, component })
                };
                Ok([field(COMPONENTS[0])?, field(COMPONENTS[1])?, field(COMPONENTS[2])?])
            }
            Self::NotATriple { found } => Err(DecodeError::Malformed {
                index,
                found: found.clone(),
            }),
        }
    }
}

/// Converts raw script values to graph nodes.
pub trait NodeConverter: Send + Sync {
    fn to_node(&self, value: &ScriptValue) -> Result<Node, ConversionError>;
}

/// The default converter.
///
/// Node handles pass through. RDF/JS term objects (`termType` plus `value`)
/// become IRIs, blank nodes or literals. Strings, numbers and booleans become
/// typed literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermConverter;

impl TermConverter {
    fn term_to_node(
        &self,
        value: &ScriptValue,
        fields: &IndexMap<String, ScriptValue>,
    ) -> Result<Node, ConversionError> {
        let term_type = fields
            .get("termType")
            .and_then(ScriptValue::as_str)
            .ok_or_else(|| ConversionError::new(value, "object is not a term"))?;
        let lexical = fields
            .get("value")
            .and_then(ScriptValue::as_str)
            .ok_or_else(|| ConversionError::new(value, "term has no string value"))?;

        match term_type {
            "NamedNode" => Ok(Node::iri(lexical)),
            "BlankNode" => Ok(Node::blank(lexical)),
            "Literal" => {
                let language = fields
                    .get("language")
                    .and_then(ScriptValue::as_str)
                    .filter(|lang| !lang.is_empty());
                if let Some(language) = language {
                    return Ok(Node::lang_literal(lexical, language));
                }
                match fields.get("datatype") {
                    None | Some(ScriptValue::Undefined | ScriptValue::Null) => {
                        Ok(Node::literal(lexical))
                    }
                    Some(datatype) => {
                        let iri = match datatype {
                            ScriptValue::String(iri) => iri.clone(),
                            other => match self.to_node(other)? {
                                Node::Iri(iri) => iri,
                                _ => {
                                    return Err(ConversionError::new(
                                        value,
                                        "literal datatype is not an IRI",
                                    ))
                                }
                            },
                        };
                        Ok(Node::typed_literal(lexical, iri))
                    }
                }
            }
            other => Err(ConversionError::new(
                value,
                format!("unsupported term type {}", other),
            )),
        }
    }
}

impl NodeConverter for TermConverter {
    fn to_node(&self, value: &ScriptValue) -> Result<Node, ConversionError> {
        match value {
            ScriptValue::Node(node) => Ok(node.clone()),
            ScriptValue::Object(fields) => self.term_to_node(value, fields),
            ScriptValue::String(s) => Ok(Node::literal(s.clone())),
            ScriptValue::Bool(b) => Ok(Node::typed_literal(b.to_string(), XSD_BOOLEAN)),
            ScriptValue::Number(n) if !n.is_finite() => {
                Err(ConversionError::new(value, "number is not finite"))
            }
            ScriptValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 => {
                Ok(Node::typed_literal(format!("{}", *n as i64), XSD_INTEGER))
            }
            ScriptValue::Number(n) => Ok(Node::typed_literal(n.to_string(), XSD_DOUBLE)),
            ScriptValue::Undefined | ScriptValue::Null | ScriptValue::Array(_) => {
                Err(ConversionError::new(value, "no node representation"))
            }
        }
    }
}

/// Streams the triples out of a function result.
///
/// # Examples
///
/// ```
/// use aingle_js_rules::{Node, ResultDecoder, ScriptValue};
///
/// let result = ScriptValue::Array(vec![ScriptValue::triple(
///     Node::iri("urn:alice"),
///     Node::iri("urn:hasAgeGroup"),
///     Node::iri("urn:Adult"),
/// )]);
///
/// let triples = ResultDecoder::new().decode(&result).unwrap();
/// assert_eq!(triples.len(), 1);
/// ```
pub struct ResultDecoder {
    converter: Box<dyn NodeConverter>,
}

impl ResultDecoder {
    /// A decoder using [`TermConverter`].
    pub fn new() -> Self {
        Self::with_converter(TermConverter)
    }

    /// A decoder using a custom node converter.
    pub fn with_converter(converter: impl NodeConverter + 'static) -> Self {
        Self {
            converter: Box::new(converter),
        }
    }

    /// Decodes `value`, handing each triple to `emit` as soon as it is built.
    ///
    /// Returns the number of triples emitted. On error, triples from earlier
    /// elements have already been emitted.
    pub fn decode_each(
        &self,
        value: &ScriptValue,
        mut emit: impl FnMut(Triple),
    ) -> Result<usize, DecodeError> {
        self.try_decode_each(value, |triple| {
            emit(triple);
            Ok::<_, DecodeError>(())
        })
    }

    /// Like [`decode_each`](Self::decode_each), but `emit` may fail and stop
    /// decoding.
    pub fn try_decode_each<E: From<DecodeError>>(
        &self,
        value: &ScriptValue,
        mut emit: impl FnMut(Triple) -> Result<(), E>,
    ) -> Result<usize, E> {
        let Some(elements) = value.as_array() else {
            trace!("Function returned {}, no triples", value.kind());
            return Ok(0);
        };

        for (index, element) in elements.iter().enumerate() {
            let [s, p, o] = TripleShape::classify(element).components(index)?;
            let triple = Triple::new(
                self.convert(index, 0, s)?,
                self.convert(index, 1, p)?,
                self.convert(index, 2, o)?,
            );
            emit(triple)?;
        }
        Ok(elements.len())
    }

    /// Decodes `value` into a vector.
    pub fn decode(&self, value: &ScriptValue) -> Result<Vec<Triple>, DecodeError> {
        let mut triples = Vec::new();
        self.decode_each(value, |triple| triples.push(triple))?;
        Ok(triples)
    }

    fn convert(
        &self,
        index: usize,
        position: usize,
        value: &ScriptValue,
    ) -> Result<Node, DecodeError> {
        self.converter
            .to_node(value)
            .map_err(|source| DecodeError::Conversion {
                index,
                component: COMPONENTS[position],
                source,
            })
    }
}

impl Default for ResultDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResultDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultDecoder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::XSD_STRING;
    use serde_json::json;

    fn iri(s: &str) -> ScriptValue {
        ScriptValue::Node(Node::iri(s))
    }

    #[test]
    fn test_not_a_sequence_yields_nothing() {
        let decoder = ResultDecoder::new();
        for value in [
            ScriptValue::Undefined,
            ScriptValue::Null,
            ScriptValue::from("text"),
            ScriptValue::labeled_triple(iri("urn:a"), iri("urn:p"), iri("urn:b")),
        ] {
            assert_eq!(decoder.decode(&value).unwrap(), Vec::new());
        }
    }

    #[test]
    fn test_positional_and_labeled_agree() {
        let decoder = ResultDecoder::new();
        let positional = ScriptValue::Array(vec![ScriptValue::triple(
            iri("urn:a"),
            iri("urn:p"),
            iri("urn:b"),
        )]);
        let labeled = ScriptValue::Array(vec![ScriptValue::labeled_triple(
            iri("urn:a"),
            iri("urn:p"),
            iri("urn:b"),
        )]);

        assert_eq!(
            decoder.decode(&positional).unwrap(),
            decoder.decode(&labeled).unwrap()
        );
    }

    #[test]
    fn test_two_element_array_is_malformed() {
        let value = ScriptValue::Array(vec![ScriptValue::Array(vec![iri("urn:a"), iri("urn:p")])]);
        let err = ResultDecoder::new().decode(&value).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Malformed {
                index: 0,
                found: "array of 2".to_string()
            }
        );
    }

    #[test]
    fn test_missing_object_stops_decoding() {
        let value = ScriptValue::Array(vec![
            ScriptValue::triple(iri("urn:a"), iri("urn:p"), iri("urn:b")),
            ScriptValue::object([("subject", iri("urn:a")), ("predicate", iri("urn:p"))]),
            ScriptValue::triple(iri("urn:c"), iri("urn:p"), iri("urn:d")),
        ]);

        let mut emitted = Vec::new();
        let err = ResultDecoder::new()
            .decode_each(&value, |t| emitted.push(t))
            .unwrap_err();

        assert_eq!(
            err,
            DecodeError::MissingComponent {
                index: 1,
                component: "object"
            }
        );
        assert_eq!(emitted.len(), 1);
        assert_eq!(err.index(), 1);
    }

    #[test]
    fn test_emit_failure_stops_decoding() {
        let value = ScriptValue::Array(vec![
            ScriptValue::triple(iri("urn:a"), iri("urn:p"), iri("urn:b")),
            ScriptValue::triple(iri("urn:c"), iri("urn:p"), iri("urn:d")),
        ]);

        #[derive(Debug, PartialEq)]
        enum SinkError {
            Full,
            Decode(DecodeError),
        }
        impl From<DecodeError> for SinkError {
            fn from(e: DecodeError) -> Self {
                SinkError::Decode(e)
            }
        }

        let mut seen = 0;
        let result = ResultDecoder::new().try_decode_each(&value, |_| {
            seen += 1;
            Err(SinkError::Full)
        });
        assert_eq!(result, Err(SinkError::Full));
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_conversion_failure() {
        let value = ScriptValue::Array(vec![ScriptValue::triple(
            iri("urn:a"),
            ScriptValue::Null,
            iri("urn:b"),
        )]);
        let err = ResultDecoder::new().decode(&value).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Conversion { index: 0, component: "predicate", .. }
        ));
    }

    #[test]
    fn test_rdfjs_terms() {
        let value = ScriptValue::from(json!([[
            {"termType": "BlankNode", "value": "b1"},
            {"termType": "NamedNode", "value": "urn:label"},
            {"termType": "Literal", "value": "Hallo", "language": "de"}
        ], {
            "subject": {"termType": "NamedNode", "value": "urn:a"},
            "predicate": {"termType": "NamedNode", "value": "urn:age"},
            "object": {
                "termType": "Literal",
                "value": "42",
                "datatype": {"termType": "NamedNode", "value": XSD_INTEGER}
            }
        }]));

        let triples = ResultDecoder::new().decode(&value).unwrap();
        assert_eq!(triples[0].subject, Node::blank("b1"));
        assert_eq!(triples[0].object, Node::lang_literal("Hallo", "de"));
        assert_eq!(triples[1].object, Node::integer(42));
    }

    #[test]
    fn test_primitive_conversion() {
        let converter = TermConverter;
        assert_eq!(
            converter.to_node(&ScriptValue::from("x")).unwrap(),
            Node::typed_literal("x", XSD_STRING)
        );
        assert_eq!(converter.to_node(&ScriptValue::from(3i64)).unwrap(), Node::integer(3));
        assert_eq!(converter.to_node(&ScriptValue::from(1.5)).unwrap(), Node::double(1.5));
        assert_eq!(converter.to_node(&ScriptValue::from(true)).unwrap(), Node::boolean(true));
        assert!(converter.to_node(&ScriptValue::Number(f64::NAN)).is_err());
        assert!(converter
            .to_node(&ScriptValue::from(json!({"termType": "Variable", "value": "x"})))
            .is_err());
    }

    #[test]
    fn test_custom_converter() {
        struct IriOnly;
        impl NodeConverter for IriOnly {
            fn to_node(&self, value: &ScriptValue) -> Result<Node, ConversionError> {
                value
                    .as_str()
                    .map(Node::iri)
                    .ok_or_else(|| ConversionError::new(value, "expected an IRI string"))
            }
        }

        let value = ScriptValue::Array(vec![ScriptValue::triple("urn:a", "urn:p", "urn:b")]);
        let triples = ResultDecoder::with_converter(IriOnly).decode(&value).unwrap();
        assert_eq!(triples[0].object, Node::iri("urn:b"));
    }
}
