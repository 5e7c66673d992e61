//! AIngle JS Rules - Script-Function Inference Rules
//!
//! This crate evaluates inference rules whose logic lives in a named script
//! function instead of a fixed pattern. For each focus node the function is
//! invoked with `this` bound to the node and with `data` and `shapes` views
//! of the default graph in scope. The triples it returns are decoded and
//! handed to the engine's inference sink.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Rule Engine                           │
//! │        rule ordering │ inference graph │ statistics          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                       Rule Evaluator                         │
//! │   cancellation │ context scope │ graph views │ libraries     │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │     Scripting Contexts       │        Result Decoder        │
//! │  reentrant, one per thread   │  [s, p, o] │ {subject, ...}  │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                 Script Runtime (pluggable)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use aingle_js_rules::{Dataset, NativeRuntime, Node, RuleEngine, ScriptRule, ScriptValue};
//!
//! let runtime = NativeRuntime::new().with_function("deriveAge", |frame, _scope| {
//!     match frame.this() {
//!         Some(node) if node.as_iri() == Some("http://example.org/Alice") => {
//!             Ok(ScriptValue::Array(vec![ScriptValue::triple(
//!                 node.clone(),
//!                 Node::iri("http://example.org/hasAgeGroup"),
//!                 Node::iri("http://example.org/Adult"),
//!             )]))
//!         }
//!         _ => Ok(ScriptValue::Undefined),
//!     }
//! });
//!
//! let mut engine = RuleEngine::new(Dataset::memory(), Arc::new(runtime));
//! engine.add_rule(ScriptRule::new("ages", "deriveAge"));
//!
//! engine
//!     .execute(&[
//!         Node::iri("http://example.org/Alice"),
//!         Node::iri("http://example.org/Bob"),
//!     ])
//!     .unwrap();
//! assert_eq!(engine.inferred_triples().unwrap().len(), 1);
//! ```

pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod progress;
pub mod rule;
pub mod script;
pub mod vocab;

// Re-exports
pub use config::{ConfigError, EngineConfig};
pub use decode::{ConversionError, DecodeError, NodeConverter, ResultDecoder, TermConverter, TripleShape};
pub use engine::{EngineStats, RuleEngine, RuleFailure, RunReport};
pub use error::{Error, EvaluationError, Result};
pub use evaluator::{ExecutionSummary, RuleHost};
pub use graph::{Dataset, Graph, GraphError, GraphResult, Literal, MemoryGraph, Node, Triple, TriplePattern};
pub use progress::{CancellationFlag, ProgressMonitor};
pub use rule::{RuleSet, ScriptRule, ScriptRuleBuilder};
pub use script::{
    Ambient, CallFrame, ContextError, ContextGuard, ContextManager, ContextStats, GraphView,
    GraphViewRef, InvocationError, NativeFn, NativeLibrary, NativeRuntime, ScriptEngine,
    ScriptError, ScriptLibrary, ScriptRuntime, ScriptScope, ScriptValue, ScriptingContext,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
