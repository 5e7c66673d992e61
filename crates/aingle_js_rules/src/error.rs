//! Error types for script rule evaluation.
//!
//! Failures fall into three groups:
//!
//! - configuration problems, raised before any focus node is touched
//! - script failures, passed through unchanged
//! - everything else, wrapped in [`Error::Evaluation`] with its cause

use thiserror::Error;

use crate::config::ConfigError;
use crate::decode::DecodeError;
use crate::graph::GraphError;
use crate::script::{ContextError, InvocationError, ScriptError};

/// A specialized `Result` type for rule evaluation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by rules and the rule engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The rule names no function to invoke.
    #[error("{rule}: missing function name")]
    MissingFunctionName { rule: String },

    /// The script itself failed.
    #[error(transparent)]
    Script(ScriptError),

    /// Evaluation failed for a reason other than the script.
    #[error("{rule}: evaluation failed: {cause}")]
    Evaluation {
        rule: String,
        #[source]
        cause: EvaluationError,
    },

    /// Invalid engine or rule set configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Classifies an invocation failure for the given rule.
    ///
    /// Script errors are kept as they are; the rest are wrapped.
    pub fn from_invocation(rule: impl Into<String>, err: InvocationError) -> Self {
        match err {
            InvocationError::Script(err) => Self::Script(err),
            other => Self::evaluation(rule, EvaluationError::Invocation(other)),
        }
    }

    /// Wraps an infrastructure failure.
    pub fn evaluation(rule: impl Into<String>, cause: impl Into<EvaluationError>) -> Self {
        Self::Evaluation {
            rule: rule.into(),
            cause: cause.into(),
        }
    }

    /// Returns `true` if the script itself failed.
    pub fn is_script_failure(&self) -> bool {
        matches!(self, Self::Script(_))
    }

    /// Returns `true` for configuration problems.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingFunctionName { .. } | Self::Config(_))
    }

    /// The label of the rule the error is attributed to, when known.
    pub fn rule(&self) -> Option<&str> {
        match self {
            Self::MissingFunctionName { rule } | Self::Evaluation { rule, .. } => Some(rule),
            Self::Script(_) | Self::Config(_) => None,
        }
    }
}

/// The cause carried by [`Error::Evaluation`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// The returned value could not be decoded into triples.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The engine could not run the function or load a library.
    #[error(transparent)]
    Invocation(InvocationError),

    /// No scripting context could be acquired.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The default graph or the inference sink failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
