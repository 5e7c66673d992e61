//! Per-focus-node evaluation of script rules.
//!
//! For each focus node the evaluator enters a scripting context, exposes the
//! default graph as the `data` and `shapes` views, loads the rule's libraries,
//! invokes the function with `this` bound to the node, and streams the
//! decoded triples into the host's inference sink.
//!
//! Views and the context are scoped to the iteration: they are released on
//! every exit path, and a failure stops the remaining focus nodes.

use log::{debug, info, trace};
use std::sync::Arc;

use crate::decode::ResultDecoder;
use crate::error::{Error, EvaluationError, Result};
use crate::graph::{Graph, GraphResult, Node, Triple};
use crate::progress::ProgressMonitor;
use crate::rule::ScriptRule;
use crate::script::{CallFrame, ContextManager};
use crate::vocab::{DATA_VAR, SHAPES_VAR};

/// The enclosing engine, as seen by a rule.
pub trait RuleHost {
    /// The graph exposed to scripts as `data` and `shapes`.
    fn default_graph(&self) -> Arc<dyn Graph>;

    /// Accepts a derived triple.
    fn infer(&mut self, triple: Triple) -> GraphResult<()>;

    /// The cancellation signal, if any.
    fn progress_monitor(&self) -> Option<&dyn ProgressMonitor> {
        None
    }

    /// The manager providing scripting contexts.
    fn scripting(&self) -> &ContextManager;
}

/// What one call to [`ScriptRule::execute`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Focus nodes whose function was invoked.
    pub focus_nodes_evaluated: usize,
    /// Triples handed to the inference sink.
    pub triples_inferred: usize,
    /// Whether cancellation stopped the loop early.
    pub canceled: bool,
}

impl ScriptRule {
    /// Evaluates the rule for each focus node, in order.
    ///
    /// Fails before touching any node if the rule has no function name.
    /// A script failure is returned unchanged; any other failure is wrapped
    /// in [`Error::Evaluation`]. Either way the remaining nodes are skipped
    /// and triples already inferred stay in the sink.
    pub fn execute(&self, host: &mut dyn RuleHost, focus_nodes: &[Node]) -> Result<ExecutionSummary> {
        self.execute_with_decoder(host, focus_nodes, &ResultDecoder::new())
    }

    /// Like [`execute`](Self::execute), with a custom decoder.
    pub fn execute_with_decoder(
        &self,
        host: &mut dyn RuleHost,
        focus_nodes: &[Node],
        decoder: &ResultDecoder,
    ) -> Result<ExecutionSummary> {
        let label = self.label();
        let function = self
            .function_name()
            .ok_or_else(|| Error::MissingFunctionName {
                rule: label.clone(),
            })?;

        let scripting = host.scripting().clone();
        let mut summary = ExecutionSummary::default();

        for focus in focus_nodes {
            if host.progress_monitor().is_some_and(|m| m.is_canceled()) {
                info!(
                    "{} canceled after {} of {} focus nodes",
                    label,
                    summary.focus_nodes_evaluated,
                    focus_nodes.len()
                );
                summary.canceled = true;
                break;
            }

            debug!("{} evaluating {}", label, focus);
            summary.triples_inferred +=
                self.evaluate_focus(host, &scripting, decoder, function, &label, focus)?;
            summary.focus_nodes_evaluated += 1;
        }

        Ok(summary)
    }

    fn evaluate_focus(
        &self,
        host: &mut dyn RuleHost,
        scripting: &ContextManager,
        decoder: &ResultDecoder,
        function: &str,
        label: &str,
        focus: &Node,
    ) -> Result<usize> {
        let session = scripting
            .enter()
            .map_err(|e| Error::evaluation(label, e))?;
        let context = session.context();

        // Declared after the session so both are released before it ends.
        let graph = host.default_graph();
        let data_view = context.open_view(DATA_VAR, Arc::clone(&graph));
        let shapes_view = context.open_view(SHAPES_VAR, graph);
        let _data = context.bind_view(&data_view);
        let _shapes = context.bind_view(&shapes_view);

        context
            .load_libraries(&self.libraries)
            .map_err(|e| Error::from_invocation(label, e))?;

        let result = context
            .invoke(function, &CallFrame::for_focus(focus))
            .map_err(|e| Error::from_invocation(label, e))?;

        decoder
            .try_decode_each(&result, |triple| {
                trace!("{} inferred {}", label, triple);
                host.infer(triple).map_err(EvaluationError::from)
            })
            .map_err(|cause| Error::evaluation(label, cause))
    }
}
