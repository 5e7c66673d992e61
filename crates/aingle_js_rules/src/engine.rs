//! Rule Engine for script rules
//!
//! The engine owns a dataset, a rule set and the scripting context manager.
//! It runs every enabled rule over a list of focus nodes and collects the
//! inferred triples in a deduplicating graph.

use log::{debug, error, info, trace};
use std::sync::Arc;

use crate::config::{ConfigError, EngineConfig};
use crate::decode::ResultDecoder;
use crate::error::{Error, Result};
use crate::evaluator::{ExecutionSummary, RuleHost};
use crate::graph::{Dataset, Graph, GraphResult, MemoryGraph, Node, Triple};
use crate::progress::ProgressMonitor;
use crate::rule::{RuleSet, ScriptRule};
use crate::script::{ContextManager, ScriptRuntime};

/// Collects and stores statistics about the operations performed by the `RuleEngine`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Rules run to completion or cancellation.
    pub rules_executed: usize,
    /// Rules that failed.
    pub rules_failed: usize,
    /// Focus nodes whose function was invoked.
    pub focus_nodes_evaluated: usize,
    /// New triples inferred.
    pub inferences: usize,
    /// Inferred triples that were already known.
    pub duplicate_inferences: usize,
    /// Runs stopped by cancellation.
    pub cancellations: usize,
}

/// A rule that failed while the engine kept going.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFailure {
    /// ID of the failing rule.
    pub rule_id: String,
    /// What went wrong.
    pub error: Error,
}

/// The outcome of [`RuleEngine::execute`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Per-rule summaries, in execution order, keyed by rule ID.
    pub summaries: Vec<(String, ExecutionSummary)>,
    /// Rules that failed, when failures do not abort the run.
    pub failures: Vec<RuleFailure>,
    /// Whether cancellation stopped the run.
    pub canceled: bool,
}

impl RunReport {
    /// Triples inferred across all rules, duplicates included.
    pub fn triples_inferred(&self) -> usize {
        self.summaries.iter().map(|(_, s)| s.triples_inferred).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

struct EngineState {
    dataset: Dataset,
    config: EngineConfig,
    scripting: ContextManager,
    monitor: Option<Arc<dyn ProgressMonitor>>,
    inferred: MemoryGraph,
    stats: EngineStats,
}

impl RuleHost for EngineState {
    fn default_graph(&self) -> Arc<dyn Graph> {
        self.dataset.default_graph()
    }

    fn infer(&mut self, triple: Triple) -> GraphResult<()> {
        if self.config.trace_inferences {
            debug!("Inferred: {}", triple);
        } else {
            trace!("Inferred: {}", triple);
        }

        if self.config.write_back {
            self.dataset.default_graph().insert(triple.clone())?;
        }
        if self.inferred.insert(triple)? {
            self.stats.inferences += 1;
        } else {
            self.stats.duplicate_inferences += 1;
        }
        Ok(())
    }

    fn progress_monitor(&self) -> Option<&dyn ProgressMonitor> {
        self.monitor.as_deref()
    }

    fn scripting(&self) -> &ContextManager {
        &self.scripting
    }
}

/// Runs script rules against a dataset.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use aingle_js_rules::{Dataset, NativeRuntime, Node, RuleEngine, ScriptRule, ScriptValue};
///
/// let runtime = NativeRuntime::new().with_function("tag", |frame, _scope| {
///     let this = frame.this().cloned().unwrap_or_else(|| Node::blank("x"));
///     Ok(ScriptValue::Array(vec![ScriptValue::triple(
///         this,
///         Node::iri("urn:tagged"),
///         Node::boolean(true),
///     )]))
/// });
///
/// let mut engine = RuleEngine::new(Dataset::memory(), Arc::new(runtime));
/// engine.add_rule(ScriptRule::new("tagging", "tag"));
///
/// let report = engine.execute(&[Node::iri("urn:a")]).unwrap();
/// assert_eq!(report.triples_inferred(), 1);
/// assert_eq!(engine.inferred_triples().unwrap().len(), 1);
/// ```
pub struct RuleEngine {
    rules: RuleSet,
    decoder: ResultDecoder,
    state: EngineState,
}

impl RuleEngine {
    /// Creates an engine with the default configuration and no rules.
    pub fn new(dataset: Dataset, runtime: Arc<dyn ScriptRuntime>) -> Self {
        Self::build(dataset, runtime, EngineConfig::default())
    }

    /// Creates an engine with a validated configuration.
    pub fn with_config(
        dataset: Dataset,
        runtime: Arc<dyn ScriptRuntime>,
        config: EngineConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(dataset, runtime, config))
    }

    fn build(dataset: Dataset, runtime: Arc<dyn ScriptRuntime>, config: EngineConfig) -> Self {
        let scripting = ContextManager::with_max_nesting_depth(runtime, config.max_nesting_depth);
        Self {
            rules: RuleSet::new("default"),
            decoder: ResultDecoder::new(),
            state: EngineState {
                dataset,
                config,
                scripting,
                monitor: None,
                inferred: MemoryGraph::new(),
                stats: EngineStats::default(),
            },
        }
    }

    /// Replaces the rule set.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Replaces the result decoder.
    pub fn with_decoder(mut self, decoder: ResultDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Uses an existing context manager, so evaluations started from inside
    /// another engine's script functions share its contexts.
    pub fn with_scripting(mut self, scripting: ContextManager) -> Self {
        self.state.scripting = scripting;
        self
    }

    /// Adds a single rule to the engine's `RuleSet`.
    pub fn add_rule(&mut self, rule: ScriptRule) {
        self.rules.add(rule);
    }

    pub fn set_progress_monitor(&mut self, monitor: Arc<dyn ProgressMonitor>) {
        self.state.monitor = Some(monitor);
    }

    pub fn clear_progress_monitor(&mut self) {
        self.state.monitor = None;
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.state.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.state.dataset
    }

    /// The context manager shared by every rule of this engine.
    pub fn scripting(&self) -> &ContextManager {
        &self.state.scripting
    }

    /// Retrieves the current `EngineStats` for this engine.
    pub fn stats(&self) -> EngineStats {
        self.state.stats.clone()
    }

    /// Resets all collected `EngineStats` to their default (zero) values.
    pub fn clear_stats(&mut self) {
        self.state.stats = EngineStats::default();
    }

    /// The deduplicated inferences, in the order they were first made.
    pub fn inferred_graph(&self) -> &MemoryGraph {
        &self.state.inferred
    }

    /// Retrieves a copy of all triples that have been inferred by the engine.
    pub fn inferred_triples(&self) -> GraphResult<Vec<Triple>> {
        self.state.inferred.triples()
    }

    /// Clears the internal cache of inferred triples.
    pub fn clear_inferred(&mut self) -> GraphResult<()> {
        self.state.inferred.clear()
    }

    /// Runs every enabled rule, by ascending order, over `focus_nodes`.
    ///
    /// The first failing rule aborts the run unless
    /// `continue_on_rule_error` is set, in which case it is logged and
    /// reported in [`RunReport::failures`].
    pub fn execute(&mut self, focus_nodes: &[Node]) -> Result<RunReport> {
        let mut report = RunReport::default();
        let rules = self.rules.enabled_sorted();
        info!(
            "Running {} script rules over {} focus nodes",
            rules.len(),
            focus_nodes.len()
        );

        for rule in rules {
            match Self::run_rule(&mut self.state, &self.decoder, rule, focus_nodes) {
                Ok(summary) => {
                    report.summaries.push((rule.id.clone(), summary));
                    if summary.canceled {
                        report.canceled = true;
                        break;
                    }
                }
                Err(err) => {
                    error!("{} failed: {}", rule, err);
                    if !self.state.config.continue_on_rule_error {
                        return Err(err);
                    }
                    report.failures.push(RuleFailure {
                        rule_id: rule.id.clone(),
                        error: err,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Runs a single rule by ID, enabled or not.
    pub fn execute_rule(&mut self, id: &str, focus_nodes: &[Node]) -> Result<ExecutionSummary> {
        let rule = self.rules.get(id).ok_or_else(|| {
            Error::Config(ConfigError::Invalid(format!("unknown rule: {}", id)))
        })?;
        Self::run_rule(&mut self.state, &self.decoder, rule, focus_nodes)
    }

    fn run_rule(
        state: &mut EngineState,
        decoder: &ResultDecoder,
        rule: &ScriptRule,
        focus_nodes: &[Node],
    ) -> Result<ExecutionSummary> {
        debug!("Executing {}", rule);
        match rule.execute_with_decoder(state, focus_nodes, decoder) {
            Ok(summary) => {
                state.stats.rules_executed += 1;
                state.stats.focus_nodes_evaluated += summary.focus_nodes_evaluated;
                if summary.canceled {
                    state.stats.cancellations += 1;
                }
                Ok(summary)
            }
            Err(err) => {
                state.stats.rules_failed += 1;
                Err(err)
            }
        }
    }
}

impl RuleHost for RuleEngine {
    fn default_graph(&self) -> Arc<dyn Graph> {
        self.state.default_graph()
    }

    fn infer(&mut self, triple: Triple) -> GraphResult<()> {
        self.state.infer(triple)
    }

    fn progress_monitor(&self) -> Option<&dyn ProgressMonitor> {
        self.state.progress_monitor()
    }

    fn scripting(&self) -> &ContextManager {
        &self.state.scripting
    }
}
