//! Script rule definitions.
//!
//! A script rule names a function to invoke for each focus node, an
//! optional human label and the libraries the function depends on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;
use crate::script::ScriptLibrary;
use crate::vocab::LABEL_START;

/// A rule whose logic is a script function.
///
/// # Examples
///
/// ```
/// use aingle_js_rules::ScriptRule;
///
/// let rule = ScriptRule::builder("age-groups")
///     .function_name("deriveAge")
///     .build();
/// assert_eq!(rule.to_string(), "JavaScript deriveAge");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRule {
    /// Unique identifier for the rule.
    pub id: String,
    /// Name of the function to invoke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    /// Human-readable label used in diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Libraries to load before the function runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<ScriptLibrary>,
    /// Whether the engine runs this rule.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Execution order within a rule set. Lower runs first.
    #[serde(default)]
    pub order: i32,
}

fn enabled_by_default() -> bool {
    true
}

impl ScriptRule {
    /// Creates an enabled rule invoking `function_name`.
    pub fn new(id: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self::builder(id).function_name(function_name).build()
    }

    /// Starts building a rule.
    pub fn builder(id: impl Into<String>) -> ScriptRuleBuilder {
        ScriptRuleBuilder::new(id)
    }

    /// The function name, unless it is absent or blank.
    pub fn function_name(&self) -> Option<&str> {
        self.function_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// The diagnostic label.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ScriptRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .label
            .as_deref()
            .filter(|label| !label.is_empty())
            .or_else(|| self.function_name())
            .unwrap_or("(Missing JavaScript function name)");
        write!(f, "{} {}", LABEL_START, name)
    }
}

/// A builder for creating [`ScriptRule`]s using a fluent API.
#[derive(Debug, Clone)]
pub struct ScriptRuleBuilder {
    rule: ScriptRule,
}

impl ScriptRuleBuilder {
    /// Creates a builder for an enabled rule with no function.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            rule: ScriptRule {
                id: id.into(),
                function_name: None,
                label: None,
                libraries: Vec::new(),
                enabled: true,
                order: 0,
            },
        }
    }

    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.rule.function_name = Some(name.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.rule.label = Some(label.into());
        self
    }

    /// Adds a library to load before invocation.
    pub fn library(mut self, library: ScriptLibrary) -> Self {
        self.rule.libraries.push(library);
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.rule.order = order;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.rule.enabled = enabled;
        self
    }

    pub fn build(self) -> ScriptRule {
        self.rule
    }
}

/// A named collection of script rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Name of the set.
    pub name: String,
    /// The rules, in definition order.
    #[serde(default)]
    pub rules: Vec<ScriptRule>,
}

impl RuleSet {
    /// Creates an empty rule set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Parses a rule set from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add a rule to the set
    pub fn add(&mut self, rule: ScriptRule) {
        self.rules.push(rule);
    }

    /// Enabled rules by ascending order. Ties keep definition order.
    pub fn enabled_sorted(&self) -> Vec<&ScriptRule> {
        let mut rules: Vec<_> = self.rules.iter().filter(|r| r.enabled).collect();
        rules.sort_by_key(|r| r.order);
        rules
    }

    /// Enable/disable a rule by ID
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.id == id) {
            rule.enabled = enabled;
            true
        } else {
            false
        }
    }

    /// Find a rule by ID
    pub fn get(&self, id: &str) -> Option<&ScriptRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefers_explicit_label() {
        let rule = ScriptRule::builder("r1")
            .function_name("deriveAge")
            .label("Age groups")
            .build();
        assert_eq!(rule.label(), "JavaScript Age groups");
    }

    #[test]
    fn test_label_without_function() {
        let rule = ScriptRule::builder("r1").build();
        assert_eq!(rule.function_name(), None);
        assert_eq!(rule.to_string(), "JavaScript (Missing JavaScript function name)");
    }

    #[test]
    fn test_blank_function_name_is_missing() {
        let rule = ScriptRule::builder("r1").function_name("   ").build();
        assert_eq!(rule.function_name(), None);
    }

    #[test]
    fn test_serde_camel_case() {
        let rule: ScriptRule = serde_json::from_str(
            r#"{"id": "r1", "functionName": "deriveAge", "libraries": [{"urls": ["urn:lib"]}]}"#,
        )
        .unwrap();

        assert_eq!(rule.function_name(), Some("deriveAge"));
        assert!(rule.enabled);
        assert_eq!(rule.order, 0);
        assert_eq!(rule.libraries.len(), 1);

        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["functionName"], "deriveAge");
        assert!(json.get("label").is_none());
    }

    #[test]
    fn test_enabled_sorted() {
        let mut set = RuleSet::new("test");
        set.add(ScriptRule::builder("late").function_name("a").order(5).build());
        set.add(ScriptRule::builder("first").function_name("b").order(-1).build());
        set.add(ScriptRule::builder("off").function_name("c").enabled(false).build());
        set.add(ScriptRule::builder("tie").function_name("d").order(5).build());

        let ids: Vec<_> = set.enabled_sorted().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "late", "tie"]);

        assert!(set.set_enabled("off", true));
        assert!(!set.set_enabled("unknown", true));
        assert_eq!(set.enabled_sorted().len(), 4);
    }

    #[test]
    fn test_rule_set_from_json() {
        let set = RuleSet::from_json(
            r#"{"name": "people", "rules": [{"id": "ages", "functionName": "deriveAge", "order": 2}]}"#,
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("ages").map(|r| r.order), Some(2));

        assert!(RuleSet::from_json("[]").is_err());
    }
}
