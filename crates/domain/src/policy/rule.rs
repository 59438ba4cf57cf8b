//! A named, prioritized conjunction of clauses.

use serde::{Deserialize, Serialize};

use super::{Clause, DecisionalContext};
use crate::error::{RuleError, SunHashError, ValidationError};
use crate::id::RuleId;

/// A rule matches when it is enabled and every clause holds.
///
/// Rules with a higher `priority` are evaluated first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: RuleId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub clauses: Vec<Clause>,
}

fn default_enabled() -> bool {
    true
}

impl AutomationRule {
    /// Create a builder for constructing an [`AutomationRule`].
    #[must_use]
    pub fn builder() -> AutomationRuleBuilder {
        AutomationRuleBuilder::default()
    }

    /// Check the clause set alone.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NoClauses`] for an empty rule, or the first
    /// clause error found.
    pub fn check_clauses(&self) -> Result<(), RuleError> {
        if self.clauses.is_empty() {
            return Err(RuleError::NoClauses);
        }
        self.clauses.iter().try_for_each(Clause::check)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - the clause set is empty or malformed ([`ValidationError::Rule`])
    pub fn validate(&self) -> Result<(), SunHashError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        self.check_clauses().map_err(ValidationError::from)?;
        Ok(())
    }

    /// Whether the rule fires for `ctx`. Disabled rules never fire.
    #[must_use]
    pub fn matches(&self, ctx: &DecisionalContext<'_>) -> bool {
        self.enabled && self.clauses.iter().all(|clause| clause.holds(ctx))
    }
}

/// Step-by-step builder for [`AutomationRule`].
#[derive(Debug, Default)]
pub struct AutomationRuleBuilder {
    id: Option<RuleId>,
    name: Option<String>,
    description: Option<String>,
    priority: i32,
    enabled: Option<bool>,
    clauses: Vec<Clause>,
}

impl AutomationRuleBuilder {
    #[must_use]
    pub fn id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Consume the builder, validate, and return an [`AutomationRule`].
    ///
    /// # Errors
    ///
    /// Returns [`SunHashError::Validation`] if the name is missing or a clause is malformed.
    pub fn build(self) -> Result<AutomationRule, SunHashError> {
        let rule = AutomationRule {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description,
            priority: self.priority,
            enabled: self.enabled.unwrap_or(true),
            clauses: self.clauses,
        };
        rule.validate()?;
        Ok(rule)
    }
}
