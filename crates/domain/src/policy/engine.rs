//! Ordered, first-match evaluation of a rule set.

use std::cmp::Reverse;

use super::{AutomationRule, DecisionalContext};
use crate::error::RuleError;
use crate::id::RuleId;

/// A rule left out of the loaded set because its clauses are malformed.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRule {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub error: RuleError,
}

/// Result of [`RuleEngine::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome<'r> {
    /// First rule whose clauses all held.
    pub matched: Option<&'r AutomationRule>,
    /// Rules evaluated, in evaluation order.
    pub evaluated: Vec<RuleId>,
}

/// Evaluates rules by descending priority and stops at the first match.
///
/// Rules of equal priority keep the order they were loaded in. The engine
/// borrows its rules and holds no other state, so evaluation is a pure
/// function of the loaded set and the context.
#[derive(Debug, Default)]
pub struct RuleEngine<'r> {
    rules: Vec<&'r AutomationRule>,
}

impl<'r> RuleEngine<'r> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the loaded set with the enabled, well-formed rules of `rules`.
    ///
    /// Malformed rules are skipped and returned so the caller can report them.
    pub fn load_rules<I>(&mut self, rules: I) -> Vec<RejectedRule>
    where
        I: IntoIterator<Item = &'r AutomationRule>,
    {
        let mut rejected = Vec::new();
        self.rules = rules
            .into_iter()
            .filter(|rule| rule.enabled)
            .filter(|rule| match rule.check_clauses() {
                Ok(()) => true,
                Err(error) => {
                    rejected.push(RejectedRule {
                        rule_id: rule.id,
                        rule_name: rule.name.clone(),
                        error,
                    });
                    false
                }
            })
            .collect();
        self.rules.sort_by_key(|rule| Reverse(rule.priority));
        rejected
    }

    /// Loaded rules, in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = &'r AutomationRule> + '_ {
        self.rules.iter().copied()
    }

    #[must_use]
    pub fn evaluate(&self, ctx: &DecisionalContext<'_>) -> RuleOutcome<'r> {
        let mut evaluated = Vec::new();
        for rule in &self.rules {
            evaluated.push(rule.id);
            if rule.matches(ctx) {
                return RuleOutcome {
                    matched: Some(*rule),
                    evaluated,
                };
            }
        }
        RuleOutcome {
            matched: None,
            evaluated,
        }
    }
}
