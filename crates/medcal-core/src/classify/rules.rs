//! Injected rule tables for the classifier.
//!
//! Category behavior (default amounts, treatment-stage requirement,
//! attendance locks, label canonicalization) lives in [`CategoryRules`],
//! keyed by normalized category id. Attendance precedence is an ordered list
//! of tri-state [`AttendanceRule`]s resolved first-match-wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::no_show::detect_no_show;
use super::normalize::normalize;
use crate::defaults::{
    CATEGORY_ROXAIR, CATEGORY_SUBCUTANEOUS, CATEGORY_SUBCUTANEOUS_EN, ROXAIR_DEFAULT_AMOUNT,
};
use crate::models::CalendarEvent;

// =============================================================================
// CATEGORY RULES
// =============================================================================

/// Behavior attached to one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    /// Canonical label for the category.
    pub label: String,
    /// Expected amount used when neither the override nor the baseline has one.
    pub default_amount: Option<i64>,
    /// Treatment stage is kept only for categories that require it.
    pub requires_treatment_stage: bool,
    /// Forces attendance to this value regardless of the override.
    pub locks_attendance: Option<bool>,
    /// Rewrite matching categories to `label`.
    pub canonicalize: bool,
}

impl CategoryRule {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            default_amount: None,
            requires_treatment_stage: false,
            locks_attendance: None,
            canonicalize: false,
        }
    }

    pub fn with_default_amount(mut self, amount: i64) -> Self {
        self.default_amount = Some(amount);
        self
    }

    pub fn requiring_treatment_stage(mut self) -> Self {
        self.requires_treatment_stage = true;
        self
    }

    pub fn locking_attendance(mut self, attended: bool) -> Self {
        self.locks_attendance = Some(attended);
        self
    }

    pub fn canonicalizing(mut self) -> Self {
        self.canonicalize = true;
        self
    }
}

/// Category rules keyed by normalized category id.
#[derive(Debug, Clone, Default)]
pub struct CategoryRules {
    rules: HashMap<String, CategoryRule>,
    /// Normalized alias id to the normalized id of the rule it names.
    aliases: HashMap<String, String>,
}

impl CategoryRules {
    /// The clinic's built-in vocabulary: Roxair and subcutaneous treatment.
    pub fn builtin() -> Self {
        Self::default()
            .with_rule(CategoryRule::new(CATEGORY_ROXAIR).with_default_amount(ROXAIR_DEFAULT_AMOUNT))
            .with_rule(
                CategoryRule::new(CATEGORY_SUBCUTANEOUS)
                    .requiring_treatment_stage()
                    .canonicalizing(),
            )
            .with_alias(CATEGORY_SUBCUTANEOUS_EN, CATEGORY_SUBCUTANEOUS)
    }

    /// Add or replace the rule for `rule.label`.
    pub fn with_rule(mut self, rule: CategoryRule) -> Self {
        self.insert(rule);
        self
    }

    /// Make `alias` resolve to the rule labelled `label`.
    pub fn with_alias(mut self, alias: &str, label: &str) -> Self {
        self.aliases.insert(normalize(alias), normalize(label));
        self
    }

    pub fn insert(&mut self, rule: CategoryRule) {
        self.rules.insert(normalize(&rule.label), rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule for a free-text category, if the category is known.
    pub fn lookup(&self, category: Option<&str>) -> Option<&CategoryRule> {
        let id = normalize(category?);
        if id.is_empty() {
            return None;
        }
        self.rules.get(&id).or_else(|| {
            self.aliases
                .get(&id)
                .and_then(|target| self.rules.get(target))
        })
    }

    pub fn default_amount(&self, category: Option<&str>) -> Option<i64> {
        self.lookup(category).and_then(|r| r.default_amount)
    }

    pub fn requires_treatment_stage(&self, category: Option<&str>) -> bool {
        self.lookup(category)
            .is_some_and(|r| r.requires_treatment_stage)
    }
}

// =============================================================================
// ATTENDANCE RULES
// =============================================================================

/// Opinion of one attendance rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVerdict {
    AssertTrue,
    AssertFalse,
    NoOpinion,
}

impl RuleVerdict {
    /// The attendance value this verdict asserts, if any.
    pub fn attendance(self) -> Option<bool> {
        match self {
            RuleVerdict::AssertTrue => Some(true),
            RuleVerdict::AssertFalse => Some(false),
            RuleVerdict::NoOpinion => None,
        }
    }
}

/// What an attendance rule may look at: the baseline event and the
/// category resolved by the earlier classification steps.
#[derive(Debug, Clone, Copy)]
pub struct AttendanceInput<'a> {
    pub event: &'a CalendarEvent,
    pub category: Option<&'a str>,
    pub rule: Option<&'a CategoryRule>,
}

/// A rule that may lock attendance before the override is consulted.
pub trait AttendanceRule: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn evaluate(&self, input: &AttendanceInput<'_>) -> RuleVerdict;
}

/// Explicit no-show text forces `attended = false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitNoShowRule;

impl AttendanceRule for ExplicitNoShowRule {
    fn name(&self) -> &'static str {
        "explicit_no_show"
    }

    fn evaluate(&self, input: &AttendanceInput<'_>) -> RuleVerdict {
        match detect_no_show(input.event) {
            Some(_) => RuleVerdict::AssertFalse,
            None => RuleVerdict::NoOpinion,
        }
    }
}

/// Applies [`CategoryRule::locks_attendance`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryLockRule;

impl AttendanceRule for CategoryLockRule {
    fn name(&self) -> &'static str {
        "category_lock"
    }

    fn evaluate(&self, input: &AttendanceInput<'_>) -> RuleVerdict {
        match input.rule.and_then(|r| r.locks_attendance) {
            Some(true) => RuleVerdict::AssertTrue,
            Some(false) => RuleVerdict::AssertFalse,
            None => RuleVerdict::NoOpinion,
        }
    }
}

/// Ordered attendance rules, first non-abstaining verdict wins.
#[derive(Debug, Clone, Default)]
pub struct AttendanceRules {
    rules: Vec<Arc<dyn AttendanceRule>>,
}

impl AttendanceRules {
    /// Explicit no-show first, then category locks.
    pub fn builtin() -> Self {
        Self::default()
            .with_rule(ExplicitNoShowRule)
            .with_rule(CategoryLockRule)
    }

    /// Append a rule at the lowest precedence.
    pub fn with_rule<R: AttendanceRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First asserted attendance value and the name of the rule asserting it.
    pub fn resolve(&self, input: &AttendanceInput<'_>) -> Option<(&'static str, bool)> {
        self.rules.iter().find_map(|rule| {
            rule.evaluate(input)
                .attendance()
                .map(|value| (rule.name(), value))
        })
    }
}
