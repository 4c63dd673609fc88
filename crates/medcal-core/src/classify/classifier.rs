//! The classifier: override + baseline event → finalized record.

use once_cell::sync::Lazy;
use tracing::trace;

use super::amounts::{parse_decimal, resolve_amounts};
use super::normalize::sanitize;
use super::rules::{AttendanceInput, AttendanceRules, CategoryRules};
use crate::error::Result;
use crate::models::{CalendarEvent, FinalizedRecord, OverrideEntry};

/// Merges a user override with an event baseline into a finalized record.
///
/// Evaluation order is fixed and each step only reads earlier outputs:
/// category, category rule, attendance rules, attendance, amounts, dosage
/// value, dosage unit, treatment stage. Classification is pure and never
/// fails; persistence is the caller's job.
///
/// Classification is idempotent: classifying an event seeded from its own
/// previous result yields the same record, which is what makes whole-batch
/// resubmission a safe recovery for failed reclassification jobs.
#[derive(Debug, Clone)]
pub struct Classifier {
    categories: CategoryRules,
    attendance: AttendanceRules,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(CategoryRules::builtin(), AttendanceRules::builtin())
    }
}

impl Classifier {
    pub fn new(categories: CategoryRules, attendance: AttendanceRules) -> Self {
        Self {
            categories,
            attendance,
        }
    }

    pub fn categories(&self) -> &CategoryRules {
        &self.categories
    }

    pub fn attendance_rules(&self) -> &AttendanceRules {
        &self.attendance
    }

    pub fn classify(&self, entry: &OverrideEntry, event: &CalendarEvent) -> FinalizedRecord {
        let mut category = sanitize(entry.category.as_deref()).or_else(|| event.category.clone());

        let rule = self.categories.lookup(category.as_deref());
        if let Some(rule) = rule.filter(|r| r.canonicalize) {
            category = Some(rule.label.clone());
        }

        let verdict = self.attendance.resolve(&AttendanceInput {
            event,
            category: category.as_deref(),
            rule,
        });
        let attended = match verdict {
            Some((rule_name, value)) => {
                trace!(event_key = %event.key(), rule = rule_name, attended = value, "Attendance locked by rule");
                Some(value)
            }
            None => entry.attended,
        };

        let amounts = resolve_amounts(entry, event, rule, attended);

        let dosage_value = parse_decimal(entry.dosage_value.as_deref()).or(event.dosage_value);
        let dosage_unit = sanitize(entry.dosage_unit.as_deref()).or_else(|| event.dosage_unit.clone());

        let treatment_stage = if rule.is_some_and(|r| r.requires_treatment_stage) {
            sanitize(entry.treatment_stage.as_deref())
        } else {
            None
        };

        FinalizedRecord {
            category,
            amount_expected: amounts.expected,
            amount_paid: amounts.paid,
            attended,
            dosage_value,
            dosage_unit,
            treatment_stage,
        }
    }

    /// Validate the override's shape, then classify.
    pub fn classify_checked(
        &self,
        entry: &OverrideEntry,
        event: &CalendarEvent,
    ) -> Result<FinalizedRecord> {
        entry.validate()?;
        Ok(self.classify(entry, event))
    }
}

static BUILTIN: Lazy<Classifier> = Lazy::new(Classifier::default);

/// Classify with the built-in rule tables.
pub fn classify(entry: &OverrideEntry, event: &CalendarEvent) -> FinalizedRecord {
    BUILTIN.classify(entry, event)
}
