//! Core data models for medcal.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::classify::CategoryRules;
use crate::defaults::{EVENT_KEY_SEPARATOR, OVERRIDE_NUMERIC_MAX_LEN, OVERRIDE_TEXT_MAX_LEN};
use crate::error::{Error, Result};

// =============================================================================
// CALENDAR EVENTS
// =============================================================================

/// Address of one (event, override) pair: `calendarId:::eventId`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventKey(String);

impl EventKey {
    /// Build the key for a calendar/event id pair.
    pub fn new(calendar_id: &str, event_id: &str) -> Self {
        Self(format!("{calendar_id}{EVENT_KEY_SEPARATOR}{event_id}"))
    }

    /// Validate a calendar/event id pair and build its key.
    ///
    /// Ids must be non-empty and must not contain the separator, otherwise
    /// two different pairs could collide on the same key.
    pub fn checked(calendar_id: &str, event_id: &str) -> Result<Self> {
        for (field, value) in [("calendarId", calendar_id), ("eventId", event_id)] {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("{field} must not be empty")));
            }
            if value.contains(EVENT_KEY_SEPARATOR) {
                return Err(Error::Validation(format!(
                    "{field} must not contain '{EVENT_KEY_SEPARATOR}'"
                )));
            }
        }
        Ok(Self::new(calendar_id, event_id))
    }

    /// Split the key back into `(calendar_id, event_id)`.
    pub fn parts(&self) -> Option<(&str, &str)> {
        self.0.split_once(EVENT_KEY_SEPARATOR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last synced state of an appointment from the calendar provider.
///
/// The classification fields hold whatever was last persisted for the event,
/// which makes [`CalendarEvent::finalized`] the prior record a reclassification
/// compares against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub calendar_id: String,
    pub event_id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub amount_expected: Option<i64>,
    #[serde(default)]
    pub amount_paid: Option<i64>,
    #[serde(default)]
    pub attended: Option<bool>,
    #[serde(default)]
    pub dosage_value: Option<f64>,
    #[serde(default)]
    pub dosage_unit: Option<String>,
    #[serde(default)]
    pub treatment_stage: Option<String>,
}

impl CalendarEvent {
    /// Create an event with no text and no classification.
    pub fn new(calendar_id: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            event_id: event_id.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(&self.calendar_id, &self.event_id)
    }

    /// The classification currently stored on this event.
    pub fn finalized(&self) -> FinalizedRecord {
        FinalizedRecord {
            category: self.category.clone(),
            amount_expected: self.amount_expected,
            amount_paid: self.amount_paid,
            attended: self.attended,
            dosage_value: self.dosage_value,
            dosage_unit: self.dosage_unit.clone(),
            treatment_stage: self.treatment_stage.clone(),
        }
    }

    /// Overwrite the classification fields with a finalized record.
    pub fn apply_record(&mut self, record: &FinalizedRecord) {
        self.category = record.category.clone();
        self.amount_expected = record.amount_expected;
        self.amount_paid = record.amount_paid;
        self.attended = record.attended;
        self.dosage_value = record.dosage_value;
        self.dosage_unit = record.dosage_unit.clone();
        self.treatment_stage = record.treatment_stage.clone();
    }
}

// =============================================================================
// OVERRIDES & FINALIZED RECORDS
// =============================================================================

/// Accept a JSON string, number, or null for free-text numeric inputs.
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Number(n)) => Some(n.to_string()),
        None => None,
    })
}

/// User-editable draft for one event. Amounts and dosage are free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideEntry {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub amount_expected: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub amount_paid: Option<String>,
    #[serde(default)]
    pub attended: Option<bool>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub dosage_value: Option<String>,
    #[serde(default)]
    pub dosage_unit: Option<String>,
    #[serde(default)]
    pub treatment_stage: Option<String>,
}

impl OverrideEntry {
    /// Seed a draft from the values currently stored on an event.
    ///
    /// Stored amounts and dosage stay out of the draft: the classifier falls
    /// back to the event's own typed values, so they never pass through the
    /// free-text parsers (which drop signs).
    pub fn from_event(event: &CalendarEvent) -> Self {
        Self {
            category: event.category.clone(),
            amount_expected: None,
            amount_paid: None,
            attended: event.attended,
            dosage_value: None,
            dosage_unit: event.dosage_unit.clone(),
            treatment_stage: event.treatment_stage.clone(),
        }
    }

    /// Check shape constraints before classification.
    ///
    /// Unparseable numbers are not a validation failure (they degrade to
    /// null during classification); oversized or control-character input is.
    pub fn validate(&self) -> Result<()> {
        let text_fields = [
            ("category", &self.category),
            ("dosageUnit", &self.dosage_unit),
            ("treatmentStage", &self.treatment_stage),
        ];
        for (field, value) in text_fields {
            check_text(field, value.as_deref(), OVERRIDE_TEXT_MAX_LEN)?;
        }

        let numeric_fields = [
            ("amountExpected", &self.amount_expected),
            ("amountPaid", &self.amount_paid),
            ("dosageValue", &self.dosage_value),
        ];
        for (field, value) in numeric_fields {
            check_text(field, value.as_deref(), OVERRIDE_NUMERIC_MAX_LEN)?;
        }
        Ok(())
    }
}

fn check_text(field: &str, value: Option<&str>, max_len: usize) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if value.chars().count() > max_len {
        return Err(Error::Validation(format!(
            "{field} exceeds {max_len} characters"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(Error::Validation(format!(
            "{field} contains control characters"
        )));
    }
    Ok(())
}

/// The persisted output of the classifier for one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedRecord {
    pub category: Option<String>,
    pub amount_expected: Option<i64>,
    pub amount_paid: Option<i64>,
    pub attended: Option<bool>,
    pub dosage_value: Option<f64>,
    pub dosage_unit: Option<String>,
    pub treatment_stage: Option<String>,
}

impl FinalizedRecord {
    /// Wire names of every record field, in declaration order.
    pub const FIELD_NAMES: [&'static str; 7] = [
        "category",
        "amountExpected",
        "amountPaid",
        "attended",
        "dosageValue",
        "dosageUnit",
        "treatmentStage",
    ];

    /// Wire names of the fields whose value differs from `prior`.
    pub fn changed_fields(&self, prior: &FinalizedRecord) -> Vec<&'static str> {
        let diffs = [
            self.category != prior.category,
            self.amount_expected != prior.amount_expected,
            self.amount_paid != prior.amount_paid,
            self.attended != prior.attended,
            self.dosage_value != prior.dosage_value,
            self.dosage_unit != prior.dosage_unit,
            self.treatment_stage != prior.treatment_stage,
        ];
        Self::FIELD_NAMES
            .iter()
            .zip(diffs)
            .filter_map(|(name, changed)| changed.then_some(*name))
            .collect()
    }
}

// =============================================================================
// JOB TYPES
// =============================================================================

/// Status of a job. The lowercase strings are a wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Completed and failed jobs never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::Serialization(format!("unknown job status: {other}"))),
        }
    }
}

/// Type of job to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    /// Reapply the classifier over the events matching a missing-field filter
    #[serde(rename = "reclassify")]
    Reclassify,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Reclassify => "reclassify",
        }
    }
}

/// Outcome counters of a reclassification job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclassifyResult {
    /// Events whose finalized record differed from the stored one.
    pub reclassified: u64,
    /// Per-field change counts, keyed by wire field name.
    pub field_counts: BTreeMap<String, u64>,
}

impl ReclassifyResult {
    /// Count one reclassified event and each of its changed fields.
    pub fn record(&mut self, changed: &[&str]) {
        if changed.is_empty() {
            return;
        }
        self.reclassified += 1;
        for field in changed {
            *self.field_counts.entry((*field).to_string()).or_insert(0) += 1;
        }
    }
}

/// A reclassification job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    /// Events processed so far.
    pub progress: u64,
    /// Eligible events, counted at submission.
    pub total: u64,
    #[serde(default)]
    pub result: ReclassifyResult,
    /// Present only when the job failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A fresh pending job.
    pub fn pending(job_type: JobType, total: u64, payload: Option<JsonValue>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type,
            status: JobStatus::Pending,
            progress: 0,
            total,
            result: ReclassifyResult::default(),
            error: None,
            payload,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Rounded completion percentage; `0` for an empty job.
    pub fn progress_percent(&self) -> u8 {
        progress_percent(self.progress, self.total)
    }
}

/// `round(100 * progress / total)` in integer arithmetic, clamped to 100.
///
/// Returns `0` when `total` is zero.
pub fn progress_percent(progress: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let progress = u128::from(progress.min(total));
    let total = u128::from(total);
    let percent = (200 * progress + total) / (2 * total);
    percent.min(100) as u8
}

// =============================================================================
// RECLASSIFICATION FILTERS
// =============================================================================

/// How missing-field flags combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterMode {
    #[serde(rename = "AND")]
    And,
    #[default]
    #[serde(rename = "OR")]
    Or,
}

/// A single missing-field condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Category,
    AmountExpected,
    AmountPaid,
    /// Either amount is missing.
    Amount,
    Attended,
    Dosage,
    /// The category requires a treatment stage and none is stored.
    TreatmentStage,
}

impl MissingField {
    pub fn is_missing(&self, event: &CalendarEvent, rules: &CategoryRules) -> bool {
        match self {
            MissingField::Category => event
                .category
                .as_deref()
                .map_or(true, |c| c.trim().is_empty()),
            MissingField::AmountExpected => event.amount_expected.is_none(),
            MissingField::AmountPaid => event.amount_paid.is_none(),
            MissingField::Amount => event.amount_expected.is_none() || event.amount_paid.is_none(),
            MissingField::Attended => event.attended.is_none(),
            MissingField::Dosage => event.dosage_value.is_none(),
            MissingField::TreatmentStage => {
                rules.requires_treatment_stage(event.category.as_deref())
                    && event
                        .treatment_stage
                        .as_deref()
                        .map_or(true, |s| s.trim().is_empty())
            }
        }
    }
}

/// Selects the eligible events of a reclassification job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReclassifyFilter {
    pub missing_category: bool,
    pub missing_amount_expected: bool,
    pub missing_amount_paid: bool,
    pub missing_amount: bool,
    pub missing_attended: bool,
    pub missing_dosage: bool,
    pub missing_treatment_stage: bool,
    pub filter_mode: FilterMode,
}

impl ReclassifyFilter {
    /// The conditions selected by this filter.
    pub fn conditions(&self) -> Vec<MissingField> {
        [
            (self.missing_category, MissingField::Category),
            (self.missing_amount_expected, MissingField::AmountExpected),
            (self.missing_amount_paid, MissingField::AmountPaid),
            (self.missing_amount, MissingField::Amount),
            (self.missing_attended, MissingField::Attended),
            (self.missing_dosage, MissingField::Dosage),
            (self.missing_treatment_stage, MissingField::TreatmentStage),
        ]
        .into_iter()
        .filter_map(|(enabled, field)| enabled.then_some(field))
        .collect()
    }

    /// Whether an event is eligible. A filter with no flags selects everything.
    pub fn matches(&self, event: &CalendarEvent, rules: &CategoryRules) -> bool {
        let conditions = self.conditions();
        if conditions.is_empty() {
            return true;
        }
        match self.filter_mode {
            FilterMode::And => conditions.iter().all(|c| c.is_missing(event, rules)),
            FilterMode::Or => conditions.iter().any(|c| c.is_missing(event, rules)),
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Response to a bulk reclassification submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    pub total_events: u64,
}

/// Response to a job status read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job: Job,
}

/// Single-event classification request: the override plus the event address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyEventRequest {
    pub calendar_id: String,
    pub event_id: String,
    #[serde(flatten)]
    pub entry: OverrideEntry,
}

impl ClassifyEventRequest {
    /// Validate the event address and the override shape.
    pub fn validate(&self) -> Result<EventKey> {
        let key = EventKey::checked(&self.calendar_id, &self.event_id)?;
        self.entry.validate()?;
        Ok(key)
    }
}

/// Result of a single-event classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyEventResponse {
    pub event_key: EventKey,
    pub record: FinalizedRecord,
    /// Fields that differed from the stored record and were persisted.
    pub changed_fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_key_format() {
        let key = EventKey::new("clinic@group.calendar", "abc123");
        assert_eq!(key.as_str(), "clinic@group.calendar:::abc123");
        assert_eq!(key.parts(), Some(("clinic@group.calendar", "abc123")));
    }

    #[test]
    fn test_event_key_checked_rejects_separator() {
        assert!(EventKey::checked("cal:::x", "evt").is_err());
        assert!(EventKey::checked("cal", "").is_err());
        assert!(EventKey::checked("cal", "evt").is_ok());
    }

    #[test]
    fn test_job_status_wire_strings() {
        for (status, wire) in [
            (JobStatus::Pending, "\"pending\""),
            (JobStatus::Running, "\"running\""),
            (JobStatus::Completed, "\"completed\""),
            (JobStatus::Failed, "\"failed\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), wire);
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_status_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn test_progress_percent_zero_total() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(5, 0), 0);
    }

    #[test]
    fn test_progress_percent_rounding() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(1, 200), 1);
        assert_eq!(progress_percent(1, 201), 0);
        assert_eq!(progress_percent(10, 10), 100);
        assert_eq!(progress_percent(u64::MAX, u64::MAX), 100);
    }

    #[test]
    fn test_job_serializes_wire_shape() {
        let mut job = Job::pending(JobType::Reclassify, 4, None);
        job.result.record(&["category", "amountPaid"]);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["type"], "reclassify");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["total"], 4);
        assert_eq!(value["result"]["reclassified"], 1);
        assert_eq!(value["result"]["fieldCounts"]["amountPaid"], 1);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_changed_fields() {
        let prior = FinalizedRecord {
            category: Some("Roxair".into()),
            amount_paid: Some(10),
            ..Default::default()
        };
        let next = FinalizedRecord {
            category: Some("Roxair".into()),
            amount_paid: Some(0),
            attended: Some(false),
            ..Default::default()
        };
        assert_eq!(next.changed_fields(&prior), vec!["amountPaid", "attended"]);
        assert!(prior.changed_fields(&prior).is_empty());
    }

    #[test]
    fn test_override_accepts_numbers_and_strings() {
        let entry: OverrideEntry = serde_json::from_value(json!({
            "category": "Roxair",
            "amountExpected": 1500,
            "amountPaid": "$1.000",
            "dosageValue": 2.5,
            "attended": null
        }))
        .unwrap();
        assert_eq!(entry.amount_expected.as_deref(), Some("1500"));
        assert_eq!(entry.amount_paid.as_deref(), Some("$1.000"));
        assert_eq!(entry.dosage_value.as_deref(), Some("2.5"));
        assert_eq!(entry.attended, None);
    }

    #[test]
    fn test_override_validation() {
        let ok = OverrideEntry {
            category: Some("Roxair".into()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let too_long = OverrideEntry {
            category: Some("x".repeat(OVERRIDE_TEXT_MAX_LEN + 1)),
            ..Default::default()
        };
        assert!(matches!(too_long.validate(), Err(Error::Validation(_))));

        let control = OverrideEntry {
            amount_paid: Some("12\u{0007}".into()),
            ..Default::default()
        };
        assert!(matches!(control.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_classify_request_flattens_override() {
        let request: ClassifyEventRequest = serde_json::from_value(json!({
            "calendarId": "cal",
            "eventId": "evt",
            "category": "Roxair",
            "attended": true
        }))
        .unwrap();
        assert_eq!(request.entry.category.as_deref(), Some("Roxair"));
        assert_eq!(request.entry.attended, Some(true));
        assert_eq!(request.validate().unwrap().as_str(), "cal:::evt");
    }

    #[test]
    fn test_filter_modes() {
        let rules = CategoryRules::builtin();
        let mut event = CalendarEvent::new("cal", "evt");
        event.category = Some("Roxair".into());

        let filter = ReclassifyFilter {
            missing_category: true,
            missing_amount: true,
            filter_mode: FilterMode::And,
            ..Default::default()
        };
        assert!(!filter.matches(&event, &rules));

        let filter = ReclassifyFilter {
            filter_mode: FilterMode::Or,
            ..filter
        };
        assert!(filter.matches(&event, &rules));
    }

    #[test]
    fn test_empty_filter_selects_everything() {
        let filter = ReclassifyFilter::default();
        assert!(filter.conditions().is_empty());
        assert!(filter.matches(&CalendarEvent::new("c", "e"), &CategoryRules::builtin()));
    }

    #[test]
    fn test_filter_deserializes_defaults() {
        let filter: ReclassifyFilter =
            serde_json::from_value(json!({"missingDosage": true, "filterMode": "AND"})).unwrap();
        assert!(filter.missing_dosage);
        assert!(!filter.missing_category);
        assert_eq!(filter.filter_mode, FilterMode::And);
    }

    #[test]
    fn test_missing_treatment_stage_only_for_stage_categories() {
        let rules = CategoryRules::builtin();
        let mut event = CalendarEvent::new("cal", "evt");
        event.category = Some("Roxair".into());
        assert!(!MissingField::TreatmentStage.is_missing(&event, &rules));

        event.category = Some("tratamiento subcutaneo".into());
        assert!(MissingField::TreatmentStage.is_missing(&event, &rules));

        event.treatment_stage = Some("Inducción".into());
        assert!(!MissingField::TreatmentStage.is_missing(&event, &rules));
    }
}
