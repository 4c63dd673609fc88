//! Core traits for medcal abstractions.
//!
//! Persistence and job-status transport are external collaborators; these
//! traits are the seams the classification engine and its pollers depend on.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::classify::CategoryRules;
use crate::error::Result;
use crate::models::*;

// =============================================================================
// EVENT REPOSITORY
// =============================================================================

/// Storage of synced calendar events and their persisted classification.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert or replace an event (used by the calendar sync).
    async fn upsert(&self, event: CalendarEvent) -> Result<()>;

    /// Get an event by key.
    async fn get(&self, key: &EventKey) -> Result<Option<CalendarEvent>>;

    /// Total number of stored events.
    async fn count(&self) -> Result<u64>;

    /// Count the events matching a reclassification filter.
    async fn count_eligible(&self, filter: &ReclassifyFilter, rules: &CategoryRules)
        -> Result<u64>;

    /// List up to `limit` eligible events, ordered by event key.
    async fn list_eligible(
        &self,
        filter: &ReclassifyFilter,
        rules: &CategoryRules,
        limit: usize,
    ) -> Result<Vec<CalendarEvent>>;

    /// Persist a finalized record onto the stored event.
    async fn apply_classification(&self, key: &EventKey, record: &FinalizedRecord) -> Result<()>;
}

// =============================================================================
// JOB REPOSITORY
// =============================================================================

/// Storage of job records. The job engine is the only writer.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Queue a new pending job with its eagerly counted total.
    async fn queue(&self, job_type: JobType, total: u64, payload: Option<JsonValue>)
        -> Result<Uuid>;

    /// Claim the oldest pending job whose type is in `job_types`, marking it running.
    /// An empty slice means "claim any type".
    async fn claim_next_for_types(&self, job_types: &[JobType]) -> Result<Option<Job>>;

    /// Record progress and the counters accumulated so far on a running job.
    ///
    /// Progress never decreases and stays below `total` until completion.
    async fn update_progress(
        &self,
        job_id: Uuid,
        progress: u64,
        result: &ReclassifyResult,
    ) -> Result<()>;

    /// Mark a running job completed; progress becomes `total`.
    async fn complete(&self, job_id: Uuid, result: ReclassifyResult) -> Result<()>;

    /// Mark a running job failed; progress stays where it was.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Get job by ID.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Get pending jobs count.
    async fn pending_count(&self) -> Result<i64>;

    /// List the most recently created jobs, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Job>>;
}

// =============================================================================
// JOB STATUS SOURCE
// =============================================================================

/// Idempotent read of a job's current state, local or remote.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn job_status(&self, job_id: Uuid) -> Result<Job>;
}

#[async_trait]
impl<T: JobStatusSource + ?Sized> JobStatusSource for Arc<T> {
    async fn job_status(&self, job_id: Uuid) -> Result<Job> {
        (**self).job_status(job_id).await
    }
}
