//! Reclassification service: the operations exposed to the API layer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use medcal_core::{
    ClassifyEventRequest, ClassifyEventResponse, Classifier, Error, Job, JobStatusSource,
    JobType, ReclassifyFilter, Result, SubmitJobResponse,
};
use medcal_db::Database;

use crate::reclassify::ReclassifyHandler;

/// Submission, status, and single-event classification over one database.
#[derive(Clone)]
pub struct ReclassifyService {
    db: Database,
    classifier: Arc<Classifier>,
}

impl ReclassifyService {
    pub fn new(db: Database, classifier: Arc<Classifier>) -> Self {
        Self { db, classifier }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// A job handler sharing this service's database and classifier.
    pub fn handler(&self) -> ReclassifyHandler {
        ReclassifyHandler::new(self.db.clone(), self.classifier.clone())
    }

    /// Count the eligible events and queue a pending reclassification job.
    ///
    /// The total is fixed here; the worker processes at most that many
    /// events. Queueing wakes the worker.
    #[instrument(skip(self, filter), fields(subsystem = "jobs", op = "submit"))]
    pub async fn submit(&self, filter: ReclassifyFilter) -> Result<SubmitJobResponse> {
        let total_events = self
            .db
            .events
            .count_eligible(&filter, self.classifier.categories())
            .await?;
        let payload = serde_json::to_value(&filter)?;
        let job_id = self
            .db
            .jobs
            .queue(JobType::Reclassify, total_events, Some(payload))
            .await?;

        info!(%job_id, total = total_events, mode = ?filter.filter_mode, "Reclassification job submitted");
        Ok(SubmitJobResponse {
            job_id,
            total_events,
        })
    }

    /// Current state of a job.
    pub async fn status(&self, job_id: Uuid) -> Result<Job> {
        self.db
            .jobs
            .get(job_id)
            .await?
            .ok_or(Error::JobNotFound(job_id))
    }

    /// Most recently submitted jobs, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<Job>> {
        self.db.jobs.list_recent(limit).await
    }

    /// Classify one event against a user override and persist the record
    /// when it differs from the stored one.
    #[instrument(skip(self, request), fields(subsystem = "jobs", op = "classify_single"))]
    pub async fn classify_single_event(
        &self,
        request: ClassifyEventRequest,
    ) -> Result<ClassifyEventResponse> {
        let event_key = request.validate()?;
        let event = self
            .db
            .events
            .get(&event_key)
            .await?
            .ok_or_else(|| Error::EventNotFound(event_key.to_string()))?;

        let record = self.classifier.classify(&request.entry, &event);
        let changed = record.changed_fields(&event.finalized());
        if !changed.is_empty() {
            self.db
                .events
                .apply_classification(&event_key, &record)
                .await?;
        }
        debug!(%event_key, changed_fields = changed.len(), "Classified event");

        Ok(ClassifyEventResponse {
            event_key,
            record,
            changed_fields: changed.into_iter().map(String::from).collect(),
        })
    }
}

#[async_trait]
impl JobStatusSource for ReclassifyService {
    async fn job_status(&self, job_id: Uuid) -> Result<Job> {
        self.status(job_id).await
    }
}
