//! Bulk reclassification handler.
//!
//! Reapplies the classifier to every event selected by the job's
//! [`ReclassifyFilter`], persisting records that changed. The job record is
//! the only progress channel: counters and progress are written after each
//! event so a failure leaves the last successful count in place.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{field, info, instrument, trace, warn, Span};

use medcal_core::{
    defaults, logging, Classifier, EventKey, JobType, OverrideEntry, ReclassifyFilter,
    ReclassifyResult, Result,
};
use medcal_db::Database;

use crate::handler::{JobContext, JobHandler, JobResult};

/// Handler for [`JobType::Reclassify`] jobs.
pub struct ReclassifyHandler {
    db: Database,
    classifier: Arc<Classifier>,
}

impl ReclassifyHandler {
    pub fn new(db: Database, classifier: Arc<Classifier>) -> Self {
        Self { db, classifier }
    }

    /// Decode the filter stored as the job payload. A job without payload
    /// selects every event.
    fn filter(ctx: &JobContext) -> Result<ReclassifyFilter> {
        match ctx.payload() {
            Some(payload) => Ok(serde_json::from_value(payload.clone())?),
            None => Ok(ReclassifyFilter::default()),
        }
    }

    /// Classify one event seeded from its currently stored values and
    /// persist the record when it differs. Returns the changed field names.
    ///
    /// The listing is only a snapshot: the event is re-read first, and one
    /// that was deleted or no longer matches the filter is skipped.
    async fn reclassify_event(
        &self,
        key: &EventKey,
        filter: &ReclassifyFilter,
    ) -> Result<Vec<&'static str>> {
        let Some(event) = self.db.events.get(key).await? else {
            trace!(event_key = %key, "Event disappeared before reclassification");
            return Ok(Vec::new());
        };
        if !filter.matches(&event, self.classifier.categories()) {
            trace!(event_key = %key, "Event no longer eligible");
            return Ok(Vec::new());
        }

        let entry = OverrideEntry::from_event(&event);
        let record = self.classifier.classify(&entry, &event);
        let changed = record.changed_fields(&event.finalized());
        if !changed.is_empty() {
            self.db.events.apply_classification(key, &record).await?;
            trace!(event_key = %key, changed_fields = changed.len(), "Reclassified event");
        }
        Ok(changed)
    }

    async fn run(&self, ctx: &JobContext) -> Result<ReclassifyResult> {
        let job_id = ctx.job_id();
        let total = ctx.job.total;
        let filter = Self::filter(ctx)?;

        let limit = usize::try_from(total).unwrap_or(usize::MAX);
        let events = self
            .db
            .events
            .list_eligible(&filter, self.classifier.categories(), limit)
            .await?;

        let mut result = ReclassifyResult::default();
        let mut processed: u64 = 0;
        for event in &events {
            let changed = self.reclassify_event(&event.key(), &filter).await?;
            result.record(&changed);
            processed += 1;

            self.db
                .jobs
                .update_progress(job_id, processed, &result)
                .await?;
            ctx.report_progress(processed);

            if processed % defaults::RECLASSIFY_YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        }

        Ok(result)
    }
}

#[async_trait]
impl JobHandler for ReclassifyHandler {
    fn job_type(&self) -> JobType {
        JobType::Reclassify
    }

    #[instrument(
        skip(self, ctx),
        fields(
            subsystem = "jobs",
            component = "reclassify",
            job_id = %ctx.job.id,
            total = ctx.job.total,
            reclassified = field::Empty,
        )
    )]
    async fn execute(&self, ctx: JobContext) -> JobResult {
        match self.run(&ctx).await {
            Ok(result) => {
                Span::current().record(logging::RECLASSIFIED, result.reclassified);
                info!(
                    changed_field_kinds = result.field_counts.len(),
                    "Reclassification finished"
                );
                JobResult::Success(result)
            }
            Err(e) => {
                warn!(error = %e, "Reclassification aborted");
                JobResult::Failed(e.to_string())
            }
        }
    }
}
