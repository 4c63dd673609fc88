//! In-memory job repository.
//!
//! Enforces the job state machine (`pending → running → completed|failed`)
//! and the progress invariant `progress ≤ total`, with `progress == total`
//! reached only on completion.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tokio::sync::{Notify, RwLock};
use tracing::debug;
use uuid::Uuid;

use medcal_core::{Error, Job, JobRepository, JobStatus, JobType, ReclassifyResult, Result};

struct Slot {
    seq: u64,
    job: Job,
}

#[derive(Default)]
struct JobTable {
    next_seq: u64,
    slots: HashMap<Uuid, Slot>,
}

impl JobTable {
    fn get_mut(&mut self, job_id: Uuid) -> Result<&mut Job> {
        self.slots
            .get_mut(&job_id)
            .map(|slot| &mut slot.job)
            .ok_or(Error::JobNotFound(job_id))
    }
}

/// In-memory implementation of JobRepository.
pub struct MemoryJobRepository {
    table: RwLock<JobTable>,
    /// Notify handle for event-driven worker wake.
    notify: Arc<Notify>,
}

impl Default for MemoryJobRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::with_notify(Arc::new(Notify::new()))
    }

    /// Create a repository sharing an existing notify handle.
    pub fn with_notify(notify: Arc<Notify>) -> Self {
        Self {
            table: RwLock::new(JobTable::default()),
            notify,
        }
    }

    /// Get the job notification handle for event-driven waking.
    pub fn job_notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}

fn transition(job: &mut Job, next: JobStatus) -> Result<()> {
    if !job.status.can_transition_to(next) {
        return Err(Error::Job(format!(
            "job {} cannot move from {} to {}",
            job.id, job.status, next
        )));
    }
    job.status = next;
    Ok(())
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn queue(
        &self,
        job_type: JobType,
        total: u64,
        payload: Option<JsonValue>,
    ) -> Result<Uuid> {
        let job = Job::pending(job_type, total, payload);
        let job_id = job.id;
        {
            let mut table = self.table.write().await;
            let seq = table.next_seq;
            table.next_seq += 1;
            table.slots.insert(job_id, Slot { seq, job });
        }
        debug!(%job_id, job_type = job_type.as_str(), total, "Queued job");
        self.notify.notify_one();
        Ok(job_id)
    }

    async fn claim_next_for_types(&self, job_types: &[JobType]) -> Result<Option<Job>> {
        let mut table = self.table.write().await;
        let next = table
            .slots
            .values_mut()
            .filter(|slot| slot.job.status == JobStatus::Pending)
            .filter(|slot| job_types.is_empty() || job_types.contains(&slot.job.job_type))
            .min_by_key(|slot| slot.seq);

        let Some(slot) = next else {
            return Ok(None);
        };
        transition(&mut slot.job, JobStatus::Running)?;
        slot.job.started_at = Some(Utc::now());
        Ok(Some(slot.job.clone()))
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        progress: u64,
        result: &ReclassifyResult,
    ) -> Result<()> {
        let mut table = self.table.write().await;
        let job = table.get_mut(job_id)?;
        if job.status != JobStatus::Running {
            return Err(Error::Job(format!(
                "cannot record progress on {} job {}",
                job.status, job_id
            )));
        }
        if progress < job.progress {
            return Err(Error::Job(format!(
                "progress for job {} must not decrease ({} -> {})",
                job_id, job.progress, progress
            )));
        }
        // progress == total is reserved for completion
        job.progress = progress.min(job.total.saturating_sub(1));
        job.result = result.clone();
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result: ReclassifyResult) -> Result<()> {
        let mut table = self.table.write().await;
        let job = table.get_mut(job_id)?;
        transition(job, JobStatus::Completed)?;
        job.progress = job.total;
        job.result = result;
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let mut table = self.table.write().await;
        let job = table.get_mut(job_id)?;
        transition(job, JobStatus::Failed)?;
        job.error = Some(error.to_string());
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let table = self.table.read().await;
        Ok(table.slots.get(&job_id).map(|slot| slot.job.clone()))
    }

    async fn pending_count(&self) -> Result<i64> {
        let table = self.table.read().await;
        Ok(table
            .slots
            .values()
            .filter(|slot| slot.job.status == JobStatus::Pending)
            .count() as i64)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Job>> {
        let table = self.table.read().await;
        let mut slots: Vec<&Slot> = table.slots.values().collect();
        slots.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(slots
            .into_iter()
            .take(limit)
            .map(|slot| slot.job.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn running_job(repo: &MemoryJobRepository, total: u64) -> Uuid {
        let id = repo.queue(JobType::Reclassify, total, None).await.unwrap();
        let claimed = repo.claim_next_for_types(&[]).await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.status, JobStatus::Running);
        assert!(claimed.started_at.is_some());
        id
    }

    #[tokio::test]
    async fn test_queue_creates_pending_job() {
        let repo = MemoryJobRepository::new();
        let id = repo
            .queue(JobType::Reclassify, 12, Some(serde_json::json!({"missingCategory": true})))
            .await
            .unwrap();
        let job = repo.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.total, 12);
        assert_eq!(job.progress, 0);
        assert!(job.payload.is_some());
        assert_eq!(repo.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_claim_is_fifo_and_exclusive() {
        let repo = MemoryJobRepository::new();
        let first = repo.queue(JobType::Reclassify, 1, None).await.unwrap();
        let second = repo.queue(JobType::Reclassify, 1, None).await.unwrap();

        let a = repo.claim_next_for_types(&[JobType::Reclassify]).await.unwrap().unwrap();
        let b = repo.claim_next_for_types(&[JobType::Reclassify]).await.unwrap().unwrap();
        assert_eq!(a.id, first);
        assert_eq!(b.id, second);
        assert!(repo.claim_next_for_types(&[]).await.unwrap().is_none());
        assert_eq!(repo.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_progress_stays_below_total_until_complete() {
        let repo = MemoryJobRepository::new();
        let id = running_job(&repo, 3).await;

        repo.update_progress(id, 1, &ReclassifyResult::default()).await.unwrap();
        repo.update_progress(id, 3, &ReclassifyResult::default()).await.unwrap();
        let job = repo.get(id).await.unwrap().unwrap();
        assert_eq!(job.progress, 2);
        assert!(job.progress < job.total);

        let mut result = ReclassifyResult::default();
        result.record(&["category"]);
        repo.complete(id, result.clone()).await.unwrap();
        let job = repo.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, job.total);
        assert_eq!(job.result, result);
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_progress_must_not_decrease() {
        let repo = MemoryJobRepository::new();
        let id = running_job(&repo, 10).await;
        repo.update_progress(id, 5, &ReclassifyResult::default()).await.unwrap();
        let err = repo
            .update_progress(id, 4, &ReclassifyResult::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Job(_)));
    }

    #[tokio::test]
    async fn test_empty_job_completes_with_zero_progress() {
        let repo = MemoryJobRepository::new();
        let id = running_job(&repo, 0).await;
        repo.update_progress(id, 0, &ReclassifyResult::default()).await.unwrap();
        repo.complete(id, ReclassifyResult::default()).await.unwrap();
        let job = repo.get(id).await.unwrap().unwrap();
        assert_eq!((job.progress, job.total), (0, 0));
        assert_eq!(job.progress_percent(), 0);
    }

    #[tokio::test]
    async fn test_fail_freezes_progress() {
        let repo = MemoryJobRepository::new();
        let id = running_job(&repo, 10).await;
        repo.update_progress(id, 4, &ReclassifyResult::default()).await.unwrap();
        repo.fail(id, "store unavailable").await.unwrap();

        let job = repo.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 4);
        assert_eq!(job.error.as_deref(), Some("store unavailable"));
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_immutable() {
        let repo = MemoryJobRepository::new();
        let id = running_job(&repo, 1).await;
        repo.complete(id, ReclassifyResult::default()).await.unwrap();

        assert!(repo.fail(id, "late").await.is_err());
        assert!(repo.complete(id, ReclassifyResult::default()).await.is_err());
        assert!(repo
            .update_progress(id, 1, &ReclassifyResult::default())
            .await
            .is_err());
        assert_eq!(
            repo.get(id).await.unwrap().unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_pending_job_cannot_complete() {
        let repo = MemoryJobRepository::new();
        let id = repo.queue(JobType::Reclassify, 1, None).await.unwrap();
        assert!(matches!(
            repo.complete(id, ReclassifyResult::default()).await,
            Err(Error::Job(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let repo = MemoryJobRepository::new();
        let id = Uuid::new_v4();
        assert!(repo.get(id).await.unwrap().is_none());
        assert!(matches!(repo.fail(id, "x").await, Err(Error::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let repo = MemoryJobRepository::new();
        let a = repo.queue(JobType::Reclassify, 1, None).await.unwrap();
        let b = repo.queue(JobType::Reclassify, 1, None).await.unwrap();
        let c = repo.queue(JobType::Reclassify, 1, None).await.unwrap();
        let ids: Vec<Uuid> = repo
            .list_recent(2)
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec![c, b]);
        assert_ne!(ids[0], a);
    }
}
