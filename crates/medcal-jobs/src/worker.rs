//! Job worker and runner for processing background jobs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, Notify};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use medcal_core::{defaults, Job, JobType, Result};
use medcal_db::Database;

use crate::handler::{JobContext, JobHandler, JobResult};
use crate::{DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS};

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Safety-net polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of concurrent jobs.
    pub max_concurrent_jobs: usize,
    /// Per-job execution timeout in seconds.
    pub job_timeout_secs: u64,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_concurrent_jobs: defaults::JOB_MAX_CONCURRENT,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_MAX_CONCURRENT` | `2` | Max concurrent jobs |
    /// | `JOB_POLL_INTERVAL_MS` | `5000` | Poll interval when no wakeup arrives |
    /// | `JOB_TIMEOUT_SECS` | `1800` | Per-job execution timeout |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent_jobs = std::env::var("JOB_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::JOB_MAX_CONCURRENT)
            .max(1);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        let job_timeout_secs = std::env::var("JOB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_JOB_TIMEOUT_SECS);

        Self {
            poll_interval_ms,
            max_concurrent_jobs,
            job_timeout_secs,
            enabled,
        }
    }

    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    pub fn with_job_timeout(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the job worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was claimed and started.
    JobStarted { job_id: Uuid, job_type: JobType },
    /// Job progress was updated.
    JobProgress {
        job_id: Uuid,
        progress: u64,
        total: u64,
    },
    /// A job completed successfully.
    JobCompleted {
        job_id: Uuid,
        job_type: JobType,
        reclassified: u64,
    },
    /// A job failed.
    JobFailed {
        job_id: Uuid,
        job_type: JobType,
        error: String,
    },
    WorkerStarted,
    WorkerStopped,
}

/// Control handle returned by [`JobWorker::start`].
///
/// Dropping it stops the worker after the current batch.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Ask the worker to stop. Claimed jobs still run to completion.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| medcal_core::Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Handlers keyed by the job type they serve. Fixed once the worker starts.
type HandlerMap = HashMap<JobType, Arc<dyn JobHandler>>;

/// Background worker draining the job queue.
pub struct JobWorker {
    db: Database,
    config: WorkerConfig,
    handlers: Arc<HandlerMap>,
    event_tx: broadcast::Sender<WorkerEvent>,
    job_notify: Arc<Notify>,
}

impl JobWorker {
    pub fn new(db: Database, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        let job_notify = db.job_notify();
        Self {
            db,
            config,
            handlers: Arc::new(HashMap::new()),
            event_tx,
            job_notify,
        }
    }

    /// Register a handler, replacing any previous one for the same job type.
    pub fn register_handler(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type();
        Arc::make_mut(&mut self.handlers).insert(job_type, handler);
        debug!(job_type = job_type.as_str(), "Registered job handler");
    }

    /// Spawn the worker loop onto the runtime.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();
        tokio::spawn(self.run(shutdown_rx));
        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Worker loop.
    ///
    /// Each pass claims a batch of at most `max_concurrent_jobs` jobs and
    /// waits for the whole batch. An empty pass parks the loop until a
    /// submission wakeup, the poll interval, or shutdown.
    #[instrument(skip_all, fields(subsystem = "jobs", component = "worker"))]
    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent_jobs,
            job_timeout_secs = self.config.job_timeout_secs,
            "Job worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let idle_wait = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            // A closed channel means the handle was dropped.
            match shutdown_rx.try_recv() {
                Ok(()) | Err(mpsc::error::TryRecvError::Disconnected) => break,
                Err(mpsc::error::TryRecvError::Empty) => {}
            }

            let mut batch = self.claim_batch().await;
            if batch.is_empty() {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = self.job_notify.notified() => debug!("Woken by job submission"),
                    _ = sleep(idle_wait) => {}
                }
                continue;
            }

            debug!(claimed = batch.len(), "Running job batch");
            while let Some(joined) = batch.join_next().await {
                if let Err(e) = joined {
                    error!(error = ?e, "Job task panicked");
                }
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Job worker stopped");
    }

    /// Claim up to `max_concurrent_jobs` jobs and spawn one task per job.
    async fn claim_batch(&self) -> JoinSet<()> {
        let mut batch = JoinSet::new();
        for _ in 0..self.config.max_concurrent_jobs.max(1) {
            let Some(job) = self.claim_job().await else {
                break;
            };
            let runner = JobRunner {
                db: self.db.clone(),
                handlers: self.handlers.clone(),
                event_tx: self.event_tx.clone(),
                job_timeout: Duration::from_secs(self.config.job_timeout_secs),
            };
            batch.spawn(runner.execute_job(job));
        }
        batch
    }

    /// Claim the oldest pending job some registered handler can run.
    async fn claim_job(&self) -> Option<Job> {
        if self.handlers.is_empty() {
            return None;
        }
        let job_types: Vec<JobType> = self.handlers.keys().copied().collect();
        self.db
            .jobs
            .claim_next_for_types(&job_types)
            .await
            .unwrap_or_else(|e| {
                error!(error = ?e, "Failed to claim job");
                None
            })
    }

    /// Subscribe to worker events before starting.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Number of jobs waiting to be claimed.
    pub async fn pending_count(&self) -> Result<i64> {
        self.db.jobs.pending_count().await
    }
}

/// Everything one spawned job task needs.
struct JobRunner {
    db: Database,
    handlers: Arc<HandlerMap>,
    event_tx: broadcast::Sender<WorkerEvent>,
    job_timeout: Duration,
}

impl JobRunner {
    async fn execute_job(self, job: Job) {
        let started = Instant::now();
        let (job_id, job_type) = (job.id, job.job_type);

        info!(%job_id, job_type = job_type.as_str(), total = job.total, "Processing job");
        let _ = self
            .event_tx
            .send(WorkerEvent::JobStarted { job_id, job_type });

        let outcome = self.run_handler(job).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let event = match outcome {
            JobResult::Success(result) => {
                let reclassified = result.reclassified;
                if let Err(e) = self.db.jobs.complete(job_id, result).await {
                    error!(error = ?e, %job_id, "Could not record job completion");
                    return;
                }
                info!(%job_id, reclassified, elapsed_ms, "Job completed");
                WorkerEvent::JobCompleted {
                    job_id,
                    job_type,
                    reclassified,
                }
            }
            JobResult::Failed(error) => {
                if let Err(e) = self.db.jobs.fail(job_id, &error).await {
                    error!(error = ?e, %job_id, "Could not record job failure");
                    return;
                }
                warn!(%job_id, %error, elapsed_ms, "Job failed");
                WorkerEvent::JobFailed {
                    job_id,
                    job_type,
                    error,
                }
            }
        };
        let _ = self.event_tx.send(event);
    }

    /// Run the registered handler under the job timeout.
    async fn run_handler(&self, job: Job) -> JobResult {
        let job_id = job.id;
        let Some(handler) = self.handlers.get(&job.job_type).cloned() else {
            return JobResult::Failed(format!(
                "No handler for job type: {}",
                job.job_type.as_str()
            ));
        };

        let event_tx = self.event_tx.clone();
        let ctx = JobContext::new(job).with_progress_callback(move |progress, total| {
            let _ = event_tx.send(WorkerEvent::JobProgress {
                job_id,
                progress,
                total,
            });
        });

        tokio::time::timeout(self.job_timeout, handler.execute(ctx))
            .await
            .unwrap_or_else(|_| {
                JobResult::Failed(format!(
                    "Job exceeded timeout of {}s",
                    self.job_timeout.as_secs()
                ))
            })
    }
}

/// Assembles a [`JobWorker`] with its handlers.
pub struct WorkerBuilder {
    db: Database,
    config: WorkerConfig,
    handlers: Vec<Arc<dyn JobHandler>>,
}

impl WorkerBuilder {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            config: WorkerConfig::default(),
            handlers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn build(self) -> JobWorker {
        let mut worker = JobWorker::new(self.db, self.config);
        for handler in self.handlers {
            worker.register_handler(handler);
        }
        worker
    }
}
