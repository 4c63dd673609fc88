//! Job status tracking.
//!
//! A [`JobTracker`] follows one job at a time. Each tracking session runs a
//! single task that fetches the job, publishes a [`TrackerSnapshot`], and
//! sleeps `poll_interval` before the next fetch until the job is terminal.
//! Only one status request is ever in flight per session.
//!
//! Every session owns a [`CancellationToken`] and a generation number.
//! State updates are applied only while both still match the live session,
//! so a response that arrives after `track` switched jobs, after `reset`, or
//! after the tracker was dropped is discarded.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, instrument, warn, Span};
use uuid::Uuid;

use medcal_core::{defaults, logging, Job, JobStatus, JobStatusSource, Result};

/// Callback fired once when the tracked job reaches a terminal status.
pub type JobCallback = Box<dyn FnOnce(&Job) + Send + 'static>;

/// Options for one tracking session.
pub struct TrackOptions {
    pub on_complete: Option<JobCallback>,
    pub on_error: Option<JobCallback>,
    pub poll_interval: Duration,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            on_complete: None,
            on_error: None,
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
        }
    }
}

impl fmt::Debug for TrackOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackOptions")
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl TrackOptions {
    /// Fired with the job when it completes.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&Job) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Fired with the job when it fails; `job.error` carries the message.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&Job) + Send + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Observable state of the tracker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerSnapshot {
    /// Job currently being tracked.
    pub job_id: Option<Uuid>,
    /// Last job record fetched for `job_id`.
    pub job: Option<Job>,
    /// `round(100 * progress / total)`, `0` for an empty or unknown job.
    pub progress_percent: u8,
    pub is_polling: bool,
    pub is_complete: bool,
    pub is_failed: bool,
    /// Last transport failure; cleared by the next successful fetch.
    pub last_error: Option<String>,
}

struct Session {
    generation: u64,
    job_id: Option<Uuid>,
    token: CancellationToken,
    notified: bool,
    on_complete: Option<JobCallback>,
    on_error: Option<JobCallback>,
}

impl Session {
    fn idle() -> Self {
        Self {
            generation: 0,
            job_id: None,
            token: CancellationToken::new(),
            notified: false,
            on_complete: None,
            on_error: None,
        }
    }

    fn is_live(&self, generation: u64) -> bool {
        self.generation == generation && !self.token.is_cancelled()
    }
}

struct Shared {
    session: Mutex<Session>,
    state: watch::Sender<TrackerSnapshot>,
}

impl Shared {
    /// Apply one fetch result. Returns `None` when the session is stale,
    /// otherwise whether polling should stop.
    fn apply(&self, generation: u64, fetched: Result<Job>) -> Option<bool> {
        let mut session = self.session.lock();
        if !session.is_live(generation) {
            return None;
        }

        let job = match fetched {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "Job status fetch failed, will retry");
                let message = e.to_string();
                self.state.send_modify(|s| s.last_error = Some(message));
                return Some(false);
            }
        };

        let terminal = job.is_terminal();
        let callback = if terminal && !session.notified {
            session.notified = true;
            match job.status {
                JobStatus::Completed => session.on_complete.take(),
                _ => session.on_error.take(),
            }
        } else {
            None
        };

        self.state.send_modify(|s| {
            s.progress_percent = job.progress_percent();
            s.is_complete = job.status == JobStatus::Completed;
            s.is_failed = job.status == JobStatus::Failed;
            s.is_polling = !terminal;
            s.last_error = None;
            s.job = Some(job.clone());
        });
        drop(session);

        if let Some(callback) = callback {
            callback(&job);
        }
        Some(terminal)
    }
}

/// Follows a job to a terminal status through a [`JobStatusSource`].
///
/// Dropping the tracker stops any polling in progress.
pub struct JobTracker {
    source: Arc<dyn JobStatusSource>,
    shared: Arc<Shared>,
}

impl JobTracker {
    pub fn new<S: JobStatusSource + 'static>(source: S) -> Self {
        Self::with_source(Arc::new(source))
    }

    pub fn with_source(source: Arc<dyn JobStatusSource>) -> Self {
        let (state, _) = watch::channel(TrackerSnapshot::default());
        Self {
            source,
            shared: Arc::new(Shared {
                session: Mutex::new(Session::idle()),
                state,
            }),
        }
    }

    /// Start tracking `job_id`, abandoning any previous session.
    ///
    /// Callbacks fire at most once per job id: re-tracking a job that was
    /// already observed terminal does not fire again.
    pub fn track(&self, job_id: Uuid, options: TrackOptions) {
        let (generation, token) = {
            let mut session = self.shared.session.lock();
            session.token.cancel();
            if session.job_id != Some(job_id) {
                session.notified = false;
            }
            session.generation += 1;
            session.job_id = Some(job_id);
            session.token = CancellationToken::new();
            session.on_complete = options.on_complete;
            session.on_error = options.on_error;

            self.shared.state.send_replace(TrackerSnapshot {
                job_id: Some(job_id),
                is_polling: true,
                ..Default::default()
            });
            (session.generation, session.token.clone())
        };

        tokio::spawn(poll_loop(
            self.source.clone(),
            self.shared.clone(),
            job_id,
            generation,
            token,
            options.poll_interval,
        ));
    }

    /// Stop observing and clear all state.
    pub fn reset(&self) {
        let mut session = self.shared.session.lock();
        session.token.cancel();
        session.generation += 1;
        session.job_id = None;
        session.notified = false;
        session.on_complete = None;
        session.on_error = None;
        self.shared.state.send_replace(TrackerSnapshot::default());
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.shared.state.borrow().clone()
    }

    /// Receive every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.shared.state.subscribe()
    }
}

impl Drop for JobTracker {
    fn drop(&mut self) {
        self.shared.session.lock().token.cancel();
    }
}

#[instrument(
    skip(source, shared, token),
    fields(subsystem = "poller", component = "tracker", job_status = field::Empty)
)]
async fn poll_loop(
    source: Arc<dyn JobStatusSource>,
    shared: Arc<Shared>,
    job_id: Uuid,
    generation: u64,
    token: CancellationToken,
    poll_interval: Duration,
) {
    loop {
        let fetched = tokio::select! {
            _ = token.cancelled() => break,
            fetched = source.job_status(job_id) => fetched,
        };
        if let Ok(job) = &fetched {
            Span::current().record(logging::JOB_STATUS, job.status.as_str());
        }

        match shared.apply(generation, fetched) {
            None => {
                debug!("Discarded response for abandoned session");
                break;
            }
            Some(true) => {
                debug!("Job reached terminal status");
                break;
            }
            Some(false) => {}
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}
