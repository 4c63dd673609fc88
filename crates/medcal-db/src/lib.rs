//! # medcal-db
//!
//! Storage layer for medcal.
//!
//! The calendar store and job store are external collaborators of the
//! classification engine, reached only through the [`EventRepository`] and
//! [`JobRepository`] traits. This crate provides the in-memory
//! implementations used by the service binary and the test suites, plus the
//! [`Database`] bundle that wires them together.
//!
//! ## Example
//!
//! ```rust,ignore
//! use medcal_db::Database;
//! use medcal_core::{CalendarEvent, EventRepository};
//!
//! let db = Database::in_memory();
//! db.events.upsert(CalendarEvent::new("clinic", "evt-1")).await?;
//! assert_eq!(db.events.count().await?, 1);
//! ```

pub mod events;
pub mod jobs;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::info;

pub use events::MemoryEventRepository;
pub use jobs::MemoryJobRepository;

use medcal_core::{CalendarEvent, EventRepository, JobRepository, Result};

/// Repository bundle shared by the API, the service, and the worker.
#[derive(Clone)]
pub struct Database {
    /// Calendar events and their persisted classification.
    pub events: Arc<dyn EventRepository>,
    /// Reclassification job records.
    pub jobs: Arc<dyn JobRepository>,
    /// Wakes the job worker when a job is queued.
    job_notify: Arc<Notify>,
}

impl Database {
    /// Fresh in-memory storage.
    pub fn in_memory() -> Self {
        let job_notify = Arc::new(Notify::new());
        Self {
            events: Arc::new(MemoryEventRepository::new()),
            jobs: Arc::new(MemoryJobRepository::with_notify(job_notify.clone())),
            job_notify,
        }
    }

    /// Replace the event repository (e.g. with an external calendar store).
    pub fn with_event_repository(mut self, events: Arc<dyn EventRepository>) -> Self {
        self.events = events;
        self
    }

    /// Get the job notification handle for event-driven waking.
    pub fn job_notify(&self) -> Arc<Notify> {
        self.job_notify.clone()
    }

    /// Insert or replace a batch of events, returning how many were stored.
    pub async fn seed_events(&self, events: Vec<CalendarEvent>) -> Result<usize> {
        let count = events.len();
        for event in events {
            self.events.upsert(event).await?;
        }
        Ok(count)
    }

    /// Load a JSON array of calendar events from disk into the event store.
    pub async fn seed_events_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let events = load_events_json(path)?;
        let count = self.seed_events(events).await?;
        info!(path = %path.display(), count, "Seeded calendar events");
        Ok(count)
    }
}

/// Read a JSON array of calendar events.
pub fn load_events_json(path: &Path) -> Result<Vec<CalendarEvent>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
