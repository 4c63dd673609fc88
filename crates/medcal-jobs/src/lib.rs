//! # medcal-jobs
//!
//! Bulk reclassification job engine for medcal.
//!
//! This crate provides:
//! - The [`ReclassifyService`] used by the API: job submission with an
//!   eagerly counted total, idempotent status reads, and single-event
//!   classification
//! - An async [`JobWorker`] that claims pending jobs and runs their handler
//!   under a timeout
//! - The [`ReclassifyHandler`] that reapplies the classifier over the events
//!   selected by a missing-field filter
//! - Progress and lifecycle notifications via a broadcast channel
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use medcal_core::{Classifier, ReclassifyFilter};
//! use medcal_db::Database;
//! use medcal_jobs::{ReclassifyService, WorkerBuilder, WorkerConfig};
//!
//! let db = Database::in_memory();
//! let service = ReclassifyService::new(db.clone(), Arc::new(Classifier::default()));
//!
//! let worker = WorkerBuilder::new(db)
//!     .with_config(WorkerConfig::from_env())
//!     .with_handler(service.handler())
//!     .build();
//! let handle = worker.start();
//!
//! let submitted = service.submit(ReclassifyFilter::default()).await?;
//! let job = service.status(submitted.job_id).await?;
//!
//! handle.shutdown().await?;
//! ```

pub mod handler;
pub mod reclassify;
pub mod service;
pub mod worker;

// Re-export core types
pub use medcal_core::*;

pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler};
pub use reclassify::ReclassifyHandler;
pub use service::ReclassifyService;
pub use worker::{JobWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};

/// Default safety-net polling interval for job processing (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = medcal_core::defaults::JOB_POLL_INTERVAL_MS;

/// Default job execution timeout (seconds).
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = medcal_core::defaults::JOB_TIMEOUT_SECS;
