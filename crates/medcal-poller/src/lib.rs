//! # medcal-poller
//!
//! Client side of the reclassification API.
//!
//! - [`HttpClient`]: the three API calls with bounded retry and exponential
//!   backoff on transport failures and server errors
//! - [`JobTracker`]: a cooperative polling loop that follows one job to a
//!   terminal status and fires its completion or error callback exactly once
//!
//! ## Example
//!
//! ```ignore
//! use medcal_poller::{JobTracker, PollerConfig, TrackOptions};
//!
//! let config = PollerConfig::from_env();
//! let client = config.http_client()?;
//! let submitted = client.submit_reclassify_job(&Default::default()).await?;
//!
//! let tracker = JobTracker::new(client);
//! tracker.track(
//!     submitted.job_id,
//!     config
//!         .track_options()
//!         .on_complete(|job| println!("reclassified {}", job.result.reclassified))
//!         .on_error(|job| eprintln!("failed: {:?}", job.error)),
//! );
//! ```

pub mod config;
pub mod http;
pub mod tracker;

pub use config::PollerConfig;
pub use http::{HttpClient, HttpClientBuilder};
pub use tracker::{JobCallback, JobTracker, TrackOptions, TrackerSnapshot};
