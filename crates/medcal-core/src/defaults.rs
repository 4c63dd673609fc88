//! Centralized default constants for the medcal system.
//!
//! **This module is the single source of truth** for all shared default values.
//! Classification constants in the CLASSIFICATION section form part of the
//! external contract and are not configurable.

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Canonical label for the Roxair category.
pub const CATEGORY_ROXAIR: &str = "Roxair";

/// Canonical label for the subcutaneous treatment category.
pub const CATEGORY_SUBCUTANEOUS: &str = "Tratamiento subcutáneo";

/// English name accepted for the subcutaneous treatment category.
pub const CATEGORY_SUBCUTANEOUS_EN: &str = "Subcutaneous treatment";

/// Expected amount applied to Roxair events that carry none (integer units).
pub const ROXAIR_DEFAULT_AMOUNT: i64 = 150_000;

/// Separator joining calendar id and event id into an event key.
pub const EVENT_KEY_SEPARATOR: &str = ":::";

/// Maximum length (in characters) of free-text override fields.
pub const OVERRIDE_TEXT_MAX_LEN: usize = 200;

/// Maximum length (in characters) of free-text amount/dosage inputs.
pub const OVERRIDE_NUMERIC_MAX_LEN: usize = 32;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default worker event broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Default job worker safety-net poll interval in milliseconds.
///
/// Submissions wake the worker through the repository notify handle; this
/// interval only covers missed wakeups.
pub const JOB_POLL_INTERVAL_MS: u64 = 5_000;

/// Default maximum concurrent jobs per worker.
pub const JOB_MAX_CONCURRENT: usize = 2;

/// Default job execution timeout in seconds (30 minutes).
pub const JOB_TIMEOUT_SECS: u64 = 1_800;

/// Events processed between cooperative yields inside a reclassify job.
pub const RECLASSIFY_YIELD_EVERY: u64 = 64;

/// Default number of recent jobs returned by listings.
pub const JOB_LIST_LIMIT: usize = 50;

// =============================================================================
// STATUS POLLING
// =============================================================================

/// Default interval between job status polls in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 500;

/// Default total attempts (initial try + retries) per status request.
pub const HTTP_MAX_ATTEMPTS: usize = 3;

/// Default base backoff between transport retries in milliseconds.
pub const HTTP_BASE_BACKOFF_MS: u64 = 200;

/// Default HTTP request timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;
