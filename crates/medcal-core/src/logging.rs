//! Structured logging schema and field name constants for medcal.
//!
//! Spans declare these fields (as `field::Empty` when the value is only known
//! later) and fill them with `Span::record` using the constants below.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), job completions |
//! | DEBUG | Decision points, rule matches, config choices |
//! | TRACE | Per-event iteration inside a batch |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "jobs", "poller"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "worker", "reclassify", "tracker", "http_client"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "submit", "classify_single"
pub const OPERATION: &str = "op";

// ─── Recorded fields ───────────────────────────────────────────────────────

/// Job status string observed by a poller.
pub const JOB_STATUS: &str = "job_status";

/// Number of events whose record changed.
pub const RECLASSIFIED: &str = "reclassified";

/// Transport attempt number (1-based).
pub const ATTEMPT: &str = "attempt";
