//! # medcal-core
//!
//! Core types, traits, and abstractions for medcal.
//!
//! This crate provides the calendar-event data model, the job record shared
//! by the reclassification engine and its pollers, the repository traits the
//! engine depends on, and the deterministic classification engine itself.

pub mod classify;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use classify::{
    classify, detect_no_show, is_category, is_explicit_no_show, normalize, parse_amount_input,
    resolve_amounts, Amounts, AttendanceRule, AttendanceRules, CategoryRule, CategoryRules,
    Classifier, RuleVerdict,
};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
