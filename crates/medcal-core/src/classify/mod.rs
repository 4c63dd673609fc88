//! Deterministic classification of calendar events.
//!
//! Leaves first: [`normalize`] canonicalizes category labels, [`no_show`]
//! detects explicit non-attendance text, [`amounts`] resolves expected/paid
//! amounts. [`classifier`] combines them in a fixed order using the rule
//! tables from [`rules`]. Everything here is synchronous, pure, and
//! `Send + Sync`.

pub mod amounts;
pub mod classifier;
pub mod no_show;
pub mod normalize;
pub mod rules;

pub use amounts::{parse_amount_input, parse_decimal, resolve_amounts, Amounts};
pub use classifier::{classify, Classifier};
pub use no_show::{detect_no_show, detect_no_show_text, is_explicit_no_show};
pub use normalize::{is_category, normalize, sanitize};
pub use rules::{
    AttendanceInput, AttendanceRule, AttendanceRules, CategoryLockRule, CategoryRule,
    CategoryRules, ExplicitNoShowRule, RuleVerdict,
};
