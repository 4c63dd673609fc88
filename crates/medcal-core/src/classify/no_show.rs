//! Explicit no-show detection in event text.
//!
//! Precision over recall: a pattern belongs here only if it cannot describe
//! a patient who did attend. Missing a no-show is tolerable, marking an
//! attended visit as absent is not.

use once_cell::sync::Lazy;
use regex::Regex;

use super::normalize::normalize;
use crate::models::CalendarEvent;

/// Ordered no-show patterns, matched against normalized (lowercase,
/// diacritic-free) text. First match wins.
static NO_SHOW_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("no_vino", r"\bno\s+(?:vino|vinieron)\b"),
        (
            "no_asistio",
            r"\bno\s+(?:asistio|asistieron|asistira|asistiran)\b",
        ),
        (
            "no_se_presento",
            r"\bno\s+se\s+(?:presento|presentaron|presentara)\b",
        ),
        (
            "no_podra_asistir",
            r"\bno\s+(?:podra|podran|podria|podrian|pudo|pudieron)\s+(?:venir|asistir)\b",
        ),
        ("no_va_a_venir", r"\bno\s+(?:va|van|iba|iban)\s+a\s+(?:venir|asistir)\b"),
        ("no_vendra", r"\bno\s+(?:vendra|vendran)\b"),
        ("no_show", r"\bno[\s-]?show\b"),
    ]
    .into_iter()
    .map(|(name, pattern)| {
        (
            name,
            Regex::new(pattern).expect("no-show patterns are valid regexes"),
        )
    })
    .collect()
});

/// Name of the first no-show pattern matching `text`, if any.
pub fn detect_no_show_text(text: &str) -> Option<&'static str> {
    let text = normalize(text);
    if text.is_empty() {
        return None;
    }
    NO_SHOW_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&text))
        .map(|(name, _)| *name)
}

/// Name of the first no-show pattern matching the event's summary and description.
pub fn detect_no_show(event: &CalendarEvent) -> Option<&'static str> {
    let summary = event.summary.as_deref().unwrap_or_default();
    let description = event.description.as_deref().unwrap_or_default();
    detect_no_show_text(&format!("{summary} {description}"))
}

/// Whether the event text explicitly states the patient did not attend.
pub fn is_explicit_no_show(event: &CalendarEvent) -> bool {
    detect_no_show(event).is_some()
}
