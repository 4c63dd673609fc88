//! Amount and dosage input parsing, and final amount resolution.

use super::normalize::sanitize;
use super::rules::CategoryRule;
use crate::models::{CalendarEvent, OverrideEntry};

/// Parse a free-text amount by keeping only ASCII digits.
///
/// Separators are not interpreted: `"$1.234,56"` parses as `123456`.
/// Returns `None` when no digits remain or the value overflows.
pub fn parse_amount_input(raw: Option<&str>) -> Option<i64> {
    let digits: String = raw?.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Parse a free-text decimal, accepting a decimal comma. Non-finite values are rejected.
pub fn parse_decimal(raw: Option<&str>) -> Option<f64> {
    let text = sanitize(raw)?.replace(',', ".");
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Final expected and paid amounts for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Amounts {
    pub expected: Option<i64>,
    pub paid: Option<i64>,
}

/// Resolve amounts: override, then baseline, then the category default.
///
/// A non-attended event always has `paid == Some(0)`.
pub fn resolve_amounts(
    entry: &OverrideEntry,
    baseline: &CalendarEvent,
    rule: Option<&CategoryRule>,
    attended: Option<bool>,
) -> Amounts {
    let expected = parse_amount_input(entry.amount_expected.as_deref())
        .or(baseline.amount_expected)
        .or_else(|| rule.and_then(|r| r.default_amount));

    let paid_raw = parse_amount_input(entry.amount_paid.as_deref()).or(baseline.amount_paid);
    let paid = match attended {
        Some(false) => Some(0),
        _ => paid_raw,
    };

    Amounts { expected, paid }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::rules::CategoryRules;

    #[test]
    fn test_parse_amount_strips_everything_but_digits() {
        assert_eq!(parse_amount_input(Some("$1.234,56")), Some(123_456));
        assert_eq!(parse_amount_input(Some("150000")), Some(150_000));
        assert_eq!(parse_amount_input(Some(" 50 000 ")), Some(50_000));
        assert_eq!(parse_amount_input(Some("-300")), Some(300));
    }

    #[test]
    fn test_parse_amount_degrades_to_none() {
        assert_eq!(parse_amount_input(None), None);
        assert_eq!(parse_amount_input(Some("")), None);
        assert_eq!(parse_amount_input(Some("gratis")), None);
        assert_eq!(parse_amount_input(Some("99999999999999999999999")), None);
        // Non-ASCII digits are not digits for this parser.
        assert_eq!(parse_amount_input(Some("١٢٣")), None);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal(Some("2,5")), Some(2.5));
        assert_eq!(parse_decimal(Some(" 0.75 ")), Some(0.75));
        assert_eq!(parse_decimal(Some("abc")), None);
        assert_eq!(parse_decimal(Some("NaN")), None);
        assert_eq!(parse_decimal(Some("inf")), None);
        assert_eq!(parse_decimal(Some("  ")), None);
        assert_eq!(parse_decimal(None), None);
    }

    #[test]
    fn test_override_wins_over_baseline() {
        let entry = OverrideEntry {
            amount_expected: Some("2000".into()),
            amount_paid: Some("1500".into()),
            ..Default::default()
        };
        let baseline = CalendarEvent {
            amount_expected: Some(1),
            amount_paid: Some(1),
            ..CalendarEvent::new("c", "e")
        };
        let amounts = resolve_amounts(&entry, &baseline, None, Some(true));
        assert_eq!(amounts.expected, Some(2000));
        assert_eq!(amounts.paid, Some(1500));
    }

    #[test]
    fn test_unparseable_override_falls_back_to_baseline() {
        let entry = OverrideEntry {
            amount_expected: Some("n/a".into()),
            ..Default::default()
        };
        let baseline = CalendarEvent {
            amount_expected: Some(700),
            amount_paid: Some(300),
            ..CalendarEvent::new("c", "e")
        };
        let amounts = resolve_amounts(&entry, &baseline, None, None);
        assert_eq!(amounts.expected, Some(700));
        assert_eq!(amounts.paid, Some(300));
    }

    #[test]
    fn test_category_default_only_without_baseline() {
        let rules = CategoryRules::builtin();
        let roxair = rules.lookup(Some("Roxair"));
        let entry = OverrideEntry::default();

        let empty = CalendarEvent::new("c", "e");
        assert_eq!(
            resolve_amounts(&entry, &empty, roxair, None).expected,
            Some(150_000)
        );

        let with_baseline = CalendarEvent {
            amount_expected: Some(120_000),
            ..CalendarEvent::new("c", "e")
        };
        assert_eq!(
            resolve_amounts(&entry, &with_baseline, roxair, None).expected,
            Some(120_000)
        );
    }

    #[test]
    fn test_not_attended_forces_zero_paid() {
        let entry = OverrideEntry {
            amount_paid: Some("50000".into()),
            ..Default::default()
        };
        let baseline = CalendarEvent::new("c", "e");
        assert_eq!(resolve_amounts(&entry, &baseline, None, Some(false)).paid, Some(0));
        // Even with nothing to fall back on, paid is 0 rather than null.
        assert_eq!(
            resolve_amounts(&OverrideEntry::default(), &baseline, None, Some(false)).paid,
            Some(0)
        );
        assert_eq!(
            resolve_amounts(&OverrideEntry::default(), &baseline, None, None).paid,
            None
        );
    }
}
