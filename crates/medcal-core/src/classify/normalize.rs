//! Category label normalization.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonical comparison form of a label.
///
/// Lowercases, decomposes (NFD) and drops combining marks, then trims and
/// collapses internal whitespace. Idempotent.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `value` names the `target` category. Missing or blank values never match.
pub fn is_category(value: Option<&str>, target: &str) -> bool {
    let Some(value) = value else {
        return false;
    };
    let value = normalize(value);
    !value.is_empty() && value == normalize(target)
}

/// Trim free text, mapping blank input to `None`.
pub fn sanitize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case_insensitive() {
        assert_eq!(normalize("Roxair"), normalize("ROXAIR"));
        assert_eq!(normalize("roxair"), normalize("ROXAIR"));
        assert_eq!(normalize("Roxair"), "roxair");
    }

    #[test]
    fn test_normalize_strips_diacritics_and_whitespace() {
        assert_eq!(
            normalize("  Tratamiento   SUBCUTÁNEO \t"),
            "tratamiento subcutaneo"
        );
        assert_eq!(normalize("Inducción"), "induccion");
        // Decomposed input normalizes the same as precomposed input.
        assert_eq!(normalize("subcuta\u{301}neo"), normalize("subcutáneo"));
    }

    #[test]
    fn test_normalize_idempotent() {
        for input in [
            "Tratamiento subcutáneo",
            "  ÑANDÚ  ",
            "İstanbul",
            "ǅemal",
            "",
            "   ",
            "Control\u{00a0}post-operatorio",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_is_category() {
        assert!(is_category(Some("tratamiento subcutaneo"), "Tratamiento subcutáneo"));
        assert!(is_category(Some(" ROXAIR "), "Roxair"));
        assert!(!is_category(Some("Roxair plus"), "Roxair"));
        assert!(!is_category(None, "Roxair"));
        assert!(!is_category(Some(""), "Roxair"));
        assert!(!is_category(Some("   "), ""));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(Some("  Roxair ")), Some("Roxair".to_string()));
        assert_eq!(sanitize(Some("   ")), None);
        assert_eq!(sanitize(None), None);
    }
}
