//! Static deny-list keyword filter.
//!
//! First moderation layer: a case-insensitive substring scan against a fixed
//! list of word roots. Pure function, no I/O, no failure mode. Roots rather
//! than full words so inflected forms match too ("estupido", "estupida").

use crate::verdict::{Verdict, SEVERITY_KEYWORD};

/// Deny-listed roots, Spanish and English.
const DENY_LIST: &[&str] = &[
    "odio", "hate", "estupid", "stupid", "idiota", "idiot", "maldit", "damn",
];

/// Scan text against the deny-list.
///
/// Returns a flagged verdict naming the matched root, or a clean verdict.
/// Callers reject empty input before reaching this filter.
pub fn check(text: &str) -> Verdict {
    let lower = text.to_lowercase();

    for term in DENY_LIST {
        if lower.contains(term) {
            return Verdict::flagged(
                SEVERITY_KEYWORD,
                format!("Deny-listed term detected: {}", term),
            );
        }
    }

    Verdict::clean("keyword filter passed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_deny_listed_root() {
        let verdict = check("I hate bureaucrats");
        assert!(verdict.flagged);
        assert_eq!(verdict.severity, SEVERITY_KEYWORD);
        assert!(verdict.reason.contains("hate"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(check("ODIO los tramites").flagged);
        assert!(check("EsTuPiDo").flagged);
    }

    #[test]
    fn test_matches_inflected_forms() {
        assert!(check("que persona tan estupida").flagged);
        assert!(check("malditos baches").flagged);
    }

    #[test]
    fn test_clean_text_passes() {
        let verdict = check("What are the requirements to request a copy of my birth certificate?");
        assert!(!verdict.flagged);
        assert_eq!(verdict.severity, 0);
    }
}
