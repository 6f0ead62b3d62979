//! Text normalization shared by the form engine and catalog lookups.
//!
//! Intake agents type names and addresses by hand, so values arrive with
//! doubled spaces, stray tabs and mixed case.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Trims and collapses internal whitespace runs to a single space.
pub fn normalize_text(value: &str) -> String {
    WHITESPACE_RUN.replace_all(value.trim(), " ").into_owned()
}

/// `normalize_text` then upper-cased (Unicode aware: `ñ` -> `Ñ`).
pub fn normalize_upper(value: &str) -> String {
    normalize_text(value).to_uppercase()
}

/// Lookup key: NFD with combining marks dropped, then lowercased.
/// `"CORPORACIÓN  Niño"` folds to `"corporacion nino"`.
pub fn fold_text(value: &str) -> String {
    normalize_text(value)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Accent- and case-insensitive containment used by catalog searches.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    let needle = fold_text(needle);
    if needle.is_empty() {
        return true;
    }
    fold_text(haystack).contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Juan \t  Pérez\n"), "Juan Pérez");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_normalize_upper_handles_accents() {
        assert_eq!(normalize_upper("josé  muñoz"), "JOSÉ MUÑOZ");
    }

    #[test]
    fn test_contains_folded() {
        assert!(contains_folded("Textiles  del Pacífico", "del pacífico"));
        assert!(contains_folded("cualquiera", "  "));
        assert!(!contains_folded("Textiles", "Café"));
    }

    #[test]
    fn test_contains_folded_ignores_accents_both_ways() {
        assert!(contains_folded("CORPORACIÓN MULTI INVERSIONES", "corporacion multi"));
        assert!(contains_folded("Corporacion Multi", "CORPORACIÓN"));
        assert!(contains_folded("Panadería El Niño", "nino"));
        assert_eq!(fold_text("  ÁRBOL\tÑandú "), "arbol nandu");
    }
}
