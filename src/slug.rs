//! Company names into URL-safe path segments.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").expect("valid regex"));
static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid regex"));

pub const MAX_SLUG_LEN: usize = 80;

/// Fold to ASCII, lowercase, and collapse everything that is not a word
/// character into single hyphens. Deterministic and idempotent.
pub fn slugify(value: &str) -> String {
    slugify_truncated(value, MAX_SLUG_LEN)
}

pub fn slugify_truncated(value: &str, max_length: usize) -> String {
    let folded: String = value.nfkd().filter(char::is_ascii).collect();
    let lower = folded.to_ascii_lowercase();
    let stripped = NON_SLUG.replace_all(&lower, "");
    let hyphenated = SEPARATORS.replace_all(&stripped, "-");
    let collapsed = HYPHEN_RUNS.replace_all(hyphenated.trim_matches('-'), "-");

    // ASCII-only by now, so byte truncation is safe
    let mut out = collapsed.into_owned();
    if max_length > 0 && out.len() > max_length {
        out.truncate(max_length);
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_trailing_space() {
        assert_eq!(slugify("Acme, Inc.! "), "acme-inc");
    }

    #[test]
    fn idempotent() {
        for input in ["Acme, Inc.! ", "Zoom Video Communications", "a__b  c"] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn folds_unicode_to_ascii() {
        assert_eq!(slugify("Café Déjà Vu"), "cafe-deja-vu");
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(slugify("foo _  bar---baz"), "foo-bar-baz");
    }

    #[test]
    fn truncates_without_trailing_hyphen() {
        let long = "a".repeat(79) + "-tail";
        let slug = slugify_truncated(&long, 80);
        assert!(slug.len() <= 80);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn empty_and_symbol_only_inputs_yield_empty() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }
}
