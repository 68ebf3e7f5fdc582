//! Deterministic slug fallback for entities the server sent without one.
//!
//! The rule is part of the client contract: bookmarked URLs built from a
//! derived slug must stay valid across releases, so it is kept narrow on
//! purpose. Punctuation is dropped rather than turned into separators, which
//! is where it differs from general-purpose slugifiers.

/// Slugify `title`, falling back to `id` when nothing representable remains.
pub fn derive_slug(title: &str, id: &str) -> String {
    let candidate = slugify_title(title);
    if candidate.is_empty() {
        id.to_string()
    } else {
        candidate
    }
}

/// Lowercase, keep only `[a-z0-9-]` and whitespace, collapse whitespace runs
/// into single hyphens, and trim hyphens from both ends.
pub fn slugify_title(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || c.is_whitespace())
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates_words() {
        assert_eq!(slugify_title("Climate Tech"), "climate-tech");
        assert_eq!(slugify_title("  Many   spaces\there "), "many-spaces-here");
    }

    #[test]
    fn strips_punctuation_without_separating() {
        assert_eq!(slugify_title("C++ & Rust: a.b"), "c-rust-ab");
        assert_eq!(slugify_title("What's new?"), "whats-new");
    }

    #[test]
    fn keeps_existing_hyphens_and_trims_edges() {
        assert_eq!(slugify_title("-state-of-the-art-"), "state-of-the-art");
        assert_eq!(slugify_title("2024 - year in review"), "2024---year-in-review");
    }

    #[test]
    fn falls_back_to_id_when_title_has_nothing_usable() {
        assert_eq!(derive_slug("", "42"), "42");
        assert_eq!(derive_slug("基线对齐", "42"), "42");
        assert_eq!(derive_slug("!!!", "abc"), "abc");
        assert_eq!(derive_slug("Hello", "abc"), "hello");
    }
}
