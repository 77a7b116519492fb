use std::borrow::Cow;

/// Builds a URL-safe slug from free text.
///
/// Lowercases the input, collapses every run of characters outside
/// `[a-z0-9]` into a single `-`, and trims leading/trailing hyphens.
/// Non-ASCII letters are treated as separators.
///
/// # Examples
///
/// ```
/// use podcast_site::util::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("  --Rust & You--  "), "rust-you");
/// assert_eq!(slugify("Café au lait"), "caf-au-lait");
/// ```
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_hyphen = false;

    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Truncates a string to at most `max_chars` characters.
///
/// Returns `Cow::Borrowed` when no truncation is needed. Never splits a
/// UTF-8 sequence.
///
/// # Examples
///
/// ```
/// use podcast_site::util::truncate_chars;
///
/// assert_eq!(truncate_chars("abcdef", 3), "abc");
/// assert_eq!(truncate_chars("abc", 10), "abc");
/// assert_eq!(truncate_chars("日本語", 2), "日本");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => Cow::Owned(s[..byte_idx].to_string()),
        None => Cow::Borrowed(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("Episode 12: The  Big -- One"), "episode-12-the-big-one");
    }

    #[test]
    fn test_slugify_trims_edges() {
        assert_eq!(slugify("!!!Launch!!!"), "launch");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_slugify_non_ascii_is_separator() {
        assert_eq!(slugify("naïve café"), "na-ve-caf");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn test_truncate_borrowed_when_short() {
        assert!(matches!(truncate_chars("short", 100), Cow::Borrowed(_)));
        assert!(matches!(truncate_chars("exact", 5), Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_zero() {
        assert_eq!(truncate_chars("abc", 0), "");
    }

    proptest! {
        #[test]
        fn prop_slug_charset(input in ".*") {
            let slug = slugify(&input);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        #[test]
        fn prop_truncate_bounded(input in ".*", max in 0usize..200) {
            let out = truncate_chars(&input, max);
            prop_assert!(out.chars().count() <= max);
            prop_assert!(input.starts_with(out.as_ref()));
        }
    }
}
