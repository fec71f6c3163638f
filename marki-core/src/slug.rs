//! Heading id generation.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

static HYPHEN_RUN: OnceLock<Regex> = OnceLock::new();

fn hyphen_run() -> &'static Regex {
    HYPHEN_RUN.get_or_init(|| Regex::new(r"-+").unwrap())
}

/// Convert heading text to an anchor id
///
/// Rules:
/// - Lowercase
/// - Whitespace and underscores become hyphens
/// - Punctuation is dropped, unicode letters are kept
/// - Runs of hyphens collapse, leading/trailing hyphens are trimmed
///
/// # Examples
///
/// ```
/// use marki_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Rust & Safety"), "rust-safety");
/// assert_eq!(slugify("C++ Programming"), "c-programming");
/// ```
pub fn slugify(input: &str) -> String {
    let cleaned = input
        .to_lowercase()
        .graphemes(true)
        .filter_map(|g| {
            let c = g.chars().next()?;
            if c.is_whitespace() || c == '_' {
                Some("-")
            } else if c.is_alphanumeric() || c == '-' {
                Some(g)
            } else {
                None
            }
        })
        .collect::<String>();

    hyphen_run()
        .replace_all(&cleaned, "-")
        .trim_matches('-')
        .to_string()
}

/// Hands out heading ids that are unique within one document.
///
/// The first occurrence of a slug is used as-is, later ones get `-1`, `-2`...
#[derive(Debug, Default)]
pub struct SlugAllocator {
    seen: HashMap<String, usize>,
}

impl SlugAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id that was given explicitly (e.g. `{#intro}`).
    pub fn reserve(&mut self, id: &str) {
        self.seen.entry(id.to_string()).or_insert(0);
    }

    /// Allocate an id for the given heading text.
    pub fn allocate(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = "heading".to_string();
        }

        let Some(&last) = self.seen.get(&base) else {
            self.seen.insert(base.clone(), 0);
            return base;
        };

        let mut n = last;
        loop {
            n += 1;
            let candidate = format!("{}-{}", base, n);
            if !self.seen.contains_key(&candidate) {
                self.seen.insert(base, n);
                self.seen.insert(candidate.clone(), 0);
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
        assert_eq!(slugify("snake_case_title"), "snake-case-title");
    }

    #[test]
    fn test_slugify_keeps_unicode_letters() {
        assert_eq!(slugify("Über Café"), "über-café");
    }

    #[test]
    fn test_allocator_deduplicates() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.allocate("Usage"), "usage");
        assert_eq!(slugs.allocate("Usage"), "usage-1");
        assert_eq!(slugs.allocate("Usage"), "usage-2");
    }

    #[test]
    fn test_allocator_respects_reserved_ids() {
        let mut slugs = SlugAllocator::new();
        slugs.reserve("usage");
        assert_eq!(slugs.allocate("Usage"), "usage-1");
    }

    #[test]
    fn test_allocator_empty_heading() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.allocate("!!!"), "heading");
    }
}
