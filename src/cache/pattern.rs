//! Key Pattern Module
//!
//! Anchored glob matching for cache invalidation. `*` is the only wildcard
//! and matches any run of characters, including none. Everything else is
//! literal.

use regex::Regex;

// == Key Pattern ==
/// A compiled invalidation pattern such as `plugins:enabled:*`.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Pattern is exactly `*`
    Any,
    /// No wildcard present
    Exact,
    Glob(Regex),
}

impl KeyPattern {
    /// Compiles a pattern. Never fails: a pattern without wildcards is an
    /// exact-match literal.
    pub fn new(pattern: &str) -> Self {
        let matcher = if pattern == "*" {
            Matcher::Any
        } else if !pattern.contains('*') {
            Matcher::Exact
        } else {
            let body = pattern
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            match Regex::new(&format!("(?s)^{}$", body)) {
                Ok(re) => Matcher::Glob(re),
                Err(_) => Matcher::Exact,
            }
        };

        Self {
            source: pattern.to_string(),
            matcher,
        }
    }

    /// True when the whole key matches the pattern.
    pub fn matches(&self, key: &str) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Exact => key == self.source,
            Matcher::Glob(re) => re.is_match(key),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn has_wildcard(&self) -> bool {
        !matches!(self.matcher, Matcher::Exact)
    }
}
