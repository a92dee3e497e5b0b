//! URL-pattern matching used to pick the filter registration for a path.
//!
//! Patterns follow the servlet grammar: exact paths (`/a/b`), path
//! prefixes (`/a/*`, with `/*` as catch-all), extensions (`*.xml`) and
//! the default pattern (`/`). [`PatternTable::resolve`] ranks every match
//! by specificity: exact, then the longest non-empty prefix, then an
//! extension, then the catch-all `/*`, then the default. Equal ranks go to
//! the entry that was added first.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    Exact(String),
    /// Prefix without the trailing `/*`. Empty for the catch-all `/*`.
    Prefix(String),
    /// Extension without the leading `*.`.
    Extension(String),
    Default,
}

/// Match strength of a pattern against one path. Higher is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Specificity {
    Default,
    CatchAll,
    Extension,
    Prefix(usize),
    Exact,
}

impl UrlPattern {
    /// Parse a servlet URL pattern. Returns a human-readable error.
    pub fn parse(pattern: &str) -> Result<Self, String> {
        if pattern.is_empty() {
            return Err("pattern cannot be empty".into());
        }
        if pattern == "/" {
            return Ok(Self::Default);
        }
        if let Some(ext) = pattern.strip_prefix("*.") {
            if ext.is_empty() || ext.contains('/') || ext.contains('*') {
                return Err(format!("'{pattern}' is not a valid extension pattern"));
            }
            return Ok(Self::Extension(ext.to_string()));
        }
        if !pattern.starts_with('/') {
            return Err(format!(
                "pattern must start with '/' or '*.' (did you mean '/{pattern}'?)"
            ));
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            if prefix.contains('*') {
                return Err(format!("'{pattern}' has a wildcard before the trailing '/*'"));
            }
            return Ok(Self::Prefix(prefix.to_string()));
        }
        if pattern.contains('*') {
            return Err(format!(
                "'{pattern}' has a wildcard outside a trailing '/*' or leading '*.'"
            ));
        }
        Ok(Self::Exact(pattern.to_string()))
    }

    fn specificity(&self, path: &str) -> Option<Specificity> {
        match self {
            Self::Exact(exact) => (exact == path).then_some(Specificity::Exact),
            Self::Prefix(prefix) if prefix.is_empty() => Some(Specificity::CatchAll),
            Self::Prefix(prefix) => {
                let matched = path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'));
                matched.then(|| {
                    Specificity::Prefix(prefix.split('/').filter(|s| !s.is_empty()).count())
                })
            }
            Self::Extension(ext) => path
                .rsplit('/')
                .next()
                .and_then(|segment| segment.rsplit_once('.'))
                .is_some_and(|(_, found)| found == ext)
                .then_some(Specificity::Extension),
            Self::Default => Some(Specificity::Default),
        }
    }
}

/// Ordered list of `pattern → target` entries.
#[derive(Debug, Clone)]
pub struct PatternTable<T> {
    entries: Vec<(UrlPattern, T)>,
}

impl<T> Default for PatternTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> PatternTable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern: UrlPattern, target: T) {
        self.entries.push((pattern, target));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the target of the most specific pattern matching `path`.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&T> {
        let mut best: Option<(Specificity, &T)> = None;

        for (pattern, target) in &self.entries {
            let Some(specificity) = pattern.specificity(path) else {
                continue;
            };
            let better = best
                .as_ref()
                .map_or(true, |(current, _)| specificity.cmp(current) == Ordering::Greater);
            if better {
                best = Some((specificity, target));
            }
        }

        best.map(|(_, target)| target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(patterns: &[&str]) -> PatternTable<usize> {
        let mut table = PatternTable::new();
        for (idx, p) in patterns.iter().enumerate() {
            table.insert(UrlPattern::parse(p).unwrap(), idx);
        }
        table
    }

    #[test]
    fn parses_pattern_kinds() {
        assert_eq!(UrlPattern::parse("/").unwrap(), UrlPattern::Default);
        assert_eq!(UrlPattern::parse("/*").unwrap(), UrlPattern::Prefix(String::new()));
        assert_eq!(
            UrlPattern::parse("/api/*").unwrap(),
            UrlPattern::Prefix("/api".into())
        );
        assert_eq!(
            UrlPattern::parse("*.xml").unwrap(),
            UrlPattern::Extension("xml".into())
        );
        assert_eq!(
            UrlPattern::parse("/a/b").unwrap(),
            UrlPattern::Exact("/a/b".into())
        );
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert!(UrlPattern::parse("").is_err());
        assert!(UrlPattern::parse("api").unwrap_err().contains("did you mean '/api'?"));
        assert!(UrlPattern::parse("/a/*/b").is_err());
        assert!(UrlPattern::parse("*.").is_err());
        assert!(UrlPattern::parse("/*/x/*").is_err());
    }

    #[test]
    fn catch_all_matches_everything() {
        let t = table(&["/*"]);
        assert_eq!(t.resolve("/a"), Some(&0));
        assert_eq!(t.resolve("/"), Some(&0));
        assert_eq!(t.resolve("/deep/path/here"), Some(&0));
    }

    #[test]
    fn prefix_is_segment_aligned() {
        let t = table(&["/api/*"]);
        assert_eq!(t.resolve("/api"), Some(&0));
        assert_eq!(t.resolve("/api/users"), Some(&0));
        assert_eq!(t.resolve("/apix"), None);
    }

    #[test]
    fn exact_beats_prefix() {
        let t = table(&["/*", "/a"]);
        assert_eq!(t.resolve("/a"), Some(&1));
        assert_eq!(t.resolve("/b"), Some(&0));
    }

    #[test]
    fn longest_prefix_wins() {
        let t = table(&["/api/*", "/api/v1/*", "/*"]);
        assert_eq!(t.resolve("/api/v1/orders"), Some(&1));
        assert_eq!(t.resolve("/api/v2/orders"), Some(&0));
        assert_eq!(t.resolve("/other"), Some(&2));
    }

    #[test]
    fn prefix_beats_extension_beats_default() {
        let t = table(&["/", "*.xml", "/feeds/*"]);
        assert_eq!(t.resolve("/feeds/news.xml"), Some(&2));
        assert_eq!(t.resolve("/data/news.xml"), Some(&1));
        assert_eq!(t.resolve("/data/news.json"), Some(&0));
    }

    #[test]
    fn extension_beats_catch_all() {
        let t = table(&["/*", "*.xml"]);
        assert_eq!(t.resolve("/news/today.xml"), Some(&1));
        assert_eq!(t.resolve("/news/today.html"), Some(&0));
    }

    #[test]
    fn catch_all_beats_default() {
        let t = table(&["/", "/*"]);
        assert_eq!(t.resolve("/anything"), Some(&1));
    }

    #[test]
    fn first_registration_wins_ties() {
        let t = table(&["/*", "/*"]);
        assert_eq!(t.resolve("/a"), Some(&0));
    }

    #[test]
    fn no_match_returns_none() {
        let t = table(&["/a", "*.xml"]);
        assert_eq!(t.resolve("/b.json"), None);
    }
}
