// src/paths/pattern.rs

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::{Result, SitepipeError};

#[derive(Debug, Clone)]
struct PatternEntry {
    raw: String,
    negated: bool,
    /// Literal directory prefix of the pattern.
    base: PathBuf,
}

/// Ordered glob list with `!` negation.
///
/// Patterns are relative to the project root and are evaluated in order;
/// the last pattern that matches a path decides whether it is included.
/// A path that no pattern matches is excluded.
#[derive(Clone)]
pub struct GlobPattern {
    entries: Vec<PatternEntry>,
    set: GlobSet,
}

impl fmt::Debug for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.raw))
            .finish()
    }
}

impl GlobPattern {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = Vec::new();
        let mut builder = GlobSetBuilder::new();

        for raw in patterns {
            let raw = raw.as_ref().trim().to_string();
            let (negated, body) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw.as_str()),
            };
            let body = body.strip_prefix("./").unwrap_or(body);

            // `*` must not cross directory boundaries.
            let glob = GlobBuilder::new(body)
                .literal_separator(true)
                .build()
                .map_err(|source| SitepipeError::Glob {
                    pattern: raw.clone(),
                    source,
                })?;
            builder.add(glob);

            entries.push(PatternEntry {
                base: glob_base(body),
                negated,
                raw,
            });
        }

        let set = builder.build().map_err(|source| SitepipeError::Glob {
            pattern: entries
                .iter()
                .map(|e| e.raw.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            source,
        })?;

        Ok(Self { entries, set })
    }

    /// The raw patterns, in evaluation order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.raw.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `rel_path` (forward slashes, relative to the project root)
    /// is selected by this pattern list.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.set
            .matches(rel_path)
            .into_iter()
            .max()
            .is_some_and(|idx| !self.entries[idx].negated)
    }

    /// Base directory of the first positive pattern matching `rel_path`.
    pub fn base_for(&self, rel_path: &str) -> Option<&Path> {
        self.set
            .matches(rel_path)
            .into_iter()
            .filter(|idx| !self.entries[*idx].negated)
            .min()
            .map(|idx| self.entries[idx].base.as_path())
    }

    /// Distinct base directories of the positive patterns, in order.
    pub fn bases(&self) -> Vec<&Path> {
        let mut bases: Vec<&Path> = Vec::new();
        for entry in self.entries.iter().filter(|e| !e.negated) {
            if !bases.contains(&entry.base.as_path()) {
                bases.push(entry.base.as_path());
            }
        }
        bases
    }
}

fn has_glob_meta(segment: &str) -> bool {
    segment.contains(['*', '?', '[', ']', '{', '}'])
}

/// Literal directory prefix of a glob.
///
/// `src/assets/js/**/*.*` -> `src/assets/js`, and for a pattern without
/// wildcards the parent directory: `src/assets/css/main.scss` -> `src/assets/css`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal = segments
        .iter()
        .position(|s| has_glob_meta(s))
        .unwrap_or(segments.len().saturating_sub(1));

    segments[..literal]
        .iter()
        .filter(|s| !s.is_empty() && **s != ".")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_base_stops_at_first_wildcard_segment() {
        assert_eq!(glob_base("src/assets/js/**/*.*"), PathBuf::from("src/assets/js"));
        assert_eq!(glob_base("src/assets/css/main.scss"), PathBuf::from("src/assets/css"));
        assert_eq!(
            glob_base("src/assets/fonts/**/*.{ttf,woff}"),
            PathBuf::from("src/assets/fonts")
        );
        assert_eq!(glob_base("*.svg"), PathBuf::new());
    }

    #[test]
    fn later_negation_excludes_subset() {
        let p = GlobPattern::new(["src/img/**/*.*", "!src/img/svg/**/*.*"]).unwrap();
        assert!(p.matches("src/img/logo.png"));
        assert!(p.matches("src/img/icons/a.png"));
        assert!(!p.matches("src/img/svg/a.svg"));
        assert!(!p.matches("src/other/logo.png"));
    }

    #[test]
    fn last_match_wins_allows_reinclusion() {
        let p = GlobPattern::new(["src/**/*.js", "!src/vendor/**", "src/vendor/keep.js"]).unwrap();
        assert!(p.matches("src/app.js"));
        assert!(!p.matches("src/vendor/drop.js"));
        assert!(p.matches("src/vendor/keep.js"));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let p = GlobPattern::new(["src/assets/img/svg/*.svg"]).unwrap();
        assert!(p.matches("src/assets/img/svg/a.svg"));
        assert!(!p.matches("src/assets/img/svg/sprite/b.svg"));
    }

    #[test]
    fn brace_alternation_and_dot_prefix() {
        let p = GlobPattern::new(["./fonts/**/*.{ttf,woff2}"]).unwrap();
        assert!(p.matches("fonts/a.ttf"));
        assert!(p.matches("fonts/sub/b.woff2"));
        assert!(!p.matches("fonts/c.otf"));
    }

    #[test]
    fn base_for_uses_first_positive_match() {
        let p = GlobPattern::new(["vendors/a/**/*.*", "vendors/b/**/*.*"]).unwrap();
        assert_eq!(p.base_for("vendors/b/x/y.js"), Some(Path::new("vendors/b")));
        assert_eq!(p.bases(), vec![Path::new("vendors/a"), Path::new("vendors/b")]);
    }

    #[test]
    fn invalid_pattern_is_a_typed_error() {
        let err = GlobPattern::new(["src/[oops"]).unwrap_err();
        assert!(matches!(err, SitepipeError::Glob { .. }));
    }
}
