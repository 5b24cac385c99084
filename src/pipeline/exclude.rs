//! Wildcard path exclusions.
//!
//! Patterns are `;`-separated. `*` and `?` stay within one path segment,
//! `**` crosses segments. A pattern without a leading `$` may match at any
//! segment boundary, and matching a directory excludes everything under it.
//! Matching is case-insensitive.

use regex::Regex;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct ExcludeMatcher {
    regex: Option<Regex>,
}

impl ExcludeMatcher {
    pub fn new(patterns: &str) -> Result<Self> {
        let alternatives: Vec<String> = patterns
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(pattern_to_regex)
            .collect();
        if alternatives.is_empty() {
            return Ok(Self::default());
        }

        let source = format!("(?i)^(?:{})(?:/.*)?$", alternatives.join("|"));
        let regex = Regex::new(&source)
            .map_err(|e| Error::Config(format!("bad exclude pattern {patterns:?}: {e}")))?;
        Ok(Self { regex: Some(regex) })
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(path))
    }

    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }
}

fn pattern_to_regex(pattern: &str) -> String {
    let pattern = pattern.replace('\\', "/");
    let pattern = pattern.trim_end_matches('/');
    let mut out = String::new();
    if !pattern.starts_with('$') {
        out.push_str("(?:.*/)?");
    }

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pattern_excludes_nothing() {
        let m = ExcludeMatcher::new(" ; ").unwrap();
        assert!(m.is_empty());
        assert!(!m.is_excluded("$/proj/a.c"));
    }

    #[test]
    fn relative_pattern_matches_any_segment() {
        let m = ExcludeMatcher::new("*.obj;bin").unwrap();
        assert!(m.is_excluded("$/proj/build/main.OBJ"));
        assert!(m.is_excluded("$/proj/bin/tool.exe"));
        assert!(!m.is_excluded("$/proj/binary/tool.exe"));
        assert!(!m.is_excluded("$/proj/main.c"));
    }

    #[test]
    fn rooted_pattern_only_matches_from_root() {
        let m = ExcludeMatcher::new("$/proj/docs").unwrap();
        assert!(m.is_excluded("$/proj/docs/readme.txt"));
        assert!(!m.is_excluded("$/other/proj/docs/readme.txt"));
    }

    #[test]
    fn double_star_crosses_segments() {
        let m = ExcludeMatcher::new("$/proj/**/generated.h").unwrap();
        assert!(m.is_excluded("$/proj/a/b/generated.h"));
        assert!(!m.is_excluded("$/proj/a/b/handwritten.h"));
    }
}
