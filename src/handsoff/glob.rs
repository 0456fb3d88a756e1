// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shell-style globs compiled to anchored regular expressions.
//!
//! `*` matches any run of characters including dots, `?` exactly one character.
//! Matching is case-insensitive. An empty pattern matches everything.

use regex::Regex;

use crate::models::{Record, UnmanagedConfig};

/// A compiled glob.
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
}

impl Glob {
    /// Compile a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated expression exceeds the regex size limits.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = if pattern.trim().is_empty() {
            "*".to_string()
        } else {
            pattern.trim().to_string()
        };

        let mut expr = String::with_capacity(pattern.len() * 2 + 8);
        expr.push_str("(?i)^");
        let mut literal = String::new();
        for c in pattern.chars() {
            match c {
                '*' | '?' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    // `**` collapses to `*`
                    if c == '*' {
                        if !expr.ends_with(".*") {
                            expr.push_str(".*");
                        }
                    } else {
                        expr.push('.');
                    }
                }
                _ => literal.push(c),
            }
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        Ok(Self {
            regex: Regex::new(&expr)?,
            pattern,
        })
    }

    /// True if `text` matches the whole pattern.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

/// An [`UnmanagedConfig`] with its globs compiled.
#[derive(Debug, Clone)]
pub struct UnmanagedMatcher {
    label: Glob,
    rtypes: Vec<String>,
    target: Glob,
}

impl UnmanagedMatcher {
    /// Compile an unmanaged declaration.
    ///
    /// # Errors
    ///
    /// Returns an error if either glob cannot be compiled.
    pub fn compile(config: &UnmanagedConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            label: Glob::new(&config.label_pattern)?,
            rtypes: config
                .rtypes
                .iter()
                .map(|t| t.to_ascii_uppercase())
                .collect(),
            target: Glob::new(&config.target_pattern)?,
        })
    }

    /// True if label, type and target all match.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        if !self.rtypes.is_empty() && !self.rtypes.iter().any(|t| t == record.rtype()) {
            return false;
        }
        if !self.label.is_match(&record.label) {
            return false;
        }
        let target = record.rdata.target_text();
        self.target.is_match(&target) || self.target.is_match(target.trim_end_matches('.'))
    }
}

impl std::fmt::Display for UnmanagedMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types = if self.rtypes.is_empty() {
            "*".to_string()
        } else {
            self.rtypes.join(",")
        };
        write!(
            f,
            "UNMANAGED({}, {}, {})",
            self.label.as_str(),
            types,
            self.target.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rdata;

    #[test]
    fn test_glob_basics() {
        let glob = Glob::new("foo*").unwrap();
        assert!(glob.is_match("foo"));
        assert!(glob.is_match("foo3"));
        assert!(glob.is_match("foo.bar"));
        assert!(!glob.is_match("xfoo"));

        let single = Glob::new("h?st").unwrap();
        assert!(single.is_match("host"));
        assert!(!single.is_match("hoost"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let glob = Glob::new("a.b+c").unwrap();
        assert!(glob.is_match("a.b+c"));
        assert!(!glob.is_match("aXb+c"));
        assert!(!glob.is_match("a.bbc"));
    }

    #[test]
    fn test_empty_pattern_matches_all() {
        let glob = Glob::new("").unwrap();
        assert!(glob.is_match("anything.at.all"));
        assert_eq!(glob.as_str(), "*");
    }

    #[test]
    fn test_double_star_and_case() {
        let glob = Glob::new("**.acm-validations.aws.").unwrap();
        assert!(glob.is_match("_y.ACM-validations.aws."));
        assert!(!glob.is_match("acm-validations.aws."));
    }

    #[test]
    fn test_unmanaged_matcher() {
        let matcher = UnmanagedMatcher::compile(&UnmanagedConfig {
            label_pattern: "*".to_string(),
            rtypes: ["CNAME".to_string()].into(),
            target_pattern: "**.acm-validations.aws.".to_string(),
        })
        .unwrap();

        let hit = Record::new(
            "_x.cr",
            "example.com",
            300,
            Rdata::Cname("_y.acm-validations.aws.".to_string()),
        );
        let wrong_type = Record::new(
            "_x.cr",
            "example.com",
            300,
            Rdata::Txt(vec!["_y.acm-validations.aws.".to_string()]),
        );
        assert!(matcher.matches(&hit));
        assert!(!matcher.matches(&wrong_type));
        assert_eq!(
            matcher.to_string(),
            "UNMANAGED(*, CNAME, **.acm-validations.aws.)"
        );
    }

    #[test]
    fn test_target_without_trailing_dot() {
        let matcher = UnmanagedMatcher::compile(&UnmanagedConfig {
            label_pattern: String::new(),
            rtypes: Default::default(),
            target_pattern: "*.example.net".to_string(),
        })
        .unwrap();
        let record = Record::new(
            "www",
            "example.com",
            300,
            Rdata::Cname("lb.example.net.".to_string()),
        );
        assert!(matcher.matches(&record));
    }
}
