//! Text-level screen for destructive SQL in generated output.
//!
//! This is a coarse filter, not a parser: it matches keywords anywhere in
//! the text, including inside string literals and identifiers such as
//! `truncated_at`. Statements that reach a database still go through the
//! read-only validator and a read-only session.

use regex::{Regex, RegexBuilder};

/// Patterns checked against every candidate, in order.
pub const DENIED_PATTERNS: &[&str] = &[
    r"DROP\s+TABLE",
    r"DELETE\s+FROM",
    r"TRUNCATE",
    r"ALTER\s+TABLE",
    r"INSERT\s+INTO",
    r"UPDATE\s+.*\s+SET",
    r"CREATE\s+TABLE",
    r"GRANT\s+",
    r"REVOKE\s+",
];

pub struct Denylist {
    rules: Vec<(&'static str, Regex)>,
}

impl Denylist {
    /// Compile [`DENIED_PATTERNS`], case-insensitive with `.` matching newlines.
    pub fn new() -> Result<Self, regex::Error> {
        let rules = DENIED_PATTERNS
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .dot_matches_new_line(true)
                    .build()
                    .map(|re| (*pattern, re))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// First pattern the text matches, if any.
    pub fn check(&self, sql: &str) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(sql))
            .map(|(pattern, _)| *pattern)
    }
}
