//! Decoding of list columns.
//!
//! The export stores lists as text, e.g. `['boil water', "chef's knife"]`.
//! Grammar accepted here: any number of quoted literals, each either
//! `'...'` or `"..."`, separated by anything (commas, whitespace, brackets).
//! Inside a literal a backslash escapes the next character. Text that is not
//! inside a complete literal is ignored, so an unbalanced trailing quote just
//! drops that value instead of failing the row.

use crate::source::RawRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static LITERAL: OnceLock<Regex> = OnceLock::new();

fn literal_pattern() -> &'static Regex {
    LITERAL.get_or_init(|| {
        Regex::new(r#"(?s)'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)""#)
            .expect("literal pattern is a valid regex")
    })
}

/// List fields decoded from one [`RawRecord`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub tags: Vec<String>,
    pub steps: Vec<String>,
    pub ingredients: Vec<String>,
}

impl ExtractedFields {
    pub fn from_record(record: &RawRecord) -> Self {
        Self {
            tags: extract_literals(&record.tags),
            steps: extract_literals(&record.steps),
            ingredients: extract_literals(&record.ingredients),
        }
    }
}

/// Return the contents of every quoted literal in `raw`, in order.
///
/// Literals that are empty or whitespace-only are dropped.
pub fn extract_literals(raw: &str) -> Vec<String> {
    literal_pattern()
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| unescape(m.as_str()))
        .filter(|value| !value.trim().is_empty())
        .collect()
}

fn unescape(literal: &str) -> String {
    if !literal.contains('\\') {
        return literal.to_string();
    }

    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('\'' | '"' | '\\')) => out.push(next),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}
