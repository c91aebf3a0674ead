//! Separators, user variables and per-stream counters.
//!
//! The namespace keeps two stores: one keyed by name holding strings
//! (separators, `FILENAME`, anything assigned with `-v`) and one holding
//! integer counters (`NR`, `FNR`, `NF`). It is set up once per run, edited
//! by option parsing, and then updated by the reader after every record.

use std::collections::HashMap;

use crate::error::{Result, StreamError};

pub const IRS: &str = "IRS";
pub const IFS: &str = "IFS";
pub const IPS: &str = "IPS";
pub const ORS: &str = "ORS";
pub const OFS: &str = "OFS";
pub const OPS: &str = "OPS";
pub const FILENAME: &str = "FILENAME";
pub const NR: &str = "NR";
pub const FNR: &str = "FNR";
pub const NF: &str = "NF";

/// Placeholder file name while reading standard input.
pub const STDIN_NAME: &str = "(stdin)";

#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    strings: HashMap<String, String>,
    integers: HashMap<String, i64>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    /// A namespace with default separators and zeroed counters.
    pub fn new() -> Self {
        let mut ns = Namespace {
            strings: HashMap::new(),
            integers: HashMap::new(),
        };
        ns.put(IRS, "\n");
        ns.put(ORS, "\n");
        ns.put(IFS, ",");
        ns.put(OFS, ",");
        ns.put(IPS, "=");
        ns.put(OPS, "=");
        ns.put(FILENAME, STDIN_NAME);
        ns.iput(NR, 0);
        ns.iput(FNR, 0);
        ns.iput(NF, 0);
        ns
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(String::as_str)
    }

    pub fn put(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(name.into(), value.into());
    }

    pub fn iget(&self, name: &str) -> Option<i64> {
        self.integers.get(name).copied()
    }

    pub fn iput(&mut self, name: impl Into<String>, value: i64) {
        self.integers.insert(name.into(), value);
    }

    /// Apply a `name=value` assignment. The value may itself contain `=`.
    pub fn assign(&mut self, assignment: &str) -> Result<()> {
        match assignment.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                self.put(name, value);
                Ok(())
            }
            _ => Err(StreamError::InvalidAssignment(assignment.to_string())),
        }
    }

    /// A separator by name, rejecting the empty string.
    pub fn separator(&self, name: &str) -> Result<String> {
        match self.get(name) {
            Some(sep) if !sep.is_empty() => Ok(sep.to_string()),
            _ => Err(StreamError::EmptySeparator(name.to_string())),
        }
    }

    pub fn nr(&self) -> i64 {
        self.iget(NR).unwrap_or(0)
    }

    pub fn fnr(&self) -> i64 {
        self.iget(FNR).unwrap_or(0)
    }

    pub fn nf(&self) -> i64 {
        self.iget(NF).unwrap_or(0)
    }

    pub fn filename(&self) -> &str {
        self.get(FILENAME).unwrap_or(STDIN_NAME)
    }

    /// Reset per-file state when the reader moves to a new input.
    pub(crate) fn start_file(&mut self, filename: &str) {
        self.put(FILENAME, filename);
        self.iput(FNR, 0);
    }

    /// Bump counters after a record of `field_count` fields was read.
    pub(crate) fn count_record(&mut self, field_count: usize) {
        self.iput(NF, field_count as i64);
        self.iput(NR, self.nr() + 1);
        self.iput(FNR, self.fnr() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ns = Namespace::new();
        assert_eq!(ns.get(IRS), Some("\n"));
        assert_eq!(ns.get(IFS), Some(","));
        assert_eq!(ns.get(IPS), Some("="));
        assert_eq!(ns.get(ORS), Some("\n"));
        assert_eq!(ns.get(OFS), Some(","));
        assert_eq!(ns.get(OPS), Some("="));
        assert_eq!(ns.nr(), 0);
        assert_eq!(ns.fnr(), 0);
        assert_eq!(ns.filename(), STDIN_NAME);
    }

    #[test]
    fn test_string_and_integer_stores_are_separate() {
        let mut ns = Namespace::new();
        ns.put("x", "hello");
        ns.iput("x", 7);
        assert_eq!(ns.get("x"), Some("hello"));
        assert_eq!(ns.iget("x"), Some(7));
    }

    #[test]
    fn test_assign_splits_once() {
        let mut ns = Namespace::new();
        ns.assign("k=a=b").unwrap();
        assert_eq!(ns.get("k"), Some("a=b"));
        ns.assign("OFS=;").unwrap();
        assert_eq!(ns.separator(OFS).unwrap(), ";");
    }

    #[test]
    fn test_assign_rejects_missing_equals() {
        let mut ns = Namespace::new();
        assert!(matches!(
            ns.assign("novalue"),
            Err(StreamError::InvalidAssignment(_))
        ));
        assert!(ns.assign("=x").is_err());
    }

    #[test]
    fn test_empty_separator_rejected() {
        let mut ns = Namespace::new();
        ns.put(IFS, "");
        assert!(matches!(
            ns.separator(IFS),
            Err(StreamError::EmptySeparator(_))
        ));
    }

    #[test]
    fn test_counters_across_files() {
        let mut ns = Namespace::new();
        ns.start_file("a.dkvp");
        ns.count_record(3);
        ns.count_record(2);
        ns.start_file("b.dkvp");
        ns.count_record(4);
        assert_eq!(ns.nr(), 3);
        assert_eq!(ns.fnr(), 1);
        assert_eq!(ns.nf(), 4);
        assert_eq!(ns.filename(), "b.dkvp");
    }
}
