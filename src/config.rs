//! Stream configuration: formats, modulator and namespace for one run.

use std::io::Write;
use std::path::PathBuf;

use crate::error::Result;
use crate::modulator::ModulatorSpec;
use crate::namespace::{self, Namespace};
use crate::reader::{LineSource, ReaderKind, RecordReader};
use crate::writer::{RecordWriter, WriterKind};

/// Everything chosen before the stream starts.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    pub namespace: Namespace,
    pub reader: ReaderKind,
    pub writer: WriterKind,
    pub modulator: ModulatorSpec,
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input and output record separators.
    pub fn set_record_separator(&mut self, rs: &str) {
        self.namespace.put(namespace::IRS, rs);
        self.namespace.put(namespace::ORS, rs);
    }

    /// Set the input and output field separators.
    pub fn set_field_separator(&mut self, fs: &str) {
        self.namespace.put(namespace::IFS, fs);
        self.namespace.put(namespace::OFS, fs);
    }

    /// Set the input and output pair separators.
    pub fn set_pair_separator(&mut self, ps: &str) {
        self.namespace.put(namespace::IPS, ps);
        self.namespace.put(namespace::OPS, ps);
    }

    /// Line source over `paths` (stdin when empty), split on `IRS`.
    pub fn line_source(&self, paths: &[PathBuf]) -> Result<LineSource> {
        Ok(LineSource::from_paths(
            paths,
            &self.namespace.separator(namespace::IRS)?,
        ))
    }

    pub fn record_reader(&self, source: LineSource) -> Result<RecordReader> {
        RecordReader::new(self.reader, source, &self.namespace)
    }

    pub fn record_writer<W: Write>(&self, out: W) -> Result<RecordWriter<W>> {
        RecordWriter::new(self.writer, out, &self.namespace)
    }
}

/// Split a comma-separated field list, dropping empty names.
pub fn parse_field_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_list() {
        assert_eq!(parse_field_list("a,b, c"), vec!["a", "b", "c"]);
        assert_eq!(parse_field_list("a,,b,"), vec!["a", "b"]);
        assert!(parse_field_list("").is_empty());
    }

    #[test]
    fn test_separators_set_both_sides() {
        let mut cfg = StreamConfig::new();
        cfg.set_field_separator(";");
        cfg.set_pair_separator(":");
        cfg.set_record_separator("|");
        assert_eq!(cfg.namespace.get(namespace::IFS), Some(";"));
        assert_eq!(cfg.namespace.get(namespace::OFS), Some(";"));
        assert_eq!(cfg.namespace.get(namespace::IPS), Some(":"));
        assert_eq!(cfg.namespace.get(namespace::OPS), Some(":"));
        assert_eq!(cfg.namespace.get(namespace::IRS), Some("|"));
        assert_eq!(cfg.namespace.get(namespace::ORS), Some("|"));
    }

    #[test]
    fn test_defaults() {
        let cfg = StreamConfig::new();
        assert_eq!(cfg.reader, ReaderKind::Delimited);
        assert_eq!(cfg.writer, WriterKind::Delimited);
        assert_eq!(cfg.modulator, ModulatorSpec::Identity);
    }

    #[test]
    fn test_empty_separator_rejected_when_building() {
        let mut cfg = StreamConfig::new();
        cfg.set_field_separator("");
        assert!(cfg.record_writer(Vec::new()).is_err());
        assert!(cfg.line_source(&[]).is_ok());
    }
}
