//! Record writers.
//!
//! A [`RecordWriter`] formats records onto any [`Write`]. Output is
//! written as records arrive; only the header-first format keeps state
//! (the last header it printed).

use std::io::Write;

use tracing::debug;

use crate::error::{Result, StreamError};
use crate::namespace::{self, Namespace};
use crate::record::Record;

/// Output record formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriterKind {
    /// `name=value` pairs joined by the field separator.
    #[default]
    Delimited,
    /// A header line of names, then one line of values per record.
    HeaderFirst,
    /// Values only.
    IntegerIndexed,
    /// One `name value` line per field, then a blank line.
    VerticallyTabulated,
}

enum WriterState {
    Delimited,
    HeaderFirst { last_header: Option<String> },
    IntegerIndexed,
    VerticallyTabulated,
}

/// Writes records to an output stream.
pub struct RecordWriter<W: Write> {
    out: W,
    state: WriterState,
    ors: String,
    ofs: String,
    ops: String,
}

impl<W: Write> RecordWriter<W> {
    /// Create a writer, taking separators from the namespace.
    pub fn new(kind: WriterKind, out: W, ns: &Namespace) -> Result<Self> {
        let state = match kind {
            WriterKind::Delimited => WriterState::Delimited,
            WriterKind::HeaderFirst => WriterState::HeaderFirst { last_header: None },
            WriterKind::IntegerIndexed => WriterState::IntegerIndexed,
            WriterKind::VerticallyTabulated => WriterState::VerticallyTabulated,
        };
        Ok(Self {
            out,
            state,
            ors: ns.separator(namespace::ORS)?,
            ofs: ns.separator(namespace::OFS)?,
            ops: ns.separator(namespace::OPS)?,
        })
    }

    pub fn kind(&self) -> WriterKind {
        match self.state {
            WriterState::Delimited => WriterKind::Delimited,
            WriterState::HeaderFirst { .. } => WriterKind::HeaderFirst,
            WriterState::IntegerIndexed => WriterKind::IntegerIndexed,
            WriterState::VerticallyTabulated => WriterKind::VerticallyTabulated,
        }
    }

    /// Write one record.
    pub fn write(&mut self, record: &Record) -> Result<()> {
        let text = match &mut self.state {
            WriterState::Delimited => format_delimited(record, &self.ofs, &self.ops, &self.ors),
            WriterState::HeaderFirst { last_header } => {
                let header = record.joined_names(&self.ofs);
                let mut text = String::new();
                if last_header.as_deref() != Some(header.as_str()) {
                    if last_header.is_some() {
                        debug!(header = %header, "Schema change, starting new header block");
                        text.push_str(&self.ors);
                    }
                    text.push_str(&header);
                    text.push_str(&self.ors);
                    *last_header = Some(header);
                }
                text.push_str(&format_values(record, &self.ofs, &self.ors));
                text
            }
            WriterState::IntegerIndexed => format_values(record, &self.ofs, &self.ors),
            WriterState::VerticallyTabulated => format_vertical(record, &self.ors),
        };
        self.out
            .write_all(text.as_bytes())
            .map_err(|e| StreamError::io("writing output", e))
    }

    /// Flush buffered output.
    pub fn finish(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| StreamError::io("flushing output", e))
    }
}

/// `name=value` pairs joined by `ofs`, terminated by `ors`.
pub fn format_delimited(record: &Record, ofs: &str, ops: &str, ors: &str) -> String {
    let mut line = record
        .pairs()
        .map(|(name, value)| format!("{name}{ops}{value}"))
        .collect::<Vec<_>>()
        .join(ofs);
    line.push_str(ors);
    line
}

fn format_values(record: &Record, ofs: &str, ors: &str) -> String {
    let mut line = record
        .values()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(ofs);
    line.push_str(ors);
    line
}

/// Names left-aligned to the widest name in the record, one per `ors`
/// terminated line, then an empty line.
pub fn format_vertical(record: &Record, ors: &str) -> String {
    if record.is_empty() {
        return String::new();
    }
    let width = record
        .names()
        .map(|name| name.chars().count())
        .max()
        .unwrap_or(1)
        .max(1);
    let mut text = String::new();
    for (name, value) in record.pairs() {
        text.push_str(&format!("{name:<width$} {value}{ors}"));
    }
    text.push_str(ors);
    text
}

/// Writer over a byte buffer, handy for tests and in-memory pipelines.
pub type BufferWriter = RecordWriter<Vec<u8>>;

impl BufferWriter {
    /// Everything written so far, as text.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }
}
