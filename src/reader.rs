//! Record readers.
//!
//! A [`RecordReader`] pulls lines from a [`LineSource`] and turns them into
//! [`Record`]s according to its [`ReaderKind`]. Reading is lazy: one call to
//! [`RecordReader::read`] consumes only the lines needed for one record.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::{Result, StreamError};
use crate::namespace::{self, Namespace, STDIN_NAME};
use crate::record::Record;
use crate::value::Value;

/// Input record formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderKind {
    /// `name=value` pairs joined by the field separator.
    #[default]
    Delimited,
    /// A header line of names, then lines of positional values.
    HeaderFirst,
    /// Values only; fields are named `1`, `2`, `3`, ... by position.
    IntegerIndexed,
    /// One `name value` line per field, records separated by blank lines.
    VerticallyTabulated,
}

enum Input {
    Path(PathBuf),
    Stdin,
    Reader {
        name: String,
        reader: Box<dyn BufRead>,
    },
}

/// One line of input, with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    /// Index of the input the line was read from, counting from 0.
    pub input_index: usize,
    /// Line number within that input, counting from 1.
    pub number: u64,
}

/// A sequence of inputs read one after another as a single line stream.
pub struct LineSource {
    pending: VecDeque<Input>,
    current: Option<(String, Box<dyn BufRead>)>,
    input_index: usize,
    names: Vec<String>,
    line_number: u64,
    separator: Vec<u8>,
    pushed_back: Option<Line>,
}

impl LineSource {
    fn with_inputs(inputs: Vec<Input>, separator: &str) -> Self {
        Self {
            pending: inputs.into(),
            current: None,
            input_index: 0,
            names: Vec::new(),
            line_number: 0,
            separator: separator.as_bytes().to_vec(),
            pushed_back: None,
        }
    }

    /// Read the given files in order, or standard input if `paths` is empty.
    pub fn from_paths(paths: &[PathBuf], separator: &str) -> Self {
        let inputs = if paths.is_empty() {
            vec![Input::Stdin]
        } else {
            paths.iter().cloned().map(Input::Path).collect()
        };
        Self::with_inputs(inputs, separator)
    }

    /// Read from an already-open buffered reader.
    pub fn from_reader(name: impl Into<String>, reader: impl BufRead + 'static, separator: &str) -> Self {
        Self::with_inputs(
            vec![Input::Reader {
                name: name.into(),
                reader: Box::new(reader),
            }],
            separator,
        )
    }

    /// Read from several in-memory or already-open readers in order.
    pub fn from_readers(readers: Vec<(String, Box<dyn BufRead>)>, separator: &str) -> Self {
        let inputs = readers
            .into_iter()
            .map(|(name, reader)| Input::Reader { name, reader })
            .collect();
        Self::with_inputs(inputs, separator)
    }

    /// Name of the input with the given index, once it has been opened.
    pub fn input_name(&self, index: usize) -> &str {
        self.names.get(index).map_or(STDIN_NAME, String::as_str)
    }

    fn location(&self, line: &Line) -> String {
        format!("{} line {}", self.input_name(line.input_index), line.number)
    }

    fn open_next(&mut self) -> Result<bool> {
        let Some(input) = self.pending.pop_front() else {
            return Ok(false);
        };
        let (name, reader): (String, Box<dyn BufRead>) = match input {
            Input::Path(path) => {
                let file = File::open(&path).map_err(|source| StreamError::Open {
                    path: path.clone(),
                    source,
                })?;
                let reader = Box::new(BufReader::new(file)) as Box<dyn BufRead>;
                (path.display().to_string(), reader)
            }
            Input::Stdin => {
                let reader = Box::new(io::stdin().lock()) as Box<dyn BufRead>;
                (STDIN_NAME.to_string(), reader)
            }
            Input::Reader { name, reader } => (name, reader),
        };
        debug!(input = %name, "Opening input");
        self.input_index = self.names.len();
        self.names.push(name.clone());
        self.line_number = 0;
        self.current = Some((name, reader));
        Ok(true)
    }

    /// Next line across all inputs, without its record separator.
    pub fn next_line(&mut self) -> Result<Option<Line>> {
        if let Some(line) = self.pushed_back.take() {
            return Ok(Some(line));
        }
        loop {
            if self.current.is_none() && !self.open_next()? {
                return Ok(None);
            }
            let Some((name, reader)) = self.current.as_mut() else {
                continue;
            };
            let mut buf = Vec::new();
            let got = read_separated(reader.as_mut(), &self.separator, &mut buf)
                .map_err(|e| StreamError::io(format!("reading {name}"), e))?;
            if !got {
                debug!(input = %name, lines = self.line_number, "Input exhausted");
                self.current = None;
                continue;
            }
            if self.separator == b"\n" && buf.last() == Some(&b'\r') {
                buf.pop();
            }
            self.line_number += 1;
            return Ok(Some(Line {
                text: String::from_utf8_lossy(&buf).into_owned(),
                input_index: self.input_index,
                number: self.line_number,
            }));
        }
    }

    /// Return a line so the next call to `next_line` yields it again.
    pub fn push_back(&mut self, line: Line) {
        self.pushed_back = Some(line);
    }
}

/// Read up to and excluding `separator`. Returns false at end of input.
fn read_separated(reader: &mut dyn BufRead, separator: &[u8], buf: &mut Vec<u8>) -> io::Result<bool> {
    let Some(&last) = separator.last() else {
        return Ok(false);
    };
    loop {
        let n = reader.read_until(last, buf)?;
        if n == 0 {
            return Ok(!buf.is_empty());
        }
        if buf.ends_with(separator) {
            buf.truncate(buf.len() - separator.len());
            return Ok(true);
        }
        if buf.last() != Some(&last) {
            // end of input without a trailing separator
            return Ok(true);
        }
    }
}

struct Header {
    names: Vec<String>,
    line: String,
    input_index: usize,
}

/// Format-specific reader state.
enum ReaderState {
    Delimited,
    HeaderFirst { header: Option<Header> },
    IntegerIndexed,
    VerticallyTabulated,
}

/// Reads records from a line source.
pub struct RecordReader {
    source: LineSource,
    state: ReaderState,
    ifs: String,
    ips: String,
    /// Input whose records `FNR` currently counts.
    counted_input: Option<usize>,
}

impl RecordReader {
    /// Create a reader, taking separators from the namespace.
    pub fn new(kind: ReaderKind, source: LineSource, ns: &Namespace) -> Result<Self> {
        let state = match kind {
            ReaderKind::Delimited => ReaderState::Delimited,
            ReaderKind::HeaderFirst => ReaderState::HeaderFirst { header: None },
            ReaderKind::IntegerIndexed => ReaderState::IntegerIndexed,
            ReaderKind::VerticallyTabulated => ReaderState::VerticallyTabulated,
        };
        Ok(Self {
            source,
            state,
            ifs: ns.separator(namespace::IFS)?,
            ips: ns.separator(namespace::IPS)?,
            counted_input: None,
        })
    }

    pub fn kind(&self) -> ReaderKind {
        match self.state {
            ReaderState::Delimited => ReaderKind::Delimited,
            ReaderState::HeaderFirst { .. } => ReaderKind::HeaderFirst,
            ReaderState::IntegerIndexed => ReaderKind::IntegerIndexed,
            ReaderState::VerticallyTabulated => ReaderKind::VerticallyTabulated,
        }
    }

    /// Read the next record, or `None` once every input is exhausted.
    ///
    /// Updates `NR`, `FNR`, `NF` and `FILENAME` in the namespace. `FILENAME`
    /// and `FNR` switch to a new input with the first record read from it.
    pub fn read(&mut self, ns: &mut Namespace) -> Result<Option<Record>> {
        let next = match &mut self.state {
            ReaderState::Delimited => match self.source.next_line()? {
                Some(line) => {
                    let record = parse_delimited(&line.text, &self.ifs, &self.ips, || {
                        self.source.location(&line)
                    })?;
                    Some((record, line.input_index))
                }
                None => None,
            },
            ReaderState::HeaderFirst { header } => {
                read_header_first(&mut self.source, header, &self.ifs)?
            }
            ReaderState::IntegerIndexed => self.source.next_line()?.map(|line| {
                (
                    parse_integer_indexed(&line.text, &self.ifs),
                    line.input_index,
                )
            }),
            ReaderState::VerticallyTabulated => read_stanza(&mut self.source)?,
        };
        let Some((record, input_index)) = next else {
            return Ok(None);
        };
        if self.counted_input != Some(input_index) {
            ns.start_file(self.source.input_name(input_index));
            self.counted_input = Some(input_index);
        }
        ns.count_record(record.len());
        trace!(nr = ns.nr(), nf = ns.nf(), "Read record");
        Ok(Some(record))
    }
}

/// Parse one DKVP line. Empty tokens (repeated separators) are ignored.
pub fn parse_delimited(
    line: &str,
    ifs: &str,
    ips: &str,
    location: impl Fn() -> String,
) -> Result<Record> {
    let mut record = Record::new();
    for token in line.split(ifs) {
        if token.is_empty() {
            continue;
        }
        match token.split_once(ips) {
            Some((name, value)) => record.put(name, Value::infer(value)),
            None => {
                return Err(StreamError::MissingPairSeparator {
                    separator: ips.to_string(),
                    token: token.to_string(),
                    line: line.to_string(),
                    location: location(),
                });
            }
        }
    }
    Ok(record)
}

/// Parse one NIDX line into fields keyed `1`, `2`, ...
pub fn parse_integer_indexed(line: &str, ifs: &str) -> Record {
    if line.is_empty() {
        return Record::new();
    }
    line.split(ifs)
        .enumerate()
        .map(|(i, value)| ((i + 1).to_string(), Value::infer(value)))
        .collect()
}

/// Repeated header names become `name_2`, `name_3`, ... so no column is lost.
fn dedupe_names<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw {
        let mut candidate = name.to_string();
        let mut suffix = 2;
        while names.contains(&candidate) {
            candidate = format!("{name}_{suffix}");
            suffix += 1;
        }
        names.push(candidate);
    }
    names
}

fn read_header_first(
    source: &mut LineSource,
    header: &mut Option<Header>,
    ifs: &str,
) -> Result<Option<(Record, usize)>> {
    loop {
        let Some(line) = source.next_line()? else {
            return Ok(None);
        };
        if line.text.is_empty() {
            // blank line ends the block; a new header follows
            *header = None;
            continue;
        }
        let same_input = header
            .as_ref()
            .is_some_and(|h| h.input_index == line.input_index);
        if !same_input {
            debug!(header = %line.text, "Read header");
            *header = Some(Header {
                names: dedupe_names(line.text.split(ifs)),
                line: line.text,
                input_index: line.input_index,
            });
            continue;
        }
        let Some(current) = header.as_ref() else {
            continue;
        };
        let values: Vec<&str> = line.text.split(ifs).collect();
        if values.len() != current.names.len() {
            return Err(StreamError::HeaderDataLengthMismatch {
                expected: current.names.len(),
                actual: values.len(),
                header: current.line.clone(),
                line: line.text.clone(),
            });
        }
        let record = Record::from_pairs(current.names.iter().cloned().zip(values));
        return Ok(Some((record, line.input_index)));
    }
}

fn read_stanza(source: &mut LineSource) -> Result<Option<(Record, usize)>> {
    let mut record: Option<Record> = None;
    let mut input_index = None;
    while let Some(line) = source.next_line()? {
        if line.text.is_empty() {
            if record.is_some() {
                break;
            }
            continue;
        }
        match input_index {
            Some(index) if index != line.input_index => {
                // stanzas never span inputs
                source.push_back(line);
                break;
            }
            _ => input_index = Some(line.input_index),
        }
        let (name, value) = match line.text.split_once(' ') {
            Some((name, rest)) => (name, rest.trim_start_matches(' ')),
            None => (line.text.as_str(), ""),
        };
        record
            .get_or_insert_with(Record::new)
            .put(name, Value::infer(value));
    }
    Ok(record.zip(input_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_for(kind: ReaderKind, input: &str) -> (RecordReader, Namespace) {
        let ns = Namespace::new();
        let source = LineSource::from_reader("test", Cursor::new(input.to_string()), "\n");
        (RecordReader::new(kind, source, &ns).unwrap(), ns)
    }

    fn read_all(kind: ReaderKind, input: &str) -> Result<Vec<Record>> {
        let (mut reader, mut ns) = reader_for(kind, input);
        let mut out = Vec::new();
        while let Some(r) = reader.read(&mut ns)? {
            out.push(r);
        }
        Ok(out)
    }

    fn names(r: &Record) -> Vec<&str> {
        r.names().collect()
    }

    fn text(r: &Record, name: &str) -> String {
        r.get(name).map(|v| v.to_string()).unwrap_or_default()
    }

    #[test]
    fn test_delimited_basic() {
        let records = read_all(ReaderKind::Delimited, "a=1,b=2,c=hello\nx=3\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(names(&records[0]), vec!["a", "b", "c"]);
        assert_eq!(text(&records[0], "c"), "hello");
        assert_eq!(text(&records[1], "x"), "3");
    }

    #[test]
    fn test_delimited_value_may_contain_pair_separator() {
        let records = read_all(ReaderKind::Delimited, "expr=a=b\n").unwrap();
        assert_eq!(text(&records[0], "expr"), "a=b");
    }

    #[test]
    fn test_delimited_missing_pair_separator_is_fatal() {
        let err = read_all(ReaderKind::Delimited, "a=1,oops\n").unwrap_err();
        match err {
            StreamError::MissingPairSeparator { token, location, .. } => {
                assert_eq!(token, "oops");
                assert_eq!(location, "test line 1");
            }
            other => panic!("Expected MissingPairSeparator, got {other:?}"),
        }
    }

    #[test]
    fn test_delimited_empty_line_is_empty_record() {
        let records = read_all(ReaderKind::Delimited, "a=1\n\nb=2\n").unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[1].is_empty());
    }

    #[test]
    fn test_crlf_is_stripped() {
        let records = read_all(ReaderKind::Delimited, "a=1,b=2\r\n").unwrap();
        assert_eq!(text(&records[0], "b"), "2");
    }

    #[test]
    fn test_no_trailing_newline() {
        let records = read_all(ReaderKind::Delimited, "a=1\nb=2").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(text(&records[1], "b"), "2");
    }

    #[test]
    fn test_empty_input_is_end_of_stream() {
        assert!(read_all(ReaderKind::Delimited, "").unwrap().is_empty());
        assert!(read_all(ReaderKind::HeaderFirst, "").unwrap().is_empty());
        assert!(read_all(ReaderKind::HeaderFirst, "a,b\n").unwrap().is_empty());
    }

    #[test]
    fn test_header_first() {
        let records = read_all(ReaderKind::HeaderFirst, "a,b,c\n1,2,3\n4,5,6\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(names(&records[1]), vec!["a", "b", "c"]);
        assert_eq!(text(&records[1], "c"), "6");
    }

    #[test]
    fn test_header_first_length_mismatch_is_fatal() {
        let err = read_all(ReaderKind::HeaderFirst, "a,b\n1,2,3\n").unwrap_err();
        match err {
            StreamError::HeaderDataLengthMismatch {
                expected,
                actual,
                header,
                line,
            } => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
                assert_eq!(header, "a,b");
                assert_eq!(line, "1,2,3");
            }
            other => panic!("Expected HeaderDataLengthMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_header_first_repeated_names_are_suffixed() {
        let (mut reader, mut ns) = reader_for(ReaderKind::HeaderFirst, "a,a,b,a\n1,2,3,4\n");
        let r = reader.read(&mut ns).unwrap().unwrap();
        assert_eq!(names(&r), vec!["a", "a_2", "b", "a_3"]);
        assert_eq!(text(&r, "a_2"), "2");
        assert_eq!(text(&r, "a_3"), "4");
        assert_eq!(ns.nf(), 4);
    }

    #[test]
    fn test_header_first_blank_line_starts_new_block() {
        let records = read_all(ReaderKind::HeaderFirst, "a,b\n1,2\n\nx\n9\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(names(&records[0]), vec!["a", "b"]);
        assert_eq!(names(&records[1]), vec!["x"]);
    }

    #[test]
    fn test_header_first_each_input_has_its_own_header() {
        let ns = Namespace::new();
        let source = LineSource::from_readers(
            vec![
                (
                    "one".to_string(),
                    Box::new(Cursor::new("a,b\n1,2\n")) as Box<dyn BufRead>,
                ),
                (
                    "two".to_string(),
                    Box::new(Cursor::new("c\n3\n")) as Box<dyn BufRead>,
                ),
            ],
            "\n",
        );
        let mut reader = RecordReader::new(ReaderKind::HeaderFirst, source, &ns).unwrap();
        let mut ns = ns;
        let first = reader.read(&mut ns).unwrap().unwrap();
        assert_eq!(names(&first), vec!["a", "b"]);
        let second = reader.read(&mut ns).unwrap().unwrap();
        assert_eq!(names(&second), vec!["c"]);
        assert_eq!(ns.filename(), "two");
        assert_eq!(ns.nr(), 2);
        assert_eq!(ns.fnr(), 1);
        assert!(reader.read(&mut ns).unwrap().is_none());
    }

    #[test]
    fn test_integer_indexed() {
        let ns = {
            let mut ns = Namespace::new();
            ns.put(namespace::IFS, " ");
            ns
        };
        let source = LineSource::from_reader("test", Cursor::new("x y z\n"), "\n");
        let mut reader = RecordReader::new(ReaderKind::IntegerIndexed, source, &ns).unwrap();
        assert_eq!(reader.kind(), ReaderKind::IntegerIndexed);
        let mut ns = ns;
        let r = reader.read(&mut ns).unwrap().unwrap();
        assert_eq!(names(&r), vec!["1", "2", "3"]);
        assert_eq!(text(&r, "3"), "z");
        assert_eq!(ns.nf(), 3);
    }

    #[test]
    fn test_vertically_tabulated() {
        let input = "a   1\nbcd 2\n\n\na 3\nbcd\n";
        let records = read_all(ReaderKind::VerticallyTabulated, input).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(names(&records[0]), vec!["a", "bcd"]);
        assert_eq!(text(&records[0], "a"), "1");
        assert_eq!(text(&records[1], "bcd"), "");
    }

    #[test]
    fn test_vertically_tabulated_counters_follow_record_input() {
        let ns = Namespace::new();
        let source = LineSource::from_readers(
            vec![
                (
                    "one".to_string(),
                    Box::new(Cursor::new("a 1\nb 2\n")) as Box<dyn BufRead>,
                ),
                (
                    "two".to_string(),
                    Box::new(Cursor::new("a 3\n")) as Box<dyn BufRead>,
                ),
            ],
            "\n",
        );
        let mut reader = RecordReader::new(ReaderKind::VerticallyTabulated, source, &ns).unwrap();
        let mut ns = ns;

        let first = reader.read(&mut ns).unwrap().unwrap();
        assert_eq!(text(&first, "a"), "1");
        assert_eq!(ns.filename(), "one");
        assert_eq!((ns.nr(), ns.fnr(), ns.nf()), (1, 1, 2));

        let second = reader.read(&mut ns).unwrap().unwrap();
        assert_eq!(text(&second, "a"), "3");
        assert_eq!(ns.filename(), "two");
        assert_eq!((ns.nr(), ns.fnr(), ns.nf()), (2, 1, 1));

        assert!(reader.read(&mut ns).unwrap().is_none());
    }

    #[test]
    fn test_custom_record_separator() {
        let ns = Namespace::new();
        let source = LineSource::from_reader("test", Cursor::new("a=1;;b=2;;"), ";;");
        let mut reader = RecordReader::new(ReaderKind::Delimited, source, &ns).unwrap();
        let mut ns = ns;
        assert_eq!(text(&reader.read(&mut ns).unwrap().unwrap(), "a"), "1");
        assert_eq!(text(&reader.read(&mut ns).unwrap().unwrap(), "b"), "2");
        assert!(reader.read(&mut ns).unwrap().is_none());
    }

    #[test]
    fn test_counters_update() {
        let (mut reader, mut ns) = reader_for(ReaderKind::Delimited, "a=1,b=2\nc=3\n");
        reader.read(&mut ns).unwrap();
        assert_eq!((ns.nr(), ns.fnr(), ns.nf()), (1, 1, 2));
        reader.read(&mut ns).unwrap();
        assert_eq!((ns.nr(), ns.fnr(), ns.nf()), (2, 2, 1));
        assert_eq!(ns.filename(), "test");
    }

    #[test]
    fn test_missing_file_is_an_open_error() {
        let ns = Namespace::new();
        let source = LineSource::from_paths(&[PathBuf::from("/nonexistent/kvpipe-input")], "\n");
        let mut reader = RecordReader::new(ReaderKind::Delimited, source, &ns).unwrap();
        let mut ns = ns;
        assert!(matches!(
            reader.read(&mut ns),
            Err(StreamError::Open { .. })
        ));
    }
}
