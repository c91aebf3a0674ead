//! Pull-based stream executor.
//!
//! Reads one record, pushes it through the modulator, writes whatever comes
//! out, and repeats. The end-of-stream marker goes through the modulator
//! too, so its drain runs exactly once, after which nothing more is read.

use std::io::{Cursor, Write};

use tracing::{debug, info};

use crate::config::StreamConfig;
use crate::error::Result;
use crate::modulator::Modulator;
use crate::namespace::{self, Namespace};
use crate::reader::{LineSource, RecordReader};
use crate::writer::RecordWriter;

/// Record counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub records_in: usize,
    pub records_out: usize,
}

/// Run one stream to completion and flush the writer.
pub fn run_stream<W: Write>(
    reader: &mut RecordReader,
    modulator: &mut Modulator,
    writer: &mut RecordWriter<W>,
    ns: &mut Namespace,
) -> Result<StreamStats> {
    let mut stats = StreamStats::default();

    loop {
        let record = reader.read(ns)?;
        let at_end = record.is_none();
        if at_end {
            debug!(modulator = modulator.name(), "Draining");
        } else {
            stats.records_in += 1;
        }

        for out in modulator.process(record) {
            writer.write(&out)?;
            stats.records_out += 1;
        }

        if at_end {
            break;
        }
    }

    writer.finish()?;
    info!(
        records_in = stats.records_in,
        records_out = stats.records_out,
        "Stream complete"
    );
    Ok(stats)
}

/// Run a configured stream over in-memory input text.
///
/// Returns (output_text, input_count, output_count) on success.
pub fn execute_stream(input_text: &str, config: &StreamConfig) -> Result<(String, usize, usize)> {
    let mut ns = config.namespace.clone();
    let source = LineSource::from_reader(
        "(input)",
        Cursor::new(input_text.to_string()),
        &ns.separator(namespace::IRS)?,
    );
    let mut reader = config.record_reader(source)?;
    let mut modulator = Modulator::from_spec(&config.modulator);
    let mut writer = config.record_writer(Vec::new())?;

    let stats = run_stream(&mut reader, &mut modulator, &mut writer, &mut ns)?;
    Ok((writer.output(), stats.records_in, stats.records_out))
}
