//! CLI tool to stream records from files (or stdin) through one modulator.
//!
//! Usage:
//!   kvpipe [OPTIONS] [FILES]...
//!   kvpipe --icsv --oxtab --cut a,c data.csv
//!   kvpipe --mean x,y --by shape -o out.dkvp data.dkvp

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser};
use kvpipe::namespace::{IFS, IPS, IRS, OFS, OPS, ORS};
use kvpipe::{
    Modulator, ModulatorSpec, ReaderKind, StreamConfig, WriterKind, parse_field_list, run_stream,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Stream records through a reader, one modulator, and a writer.
///
/// Separators are applied in order: defaults, then -R/-F/-P, then the
/// one-sided --irs/--ifs/... flags, then -v assignments.
#[derive(Parser, Debug)]
#[command(name = "kvpipe", version)]
struct Cli {
    /// Input files, read in order as one stream (default: stdin)
    files: Vec<PathBuf>,

    /// Input and output record separator
    #[arg(short = 'R', value_name = "RS")]
    rs: Option<String>,

    /// Input and output field separator
    #[arg(short = 'F', value_name = "FS")]
    fs: Option<String>,

    /// Input and output key-value pair separator
    #[arg(short = 'P', value_name = "PS")]
    ps: Option<String>,

    /// Input record separator
    #[arg(long)]
    irs: Option<String>,

    /// Input field separator
    #[arg(long)]
    ifs: Option<String>,

    /// Input pair separator
    #[arg(long)]
    ips: Option<String>,

    /// Output record separator
    #[arg(long)]
    ors: Option<String>,

    /// Output field separator
    #[arg(long)]
    ofs: Option<String>,

    /// Output pair separator
    #[arg(long)]
    ops: Option<String>,

    /// Namespace assignment, e.g. -v OFS=';' (repeatable)
    #[arg(short = 'v', value_name = "NAME=VALUE")]
    assignments: Vec<String>,

    #[command(flatten)]
    input_format: InputFormat,

    #[command(flatten)]
    output_format: OutputFormat,

    #[command(flatten)]
    modulator: ModulatorArgs,

    /// Key fields for --mean
    #[arg(long, value_name = "FIELDS", requires = "mean")]
    by: Option<String>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log inputs, output, formats and record counts on stderr
    #[arg(long)]
    verbose: bool,
}

#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct InputFormat {
    /// Input is name=value pairs delimited by IFS and IPS (default)
    #[arg(long)]
    idkvp: bool,
    /// Input is a header line followed by data lines (CSV-lite)
    #[arg(long)]
    icsv: bool,
    /// Input is implicitly integer-indexed (awk-style)
    #[arg(long)]
    inidx: bool,
    /// Input is vertically tabulated, records separated by blank lines
    #[arg(long)]
    ixtab: bool,
}

impl InputFormat {
    fn kind(&self) -> ReaderKind {
        if self.icsv {
            ReaderKind::HeaderFirst
        } else if self.inidx {
            ReaderKind::IntegerIndexed
        } else if self.ixtab {
            ReaderKind::VerticallyTabulated
        } else {
            ReaderKind::Delimited
        }
    }
}

#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct OutputFormat {
    /// Output is name=value pairs delimited by OFS and OPS (default)
    #[arg(long)]
    odkvp: bool,
    /// Output is a header line followed by data lines (CSV-lite)
    #[arg(long)]
    ocsv: bool,
    /// Output is values only (awk-style)
    #[arg(long)]
    onidx: bool,
    /// Output is vertically tabulated
    #[arg(long)]
    oxtab: bool,
}

impl OutputFormat {
    fn kind(&self) -> WriterKind {
        if self.ocsv {
            WriterKind::HeaderFirst
        } else if self.onidx {
            WriterKind::IntegerIndexed
        } else if self.oxtab {
            WriterKind::VerticallyTabulated
        } else {
            WriterKind::Delimited
        }
    }
}

#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct ModulatorArgs {
    /// Pass records through unchanged (default)
    #[arg(long)]
    cat: bool,
    /// Emit records in reverse order
    #[arg(long)]
    tac: bool,
    /// Keep only the named fields, in the order given
    #[arg(long, value_name = "FIELDS")]
    cut: Option<String>,
    /// Drop the named fields
    #[arg(long, value_name = "FIELDS")]
    cutx: Option<String>,
    /// Sort fields within each record by name, ascending
    #[arg(long)]
    sortfields: bool,
    /// Same as --sortfields
    #[arg(long)]
    sortfieldsup: bool,
    /// Sort fields within each record by name, descending
    #[arg(long)]
    sortfieldsdown: bool,
    /// Mean of the named fields, grouped by --by fields
    #[arg(long, value_name = "FIELDS")]
    mean: Option<String>,
}

impl ModulatorArgs {
    fn spec(&self, by: Option<&str>) -> ModulatorSpec {
        if self.tac {
            ModulatorSpec::Reverse
        } else if let Some(fields) = &self.cut {
            ModulatorSpec::SelectFields(parse_field_list(fields))
        } else if let Some(fields) = &self.cutx {
            ModulatorSpec::DeselectFields(parse_field_list(fields))
        } else if self.sortfields || self.sortfieldsup {
            ModulatorSpec::SortFields { ascending: true }
        } else if self.sortfieldsdown {
            ModulatorSpec::SortFields { ascending: false }
        } else if let Some(fields) = &self.mean {
            ModulatorSpec::Mean {
                value_fields: parse_field_list(fields),
                key_fields: by.map(parse_field_list).unwrap_or_default(),
            }
        } else {
            ModulatorSpec::Identity
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn stream_config(cli: &Cli) -> Result<StreamConfig> {
    let mut config = StreamConfig::new();

    if let Some(rs) = &cli.rs {
        config.set_record_separator(rs);
    }
    if let Some(fs) = &cli.fs {
        config.set_field_separator(fs);
    }
    if let Some(ps) = &cli.ps {
        config.set_pair_separator(ps);
    }
    let one_sided = [
        (IRS, &cli.irs),
        (IFS, &cli.ifs),
        (IPS, &cli.ips),
        (ORS, &cli.ors),
        (OFS, &cli.ofs),
        (OPS, &cli.ops),
    ];
    for (name, value) in one_sided {
        if let Some(value) = value {
            config.namespace.put(name, value.as_str());
        }
    }
    for assignment in &cli.assignments {
        config
            .namespace
            .assign(assignment)
            .context("Bad -v argument")?;
    }

    config.reader = cli.input_format.kind();
    config.writer = cli.output_format.kind();
    config.modulator = cli.modulator.spec(cli.by.as_deref());
    Ok(config)
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| {
            format!("Error creating output directory for '{}'", path.display())
        })?;
    }
    let file = File::create(path)
        .with_context(|| format!("Error creating output file '{}'", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn run(cli: &Cli) -> Result<()> {
    let config = stream_config(cli)?;
    let mut ns = config.namespace.clone();

    if cli.verbose {
        let inputs: Vec<String> = cli.files.iter().map(|p| p.display().to_string()).collect();
        info!(
            inputs = ?inputs,
            output = %cli.output.as_deref().map_or("(stdout)".into(), |p| p.display().to_string()),
            reader = ?config.reader,
            writer = ?config.writer,
            modulator = config.modulator.name(),
            "Starting stream"
        );
    }

    let source = config.line_source(&cli.files)?;
    let mut reader = config.record_reader(source)?;
    let mut modulator = Modulator::from_spec(&config.modulator);
    let out = open_output(cli.output.as_deref())?;
    let mut writer = config.record_writer(out)?;

    run_stream(&mut reader, &mut modulator, &mut writer, &mut ns).context("Stream failed")?;
    Ok(())
}
