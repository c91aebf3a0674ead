//! # kvpipe
//!
//! A streaming record transformer over delimited text.
//!
//! Records are ordered name/value maps. A run wires three pieces together:
//!
//! - a **reader** turning lines into records (DKVP `a=1,b=2`, header-first
//!   CSV-lite, integer-indexed NIDX, or vertical XTAB)
//! - a **modulator** transforming the stream record by record, with one
//!   final drain call at end of stream (cat, tac, cut, cutx, sortfields, mean)
//! - a **writer** turning records back into text in any of those formats
//!
//! Separators and the `NR`/`FNR`/`NF`/`FILENAME` counters live in a
//! [`Namespace`] passed explicitly to the reader.
//!
//! ## Example
//!
//! ```
//! use kvpipe::{ModulatorSpec, StreamConfig, execute_stream};
//!
//! let config = StreamConfig {
//!     modulator: ModulatorSpec::DeselectFields(vec!["x".to_string()]),
//!     ..StreamConfig::default()
//! };
//!
//! let (output, records_in, records_out) =
//!     execute_stream("a=1,b=2,x=9\na=3,x=4\n", &config).unwrap();
//!
//! assert_eq!(output, "a=1,b=2\na=3\n");
//! assert_eq!((records_in, records_out), (2, 2));
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod modulator;
pub mod namespace;
pub mod reader;
pub mod record;
pub mod value;
pub mod writer;

pub use config::{StreamConfig, parse_field_list};
pub use error::{Result, StreamError};
pub use executor::{StreamStats, execute_stream, run_stream};
pub use modulator::{MeanKeeper, Modulator, ModulatorSpec};
pub use namespace::Namespace;
pub use reader::{LineSource, ReaderKind, RecordReader};
pub use record::Record;
pub use value::Value;
pub use writer::{RecordWriter, WriterKind};
