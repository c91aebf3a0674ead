//! Stream modulators.
//!
//! A modulator sees every record of the stream in order, then one final
//! end-of-stream call (the drain). Each call returns zero or more records to
//! emit right away. Stateless modulators emit nothing on drain; buffering
//! ones (REVERSE, MEAN) emit everything they held.

use std::collections::HashMap;

use tracing::debug;

use crate::record::Record;
use crate::value::Value;

/// Which modulator to build, as chosen on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModulatorSpec {
    /// CAT - pass records through unchanged.
    #[default]
    Identity,
    /// TAC - emit all records in reverse order at end of stream.
    Reverse,
    /// CUT - keep the named fields, in the order named.
    SelectFields(Vec<String>),
    /// CUTX - drop the named fields.
    DeselectFields(Vec<String>),
    /// SORTFIELDS - reorder each record's fields by name.
    SortFields { ascending: bool },
    /// MEAN - grouped means of value fields, emitted at end of stream.
    Mean {
        value_fields: Vec<String>,
        key_fields: Vec<String>,
    },
}

impl ModulatorSpec {
    /// Display name, for log messages.
    pub fn name(&self) -> &'static str {
        match self {
            ModulatorSpec::Identity => "CAT",
            ModulatorSpec::Reverse => "TAC",
            ModulatorSpec::SelectFields(_) => "CUT",
            ModulatorSpec::DeselectFields(_) => "CUTX",
            ModulatorSpec::SortFields { .. } => "SORTFIELDS",
            ModulatorSpec::Mean { .. } => "MEAN",
        }
    }
}

// ---------------------------------------------------------------------------
// Modulator implementations
// ---------------------------------------------------------------------------

/// CAT - passes records through unchanged.
#[derive(Debug, Default)]
pub struct IdentityModulator;

impl IdentityModulator {
    fn process(&mut self, record: Record) -> Vec<Record> {
        vec![record]
    }
}

/// TAC - holds every record and emits them newest-first on drain.
#[derive(Debug, Default)]
pub struct ReverseModulator {
    records: Vec<Record>,
}

impl ReverseModulator {
    fn process(&mut self, record: Record) -> Vec<Record> {
        self.records.push(record);
        vec![]
    }

    fn drain(&mut self) -> Vec<Record> {
        let mut records = std::mem::take(&mut self.records);
        records.reverse();
        records
    }
}

/// CUT - keeps requested fields that are present, in requested order.
///
/// Requested names missing from a record are skipped, not an error.
#[derive(Debug)]
pub struct SelectFieldsModulator {
    names: Vec<String>,
}

impl SelectFieldsModulator {
    fn process(&mut self, record: Record) -> Vec<Record> {
        let selected = self
            .names
            .iter()
            .filter_map(|name| record.get(name).map(|v| (name.as_str(), v.clone())))
            .collect();
        vec![selected]
    }
}

/// CUTX - drops the named fields, keeping the record's own order.
#[derive(Debug)]
pub struct DeselectFieldsModulator {
    names: Vec<String>,
}

impl DeselectFieldsModulator {
    fn process(&mut self, record: Record) -> Vec<Record> {
        let kept = record
            .pairs()
            .filter(|(name, _)| !self.names.iter().any(|n| n == name))
            .map(|(name, value)| (name, value.clone()))
            .collect();
        vec![kept]
    }
}

/// SORTFIELDS - rebuilds each record with its fields sorted by name.
#[derive(Debug)]
pub struct SortFieldsModulator {
    ascending: bool,
}

impl SortFieldsModulator {
    fn process(&mut self, record: Record) -> Vec<Record> {
        let mut names: Vec<&str> = record.names().collect();
        names.sort_unstable();
        if !self.ascending {
            names.reverse();
        }
        let sorted = names
            .into_iter()
            .filter_map(|name| record.get(name).map(|v| (name, v.clone())))
            .collect();
        vec![sorted]
    }
}

/// Running sum and count for one value field of one group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanKeeper {
    sum: f64,
    count: u64,
}

impl MeanKeeper {
    pub fn put(&mut self, x: f64) {
        self.sum += x;
        self.count += 1;
    }

    /// `None` when nothing was accumulated.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

struct MeanGroup {
    key_values: Vec<Value>,
    keepers: Vec<MeanKeeper>,
}

/// MEAN - per-group running means, emitted on drain.
///
/// Groups are keyed by the text of the key fields and emitted in the order
/// they were first seen. A record lacking a key or value field, or with a
/// non-numeric value field, contributes nothing.
pub struct MeanModulator {
    value_fields: Vec<String>,
    key_fields: Vec<String>,
    groups: Vec<MeanGroup>,
    index: HashMap<Vec<String>, usize>,
    skipped: usize,
}

impl MeanModulator {
    pub fn new(value_fields: Vec<String>, key_fields: Vec<String>) -> Self {
        Self {
            value_fields,
            key_fields,
            groups: Vec::new(),
            index: HashMap::new(),
            skipped: 0,
        }
    }

    fn process(&mut self, record: Record) -> Vec<Record> {
        let key_values: Option<Vec<Value>> = self
            .key_fields
            .iter()
            .map(|name| record.get(name).cloned())
            .collect();
        let numbers: Option<Vec<f64>> = self
            .value_fields
            .iter()
            .map(|name| record.get(name).and_then(Value::as_f64))
            .collect();
        let (Some(key_values), Some(numbers)) = (key_values, numbers) else {
            self.skipped += 1;
            return vec![];
        };

        let key: Vec<String> = key_values.iter().map(|v| v.as_str().to_string()).collect();
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.groups.push(MeanGroup {
                    key_values,
                    keepers: vec![MeanKeeper::default(); self.value_fields.len()],
                });
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        for (keeper, x) in self.groups[slot].keepers.iter_mut().zip(numbers) {
            keeper.put(x);
        }
        vec![]
    }

    fn drain(&mut self) -> Vec<Record> {
        debug!(
            groups = self.groups.len(),
            skipped = self.skipped,
            "Emitting means"
        );
        self.index.clear();
        self.skipped = 0;
        let groups = std::mem::take(&mut self.groups);
        groups
            .into_iter()
            .filter_map(|group| {
                let mut out = Record::new();
                for (name, value) in self.key_fields.iter().zip(group.key_values) {
                    out.put(name.as_str(), value);
                }
                let mut any = false;
                for (name, keeper) in self.value_fields.iter().zip(&group.keepers) {
                    if let Some(mean) = keeper.mean() {
                        out.put(format!("{name}_mean"), Value::from_f64(mean));
                        any = true;
                    }
                }
                any.then_some(out)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// A configured modulator with its state.
pub enum Modulator {
    Identity(IdentityModulator),
    Reverse(ReverseModulator),
    SelectFields(SelectFieldsModulator),
    DeselectFields(DeselectFieldsModulator),
    SortFields(SortFieldsModulator),
    Mean(MeanModulator),
}

impl Modulator {
    /// Build a fresh modulator from its spec.
    pub fn from_spec(spec: &ModulatorSpec) -> Self {
        match spec {
            ModulatorSpec::Identity => Modulator::Identity(IdentityModulator),
            ModulatorSpec::Reverse => Modulator::Reverse(ReverseModulator::default()),
            ModulatorSpec::SelectFields(names) => {
                Modulator::SelectFields(SelectFieldsModulator {
                    names: names.clone(),
                })
            }
            ModulatorSpec::DeselectFields(names) => {
                Modulator::DeselectFields(DeselectFieldsModulator {
                    names: names.clone(),
                })
            }
            ModulatorSpec::SortFields { ascending } => Modulator::SortFields(SortFieldsModulator {
                ascending: *ascending,
            }),
            ModulatorSpec::Mean {
                value_fields,
                key_fields,
            } => Modulator::Mean(MeanModulator::new(
                value_fields.clone(),
                key_fields.clone(),
            )),
        }
    }

    /// Process one record, or drain on `None`.
    ///
    /// Returns the records to emit now; an empty vector when there are none.
    pub fn process(&mut self, record: Option<Record>) -> Vec<Record> {
        match record {
            Some(record) => match self {
                Modulator::Identity(m) => m.process(record),
                Modulator::Reverse(m) => m.process(record),
                Modulator::SelectFields(m) => m.process(record),
                Modulator::DeselectFields(m) => m.process(record),
                Modulator::SortFields(m) => m.process(record),
                Modulator::Mean(m) => m.process(record),
            },
            None => match self {
                Modulator::Reverse(m) => m.drain(),
                Modulator::Mean(m) => m.drain(),
                Modulator::Identity(_)
                | Modulator::SelectFields(_)
                | Modulator::DeselectFields(_)
                | Modulator::SortFields(_) => vec![],
            },
        }
    }

    /// The display name of this modulator.
    pub fn name(&self) -> &str {
        match self {
            Modulator::Identity(_) => "CAT",
            Modulator::Reverse(_) => "TAC",
            Modulator::SelectFields(_) => "CUT",
            Modulator::DeselectFields(_) => "CUTX",
            Modulator::SortFields(_) => "SORTFIELDS",
            Modulator::Mean(_) => "MEAN",
        }
    }
}
