//! Ordered name/value records.

use crate::value::Value;

/// An ordered mapping of field name to value.
///
/// Field names are unique within a record. Insertion order is kept and
/// drives output field order and header generation. Records are small, so
/// lookups scan the field list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from name/value text pairs, inferring value types.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut record = Record::new();
        for (name, value) in pairs {
            record.put(name, Value::infer(value.as_ref()));
        }
        record
    }

    /// Set a field. An existing field keeps its position and gets the new value.
    pub fn put(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in record order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Values in record order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    /// Name/value pairs in record order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names joined by `separator`; used to detect schema changes.
    pub fn joined_names(&self, separator: &str) -> String {
        self.names().collect::<Vec<_>>().join(separator)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.put(name, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_kept() {
        let r = Record::from_pairs([("b", "1"), ("a", "2"), ("c", "3")]);
        assert_eq!(r.names().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_put_existing_replaces_in_place() {
        let mut r = Record::from_pairs([("a", "1"), ("b", "2")]);
        r.put("a", Value::infer("9"));
        assert_eq!(r.len(), 2);
        assert_eq!(r.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(r.get("a").map(Value::as_str), Some("9"));
    }

    #[test]
    fn test_get_missing() {
        let r = Record::from_pairs([("a", "1")]);
        assert!(r.get("z").is_none());
        assert!(!r.contains("z"));
    }

    #[test]
    fn test_empty_record_is_a_record() {
        let r = Record::new();
        assert!(r.is_empty());
        assert_eq!(r.joined_names(","), "");
    }

    #[test]
    fn test_collect_from_values() {
        let r: Record = vec![("x", Value::infer("1")), ("y", Value::infer("two"))]
            .into_iter()
            .collect();
        assert_eq!(r.joined_names(","), "x,y");
        assert!(r.get("x").is_some_and(Value::is_numeric));
    }
}
