//! Field values with numeric inference.
//!
//! Values are inferred once, when a reader parses them, and always keep
//! the text they were parsed from so that writing a record reproduces its
//! input byte for byte.

use std::fmt;

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Decimal integer literal, e.g. `3` or `-17`.
    Int { value: i64, text: String },
    /// Floating-point literal, e.g. `3.5` or `1e-3`.
    Float { value: f64, text: String },
    /// Anything else, including the empty string.
    Str(String),
}

impl Value {
    /// Infer the type of `text` from its literal shape.
    ///
    /// `"3"` is an integer, `"3.5"` a float, `"3.5x"` a string. Words
    /// that `f64::from_str` would accept (`inf`, `NaN`) stay strings.
    pub fn infer(text: &str) -> Self {
        if looks_like_int(text)
            && let Ok(value) = text.parse::<i64>()
        {
            return Value::Int {
                value,
                text: text.to_string(),
            };
        }
        if looks_like_float(text)
            && let Ok(value) = text.parse::<f64>()
        {
            return Value::Float {
                value,
                text: text.to_string(),
            };
        }
        Value::Str(text.to_string())
    }

    /// A computed float, printed with the shortest round-trip formatting.
    pub fn from_f64(value: f64) -> Self {
        Value::Float {
            value,
            text: value.to_string(),
        }
    }

    /// The original (or formatted) text.
    pub fn as_str(&self) -> &str {
        match self {
            Value::Int { text, .. } | Value::Float { text, .. } => text,
            Value::Str(s) => s,
        }
    }

    /// Numeric view, if the value was inferred as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int { value, .. } => Some(*value as f64),
            Value::Float { value, .. } => Some(*value),
            Value::Str(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Str(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::infer(text)
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::infer(&text)
    }
}

fn looks_like_int(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn looks_like_float(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
}
