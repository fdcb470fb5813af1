//! Decoding of stored validator argument text into typed values.
//!
//! Argument values are stored as raw text and read with YAML flow/scalar
//! semantics: `8` is an integer, `true` a boolean, `[http, https]` a list,
//! `'8'` a string. Parsing is data-only; YAML tags are refused.

use crate::error::SchemaConfigError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A decoded argument value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ArgValue>),
    Map(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    /// Human readable name of the variant, used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Null => "null",
            ArgValue::Bool(_) => "a boolean",
            ArgValue::Integer(_) => "an integer",
            ArgValue::Float(_) => "a float",
            ArgValue::String(_) => "a string",
            ArgValue::List(_) => "a list",
            ArgValue::Map(_) => "a map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Integer(i) => Some(*i as f64),
            ArgValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ArgValue::Null)
    }

    /// Plain text form used when comparing a value against user input.
    pub fn to_plain_string(&self) -> String {
        match self {
            ArgValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Null => write!(f, "null"),
            ArgValue::Bool(b) => write!(f, "{b}"),
            ArgValue::Integer(i) => write!(f, "{i}"),
            ArgValue::Float(x) => write!(f, "{x}"),
            ArgValue::String(s) => write!(f, "{s:?}"),
            ArgValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            ArgValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Decode stored argument text.
///
/// An empty string is returned unchanged as an empty string value; it is the
/// "no value" sentinel and is never parsed (so it is not `Null`).
pub fn decode(raw: &str) -> Result<ArgValue, SchemaConfigError> {
    if raw.is_empty() {
        return Ok(ArgValue::String(String::new()));
    }

    let value: serde_yaml::Value =
        serde_yaml::from_str(raw).map_err(|e| malformed(raw, e.to_string()))?;
    convert(raw, value)
}

fn convert(raw: &str, value: serde_yaml::Value) -> Result<ArgValue, SchemaConfigError> {
    use serde_yaml::Value;

    match value {
        Value::Null => Ok(ArgValue::Null),
        Value::Bool(b) => Ok(ArgValue::Bool(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(ArgValue::Integer(i))
            } else if let Some(x) = n.as_f64() {
                Ok(ArgValue::Float(x))
            } else {
                Err(malformed(raw, format!("unsupported number {n}")))
            }
        }
        Value::String(s) => Ok(ArgValue::String(s)),
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| convert(raw, item))
            .collect::<Result<Vec<_>, _>>()
            .map(ArgValue::List),
        Value::Mapping(mapping) => {
            let mut map = BTreeMap::new();
            for (key, item) in mapping {
                let key = match key {
                    Value::String(s) => s,
                    other => {
                        return Err(malformed(
                            raw,
                            format!("map keys must be strings, found {other:?}"),
                        ))
                    }
                };
                map.insert(key, convert(raw, item)?);
            }
            Ok(ArgValue::Map(map))
        }
        Value::Tagged(tagged) => Err(malformed(
            raw,
            format!("tagged values are not allowed ({})", tagged.tag),
        )),
    }
}

fn malformed(raw: &str, reason: String) -> SchemaConfigError {
    SchemaConfigError::MalformedLiteral {
        raw: raw.to_string(),
        reason,
    }
}
