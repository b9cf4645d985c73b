use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::core::StorageError;

/// A dynamically typed primitive held by a key-value store.
///
/// Absence of a key is modelled as `Option<StoredValue>::None` at the store
/// boundary, never as a variant here.
///
/// Non-finite doubles are persisted as the strings `"NaN"`, `"inf"` and
/// `"-inf"`, since JSON numbers cannot express them. Two NaN doubles compare
/// equal so that reloading a domain does not report them as changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum StoredValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating-point number.
    Double(#[serde(with = "double")] f64),
    /// Raw byte buffer.
    Data(Vec<u8>),
    /// UTF-8 text.
    String(String),
    /// Absolute URI in `scheme:rest` form.
    Url(String),
}

/// The closed set of primitive kinds a [`StoredValue`] can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// [`StoredValue::Bool`]
    Bool,
    /// [`StoredValue::Integer`]
    Integer,
    /// [`StoredValue::Double`]
    Double,
    /// [`StoredValue::Data`]
    Data,
    /// [`StoredValue::String`]
    String,
    /// [`StoredValue::Url`]
    Url,
}

impl PartialEq for StoredValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StoredValue::Bool(a), StoredValue::Bool(b)) => a == b,
            (StoredValue::Integer(a), StoredValue::Integer(b)) => a == b,
            (StoredValue::Double(a), StoredValue::Double(b)) => {
                a == b || (a.is_nan() && b.is_nan())
            }
            (StoredValue::Data(a), StoredValue::Data(b)) => a == b,
            (StoredValue::String(a), StoredValue::String(b)) => a == b,
            (StoredValue::Url(a), StoredValue::Url(b)) => a == b,
            _ => false,
        }
    }
}

impl StoredValue {
    /// The primitive kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            StoredValue::Bool(_) => ValueKind::Bool,
            StoredValue::Integer(_) => ValueKind::Integer,
            StoredValue::Double(_) => ValueKind::Double,
            StoredValue::Data(_) => ValueKind::Data,
            StoredValue::String(_) => ValueKind::String,
            StoredValue::Url(_) => ValueKind::Url,
        }
    }

    /// Parses command-line text into a value of the given kind.
    ///
    /// Data is read as hexadecimal; URLs must carry a scheme.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidValue` when the text does not parse.
    pub fn parse(kind: ValueKind, input: &str) -> Result<Self, StorageError> {
        let invalid = |reason: &dyn fmt::Display| StorageError::invalid_value(kind, input, reason);

        match kind {
            ValueKind::Bool => match input.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(StoredValue::Bool(true)),
                "false" | "no" | "0" => Ok(StoredValue::Bool(false)),
                _ => Err(invalid(&"expected true/false")),
            },
            ValueKind::Integer => input
                .parse()
                .map(StoredValue::Integer)
                .map_err(|e| invalid(&e)),
            ValueKind::Double => input
                .parse()
                .map(StoredValue::Double)
                .map_err(|e| invalid(&e)),
            ValueKind::Data => hex::decode(input)
                .map(StoredValue::Data)
                .map_err(|e| invalid(&e)),
            ValueKind::String => Ok(StoredValue::String(input.to_string())),
            ValueKind::Url => {
                if has_scheme(input) {
                    Ok(StoredValue::Url(input.to_string()))
                } else {
                    Err(invalid(&"missing URL scheme"))
                }
            }
        }
    }
}

/// Whether `input` starts with an RFC 3986 scheme followed by `:`.
pub(crate) fn has_scheme(input: &str) -> bool {
    let Some((scheme, _)) = input.split_once(':') else {
        return false;
    };

    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredValue::Bool(value) => write!(f, "{value}"),
            StoredValue::Integer(value) => write!(f, "{value}"),
            StoredValue::Double(value) => write!(f, "{value}"),
            StoredValue::Data(bytes) => write!(f, "<{}>", hex::encode(bytes)),
            StoredValue::String(text) => write!(f, "\"{text}\""),
            StoredValue::Url(url) => write!(f, "{url}"),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Double => "double",
            ValueKind::Data => "data",
            ValueKind::String => "string",
            ValueKind::Url => "url",
        };
        f.write_str(name)
    }
}

impl FromStr for ValueKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(ValueKind::Bool),
            "int" | "integer" => Ok(ValueKind::Integer),
            "double" | "float" => Ok(ValueKind::Double),
            "data" | "bytes" => Ok(ValueKind::Data),
            "string" | "text" => Ok(ValueKind::String),
            "url" | "uri" => Ok(ValueKind::Url),
            _ => Err(StorageError::invalid_value("kind", s, "unknown value kind")),
        }
    }
}

/// JSON representation of doubles that keeps non-finite values.
mod double {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const NAN: &str = "NaN";
    const INFINITY: &str = "inf";
    const NEG_INFINITY: &str = "-inf";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub(super) fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if *value == f64::INFINITY {
            serializer.serialize_str(INFINITY)
        } else if *value == f64::NEG_INFINITY {
            serializer.serialize_str(NEG_INFINITY)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid double '{other}'"))),
            },
        }
    }
}
