//! Form state store
//!
//! Holds the current value of every field of the selected job. Every
//! operation returns a new snapshot; nothing here performs I/O.

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

use crate::domain::field::{FieldDescriptor, FieldKind};
use crate::error::{RelayError, Result};

/// Current value of a single field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    /// Numeric input as typed; parsed when the payload is built
    Number {
        raw: String,
        /// Schema default, submitted verbatim until the field is edited
        default: Option<serde_json::Number>,
    },
    Boolean(bool),
    Structured(StructuredValue),
}

/// JSON text edited by the user plus its last successfully decoded value
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredValue {
    text: String,
    decoded: JsonValue,
    valid: bool,
}

impl StructuredValue {
    /// Wrap an already decoded value using its canonical encoding
    pub fn from_value(value: JsonValue) -> Self {
        Self {
            text: value.to_string(),
            decoded: value,
            valid: true,
        }
    }

    /// Apply new text, keeping the previous decoded value if it does not parse
    fn edit(&self, raw: &str) -> Self {
        match serde_json::from_str::<JsonValue>(raw) {
            Ok(decoded) => Self {
                text: raw.to_string(),
                decoded,
                valid: true,
            },
            Err(_) => Self {
                text: raw.to_string(),
                decoded: self.decoded.clone(),
                valid: false,
            },
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Last value that decoded successfully
    pub fn decoded(&self) -> &JsonValue {
        &self.decoded
    }

    /// Whether the current text decodes
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl FieldValue {
    /// Value a field starts with
    fn initial(field: &FieldDescriptor) -> Self {
        let default = field.default_value.as_ref();
        match field.kind {
            FieldKind::Text => FieldValue::Text(
                default
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            FieldKind::Number => {
                let default = match default {
                    Some(JsonValue::Number(number)) => Some(number.clone()),
                    _ => None,
                };
                FieldValue::Number {
                    raw: default.as_ref().map(ToString::to_string).unwrap_or_default(),
                    default,
                }
            }
            FieldKind::Boolean => {
                FieldValue::Boolean(default.and_then(JsonValue::as_bool).unwrap_or(false))
            }
            FieldKind::Structured => {
                let value = match default {
                    Some(value) => value.clone(),
                    None if field.schema_type.as_deref() == Some("array") => {
                        JsonValue::Array(Vec::new())
                    }
                    None => JsonValue::Object(Map::new()),
                };
                FieldValue::Structured(StructuredValue::from_value(value))
            }
        }
    }

    /// Field kind this value belongs to
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Number { .. } => FieldKind::Number,
            FieldValue::Boolean(_) => FieldKind::Boolean,
            FieldValue::Structured(_) => FieldKind::Structured,
        }
    }

    /// Text representation suitable for display or re-editing
    pub fn display_text(&self) -> String {
        match self {
            FieldValue::Text(s) | FieldValue::Number { raw: s, .. } => s.clone(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Structured(s) => s.text().to_string(),
        }
    }

    fn edit(&self, key: &str, raw: &str) -> Result<Self> {
        match self {
            FieldValue::Text(_) => Ok(FieldValue::Text(raw.to_string())),
            FieldValue::Number { .. } => Ok(FieldValue::Number {
                raw: raw.to_string(),
                default: None,
            }),
            FieldValue::Boolean(_) => parse_bool(raw)
                .map(FieldValue::Boolean)
                .ok_or_else(|| {
                    RelayError::invalid_input(key, format!("'{}' is not a boolean", raw))
                }),
            FieldValue::Structured(current) => Ok(FieldValue::Structured(current.edit(raw))),
        }
    }

    fn to_json(&self, key: &str) -> Result<JsonValue> {
        match self {
            FieldValue::Text(s) => Ok(JsonValue::String(s.clone())),
            FieldValue::Number {
                default: Some(number),
                ..
            } => Ok(JsonValue::Number(number.clone())),
            FieldValue::Number { raw, .. } => parse_number(key, raw),
            FieldValue::Boolean(b) => Ok(JsonValue::Bool(*b)),
            FieldValue::Structured(value) if value.is_valid() => Ok(value.decoded().clone()),
            FieldValue::Structured(value) => Err(RelayError::invalid_input(
                key,
                format!("'{}' is not valid JSON", value.text()),
            )),
        }
    }
}

/// Values of every field of the current schema, in schema order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues {
    values: IndexMap<String, FieldValue>,
}

impl FormValues {
    /// Seed a form from field descriptors
    ///
    /// Each field starts at its schema default, or at the empty value of its
    /// kind: `""` for text and numbers, `false` for booleans, `{}`/`[]` for
    /// structured fields.
    pub fn initialize(fields: &[FieldDescriptor]) -> Self {
        let values = fields
            .iter()
            .map(|field| (field.key.clone(), FieldValue::initial(field)))
            .collect();
        Self { values }
    }

    /// Apply a user edit and return the resulting snapshot
    ///
    /// Fails with [`RelayError::UnknownField`] for keys outside the form and
    /// with [`RelayError::InvalidInput`] for unparsable booleans. Invalid
    /// structured text is accepted here and reported by [`Self::to_payload`].
    pub fn apply_edit(&self, key: &str, raw: &str) -> Result<Self> {
        let current = self
            .values
            .get(key)
            .ok_or_else(|| RelayError::UnknownField(key.to_string()))?;
        let updated = current.edit(key, raw)?;

        let mut next = self.clone();
        next.values.insert(key.to_string(), updated);
        Ok(next)
    }

    /// Serialize the form into a submission payload
    ///
    /// Numbers are parsed (integers first); empty numeric input is passed
    /// through as an empty string. Structured fields must hold valid JSON.
    pub fn to_payload(&self) -> Result<Map<String, JsonValue>> {
        self.values
            .iter()
            .map(|(key, value)| Ok((key.clone(), value.to_json(key)?)))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_number(key: &str, raw: &str) -> Result<JsonValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(JsonValue::String(String::new()));
    }

    if let Ok(int) = trimmed.parse::<i64>() {
        return Ok(JsonValue::from(int));
    }
    if let Ok(unsigned) = trimmed.parse::<u64>() {
        return Ok(JsonValue::from(unsigned));
    }

    trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(JsonValue::Number)
        .ok_or_else(|| RelayError::invalid_input(key, format!("'{}' is not a number", raw)))
}
