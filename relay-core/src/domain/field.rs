//! Form field domain types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Kind of value a form field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    /// Arrays, objects and any type not recognised; edited as JSON text
    Structured,
}

impl FieldKind {
    /// Map a JSON-schema `type` keyword onto a field kind
    pub fn from_schema_type(schema_type: Option<&str>) -> Self {
        match schema_type {
            Some("string") => FieldKind::Text,
            Some("number") | Some("integer") => FieldKind::Number,
            Some("boolean") => FieldKind::Boolean,
            _ => FieldKind::Structured,
        }
    }

    /// Whether a default taken from the schema fits this kind
    pub fn accepts(&self, value: &JsonValue) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Structured => !value.is_null(),
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Text => write!(f, "text"),
            FieldKind::Number => write!(f, "number"),
            FieldKind::Boolean => write!(f, "boolean"),
            FieldKind::Structured => write!(f, "structured"),
        }
    }
}

/// One input field derived from a job's input schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Property name, unique within the schema
    pub key: String,
    pub kind: FieldKind,
    /// Declared JSON-schema type, if any
    pub schema_type: Option<String>,
    /// Human label; the schema title or the key
    pub label: String,
    pub help_text: Option<String>,
    /// Schema default, kept only when it matches `kind`
    pub default_value: Option<JsonValue>,
    pub required: bool,
}
