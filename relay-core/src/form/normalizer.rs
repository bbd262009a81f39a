//! Schema normalizer
//!
//! Reads a JSON-schema-like input description and produces one
//! [`FieldDescriptor`] per declared property, in declaration order.

use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

use crate::domain::field::{FieldDescriptor, FieldKind};
use crate::error::{RelayError, Result};

/// Normalize a raw input schema into an ordered list of field descriptors
///
/// A schema without properties (absent, `null` or empty) yields an empty
/// list. A schema that is not an object, or whose `properties` is not an
/// object map, fails with [`RelayError::Schema`].
///
/// # Example
/// ```
/// use relay_core::form::normalize;
/// use relay_core::domain::field::FieldKind;
///
/// let schema = serde_json::json!({
///     "properties": {
///         "url": { "type": "string", "title": "Start URL" },
///         "maxPages": { "type": "integer", "default": 10 }
///     }
/// });
/// let fields = normalize(&schema).unwrap();
/// assert_eq!(fields[0].kind, FieldKind::Text);
/// assert_eq!(fields[1].label, "maxPages");
/// ```
pub fn normalize(schema: &JsonValue) -> Result<Vec<FieldDescriptor>> {
    let schema = match schema {
        JsonValue::Null => return Ok(Vec::new()),
        JsonValue::Object(map) => map,
        other => {
            return Err(RelayError::Schema(format!(
                "expected a schema object, found {}",
                type_name(other)
            )));
        }
    };

    let properties = match schema.get("properties") {
        None | Some(JsonValue::Null) => return Ok(Vec::new()),
        Some(JsonValue::Object(properties)) => properties,
        Some(other) => {
            return Err(RelayError::Schema(format!(
                "`properties` must be an object, found {}",
                type_name(other)
            )));
        }
    };

    let required: HashSet<&str> = schema
        .get("required")
        .and_then(JsonValue::as_array)
        .map(|keys| keys.iter().filter_map(JsonValue::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(key, property)| describe(key, property, &required))
        .collect()
}

/// Build the descriptor of a single property
fn describe(key: &str, property: &JsonValue, required: &HashSet<&str>) -> Result<FieldDescriptor> {
    let property = property.as_object().ok_or_else(|| {
        RelayError::Schema(format!(
            "property '{}' must be an object, found {}",
            key,
            type_name(property)
        ))
    })?;

    let schema_type = property
        .get("type")
        .and_then(JsonValue::as_str)
        .map(str::to_string);
    let kind = FieldKind::from_schema_type(schema_type.as_deref());

    let default_value = property
        .get("default")
        .filter(|value| kind.accepts(value))
        .cloned();

    let required = required.contains(key)
        || property
            .get("required")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);

    Ok(FieldDescriptor {
        key: key.to_string(),
        kind,
        schema_type,
        label: text_attr(property, "title").unwrap_or_else(|| key.to_string()),
        help_text: text_attr(property, "description"),
        default_value,
        required,
    })
}

fn text_attr(property: &Map<String, JsonValue>, name: &str) -> Option<String> {
    property
        .get(name)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
