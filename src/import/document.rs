//! Fixture content parsing
//!
//! A fixture file holds exactly one top-level JSON array whose elements are
//! all JSON objects. Each object becomes one BSON document with the same
//! structure.

use bson::{Bson, Document};
use serde_json::{Map, Value};

/// Error type for malformed fixture content
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Not valid JSON (or not UTF-8)
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Top-level value is not an array
    #[error("Expected a top-level JSON array, found {found}")]
    NotAnArray { found: &'static str },

    /// An array element is not an object
    #[error("Element {index} is {found}, expected a JSON object")]
    NonObjectElement { index: usize, found: &'static str },
}

/// Parse a fixture file into documents
///
/// The whole file is validated before anything is returned, so a single
/// bad element rejects the file as a unit.
pub fn parse_documents(content: &[u8]) -> Result<Vec<Document>, ContentError> {
    let value: Value = serde_json::from_slice(content)?;

    let Value::Array(elements) = value else {
        return Err(ContentError::NotAnArray {
            found: json_type_name(&value),
        });
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| match element {
            Value::Object(object) => Ok(object_to_document(object)),
            other => Err(ContentError::NonObjectElement {
                index,
                found: json_type_name(&other),
            }),
        })
        .collect()
}

/// Convert a JSON object into a BSON document
pub fn object_to_document(object: Map<String, Value>) -> Document {
    let mut document = Document::new();
    for (key, value) in object {
        document.insert(key, json_to_bson(value));
    }
    document
}

/// Convert a JSON value into BSON, keeping its shape
///
/// Integers become `Int64` so that re-reading a document yields the same
/// numeric type regardless of magnitude. Numbers that do not fit an `i64`
/// (large unsigned values, fractions, exponents) become `Double`.
pub fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Bson::Int64(i),
            None => Bson::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(object) => Bson::Document(object_to_document(object)),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
