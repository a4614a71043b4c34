//! Pure argument validation against per-endpoint schemas.
//!
//! Validation is deterministic, side-effect free, and fail-fast: fields are
//! checked in schema declaration order and the first problem wins. The
//! schema is a whitelist of checked fields, not a closed world: extra
//! arguments pass through untouched, and absent optional fields stay absent
//! for the handler to interpret.

use serde_json::{Map, Value};

use crate::protocol::ApiError;

/// Argument types an endpoint schema can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Array,
    Table,
}

impl FieldType {
    fn describe(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Boolean => "a boolean",
            Self::Array => "an array",
            Self::Table => "a table",
        }
    }
}

/// Declarative description of one argument field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaField {
    pub field_type: FieldType,
    pub required: bool,
    /// Element type for `Array` fields; ignored elsewhere.
    pub items: Option<FieldType>,
}

impl SchemaField {
    /// A mandatory field of the given type.
    #[must_use]
    pub const fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            items: None,
        }
    }

    /// An optional field of the given type.
    #[must_use]
    pub const fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            items: None,
        }
    }

    /// Adds an element type requirement to an array field.
    #[must_use]
    pub const fn items(mut self, items: FieldType) -> Self {
        self.items = Some(items);
        self
    }
}

/// Ordered field list owned by one endpoint.
pub type Schema = [(&'static str, SchemaField)];

/// Checks `params` against `schema`, returning the argument map on success.
///
/// # Errors
///
/// Returns the first violation found in declaration order: a non-object
/// `params`, a missing required field, a type mismatch, or a bad array
/// element (reported with its 0-based index).
pub fn validate<'a>(params: &'a Value, schema: &Schema) -> Result<&'a Map<String, Value>, ApiError> {
    let Some(args) = params.as_object() else {
        return Err(ApiError::bad_request("'params' must be an object"));
    };

    for (name, field) in schema {
        let Some(value) = args.get(*name) else {
            if field.required {
                return Err(ApiError::missing_required(format!(
                    "Missing required field '{name}'"
                )));
            }
            continue;
        };

        if !matches_type(value, field.field_type) {
            return Err(ApiError::invalid_type(format!(
                "Field '{name}' must be {}",
                field.field_type.describe()
            )));
        }

        if field.field_type == FieldType::Array
            && let Some(item_type) = field.items
            && let Some(index) = first_bad_item(value, item_type)
        {
            return Err(ApiError::invalid_array_items(format!(
                "Field '{name}' items must each be {} (invalid item at index {index})",
                item_type.describe()
            )));
        }
    }

    Ok(args)
}

fn matches_type(value: &Value, field_type: FieldType) -> bool {
    match field_type {
        FieldType::String => value.is_string(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Integer => is_integer(value),
        FieldType::Array => is_array_like(value),
        FieldType::Table => is_table(value),
    }
}

/// Whole numbers only, but representation-agnostic: `2` and `2.0` pass,
/// `2.5` does not. Strings never coerce.
fn is_integer(value: &Value) -> bool {
    let Some(number) = value.as_number() else {
        return false;
    };
    if number.is_i64() || number.is_u64() {
        return true;
    }
    number
        .as_f64()
        .is_some_and(|float| float.is_finite() && float.fract() == 0.0)
}

/// The operational definition of "array": a JSON array, or an object whose
/// keys are exactly the dense decimal integers `1..=len`, the
/// wire-compatible image of a one-based sequence. A gap disqualifies.
fn is_array_like(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(map) => is_dense_sequence(map),
        _ => false,
    }
}

/// "Table" means a non-array mapping; empty collections are accepted on
/// either side of the ambiguity.
fn is_table(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty() || !is_dense_sequence(map),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn is_dense_sequence(map: &Map<String, Value>) -> bool {
    if map.is_empty() {
        return false;
    }
    let mut indices = Vec::with_capacity(map.len());
    for key in map.keys() {
        match key.parse::<usize>() {
            Ok(index) if index >= 1 => indices.push(index),
            _ => return false,
        }
    }
    indices.sort_unstable();
    indices.iter().copied().eq(1..=map.len())
}

/// Iterates array elements in order, covering both encodings.
fn sequence_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => (1..=map.len())
            .filter_map(|index| map.get(&index.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

fn first_bad_item(value: &Value, item_type: FieldType) -> Option<usize> {
    sequence_items(value)
        .iter()
        .position(|item| !matches_type(item, item_type))
}
