use serde_json::{Map, Value};

/// Declared payload structure for a channel
///
/// Object shapes are closed: fields not listed are rejected, so a UI cannot
/// smuggle extra options into a privileged handler.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadShape {
    /// The channel takes no payload at all
    None,
    /// A JSON object with exactly these fields
    Object(Vec<FieldSpec>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: true,
        }
    }

    pub fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Length bounds are in characters
    String { min_len: usize, max_len: usize },
    Integer { min: i64, max: i64 },
    Boolean,
    OneOf(&'static [&'static str]),
    StringList { max_items: usize, max_len: usize },
}

impl FieldType {
    pub fn string(min_len: usize, max_len: usize) -> Self {
        FieldType::String { min_len, max_len }
    }

    pub fn integer(min: i64, max: i64) -> Self {
        FieldType::Integer { min, max }
    }
}

impl PayloadShape {
    /// Check `payload` against the shape, returning a field-level description
    /// of the first problem found.
    ///
    /// Only a payload that is present is checked; `None` and JSON `null`
    /// pass for every shape. Required fields apply inside a present object.
    pub fn validate(&self, payload: Option<&Value>) -> Result<(), String> {
        let Some(payload) = payload.filter(|v| !v.is_null()) else {
            return Ok(());
        };

        match (self, payload) {
            (PayloadShape::None, value) => Err(format!(
                "channel takes no payload, got {}",
                type_name(value)
            )),
            (PayloadShape::Object(fields), Value::Object(map)) => validate_object(fields, map),
            (PayloadShape::Object(_), value) => Err(format!(
                "expected a JSON object, got {}",
                type_name(value)
            )),
        }
    }
}

fn validate_object(fields: &[FieldSpec], map: &Map<String, Value>) -> Result<(), String> {
    if let Some(unknown) = map
        .keys()
        .find(|key| !fields.iter().any(|f| f.name == key.as_str()))
    {
        return Err(format!("unknown field `{}`", unknown));
    }

    for field in fields {
        match map.get(field.name) {
            None | Some(Value::Null) if !field.required => {}
            None => return Err(format!("missing required field `{}`", field.name)),
            Some(value) => validate_value(field.name, &field.field_type, value)?,
        }
    }

    Ok(())
}

fn validate_value(path: &str, field_type: &FieldType, value: &Value) -> Result<(), String> {
    match field_type {
        FieldType::String { min_len, max_len } => {
            let s = value
                .as_str()
                .ok_or_else(|| mismatch(path, "string", value))?;
            check_length(path, s, *min_len, *max_len)
        }
        FieldType::Integer { min, max } => {
            let n = value
                .as_i64()
                .ok_or_else(|| mismatch(path, "integer", value))?;
            if n < *min || n > *max {
                return Err(format!(
                    "field `{}`: {} is outside {}..={}",
                    path, n, min, max
                ));
            }
            Ok(())
        }
        FieldType::Boolean => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err(mismatch(path, "boolean", value))
            }
        }
        FieldType::OneOf(allowed) => {
            let s = value
                .as_str()
                .ok_or_else(|| mismatch(path, "string", value))?;
            if allowed.contains(&s) {
                Ok(())
            } else {
                Err(format!(
                    "field `{}`: expected one of [{}]",
                    path,
                    allowed.join(", ")
                ))
            }
        }
        FieldType::StringList { max_items, max_len } => {
            let items = value
                .as_array()
                .ok_or_else(|| mismatch(path, "array", value))?;
            if items.len() > *max_items {
                return Err(format!(
                    "field `{}`: at most {} items allowed, got {}",
                    path,
                    max_items,
                    items.len()
                ));
            }
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                let s = item
                    .as_str()
                    .ok_or_else(|| mismatch(&item_path, "string", item))?;
                check_length(&item_path, s, 0, *max_len)?;
            }
            Ok(())
        }
    }
}

fn check_length(path: &str, s: &str, min_len: usize, max_len: usize) -> Result<(), String> {
    let len = s.chars().count();
    if len < min_len {
        return Err(format!(
            "field `{}`: must be at least {} characters",
            path, min_len
        ));
    }
    if len > max_len {
        return Err(format!(
            "field `{}`: must be at most {} characters",
            path, max_len
        ));
    }
    Ok(())
}

fn mismatch(path: &str, expected: &str, value: &Value) -> String {
    format!(
        "field `{}`: expected {}, got {}",
        path,
        expected,
        type_name(value)
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
