use crate::collection::{is_system_field, Collection};
use crate::error::{DeesseError, Result};
use crate::field::{Field, FieldKind};
use crate::permissions::Action;
use crate::provider::Record;
use serde_json::Value;

/// Result of validating a payload
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Validate a create or update payload against the collection's fields.
///
/// Creates must supply every non-nullable user field. Updates only check the
/// fields they carry. System fields are assigned by the provider and skipped.
/// Keys the collection does not declare produce warnings, not errors.
pub fn validate_payload(collection: &Collection, action: Action, data: &Record) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (field_name, field) in collection.fields().iter() {
        if is_system_field(field_name) {
            continue;
        }
        let value = data.get(field_name);
        let missing = value.map_or(true, Value::is_null);

        if missing {
            let required = !field.can_be_null();
            let absent_on_update = action == Action::Update && value.is_none();
            if required && !absent_on_update {
                result
                    .errors
                    .push(format!("Required field '{field_name}' is missing"));
            }
            continue;
        }

        if let Some(val) = value {
            validate_field_value(field_name, field, val, &mut result);
        }
    }

    for key in data.keys() {
        if !collection.fields().contains(key) {
            result.warnings.push(format!(
                "Unexpected field '{key}' for collection '{}'",
                collection.slug()
            ));
        }
    }

    result
}

fn validate_field_value(
    field_name: &str,
    field: &Field,
    value: &Value,
    result: &mut ValidationResult,
) {
    let params = field.params();
    match field.kind() {
        FieldKind::Text | FieldKind::Varchar | FieldKind::Char => {
            let Some(s) = value.as_str() else {
                result.errors.push(format!(
                    "Field '{field_name}' expected string, got {}",
                    type_name(value)
                ));
                return;
            };
            let len = s.chars().count() as f64;
            if let Some(min) = params.min {
                if len < min {
                    result.errors.push(format!(
                        "Field '{field_name}' must be at least {min} characters"
                    ));
                }
            }
            if let Some(max) = params.max {
                if len > max {
                    result.errors.push(format!(
                        "Field '{field_name}' must be at most {max} characters"
                    ));
                }
            }
            if let Some(length) = params.length {
                if len > f64::from(length) {
                    result.errors.push(format!(
                        "Field '{field_name}' exceeds column length {length}"
                    ));
                }
            }
        }
        FieldKind::Integer | FieldKind::Serial => {
            if !(value.is_i64() || value.is_u64()) {
                result.errors.push(format!(
                    "Field '{field_name}' expected integer, got {}",
                    type_name(value)
                ));
                return;
            }
            check_bounds(field_name, field, value.as_f64(), result);
        }
        FieldKind::Numeric | FieldKind::Decimal => {
            // Arbitrary-precision values may arrive as strings.
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            };
            if number.is_none() {
                result.errors.push(format!(
                    "Field '{field_name}' expected number, got {}",
                    type_name(value)
                ));
                return;
            }
            check_bounds(field_name, field, number, result);
        }
        FieldKind::Boolean => {
            if !value.is_boolean() {
                result.errors.push(format!(
                    "Field '{field_name}' expected boolean, got {}",
                    type_name(value)
                ));
            }
        }
        FieldKind::Uuid => {
            let valid = value
                .as_str()
                .map_or(false, |s| uuid::Uuid::parse_str(s).is_ok());
            if !valid {
                result
                    .errors
                    .push(format!("Field '{field_name}' expected a UUID string"));
            }
        }
        FieldKind::Timestamp => {
            let valid = value
                .as_str()
                .map_or(false, |s| chrono::DateTime::parse_from_rfc3339(s).is_ok());
            if !valid {
                result.errors.push(format!(
                    "Field '{field_name}' expected an RFC 3339 timestamp"
                ));
            }
        }
        FieldKind::Json | FieldKind::Custom(_) => {}
    }
}

fn check_bounds(field_name: &str, field: &Field, number: Option<f64>, result: &mut ValidationResult) {
    let Some(n) = number else { return };
    if let Some(min) = field.params().min {
        if n < min {
            result
                .errors
                .push(format!("Field '{field_name}' must be >= {min}"));
        }
    }
    if let Some(max) = field.params().max {
        if n > max {
            result
                .errors
                .push(format!("Field '{field_name}' must be <= {max}"));
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Validate a payload, logging warnings. Returns an error if any check failed.
pub fn ensure_valid(collection: &Collection, action: Action, data: &Record) -> Result<()> {
    let result = validate_payload(collection, action, data);
    for warning in &result.warnings {
        log::warn!("{warning}");
    }

    if !result.is_ok() {
        return Err(DeesseError::Validation(format!(
            "Payload validation failed:\n  - {}",
            result.errors.join("\n  - ")
        )));
    }
    Ok(())
}
