use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::schema::types::{FieldDefinition, FieldType};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Validate a candidate record against a table's field definitions.
///
/// Pure function: walks the active definitions in the order given
/// (callers pass [`SchemaStore::list_fields`] output, which is already
/// `field_order`-sorted) and accumulates one message per violated
/// check. The record is valid iff the returned list is empty.
///
/// Per field: a required-but-empty value short-circuits that field with
/// a single "is required" message; an empty optional value skips all
/// checks; otherwise the type-specific check runs, then the `pattern`
/// rule applies regardless of type.
///
/// [`SchemaStore::list_fields`]: crate::schema::SchemaStore::list_fields
pub fn validate(fields: &[FieldDefinition], record: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();

    for field in fields.iter().filter(|f| f.is_active) {
        let value = match record.get(&field.field_name) {
            Some(v) if !is_empty(v) => v,
            _ => {
                if field.is_required {
                    errors.push(format!("{} is required", field.field_label));
                }
                continue;
            }
        };

        match field.field_type {
            FieldType::Email => {
                let ok = value.as_str().map_or(false, |s| EMAIL_RE.is_match(s));
                if !ok {
                    errors.push(format!(
                        "{} must be a valid email address",
                        field.field_label
                    ));
                }
            }
            FieldType::Url => {
                let ok = value
                    .as_str()
                    .map_or(false, |s| url::Url::parse(s).is_ok());
                if !ok {
                    errors.push(format!("{} must be a valid URL", field.field_label));
                }
            }
            FieldType::Number => match numeric_value(value) {
                Some(n) => check_bounds(field, n, &mut errors),
                None => errors.push(format!("{} must be a number", field.field_label)),
            },
            FieldType::Boolean => {
                let ok = match value {
                    Value::Bool(_) => true,
                    Value::String(s) => s == "true" || s == "false",
                    _ => false,
                };
                if !ok {
                    errors.push(format!("{} must be a boolean", field.field_label));
                }
            }
            // No intrinsic format check beyond presence.
            FieldType::String
            | FieldType::Text
            | FieldType::Date
            | FieldType::Select
            | FieldType::Multiselect
            | FieldType::File
            | FieldType::Files
            | FieldType::Json => {}
        }

        if let Some(pattern) = field
            .validation_rules
            .as_ref()
            .and_then(|r| r.pattern.as_deref())
        {
            match Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(&text_of(value)) {
                        errors.push(format!("{} format is invalid", field.field_label));
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Skipping uncompilable pattern on field '{}': {}",
                        field.field_name,
                        e
                    );
                }
            }
        }
    }

    errors
}

/// Missing, null, blank-string and empty-array values all count as
/// absent for the required check.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Numbers are accepted as JSON numbers or numeric strings.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn check_bounds(field: &FieldDefinition, n: f64, errors: &mut Vec<String>) {
    let rules = match &field.validation_rules {
        Some(rules) => rules,
        None => return,
    };
    if let Some(min) = rules.min {
        if n < min {
            errors.push(format!("{} must be at least {}", field.field_label, min));
        }
    }
    if let Some(max) = rules.max {
        if n > max {
            errors.push(format!("{} must be at most {}", field.field_label, max));
        }
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
