//! Request input validation against the function schemas in the capability card

use crate::error::SoxError;
use serde_json::Value;

pub type Result<T> = std::result::Result<T, SoxError>;

/// Validate input against a JSON schema
pub fn validate_input(input: &Value, schema: &Value) -> Result<()> {
    if !input.is_object() {
        return Err(SoxError::InvalidParameter(
            "Request input must be a JSON object".to_string(),
        ));
    }

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for field_name in required {
            let field_str = field_name.as_str().ok_or_else(|| {
                SoxError::InvalidParameter("Invalid schema: required field not a string".to_string())
            })?;

            if input.get(field_str).map_or(true, Value::is_null) {
                return Err(SoxError::InvalidParameter(format!(
                    "Missing required field: {}",
                    field_str
                )));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
        if let Some(input_obj) = input.as_object() {
            for (key, value) in input_obj {
                if let Some(prop_schema) = properties.get(key) {
                    validate_type(key, value, prop_schema)?;
                }
            }
        }
    }

    Ok(())
}

/// Validate that a value matches the expected type
fn validate_type(key: &str, value: &Value, schema: &Value) -> Result<()> {
    if let Some(expected_type) = schema.get("type").and_then(|t| t.as_str()) {
        let valid = match expected_type {
            "string" => value.is_string(),
            "integer" => value.is_u64() || value.is_i64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            "null" => value.is_null(),
            _ => true,
        };

        if !valid {
            return Err(SoxError::InvalidParameter(format!(
                "Type mismatch for {}: expected {}, got {}",
                key, expected_type, value
            )));
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(|e| e.as_array()) {
        if !allowed.contains(value) {
            return Err(SoxError::InvalidParameter(format!(
                "Invalid value for {}: {} (expected one of {})",
                key,
                value,
                Value::Array(allowed.clone())
            )));
        }
    }

    Ok(())
}
