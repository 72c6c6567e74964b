//! Field readers for event payloads
//!
//! Small helpers that pull typed values out of a JSON object and report the
//! offending field when the value is missing or of the wrong type.

use serde_json::{Map, Value};

use super::error::{ValidationError, ValidationResult};

/// Read a required integer field
pub fn require_i64(fields: &Map<String, Value>, field: &str) -> ValidationResult<i64> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(ValidationError::missing(field)),
        Some(value) => as_integer(value).ok_or_else(|| ValidationError::wrong_type(field, "an integer")),
    }
}

/// Read a required field verbatim
pub fn require_value<'a>(fields: &'a Map<String, Value>, field: &str) -> ValidationResult<&'a Value> {
    fields.get(field).ok_or_else(|| ValidationError::missing(field))
}

/// Interpret a JSON number as an integer, accepting floats with no fraction.
///
/// Floats outside the `i64` range are rejected rather than saturated.
pub fn as_integer(value: &Value) -> Option<i64> {
    // 2^63, exactly representable
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(f))
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

/// Numeric value of a field, if it holds a number
pub fn number_field(fields: &Map<String, Value>, field: &str) -> Option<f64> {
    fields.get(field).and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationErrorKind;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_require_i64() {
        let payload = fields(json!({"current_tab": 3, "float_tab": 2.0, "text": "3", "empty": null}));

        assert_eq!(require_i64(&payload, "current_tab").unwrap(), 3);
        assert_eq!(require_i64(&payload, "float_tab").unwrap(), 2);

        let err = require_i64(&payload, "text").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidType { expected: "an integer" });

        let err = require_i64(&payload, "missing").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::RequiredField);
        assert_eq!(err.field, "missing");

        assert!(require_i64(&payload, "empty").is_err());
    }

    #[test]
    fn test_as_integer_rejects_fractions() {
        assert_eq!(as_integer(&json!(2.5)), None);
        assert_eq!(as_integer(&json!(-30)), Some(-30));
    }

    #[test]
    fn test_as_integer_rejects_out_of_range_floats() {
        assert_eq!(as_integer(&json!(1e300)), None);
        assert_eq!(as_integer(&json!(-1e300)), None);
        assert_eq!(as_integer(&json!(9_223_372_036_854_775_808.0)), None);
        assert_eq!(as_integer(&json!(-9_223_372_036_854_775_808.0)), Some(i64::MIN));
        assert_eq!(as_integer(&json!(u64::MAX)), None);
        assert_eq!(as_integer(&json!(i64::MAX)), Some(i64::MAX));

        let payload = fields(json!({"current_tab": -1e300}));
        let err = require_i64(&payload, "current_tab").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidType { expected: "an integer" });
    }

    #[test]
    fn test_number_field() {
        let payload = fields(json!({"requested_skip_interval": -30, "type": "onSkipSeek"}));
        assert_eq!(number_field(&payload, "requested_skip_interval"), Some(-30.0));
        assert_eq!(number_field(&payload, "type"), None);
    }
}
