//! Validation helpers for DTOs.

use serde_json::{Number, Value};
use validator::ValidationError;

/// Validates that a player name is not blank.
///
/// Overlong names are not an error; they are capped when persisted.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name_required");
        err.message = Some("name must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a pair or second count: anything that reads as a finite number.
pub fn validate_count(value: &Value) -> Result<(), ValidationError> {
    if number_of(value).is_some() {
        return Ok(());
    }

    let mut err = ValidationError::new("count_format");
    err.message = Some(format!("expected a finite number, got {value}").into());
    Err(err)
}

/// Finite number read from `value`.
///
/// `null`, booleans and blank strings count as numbers the same way a loosely typed client
/// would coerce them; numeric strings are parsed after trimming.
pub fn number_of(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Null => Some(0.0),
        Value::Bool(flag) => Some(f64::from(u8::from(*flag))),
        Value::Number(number) => number.as_f64(),
        Value::String(text) if text.trim().is_empty() => Some(0.0),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Array(_) | Value::Object(_) => None,
    };
    number.filter(|number| number.is_finite())
}

/// JSON number for `value`, written as an integer when it is whole.
pub fn json_number(value: f64) -> Number {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        return Number::from(value as i64);
    }
    Number::from_f64(value).unwrap_or_else(|| Number::from(0))
}
