use axum::body::Bytes;
use serde::{
    Deserialize, Deserializer,
    de::{DeserializeOwned, Error},
};
use serde_json::Value;

use crate::error::AppError;

/// Decodes a request body, falling back to defaults unless the body is a JSON
/// object with a field of the wrong shape.
pub fn get_payload<T>(body: &Bytes) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    let value = match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => return Ok(T::default()),
    };

    serde_json::from_value(value).map_err(|e| AppError::MalformedPayload(e.to_string()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntLike {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// Accepts integers, floats (truncated), booleans (as 1 or 0) and numeric strings.
pub fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match IntLike::deserialize(deserializer)? {
        IntLike::Int(number) => Ok(number),
        // `as` saturates out of range floats
        IntLike::Float(number) if number.is_finite() => Ok(number.trunc() as i64),
        IntLike::Float(number) => Err(D::Error::custom(format!("invalid integer {number}"))),
        IntLike::Bool(flag) => Ok(i64::from(flag)),
        IntLike::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid integer {text:?}"))),
    }
}
