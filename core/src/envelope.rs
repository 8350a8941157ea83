use serde::Serialize;
use serde_json::{Map, Value};

use crate::field::Field;
use crate::shape::{Constraint, FieldPath, ObjectReader, Shape, ValidationError};

/// The remote API's response wrapper around an operation payload.
///
/// The payload lives under `data`. Status metadata (`error`, `errorText`,
/// `additionalErrors`) is typed when present; any other envelope key is kept
/// in `extra` so the envelope re-serializes as received.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub error: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub error_text: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub additional_errors: Field<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// The wrapper itself is malformed or has no payload.
    #[error("response envelope: {0}")]
    Envelope(ValidationError),
    /// The wrapper is fine but the payload under `data` is not.
    #[error("response payload: {0}")]
    Payload(ValidationError),
}

impl EnvelopeError {
    pub fn validation(&self) -> &ValidationError {
        match self {
            EnvelopeError::Envelope(err) | EnvelopeError::Payload(err) => err,
        }
    }
}

impl<T: Shape> ResponseEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            error: Field::Absent,
            error_text: Field::Absent,
            additional_errors: Field::Absent,
            extra: Map::new(),
        }
    }

    /// Validates the envelope skeleton first, then the payload under `data`.
    pub fn parse(value: &Value) -> Result<Self, EnvelopeError> {
        let root = FieldPath::root();
        let reader = ObjectReader::new(value, &root).map_err(EnvelopeError::Envelope)?;

        let error = reader.optional("error").map_err(EnvelopeError::Envelope)?;
        let error_text = reader
            .optional("errorText")
            .map_err(EnvelopeError::Envelope)?;
        let additional_errors = reader
            .optional("additionalErrors")
            .map_err(EnvelopeError::Envelope)?;

        let data_path = reader.path("data");
        let raw_data = match value.get("data") {
            Some(Value::Null) | None => {
                return Err(EnvelopeError::Envelope(
                    data_path.violation(Constraint::Missing),
                ));
            }
            Some(raw) => raw,
        };
        let data = T::from_json(raw_data, &data_path).map_err(EnvelopeError::Payload)?;

        Ok(Self {
            data,
            error,
            error_text,
            additional_errors,
            extra: reader.rest(&["data", "error", "errorText", "additionalErrors"]),
        })
    }
}

impl<'de, T: Shape> serde::Deserialize<'de> for ResponseEnvelope<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Value as serde::Deserialize>::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
