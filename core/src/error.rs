use serde::Serialize;
use serde_json::Value;

use crate::envelope::EnvelopeError;
use crate::shape::ValidationError;

/// Structured error body returned to agents inside a tool result.
/// Every error contains enough information for an agent to understand
/// what went wrong and whether retrying with different input can help.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (see [`codes`])
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
    /// Extra machine-readable context, e.g. the remote status and body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            field: None,
            docs_hint: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_docs_hint(mut self, docs_hint: impl Into<String>) -> Self {
        self.docs_hint = Some(docs_hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// A request argument failed its declared shape.
    pub fn request_validation(err: &ValidationError) -> Self {
        Self::new(codes::VALIDATION_FAILED, err.to_string())
            .with_field(err.path.clone())
            .with_details(serde_json::json!({ "constraint": err.constraint.code() }))
    }

    /// The remote API answered with a body that does not match the contract.
    pub fn response_shape(err: &EnvelopeError) -> Self {
        let code = match err {
            EnvelopeError::Envelope(_) => codes::ENVELOPE_SHAPE_MISMATCH,
            EnvelopeError::Payload(_) => codes::RESPONSE_SHAPE_MISMATCH,
        };
        let inner = err.validation();
        Self::new(code, err.to_string())
            .with_field(inner.path.clone())
            .with_details(serde_json::json!({ "constraint": inner.constraint.code() }))
            .with_docs_hint("The remote API response no longer matches the declared contract.")
    }
}

/// Error codes used across the tool surface
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const REMOTE_TRANSPORT_ERROR: &str = "remote_transport_error";
    pub const REMOTE_STATUS: &str = "remote_status";
    pub const REMOTE_DECODE_ERROR: &str = "remote_decode_error";
    pub const ENVELOPE_SHAPE_MISMATCH: &str = "envelope_shape_mismatch";
    pub const RESPONSE_SHAPE_MISMATCH: &str = "response_shape_mismatch";
    pub const INVALID_CONFIGURATION: &str = "invalid_configuration";
}
