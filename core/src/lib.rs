//! Typed request/response contracts for the WB seller analytics API.

pub mod envelope;
pub mod error;
pub mod field;
pub mod metrics;
pub mod orders;
pub mod period;
pub mod search_texts;
pub mod shape;

pub use envelope::{EnvelopeError, ResponseEnvelope};
pub use field::Field;
pub use shape::{Constraint, FieldPath, Shape, ValidationError};
