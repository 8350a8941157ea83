use serde::Serialize;
use serde_json::{Map, Value};

use crate::field::Field;
use crate::shape::{FieldPath, ObjectReader, Shape, ValidationError};

/// A metric value with its change against the comparison period.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricWithDynamics {
    /// Value for the current period
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub current: Field<i64>,
    /// Change versus the comparison period, %
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub dynamics: Field<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Shape for MetricWithDynamics {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            current: reader.optional("current")?,
            dynamics: reader.optional("dynamics")?,
            extra: reader.rest(&["current", "dynamics"]),
        })
    }
}

/// A metric value with dynamics and its standing against competing cards.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricWithDynamicsAndPercentile {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub current: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub dynamics: Field<i64>,
    /// How far, in %, the value is above competitor cards for the same search text
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub percentile: Field<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Shape for MetricWithDynamicsAndPercentile {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            current: reader.optional("current")?,
            dynamics: reader.optional("dynamics")?,
            percentile: reader.optional("percentile")?,
            extra: reader.rest(&["current", "dynamics", "percentile"]),
        })
    }
}

/// Seller price range after the seller discount (club discounts excluded).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub min_price: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub max_price: Field<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Shape for PriceRange {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            min_price: reader.optional("minPrice")?,
            max_price: reader.optional("maxPrice")?,
            extra: reader.rest(&["minPrice", "maxPrice"]),
        })
    }
}
