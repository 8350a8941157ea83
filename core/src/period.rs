use serde::Serialize;
use serde_json::Value;

use crate::shape::{FieldPath, ObjectReader, Shape, ValidationError, string_enum};

/// Reporting period.
///
/// Dates are `YYYY-MM-DD` strings passed through to the remote API as-is.
/// `start` must not be later than `end` and neither may be more than 365 days
/// in the past; the remote API enforces both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: String,
    pub end: String,
}

/// Comparison period. Its span should not exceed the current period's span
/// and it should end before the current period starts.
pub type PastPeriod = Period;

impl Period {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

impl Shape for Period {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            start: reader.required("start")?,
            end: reader.required("end")?,
        })
    }
}

string_enum! {
    /// Column the search-text table is sorted by.
    pub enum SortField {
        AvgPosition => "avgPosition",
        OpenCard => "openCard",
        AddToCart => "addToCart",
        OpenToCart => "openToCart",
        Orders => "orders",
        CartToOrder => "cartToOrder",
        Visibility => "visibility",
    }
}

string_enum! {
    /// Metric used to pick the top search texts before sorting.
    pub enum TopOrderBy {
        OpenCard => "openCard",
        AddToCart => "addToCart",
        OpenToCart => "openToCart",
        Orders => "orders",
        CartToOrder => "cartToOrder",
    }
}

string_enum! {
    pub enum SortMode {
        Asc => "asc",
        Desc => "desc",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub field: SortField,
    pub mode: SortMode,
}

impl Shape for OrderBy {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            field: reader.required("field")?,
            mode: reader.required("mode")?,
        })
    }
}
