//! Daily order and position statistics of one product for a set of search
//! texts.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::envelope::ResponseEnvelope;
use crate::field::Field;
use crate::period::Period;
use crate::shape::{
    FieldPath, ItemCount, ObjectReader, Shape, ValidationError, deserialize_via_shape,
};

/// Number of search texts per request.
pub const SEARCH_TEXTS_COUNT: ItemCount = ItemCount::between(1, 30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOrdersRequest {
    /// Current period, at most 7 days
    pub period: Period,
    /// WB article number
    pub nm_id: i64,
    pub search_texts: Vec<String>,
}

impl Shape for ProductOrdersRequest {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        let period = reader.required("period")?;
        let nm_id = reader.required("nmId")?;

        let search_texts: Vec<String> = reader.required("searchTexts")?;
        SEARCH_TEXTS_COUNT.check(search_texts.len(), &reader.path("searchTexts"))?;

        Ok(Self {
            period,
            nm_id,
            search_texts,
        })
    }
}

/// Statistics for one day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersMetric {
    /// Date the statistics were collected for
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub dt: Field<String>,
    /// Average position of the product in search results
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub avg_position: Field<i64>,
    /// Orders placed from search
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub orders: Field<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Shape for OrdersMetric {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            dt: reader.optional("dt")?,
            avg_position: reader.optional("avgPosition")?,
            orders: reader.optional("orders")?,
            extra: reader.rest(&["dt", "avgPosition", "orders"]),
        })
    }
}

/// Per-day statistics for one search text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersTextItem {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub text: Field<String>,
    /// Number of searches with this text
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub frequency: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub date_items: Field<Vec<OrdersMetric>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Shape for OrdersTextItem {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            text: reader.optional("text")?,
            frequency: reader.optional("frequency")?,
            date_items: reader.optional("dateItems")?,
            extra: reader.rest(&["text", "frequency", "dateItems"]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct OrdersPayload {
    /// Totals per day across all requested search texts
    pub total: Vec<OrdersMetric>,
    pub items: Vec<OrdersTextItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Shape for OrdersPayload {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            total: reader.required("total")?,
            items: reader.required("items")?,
            extra: reader.rest(&["total", "items"]),
        })
    }
}

pub type ProductOrdersResponse = ResponseEnvelope<OrdersPayload>;

deserialize_via_shape!(ProductOrdersRequest, OrdersMetric, OrdersTextItem, OrdersPayload);
