//! Search-text ranking report: the top search queries that lead buyers to a
//! product card, with position and conversion metrics per query.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::envelope::ResponseEnvelope;
use crate::field::Field;
use crate::metrics::{MetricWithDynamics, MetricWithDynamicsAndPercentile, PriceRange};
use crate::period::{OrderBy, PastPeriod, Period, TopOrderBy};
use crate::shape::{
    FieldPath, IntRange, ItemCount, ObjectReader, Shape, ValidationError, deserialize_via_shape,
};

/// Number of search texts returned per product.
pub const LIMIT_RANGE: IntRange = IntRange::new(1, 30);
/// Number of product cards per request.
pub const NM_IDS_COUNT: ItemCount = ItemCount::at_most(50);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearchTextsRequest {
    /// Current period
    pub current_period: Period,
    /// Comparison period; its length must not exceed `current_period`
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub past_period: Field<PastPeriod>,
    /// WB article numbers
    pub nm_ids: Vec<i64>,
    /// How the top search texts are selected
    pub top_order_by: TopOrderBy,
    /// Sorting of the resulting table
    pub order_by: OrderBy,
    /// Search texts per product
    pub limit: i64,
}

impl Shape for ProductSearchTextsRequest {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        let current_period = reader.required("currentPeriod")?;
        let past_period = reader.optional("pastPeriod")?;

        let nm_ids: Vec<i64> = reader.required("nmIds")?;
        NM_IDS_COUNT.check(nm_ids.len(), &reader.path("nmIds"))?;

        let top_order_by = reader.required("topOrderBy")?;
        let order_by = reader.required("orderBy")?;

        let limit: i64 = reader.required("limit")?;
        LIMIT_RANGE.check(limit, &reader.path("limit"))?;

        Ok(Self {
            current_period,
            past_period,
            nm_ids,
            top_order_by,
            order_by,
            limit,
        })
    }
}

/// One row of the search-text table: a search query for one product card.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTextItem {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub text: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub nm_id: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub subject_name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub brand_name: Field<String>,
    /// Seller's own article
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub vendor_code: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_card_rated: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub rating: Field<f64>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub feedback_rating: Field<f64>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub price: Field<PriceRange>,
    /// Number of searches with this text
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub frequency: Field<MetricWithDynamics>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub week_frequency: Field<i64>,
    /// Median position over impressions that led to a card open or cart add
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub median_position: Field<MetricWithDynamics>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub avg_position: Field<MetricWithDynamics>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub open_card: Field<MetricWithDynamicsAndPercentile>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub add_to_cart: Field<MetricWithDynamicsAndPercentile>,
    /// Cart adds per card open from search
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub open_to_cart: Field<MetricWithDynamicsAndPercentile>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub orders: Field<MetricWithDynamicsAndPercentile>,
    /// Orders per cart add from search
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub cart_to_order: Field<MetricWithDynamicsAndPercentile>,
    /// Share of search results the card was visible in, %
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub visibility: Field<MetricWithDynamics>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const SEARCH_TEXT_ITEM_KEYS: [&str; 20] = [
    "text",
    "nmId",
    "subjectName",
    "brandName",
    "vendorCode",
    "name",
    "isCardRated",
    "rating",
    "feedbackRating",
    "price",
    "frequency",
    "weekFrequency",
    "medianPosition",
    "avgPosition",
    "openCard",
    "addToCart",
    "openToCart",
    "orders",
    "cartToOrder",
    "visibility",
];

impl Shape for SearchTextItem {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            text: reader.optional("text")?,
            nm_id: reader.optional("nmId")?,
            subject_name: reader.optional("subjectName")?,
            brand_name: reader.optional("brandName")?,
            vendor_code: reader.optional("vendorCode")?,
            name: reader.optional("name")?,
            is_card_rated: reader.optional("isCardRated")?,
            rating: reader.optional("rating")?,
            feedback_rating: reader.optional("feedbackRating")?,
            price: reader.optional("price")?,
            frequency: reader.optional("frequency")?,
            week_frequency: reader.optional("weekFrequency")?,
            median_position: reader.optional("medianPosition")?,
            avg_position: reader.optional("avgPosition")?,
            open_card: reader.optional("openCard")?,
            add_to_cart: reader.optional("addToCart")?,
            open_to_cart: reader.optional("openToCart")?,
            orders: reader.optional("orders")?,
            cart_to_order: reader.optional("cartToOrder")?,
            visibility: reader.optional("visibility")?,
            extra: reader.rest(&SEARCH_TEXT_ITEM_KEYS),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SearchTextsPayload {
    pub items: Vec<SearchTextItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Shape for SearchTextsPayload {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            items: reader.required("items")?,
            extra: reader.rest(&["items"]),
        })
    }
}

pub type ProductSearchTextsResponse = ResponseEnvelope<SearchTextsPayload>;

deserialize_via_shape!(ProductSearchTextsRequest, SearchTextItem, SearchTextsPayload);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{SortField, SortMode};
    use crate::shape::Constraint;
    use serde_json::json;

    fn scenario_request() -> Value {
        json!({
            "currentPeriod": { "start": "2024-10-01", "end": "2024-10-07" },
            "nmIds": [162579635],
            "topOrderBy": "openToCart",
            "orderBy": { "field": "avgPosition", "mode": "asc" },
            "limit": 10
        })
    }

    #[test]
    fn valid_request_is_accepted_unchanged() {
        let raw = scenario_request();
        let request = ProductSearchTextsRequest::validate(&raw).unwrap();

        assert_eq!(request.past_period, Field::Absent);
        assert_eq!(request.top_order_by, TopOrderBy::OpenToCart);
        assert_eq!(request.order_by.field, SortField::AvgPosition);
        assert_eq!(request.order_by.mode, SortMode::Asc);
        assert_eq!(serde_json::to_value(&request).unwrap(), raw);
    }

    #[test]
    fn past_period_keeps_null_and_value() {
        let mut raw = scenario_request();
        raw["pastPeriod"] = Value::Null;
        let request = ProductSearchTextsRequest::validate(&raw).unwrap();
        assert_eq!(request.past_period, Field::Null);
        assert_eq!(serde_json::to_value(&request).unwrap(), raw);

        raw["pastPeriod"] = json!({ "start": "2024-09-24", "end": "2024-09-30" });
        let request = ProductSearchTextsRequest::validate(&raw).unwrap();
        assert_eq!(
            request.past_period.as_option(),
            Some(&Period::new("2024-09-24", "2024-09-30"))
        );
    }

    #[test]
    fn limit_outside_bounds_is_rejected() {
        for limit in [0, 31, -1] {
            let mut raw = scenario_request();
            raw["limit"] = json!(limit);
            let err = ProductSearchTextsRequest::validate(&raw).unwrap_err();
            assert_eq!(err.path, "limit");
            assert_eq!(
                err.constraint,
                Constraint::OutOfRange {
                    min: 1,
                    max: 30,
                    received: limit
                }
            );
        }
    }

    #[test]
    fn more_than_fifty_nm_ids_are_rejected() {
        let mut raw = scenario_request();
        raw["nmIds"] = json!((0..51).collect::<Vec<i64>>());
        let err = ProductSearchTextsRequest::validate(&raw).unwrap_err();
        assert_eq!(err.path, "nmIds");
        assert_eq!(
            err.constraint,
            Constraint::TooManyItems {
                max: 50,
                received: 51
            }
        );

        raw["nmIds"] = json!((0..50).collect::<Vec<i64>>());
        assert!(ProductSearchTextsRequest::validate(&raw).is_ok());
    }

    #[test]
    fn non_numeric_nm_id_is_rejected() {
        let mut raw = scenario_request();
        raw["nmIds"] = json!([162579635, "abc"]);
        let err = ProductSearchTextsRequest::validate(&raw).unwrap_err();
        assert_eq!(err.path, "nmIds[1]");
        assert_eq!(err.constraint.code(), "invalid_type");
    }

    #[test]
    fn unknown_request_fields_are_dropped() {
        let mut raw = scenario_request();
        raw["debug"] = json!(true);
        let request = ProductSearchTextsRequest::validate(&raw).unwrap();
        let serialized = serde_json::to_value(&request).unwrap();
        assert!(serialized.get("debug").is_none());
    }

    #[test]
    fn search_text_item_keeps_unknown_fields() {
        let raw = json!({
            "text": "костюм мужской",
            "nmId": 162579635,
            "subjectName": "Костюмы",
            "brandName": "Brand",
            "vendorCode": "A-1",
            "name": "Костюм",
            "isCardRated": true,
            "rating": 4.7,
            "feedbackRating": 4.9,
            "price": { "minPrice": 2500, "maxPrice": 3100 },
            "frequency": { "current": 1200, "dynamics": 15 },
            "weekFrequency": 8400,
            "medianPosition": { "current": 12, "dynamics": -3 },
            "avgPosition": { "current": 14, "dynamics": null },
            "openCard": { "current": 300, "dynamics": 4, "percentile": 70 },
            "addToCart": { "current": 40, "dynamics": 2, "percentile": 55, "median": 31 },
            "openToCart": null,
            "visibility": { "current": 87, "dynamics": 1 },
            "isAdvertised": false
        });
        let item = SearchTextItem::validate(&raw).unwrap();

        assert_eq!(item.nm_id.as_option(), Some(&162579635));
        assert!(item.open_to_cart.is_null());
        assert!(item.orders.is_absent());
        assert_eq!(item.extra.get("isAdvertised"), Some(&json!(false)));
        let add_to_cart = item.add_to_cart.as_option().unwrap();
        assert_eq!(add_to_cart.extra.get("median"), Some(&json!(31)));
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn payload_requires_items() {
        let err = SearchTextsPayload::validate(&json!({})).unwrap_err();
        assert_eq!(err.path, "items");
        assert_eq!(err.constraint, Constraint::Missing);

        let payload: SearchTextsPayload = serde_json::from_value(json!({ "items": [] })).unwrap();
        assert!(payload.items.is_empty());
    }
}
