use serde::Serialize;
use serde_json::{Value, json};
use wb_analytics_core::error::ErrorBody;
use wb_analytics_core::orders::{ProductOrdersRequest, SEARCH_TEXTS_COUNT};
use wb_analytics_core::period::{SortField, SortMode, TopOrderBy};
use wb_analytics_core::search_texts::{LIMIT_RANGE, NM_IDS_COUNT, ProductSearchTextsRequest};
use wb_analytics_core::shape::{ItemCount, Shape};

use crate::client::{AnalyticsClient, ClientError};

pub const SEARCH_TEXTS_TOOL: &str = "getProductSearchTexts";
pub const ORDERS_TOOL: &str = "getProductOrders";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    SearchTexts,
    Orders,
}

impl ToolKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            SEARCH_TEXTS_TOOL => Some(ToolKind::SearchTexts),
            ORDERS_TOOL => Some(ToolKind::Orders),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::SearchTexts => SEARCH_TEXTS_TOOL,
            ToolKind::Orders => ORDERS_TOOL,
        }
    }
}

#[derive(Debug)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: SEARCH_TEXTS_TOOL,
            description: "Builds the top search queries that lead buyers to the given product cards, with position, conversion and visibility metrics per query. \
                Query selection: limit (queries per product, at most 30) and topOrderBy (metric used to pick the top queries). \
                Periods are YYYY-MM-DD dates no earlier than 365 days ago; pastPeriod enables dynamics against a comparison period. \
                At most 3 requests per minute per seller account.",
            input_schema: search_texts_input_schema(),
        },
        ToolDefinition {
            name: ORDERS_TOOL,
            description: "Returns daily orders and average search position of one product card for the given search texts (1 to 30) over a period of at most 7 days. \
                Dates are YYYY-MM-DD, no earlier than 365 days ago. \
                At most 3 requests per minute per seller account.",
            input_schema: orders_input_schema(),
        },
    ]
}

fn period_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "start": {
                "type": "string",
                "description": "Period start date (YYYY-MM-DD). Not later than `end`, not earlier than 365 days ago."
            },
            "end": {
                "type": "string",
                "description": "Period end date (YYYY-MM-DD). Not earlier than 365 days ago."
            }
        },
        "required": ["start", "end"]
    })
}

fn with_item_count(mut schema: Value, count: ItemCount) -> Value {
    if let Some(min) = count.min {
        schema["minItems"] = json!(min);
    }
    if let Some(max) = count.max {
        schema["maxItems"] = json!(max);
    }
    schema
}

fn search_texts_input_schema() -> Value {
    let mut past_period = period_schema(
        "Comparison period. Its length must not exceed currentPeriod and it must end before currentPeriod starts.",
    );
    past_period["type"] = json!(["object", "null"]);

    json!({
        "type": "object",
        "properties": {
            "currentPeriod": period_schema("Current period"),
            "pastPeriod": past_period,
            "nmIds": with_item_count(
                json!({
                    "type": "array",
                    "items": { "type": "integer" },
                    "description": "WB article numbers (nmId)"
                }),
                NM_IDS_COUNT,
            ),
            "topOrderBy": {
                "type": "string",
                "enum": TopOrderBy::WIRE_NAMES,
                "description": "How the top search queries are selected:\n\
                    - openCard: card opens from search\n\
                    - addToCart: cart adds from search\n\
                    - openToCart: conversion to cart from search\n\
                    - orders: orders from search\n\
                    - cartToOrder: conversion to order from search"
            },
            "orderBy": {
                "type": "object",
                "description": "Sorting of the result table",
                "properties": {
                    "field": {
                        "type": "string",
                        "enum": SortField::WIRE_NAMES,
                        "description": "Sort field:\n\
                            - avgPosition: average position\n\
                            - openCard: card opens\n\
                            - addToCart: cart adds\n\
                            - openToCart: conversion to cart\n\
                            - orders: number of orders\n\
                            - cartToOrder: conversion to order\n\
                            - visibility: visibility in search"
                    },
                    "mode": {
                        "type": "string",
                        "enum": SortMode::WIRE_NAMES,
                        "description": "Sort order: asc or desc"
                    }
                },
                "required": ["field", "mode"]
            },
            "limit": {
                "type": "integer",
                "minimum": LIMIT_RANGE.min,
                "maximum": LIMIT_RANGE.max,
                "description": "Number of search queries per product"
            }
        },
        "required": ["currentPeriod", "nmIds", "topOrderBy", "orderBy", "limit"]
    })
}

fn orders_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "period": period_schema("Current period, at most 7 days"),
            "nmId": {
                "type": "integer",
                "description": "WB article number (nmId)"
            },
            "searchTexts": with_item_count(
                json!({
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Search queries"
                }),
                SEARCH_TEXTS_COUNT,
            )
        },
        "required": ["period", "nmId", "searchTexts"]
    })
}

/// Outcome of one tool invocation, in the host's content-block convention.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub is_error: bool,
    pub text: String,
}

impl ToolResult {
    pub fn success<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(text) => Self {
                is_error: false,
                text,
            },
            Err(e) => Self::error_text(format!("Failed to serialize response: {e}")),
        }
    }

    pub fn error_text(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            text: text.into(),
        }
    }

    pub fn error_body(body: &ErrorBody) -> Self {
        match serde_json::to_string_pretty(body) {
            Ok(text) => Self::error_text(text),
            Err(_) => Self::error_text(body.message.clone()),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error
        })
    }
}

/// Validates `args` against the tool's request shape and performs the call.
pub async fn invoke(
    kind: ToolKind,
    args: &Value,
    client: &AnalyticsClient,
    token: &str,
) -> ToolResult {
    match kind {
        ToolKind::SearchTexts => match ProductSearchTextsRequest::validate(args) {
            Ok(request) => finish(kind, client.product_search_texts(&request, token).await),
            Err(err) => reject(kind, &ErrorBody::request_validation(&err)),
        },
        ToolKind::Orders => match ProductOrdersRequest::validate(args) {
            Ok(request) => finish(kind, client.product_orders(&request, token).await),
            Err(err) => reject(kind, &ErrorBody::request_validation(&err)),
        },
    }
}

fn finish<T: Serialize>(kind: ToolKind, result: Result<T, ClientError>) -> ToolResult {
    match result {
        Ok(response) => ToolResult::success(&response),
        Err(err) => reject(kind, &err.to_error_body()),
    }
}

fn reject(kind: ToolKind, body: &ErrorBody) -> ToolResult {
    tracing::warn!(
        tool = kind.name(),
        error = %body.error,
        field = body.field.as_deref(),
        "tool call failed: {}",
        body.message
    );
    ToolResult::error_body(body)
}
