use std::time::Instant;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Value, json};
use url::Url;
use wb_analytics_core::envelope::{EnvelopeError, ResponseEnvelope};
use wb_analytics_core::error::{ErrorBody, codes};
use wb_analytics_core::orders::{ProductOrdersRequest, ProductOrdersResponse};
use wb_analytics_core::search_texts::{ProductSearchTextsRequest, ProductSearchTextsResponse};
use wb_analytics_core::shape::Shape;

pub const DEFAULT_API_URL: &str = "https://seller-analytics-api.wildberries.ru";
/// Endpoint paths, relative to the base URL so a path prefix in it is kept.
pub const SEARCH_TEXTS_PATH: &str = "api/v2/search-report/product/search-texts";
pub const ORDERS_PATH: &str = "api/v2/search-report/product/orders";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid API base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error("request to the analytics API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("analytics API returned HTTP {status}")]
    Status { status: u16, body: Value },
    #[error("analytics API returned a non-JSON body: {0}")]
    Decode(String),
    #[error(transparent)]
    Shape(#[from] EnvelopeError),
}

impl ClientError {
    pub fn to_error_body(&self) -> ErrorBody {
        match self {
            ClientError::BaseUrl(_) => ErrorBody::new(codes::INVALID_CONFIGURATION, self.to_string())
                .with_docs_hint("Check --api-url / WB_ANALYTICS_API_URL."),
            ClientError::Transport(_) => {
                ErrorBody::new(codes::REMOTE_TRANSPORT_ERROR, self.to_string())
            }
            ClientError::Status { status, body } => {
                ErrorBody::new(codes::REMOTE_STATUS, self.to_string())
                    .with_details(json!({ "status": status, "body": body }))
                    .with_docs_hint(status_hint(*status))
            }
            ClientError::Decode(_) => ErrorBody::new(codes::REMOTE_DECODE_ERROR, self.to_string()),
            ClientError::Shape(err) => ErrorBody::response_shape(err),
        }
    }
}

fn status_hint(status: u16) -> &'static str {
    match status {
        401 => "The access token was rejected. Check WB_ANALYTICS_OAUTH_TOKEN / --apiKey.",
        403 => "The access token lacks the analytics scope for this seller account.",
        429 => "Rate limit reached (3 requests per minute per seller account). Wait before retrying.",
        400 | 422 => "The remote API rejected the request parameters (check period bounds and nmIds).",
        _ => "The remote API returned an error status.",
    }
}

/// One-shot client for the seller analytics search-report endpoints.
///
/// Each call performs exactly one POST and validates the body against the
/// operation's response shape. Nothing is retried or cached.
#[derive(Clone, Debug)]
pub struct AnalyticsClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AnalyticsClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn product_search_texts(
        &self,
        request: &ProductSearchTextsRequest,
        token: &str,
    ) -> Result<ProductSearchTextsResponse, ClientError> {
        self.post(SEARCH_TEXTS_PATH, request, token).await
    }

    pub async fn product_orders(
        &self,
        request: &ProductOrdersRequest,
        token: &str,
    ) -> Result<ProductOrdersResponse, ClientError> {
        self.post(ORDERS_PATH, request, token).await
    }

    async fn post<B, P>(
        &self,
        path: &str,
        body: &B,
        token: &str,
    ) -> Result<ResponseEnvelope<P>, ClientError>
    where
        B: Serialize,
        P: Shape,
    {
        let url = self.base_url.join(path)?;
        let started = Instant::now();

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, token)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        tracing::debug!(
            endpoint = path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analytics API call completed"
        );

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: parse_response_body(&bytes),
            });
        }

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(ResponseEnvelope::parse(&value)?)
    }
}

fn parse_response_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).to_string()))
}
