use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::IntoResponse;
use axum::routing::post;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use wb_analytics_mcp_runtime::client::{ORDERS_PATH, SEARCH_TEXTS_PATH};
use wb_analytics_mcp_runtime::token::TokenSource;
use wb_analytics_mcp_runtime::tools::{ToolKind, ToolResult};
use wb_analytics_mcp_runtime::{McpRuntimeConfig, McpServer};

#[derive(Clone, Debug)]
struct RecordedRequest {
    path: String,
    authorization: Option<String>,
    body: Value,
}

/// Path prefix the stub mounts the endpoints under, as a gateway would.
const PREFIX: &str = "/wb";

fn stub_path(endpoint: &str) -> String {
    format!("{PREFIX}/{endpoint}")
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: String,
    delay: Duration,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

struct AnalyticsStub {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl AnalyticsStub {
    async fn spawn(status: StatusCode, body: impl Into<String>) -> Self {
        Self::spawn_with_delay(status, body, Duration::ZERO).await
    }

    async fn spawn_with_delay(status: StatusCode, body: impl Into<String>, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("stub should bind");
        let addr = listener.local_addr().expect("stub addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            status,
            body: body.into(),
            delay,
            requests: Arc::clone(&requests),
        };
        let app = Router::new()
            .route(&stub_path(SEARCH_TEXTS_PATH), post(handle))
            .route(&stub_path(ORDERS_PATH), post(handle))
            .with_state(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}{PREFIX}"),
            requests,
        }
    }

    async fn json(status: StatusCode, body: Value) -> Self {
        Self::spawn(status, body.to_string()).await
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn server(&self, token: Option<&str>) -> McpServer {
        McpServer::new(McpRuntimeConfig {
            api_url: self.base_url.clone(),
            tokens: TokenSource::fixed(token.map(str::to_string)),
        })
        .expect("server should build")
    }
}

async fn handle(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let recorded = RecordedRequest {
        path: uri.path().to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    state.requests.lock().unwrap().push(recorded);
    tokio::time::sleep(state.delay).await;
    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body.clone(),
    )
}

fn search_texts_args() -> Value {
    json!({
        "currentPeriod": { "start": "2024-10-01", "end": "2024-10-07" },
        "nmIds": [162579635, 166901972],
        "topOrderBy": "openToCart",
        "orderBy": { "field": "avgPosition", "mode": "asc" },
        "limit": 20
    })
}

fn orders_args() -> Value {
    json!({
        "period": { "start": "2024-10-01", "end": "2024-10-07" },
        "nmId": 211131895,
        "searchTexts": ["костюм", "пиджак"]
    })
}

fn result_json(result: &ToolResult) -> Value {
    serde_json::from_str(&result.text).expect("tool text should be JSON")
}

#[tokio::test]
async fn search_texts_success_keeps_unknown_fields() {
    let remote = json!({
        "data": {
            "items": [{
                "text": "костюм",
                "nmId": 162579635,
                "price": { "minPrice": 1500, "maxPrice": 2100 },
                "frequency": { "current": 120, "dynamics": 15, "trend": "up" },
                "openCard": { "current": 40, "dynamics": -3, "percentile": 71 },
                "isCardRated": true,
                "rating": 4.8,
                "newMetric": { "current": 1 }
            }],
            "cursor": "next"
        },
        "error": false,
        "errorText": "",
        "additionalErrors": null
    });
    let stub = AnalyticsStub::json(StatusCode::OK, remote.clone()).await;
    let server = stub.server(Some("test-token"));

    let result = server
        .call_tool(ToolKind::SearchTexts, &search_texts_args())
        .await;

    assert!(!result.is_error, "unexpected error: {}", result.text);
    assert_eq!(result_json(&result), remote);
}

#[tokio::test]
async fn sends_raw_token_and_validated_body() {
    let stub = AnalyticsStub::json(StatusCode::OK, json!({ "data": { "items": [] } })).await;
    let server = stub.server(Some("eyJhbGciOi.token"));

    let mut args = search_texts_args();
    args["unknownOption"] = json!(true);
    let result = server.call_tool(ToolKind::SearchTexts, &args).await;
    assert!(!result.is_error, "unexpected error: {}", result.text);

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.path, stub_path(SEARCH_TEXTS_PATH));
    assert_eq!(request.authorization.as_deref(), Some("eyJhbGciOi.token"));
    assert_eq!(request.body, search_texts_args());
}

#[tokio::test]
async fn explicit_null_past_period_is_forwarded() {
    let stub = AnalyticsStub::json(StatusCode::OK, json!({ "data": { "items": [] } })).await;
    let server = stub.server(Some("token"));

    let mut args = search_texts_args();
    args["pastPeriod"] = Value::Null;
    let result = server.call_tool(ToolKind::SearchTexts, &args).await;
    assert!(!result.is_error, "unexpected error: {}", result.text);

    let body = &stub.requests()[0].body;
    assert_eq!(body.get("pastPeriod"), Some(&Value::Null));
}

#[tokio::test]
async fn missing_token_sends_nothing() {
    let stub = AnalyticsStub::json(StatusCode::OK, json!({ "data": { "items": [] } })).await;
    let server = stub.server(None);

    let result = server
        .call_tool(ToolKind::SearchTexts, &search_texts_args())
        .await;

    assert!(result.is_error);
    assert!(result.text.starts_with("API key is required"));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn invalid_arguments_send_nothing() {
    let stub = AnalyticsStub::json(StatusCode::OK, json!({ "data": { "items": [] } })).await;
    let server = stub.server(Some("token"));

    let mut args = orders_args();
    args["searchTexts"] = json!([]);
    let result = server.call_tool(ToolKind::Orders, &args).await;

    assert!(result.is_error);
    let body = result_json(&result);
    assert_eq!(body["error"], json!("validation_failed"));
    assert_eq!(body["field"], json!("searchTexts"));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn non_success_status_is_reported_with_body() {
    let stub = AnalyticsStub::json(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "title": "too many requests", "status": 429 }),
    )
    .await;
    let server = stub.server(Some("token"));

    let result = server.call_tool(ToolKind::Orders, &orders_args()).await;

    assert!(result.is_error);
    let body = result_json(&result);
    assert_eq!(body["error"], json!("remote_status"));
    assert_eq!(body["details"]["status"], json!(429));
    assert_eq!(body["details"]["body"]["title"], json!("too many requests"));
}

#[tokio::test]
async fn non_json_success_body_is_a_decode_error() {
    let stub = AnalyticsStub::spawn(StatusCode::OK, "<html>maintenance</html>").await;
    let server = stub.server(Some("token"));

    let result = server.call_tool(ToolKind::Orders, &orders_args()).await;

    assert!(result.is_error);
    assert_eq!(result_json(&result)["error"], json!("remote_decode_error"));
}

#[tokio::test]
async fn payload_drift_is_a_response_shape_mismatch() {
    let stub = AnalyticsStub::json(
        StatusCode::OK,
        json!({ "data": { "items": [{ "text": "костюм", "nmId": "not-a-number" }] } }),
    )
    .await;
    let server = stub.server(Some("token"));

    let result = server
        .call_tool(ToolKind::SearchTexts, &search_texts_args())
        .await;

    assert!(result.is_error);
    let body = result_json(&result);
    assert_eq!(body["error"], json!("response_shape_mismatch"));
    assert_eq!(body["field"], json!("data.items[0].nmId"));
}

#[tokio::test]
async fn missing_data_is_an_envelope_shape_mismatch() {
    let stub = AnalyticsStub::json(
        StatusCode::OK,
        json!({ "error": true, "errorText": "internal error" }),
    )
    .await;
    let server = stub.server(Some("token"));

    let result = server.call_tool(ToolKind::Orders, &orders_args()).await;

    assert!(result.is_error);
    let body = result_json(&result);
    assert_eq!(body["error"], json!("envelope_shape_mismatch"));
    assert_eq!(body["field"], json!("data"));
}

#[tokio::test]
async fn orders_scenario_round_trips_totals_and_texts() {
    let remote = json!({
        "data": {
            "total": [
                { "dt": "2024-10-01", "avgPosition": 12, "orders": 4 },
                { "dt": "2024-10-02", "avgPosition": 10, "orders": 6 }
            ],
            "items": [
                {
                    "text": "костюм",
                    "frequency": 800,
                    "dateItems": [{ "dt": "2024-10-01", "avgPosition": 9, "orders": 3 }]
                },
                { "text": "пиджак", "frequency": 150, "dateItems": null }
            ]
        }
    });
    let stub = AnalyticsStub::json(StatusCode::OK, remote.clone()).await;
    let server = stub.server(Some("token"));

    let result = server.call_tool(ToolKind::Orders, &orders_args()).await;

    assert!(!result.is_error, "unexpected error: {}", result.text);
    let body = result_json(&result);
    assert_eq!(body, remote);
    assert_eq!(body["data"]["items"][1]["text"], json!("пиджак"));

    let requests = stub.requests();
    assert_eq!(requests[0].path, stub_path(ORDERS_PATH));
    assert_eq!(requests[0].body, orders_args());
}

#[tokio::test]
async fn slow_tool_call_does_not_block_later_requests() {
    let delay = Duration::from_secs(2);
    let stub = AnalyticsStub::spawn_with_delay(
        StatusCode::OK,
        json!({ "data": { "total": [], "items": [] } }).to_string(),
        delay,
    )
    .await;
    let server = Arc::new(stub.server(Some("token")));

    let (mut client_in, server_in) = tokio::io::duplex(64 * 1024);
    let (mut server_out, client_out) = tokio::io::duplex(64 * 1024);
    let serving = tokio::spawn(async move {
        let mut reader = BufReader::new(server_in);
        server.serve(&mut reader, &mut server_out).await
    });

    let call = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": { "name": "getProductOrders", "arguments": orders_args() }
    });
    let ping = json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" });
    let started = Instant::now();
    client_in
        .write_all(format!("{call}\n{ping}\n").as_bytes())
        .await
        .unwrap();

    let mut lines = BufReader::new(client_out).lines();
    let first = tokio::time::timeout(Duration::from_secs(1), lines.next_line())
        .await
        .expect("ping should be answered while the tool call is pending")
        .unwrap()
        .unwrap();
    let first: Value = serde_json::from_str(&first).unwrap();
    assert_eq!(first["id"], json!(2));
    assert_eq!(first["result"], json!({}));
    assert!(started.elapsed() < delay);

    let second: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(second["id"], json!(1));
    assert_eq!(second["result"]["isError"], json!(false));

    drop(client_in);
    serving.await.unwrap().unwrap();
}
