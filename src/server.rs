// 🌐 REST API with Axum
//
// Routes under /api/v1/currency wrap the query layer without changing its
// contract. CORS, security headers and request tracing are tower layers.

use crate::config::ServerConfig;
use crate::dataset::{CurrencyProvider, CurrencyRecord};
use crate::query::{CurrencyQuery, QueryError, RecordList, SortParams};
use axum::{
    extract::{rejection::QueryRejection, OriginalUri, Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

pub const API_PREFIX: &str = "/api/v1/currency";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    query: Arc<CurrencyQuery<Arc<dyn CurrencyProvider>>>,
}

impl AppState {
    pub fn new<P: CurrencyProvider + 'static>(provider: P) -> Self {
        let provider: Arc<dyn CurrencyProvider> = Arc::new(provider);
        Self {
            query: Arc::new(CurrencyQuery::new(provider)),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Envelope for record lists
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    success: bool,
    data: Vec<CurrencyRecord>,
    count: usize,
    sort_by: Option<String>,
    order: Option<String>,
}

impl ListResponse {
    /// `sortBy`/`order` report the applied sort in canonical spelling. When no
    /// sort ran they echo whatever non-empty values the caller sent.
    fn new(list: RecordList, params: &SortParams) -> Self {
        let (sort_by, order) = match list.sort {
            Some(spec) => (
                Some(spec.key.to_string()),
                Some(spec.order.to_string()),
            ),
            None => {
                let (sort_by, order) = params.parts();
                (sort_by.map(str::to_string), order.map(str::to_string))
            }
        };

        Self {
            success: true,
            count: list.count(),
            sort_by,
            order,
            data: list.records,
        }
    }
}

/// Envelope for the distinct-codes list
#[derive(Debug, Serialize)]
pub struct CodesResponse {
    success: bool,
    data: Vec<String>,
    count: usize,
}

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    success: bool,
    data: CurrencyRecord,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    message: String,
}

// ============================================================================
// Errors
// ============================================================================

/// HTTP-facing error. Client faults carry their detail, server faults don't.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Invalid(QueryError),

    #[error("{0}")]
    NotFound(QueryError),

    #[error("{failure}: {detail}")]
    Internal { failure: &'static str, detail: String },

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("{0}")]
    BadQuery(String),
}

impl ApiError {
    /// Classify a query error; `failure` names the operation for 500s.
    pub fn from_query(err: QueryError, failure: &'static str) -> Self {
        if matches!(err, QueryError::NotFound(_)) {
            ApiError::NotFound(err)
        } else if err.is_client_fault() {
            ApiError::Invalid(err)
        } else {
            ApiError::Internal {
                failure,
                detail: err.to_string(),
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Invalid(_) | ApiError::BadQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error, message) = match &self {
            ApiError::Invalid(err) | ApiError::NotFound(err) => {
                (err.title().to_string(), err.to_string())
            }
            ApiError::Internal { failure, detail } => {
                error!(%detail, "{}", failure);
                (failure.to_string(), "Internal server error".to_string())
            }
            ApiError::RouteNotFound(path) => (
                "Route not found".to_string(),
                format!("No route matches {path}"),
            ),
            ApiError::BadQuery(detail) => {
                ("Invalid query parameters".to_string(), detail.clone())
            }
        };

        let body = ErrorBody {
            success: false,
            error,
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadQuery(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/v1/currency - All records, optionally sorted
async fn list_currency(
    State(state): State<AppState>,
    query: Result<Query<SortParams>, QueryRejection>,
) -> ApiResult<Json<ListResponse>> {
    let Query(params) = query?;
    state
        .query
        .list(&params)
        .map(|list| Json(ListResponse::new(list, &params)))
        .map_err(|err| ApiError::from_query(err, "Failed to fetch currency data"))
}

/// GET /api/v1/currency/sort - Sorted records, both parameters required
async fn sort_currency(
    State(state): State<AppState>,
    query: Result<Query<SortParams>, QueryRejection>,
) -> ApiResult<Json<ListResponse>> {
    let Query(params) = query?;
    state
        .query
        .sorted(&params)
        .map(|list| Json(ListResponse::new(list, &params)))
        .map_err(|err| ApiError::from_query(err, "Failed to sort currency data"))
}

/// GET /api/v1/currency/currencies - Distinct currency codes
async fn list_codes(State(state): State<AppState>) -> ApiResult<Json<CodesResponse>> {
    let codes = state
        .query
        .currencies()
        .map_err(|err| ApiError::from_query(err, "Failed to fetch currencies"))?;

    Ok(Json(CodesResponse {
        success: true,
        count: codes.len(),
        data: codes,
    }))
}

/// GET /api/v1/currency/:code - One record by code
async fn get_currency(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<RecordResponse>> {
    let record = state
        .query
        .lookup(&code)
        .map_err(|err| ApiError::from_query(err, "Failed to fetch currency"))?;

    Ok(Json(RecordResponse {
        success: true,
        data: record,
    }))
}

/// GET /test - Diagnostic echo
async fn diagnostic(headers: HeaderMap) -> impl IntoResponse {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    Json(serde_json::json!({
        "message": "Test endpoint working",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "headers": headers,
    }))
}

// Nested routes see a stripped URI; report the path the caller sent
async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}

// ============================================================================
// Router
// ============================================================================

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// Helmet defaults minus Content-Security-Policy and
// Cross-Origin-Embedder-Policy
fn security_headers() -> [(HeaderName, &'static str); 11] {
    [
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            "same-origin",
        ),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            "same-origin",
        ),
        (HeaderName::from_static("origin-agent-cluster"), "?1"),
        (header::REFERRER_POLICY, "no-referrer"),
        (header::STRICT_TRANSPORT_SECURITY, "max-age=15552000; includeSubDomains"),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_DNS_PREFETCH_CONTROL, "off"),
        (HeaderName::from_static("x-download-options"), "noopen"),
        (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
        (
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            "none",
        ),
        (header::X_XSS_PROTECTION, "0"),
    ]
}

/// Build the full application router.
///
/// A known path hit with the wrong method falls through to the same JSON 404
/// as an unknown path.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let api_routes = Router::new()
        .route("/", get(list_currency).fallback(not_found))
        .route("/sort", get(sort_currency).fallback(not_found))
        .route("/currencies", get(list_codes).fallback(not_found))
        .route("/:code", get(get_currency).fallback(not_found));

    let mut app = Router::new()
        .route("/test", get(diagnostic).fallback(not_found))
        .route(
            &format!("{API_PREFIX}/"),
            get(list_currency).fallback(not_found),
        )
        .nest(API_PREFIX, api_routes)
        .fallback(not_found)
        .with_state(state);

    for (name, value) in security_headers() {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ));
    }

    app.layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CurrencyDataset, DatasetError};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    struct BrokenProvider;

    impl CurrencyProvider for BrokenProvider {
        fn records(&self) -> Result<Vec<CurrencyRecord>, DatasetError> {
            Err(DatasetError::Unavailable("disk on fire".to_string()))
        }
    }

    fn test_app() -> Router {
        create_router(AppState::new(CurrencyDataset::canonical()), &ServerConfig::default())
    }

    async fn send_json(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        send_json(app, Method::GET, uri).await
    }

    fn codes(body: &Value) -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["currency"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_list_canonical() {
        let (status, body) = get_json(test_app(), "/api/v1/currency").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 4);
        assert_eq!(body["sortBy"], Value::Null);
        assert_eq!(body["order"], Value::Null);
        assert_eq!(codes(&body), vec!["AUD", "MYR", "GBP", "EUR"]);
        assert_eq!(body["data"][3]["displayAmount"], "5.388,00");
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let (status, body) =
            get_json(test_app(), "/api/v1/currency?sortBy=currency&order=asc").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sortBy"], "currency");
        assert_eq!(body["order"], "asc");
        assert_eq!(codes(&body), vec!["AUD", "EUR", "GBP", "MYR"]);
    }

    #[tokio::test]
    async fn test_list_partial_params_canonical() {
        let (status, body) = get_json(test_app(), "/api/v1/currency?sortBy=amount").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sortBy"], "amount");
        assert_eq!(body["order"], Value::Null);
        assert_eq!(codes(&body), vec!["AUD", "MYR", "GBP", "EUR"]);

        let (_, body) = get_json(test_app(), "/api/v1/currency?order=desc&sortBy=").await;
        assert_eq!(body["sortBy"], Value::Null);
        assert_eq!(body["order"], "desc");
        assert_eq!(codes(&body), vec!["AUD", "MYR", "GBP", "EUR"]);
    }

    #[tokio::test]
    async fn test_list_trailing_slash() {
        let (status, body) = get_json(test_app(), "/api/v1/currency/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(codes(&body), vec!["AUD", "MYR", "GBP", "EUR"]);

        let (status, body) =
            get_json(test_app(), "/api/v1/currency/?sortBy=amount&order=asc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(codes(&body), vec!["MYR", "AUD", "EUR", "GBP"]);
    }

    #[tokio::test]
    async fn test_duplicate_query_params_rejected_as_json() {
        let (status, body) = get_json(
            test_app(),
            "/api/v1/currency/sort?sortBy=amount&sortBy=currency&order=asc",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid query parameters");
        assert!(body["message"].as_str().unwrap().contains("sortBy"));

        let (status, body) =
            get_json(test_app(), "/api/v1/currency?order=asc&order=desc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid query parameters");
    }

    #[tokio::test]
    async fn test_list_unknown_key_rejected() {
        let (status, body) =
            get_json(test_app(), "/api/v1/currency?sortBy=locality&order=asc").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid sortBy parameter");
    }

    #[tokio::test]
    async fn test_sort_amount_desc_normalizes_order() {
        let (status, body) =
            get_json(test_app(), "/api/v1/currency/sort?sortBy=amount&order=DESC").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order"], "desc");
        assert_eq!(body["sortBy"], "amount");
        assert_eq!(codes(&body), vec!["GBP", "EUR", "AUD", "MYR"]);
    }

    #[tokio::test]
    async fn test_sort_missing_order_is_client_fault() {
        let (status, body) = get_json(test_app(), "/api/v1/currency/sort?sortBy=amount").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing required parameters");
        assert_eq!(body["message"], "Both sortBy and order parameters are required");
    }

    #[tokio::test]
    async fn test_sort_invalid_sort_by() {
        let (status, body) =
            get_json(test_app(), "/api/v1/currency/sort?sortBy=foo&order=asc").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid sortBy parameter");
        assert!(body["message"].as_str().unwrap().contains("sortBy"));
    }

    #[tokio::test]
    async fn test_sort_invalid_order() {
        let (status, body) =
            get_json(test_app(), "/api/v1/currency/sort?sortBy=amount&order=random").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid order parameter");
    }

    #[tokio::test]
    async fn test_currencies() {
        let (status, body) = get_json(test_app(), "/api/v1/currency/currencies").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 4);
        assert_eq!(body["data"], serde_json::json!(["AUD", "MYR", "GBP", "EUR"]));
    }

    #[tokio::test]
    async fn test_lookup_by_code() {
        let (status, body) = get_json(test_app(), "/api/v1/currency/gbp").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], 3);
        assert_eq!(body["data"]["locality"], "United Kingdom");

        let (status, body) = get_json(test_app(), "/api/v1/currency/usd").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Currency not found");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body) = get_json(test_app(), "/api/v2/nothing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Route not found");
    }

    #[tokio::test]
    async fn test_wrong_method_is_route_not_found() {
        let (status, body) = send_json(test_app(), Method::POST, "/api/v1/currency").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Route not found");
        assert_eq!(body["message"], "No route matches /api/v1/currency");

        let (status, body) =
            send_json(test_app(), Method::DELETE, "/api/v1/currency/sort").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found");

        let (status, body) =
            send_json(test_app(), Method::PUT, "/api/v1/currency/gbp").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found");
    }

    #[tokio::test]
    async fn test_provider_failure_is_generic_500() {
        let app = create_router(AppState::new(BrokenProvider), &ServerConfig::default());
        let (status, body) = get_json(app, "/api/v1/currency").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Failed to fetch currency data");
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_diagnostic_endpoint() {
        let request = Request::builder()
            .uri("/test")
            .header("x-request-tag", "hello")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Test endpoint working");
        assert_eq!(body["headers"]["x-request-tag"], "hello");
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let request = Request::builder()
            .uri("/api/v1/currency")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        let headers = response.headers();
        let expected = [
            ("cross-origin-opener-policy", "same-origin"),
            ("cross-origin-resource-policy", "same-origin"),
            ("origin-agent-cluster", "?1"),
            ("referrer-policy", "no-referrer"),
            ("strict-transport-security", "max-age=15552000; includeSubDomains"),
            ("x-content-type-options", "nosniff"),
            ("x-dns-prefetch-control", "off"),
            ("x-download-options", "noopen"),
            ("x-frame-options", "SAMEORIGIN"),
            ("x-permitted-cross-domain-policies", "none"),
            ("x-xss-protection", "0"),
        ];
        for (name, value) in expected {
            assert_eq!(headers.get(name).unwrap(), value, "{name}");
        }
        assert!(headers.get("content-security-policy").is_none());
        assert!(headers.get("cross-origin-embedder-policy").is_none());
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let request = Request::builder()
            .uri("/api/v1/currency")
            .header("origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
    }

    #[tokio::test]
    async fn test_cors_ignores_unknown_origin() {
        let request = Request::builder()
            .uri("/api/v1/currency")
            .header("origin", "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert!(response.headers().get("access-control-allow-origin").is_none());
    }
}
