//! HTTP routes.

use std::future::Future;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use synthbio_core::QueryError;
use synthbio_engine::QueryService;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// Response header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Clone)]
pub struct AppState {
    pub service: QueryService,
}

impl AppState {
    pub fn new(service: QueryService) -> Self {
        Self { service }
    }
}

/// Build the router. `cors` is `None` for same-origin deployments.
pub fn router(state: AppState, cors: Option<CorsLayer>) -> Router {
    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/query", post(query))
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    match cors {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    info!(addr = ?addr, "synthbiod listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn query(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let mut response = match state.service.handle_body(&request_id, &body).await {
        Ok(answer) => (StatusCode::OK, Json(answer)).into_response(),
        Err(err) => error_response(&err),
    };
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Map a query failure to its status and `{"error": ...}` body.
pub fn error_response(err: &QueryError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorBody {
        error: err.to_string(),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthbio_core::{EngineError, ValidationError};

    #[test]
    fn test_error_response_status_mapping() {
        let cases = [
            (QueryError::from(ValidationError::MissingQuestion), 400),
            (QueryError::from(EngineError::Timeout { seconds: 5 }), 504),
            (
                QueryError::from(EngineError::MalformedOutput("empty".to_string())),
                502,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(&err).status().as_u16(), status);
        }
    }

    #[test]
    fn test_index_is_embedded() {
        assert!(INDEX_HTML.contains("No citations provided."));
    }
}
