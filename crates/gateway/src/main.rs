//! DeedLens API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Document matching by id, property name or owner
//! - Question answering and attribute comparison
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use deedlens_common::{
    audit::create_audit_sink,
    config::{AppConfig, ObservabilityConfig},
    metrics::{self, BACKEND_BUCKETS, LATENCY_BUCKETS, METRICS_PREFIX},
    store::create_document_store,
    AnswerChain, QueryService,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<QueryService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting DeedLens API Gateway v{}",
        deedlens_common::VERSION
    );

    init_metrics(config.observability.metrics_port)?;

    // Wire the pipeline
    let store = create_document_store(&config.store).await?;
    let audit = create_audit_sink(&config.audit)?;
    let chain = Arc::new(AnswerChain::from_config(&config, audit)?);
    info!(backends = ?chain.backend_names(), "Answer chain ready");

    let service = Arc::new(QueryService::from_config(&config, store, chain)?);

    let state = AppState {
        config: config.clone(),
        service,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// RUST_LOG wins over the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_metrics(port: u16) -> anyhow::Result<()> {
    if port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", METRICS_PREFIX)),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_backend_duration_seconds", METRICS_PREFIX)),
            BACKEND_BUCKETS,
        )?
        .install()?;

    metrics::register_metrics();
    info!(port, "Metrics exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout: Duration = state.config.request_timeout();

    // API routes
    let api_routes = Router::new()
        .route("/documents/match", post(handlers::documents::match_documents))
        .route("/ask", post(handlers::ask::ask));

    // Compose the app
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use deedlens_common::audit::LogAuditSink;
    use deedlens_common::errors::ProviderError;
    use deedlens_common::models::Document;
    use deedlens_common::store::MemoryDocumentStore;
    use deedlens_common::GenerationBackend;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct FixedBackend(&'static str);

    #[async_trait]
    impl GenerationBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "test"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    fn doc(id: &str, name: &str, owner: &str, content: &str) -> Document {
        Document {
            id: id.to_string(),
            property_name: name.to_string(),
            owner_name: Some(owner.to_string()),
            content: content.to_string(),
            images: Vec::new(),
        }
    }

    fn app(reply: &'static str) -> Router {
        let config = Arc::new(AppConfig::default());
        let store = Arc::new(MemoryDocumentStore::new(vec![
            doc(
                "101",
                "Green Valley Villa",
                "Ramesh Patel",
                "Owner: Ramesh Patel\nJantry Value: Rs. 12,000/sqm",
            ),
            doc(
                "102",
                "Sunrise Apartments",
                "Sita Shah",
                "Owner: Sita Shah\nMarket Value: 90 lakh",
            ),
        ]));
        let backend: Arc<dyn GenerationBackend> = Arc::new(FixedBackend(reply));
        let chain = Arc::new(AnswerChain::new(
            vec![(backend, Duration::from_secs(1))],
            Arc::new(LogAuditSink),
        ));
        let service = QueryService::from_config(&config, store, chain).unwrap();
        create_router(AppState {
            config,
            service: Arc::new(service),
        })
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_sets_request_id() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app("ok").oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_ready_reports_store_up() {
        let request = Request::builder().uri("/ready").body(Body::empty()).unwrap();
        let response = app("ok").oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["store"]["status"], "up");
        assert_eq!(body["checks"]["generation"]["status"], "configured");
        assert_eq!(body["checks"]["generation"]["backends"], json!(["fixed"]));
    }

    #[tokio::test]
    async fn test_match_by_property_name() {
        let (status, body) =
            post_json(app("ok"), "/v1/documents/match", json!({"query": "green valley"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matches"][0]["id"], "101");
        assert_eq!(body["total"], body["matches"].as_array().unwrap().len());
    }

    #[tokio::test]
    async fn test_match_by_numeric_id() {
        let (status, body) =
            post_json(app("ok"), "/v1/documents/match", json!({"query": "102"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["matches"][0]["score"], 100.0);
    }

    #[tokio::test]
    async fn test_match_rejects_empty_query() {
        let (status, body) =
            post_json(app("ok"), "/v1/documents/match", json!({"query": ""})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_object());
    }

    #[tokio::test]
    async fn test_ask_returns_answer_per_document() {
        let (status, body) = post_json(
            app("Ramesh Patel"),
            "/v1/ask",
            json!({"question": "who is the owner?", "query": "101"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "answers");
        assert_eq!(body["documents"][0]["id"], "101");
        assert_eq!(body["answers"][0]["value"], "Ramesh Patel");
        assert_eq!(body["answers"][0]["source"], "generated");
    }

    #[tokio::test]
    async fn test_ask_compare_builds_table() {
        let (status, body) = post_json(
            app("no idea"),
            "/v1/ask",
            json!({
                "question": "compare owner and jantry value",
                "document_ids": ["101", "102"]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "comparison");
        assert_eq!(body["table"]["rows"].as_array().unwrap().len(), 2);
        assert_eq!(body["table"]["attributes"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ask_unknown_ids_is_not_found() {
        let (status, body) = post_json(
            app("ok"),
            "/v1/ask",
            json!({"question": "who is the owner?", "document_ids": ["999"]}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "DOCUMENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_question() {
        let (status, _) = post_json(app("ok"), "/v1/ask", json!({"question": "   "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
