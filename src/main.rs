use axum::{routing::delete, routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use winelist_match::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::{candidate_store::CandidateStore, resolver::MatchResolver, search::SearchClient},
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");
    let thresholds = config.thresholds().expect("Invalid match thresholds");

    tracing::info!(
        strict = thresholds.strict,
        partial = thresholds.partial,
        "Initializing winelist-match server"
    );

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "wine_match_requests_total",
        "Wine list lines submitted for matching"
    );
    metrics::describe_counter!(
        "wine_match_results_total",
        "Wine list lines matched, by match kind"
    );
    metrics::describe_counter!(
        "wine_match_misses_total",
        "Wine list lines with no match above threshold"
    );
    metrics::describe_counter!(
        "wine_remote_search_failures_total",
        "Remote catalog searches that failed or timed out"
    );
    metrics::describe_gauge!("wine_cache_entries", "Wines held in the local candidate cache");
    metrics::describe_histogram!("wine_match_seconds", "Time to resolve a match request");

    // Local candidate cache loads in the background
    tracing::info!(path = %config.cache_path, "Opening local wine cache");
    let store = CandidateStore::open(&config.cache_path);

    tracing::info!(url = %config.search_url, index = %config.search_index, "Initializing search client");
    let search = SearchClient::new(
        &config.search_url,
        &config.search_api_key,
        &config.search_index,
        config.remote_timeout(),
    )
    .expect("Failed to initialize search client");

    let resolver = MatchResolver::new(
        Arc::new(store),
        Arc::new(search),
        thresholds,
        config.remote_timeout(),
    );
    let state = AppState::new(resolver);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/match", post(routes::matching::match_line))
        .route("/api/v1/match/batch", post(routes::matching::match_batch))
        .route("/api/v1/wines/{id}", get(routes::matching::get_cached_wine))
        .route("/api/v1/cache", delete(routes::matching::clear_cache))
        .route("/api/v1/catalog", post(routes::catalog::index_wines))
        .route("/api/v1/catalog/{id}", delete(routes::catalog::delete_wine))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1 MB limit

    tracing::info!("Starting winelist-match on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
