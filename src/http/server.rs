//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, CORS, authorization)
//! - Build the freshness sources shared by cache and broadcaster
//! - Bind server to listener and serve with graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::broadcast::{
    ChangeBroadcaster, FreshnessSource, EVENT_NEW_LOGS, EVENT_UPDATE_SERVICES, FIELD_LAST_LOGID,
    FIELD_LAST_TIMESTAMP,
};
use crate::broker::BrokerClient;
use crate::cache::{Fingerprint, FreshnessCache};
use crate::config::{ApiConfig, CorsConfig};
use crate::http::handlers;
use crate::http::middleware::authorize_middleware;
use crate::http::websocket::live_handler;
use crate::jobs::{JobHandler, JobPublisher};
use crate::security::{default_permissions, AccessResolver, PatternError};
use crate::storage::ManagementStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub resolver: Arc<AccessResolver>,
    pub cache: Arc<FreshnessCache>,
    pub broadcaster: ChangeBroadcaster,
    pub store: Arc<dyn ManagementStore>,
    pub jobs: Arc<JobHandler>,
    pub broker: Arc<BrokerClient>,
}

/// HTTP server for the management API.
pub struct HttpServer {
    router: Router,
    config: ApiConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Compiles the permission table eagerly; an invalid pattern is fatal
    /// here, before any request is served.
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn ManagementStore>,
        publisher: Arc<dyn JobPublisher>,
    ) -> Result<Self, PatternError> {
        let resolver = Arc::new(AccessResolver::new(default_permissions(
            &config.api.base_path,
            &config.api.public_base_path,
        ))?);

        let broadcaster = ChangeBroadcaster::new(
            freshness_sources(store.clone()),
            Duration::from_secs(config.broadcast.poll_interval_secs),
        );

        let state = AppState {
            config: Arc::new(config.clone()),
            resolver,
            cache: Arc::new(FreshnessCache::new()),
            broadcaster,
            store,
            jobs: Arc::new(JobHandler::new(publisher)),
            broker: Arc::new(BrokerClient::new(&config.broker)),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ApiConfig, state: AppState) -> Router {
        let base = &config.api.base_path;
        let public = &config.api.public_base_path;

        Router::new()
            .route("/status/health", get(handlers::health))
            .route("/status/health/", get(handlers::health))
            .route(&format!("{base}/job/"), post(handlers::submit_job))
            .route(&format!("{base}/job/{{job_id}}"), delete(handlers::remove_job))
            .route(&format!("{base}/secure/"), get(handlers::secure))
            .route(&format!("{base}/catalogs/"), get(handlers::catalogs))
            .route(&format!("{base}/queues/"), get(handlers::queues))
            .route(&format!("{base}/queue/{{name}}"), delete(handlers::purge_queue))
            .route(&format!("{public}/state/logs/"), get(handlers::state_logs))
            .route(&format!("{public}/state/services/"), get(handlers::state_services))
            .route(&format!("{base}/socket.io/"), get(live_handler))
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(state, authorize_middleware))
            .layer(cors_layer(&config.cors))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The composed router, for serving on a caller-managed listener.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// The fingerprint sources watched by the change broadcaster. Same
/// accessors the freshness cache keys on.
fn freshness_sources(store: Arc<dyn ManagementStore>) -> Vec<FreshnessSource> {
    let log_store = store.clone();
    let service_store = store;
    vec![
        FreshnessSource::new(EVENT_NEW_LOGS, FIELD_LAST_LOGID, move || {
            Fingerprint::from(log_store.last_logid())
        }),
        FreshnessSource::new(EVENT_UPDATE_SERVICES, FIELD_LAST_TIMESTAMP, move || {
            Fingerprint::from(service_store.last_service_timestamp())
        }),
    ]
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
