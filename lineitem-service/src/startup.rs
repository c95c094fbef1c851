//! Application startup and lifecycle management.

use crate::config::{LineItemConfig, StorageBackend};
use crate::controller::LineItemEditController;
use crate::form::{MessageCatalog, Translator};
use crate::handlers;
use crate::services::{Database, EntityStore, LedgerAdjuster, MemoryStore};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::{request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<LineItemEditController>,
    pub store: Arc<dyn EntityStore>,
    pub translator: Arc<dyn Translator>,
}

impl AppState {
    /// Wire the controller to a backend that serves as both record store and
    /// ledger.
    pub fn new<B>(backend: Arc<B>, config: &LineItemConfig) -> Self
    where
        B: EntityStore + LedgerAdjuster + 'static,
    {
        let store: Arc<dyn EntityStore> = backend.clone();
        let ledger: Arc<dyn LedgerAdjuster> = backend;
        let controller =
            LineItemEditController::new(store.clone(), ledger, config.money.clone());

        Self {
            controller: Arc::new(controller),
            store,
            translator: Arc::new(MessageCatalog::new(config.locale.clone())),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route(
            "/lineitems/:id/edit",
            get(handlers::line_items::edit_form).post(handlers::line_items::submit_edit),
        )
        .route(
            "/lineitems/:id/test-submit",
            post(handlers::line_items::test_submit),
        )
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: LineItemConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    pub async fn build_without_migrations(config: LineItemConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: LineItemConfig, run_migrations: bool) -> Result<Self, AppError> {
        let state = match config.storage_backend {
            StorageBackend::Postgres => {
                let db = Database::new(
                    &config.database.url,
                    config.database.max_connections,
                    config.database.min_connections,
                )
                .await?;
                if run_migrations {
                    db.run_migrations().await?;
                }
                AppState::new(Arc::new(db), &config)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage - records are lost on restart");
                AppState::new(Arc::new(MemoryStore::new()), &config)
            }
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = "lineitem-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );
        axum::serve(self.listener, self.router).await
    }
}
