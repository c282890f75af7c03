// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Main server implementation

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, patch, post, put},
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

/// REST API server
pub struct Server {
    config: ServerConfig,
    app: Router,
}

impl Server {
    /// Create a new server instance
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        let state = AppState::new(config.clone())
            .await
            .map_err(|err| ServerError::Internal(err.to_string()))?;
        Ok(Self::with_state(config, state))
    }

    /// Construct a server from an already-built app state (used for custom
    /// storage backends and tests)
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        let app = Self::build_app(state, &config);
        Self { config, app }
    }

    /// Build the Axum application with routes and middleware
    fn build_app(state: AppState, config: &ServerConfig) -> Router {
        let middleware_stack = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer({
                if config.enable_cors {
                    CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
                } else {
                    CorsLayer::new()
                        .allow_origin(vec![
                            HeaderValue::from_static("http://localhost:3000"),
                            HeaderValue::from_static("http://127.0.0.1:3000"),
                        ])
                        .allow_methods([
                            axum::http::Method::GET,
                            axum::http::Method::POST,
                            axum::http::Method::PUT,
                            axum::http::Method::PATCH,
                            axum::http::Method::DELETE,
                        ])
                        .allow_headers([axum::http::header::CONTENT_TYPE])
                }
            });

        // API routes
        let api_routes = Router::new()
            // Health and diagnostics
            .route("/health", get(handlers::health::health))
            // Task management
            .route("/tasks", get(handlers::tasks::list_tasks))
            .route("/tasks", post(handlers::tasks::create_task))
            .route("/tasks/:id", get(handlers::tasks::get_task))
            .route("/tasks/:id", patch(handlers::tasks::update_task))
            .route("/tasks/:id", delete(handlers::tasks::delete_task))
            .route("/tasks/:id/run", post(handlers::tasks::run_task))
            // Event log
            .route("/events", get(handlers::events::list_events))
            // Runner settings
            .route("/settings/runner", get(handlers::settings::get_settings))
            .route("/settings/runner", put(handlers::settings::put_settings))
            .route(
                "/settings/runner/test",
                get(handlers::settings::test_runner),
            )
            // Runner proxies
            .route("/browse", get(handlers::proxy::browse))
            .route("/browse/read", get(handlers::proxy::browse_read))
            .route("/sandbox/list", get(handlers::proxy::sandbox_list))
            .route("/sandbox/read", get(handlers::proxy::sandbox_read))
            .route("/sandbox/write", post(handlers::proxy::sandbox_write))
            .route("/sandbox/delete", post(handlers::proxy::sandbox_delete))
            .route("/sandbox/rename", post(handlers::proxy::sandbox_rename))
            .route("/shell/run", post(handlers::proxy::shell_run))
            .route("/analyze", post(handlers::proxy::analyze));

        Router::new().nest("/api", api_routes).with_state(state).layer(middleware_stack)
    }

    /// Run the server
    pub async fn run(self) -> ServerResult<()> {
        let addr = self.config.bind_addr;
        info!("Starting server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.app)
            .await
            .map_err(|err| ServerError::Internal(format!("REST server error: {err}")))?;

        Ok(())
    }

    /// Get the bind address
    pub fn addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// The assembled application router (used by tests to serve on an
    /// ephemeral port)
    pub fn app(&self) -> Router {
        self.app.clone()
    }
}
