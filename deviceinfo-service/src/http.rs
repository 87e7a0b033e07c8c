//! HTTP front end for the DeviceInfo plugin.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use parking_lot::RwLock;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::plugin::DeviceInfo;
use crate::router::{self, MIME_JSON, Request, Verb};

/// Plugin shared between request handlers and the lifecycle owner.
///
/// Handlers take the read lock; `initialize`/`deinitialize` take the write
/// lock, which keeps them exclusive with request dispatch.
pub type SharedDeviceInfo = Arc<RwLock<DeviceInfo>>;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    plugin: SharedDeviceInfo,
}

/// Create the HTTP router.
fn create_router(plugin: SharedDeviceInfo, web_prefix: &str) -> Router {
    let state = AppState { plugin };

    let nested = format!("{}/*rest", web_prefix);

    let router = if web_prefix.is_empty() {
        Router::new().route("/", any(device_info_handler))
    } else {
        // `/*rest` needs a non-empty remainder; a trailing slash is still root.
        Router::new()
            .route(web_prefix, any(device_info_handler))
            .route(&format!("{}/", web_prefix), any(device_info_handler))
    };

    router
        .route(&nested, any(device_info_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for everything under the web prefix.
async fn device_info_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Response {
    let request = Request::new(Verb::from(&method), uri.path());
    let plugin = state.plugin.clone();

    // Collectors read the OS synchronously.
    let result = tokio::task::spawn_blocking(move || {
        let plugin = plugin.read();
        if !plugin.is_serving() {
            return None;
        }
        plugin.inbound(&request);
        Some(plugin.process(&request))
    })
    .await;

    match result {
        Ok(Some(response)) => into_http(response),
        Ok(None) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "DeviceInfo is not available\n",
        )
            .into_response(),
        Err(e) => {
            error!("Request task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler(State(state): State<AppState>) -> Response {
    if state.plugin.read().is_serving() {
        (StatusCode::OK, "healthy\n").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not serving\n").into_response()
    }
}

fn into_http(response: router::Response) -> Response {
    let Some(doc) = response.body else {
        return (response.status, format!("{}\n", response.message)).into_response();
    };

    match serde_json::to_vec(&doc) {
        Ok(body) => (
            response.status,
            [(
                header::CONTENT_TYPE,
                response.content_type.unwrap_or(MIME_JSON),
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to serialize document: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// HTTP server configuration.
pub struct HttpServer {
    plugin: SharedDeviceInfo,
    listen_addr: SocketAddr,
    web_prefix: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(plugin: SharedDeviceInfo, listen_addr: SocketAddr, web_prefix: String) -> Self {
        Self {
            plugin,
            listen_addr,
            web_prefix,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.plugin, &self.web_prefix);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %self.listen_addr,
            prefix = %self.web_prefix,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
