use std::time::Duration;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::decompression::RequestDecompressionLayer;
use tracing::{info, warn};

use super::{
    events::stream_events,
    services::{
        delete_file, get_config, get_file, health, list_files, list_plugins, media_info,
        submit_download, update_download_dir, validate_dir,
    },
    state::AppState,
};
use crate::config::ServerConfig;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

const BROWSER_DELAY: Duration = Duration::from_millis(1500);

/// Overrides from the command line for `web`
#[derive(Debug, Clone, Default)]
pub struct WebOptions {
    pub host: Option<String>,
    /// An explicit port must be free; without one the configured port and
    /// the following `port_search_span - 1` ports are tried in order.
    pub port: Option<u16>,
    pub open_browser: bool,
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/api/download", post(submit_download))
        .route("/api/events", get(stream_events))
        .route("/api/info", post(media_info))
        .route("/api/plugins", get(list_plugins))
        .route("/api/health", get(health))
        .route("/api/config", get(get_config))
        .route("/api/config/download-dir", post(update_download_dir))
        .route("/api/config/validate-dir", post(validate_dir))
        .route("/api/files", get(list_files))
        .route("/api/files/{name}", get(get_file).delete(delete_file))
        .with_state(state)
        // Automatically decompress gzip request bodies
        .layer(RequestDecompressionLayer::new())
        .layer(cors)
}

pub async fn run(state: AppState, options: WebOptions) -> Result<(), AnyError> {
    let server = state.config.server.clone();
    let host = options.host.clone().unwrap_or_else(|| server.host.clone());

    let listener = match options.port {
        Some(port) => TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|e| format!("cannot bind {host}:{port}: {e}"))?,
        None => find_available_port(&host, &server).await.ok_or_else(|| {
            format!(
                "no free port in {}..{} on {host}",
                server.port,
                server.port.saturating_add(server.port_search_span)
            )
        })?,
    };

    let address = listener.local_addr()?;
    let url = browser_url(&host, address.port());
    info!(%address, %url, "wizwam web interface listening");

    if options.open_browser {
        tokio::spawn(open_browser(url));
    }

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Binds the first free port in `port .. port + port_search_span`.
pub async fn find_available_port(host: &str, server: &ServerConfig) -> Option<TcpListener> {
    let end = server.port.saturating_add(server.port_search_span);
    for port in server.port..end {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                if port != server.port {
                    info!(configured = server.port, port, "Configured port busy, using next free port");
                }
                return Some(listener);
            }
            Err(e) => tracing::debug!(port, error = %e, "Port unavailable"),
        }
    }
    None
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

fn browser_url(host: &str, port: u16) -> String {
    let host = match host {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    };
    format!("http://{host}:{port}")
}

async fn open_browser(url: String) {
    tokio::time::sleep(BROWSER_DELAY).await;

    #[cfg(target_os = "macos")]
    let mut command = tokio::process::Command::new("open");
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = tokio::process::Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = tokio::process::Command::new("xdg-open");

    match command.arg(&url).status().await {
        Ok(status) if status.success() => info!(%url, "Opened browser"),
        Ok(status) => warn!(%url, %status, "Browser opener exited with failure"),
        Err(e) => warn!(%url, error = %e, "Could not open browser"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
