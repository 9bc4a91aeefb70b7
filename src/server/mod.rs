use crate::config::Config;
use crate::supervisor::Supervisor;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    Router,
};
use hlsrelay_av::{ConnectivityProbe, EngineLocator, OutputSink};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod error;
pub mod routes;

/// URL prefix the output directory is served under.
pub const HLS_PREFIX: &str = "/hls";

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub supervisor: Supervisor,
    pub probe: Arc<ConnectivityProbe>,
}

impl AppContext {
    /// Wire the supervisor and probe to the engine found by `locator`.
    pub fn new(config: Config, locator: &EngineLocator) -> Self {
        let sink = OutputSink::new(&config.output);
        let supervisor = Supervisor::new(locator.command(), sink, &config.engine);
        let probe = ConnectivityProbe::new(locator.command(), config.probe.clone());
        Self {
            config: Arc::new(config),
            supervisor,
            probe: Arc::new(probe),
        }
    }

    /// Public URL of the live playlist.
    pub fn playlist_url(&self) -> String {
        format!("{HLS_PREFIX}/{}", self.supervisor.sink().playlist_name())
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let hls_dir = ctx.supervisor.sink().dir().to_path_buf();
    let static_dir = ctx.config.server.static_dir.clone();

    let mut app = Router::new()
        .nest("/api", routes::api_routes())
        .nest_service(HLS_PREFIX, ServeDir::new(hls_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Dashboard assets with SPA fallback
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        }
    }

    app
}

/// Start the HTTP server and run until a shutdown signal arrives. Any active
/// session is stopped before returning.
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let locator = EngineLocator::discover(&config.engine);
    let ctx = AppContext::new(config, &locator);
    let supervisor = ctx.supervisor.clone();

    // Start from a clean output directory
    let removed = supervisor
        .sink()
        .reset()
        .context("Failed to prepare output directory")?;
    if removed > 0 {
        tracing::info!(removed, "Removed stale segments from a previous run");
    }

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);
    tracing::info!("Live playlist will be served under {}", HLS_PREFIX);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    supervisor.shutdown().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
