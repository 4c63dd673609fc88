//! medcal-api - HTTP API server for medcal

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use medcal_api::{log_failed_jobs, router, AppState};
use medcal_core::{defaults, Classifier};
use medcal_db::Database;
use medcal_jobs::{ReclassifyService, WorkerBuilder, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let log = LogConfig::from_env();
    let _log_guard = log.init();
    info!(
        log_format = %log.format,
        log_file = log.file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    let db = Database::in_memory();
    if let Ok(seed_file) = std::env::var("EVENTS_SEED_FILE") {
        let count = db.seed_events_from_file(&seed_file).await?;
        info!(seed_file = %seed_file, count, "Calendar events loaded");
    }

    let service = ReclassifyService::new(db.clone(), Arc::new(Classifier::default()));

    // Create and start job worker
    let worker_config = WorkerConfig::from_env();
    let worker_handle = if worker_config.enabled {
        info!("Starting job worker...");
        let worker = WorkerBuilder::new(db.clone())
            .with_config(worker_config)
            .with_handler(service.handler())
            .build();
        let handle = worker.start();

        tokio::spawn(log_failed_jobs(handle.events()));

        info!("Job worker started");
        Some(handle)
    } else {
        info!("Job worker disabled");
        None
    };

    let app = router(AppState::new(service));

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = worker_handle {
        handle.shutdown().await?;
    }
    info!("Server stopped");

    Ok(())
}

/// Logging settings.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `LOG_FORMAT` | `text` | `json` or `text` |
/// | `LOG_FILE` | unset | Path of a daily-rotated log file instead of stdout |
/// | `LOG_ANSI` | auto | Force ANSI colors on or off |
/// | `RUST_LOG` | `medcal_api=debug,...` | Standard env filter |
struct LogConfig {
    format: String,
    file: Option<String>,
    ansi: Option<bool>,
}

impl LogConfig {
    fn from_env() -> Self {
        Self {
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            file: std::env::var("LOG_FILE").ok(),
            ansi: std::env::var("LOG_ANSI")
                .ok()
                .map(|v| v == "true" || v == "1"),
        }
    }

    fn json(&self) -> bool {
        self.format == "json"
    }

    /// Install the global subscriber. The returned guard flushes the file
    /// writer on drop and must live as long as the process.
    fn init(&self) -> Option<WorkerGuard> {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "medcal_api=debug,medcal_jobs=debug,medcal_db=info,medcal_core=info,tower_http=debug"
                .into()
        });
        let registry = tracing_subscriber::registry().with(filter);

        let Some(path) = self.file.as_deref().map(std::path::Path::new) else {
            if self.json() {
                registry.with(tracing_subscriber::fmt::layer().json()).init();
            } else {
                let mut layer = tracing_subscriber::fmt::layer();
                if let Some(ansi) = self.ansi {
                    layer = layer.with_ansi(ansi);
                }
                registry.with(layer).init();
            }
            return None;
        };

        let dir = path.parent().unwrap_or(std::path::Path::new("."));
        let name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("medcal-api.log");
        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));

        if self.json() {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .init();
        } else {
            // No ANSI escapes in files unless asked for.
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(self.ansi.unwrap_or(false)),
                )
                .init();
        }
        Some(guard)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
