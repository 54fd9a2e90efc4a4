use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use schoolbase::jobs::build_scheduler;
use schoolbase::logging::init_tracing;
use schoolbase::metrics::{init_metrics, metrics_app, set_observability_enabled};
use schoolbase::router::init_router;
use schoolbase::state::init_app_state;
use schoolbase_config::ServerConfig;
use schoolbase_db::{init_db_pool, run_migrations};

#[tokio::main]
async fn main() -> Result<()> {
    schoolbase_config::load_env();

    let server_config = ServerConfig::from_env();
    init_tracing(&server_config.log_dir);
    set_observability_enabled(server_config.observability_enabled);

    info!("Starting Schoolbase API v{}", env!("CARGO_PKG_VERSION"));

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = init_db_pool(&database_url, server_config.database_max_connections)
        .await
        .context("Failed to connect to database")?;

    info!("Running database migrations...");
    run_migrations(&db).await.context("Failed to run migrations")?;

    let state = init_app_state(db);

    if let Some(handle) = init_metrics() {
        let addr = SocketAddr::from(([0, 0, 0, 0], server_config.metrics_port));
        tokio::spawn(async move {
            match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => {
                    info!(%addr, "Metrics listening");
                    if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                        warn!(error = %e, "Metrics server stopped");
                    }
                }
                Err(e) => warn!(%addr, error = %e, "Metrics listener not started"),
            }
        });
    }

    let scheduler = if state.jobs_config.enabled {
        let mut scheduler = build_scheduler(&state);
        info!(jobs = ?scheduler.job_names(), "Registered background jobs");
        scheduler.start();
        Some(scheduler)
    } else {
        info!("Background jobs disabled");
        None
    };

    let app = init_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Server running on http://localhost:{}", server_config.port);
    info!("Swagger UI available at http://localhost:{}/swagger-ui", server_config.port);
    info!("Scalar UI available at http://localhost:{}/scalar", server_config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown();
        scheduler.wait_for_shutdown(Duration::from_secs(30)).await;
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
}
