use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use obmin_api::background::revocation_reaper;
use obmin_api::config::ServerConfig;
use obmin_api::router::build_app_router;
use obmin_api::state::{AppState, Stores};
use obmin_db::store::PgStore;
use obmin_mail::{EmailConfig, LogMailer, MailSender, SmtpMailer};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "obmin_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = obmin_db::create_pool(&database_url, config.store_timeout())
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    obmin_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    obmin_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let stores = Stores::shared(Arc::new(PgStore::new(pool)));

    // --- Mail ---
    let mailer: Arc<dyn MailSender> = match EmailConfig::from_env() {
        Some(email_config) => {
            let host = email_config.smtp_host.clone();
            let mailer = SmtpMailer::new(email_config).expect("Failed to build SMTP transport");
            tracing::info!(%host, "SMTP mailer configured");
            Arc::new(mailer)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, confirmation emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    // --- App state ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let reap_interval = Duration::from_secs(config.revocation_reap_interval_secs);
    let store_timeout = config.store_timeout();
    let state = AppState::new(config.clone(), stores.clone(), mailer);

    // --- Background jobs ---
    let jobs_cancel = CancellationToken::new();

    let purge_handle = state.purge_scheduler.spawn(jobs_cancel.clone());
    let reaper_handle = tokio::spawn(revocation_reaper::run(
        Arc::clone(&stores.revocations),
        reap_interval,
        store_timeout,
        jobs_cancel.clone(),
    ));
    tracing::info!("Background jobs started (confirmation purge, revocation reaper)");

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    jobs_cancel.cancel();
    let _ = tokio::time::timeout(shutdown_timeout, purge_handle).await;
    let _ = tokio::time::timeout(shutdown_timeout, reaper_handle).await;
    tracing::info!("Background jobs stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
