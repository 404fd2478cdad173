use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intake_api::config::{ServerConfig, DEFAULT_LOG_FILTER};
use intake_api::router::build_app_router;
use intake_api::state::AppState;
use intake_notify::{DeliveryError, EmailConfig, Mailer, SmtpMailer};
use intake_ocr::{TextExtractor, UnconfiguredExtractor, VisionClient, VisionConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        upload_dir = %config.upload_dir.display(),
        output_dir = %config.output_dir.display(),
        "Loaded server configuration"
    );

    // --- OCR ---
    let extractor: Arc<dyn TextExtractor> = match VisionConfig::from_env() {
        Ok(Some(vision)) => {
            tracing::info!(endpoint = %vision.endpoint, "OCR client configured");
            Arc::new(VisionClient::new(vision).expect("Failed to build OCR client"))
        }
        Ok(None) => {
            tracing::warn!("No OCR credentials set; every document will report a processing error");
            Arc::new(UnconfiguredExtractor)
        }
        Err(e) => panic!("Failed to load OCR configuration: {e}"),
    };

    // --- Email ---
    let mailer: Option<Arc<dyn Mailer>> = match EmailConfig::from_env() {
        Ok(email) => {
            tracing::info!(smtp_host = %email.smtp_host, smtp_port = email.smtp_port, "Email delivery configured");
            Some(Arc::new(
                SmtpMailer::new(email).expect("Failed to build SMTP transport"),
            ))
        }
        Err(DeliveryError::MissingCredentials) => {
            tracing::error!("Email credentials not loaded");
            None
        }
        Err(e) => panic!("Failed to load email configuration: {e}"),
    };

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        extractor,
        mailer,
    };

    let app = build_app_router(state);

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
