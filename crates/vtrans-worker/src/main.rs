//! Pull-subscription worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vtrans_firestore::{FirestoreClient, VideoRepository};
use vtrans_lifecycle::{NotificationHandler, StatusReconciler};
use vtrans_pubsub::SubscriberClient;
use vtrans_worker::{PushListener, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("vtrans=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vtrans-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // Create subscriber
    let subscriber = match SubscriberClient::from_env().await {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create subscriber: {}", e);
            std::process::exit(1);
        }
    };

    // Create record store and reconciler
    let firestore = match FirestoreClient::from_env().await {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create Firestore client: {}", e);
            std::process::exit(1);
        }
    };
    let records = Arc::new(VideoRepository::new(firestore));
    let reconciler = Arc::new(StatusReconciler::new(records));
    let handler = NotificationHandler::new(reconciler);

    let listener = Arc::new(PushListener::new(config, subscriber, handler));

    // Setup signal handler
    let signal_listener = Arc::clone(&listener);
    let shutdown_handle = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_listener.shutdown();
    });

    // Run listener
    if let Err(e) = listener.run().await {
        error!("Listener error: {}", e);
        std::process::exit(1);
    }

    // Wait for shutdown
    shutdown_handle.await.ok();

    info!("Worker shutdown complete");
}
