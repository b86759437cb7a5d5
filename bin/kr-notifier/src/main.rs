//! KeyRelay Notifier
//!
//! Watches the identity-provisioning audit queue and, for each
//! identity-creation event:
//! - matches the event against the fixed creation pattern
//! - dispatches it to the notification handler
//! - resolves the contact address (Parameter Store) and shared one-time
//!   credential (Secrets Manager)
//! - records a structured notification on the log sink
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KEYRELAY_CONFIG` | - | Path to the TOML config file |
//! | `KR_QUEUE_URL` | - | SQS queue URL delivering audit events |
//! | `KR_AWS_REGION` | SDK default | AWS region override |
//! | `KR_SHARED_SECRET_ID` | `identity-onetime-credential` | Shared credential secret id |
//! | `KR_HTTP_PORT` | `9090` | Health/status port |
//! | `RUST_LOG` | `info` | Log level |

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use kr_config::AppConfig;
use kr_pipeline::{
    Dispatcher, DispatcherStats, EventPattern, HandlerConfig, LogSink, NotificationHandler,
    MATCHER_PRINCIPAL,
};
use kr_queue::{EventConsumer, SqsEventConsumer};
use kr_stores::{ParameterStoreClient, SecretsManagerClient};
use kr_common::{NotificationErrorKind, NotificationResult, NotificationStatus};

#[tokio::main]
async fn main() -> Result<()> {
    kr_common::logging::init_logging("kr-notifier");

    info!("Starting KeyRelay Notifier");

    // Configuration
    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    if config.queue.queue_url.is_empty() {
        anyhow::bail!("queue.queue_url is required (set KR_QUEUE_URL)");
    }

    // Setup shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // AWS clients
    let region = config.aws.region();
    let sdk_config = match region.clone() {
        Some(region) => {
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(region))
                .load()
                .await
        }
        None => aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await,
    };

    let contact_store = Arc::new(ParameterStoreClient::new(region.clone()).await);
    let secret_store = Arc::new(SecretsManagerClient::new(region).await);

    let handler = Arc::new(NotificationHandler::new(
        contact_store,
        secret_store,
        Arc::new(LogSink),
        HandlerConfig {
            contact_key_prefix: config.stores.contact_key_prefix.clone(),
            contact_key_suffix: config.stores.contact_key_suffix.clone(),
            shared_secret_id: config.stores.shared_secret_id.clone(),
        },
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        handler,
        Duration::from_secs(config.pipeline.handler_timeout_seconds),
    ));

    let consumer = Arc::new(
        SqsEventConsumer::from_queue_url(
            aws_sdk_sqs::Client::new(&sdk_config),
            config.queue.queue_url.clone(),
            config.queue.visibility_timeout_seconds as i32,
        )
        .with_wait_time_seconds(config.queue.wait_time_seconds as i32),
    );
    info!(queue = consumer.identifier(), "Event consumer initialized");

    // Start poll loop
    let poll_handle = {
        let mut shutdown_rx = shutdown_tx.subscribe();
        let consumer = consumer.clone();
        let dispatcher = dispatcher.clone();
        let max_messages = config.queue.max_messages_per_poll;

        tokio::spawn(async move {
            tokio::select! {
                _ = poll_loop(consumer, dispatcher, max_messages) => {}
                _ = shutdown_rx.recv() => {
                    info!("Notifier poll loop shutting down");
                }
            }
        })
    };

    // Start health server
    let health_addr: SocketAddr = format!("{}:{}", config.http.host, config.http.port)
        .parse()
        .context("invalid http host/port")?;
    info!("Health server listening on http://{}/health", health_addr);

    let health_app = axum::Router::new()
        .route("/health", axum::routing::get(health_handler))
        .route(
            "/status",
            axum::routing::get({
                let dispatcher = dispatcher.clone();
                move || status_handler(dispatcher.clone())
            }),
        );

    let health_listener = tokio::net::TcpListener::bind(health_addr).await?;
    let health_handle = {
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            axum::serve(health_listener, health_app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .ok();
        })
    };

    info!("KeyRelay Notifier started");
    info!("Press Ctrl+C to shutdown");

    // Wait for shutdown
    shutdown_signal().await;
    info!("Shutdown signal received...");

    consumer.stop().await;
    let _ = shutdown_tx.send(());

    let _ = tokio::time::timeout(Duration::from_secs(30), async {
        let _ = poll_handle.await;
        let _ = health_handle.await;
    })
    .await;

    info!("KeyRelay Notifier shutdown complete");
    Ok(())
}

/// Poll the audit queue and feed matching events through the dispatcher.
async fn poll_loop(
    consumer: Arc<SqsEventConsumer>,
    dispatcher: Arc<Dispatcher>,
    max_messages: u32,
) {
    let pattern = EventPattern::default();

    loop {
        let received = match consumer.poll(max_messages).await {
            Ok(events) => events,
            Err(kr_queue::QueueError::Stopped) => {
                info!("Consumer stopped, ending poll loop");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to poll audit queue, backing off");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for item in received {
            if !pattern.matches(&item.event) {
                // Not an identity-creation event; drop it silently
                if let Err(e) = consumer.ack(&item.receipt_handle).await {
                    warn!(error = %e, "Failed to ack non-matching event");
                }
                continue;
            }

            match dispatcher.dispatch(MATCHER_PRINCIPAL, item.event).await {
                Ok(result) => {
                    settle(&*consumer, &item.receipt_handle, &result).await;
                }
                Err(e) => {
                    // Cannot happen with the matcher principal, but never
                    // leave an event in flight
                    error!(error = %e, "Dispatch rejected");
                    let _ = consumer.nack(&item.receipt_handle, Some(30)).await;
                }
            }
        }
    }
}

/// Map a handler outcome to queue semantics.
///
/// Transient store failures and timeouts go back to the queue for host-level
/// retry; everything else is final and acknowledged.
async fn settle(consumer: &SqsEventConsumer, receipt_handle: &str, result: &NotificationResult) {
    let retryable = result.status == NotificationStatus::Failure
        && matches!(
            result.error_kind,
            Some(NotificationErrorKind::StoreUnavailable) | Some(NotificationErrorKind::Timeout)
        );

    let outcome = if retryable {
        consumer.nack(receipt_handle, Some(30)).await
    } else {
        consumer.ack(receipt_handle).await
    };

    if let Err(e) = outcome {
        warn!(error = %e, retryable, "Failed to settle event with queue");
    }
}

async fn health_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn status_handler(dispatcher: Arc<Dispatcher>) -> axum::Json<DispatcherStats> {
    axum::Json(dispatcher.stats().await)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
