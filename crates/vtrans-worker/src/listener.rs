//! Pull loop over the notification subscription.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use vtrans_lifecycle::{MessageDisposition, NotificationHandler};
use vtrans_pubsub::{PubsubResult, ReceivedMessage, SubscriberClient};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Pulls job notifications and settles them by reconcile outcome.
pub struct PushListener {
    config: WorkerConfig,
    channel: Arc<SubscriberClient>,
    handler: Arc<NotificationHandler>,
    permits: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl PushListener {
    /// Create a new listener.
    pub fn new(
        config: WorkerConfig,
        channel: SubscriberClient,
        handler: NotificationHandler,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_in_flight));
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            channel: Arc::new(channel),
            handler: Arc::new(handler),
            permits,
            shutdown,
        }
    }

    /// Start the pull loop. Runs until [`PushListener::shutdown`] is
    /// called, then drains in-flight messages.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting push listener on {} with {} max in-flight messages",
            self.channel.subscription_path(),
            self.config.max_in_flight
        );

        // The first pull fails fast, so a missing subscription or broken
        // credentials stop the worker instead of error-looping.
        self.poll_once().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping listener");
                        break;
                    }
                }
                result = self.poll_once() => {
                    if let Err(e) = result {
                        error!("Pull failed: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        info!("Waiting for in-flight messages to settle...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_in_flight()).await;

        info!("Push listener stopped");
        Ok(())
    }

    /// One pull-and-dispatch round.
    async fn poll_once(&self) -> PubsubResult<()> {
        let available = self.permits.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let batch = self.config.pull_batch.min(available);
        let messages = self.channel.pull(batch as u32).await?;

        if messages.is_empty() {
            tokio::time::sleep(self.config.idle_backoff).await;
            return Ok(());
        }

        debug!("Pulled {} messages", messages.len());

        for received in messages {
            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                // Semaphore closed; shutting down
                break;
            };
            let channel = Arc::clone(&self.channel);
            let handler = Arc::clone(&self.handler);

            tokio::spawn(async move {
                let _permit = permit;
                Self::settle(channel, handler, received).await;
            });
        }

        Ok(())
    }

    /// Handle one message and settle it with the subscription.
    async fn settle(
        channel: Arc<SubscriberClient>,
        handler: Arc<NotificationHandler>,
        received: ReceivedMessage,
    ) {
        let ack_id = received.ack_id;
        let message = received.message;

        let disposition = match message.data {
            Some(data) => handler.handle(&data).await,
            None => {
                // Nothing to decode; settle it.
                debug!("Message {} has no data, acking", message.message_id);
                MessageDisposition::Ack
            }
        };

        let result = match disposition {
            MessageDisposition::Ack => channel.acknowledge(&[ack_id]).await,
            MessageDisposition::Nack => channel.nack(&[ack_id]).await,
        };

        if let Err(e) = result {
            // The ack deadline lapses and the message redelivers;
            // reconciliation is idempotent, so the repeat is safe.
            warn!("Failed to settle message {}: {}", message.message_id, e);
        }
    }

    /// Wait for all in-flight messages to finish.
    async fn wait_for_in_flight(&self) {
        loop {
            if self.permits.available_permits() == self.config.max_in_flight {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
