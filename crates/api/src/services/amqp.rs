//! RabbitMQ integration.
//!
//! Inbound: user and club change notifications keep the local snapshots
//! fresh. Each queue has its own channel with manual acknowledgements and
//! a prefetch of one, so deliveries on a queue are handled one at a time.
//!
//! Outbound: domain events are published as persistent JSON to the event
//! exchange with routing key `event.<kind>`.

use async_trait::async_trait;
use domain::models::{Club, DomainEvent, User};
use domain::ports::{DomainEventPublisher, PublishError};
use domain::services::SnapshotService;
use domain::DomainError;
use futures::StreamExt;
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
        BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::RabbitMqConfig;
use crate::middleware::metrics::record_bus_message;

/// Delivery mode marking a message persistent.
const PERSISTENT: u8 = 2;

pub async fn connect(config: &RabbitMqConfig) -> Result<Connection, lapin::Error> {
    let connection = Connection::connect(&config.uri(), ConnectionProperties::default()).await?;
    info!(host = %config.host, port = config.port, "Connected to RabbitMQ");
    Ok(connection)
}

async fn declare_exchange(channel: &Channel, exchange: &str) -> Result<(), lapin::Error> {
    channel
        .exchange_declare(
            exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
}

// ============================================================================
// Inbound
// ============================================================================

/// Which snapshot a queue feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    User,
    Club,
}

/// What to tell the broker about a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ack,
    /// Negative acknowledgement; the broker redelivers.
    Requeue,
    /// Negative acknowledgement without redelivery.
    Drop,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ack => "ack",
            Outcome::Requeue => "requeue",
            Outcome::Drop => "drop",
        }
    }
}

/// Decodes one delivery and applies it to the snapshots.
#[derive(Clone)]
pub struct SnapshotHandler {
    snapshots: SnapshotService,
}

impl SnapshotHandler {
    pub fn new(snapshots: SnapshotService) -> Self {
        Self { snapshots }
    }

    pub async fn handle(
        &self,
        kind: SnapshotKind,
        expected_key: &str,
        routing_key: &str,
        payload: &[u8],
    ) -> Outcome {
        if routing_key != expected_key {
            warn!(routing_key = routing_key, expected = expected_key, "Unexpected routing key");
            return Outcome::Requeue;
        }

        let result = match kind {
            SnapshotKind::User => match serde_json::from_slice::<User>(payload) {
                Ok(user) => self.snapshots.apply_user_update(&user).await,
                Err(e) => {
                    error!(error = %e, "Failed to decode user message");
                    return Outcome::Drop;
                }
            },
            SnapshotKind::Club => match serde_json::from_slice::<Club>(payload) {
                Ok(club) => self.snapshots.apply_club_update(&club).await,
                Err(e) => {
                    error!(error = %e, "Failed to decode club message");
                    return Outcome::Drop;
                }
            },
        };

        match result {
            Ok(()) => Outcome::Ack,
            Err(DomainError::UserNotExist) => {
                debug!("Update for a user unknown locally");
                Outcome::Drop
            }
            Err(e) => {
                error!(error = %e, kind = ?kind, "Failed to apply snapshot update");
                Outcome::Requeue
            }
        }
    }
}

/// A queue binding the service consumes from.
#[derive(Debug, Clone)]
struct Subscription {
    kind: SnapshotKind,
    exchange: String,
    queue: String,
    routing_key: String,
}

impl Subscription {
    fn from_config(config: &RabbitMqConfig) -> [Subscription; 2] {
        [
            Subscription {
                kind: SnapshotKind::User,
                exchange: config.user_exchange.clone(),
                queue: config.user_queue.clone(),
                routing_key: config.user_routing_key.clone(),
            },
            Subscription {
                kind: SnapshotKind::Club,
                exchange: config.club_exchange.clone(),
                queue: config.club_queue.clone(),
                routing_key: config.club_routing_key.clone(),
            },
        ]
    }
}

/// Running consumers; one task per queue.
pub struct SnapshotConsumers {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl SnapshotConsumers {
    /// Declares the topology and starts consuming both queues.
    pub async fn start(
        connection: &Connection,
        config: &RabbitMqConfig,
        handler: SnapshotHandler,
    ) -> Result<Self, lapin::Error> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();

        for subscription in Subscription::from_config(config) {
            let channel = connection.create_channel().await?;
            declare_exchange(&channel, &subscription.exchange).await?;
            channel
                .queue_declare(
                    &subscription.queue,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await?;
            channel
                .queue_bind(
                    &subscription.queue,
                    &subscription.exchange,
                    &subscription.routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
            channel
                .basic_qos(config.prefetch, BasicQosOptions::default())
                .await?;

            info!(
                queue = %subscription.queue,
                exchange = %subscription.exchange,
                routing_key = %subscription.routing_key,
                "Starting consumer"
            );
            handles.push(tokio::spawn(consume(
                channel,
                subscription,
                handler.clone(),
                shutdown_rx.clone(),
            )));
        }

        Ok(Self {
            shutdown_tx,
            handles,
        })
    }

    /// Stops receiving and waits for in-flight deliveries to finish.
    pub async fn shutdown(self, timeout: Duration) {
        let _ = self.shutdown_tx.send(true);
        let all = futures::future::join_all(self.handles);
        if tokio::time::timeout(timeout, all).await.is_err() {
            warn!("Consumers did not stop within timeout");
        } else {
            info!("Consumers stopped");
        }
    }
}

async fn consume(
    channel: Channel,
    subscription: Subscription,
    handler: SnapshotHandler,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let consumer_tag = format!("events-service-{}", subscription.queue);
    let mut consumer = match channel
        .basic_consume(
            &subscription.queue,
            &consumer_tag,
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
    {
        Ok(consumer) => consumer,
        Err(e) => {
            error!(queue = %subscription.queue, error = %e, "Failed to start consumer");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            delivery = consumer.next() => {
                let delivery = match delivery {
                    Some(Ok(delivery)) => delivery,
                    Some(Err(e)) => {
                        error!(queue = %subscription.queue, error = %e, "Consumer error");
                        break;
                    }
                    None => break,
                };

                let outcome = handler
                    .handle(
                        subscription.kind,
                        &subscription.routing_key,
                        delivery.routing_key.as_str(),
                        &delivery.data,
                    )
                    .await;
                record_bus_message(&subscription.queue, outcome.as_str());

                let result = match outcome {
                    Outcome::Ack => delivery.ack(BasicAckOptions::default()).await,
                    Outcome::Requeue => {
                        delivery
                            .nack(BasicNackOptions {
                                requeue: true,
                                ..Default::default()
                            })
                            .await
                    }
                    Outcome::Drop => {
                        delivery
                            .nack(BasicNackOptions {
                                requeue: false,
                                ..Default::default()
                            })
                            .await
                    }
                };
                if let Err(e) = result {
                    warn!(queue = %subscription.queue, error = %e, "Failed to acknowledge delivery");
                }
            }
        }
    }

    if let Err(e) = channel.close(200, "shutdown").await {
        debug!(queue = %subscription.queue, error = %e, "Channel already closed");
    }
    info!(queue = %subscription.queue, "Consumer stopped");
}

// ============================================================================
// Outbound
// ============================================================================

/// Publishes domain events to the event exchange.
pub struct AmqpPublisher {
    channel: Channel,
    exchange: String,
}

impl AmqpPublisher {
    pub async fn new(connection: &Connection, exchange: &str) -> Result<Self, lapin::Error> {
        let channel = connection.create_channel().await?;
        declare_exchange(&channel, exchange).await?;
        Ok(Self {
            channel,
            exchange: exchange.to_string(),
        })
    }
}

#[async_trait]
impl DomainEventPublisher for AmqpPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(event).map_err(|e| PublishError(e.to_string()))?;
        let routing_key = event.routing_key();

        self.channel
            .basic_publish(
                &self.exchange,
                &routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_delivery_mode(PERSISTENT)
                    .with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| PublishError(e.to_string()))?
            .await
            .map_err(|e| PublishError(e.to_string()))?;

        debug!(
            event_id = %event.event_id,
            routing_key = %routing_key,
            "Domain event published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::memory::InMemorySnapshotStore;
    use domain::ports::SnapshotStore;
    use std::sync::Arc;

    fn user_json(id: i64, first_name: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": id,
            "first_name": first_name,
            "last_name": "Lovelace",
            "barcode": "B-1"
        }))
        .unwrap()
    }

    fn handler(store: Arc<InMemorySnapshotStore>) -> SnapshotHandler {
        SnapshotHandler::new(SnapshotService::new(store))
    }

    #[tokio::test]
    async fn test_known_user_is_updated_and_acked() {
        let store = Arc::new(InMemorySnapshotStore::new());
        store
            .upsert_user(&serde_json::from_slice(&user_json(7, "Ada")).unwrap())
            .await
            .unwrap();

        let outcome = handler(store.clone())
            .handle(
                SnapshotKind::User,
                "user.updated",
                "user.updated",
                &user_json(7, "Augusta"),
            )
            .await;

        assert_eq!(outcome, Outcome::Ack);
        assert_eq!(store.user(7).await.unwrap().first_name, "Augusta");
    }

    #[tokio::test]
    async fn test_unknown_user_is_dropped() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let outcome = handler(store.clone())
            .handle(
                SnapshotKind::User,
                "user.updated",
                "user.updated",
                &user_json(7, "Ada"),
            )
            .await;

        assert_eq!(outcome, Outcome::Drop);
        assert!(store.user(7).await.is_none());
    }

    #[tokio::test]
    async fn test_club_is_upserted() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let payload = br#"{"id": 3, "name": "Chess Club"}"#;

        let outcome = handler(store.clone())
            .handle(SnapshotKind::Club, "club.updated", "club.updated", payload)
            .await;

        assert_eq!(outcome, Outcome::Ack);
        assert_eq!(store.club(3).await.unwrap().name, "Chess Club");
    }

    #[tokio::test]
    async fn test_mismatched_routing_key_is_requeued() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let outcome = handler(store)
            .handle(SnapshotKind::Club, "club.updated", "club.deleted", b"{}")
            .await;
        assert_eq!(outcome, Outcome::Requeue);
    }

    #[tokio::test]
    async fn test_garbage_is_dropped() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let outcome = handler(store)
            .handle(SnapshotKind::User, "user.updated", "user.updated", b"not json")
            .await;
        assert_eq!(outcome, Outcome::Drop);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Ack.as_str(), "ack");
        assert_eq!(Outcome::Requeue.as_str(), "requeue");
        assert_eq!(Outcome::Drop.as_str(), "drop");
    }
}
