//! External service integrations.

pub mod amqp;
pub mod directory;

pub use amqp::{AmqpPublisher, SnapshotConsumers, SnapshotHandler};
pub use directory::HttpDirectory;
