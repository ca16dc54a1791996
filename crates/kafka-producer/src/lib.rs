//! Kafka-facing half of blob-producer.
//!
//! Features:
//!
//! - Configuration Sinks: `GlobalConfig` and `TopicConfig` accept exactly what
//!   librdkafka accepts for their scope
//! - Producer Lifecycle: one client, one topic handle, bounded-wait close
//! - Publishing: the `Publisher` trait, implemented by `TopicHandle`

/// Broker configuration sinks
///
/// Raw key/value settings are offered to each sink in turn; a sink keeps the
/// pair only if librdkafka would accept it for that scope.
pub mod config;
pub mod error;
pub mod producer;

pub use config::{ConfigSink, GlobalConfig, Rejection, TopicConfig};
pub use error::{Error, Result};
pub use producer::{
    create_producer, create_topic, Partition, ProducerHandle, Publisher, TopicHandle,
    DEFAULT_CLOSE_TIMEOUT,
};
