//! Producer and topic handle lifecycle.
//!
//! A [`TopicHandle`] borrows the [`ProducerHandle`] it was created from, so
//! the topic is always released before the client. The client is released
//! through [`ProducerHandle::close`], which waits a bounded time for queued
//! messages to drain.

use crate::config::{ConfigSink, GlobalConfig, TopicConfig};
use crate::error::{Error, Result};
use rdkafka::producer::{BaseRecord, DefaultProducerContext, Producer, ThreadedProducer};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bounded wait used when closing the producer.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest topic name Kafka accepts.
pub const MAX_TOPIC_NAME_LEN: usize = 249;

/// Partition a block is produced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partition {
    /// Let the client's partitioner choose.
    #[default]
    Unassigned,
    Fixed(i32),
}

impl Partition {
    /// librdkafka's numeric sentinel for an unassigned partition.
    pub const UNASSIGNED_ID: i32 = -1;

    /// Map a numeric partition id, treating the sentinel as unassigned.
    ///
    /// Returns `None` for negative ids other than the sentinel.
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            Self::UNASSIGNED_ID => Some(Partition::Unassigned),
            id if id >= 0 => Some(Partition::Fixed(id)),
            _ => None,
        }
    }

    /// Numeric id as passed to librdkafka.
    pub fn id(&self) -> i32 {
        match self {
            Partition::Unassigned => Self::UNASSIGNED_ID,
            Partition::Fixed(id) => *id,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Unassigned => write!(f, "unassigned"),
            Partition::Fixed(id) => write!(f, "{id}"),
        }
    }
}

/// Something a block of bytes can be published to.
pub trait Publisher {
    /// Enqueue one block. The implementation must copy `block`; the caller
    /// reuses the buffer as soon as this returns.
    fn publish(&self, partition: Partition, block: &[u8]) -> Result<()>;
}

impl<T: Publisher + ?Sized> Publisher for &T {
    fn publish(&self, partition: Partition, block: &[u8]) -> Result<()> {
        (**self).publish(partition, block)
    }
}

/// Owned broker client.
pub struct ProducerHandle {
    producer: ThreadedProducer<DefaultProducerContext>,
}

impl ProducerHandle {
    /// Release the client, waiting up to `timeout` for queued messages to be
    /// delivered. The wait is best effort; a timeout is logged, not returned.
    pub fn close(self, timeout: Duration) {
        debug!("Flushing producer (waiting up to {:?})", timeout);
        match self.producer.flush(timeout) {
            Ok(()) => info!("Producer flushed and closed"),
            Err(e) => warn!(
                "Producer closed with {} message(s) still in flight: {}",
                self.producer.in_flight_count(),
                e
            ),
        }
    }
}

/// Create the broker client from the resolved global configuration.
///
/// The default topic configuration bound to `global` is applied as well.
pub fn create_producer(global: &GlobalConfig) -> Result<ProducerHandle> {
    let producer: ThreadedProducer<DefaultProducerContext> = global
        .to_client_config()
        .create()
        .map_err(Error::ProducerCreation)?;

    Ok(ProducerHandle { producer })
}

/// Check a topic name against Kafka's naming rules.
pub fn validate_topic_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("topic name is empty".to_string());
    }
    if name == "." || name == ".." {
        return Err(format!("'{name}' is not a valid topic name"));
    }
    if name.len() > MAX_TOPIC_NAME_LEN {
        return Err(format!(
            "topic name is {} characters long; the limit is {MAX_TOPIC_NAME_LEN}",
            name.len()
        ));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(format!("topic name contains illegal character '{c}'"));
    }
    Ok(())
}

/// Handle to one named topic on a producer.
pub struct TopicHandle<'p> {
    producer: &'p ProducerHandle,
    name: String,
}

impl TopicHandle<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Create the handle for `name` on `producer`.
///
/// rdkafka applies topic-scope settings through the client's default topic
/// configuration; `topic_config` is only logged here.
pub fn create_topic<'p>(
    producer: &'p ProducerHandle,
    name: &str,
    topic_config: &TopicConfig,
) -> Result<TopicHandle<'p>> {
    validate_topic_name(name).map_err(|reason| Error::TopicCreation {
        topic: name.to_string(),
        reason,
    })?;

    for (key, value) in topic_config.entries() {
        debug!("Topic '{}' setting: {} = {}", name, key, value);
    }

    Ok(TopicHandle {
        producer,
        name: name.to_string(),
    })
}

impl Publisher for TopicHandle<'_> {
    fn publish(&self, partition: Partition, block: &[u8]) -> Result<()> {
        let record = BaseRecord::<(), [u8]>::to(&self.name)
            .payload(block)
            .partition(partition.id());

        self.producer
            .producer
            .send(record)
            .map_err(|(source, _)| Error::Publish {
                bytes: block.len(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_from_id() {
        assert_eq!(Partition::from_id(-1), Some(Partition::Unassigned));
        assert_eq!(Partition::from_id(0), Some(Partition::Fixed(0)));
        assert_eq!(Partition::from_id(7), Some(Partition::Fixed(7)));
        assert_eq!(Partition::from_id(-2), None);
        assert_eq!(Partition::default().id(), Partition::UNASSIGNED_ID);
    }

    #[test]
    fn test_topic_name_rules() {
        assert!(validate_topic_name("topic.OdeRawEncodedMessageJson-1_a").is_ok());
        assert!(validate_topic_name("").is_err());
        assert!(validate_topic_name("..").is_err());
        assert!(validate_topic_name("has space").is_err());
        assert!(validate_topic_name(&"x".repeat(MAX_TOPIC_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_create_producer_rejects_bad_value() {
        // Bypasses the sink checks so librdkafka itself refuses the value.
        let mut global = GlobalConfig::new();
        global.try_set("bootstrap.servers", "localhost:9092").unwrap();
        let mut config = global.to_client_config();
        config.set("queue.buffering.max.ms", "not-a-number");
        let created: std::result::Result<ThreadedProducer<DefaultProducerContext>, _> =
            config.create();
        assert!(created.is_err());
    }

    #[test]
    fn test_topic_handle_borrows_producer() {
        let mut global = GlobalConfig::new();
        global.try_set("bootstrap.servers", "localhost:9092").unwrap();
        let producer = create_producer(&global).unwrap();
        {
            let topic = create_topic(&producer, "blocks", &TopicConfig::new()).unwrap();
            assert_eq!(topic.name(), "blocks");
            assert!(create_topic(&producer, "bad topic", &TopicConfig::new()).is_err());
        }
        producer.close(Duration::from_millis(100));
    }
}
