//! Broker configuration sinks.
//!
//! Each sink owns the settings for one librdkafka configuration scope and
//! answers `try_set` by asking librdkafka itself: the key must name a
//! property of the scope and the value must parse for it.

use rdkafka::bindings as rdsys;
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaConfRes;
use rdkafka::ClientConfig;
use std::collections::BTreeMap;
use std::ffi::{c_char, CStr, CString};
use std::fmt;

/// Why a sink refused a key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The key is not a property of this scope.
    UnknownProperty,
    /// The key is known but librdkafka refused the value.
    InvalidValue(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnknownProperty => write!(f, "unknown configuration property"),
            Rejection::InvalidValue(reason) => write!(f, "invalid value: {reason}"),
        }
    }
}

/// A destination for configuration settings.
///
/// Sinks are offered keys in a fixed priority order by the configuration
/// resolver; any key that no sink accepts is kept by the application.
pub trait ConfigSink {
    /// Short scope name used in diagnostics ("global", "topic").
    fn scope(&self) -> &'static str;

    /// Store `value` under `key` if this scope accepts it.
    fn try_set(&mut self, key: &str, value: &str) -> Result<(), Rejection>;

    /// Settings stored so far, ordered by key.
    fn entries(&self) -> Vec<(&str, &str)>;
}

fn rejection(result: RDKafkaConfRes, description: String) -> Rejection {
    match result {
        RDKafkaConfRes::RD_KAFKA_CONF_UNKNOWN => Rejection::UnknownProperty,
        _ => Rejection::InvalidValue(description),
    }
}

/// Ask librdkafka whether its global configuration accepts `key = value`.
///
/// The global configuration forwards topic properties to its default topic
/// configuration, so those are accepted here too.
fn check_global(key: &str, value: &str) -> Result<(), Rejection> {
    let mut config = ClientConfig::new();
    config.set(key, value);
    match config.create_native_config() {
        Ok(_) => Ok(()),
        Err(KafkaError::ClientConfig(result, description, _, _)) => {
            Err(rejection(result, description))
        }
        Err(e) => Err(Rejection::InvalidValue(e.to_string())),
    }
}

/// Ask librdkafka whether a topic configuration accepts `key = value`.
///
/// rdkafka has no safe wrapper for topic configuration objects, so this
/// drives `rd_kafka_topic_conf_set` on a throwaway object.
fn check_topic(key: &str, value: &str) -> Result<(), Rejection> {
    let key_c = CString::new(key).map_err(|e| Rejection::InvalidValue(e.to_string()))?;
    let value_c = CString::new(value).map_err(|e| Rejection::InvalidValue(e.to_string()))?;
    let mut err_buf = [0u8; 512];

    // SAFETY: the topic conf is created, used and destroyed here; the key,
    // value and error buffer outlive the call.
    let result = unsafe {
        let conf = rdsys::rd_kafka_topic_conf_new();
        let result = rdsys::rd_kafka_topic_conf_set(
            conf,
            key_c.as_ptr(),
            value_c.as_ptr(),
            err_buf.as_mut_ptr().cast::<c_char>(),
            err_buf.len(),
        );
        rdsys::rd_kafka_topic_conf_destroy(conf);
        result
    };

    if result == RDKafkaConfRes::RD_KAFKA_CONF_OK {
        return Ok(());
    }
    let description = CStr::from_bytes_until_nul(&err_buf)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Err(rejection(result, description))
}

/// Per-topic settings, fixed once the topic handle is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicConfig {
    settings: BTreeMap<String, String>,
}

impl TopicConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }
}

impl ConfigSink for TopicConfig {
    fn scope(&self) -> &'static str {
        "topic"
    }

    fn try_set(&mut self, key: &str, value: &str) -> Result<(), Rejection> {
        check_topic(key, value)?;
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn entries(&self) -> Vec<(&str, &str)> {
        self.settings
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Client-wide settings plus the default topic configuration bound to them.
///
/// Like librdkafka's global configuration object, this sink also accepts
/// topic-scope properties; they apply to every topic the client produces to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    settings: BTreeMap<String, String>,
    default_topic: Option<TopicConfig>,
}

impl GlobalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Bind the topic configuration used for every topic of this client.
    pub fn set_default_topic_config(&mut self, topic: TopicConfig) {
        self.default_topic = Some(topic);
    }

    pub fn default_topic_config(&self) -> Option<&TopicConfig> {
        self.default_topic.as_ref()
    }

    /// Build the rdkafka client configuration.
    ///
    /// Global settings are applied first, then the default topic settings, so
    /// a topic-scope value wins for keys present in both.
    pub fn to_client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        for (key, value) in &self.settings {
            config.set(key, value);
        }
        if let Some(topic) = &self.default_topic {
            for (key, value) in topic.entries() {
                config.set(key, value);
            }
        }
        config
    }
}

impl ConfigSink for GlobalConfig {
    fn scope(&self) -> &'static str {
        "global"
    }

    fn try_set(&mut self, key: &str, value: &str) -> Result<(), Rejection> {
        check_global(key, value)?;
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn entries(&self) -> Vec<(&str, &str)> {
        self.settings
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_sink_accepts_topic_properties_only() {
        let mut topic = TopicConfig::new();
        assert!(topic.try_set("request.required.acks", "1").is_ok());
        assert_eq!(
            topic.try_set("metadata.broker.list", "localhost:9092"),
            Err(Rejection::UnknownProperty)
        );
        assert_eq!(topic.get("request.required.acks"), Some("1"));
        assert_eq!(topic.get("metadata.broker.list"), None);
    }

    #[test]
    fn test_global_sink_also_accepts_topic_properties() {
        let mut global = GlobalConfig::new();
        assert!(global.try_set("metadata.broker.list", "kafka:9092").is_ok());
        assert!(global.try_set("message.timeout.ms", "5000").is_ok());
        assert_eq!(global.get("message.timeout.ms"), Some("5000"));
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let mut global = GlobalConfig::new();
        let rejection = global.try_set("socket.keepalive.enable", "maybe").unwrap_err();
        assert!(matches!(rejection, Rejection::InvalidValue(_)));
        assert!(global.entries().is_empty());

        let mut topic = TopicConfig::new();
        let rejection = topic.try_set("request.required.acks", "most").unwrap_err();
        assert!(matches!(rejection, Rejection::InvalidValue(_)));
    }

    #[test]
    fn test_unknown_key_is_refused_by_both_scopes() {
        let mut global = GlobalConfig::new();
        let mut topic = TopicConfig::new();
        assert_eq!(
            global.try_set("asn1.j2735.topic.producer", "blocks"),
            Err(Rejection::UnknownProperty)
        );
        assert_eq!(
            topic.try_set("asn1.j2735.topic.producer", "blocks"),
            Err(Rejection::UnknownProperty)
        );
    }

    #[test]
    fn test_any_librdkafka_property_reaches_client_config() {
        let mut global = GlobalConfig::new();
        global.try_set("max.poll.interval.ms", "300000").unwrap();
        global.try_set("enable.sparse.connections", "true").unwrap();
        global.try_set("fetch.max.bytes", "1000000").unwrap();

        let client_config = global.to_client_config();
        assert_eq!(client_config.get("max.poll.interval.ms"), Some("300000"));
        assert_eq!(client_config.get("enable.sparse.connections"), Some("true"));
        assert_eq!(client_config.get("fetch.max.bytes"), Some("1000000"));
    }

    #[test]
    fn test_last_write_wins() {
        let mut global = GlobalConfig::new();
        global.try_set("client.id", "first").unwrap();
        global.try_set("client.id", "second").unwrap();
        assert_eq!(global.entries(), vec![("client.id", "second")]);
    }

    #[test]
    fn test_client_config_includes_default_topic_settings() {
        let mut topic = TopicConfig::new();
        topic.try_set("compression.codec", "inherit").unwrap();
        let mut global = GlobalConfig::new();
        global.try_set("bootstrap.servers", "kafka:9092").unwrap();
        global.try_set("compression.codec", "gzip").unwrap();
        global.set_default_topic_config(topic);

        let client_config = global.to_client_config();
        assert_eq!(client_config.get("bootstrap.servers"), Some("kafka:9092"));
        assert_eq!(client_config.get("compression.codec"), Some("inherit"));
    }
}
