//! Configuration reconciliation.
//!
//! Settings from the configuration file are offered to the broker sinks in a
//! fixed order (topic, then global). Pairs that no sink accepts are kept in
//! the module configuration, which carries the application's own settings
//! such as the topic name and partition. Command line overrides are applied
//! after the whole file has been read.

pub mod file;

use crate::error::ConfigError;
use blob_producer_kafka::{ConfigSink, GlobalConfig, Partition, TopicConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use file::ConfigEntry;

/// Module key holding the topic to publish to.
pub const TOPIC_KEY: &str = "asn1.j2735.topic.producer";

/// Module key holding the partition to publish to.
pub const PARTITION_KEY: &str = "asn1.j2735.kafka.partition";

/// Default number of bytes read and published per block.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// librdkafka's default for `message.max.bytes`.
pub const DEFAULT_MESSAGE_MAX_BYTES: usize = 1_000_000;

const MESSAGE_MAX_BYTES_KEY: &str = "message.max.bytes";
const BROKER_KEY: &str = "metadata.broker.list";
const BROKER_ALIAS_KEY: &str = "bootstrap.servers";
const GROUP_KEY: &str = "group.id";
const DEBUG_KEY: &str = "debug";

/// Application settings no broker sink recognized, ordered by key.
pub type ModuleConfig = BTreeMap<String, String>;

/// Where a registered pair ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    /// Accepted by the named sinks, in the order they were offered.
    Sinks(Vec<&'static str>),
    Module,
}

/// Values supplied on the command line. Each one, when present, wins over
/// the configuration file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub input_file: Option<PathBuf>,
    pub block_size: Option<usize>,
    pub broker: Option<String>,
    pub group: Option<String>,
    pub debug: Option<String>,
    pub partition: Option<i32>,
    pub topic: Option<String>,
}

/// Builds the three configuration sets from raw settings.
#[derive(Debug, Default)]
pub struct ConfigurationResolver {
    global: GlobalConfig,
    topic: TopicConfig,
    module: ModuleConfig,
}

impl ConfigurationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker sinks in the order a pair is offered to them.
    fn sinks(&mut self) -> [&mut dyn ConfigSink; 2] {
        [&mut self.topic, &mut self.global]
    }

    /// Offer `key`/`value` to every broker sink; keep it as a module setting
    /// if none accepts it.
    pub fn register(&mut self, key: &str, value: &str) -> Routing {
        let mut accepted = Vec::new();
        for sink in self.sinks() {
            match sink.try_set(key, value) {
                Ok(()) => {
                    info!("kafka {} configuration: {} = {}", sink.scope(), key, value);
                    accepted.push(sink.scope());
                }
                Err(rejection) => {
                    debug!("{} sink declined {}: {}", sink.scope(), key, rejection);
                }
            }
        }

        if accepted.is_empty() {
            info!("module configuration: {} = {}", key, value);
            self.module.insert(key.to_string(), value.to_string());
            Routing::Module
        } else {
            Routing::Sinks(accepted)
        }
    }

    /// Register every entry in file order.
    pub fn register_all<'a>(&mut self, entries: impl IntoIterator<Item = &'a ConfigEntry>) {
        for entry in entries {
            self.register(&entry.key, &entry.value);
        }
    }

    pub fn global(&self) -> &GlobalConfig {
        &self.global
    }

    pub fn topic(&self) -> &TopicConfig {
        &self.topic
    }

    pub fn module(&self) -> &ModuleConfig {
        &self.module
    }

    /// Apply command line overrides in their fixed order: broker, group id,
    /// debug flags, partition, topic name.
    ///
    /// Returns the resolved partition and topic name.
    pub fn apply_overrides(
        &mut self,
        overrides: &CliOverrides,
    ) -> Result<(Partition, String), ConfigError> {
        if let Some(broker) = &overrides.broker {
            info!("setting kafka broker to: {}", broker);
            self.set_global(BROKER_KEY, broker)?;
            if self.global.get(BROKER_ALIAS_KEY).is_some() {
                self.set_global(BROKER_ALIAS_KEY, broker)?;
            }
        }

        if let Some(group) = &overrides.group {
            self.set_global(GROUP_KEY, group)?;
        }

        if let Some(debug) = &overrides.debug {
            self.set_global(DEBUG_KEY, debug)?;
        }

        let partition = match overrides.partition {
            Some(id) => {
                let partition = Partition::from_id(id).ok_or_else(|| {
                    ConfigError::InvalidPartition {
                        value: id.to_string(),
                        reason: "partition ids are -1 (unassigned) or non-negative".to_string(),
                    }
                })?;
                self.module
                    .insert(PARTITION_KEY.to_string(), id.to_string());
                partition
            }
            None => match self.module.get(PARTITION_KEY) {
                Some(value) => parse_partition(value)?,
                None => Partition::Unassigned,
            },
        };
        info!("kafka partition: {}", partition);

        let topic_name = match &overrides.topic {
            Some(topic) => {
                self.module.insert(TOPIC_KEY.to_string(), topic.clone());
                topic.clone()
            }
            None => self
                .module
                .get(TOPIC_KEY)
                .cloned()
                .ok_or(ConfigError::NoPublisherTopic)?,
        };
        info!("published topic: {}", topic_name);

        Ok((partition, topic_name))
    }

    /// Effective `message.max.bytes` of the client being configured.
    pub fn message_max_bytes(&self) -> usize {
        self.global
            .get(MESSAGE_MAX_BYTES_KEY)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_MESSAGE_MAX_BYTES)
    }

    fn set_global(&mut self, key: &'static str, value: &str) -> Result<(), ConfigError> {
        self.global
            .try_set(key, value)
            .map_err(|reason| ConfigError::RejectedOverride {
                key,
                value: value.to_string(),
                reason,
            })
    }

    /// Read the configuration file and the command line into a
    /// [`ResolvedConfig`].
    ///
    /// Fails before any broker contact when the input file is missing, the
    /// configuration file cannot be read, or no topic can be resolved.
    pub fn resolve(overrides: &CliOverrides) -> Result<ResolvedConfig, ConfigError> {
        debug!("starting configuration");

        let input_file = overrides
            .input_file
            .clone()
            .ok_or(ConfigError::MissingInputFile)?;
        if !input_file.is_file() {
            return Err(ConfigError::InputFileNotFound(input_file));
        }
        info!("using input file: {}", input_file.display());

        let config_file = overrides
            .config_file
            .clone()
            .ok_or(ConfigError::MissingConfigFile)?;
        info!("using configuration file: {}", config_file.display());
        let entries = read_config_file(&config_file)?;

        let mut resolver = ConfigurationResolver::new();
        resolver.register_all(&entries);
        let (partition, topic_name) = resolver.apply_overrides(overrides)?;

        // A block larger than the client's message limit could never be
        // published.
        let max = resolver.message_max_bytes();
        let block_size = overrides.block_size.unwrap_or(DEFAULT_BLOCK_SIZE);
        if block_size == 0 || block_size > max {
            return Err(ConfigError::InvalidBlockSize {
                size: block_size,
                max,
            });
        }

        let ConfigurationResolver {
            mut global,
            topic,
            module,
        } = resolver;
        global.set_default_topic_config(topic.clone());

        debug!("configuration complete");
        Ok(ResolvedConfig {
            global,
            topic,
            module,
            topic_name,
            partition,
            input_file,
            config_file,
            block_size,
        })
    }
}

fn read_config_file(path: &Path) -> Result<Vec<ConfigEntry>, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigFileUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(file::parse_entries(&content))
}

/// Parse a partition setting; unparseable values are an error, never a default.
pub fn parse_partition(value: &str) -> Result<Partition, ConfigError> {
    let id: i32 = value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| ConfigError::InvalidPartition {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
    Partition::from_id(id).ok_or_else(|| ConfigError::InvalidPartition {
        value: value.to_string(),
        reason: "partition ids are -1 (unassigned) or non-negative".to_string(),
    })
}

/// Every effective setting, fixed once configuration succeeds.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub global: GlobalConfig,
    pub topic: TopicConfig,
    pub module: ModuleConfig,
    pub topic_name: String,
    pub partition: Partition,
    pub input_file: PathBuf,
    pub config_file: PathBuf,
    pub block_size: usize,
}

impl ResolvedConfig {
    /// Human-readable listing of every effective setting, grouped by set.
    pub fn dump(&self) -> Vec<String> {
        let mut lines = vec!["global configuration settings:".to_string()];
        lines.extend(
            self.global
                .entries()
                .into_iter()
                .map(|(k, v)| format!("  {k} = {v}")),
        );

        lines.push("topic configuration settings:".to_string());
        lines.extend(
            self.topic
                .entries()
                .into_iter()
                .map(|(k, v)| format!("  {k} = {v}")),
        );

        lines.push("module specific configuration settings:".to_string());
        lines.extend(self.module.iter().map(|(k, v)| format!("  {k} = {v}")));

        lines.push("resolved settings:".to_string());
        lines.push(format!("  topic = {}", self.topic_name));
        lines.push(format!("  partition = {}", self.partition));
        lines.push(format!("  input file = {}", self.input_file.display()));
        lines.push(format!("  configuration file = {}", self.config_file.display()));
        lines.push(format!("  block size = {}", self.block_size));
        lines
    }

    /// Log [`ResolvedConfig::dump`] at info level.
    pub fn log_dump(&self) {
        for line in self.dump() {
            info!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing() {
        let mut resolver = ConfigurationResolver::new();
        assert_eq!(
            resolver.register("metadata.broker.list", "kafka:9092"),
            Routing::Sinks(vec!["global"])
        );
        assert_eq!(
            resolver.register("request.required.acks", "1"),
            Routing::Sinks(vec!["topic", "global"])
        );
        assert_eq!(resolver.register(TOPIC_KEY, "blocks"), Routing::Module);
        assert_eq!(resolver.module().get(TOPIC_KEY).map(String::as_str), Some("blocks"));
        assert_eq!(resolver.topic().get("request.required.acks"), Some("1"));
    }

    #[test]
    fn test_invalid_value_for_known_key_lands_in_module() {
        let mut resolver = ConfigurationResolver::new();
        assert_eq!(resolver.register("socket.timeout.ms", "soon"), Routing::Module);
        assert_eq!(resolver.global().get("socket.timeout.ms"), None);
        assert_eq!(
            resolver.module().get("socket.timeout.ms").map(String::as_str),
            Some("soon")
        );
    }

    #[test]
    fn test_module_last_write_wins() {
        let mut resolver = ConfigurationResolver::new();
        resolver.register(TOPIC_KEY, "first");
        resolver.register(TOPIC_KEY, "second");
        assert_eq!(resolver.module().len(), 1);
        assert_eq!(resolver.module()[TOPIC_KEY], "second");
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut resolver = ConfigurationResolver::new();
        resolver.register("bootstrap.servers", "file:9092");
        resolver.register(GROUP_KEY, "file-group");
        resolver.register(PARTITION_KEY, "3");
        resolver.register(TOPIC_KEY, "file-topic");

        let overrides = CliOverrides {
            broker: Some("cli:9092".to_string()),
            group: Some("cli-group".to_string()),
            debug: Some("broker,msg".to_string()),
            partition: Some(5),
            topic: Some("cli-topic".to_string()),
            ..Default::default()
        };
        let (partition, topic) = resolver.apply_overrides(&overrides).unwrap();

        assert_eq!(partition, Partition::Fixed(5));
        assert_eq!(topic, "cli-topic");
        assert_eq!(resolver.global().get(BROKER_KEY), Some("cli:9092"));
        assert_eq!(resolver.global().get(BROKER_ALIAS_KEY), Some("cli:9092"));
        assert_eq!(resolver.global().get(GROUP_KEY), Some("cli-group"));
        assert_eq!(resolver.global().get(DEBUG_KEY), Some("broker,msg"));
        assert_eq!(resolver.module()[PARTITION_KEY], "5");
        assert_eq!(resolver.module()[TOPIC_KEY], "cli-topic");
    }

    #[test]
    fn test_partition_defaults_to_unassigned() {
        let mut resolver = ConfigurationResolver::new();
        resolver.register(TOPIC_KEY, "blocks");
        let (partition, _) = resolver.apply_overrides(&CliOverrides::default()).unwrap();
        assert_eq!(partition, Partition::Unassigned);
    }

    #[test]
    fn test_unparseable_partition_fails() {
        let mut resolver = ConfigurationResolver::new();
        resolver.register(TOPIC_KEY, "blocks");
        resolver.register(PARTITION_KEY, "zero");
        let err = resolver
            .apply_overrides(&CliOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPartition { .. }));
    }

    #[test]
    fn test_negative_partition_other_than_sentinel_fails() {
        assert_eq!(parse_partition("-1").unwrap(), Partition::Unassigned);
        assert!(parse_partition("-4").is_err());
        assert_eq!(parse_partition(" 2 ").unwrap(), Partition::Fixed(2));
    }

    #[test]
    fn test_rejected_debug_override() {
        let mut resolver = ConfigurationResolver::new();
        resolver.register(TOPIC_KEY, "blocks");
        let overrides = CliOverrides {
            debug: Some("everything".to_string()),
            ..Default::default()
        };
        let err = resolver.apply_overrides(&overrides).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RejectedOverride { key: "debug", .. }
        ));
    }

    #[test]
    fn test_message_max_bytes() {
        let mut resolver = ConfigurationResolver::new();
        assert_eq!(resolver.message_max_bytes(), DEFAULT_MESSAGE_MAX_BYTES);
        resolver.register(MESSAGE_MAX_BYTES_KEY, "2000000");
        assert_eq!(resolver.message_max_bytes(), 2_000_000);
    }

    #[test]
    fn test_missing_topic() {
        let mut resolver = ConfigurationResolver::new();
        let err = resolver
            .apply_overrides(&CliOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoPublisherTopic));
    }
}
