//! Command line definition.

use crate::config::CliOverrides;
use crate::logging::{LogOptions, DEFAULT_LOG_DIR, DEFAULT_LOG_NAME};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "blob-producer")]
#[command(about = "Publish a binary file to a Kafka topic in fixed-size blocks, repeatedly")]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file name and path
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Check the configuration file contents and output the settings
    #[arg(short = 'C', long = "config-check")]
    pub config_check: bool,

    /// The name of the topic to produce
    #[arg(short = 't', long = "produce-topic", value_name = "NAME")]
    pub produce_topic: Option<String>,

    /// Topic partition to produce to (-1 lets the partitioner choose)
    #[arg(short = 'p', long, allow_negative_numbers = true)]
    pub partition: Option<i32>,

    /// Consumer group identifier
    #[arg(short = 'g', long)]
    pub group: Option<String>,

    /// Broker address (localhost:9092)
    #[arg(short = 'b', long)]
    pub broker: Option<String>,

    /// librdkafka debug contexts (comma-separated)
    #[arg(short = 'd', long)]
    pub debug: Option<String>,

    /// The log level [trace,debug,info,warning,error,critical,off]
    #[arg(short = 'v', long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Directory for the log files
    #[arg(short = 'D', long = "log-dir", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Remove the log file if it already exists
    #[arg(short = 'R', long = "log-rm")]
    pub log_rm: bool,

    /// Log file name
    #[arg(short = 'i', long = "log", default_value = DEFAULT_LOG_NAME)]
    pub log_name: String,

    /// Input binary file
    #[arg(short = 'F', long = "file", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// The block size to read and publish, in bytes
    #[arg(short = 'B', long = "blocksize")]
    pub block_size: Option<usize>,

    /// Write logs to the log file
    #[arg(
        long,
        env = "BLOB_PRODUCER_LOG_TO_FILE",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub log_to_file: bool,

    /// Write logs to the console
    #[arg(
        long,
        env = "BLOB_PRODUCER_LOG_TO_CONSOLE",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub log_to_console: bool,
}

impl Cli {
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            dir: self.log_dir.clone(),
            file_name: self.log_name.clone(),
            level: self.log_level.clone(),
            remove_existing: self.log_rm,
            to_file: self.log_to_file,
            to_console: self.log_to_console,
        }
    }
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            config_file: cli.config.clone(),
            input_file: cli.file.clone(),
            block_size: cli.block_size,
            broker: cli.broker.clone(),
            group: cli.group.clone(),
            debug: cli.debug.clone(),
            partition: cli.partition,
            topic: cli.produce_topic.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from([
            "blob-producer",
            "-c",
            "producer.properties",
            "-F",
            "blocks.uper",
            "-t",
            "topic.Blocks",
            "-p",
            "-1",
            "-b",
            "kafka:9092",
            "-g",
            "0",
            "-d",
            "broker",
            "-v",
            "trace",
            "-B",
            "512",
            "-R",
            "-C",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("producer.properties")));
        assert_eq!(cli.partition, Some(-1));
        assert_eq!(cli.block_size, Some(512));
        assert!(cli.log_rm);
        assert!(cli.config_check);

        let overrides = CliOverrides::from(&cli);
        assert_eq!(overrides.topic.as_deref(), Some("topic.Blocks"));
        assert_eq!(overrides.broker.as_deref(), Some("kafka:9092"));
        assert_eq!(overrides.group.as_deref(), Some("0"));
    }

    #[test]
    fn test_long_flags_and_defaults() {
        let cli = Cli::try_parse_from([
            "blob-producer",
            "--config",
            "p.properties",
            "--file",
            "in.bin",
            "--blocksize",
            "2048",
        ])
        .unwrap();

        assert_eq!(cli.block_size, Some(2048));
        assert_eq!(cli.log_dir, PathBuf::from(DEFAULT_LOG_DIR));
        assert_eq!(cli.log_name, DEFAULT_LOG_NAME);
        assert!(!cli.config_check);
        assert_eq!(cli.produce_topic, None);
    }

    #[test]
    fn test_config_and_file_are_optional_at_parse_time() {
        let cli = Cli::try_parse_from(["blob-producer"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.file.is_none());
    }

    #[test]
    fn test_log_destination_flags() {
        let cli =
            Cli::try_parse_from(["blob-producer", "--log-to-file", "false", "-i", "x/run.log"])
                .unwrap();
        let options = cli.log_options();
        assert!(!options.to_file);
        assert_eq!(options.log_path(), PathBuf::from("logs/run.log"));
    }

    #[test]
    fn test_help_is_not_an_error_exit() {
        let err = Cli::try_parse_from(["blob-producer", "-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
