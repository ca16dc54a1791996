use blob_producer_kafka::Rejection;
use std::path::PathBuf;
use thiserror::Error;

/// Setup problems detected before any broker contact.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Must specify the path to an input binary file")]
    MissingInputFile,

    #[error("The input file {0:?} does not exist")]
    InputFileNotFound(PathBuf),

    #[error("Must specify the path to a configuration file")]
    MissingConfigFile,

    #[error("Cannot open configuration file {path:?}: {source}")]
    ConfigFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No publisher topic was specified")]
    NoPublisherTopic,

    #[error("Invalid partition '{value}': {reason}")]
    InvalidPartition { value: String, reason: String },

    #[error("Block size {size} must be between 1 and {max} bytes (message.max.bytes)")]
    InvalidBlockSize { size: usize, max: usize },

    #[error("Kafka rejected {key} = {value}: {reason}")]
    RejectedOverride {
        key: &'static str,
        value: String,
        reason: Rejection,
    },
}

/// Failures while preparing the log destination.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Error making the logging directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error removing the previous log file {path:?}: {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error opening the log file {path:?}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Logger already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    Connection(#[from] blob_producer_kafka::Error),

    #[error("Cannot read input file {path:?}: {source}")]
    InputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
