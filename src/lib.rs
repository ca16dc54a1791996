//! blob-producer library
//!
//! Streams one binary file to one Kafka topic: the file is read in
//! fixed-size blocks, each block is published as one message, and the whole
//! file is sent again after a fixed delay until the process is asked to stop.
//!
//! # Components
//!
//! - [`config`] - splits `key=value` settings between the broker's global
//!   and topic configuration and the application's own settings, then applies
//!   command line overrides
//! - [`streamer`] - the pass loop, its counters, and the producer lifecycle
//!   around it
//! - [`shutdown`] - SIGINT/SIGTERM handling through a shared flag
//! - [`logging`] - console and file log setup
//!
//! # CLI Usage
//!
//! ```bash
//! # Stream a file using the settings in producer.properties
//! blob-producer -c producer.properties -F data/messages.uper
//!
//! # Override the broker and topic, publish 512-byte blocks to partition 0
//! blob-producer -c producer.properties -F data/messages.uper \
//!   -b localhost:9092 -t topic.Blocks -p 0 -B 512
//!
//! # Print the effective configuration and exit
//! blob-producer -c producer.properties -F data/messages.uper -C
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod shutdown;
pub mod streamer;

pub use cli::Cli;
pub use config::{CliOverrides, ConfigurationResolver, ResolvedConfig};
pub use error::{ConfigError, Error, LoggingError, Result};
pub use shutdown::{install_signal_handlers, ShutdownFlag};
pub use streamer::{stream_file, BlockStreamer, Counters, StreamerOptions};
