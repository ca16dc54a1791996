//! The block streaming loop.
//!
//! One pass reads the input file from the start in fixed-size blocks and
//! publishes each block as one message. Passes repeat, separated by a fixed
//! delay, until the shutdown flag is seen between passes. A publish failure
//! abandons the rest of the pass; the next pass starts again at offset 0.

use crate::config::{ResolvedConfig, DEFAULT_BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::shutdown::ShutdownFlag;
use blob_producer_kafka::{
    create_producer, create_topic, Partition, ProducerHandle, Publisher, DEFAULT_CLOSE_TIMEOUT,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, trace, warn};

/// Delay between the end of one pass and the start of the next.
pub const DEFAULT_PASS_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamerOptions {
    pub block_size: usize,
    pub pass_delay: Duration,
}

impl Default for StreamerOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            pass_delay: DEFAULT_PASS_DELAY,
        }
    }
}

/// Totals accumulated over the life of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub messages: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamerState {
    Running,
    /// The shutdown flag was seen; no further pass will start.
    Stopping,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every block up to end of file was published.
    Completed,
    /// A publish failed; the remaining blocks were skipped.
    Abandoned,
}

/// What a single pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub outcome: PassOutcome,
    pub messages: u64,
    pub bytes: u64,
}

/// Streams one input file to a [`Publisher`], pass after pass.
pub struct BlockStreamer<P> {
    publisher: P,
    input_file: PathBuf,
    partition: Partition,
    options: StreamerOptions,
    shutdown: ShutdownFlag,
    buffer: Vec<u8>,
    counters: Counters,
    passes: u64,
    state: StreamerState,
}

impl<P: Publisher> BlockStreamer<P> {
    pub fn new(
        publisher: P,
        input_file: impl Into<PathBuf>,
        partition: Partition,
        options: StreamerOptions,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            publisher,
            input_file: input_file.into(),
            partition,
            buffer: vec![0; options.block_size],
            options,
            shutdown,
            counters: Counters::default(),
            passes: 0,
            state: StreamerState::Running,
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn state(&self) -> StreamerState {
        self.state
    }

    /// Run passes until shutdown is requested.
    ///
    /// The flag is checked only before each pass, so a pass in progress always
    /// runs to its end (or its first publish failure). Failing to open or
    /// read the input file ends the loop with an error.
    pub async fn run(&mut self) -> Result<Counters> {
        loop {
            if self.shutdown.is_stopped() {
                self.state = StreamerState::Stopping;
                debug!("Shutdown requested; no further passes");
                break;
            }

            let report = self.run_pass().await?;
            match report.outcome {
                PassOutcome::Completed => info!(
                    "Finished producing the entire file ({} blocks, {} bytes)",
                    report.messages, report.bytes
                ),
                PassOutcome::Abandoned => info!(
                    "Abandoned pass after {} blocks, {} bytes",
                    report.messages, report.bytes
                ),
            }

            info!(
                "Sleeping for {:?} after file round {}",
                self.options.pass_delay, self.passes
            );
            tokio::time::sleep(self.options.pass_delay).await;
        }

        self.state = StreamerState::Stopped;
        Ok(self.counters)
    }

    /// Publish the whole input file once, starting at offset 0.
    pub async fn run_pass(&mut self) -> Result<PassReport> {
        let mut file = File::open(&self.input_file)
            .await
            .map_err(|source| input_error(&self.input_file, source))?;
        self.passes += 1;

        let mut report = PassReport {
            outcome: PassOutcome::Completed,
            messages: 0,
            bytes: 0,
        };

        loop {
            let bytes_read = read_block(&mut file, &mut self.buffer)
                .await
                .map_err(|source| input_error(&self.input_file, source))?;
            if bytes_read == 0 {
                break;
            }

            let block = &self.buffer[..bytes_read];
            match self.publisher.publish(self.partition, block) {
                Ok(()) => {
                    report.messages += 1;
                    report.bytes += bytes_read as u64;
                    self.counters.messages += 1;
                    self.counters.bytes += bytes_read as u64;
                    trace!("Production success of {} bytes", bytes_read);
                }
                Err(e) => {
                    error!(
                        "Production failure code {} after reading {} bytes: {}",
                        e.error_code_str(),
                        bytes_read,
                        e
                    );
                    report.outcome = PassOutcome::Abandoned;
                    break;
                }
            }
        }

        Ok(report)
    }
}

fn input_error(path: &Path, source: std::io::Error) -> Error {
    Error::InputFile {
        path: path.to_path_buf(),
        source,
    }
}

/// Fill `buf` from `file`, returning fewer bytes only at end of file.
async fn read_block(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Create the producer and topic from `config`, stream until shutdown, then
/// release the topic and close the producer with a bounded wait.
pub async fn stream_file(config: &ResolvedConfig, shutdown: ShutdownFlag) -> Result<Counters> {
    let producer = create_producer(&config.global).inspect_err(|e| {
        error!("Failed to create producer with error: {}", e);
    })?;

    // The topic handle is dropped inside, before the producer is closed.
    let streamed = stream_to_topic(&producer, config, shutdown).await;
    close_producer(producer).await;
    let counters = streamed?;

    info!("Operations complete; shutting down...");
    info!(
        "Published {} binary blocks of size {} for {} bytes",
        counters.messages, config.block_size, counters.bytes
    );
    Ok(counters)
}

async fn stream_to_topic(
    producer: &ProducerHandle,
    config: &ResolvedConfig,
    shutdown: ShutdownFlag,
) -> Result<Counters> {
    let topic = create_topic(producer, &config.topic_name, &config.topic).inspect_err(|e| {
        error!("Failed to create topic {}: {}", config.topic_name, e);
    })?;
    info!("Producer created using topic: {}", topic.name());

    let options = StreamerOptions {
        block_size: config.block_size,
        ..Default::default()
    };
    let mut streamer = BlockStreamer::new(
        &topic,
        &config.input_file,
        config.partition,
        options,
        shutdown,
    );
    streamer.run().await
}

/// Flush and release the client off the async workers; the flush blocks
/// for up to [`DEFAULT_CLOSE_TIMEOUT`].
async fn close_producer(producer: ProducerHandle) {
    let closed = tokio::task::spawn_blocking(move || producer.close(DEFAULT_CLOSE_TIMEOUT)).await;
    if let Err(e) = closed {
        warn!("Producer close did not complete: {}", e);
    }
}
