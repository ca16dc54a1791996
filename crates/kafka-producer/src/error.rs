use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to create producer: {0}")]
    ProducerCreation(KafkaError),

    #[error("Failed to create topic {topic}: {reason}")]
    TopicCreation { topic: String, reason: String },

    #[error("Publish failed after reading {bytes} bytes: {source}")]
    Publish {
        bytes: usize,
        #[source]
        source: KafkaError,
    },
}

impl Error {
    /// Broker-reported error code behind a failed publish, if any.
    pub fn error_code(&self) -> Option<RDKafkaErrorCode> {
        match self {
            Error::ProducerCreation(source) | Error::Publish { source, .. } => {
                source.rdkafka_error_code()
            }
            Error::TopicCreation { .. } => None,
        }
    }

    /// librdkafka's description of [`Error::error_code`], or "unknown".
    pub fn error_code_str(&self) -> String {
        self.error_code()
            .map_or_else(|| "unknown".to_string(), |code| code.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
