use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("Topic '{topic}' rejected by broker: {code}")]
    Topic {
        topic: String,
        code: RDKafkaErrorCode,
    },

    #[error("Empty response from broker for {0}")]
    EmptyResponse(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// The librdkafka/broker error code behind this error, if there is one.
    pub fn code(&self) -> Option<RDKafkaErrorCode> {
        match self {
            ClientError::Kafka(err) => err.rdkafka_error_code(),
            ClientError::Topic { code, .. } => Some(*code),
            ClientError::EmptyResponse(_) | ClientError::Task(_) => None,
        }
    }

    /// Whether retrying the same call later may succeed.
    ///
    /// A broker that is still booting refuses connections, may not resolve
    /// yet, or answers before its controller is elected. All of those show
    /// up as the codes below. Anything else (invalid topic name, bad client
    /// configuration, ...) will fail the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        if let ClientError::Kafka(KafkaError::ClientCreation(_)) = self {
            return false;
        }
        matches!(self, ClientError::EmptyResponse(_))
            || self.code().is_some_and(is_transient_code)
    }
}

pub fn is_transient_code(code: RDKafkaErrorCode) -> bool {
    matches!(
        code,
        RDKafkaErrorCode::BrokerTransportFailure
            | RDKafkaErrorCode::Resolve
            | RDKafkaErrorCode::AllBrokersDown
            | RDKafkaErrorCode::OperationTimedOut
            | RDKafkaErrorCode::TimedOutQueue
            | RDKafkaErrorCode::RequestTimedOut
            | RDKafkaErrorCode::NetworkException
            | RDKafkaErrorCode::BrokerNotAvailable
            | RDKafkaErrorCode::LeaderNotAvailable
            | RDKafkaErrorCode::NotController
            | RDKafkaErrorCode::CoordinatorNotAvailable
    )
}
