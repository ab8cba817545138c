//! Error types for connection handling and the bytecode protocol.

use bytes::Bytes;
use num_derive::FromPrimitive;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// All the ways a connection or a protocol exchange can fail.
///
/// Once a connection has gone terminal, the error that caused the
/// transition is sticky: every pending and future request on that
/// connection returns a clone of it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The connection was shut down by an explicit close.
    #[error("connection closed")]
    Closed,

    /// A waiter is already registered under this correlation ID. The ID
    /// source hands out unique values, so hitting this is a bug.
    #[error("correlation conflict: {0}")]
    CorrelationConflict(i32),

    /// A value did not fit the wire representation while encoding.
    #[error("encoding error")]
    EncodingError,

    /// A wire string was not valid UTF-8.
    #[error("decoding UTF-8 error")]
    DecodingUtf8Error,

    /// The underlying socket failed.
    #[error("io error: {0:?}")]
    IoError(std::io::ErrorKind),

    /// The broker reported a protocol-level error code.
    #[error("kafka error: {0:?}")]
    KafkaError(KafkaCode),

    /// Response bytes did not parse for the expected API and version.
    #[error("parsing error: {0:?}")]
    ParsingError(Bytes),

    /// TLS configuration could not be built from the provided PEM input.
    #[error("tls error: {0}")]
    Tls(String),
}

/// Numeric error codes returned by the broker in responses.
///
/// See the [Kafka protocol error docs](https://kafka.apache.org/protocol.html#protocol_error_codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum KafkaCode {
    /// The server experienced an unexpected error when processing the request.
    Unknown = -1,
    None = 0,
    /// The requested offset is not within the range of offsets maintained by the server.
    OffsetOutOfRange = 1,
    /// This message has failed its CRC checksum, exceeds the valid size, has a null key for a compacted topic, or is otherwise corrupt.
    CorruptMessage = 2,
    /// This server does not host this topic-partition.
    UnknownTopicOrPartition = 3,
    /// The requested fetch size is invalid.
    InvalidFetchSize = 4,
    /// There is no leader for this topic-partition as we are in the middle of a leadership election.
    LeaderNotAvailable = 5,
    /// This server is not the leader for that topic-partition.
    NotLeaderForPartition = 6,
    /// The request timed out.
    RequestTimedOut = 7,
    /// The broker is not available.
    BrokerNotAvailable = 8,
    /// The replica is not available for the requested topic-partition.
    ReplicaNotAvailable = 9,
    /// The request included a message larger than the max message size the server will accept.
    MessageTooLarge = 10,
    /// The controller moved to another broker.
    StaleControllerEpoch = 11,
    /// The metadata field of the offset request was too large.
    OffsetMetadataTooLarge = 12,
    /// The server disconnected before a response was received.
    NetworkException = 13,
    /// The coordinator is loading and hence can't process requests.
    CoordinatorLoadInProgress = 14,
    /// The coordinator is not available.
    CoordinatorNotAvailable = 15,
    /// This is not the correct coordinator.
    NotCoordinator = 16,
    /// The request attempted to perform an operation on an invalid topic.
    InvalidTopic = 17,
    /// The request included message batch larger than the configured segment size on the server.
    RecordListTooLarge = 18,
    /// Messages are rejected since there are fewer in-sync replicas than required.
    NotEnoughReplicas = 19,
    /// Messages are written to the log, but to fewer in-sync replicas than required.
    NotEnoughReplicasAfterAppend = 20,
    /// Produce request specified an invalid value for required acks.
    InvalidRequiredAcks = 21,
    /// Specified group generation id is not valid.
    IllegalGeneration = 22,
    /// The group member's supported protocols are incompatible with those of existing members or first group member tried to join with empty protocol type or empty protocol list.
    InconsistentGroupProtocol = 23,
    /// The configured groupId is invalid.
    InvalidGroupId = 24,
    /// The coordinator is not aware of this member.
    UnknownMemberId = 25,
    /// The session timeout is not within the range allowed by the broker.
    InvalidSessionTimeout = 26,
    /// The group is rebalancing, so a rejoin is needed.
    RebalanceInProgress = 27,
    /// The committing offset data size is not valid.
    InvalidCommitOffsetSize = 28,
    /// Topic authorization failed.
    TopicAuthorizationFailed = 29,
    /// Group authorization failed.
    GroupAuthorizationFailed = 30,
    /// Cluster authorization failed.
    ClusterAuthorizationFailed = 31,
    /// The timestamp of the message is out of acceptable range.
    InvalidTimestamp = 32,
    /// The broker does not support the requested SASL mechanism.
    UnsupportedSaslMechanism = 33,
    /// Request is not valid given the current SASL state.
    IllegalSaslState = 34,
    /// The version of API is not supported.
    UnsupportedVersion = 35,
}
