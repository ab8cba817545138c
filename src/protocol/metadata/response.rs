//! Parsing and processing for Metadata responses.
//!
//! The response contains metadata for each partition, with
//! partitions grouped together by topic. This metadata
//! refers to brokers by their broker id. The brokers each
//! have a host and port.
//!
//! ### Example
//! ```rust
//! let metadata_response = protocol::MetadataResponse::parse(response_bytes, version)?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! Metadata Response (Version: 3) => throttle_time_ms [brokers] cluster_id controller_id [topics]
//!   throttle_time_ms => INT32                 (v3+)
//!   brokers => node_id host port rack
//!     node_id => INT32
//!     host => STRING
//!     port => INT32
//!     rack => NULLABLE_STRING                 (v1+)
//!   cluster_id => NULLABLE_STRING             (v2+)
//!   controller_id => INT32                    (v1+)
//!   topics => error_code name is_internal [partitions]
//!     error_code => INT16
//!     name => STRING
//!     is_internal => BOOLEAN                  (v1+)
//!     partitions => error_code partition_index leader_id [replica_nodes] [isr_nodes]
//!       error_code => INT16
//!       partition_index => INT32
//!       leader_id => INT32
//!       replica_nodes => INT32
//!       isr_nodes => INT32
//! ```
//!
//! Fields marked with a version are absent below it; the parser is
//! driven by the version the request was issued at.

use bytes::Bytes;
use nom::{
    number::complete::{be_i32, be_i8},
    IResult,
};
use nombytes::NomBytes;

use crate::{
    error::{Error, KafkaCode, Result},
    parser,
};

/// The base Metadata response object.
///
/// ### Example
/// ```rust
/// let metadata_response = protocol::MetadataResponse::parse(response_bytes, version)?;
/// ```
#[derive(Debug, Default, PartialEq)]
pub struct MetadataResponse {
    /// Throttle duration in milliseconds, present from version 3.
    pub throttle_time_ms: Option<i32>,
    /// Each broker in the response.
    pub brokers: Vec<Broker>,
    /// The cluster ID, present from version 2.
    pub cluster_id: Option<Bytes>,
    /// The ID of the controller broker, present from version 1.
    pub controller_id: Option<i32>,
    /// Each topic in the response.
    pub topics: Vec<Topic>,
}

impl MetadataResponse {
    pub fn parse(s: Bytes, version: i16) -> Result<Self> {
        tracing::trace!("Parsing MetadataResponse {:?}", s);
        let (_, metadata) =
            parse_metadata_response(version)(NomBytes::new(s.clone())).map_err(|err| {
                tracing::error!("ERROR: Failed parsing MetadataResponse {:?}", err);
                tracing::error!("ERROR: MetadataResponse Bytes {:?}", s);
                Error::ParsingError(s)
            })?;
        tracing::trace!("Parsed MetadataResponse {:?}", metadata);
        Ok(metadata)
    }

    pub fn is_error(&self) -> Result<()> {
        self.topics
            .iter()
            .map(|topic| topic.is_error())
            .collect::<Result<Vec<()>>>()?;

        Ok(())
    }
}

pub fn parse_metadata_response(
    version: i16,
) -> impl Fn(NomBytes) -> IResult<NomBytes, MetadataResponse> {
    move |s| {
        let (s, throttle_time_ms) = if version >= 3 {
            let (s, throttle_time_ms) = be_i32(s)?;
            (s, Some(throttle_time_ms))
        } else {
            (s, None)
        };
        let (s, brokers) = parser::parse_array(parse_broker(version))(s)?;
        let (s, cluster_id) = if version >= 2 {
            let (s, cluster_id) = parser::parse_nullable_string(s)?;
            (s, cluster_id)
        } else {
            (s, None)
        };
        let (s, controller_id) = if version >= 1 {
            let (s, controller_id) = be_i32(s)?;
            (s, Some(controller_id))
        } else {
            (s, None)
        };
        let (s, topics) = parser::parse_array(parse_topic(version))(s)?;

        Ok((
            s,
            MetadataResponse {
                throttle_time_ms,
                brokers,
                cluster_id,
                controller_id,
                topics,
            },
        ))
    }
}

/// Each broker in the response.
#[derive(Debug, Clone, PartialEq)]
pub struct Broker {
    /// The broker ID.
    pub node_id: i32,
    /// The broker hostname.
    pub host: Bytes,
    /// The broker port.
    pub port: i32,
    /// The rack of the broker, present from version 1.
    pub rack: Option<Bytes>,
}

fn parse_broker(version: i16) -> impl Fn(NomBytes) -> IResult<NomBytes, Broker> + Copy {
    move |s| {
        let (s, node_id) = be_i32(s)?;
        let (s, host) = parser::parse_string(s)?;
        let (s, port) = be_i32(s)?;
        let (s, rack) = if version >= 1 {
            let (s, rack) = parser::parse_nullable_string(s)?;
            (s, rack)
        } else {
            (s, None)
        };

        Ok((
            s,
            Broker {
                node_id,
                host,
                port,
                rack,
            },
        ))
    }
}

/// Each topic in the response.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    /// The topic error, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// The topic name.
    pub name: Bytes,
    /// Whether the topic is internal to the broker, present from version 1.
    pub is_internal: Option<bool>,
    /// Each partition in the topic.
    pub partitions: Vec<Partition>,
}

impl Topic {
    pub fn is_error(&self) -> Result<()> {
        if self.error_code != KafkaCode::None {
            tracing::error!(
                "ERROR: Kafka Error {:?} in topic {:?}",
                self.error_code,
                self.name
            );
            return Err(Error::KafkaError(self.error_code));
        }

        self.partitions
            .iter()
            .map(|partition| partition.is_error(self.name.clone()))
            .collect::<Result<Vec<()>>>()?;

        Ok(())
    }
}

fn parse_topic(version: i16) -> impl Fn(NomBytes) -> IResult<NomBytes, Topic> + Copy {
    move |s| {
        let (s, error_code) = parser::parse_kafka_code(s)?;
        let (s, name) = parser::parse_string(s)?;
        let (s, is_internal) = if version >= 1 {
            let (s, is_internal) = be_i8(s)?;
            (s, Some(is_internal != 0))
        } else {
            (s, None)
        };
        let (s, partitions) = parser::parse_array(parse_partition)(s)?;

        Ok((
            s,
            Topic {
                error_code,
                name,
                is_internal,
                partitions,
            },
        ))
    }
}

/// Each partition in the topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// The partition error, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// The partition index.
    pub partition_index: i32,
    /// The ID of the leader broker.
    pub leader_id: i32,
    /// The set of all nodes that host this partition.
    pub replica_nodes: Vec<i32>,
    /// The set of nodes that are in sync with the leader for this partition.
    pub isr_nodes: Vec<i32>,
}

impl Partition {
    pub fn is_error(&self, topic_name: Bytes) -> Result<()> {
        if self.error_code != KafkaCode::None {
            tracing::error!(
                "ERROR: Kafka Error {:?} in topic {:?} partition {}",
                self.error_code,
                topic_name,
                self.partition_index
            );
            Err(Error::KafkaError(self.error_code))
        } else {
            Ok(())
        }
    }
}

fn parse_partition(s: NomBytes) -> IResult<NomBytes, Partition> {
    let (s, error_code) = parser::parse_kafka_code(s)?;
    let (s, partition_index) = be_i32(s)?;
    let (s, leader_id) = be_i32(s)?;
    let (s, replica_nodes) = parser::parse_array(be_i32)(s)?;
    let (s, isr_nodes) = parser::parse_array(be_i32)(s)?;

    Ok((
        s,
        Partition {
            error_code,
            partition_index,
            leader_id,
            replica_nodes,
            isr_nodes,
        },
    ))
}
