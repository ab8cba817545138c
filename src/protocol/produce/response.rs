//! Parsing and processing for Produce responses.
//!
//! Note, the request needs to have a non-zero value for `required_acks`
//! to receive a response at all.
//!
//! ### Example
//! ```rust
//! let produce_response = protocol::ProduceResponse::try_from(response_bytes)?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! Produce Response (Version: 3) => [responses] throttle_time_ms
//!   responses => name [partition_responses]
//!     name => STRING
//!     partition_responses => index error_code base_offset log_append_time
//!       index => INT32
//!       error_code => INT16
//!       base_offset => INT64
//!       log_append_time => INT64
//!   throttle_time_ms => INT32
//! ```

use bytes::Bytes;
use nom::{
    number::complete::{be_i32, be_i64},
    IResult,
};
use nombytes::NomBytes;

use crate::{
    error::{Error, KafkaCode, Result},
    parser,
};

/// The base Produce response object.
///
/// ### Example
/// ```rust
/// let produce_response = protocol::ProduceResponse::try_from(response_bytes)?;
/// ```
#[derive(Debug, PartialEq)]
pub struct ProduceResponse {
    /// Each produce response.
    pub responses: Vec<Response>,
    /// The duration in milliseconds for which the request was throttled due to a quota violation, or zero if the request did not violate any quota.
    pub throttle_time_ms: i32,
}

#[derive(Debug, PartialEq)]
pub struct Response {
    /// The topic name.
    pub name: Bytes,
    /// Each partition that we produced to within the topic.
    pub partition_responses: Vec<PartitionResponse>,
}

#[derive(Debug, PartialEq)]
pub struct PartitionResponse {
    /// The partition index.
    pub index: i32,
    /// The error code, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// The base offset assigned to the first record in the batch.
    pub base_offset: i64,
    /// The broker-assigned append time, or -1 when the topic uses create time.
    pub log_append_time: i64,
}

impl TryFrom<Bytes> for ProduceResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        tracing::trace!("Parsing ProduceResponse {:?}", s);
        let (_, produce) = parse_produce_response(NomBytes::new(s.clone())).map_err(|err| {
            tracing::error!("ERROR: Failed parsing ProduceResponse {:?}", err);
            tracing::error!("ERROR: ProduceResponse Bytes {:?}", s);
            Error::ParsingError(s)
        })?;
        tracing::trace!("Parsed ProduceResponse {:?}", produce);
        Ok(produce)
    }
}

pub fn parse_produce_response(s: NomBytes) -> IResult<NomBytes, ProduceResponse> {
    let (s, responses) = parser::parse_array(parse_response)(s)?;
    let (s, throttle_time_ms) = be_i32(s)?;

    Ok((
        s,
        ProduceResponse {
            responses,
            throttle_time_ms,
        },
    ))
}

fn parse_response(s: NomBytes) -> IResult<NomBytes, Response> {
    let (s, name) = parser::parse_string(s)?;
    let (s, partition_responses) = parser::parse_array(parse_partition_response)(s)?;

    Ok((
        s,
        Response {
            name,
            partition_responses,
        },
    ))
}

fn parse_partition_response(s: NomBytes) -> IResult<NomBytes, PartitionResponse> {
    let (s, index) = be_i32(s)?;
    let (s, error_code) = parser::parse_kafka_code(s)?;
    let (s, base_offset) = be_i64(s)?;
    let (s, log_append_time) = be_i64(s)?;

    Ok((
        s,
        PartitionResponse {
            index,
            error_code,
            base_offset,
            log_append_time,
        },
    ))
}
