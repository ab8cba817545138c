//! Parsing and processing for Find Coordinator responses.
//!
//! ### Example
//! ```rust
//! let find_coordinator_response = protocol::FindCoordinatorResponse::try_from(response_bytes)?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! FindCoordinator Response (Version: 0) => error_code node_id host port
//!   error_code => INT16
//!   node_id => INT32
//!   host => STRING
//!   port => INT32
//! ```

use bytes::Bytes;
use nom::{number::complete::be_i32, IResult};
use nombytes::NomBytes;

use crate::{
    error::{Error, KafkaCode, Result},
    parser,
};

/// The base Find Coordinator response object.
///
/// ### Example
/// ```rust
/// let find_coordinator_response = protocol::FindCoordinatorResponse::try_from(response_bytes)?;
/// ```
#[derive(Debug, PartialEq)]
pub struct FindCoordinatorResponse {
    /// The error code, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// The node ID of the coordinator.
    pub node_id: i32,
    /// The host of the coordinator.
    pub host: Bytes,
    /// The port of the coordinator.
    pub port: i32,
}

impl TryFrom<Bytes> for FindCoordinatorResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        tracing::trace!("Parsing FindCoordinatorResponse {:?}", s);
        let (_, find_coordinator) = parse_find_coordinator_response(NomBytes::new(s.clone()))
            .map_err(|err| {
                tracing::error!("ERROR: Failed parsing FindCoordinatorResponse {:?}", err);
                tracing::error!("ERROR: FindCoordinatorResponse Bytes {:?}", s);
                Error::ParsingError(s)
            })?;
        tracing::trace!("Parsed FindCoordinatorResponse {:?}", find_coordinator);
        Ok(find_coordinator)
    }
}

pub fn parse_find_coordinator_response(s: NomBytes) -> IResult<NomBytes, FindCoordinatorResponse> {
    let (s, error_code) = parser::parse_kafka_code(s)?;
    let (s, node_id) = be_i32(s)?;
    let (s, host) = parser::parse_string(s)?;
    let (s, port) = be_i32(s)?;

    Ok((
        s,
        FindCoordinatorResponse {
            error_code,
            node_id,
            host,
            port,
        },
    ))
}
