//! Bytecode protocol requests & responses.
//!
//! This module implements the bytecode protocol outlined in the
//! [Kafka Documentation](https://kafka.apache.org/protocol.html)
//!
//! The module is set up as a list of message pairs containing two files
//! each corresponding to the request and response.
//!
//! The request files hold the logic for creating and encoding structs that
//! will be sent to the broker. The response files hold the logic for parsing
//! and processing the messages coming from the broker.
//!
//! Every request is framed the same way on the wire: a 4-byte big-endian
//! length, then the header (API key, API version, correlation ID, client
//! ID) and the body. Every response is a 4-byte big-endian length, a 4-byte
//! correlation ID, and an opaque body that the per-API parsers understand.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    encode::ToByte,
    error::{Error, Result},
};

pub mod api_versions;
pub mod commit_offset;
pub mod fetch;
pub mod find_coordinator;
pub mod list_offsets;
pub mod metadata;
pub mod offset_fetch;
pub mod produce;

// re exporting these for ease
pub use self::{
    api_versions::{
        request::ApiVersionsRequest,
        response::{ApiVersionRange, ApiVersionsResponse},
    },
    commit_offset::{request::OffsetCommitRequest, response::OffsetCommitResponse},
    fetch::{request::FetchRequest, response::FetchResponse},
    find_coordinator::{request::FindCoordinatorRequest, response::FindCoordinatorResponse},
    list_offsets::{request::ListOffsetsRequest, response::ListOffsetsResponse},
    metadata::{request::MetadataRequest, response::MetadataResponse},
    offset_fetch::{request::OffsetFetchRequest, response::OffsetFetchResponse},
    produce::{
        request::{Attributes, Compression, Message, ProduceRequest},
        response::ProduceResponse,
    },
};

pub const API_KEY_PRODUCE: i16 = 0;
pub const API_KEY_FETCH: i16 = 1;
pub const API_KEY_LIST_OFFSETS: i16 = 2;
pub const API_KEY_METADATA: i16 = 3;
pub const API_KEY_OFFSET_COMMIT: i16 = 8;
pub const API_KEY_OFFSET_FETCH: i16 = 9;
pub const API_KEY_FIND_COORDINATOR: i16 = 10;
pub const API_KEY_API_VERSIONS: i16 = 18;

/// Produce requests with this acks value are fire-and-forget: the broker
/// sends no response for them.
pub const REQUIRED_ACKS_NONE: i16 = 0;

#[derive(Debug, Clone)]
pub struct HeaderRequest<'a> {
    /// The API key of this request.
    pub api_key: i16,
    /// The API version of this request.
    pub api_version: i16,
    /// The correlation ID of this request.
    pub correlation_id: i32,
    /// The client ID string.
    pub client_id: &'a str,
}

impl<'a> HeaderRequest<'a> {
    /// Create new header request.
    ///
    /// This goes at the beginning of every single request.
    pub fn new(
        api_key: i16,
        api_version: i16,
        correlation_id: i32,
        client_id: &'a str,
    ) -> HeaderRequest {
        HeaderRequest {
            api_key,
            api_version,
            correlation_id,
            client_id,
        }
    }
}

impl<'a> ToByte for HeaderRequest<'a> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.api_key.encode(buffer)?;
        self.api_version.encode(buffer)?;
        self.correlation_id.encode(buffer)?;
        self.client_id.encode(buffer)?;
        Ok(())
    }
}

/// An API version range, either advertised by the broker or supported by
/// this driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedVersion {
    pub min: i16,
    pub max: i16,
}

/// The version ranges this driver can encode and decode per API.
///
/// Metadata is the only negotiated API; everything else is pinned at the
/// version its codec implements.
pub fn supported_by_driver(api_key: i16) -> SupportedVersion {
    match api_key {
        API_KEY_METADATA => SupportedVersion { min: 0, max: 3 },
        API_KEY_PRODUCE => SupportedVersion { min: 3, max: 3 },
        API_KEY_FETCH => SupportedVersion { min: 4, max: 4 },
        API_KEY_LIST_OFFSETS => SupportedVersion { min: 1, max: 1 },
        API_KEY_OFFSET_COMMIT | API_KEY_OFFSET_FETCH => SupportedVersion { min: 2, max: 2 },
        _ => SupportedVersion { min: 0, max: 0 },
    }
}

/// The highest version supported by both sides, or 0 when the ranges do
/// not overlap. Version 0 is what brokers assume before any negotiation.
pub fn best_version(driver: SupportedVersion, broker: SupportedVersion) -> i16 {
    let min = driver.min.max(broker.min);
    let max = driver.max.min(broker.max);
    if max >= min {
        max
    } else {
        0
    }
}

/// Read one framed response: the length prefix, then the correlation ID,
/// then the body. The returned payload starts right after the correlation
/// ID; the per-API parsers never see the outer framing.
pub(crate) async fn read_response<R>(reader: &mut R) -> Result<(i32, Bytes)>
where
    R: AsyncRead + Unpin,
{
    let length = reader
        .read_u32()
        .await
        .map_err(|e| Error::IoError(e.kind()))?;

    tracing::trace!("Reading {} bytes", length);
    let mut buffer = BytesMut::zeroed(length as usize);
    reader
        .read_exact(&mut buffer)
        .await
        .map_err(|e| Error::IoError(e.kind()))?;

    let mut payload = buffer.freeze();
    if payload.len() < 4 {
        return Err(Error::ParsingError(payload));
    }
    let correlation_id = payload.get_i32();
    Ok((correlation_id, payload))
}
