//! Encoding and creation for Metadata requests.
//!
//! ### Example
//! ```rust
//! let metadata_request = protocol::MetadataRequest::new(1, client_id, &topic_names);
//! let metadata_response = conn.metadata(metadata_request).await?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! Metadata Request (Version: 0) => [topics]
//!   topics => name
//!   name => STRING
//! ```
//!
//! The body is unchanged through version 3, so the connection is free to
//! bump the header version to whatever it negotiated with the broker.

use bytes::BufMut;

use crate::{
    encode::{encode_as_array, ToByte},
    error::Result,
    protocol::{HeaderRequest, API_KEY_METADATA},
};

const API_VERSION: i16 = 0;

/// The base Metadata request object.
///
/// ### Example
/// ```rust
/// let metadata_request = protocol::MetadataRequest::new(1, client_id, &topic_names);
/// let metadata_response = conn.metadata(metadata_request).await?;
/// ```
#[derive(Debug)]
pub struct MetadataRequest<'a, T> {
    pub header: HeaderRequest<'a>,
    /// The topics to fetch metadata for.
    pub topics: &'a [T],
}

impl<'a, T: AsRef<str>> MetadataRequest<'a, T> {
    pub fn new(correlation_id: i32, client_id: &'a str, topics: &'a [T]) -> MetadataRequest<'a, T> {
        MetadataRequest {
            header: HeaderRequest::new(API_KEY_METADATA, API_VERSION, correlation_id, client_id),
            topics,
        }
    }
}

impl<'a, T: AsRef<str> + 'a> ToByte for MetadataRequest<'a, T> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.header.encode(buffer)?;
        encode_as_array(buffer, self.topics, |buffer, topic| {
            topic.as_ref().encode(buffer)
        })?;
        Ok(())
    }
}
