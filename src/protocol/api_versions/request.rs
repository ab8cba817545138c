//! Encoding and creation for ApiVersions requests.
//!
//! ### Example
//! ```rust
//! let api_versions_request = protocol::ApiVersionsRequest::new(correlation_id, client_id);
//! conn.send_request(&api_versions_request).await?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! ApiVersions Request (Version: 0) =>
//! ```
//!
//! The version 0 request is just the header; it always goes out at
//! version 0 because it is what tells us which versions the broker takes.

use bytes::BufMut;

use crate::{
    encode::ToByte,
    error::Result,
    protocol::{HeaderRequest, API_KEY_API_VERSIONS},
};

const API_VERSION: i16 = 0;

/// The base ApiVersions request object.
///
/// ### Example
/// ```rust
/// let api_versions_request = protocol::ApiVersionsRequest::new(correlation_id, client_id);
/// conn.send_request(&api_versions_request).await?;
/// ```
#[derive(Debug)]
pub struct ApiVersionsRequest<'a> {
    pub header: HeaderRequest<'a>,
}

impl<'a> ApiVersionsRequest<'a> {
    pub fn new(correlation_id: i32, client_id: &'a str) -> Self {
        Self {
            header: HeaderRequest::new(
                API_KEY_API_VERSIONS,
                API_VERSION,
                correlation_id,
                client_id,
            ),
        }
    }
}

impl<'a> ToByte for ApiVersionsRequest<'a> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.header.encode(buffer)?;
        Ok(())
    }
}
