//! Encoding and creation for Find Coordinator requests.
//!
//! ### Example
//! ```rust
//! let find_coordinator_request =
//!     protocol::FindCoordinatorRequest::new(correlation_id, client_id, group_id);
//! let find_coordinator_response = conn.find_coordinator(find_coordinator_request).await?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! FindCoordinator Request (Version: 0) => key
//!   key => STRING
//! ```

use crate::{
    encode::ToByte,
    protocol::{HeaderRequest, API_KEY_FIND_COORDINATOR},
};

const API_VERSION: i16 = 0;

/// The base Find Coordinator request object.
///
/// ### Example
/// ```rust
/// let find_coordinator_request =
///     protocol::FindCoordinatorRequest::new(correlation_id, client_id, group_id);
/// let find_coordinator_response = conn.find_coordinator(find_coordinator_request).await?;
/// ```
#[derive(Debug)]
pub struct FindCoordinatorRequest<'a> {
    pub header: HeaderRequest<'a>,
    /// The coordinator key, usually a group ID.
    pub key: &'a str,
}

impl<'a> FindCoordinatorRequest<'a> {
    pub fn new(correlation_id: i32, client_id: &'a str, key: &'a str) -> Self {
        let header = HeaderRequest::new(
            API_KEY_FIND_COORDINATOR,
            API_VERSION,
            correlation_id,
            client_id,
        );
        Self { header, key }
    }
}

impl<'a> ToByte for FindCoordinatorRequest<'a> {
    fn encode<T: bytes::BufMut>(&self, buffer: &mut T) -> crate::error::Result<()> {
        tracing::trace!("Encoding FindCoordinatorRequest {:?}", self);
        self.header.encode(buffer)?;
        self.key.encode(buffer)?;
        Ok(())
    }
}
