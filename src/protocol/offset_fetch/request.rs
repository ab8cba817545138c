//! Encoding and creation for Offset Fetch requests.
//!
//! ### Example
//! ```rust
//! let mut offset_request = protocol::OffsetFetchRequest::new(correlation_id, client_id, group_id);
//! offset_request.add(topic_name, partition_index);
//! let offset_response = coordinator_conn.offset_fetch(offset_request).await?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! OffsetFetch Request (Version: 2) => group_id [topics]
//!   group_id => STRING
//!   topics => name [partition_indexes]
//!     name => STRING
//!     partition_indexes => INT32
//! ```

use crate::{
    encode::ToByte,
    protocol::{HeaderRequest, API_KEY_OFFSET_FETCH},
};

const API_VERSION: i16 = 2;

/// The base Offset Fetch request object.
///
/// ### Example
/// ```rust
/// let mut offset_request = protocol::OffsetFetchRequest::new(correlation_id, client_id, group_id);
/// offset_request.add(topic_name, partition_index);
/// let offset_response = coordinator_conn.offset_fetch(offset_request).await?;
/// ```
#[derive(Debug)]
pub struct OffsetFetchRequest<'a> {
    pub header: HeaderRequest<'a>,
    /// The unique group identifier.
    pub group_id: &'a str,
    /// The topics to fetch offsets for.
    pub topics: Vec<Topic<'a>>,
}

/// The topics to fetch offsets for.
#[derive(Debug)]
pub struct Topic<'a> {
    /// The topic name.
    pub name: &'a str,
    /// The partition indexes to fetch offsets for.
    pub partition_indexes: Vec<i32>,
}

impl<'a> OffsetFetchRequest<'a> {
    pub fn new(correlation_id: i32, client_id: &'a str, group_id: &'a str) -> Self {
        let header =
            HeaderRequest::new(API_KEY_OFFSET_FETCH, API_VERSION, correlation_id, client_id);
        Self {
            header,
            group_id,
            topics: vec![],
        }
    }

    pub fn add(&mut self, topic_name: &'a str, partition_index: i32) {
        match self
            .topics
            .iter_mut()
            .find(|topic| topic.name == topic_name)
        {
            None => self.topics.push(Topic {
                name: topic_name,
                partition_indexes: vec![partition_index],
            }),
            Some(topic) => {
                if !topic.partition_indexes.contains(&partition_index) {
                    topic.partition_indexes.push(partition_index);
                }
            }
        }
    }
}

impl<'a> ToByte for OffsetFetchRequest<'a> {
    fn encode<T: bytes::BufMut>(&self, buffer: &mut T) -> crate::error::Result<()> {
        tracing::trace!("Encoding OffsetFetchRequest {:?}", self);
        self.header.encode(buffer)?;
        self.group_id.encode(buffer)?;
        self.topics.encode(buffer)?;
        Ok(())
    }
}

impl<'a> ToByte for Topic<'a> {
    fn encode<T: bytes::BufMut>(&self, buffer: &mut T) -> crate::error::Result<()> {
        self.name.encode(buffer)?;
        self.partition_indexes.encode(buffer)?;
        Ok(())
    }
}
