//! Fetches the committed offsets for a consumer group.
//!
//! If there is no offset associated with a topic partition under a
//! consumer group the broker does not set an error code, since it is not
//! really an error; it returns empty metadata and an offset of -1.

pub mod request;
pub mod response;
