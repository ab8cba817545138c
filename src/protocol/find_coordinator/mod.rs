//! Locates the broker coordinating a consumer group.
//!
//! The offsets for a given consumer group are maintained by a specific
//! broker called the group coordinator: a consumer needs to issue its
//! offset commit and fetch requests to that broker. This request, sent
//! to any broker, answers which one that is.

pub mod request;
pub mod response;
