//! Commits a set of offsets for a consumer group.
//!
//! When this API is used for a "simple consumer" that is not part of a
//! consumer group, the generation ID must be set to -1 and the member ID
//! must be empty (not null). If there is an active consumer group with
//! the same group ID, the commit will be rejected, typically with an
//! UNKNOWN_MEMBER_ID or ILLEGAL_GENERATION error.

pub mod request;
pub mod response;
