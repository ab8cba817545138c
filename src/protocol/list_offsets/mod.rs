//! Finds the offsets available for a topic partition.
//!
//! Used to ask for all messages before a certain time (ms). There are
//! two special values: -1 for the latest offset (the offset of the next
//! coming message) and -2 for the earliest available offset. Because
//! offsets are pulled in descending order, asking for the earliest
//! offset always returns a single element.

pub mod request;
pub mod response;
