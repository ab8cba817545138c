//! Fetches record batches from the broker.
//!
//! The broker hands back whole record batches for efficiency; it never
//! splits or decompresses a batch to honor the requested offset. A batch
//! can therefore begin before the offset the consumer asked for, and the
//! connection trims those leading records off after decoding.

pub mod request;
pub mod response;
