//! # Gregor
//! Rust-native multiplexed connection for the Apache Kafka protocol.
//!
//! This crate owns exactly one socket per [`Connection`](prelude::Connection)
//! and lets any number of tasks issue Kafka requests over it at the same
//! time. Requests are pipelined on the wire; a background reader pairs
//! every response with its caller by correlation ID, so no caller ever
//! sees anyone else's response, even when the broker answers out of
//! order.
//!
//! ## Goals
//! - Be the bottom building block for brokers-and-clusters layers: no
//!   reconnects, no retries, no topic caches, just one well-behaved socket
//! - Leverage best in class libraries such as Tokio and Nom to do the
//!   heavy lifting
//! - Fail loudly and exactly once: the first socket error cancels every
//!   pending request with the same sticky error
//!
//! ## Getting started
//! Connect, negotiate versions, and ask for metadata:
//!
//! ```rust
//! use std::time::Duration;
//!
//! use gregor::prelude::*;
//!
//! let addrs = [BrokerAddress {
//!     host: "127.0.0.1".to_string(),
//!     port: 9092,
//! }];
//! let conn = Connection::connect_tcp(&addrs, Duration::from_secs(5), None).await?;
//!
//! // seed the version table so later requests go out at the best
//! // version both sides speak
//! conn.api_versions(protocol::ApiVersionsRequest::new(0, "my-client"))
//!     .await?;
//!
//! let topics = ["my-topic"];
//! let metadata = conn
//!     .metadata(protocol::MetadataRequest::new(0, "my-client", &topics))
//!     .await?;
//! println!("{:?}", metadata.brokers);
//!
//! conn.close().await?;
//! ```
//!
//! Produce fire-and-forget, then read back:
//!
//! ```rust
//! let mut produce = protocol::ProduceRequest::new(0, 1000, 0, "my-client");
//! produce.add(
//!     "my-topic",
//!     0,
//!     protocol::Message::new(None, Some(bytes::Bytes::from_static(b"hi"))),
//! );
//! // acks = 0: returns Ok(None) as soon as the bytes are on the socket
//! let response = conn.produce(produce).await?;
//! assert!(response.is_none());
//!
//! let mut fetch = protocol::FetchRequest::new(0, "my-client", 500, 1, 1_000_000, 0);
//! fetch.add("my-topic", 0, 0, 100_000);
//! let fetched = conn.fetch(fetch).await?;
//! println!("{} records", fetched.record_count());
//! ```
//!
//! ## Resources
//! - [Kafka Protocol Spec](https://kafka.apache.org/protocol.html)
//! - [Confluence Docs](https://cwiki.apache.org/confluence/display/KAFKA/A+Guide+To+The+Kafka+Protocol)

mod connection;
mod encode;
mod error;
mod network;
mod parser;
mod protocol;

pub mod prelude {
    //! Main export of the connection, its error types, and the protocol
    //! building blocks.
    //!
    //! The [`Connection`] is the whole public surface at runtime: build
    //! request structs from the [`protocol`] module, hand them to the
    //! matching connection method, get typed responses back. Everything
    //! else here exists so those requests and responses can be
    //! constructed and picked apart.

    pub use crate::connection::Connection;
    pub use crate::error::{Error, KafkaCode, Result};
    pub use crate::network::BrokerAddress;

    pub use bytes;

    pub mod encode {
        pub use crate::encode::*;
    }

    pub mod protocol {
        pub use crate::protocol::*;
    }
}
