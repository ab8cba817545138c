//! Describes the currently available brokers, their host and port
//! information, and gives information about which broker hosts
//! which partitions.
//!
//! This API answers the following questions:
//! - What topics exist?
//! - How many partitions does each topic have?
//! - Which broker is currently the leader for each partition?
//! - What is the host and port for each of these brokers?
//!
//! This is the only request that can be addressed to any broker
//! in the cluster.
//!
//! Since there may be many topics the client can give an
//! optional list of topic names in order to only return metadata
//! for a subset of topics.
//!
//! Metadata is the one API whose version is negotiated: the request body
//! is identical across versions 0 through 3, but the response grows new
//! fields at versions 1, 2, and 3, so the parser takes the version that
//! went out on the request.

pub mod request;
pub mod response;

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use nombytes::NomBytes;

    use super::*;
    use crate::{encode::ToByte, error::KafkaCode};

    #[test]
    fn encode() {
        let b = [
            0, 3, 0, 0, 0, 0, 0, 1, 0, 4, 114, 117, 115, 116, 0, 0, 0, 1, 0, 9, 112, 117, 114, 99,
            104, 97, 115, 101, 115,
        ];
        let correlation_id = 1;
        let client_id = "rust";
        let topics = vec!["purchases"];

        let req = request::MetadataRequest::new(correlation_id, client_id, &topics);

        let mut buffer: Vec<u8> = vec![];
        req.encode(&mut buffer).unwrap();

        assert_eq!(buffer, b);
    }

    #[test]
    fn parse_v0() {
        let buf = [
            0, 0, 0, 1, // one broker
            0, 0, 0, 2, 0, 9, 108, 111, 99, 97, 108, 104, 111, 115, 116, 0, 0, 35, 132,
            0, 0, 0, 1, // one topic
            0, 0, 0, 9, 112, 117, 114, 99, 104, 97, 115, 101, 115, 0, 0, 0, 1, // one partition
            0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2,
        ];

        let (_, parsed) =
            response::parse_metadata_response(0)(NomBytes::from(buf.as_slice())).unwrap();
        assert_eq!(
            parsed,
            response::MetadataResponse {
                throttle_time_ms: None,
                brokers: vec![response::Broker {
                    node_id: 2,
                    host: Bytes::from("localhost"),
                    port: 9092,
                    rack: None,
                }],
                cluster_id: None,
                controller_id: None,
                topics: vec![response::Topic {
                    error_code: KafkaCode::None,
                    name: Bytes::from("purchases"),
                    is_internal: None,
                    partitions: vec![response::Partition {
                        error_code: KafkaCode::None,
                        partition_index: 0,
                        leader_id: 2,
                        replica_nodes: vec![2],
                        isr_nodes: vec![2],
                    }],
                }],
            }
        );
    }

    #[test]
    fn parse_v3() {
        let buf = [
            0, 0, 0, 9, // throttle time
            0, 0, 0, 1, // one broker
            0, 0, 0, 2, 0, 9, 108, 111, 99, 97, 108, 104, 111, 115, 116, 0, 0, 35, 132, //
            0, 2, b'r', b'k', // rack
            255, 255, // null cluster id
            0, 0, 0, 2, // controller id
            0, 0, 0, 1, // one topic
            0, 0, 0, 9, 112, 117, 114, 99, 104, 97, 115, 101, 115, //
            1, // internal
            0, 0, 0, 0, // no partitions
        ];

        let (_, parsed) =
            response::parse_metadata_response(3)(NomBytes::from(buf.as_slice())).unwrap();
        assert_eq!(parsed.throttle_time_ms, Some(9));
        assert_eq!(parsed.brokers[0].rack, Some(Bytes::from("rk")));
        assert_eq!(parsed.cluster_id, None);
        assert_eq!(parsed.controller_id, Some(2));
        assert_eq!(parsed.topics[0].is_internal, Some(true));
    }
}
