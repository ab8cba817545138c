//! Sends message sets to the broker.
//!
//! The producer picks the acknowledgement level it needs: acks of 0
//! means fire-and-forget (the broker never responds, so the connection
//! returns as soon as the request hits the socket), 1 waits for the
//! leader, and -1 waits for the full in-sync replica set.

pub mod request;
pub mod response;

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use nombytes::NomBytes;

    use super::*;
    use crate::{encode::ToByte, error::KafkaCode};

    #[test]
    fn encode_header_and_acks() {
        let mut req = request::ProduceRequest::new(1, 1500, 7, "rust");
        req.add(
            "purchases",
            0,
            request::Message::new(None, Some(Bytes::from_static(b"money"))),
        );

        let mut buffer: Vec<u8> = vec![];
        req.encode(&mut buffer).unwrap();

        // header: api key 0, version 3, correlation id 7, client id "rust"
        assert_eq!(
            &buffer[..14],
            [0, 0, 0, 3, 0, 0, 0, 7, 0, 4, b'r', b'u', b's', b't']
        );
        // null transactional id, acks, timeout
        assert_eq!(&buffer[14..16], [255, 255]);
        assert_eq!(&buffer[16..18], [0, 1]);
        assert_eq!(&buffer[18..22], [0, 0, 5, 220]);
    }

    #[test]
    fn record_batch_round_trip() {
        let mut req = request::ProduceRequest::new(1, 1500, 7, "rust");
        req.add(
            "purchases",
            0,
            request::Message::new(None, Some(Bytes::from_static(b"money"))),
        );

        let mut buffer: Vec<u8> = vec![];
        req.encode(&mut buffer).unwrap();

        // header 14, transactional id 2, acks 2, timeout 4, topic array
        // count 4, name 11, partition array count 4, index 4, blob len 4
        let batch_bytes = &buffer[49..];
        let (_, batch) =
            crate::protocol::fetch::response::parse_record_batch(NomBytes::from(batch_bytes))
                .unwrap();

        assert_eq!(batch.base_offset, 0);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].offset_delta, 0);
        assert_eq!(batch.records[0].key_length, 0);
        assert_eq!(batch.records[0].value, Bytes::from_static(b"money"));
        assert!(batch.records[0].headers.is_empty());
    }

    #[test]
    fn parse() {
        let buf = [
            0, 0, 0, 1, // one topic
            0, 9, 112, 117, 114, 99, 104, 97, 115, 101, 115, // name
            0, 0, 0, 1, // one partition
            0, 0, 0, 0, // index
            0, 0, // no error
            0, 0, 0, 0, 0, 0, 0, 44, // base offset
            255, 255, 255, 255, 255, 255, 255, 255, // log append time
            0, 0, 0, 0, // throttle time
        ];

        let (_, parsed) = response::parse_produce_response(NomBytes::from(buf.as_slice())).unwrap();
        assert_eq!(parsed.responses[0].name, Bytes::from("purchases"));
        assert_eq!(
            parsed.responses[0].partition_responses[0].error_code,
            KafkaCode::None
        );
        assert_eq!(parsed.responses[0].partition_responses[0].base_offset, 44);
        assert_eq!(parsed.throttle_time_ms, 0);
    }
}
