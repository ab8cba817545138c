//! Queries the broker for the range of versions it supports per API.
//!
//! Brokers from 0.10.0.0 onwards answer this with one (min, max) entry
//! for every API key they understand. A client is expected to send this
//! request at version 0 right after connecting, then pick request
//! versions inside the advertised ranges for the rest of the session.

pub mod request;
pub mod response;

#[cfg(test)]
mod test {
    use super::*;
    use crate::{encode::ToByte, error::KafkaCode};
    use nombytes::NomBytes;

    #[test]
    fn encode() {
        let b = [0, 18, 0, 0, 0, 0, 0, 1, 0, 4, 114, 117, 115, 116];
        let correlation_id = 1;
        let client_id = "rust";

        let req = request::ApiVersionsRequest::new(correlation_id, client_id);

        let mut buffer: Vec<u8> = vec![];
        req.encode(&mut buffer).unwrap();

        assert_eq!(buffer, b);
    }

    #[test]
    fn parse() {
        let buf = [
            0, 0, // error code
            0, 0, 0, 2, // two advertised ranges
            0, 3, 0, 0, 0, 5, // metadata 0..=5
            0, 18, 0, 0, 0, 0, // api versions 0..=0
        ];

        let (_, parsed) =
            response::parse_api_versions_response(NomBytes::from(buf.as_slice())).unwrap();
        assert_eq!(parsed.error_code, KafkaCode::None);
        assert_eq!(
            parsed.api_keys,
            vec![
                response::ApiVersionRange {
                    api_key: 3,
                    min_version: 0,
                    max_version: 5,
                },
                response::ApiVersionRange {
                    api_key: 18,
                    min_version: 0,
                    max_version: 0,
                },
            ]
        );
    }
}
