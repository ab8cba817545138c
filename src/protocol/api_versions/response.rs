//! Parsing and processing for ApiVersions responses.
//!
//! ### Example
//! ```rust
//! let api_versions_response = protocol::ApiVersionsResponse::try_from(response_bytes)?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! ApiVersions Response (Version: 0) => error_code [api_keys]
//!   error_code => INT16
//!   api_keys => api_key min_version max_version
//!     api_key => INT16
//!     min_version => INT16
//!     max_version => INT16
//! ```

use bytes::Bytes;
use nom::{number::complete::be_i16, IResult};
use nombytes::NomBytes;

use crate::{
    error::{Error, KafkaCode, Result},
    parser,
};

/// The base ApiVersions response object.
///
/// A connection feeds the advertised ranges into its version table so
/// that later requests can be issued at the best common version.
#[derive(Debug, PartialEq)]
pub struct ApiVersionsResponse {
    /// The top-level error code, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// One advertised version range per API the broker understands.
    pub api_keys: Vec<ApiVersionRange>,
}

/// The version range the broker advertises for one API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApiVersionRange {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}

impl TryFrom<Bytes> for ApiVersionsResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        tracing::trace!("Parsing ApiVersionsResponse {:?}", s);
        let (_, api_versions) =
            parse_api_versions_response(NomBytes::new(s.clone())).map_err(|err| {
                tracing::error!("ERROR: Failed parsing ApiVersionsResponse {:?}", err);
                tracing::error!("ERROR: ApiVersionsResponse Bytes {:?}", s);
                Error::ParsingError(s)
            })?;
        tracing::trace!("Parsed ApiVersionsResponse {:?}", api_versions);
        Ok(api_versions)
    }
}

pub fn parse_api_versions_response(s: NomBytes) -> IResult<NomBytes, ApiVersionsResponse> {
    let (s, error_code) = parser::parse_kafka_code(s)?;
    let (s, api_keys) = parser::parse_array(parse_api_version_range)(s)?;

    Ok((
        s,
        ApiVersionsResponse {
            error_code,
            api_keys,
        },
    ))
}

fn parse_api_version_range(s: NomBytes) -> IResult<NomBytes, ApiVersionRange> {
    let (s, api_key) = be_i16(s)?;
    let (s, min_version) = be_i16(s)?;
    let (s, max_version) = be_i16(s)?;

    Ok((
        s,
        ApiVersionRange {
            api_key,
            min_version,
            max_version,
        },
    ))
}
