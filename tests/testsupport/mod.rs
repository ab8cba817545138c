//! A scripted broker on a loopback socket.
//!
//! Tests accept one connection, read the framed requests the connection
//! under test writes, and answer with hand-built response frames. Only
//! the outer framing is shared with the crate; response bodies are
//! assembled byte by byte so the tests stay independent of the parsers
//! they exercise.

use bytes::BufMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use gregor::prelude::BrokerAddress;

/// Bind a listener on an ephemeral loopback port.
pub async fn listen() -> (BrokerAddress, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (
        BrokerAddress {
            host: "127.0.0.1".to_string(),
            port,
        },
        listener,
    )
}

pub async fn accept(listener: &TcpListener) -> TcpStream {
    listener.accept().await.unwrap().0
}

/// One decoded request frame: the header fields plus everything after
/// the correlation ID (client ID and request body).
#[derive(Debug)]
pub struct Frame {
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    pub body: Vec<u8>,
}

pub async fn read_request(stream: &mut TcpStream) -> Frame {
    let len = stream.read_u32().await.unwrap();
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await.unwrap();

    Frame {
        api_key: i16::from_be_bytes([payload[0], payload[1]]),
        api_version: i16::from_be_bytes([payload[2], payload[3]]),
        correlation_id: i32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]),
        body: payload[8..].to_vec(),
    }
}

pub async fn write_response(stream: &mut TcpStream, correlation_id: i32, body: &[u8]) {
    let mut frame = Vec::with_capacity(body.len() + 8);
    frame.put_u32(body.len() as u32 + 4);
    frame.put_i32(correlation_id);
    frame.put_slice(body);
    stream.write_all(&frame).await.unwrap();
}

fn put_string(buffer: &mut Vec<u8>, s: &str) {
    buffer.put_i16(s.len() as i16);
    buffer.put_slice(s.as_bytes());
}

/// The string that trails a frame body holding only the client ID and
/// one string field, e.g. a FindCoordinator key.
pub fn trailing_string(frame: &Frame) -> String {
    let client_id_len = u16::from_be_bytes([frame.body[0], frame.body[1]]) as usize;
    let rest = &frame.body[2 + client_id_len..];
    let len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
    String::from_utf8(rest[2..2 + len].to_vec()).unwrap()
}

/// The i32 right after the client ID, e.g. a ListOffsets replica ID.
pub fn i32_after_client_id(frame: &Frame) -> i32 {
    let client_id_len = u16::from_be_bytes([frame.body[0], frame.body[1]]) as usize;
    let rest = &frame.body[2 + client_id_len..];
    i32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]])
}

pub fn api_versions_body(ranges: &[(i16, i16, i16)]) -> Vec<u8> {
    let mut body = Vec::new();
    body.put_i16(0); // no error
    body.put_i32(ranges.len() as i32);
    for (api_key, min_version, max_version) in ranges {
        body.put_i16(*api_key);
        body.put_i16(*min_version);
        body.put_i16(*max_version);
    }
    body
}

pub fn metadata_v0_body(node_id: i32, host: &str, port: i32) -> Vec<u8> {
    let mut body = Vec::new();
    body.put_i32(1); // one broker
    body.put_i32(node_id);
    put_string(&mut body, host);
    body.put_i32(port);
    body.put_i32(0); // no topics
    body
}

pub fn metadata_v3_body(node_id: i32, host: &str, port: i32, controller_id: i32) -> Vec<u8> {
    let mut body = Vec::new();
    body.put_i32(0); // throttle time
    body.put_i32(1); // one broker
    body.put_i32(node_id);
    put_string(&mut body, host);
    body.put_i32(port);
    body.put_i16(-1); // null rack
    body.put_i16(-1); // null cluster id
    body.put_i32(controller_id);
    body.put_i32(0); // no topics
    body
}

pub fn find_coordinator_body(node_id: i32, host: &str, port: i32) -> Vec<u8> {
    let mut body = Vec::new();
    body.put_i16(0); // no error
    body.put_i32(node_id);
    put_string(&mut body, host);
    body.put_i32(port);
    body
}

pub fn produce_body(topic: &str, partition: i32, base_offset: i64) -> Vec<u8> {
    let mut body = Vec::new();
    body.put_i32(1); // one topic
    put_string(&mut body, topic);
    body.put_i32(1); // one partition
    body.put_i32(partition);
    body.put_i16(0); // no error
    body.put_i64(base_offset);
    body.put_i64(-1); // log append time
    body.put_i32(0); // throttle time
    body
}

pub fn list_offsets_body(topic: &str, partition: i32, offset: i64) -> Vec<u8> {
    let mut body = Vec::new();
    body.put_i32(1); // one topic
    put_string(&mut body, topic);
    body.put_i32(1); // one partition
    body.put_i32(partition);
    body.put_i16(0); // no error
    body.put_i64(-1); // timestamp
    body.put_i64(offset);
    body
}

/// A Fetch v4 body holding one uncompressed record batch with
/// `record_count` empty records at consecutive offsets from
/// `base_offset`.
pub fn fetch_body(topic: &str, partition: i32, base_offset: i64, record_count: usize) -> Vec<u8> {
    let mut records = Vec::new();
    for delta in 0..record_count {
        // length 6, attributes, timestamp delta, offset delta, empty
        // key, empty value, no headers; varints are zigzag encoded
        records.put_u8(12);
        records.put_i8(0);
        records.put_u8(0);
        records.put_u8(2 * delta as u8);
        records.put_u8(0);
        records.put_u8(0);
        records.put_u8(0);
    }

    let batch_length = 49 + records.len();
    let mut batch = Vec::new();
    batch.put_i64(base_offset);
    batch.put_i32(batch_length as i32);
    batch.put_i32(-1); // partition leader epoch
    batch.put_i8(2); // magic
    batch.put_i32(0); // crc, unchecked by the parser
    batch.put_i16(0); // attributes
    batch.put_i32(record_count as i32 - 1); // last offset delta
    batch.put_i64(0); // base timestamp
    batch.put_i64(0); // max timestamp
    batch.put_i64(-1); // producer id
    batch.put_i16(-1); // producer epoch
    batch.put_i32(-1); // base sequence
    batch.put_i32(record_count as i32);
    batch.put_slice(&records);

    let mut body = Vec::new();
    body.put_i32(0); // throttle time
    body.put_i32(1); // one topic
    put_string(&mut body, topic);
    body.put_i32(1); // one partition
    body.put_i32(partition);
    body.put_i16(0); // no error
    body.put_i64(base_offset + record_count as i64); // high watermark
    body.put_i64(base_offset + record_count as i64); // last stable offset
    body.put_i32(0); // no aborted transactions
    body.put_i32(batch.len() as i32);
    body.put_slice(&batch);
    body
}
