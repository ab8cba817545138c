//! Encoding and creation for Produce requests.
//!
//! ### Example
//! ```rust
//! let mut produce_request = protocol::ProduceRequest::new(1, 1000, correlation_id, client_id);
//! produce_request.add(topic, partition_id, message);
//! let produce_response = conn.produce(produce_request).await?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! Produce Request (Version: 3) => transactional_id acks timeout [topic_data]
//!   transactional_id => NULLABLE_STRING
//!   acks => INT16
//!   timeout => INT32
//!   topic_data => topic [data]
//!     topic => STRING
//!     data => partition record_set
//!       partition => INT32
//!       record_set => RECORDS
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes};
use crc::Crc;

use crate::{
    encode::ToByte,
    error::Result,
    protocol::{HeaderRequest, API_KEY_PRODUCE},
};

const API_VERSION: i16 = 3;

/// The magic byte (a.k.a version) we use for sent record batches.
const MESSAGE_MAGIC_BYTE: i8 = 2;

/// Compression applied to the records section of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
}

/// The attributes bitfield of a record batch.
///
/// Bits 0-2 carry the compression codec; the remaining bits (timestamp
/// type, transactional, control batch) are not produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub compression: Option<Compression>,
}

impl From<i16> for Attributes {
    fn from(bits: i16) -> Self {
        Attributes {
            compression: match bits & 0x07 {
                1 => Some(Compression::Gzip),
                _ => None,
            },
        }
    }
}

impl From<Attributes> for i16 {
    fn from(attributes: Attributes) -> Self {
        match attributes.compression {
            Some(Compression::Gzip) => 1,
            None => 0,
        }
    }
}

/// The base Produce request object.
///
/// ### Example
/// ```rust
/// let mut produce_request = protocol::ProduceRequest::new(1, 1000, correlation_id, client_id);
/// produce_request.add(topic, partition_id, message);
/// let produce_response = conn.produce(produce_request).await?;
/// ```
#[derive(Debug)]
pub struct ProduceRequest<'a> {
    pub header: HeaderRequest<'a>,
    /// The transactional ID of the producer. This can be null for non-transactional producers.
    pub transactional_id: Option<String>,
    /// The number of acknowledgments the producer requires the leader to have received before considering a request complete. Allowed values: 0 for no acknowledgments, 1 for only the leader and -1 for the full ISR.
    pub required_acks: i16,
    /// The timeout to await a response in milliseconds.
    pub timeout_ms: i32,
    /// Each topic to produce to.
    topic_partitions: Vec<TopicPartition<'a>>,
}

impl<'a> ProduceRequest<'a> {
    pub fn new(
        required_acks: i16,
        timeout_ms: i32,
        correlation_id: i32,
        client_id: &'a str,
    ) -> ProduceRequest<'a> {
        ProduceRequest {
            header: HeaderRequest::new(API_KEY_PRODUCE, API_VERSION, correlation_id, client_id),
            transactional_id: None,
            required_acks,
            timeout_ms,
            topic_partitions: vec![],
        }
    }

    pub fn add(&mut self, topic: &'a str, partition: i32, message: Message) {
        match self
            .topic_partitions
            .iter_mut()
            .find(|tp| tp.topic_name == topic)
        {
            Some(tp) => tp.add(partition, message),
            None => {
                let mut tp = TopicPartition::new(topic);
                tp.add(partition, message);
                self.topic_partitions.push(tp);
            }
        }
    }
}

impl<'a> ToByte for ProduceRequest<'a> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding ProduceRequest {:?}", self);
        self.header.encode(buffer)?;
        self.transactional_id.encode(buffer)?;
        self.required_acks.encode(buffer)?;
        self.timeout_ms.encode(buffer)?;
        self.topic_partitions.encode(buffer)?;
        Ok(())
    }
}

#[derive(Debug)]
struct TopicPartition<'a> {
    /// The topic name.
    topic_name: &'a str,
    /// Each partition to produce to.
    partitions: Vec<Partition>,
}

impl<'a> TopicPartition<'a> {
    fn new(topic_name: &'a str) -> TopicPartition {
        TopicPartition {
            topic_name,
            partitions: vec![],
        }
    }

    fn add(&mut self, partition: i32, message: Message) {
        match self
            .partitions
            .iter_mut()
            .find(|p| p.partition == partition)
        {
            Some(p) => p.add(message),
            None => {
                let mut p = Partition::new(partition);
                p.add(message);
                self.partitions.push(p);
            }
        }
    }
}

impl<'a> ToByte for TopicPartition<'a> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.topic_name.encode(buffer)?;
        self.partitions.encode(buffer)?;
        Ok(())
    }
}

#[derive(Debug)]
struct Partition {
    /// The partition index.
    partition: i32,
    /// The record data to be produced.
    batches: Vec<RecordBatch>,
}

impl Partition {
    fn new(partition: i32) -> Partition {
        Partition {
            partition,
            batches: Vec::new(),
        }
    }

    fn add(&mut self, message: Message) {
        if self.batches.is_empty() {
            self.batches.push(RecordBatch::new());
        }

        self.batches[0].add(message);
    }
}

impl ToByte for Partition {
    fn encode<W: BufMut>(&self, out: &mut W) -> Result<()> {
        self.partition.encode(out)?;

        // the record batches go out as a sized byte blob, not an array
        let mut buf = Vec::with_capacity(4);
        for batch in &self.batches {
            batch.encode_to_buf(&mut buf)?;
        }

        buf.encode(out)
    }
}

/// One key/value pair headed for a topic partition.
#[derive(Clone, Debug)]
pub struct Message {
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

impl Message {
    pub fn new(key: Option<Bytes>, value: Option<Bytes>) -> Message {
        Message { key, value }
    }
}

#[derive(Debug)]
struct RecordBatch {
    /// Denotes the first offset in the batch; the broker assigns real offsets on append.
    base_offset: i64,
    /// Set by the broker upon receipt of a produce request.
    partition_leader_epoch: i32,
    magic: i8,
    /// CRC of everything that follows the attributes field, patched in after encoding.
    crc: u32,
    attributes: Attributes,
    /// The offset of the last record in the batch, relative to `base_offset`.
    last_offset_delta: i32,
    /// The timestamp of the first record in the batch.
    base_timestamp: i64,
    /// The timestamp of the last record in the batch.
    max_timestamp: i64,
    producer_id: i64,
    producer_epoch: i16,
    base_sequence: i32,
    records: Vec<Record>,
}

impl RecordBatch {
    fn new() -> Self {
        Self {
            base_offset: 0,
            partition_leader_epoch: -1,
            magic: MESSAGE_MAGIC_BYTE,
            crc: 0,
            attributes: Attributes { compression: None },
            last_offset_delta: -1,
            base_timestamp: now(),
            max_timestamp: 0,
            producer_id: -1,
            producer_epoch: -1,
            base_sequence: -1,
            records: Vec::new(),
        }
    }

    fn add(&mut self, message: Message) {
        self.last_offset_delta += 1;
        self.max_timestamp = now();

        let timestamp_delta = self.max_timestamp - self.base_timestamp;
        let offset_delta = self.last_offset_delta;

        let record = Record::new(message, timestamp_delta as usize, offset_delta as usize);
        self.records.push(record);
    }

    fn encode_to_buf(&self, out: &mut Vec<u8>) -> Result<()> {
        self.base_offset.encode(out)?;

        // batch length is not known yet, so build the remainder separately
        let mut buf = Vec::with_capacity(4);
        self.partition_leader_epoch.encode(&mut buf)?;
        self.magic.encode(&mut buf)?;

        // placeholder, patched once everything past it is rendered
        let crc_pos = 5;
        self.crc.encode(&mut buf)?;

        i16::from(self.attributes).encode(&mut buf)?;
        self.last_offset_delta.encode(&mut buf)?;
        self.base_timestamp.encode(&mut buf)?;
        self.max_timestamp.encode(&mut buf)?;
        self.producer_id.encode(&mut buf)?;
        self.producer_epoch.encode(&mut buf)?;
        self.base_sequence.encode(&mut buf)?;
        self.records.encode(&mut buf)?;

        let crc = to_crc(&buf[(crc_pos + 4)..]);
        crc.encode(&mut &mut buf[crc_pos..crc_pos + 4])?;

        // the batch itself is length-prefixed
        buf.encode(out)?;

        Ok(())
    }
}

#[derive(Debug)]
struct Record {
    attributes: i8,
    timestamp_delta: usize,
    offset_delta: usize,
    key_length: usize,
    key: Option<Bytes>,
    value_length: usize,
    value: Option<Bytes>,
}

impl Record {
    fn new(message: Message, timestamp_delta: usize, offset_delta: usize) -> Self {
        Self {
            attributes: 0,
            timestamp_delta,
            offset_delta,
            key_length: message.key.as_ref().map_or(0, |key| key.len()),
            key: message.key,
            value_length: message.value.as_ref().map_or(0, |value| value.len()),
            value: message.value,
        }
    }

    fn encode_to_buf(&self, out: &mut Vec<u8>) -> Result<()> {
        self.attributes.encode(out)?;
        self.timestamp_delta.encode(out)?;
        self.offset_delta.encode(out)?;

        // key and value are varint lengths followed by raw bytes
        self.key_length.encode(out)?;
        if let Some(key) = &self.key {
            out.put(key.clone());
        }

        self.value_length.encode(out)?;
        if let Some(value) = &self.value {
            out.put(value.clone());
        }

        // no record headers
        let header_count: usize = 0;
        header_count.encode(out)?;

        Ok(())
    }
}

impl ToByte for Record {
    fn encode<W: BufMut>(&self, out: &mut W) -> Result<()> {
        let mut buf = Vec::with_capacity(4);
        self.encode_to_buf(&mut buf)?;

        // the record is a varint length followed by bytes
        buf.len().encode(out)?;
        out.put(&buf[..]);

        Ok(())
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as i64
}

fn to_crc(data: &[u8]) -> u32 {
    Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(data)
}
