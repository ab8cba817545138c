//! Multiplexed connection to a single broker.
//!
//! One [`Connection`] owns one socket. Any number of tasks may issue
//! requests on it concurrently: each request is stamped with a fresh
//! correlation ID, a single-shot waiter is registered under that ID, and
//! a dedicated reader task routes every framed response to the waiter
//! holding the matching ID. Responses can arrive out of request order;
//! the correlation ID is authoritative.
//!
//! The connection never reconnects. The first read failure, frame decode
//! failure, or explicit [`close`](Connection::close) latches a terminal
//! error, cancels every pending waiter, and fails every later request
//! with the same error. The layer above decides whether to dial again.
//!
//! ### Example
//! ```rust
//! let addrs = [BrokerAddress { host: "localhost".to_string(), port: 9092 }];
//! let conn = Connection::connect_tcp(&addrs, Duration::from_secs(5), None).await?;
//!
//! let metadata = conn
//!     .metadata(MetadataRequest::new(0, "my-client", &["my-topic"]))
//!     .await?;
//! ```

use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time;

use crate::encode::ToByte;
use crate::error::{Error, KafkaCode, Result};
use crate::network::{self, BrokerAddress, Transport};
use crate::protocol::{
    self, ApiVersionsRequest, ApiVersionsResponse, FetchRequest, FetchResponse,
    FindCoordinatorRequest, FindCoordinatorResponse, ListOffsetsRequest, ListOffsetsResponse,
    MetadataRequest, MetadataResponse, OffsetCommitRequest, OffsetCommitResponse,
    OffsetFetchRequest, OffsetFetchResponse, ProduceRequest, ProduceResponse, SupportedVersion,
    API_KEY_METADATA, REQUIRED_ACKS_NONE,
};

const FIRST_CORRELATION_ID: i32 = 1;

/// A multiplexed connection to one broker.
///
/// Cheap to clone; all clones share the same socket, reader task, and
/// terminal state.
#[derive(Clone, Debug)]
pub struct Connection {
    shared: Arc<Shared>,
    writer: Arc<tokio::sync::Mutex<WriteHalf<Transport>>>,
    reader: Arc<JoinHandle<()>>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
}

/// Everything guarded by the registry mutex. The lock is only ever held
/// across map and counter operations, never across I/O.
#[derive(Debug)]
struct State {
    waiters: HashMap<i32, oneshot::Sender<Bytes>>,
    stop_err: Option<Error>,
    next_id: i32,
    broker_versions: HashMap<i16, SupportedVersion>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Issue the next correlation ID, strictly in order.
    ///
    /// Values wrap back to 1 long before they could collide with an ID
    /// still in flight: outstanding requests are bounded by concurrent
    /// callers, which is nowhere near 2^31.
    fn next_correlation_id(&self) -> Result<i32> {
        let mut state = self.lock();
        if let Some(err) = &state.stop_err {
            return Err(err.clone());
        }
        let id = state.next_id;
        state.next_id = if id >= i32::MAX - 1 {
            FIRST_CORRELATION_ID
        } else {
            id + 1
        };
        Ok(id)
    }

    /// Register a waiter for the response with the given correlation ID.
    ///
    /// The returned receiver yields exactly one payload, or closes when
    /// the connection goes terminal.
    fn register_waiter(&self, correlation_id: i32) -> Result<oneshot::Receiver<Bytes>> {
        let mut state = self.lock();
        if let Some(err) = &state.stop_err {
            return Err(err.clone());
        }
        if state.waiters.contains_key(&correlation_id) {
            tracing::error!(correlation_id, "correlation conflict");
            return Err(Error::CorrelationConflict(correlation_id));
        }
        let (sender, receiver) = oneshot::channel();
        state.waiters.insert(correlation_id, sender);
        Ok(receiver)
    }

    /// Remove a waiter without delivering anything. Unknown IDs are fine:
    /// the reader may have delivered, or a terminal sweep may have run,
    /// between our write failure and this call.
    fn release_waiter(&self, correlation_id: i32) {
        self.lock().waiters.remove(&correlation_id);
    }

    fn take_waiter(&self, correlation_id: i32) -> Option<oneshot::Sender<Bytes>> {
        self.lock().waiters.remove(&correlation_id)
    }

    /// Terminal transition: record the first error and cancel every
    /// pending waiter. Safe to call repeatedly; only the first error is
    /// kept.
    fn drain(&self, err: Error) {
        let mut state = self.lock();
        if state.stop_err.is_none() {
            state.stop_err = Some(err);
        }
        // dropping the senders wakes every pending dispatcher
        state.waiters.clear();
    }

    fn stop_error(&self) -> Error {
        self.lock().stop_err.clone().unwrap_or(Error::Closed)
    }

    fn record_broker_versions(&self, response: &ApiVersionsResponse) {
        let mut state = self.lock();
        for range in &response.api_keys {
            state.broker_versions.insert(
                range.api_key,
                SupportedVersion {
                    min: range.min_version,
                    max: range.max_version,
                },
            );
        }
    }

    /// The best version for an API given what the broker advertised, or 0
    /// when nothing was advertised. Version 0 is the pre-negotiation
    /// default every broker accepts.
    fn best_version(&self, api_key: i16) -> i16 {
        match self.lock().broker_versions.get(&api_key) {
            Some(broker) => protocol::best_version(protocol::supported_by_driver(api_key), *broker),
            None => 0,
        }
    }
}

impl Connection {
    /// Connect to the first reachable broker over plain TCP.
    ///
    /// `read_timeout` bounds each socket read made by the reader task;
    /// `None` waits forever. Hitting the deadline is a terminal error.
    pub async fn connect_tcp(
        addrs: &[BrokerAddress],
        connect_timeout: Duration,
        read_timeout: Option<Duration>,
    ) -> Result<Self> {
        let stream = network::dial_tcp_any(addrs, connect_timeout).await?;
        Ok(Self::start(Transport::Tcp(stream), read_timeout))
    }

    /// Connect to the first reachable broker over mutually-authenticated
    /// TLS.
    ///
    /// `ca_pem` is the sole trust root for verifying the broker;
    /// `cert_pem` and `key_pem` identify this client. All three are PEM
    /// bytes.
    pub async fn connect_tls(
        addrs: &[BrokerAddress],
        ca_pem: &[u8],
        cert_pem: &[u8],
        key_pem: &[u8],
        connect_timeout: Duration,
        read_timeout: Option<Duration>,
    ) -> Result<Self> {
        let stream =
            network::dial_tls_any(addrs, ca_pem, cert_pem, key_pem, connect_timeout).await?;
        Ok(Self::start(Transport::Tls(Box::new(stream)), read_timeout))
    }

    fn start(transport: Transport, read_timeout: Option<Duration>) -> Self {
        let (read_half, write_half) = tokio::io::split(transport);
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                waiters: HashMap::new(),
                stop_err: None,
                next_id: FIRST_CORRELATION_ID,
                broker_versions: HashMap::new(),
            }),
        });
        let reader = tokio::spawn(read_loop(
            BufReader::new(read_half),
            Arc::clone(&shared),
            read_timeout,
        ));

        Self {
            shared,
            writer: Arc::new(tokio::sync::Mutex::new(write_half)),
            reader: Arc::new(reader),
        }
    }

    /// The number of requests currently awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.shared.lock().waiters.len()
    }

    /// Close the connection.
    ///
    /// Cancels every pending waiter with [`Error::Closed`], stops the
    /// reader task, and shuts the socket down. Calling it again is
    /// harmless; the first call decides the terminal error.
    pub async fn close(&self) -> Result<()> {
        self.shared.drain(Error::Closed);
        self.reader.abort();

        let mut writer = self.writer.lock().await;
        writer
            .shutdown()
            .await
            .map_err(|e| Error::IoError(e.kind()))
    }

    /// Frame and write one request. Writes are serialized on the write
    /// mutex so concurrent dispatchers cannot interleave frames on the
    /// wire.
    async fn send_request<R: ToByte>(&self, req: &R) -> Result<()> {
        let mut buffer = Vec::with_capacity(4);
        buffer.extend_from_slice(&[0, 0, 0, 0]);
        req.encode(&mut buffer)?;

        let size = buffer.len() as i32 - 4;
        size.encode(&mut &mut buffer[..])?;

        tracing::trace!("Sending {} bytes", buffer.len());
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&buffer)
            .await
            .map_err(|e| Error::IoError(e.kind()))
    }

    /// The shared dispatch skeleton: register a waiter, write the
    /// request, await the routed response payload.
    ///
    /// A write failure releases the waiter and leaves the connection
    /// open; the socket may still be delivering responses to others. A
    /// waiter that closes without a payload reports the terminal error.
    async fn dispatch<R: ToByte>(&self, req: &R, correlation_id: i32) -> Result<Bytes> {
        let waiter = self.shared.register_waiter(correlation_id)?;

        if let Err(err) = self.send_request(req).await {
            tracing::error!(%err, "cannot write request");
            self.shared.release_waiter(correlation_id);
            return Err(err);
        }

        match waiter.await {
            Ok(payload) => Ok(payload),
            Err(_) => Err(self.shared.stop_error()),
        }
    }

    /// Ask the broker which API versions it supports, and remember them.
    ///
    /// Always sent at version 0, since this request is what establishes
    /// which versions are safe. A successful response seeds the version
    /// table consulted by [`metadata`](Connection::metadata).
    pub async fn api_versions(
        &self,
        mut req: ApiVersionsRequest<'_>,
    ) -> Result<ApiVersionsResponse> {
        req.header.correlation_id = self.shared.next_correlation_id()?;

        let payload = self.dispatch(&req, req.header.correlation_id).await?;
        let response = ApiVersionsResponse::try_from(payload)?;
        if response.error_code == KafkaCode::None {
            self.shared.record_broker_versions(&response);
        }
        Ok(response)
    }

    /// Send a Metadata request and return the decoded response.
    ///
    /// The request goes out at the best version shared with the broker,
    /// and the response is decoded at that same version.
    pub async fn metadata<T: AsRef<str>>(
        &self,
        mut req: MetadataRequest<'_, T>,
    ) -> Result<MetadataResponse> {
        req.header.correlation_id = self.shared.next_correlation_id()?;
        req.header.api_version = self.shared.best_version(API_KEY_METADATA);

        let payload = self.dispatch(&req, req.header.correlation_id).await?;
        MetadataResponse::parse(payload, req.header.api_version)
    }

    /// Send a Produce request.
    ///
    /// With `required_acks` of 0 the broker never responds: the request
    /// is written and `Ok(None)` returned immediately, with no waiter
    /// ever registered.
    pub async fn produce(&self, mut req: ProduceRequest<'_>) -> Result<Option<ProduceResponse>> {
        req.header.correlation_id = self.shared.next_correlation_id()?;

        if req.required_acks == REQUIRED_ACKS_NONE {
            self.send_request(&req).await?;
            return Ok(None);
        }

        let payload = self.dispatch(&req, req.header.correlation_id).await?;
        ProduceResponse::try_from(payload).map(Some)
    }

    /// Send a Fetch request and return the decoded, trimmed response.
    ///
    /// The broker returns whole record batches, so a compressed batch can
    /// begin before the requested offset; leading records below the
    /// requested fetch offset are dropped per partition before the
    /// response is handed back.
    pub async fn fetch(&self, mut req: FetchRequest<'_>) -> Result<FetchResponse> {
        req.header.correlation_id = self.shared.next_correlation_id()?;

        let payload = self.dispatch(&req, req.header.correlation_id).await?;
        let mut response = FetchResponse::try_from(payload)?;

        for (topic, req_topic) in response.topics.iter_mut().zip(req.topics.iter()) {
            for (partition, req_partition) in
                topic.partitions.iter_mut().zip(req_topic.partitions.iter())
            {
                partition.trim_leading(req_partition.offset);
            }
        }
        Ok(response)
    }

    /// Send a List Offsets request and return the decoded response.
    pub async fn list_offsets(
        &self,
        mut req: ListOffsetsRequest<'_>,
    ) -> Result<ListOffsetsResponse> {
        req.header.correlation_id = self.shared.next_correlation_id()?;
        // only brokers replicating a partition identify by node ID here
        req.replica_id = -1;

        let payload = self.dispatch(&req, req.header.correlation_id).await?;
        ListOffsetsResponse::try_from(payload)
    }

    /// Send a Find Coordinator request and return the decoded response.
    pub async fn find_coordinator(
        &self,
        mut req: FindCoordinatorRequest<'_>,
    ) -> Result<FindCoordinatorResponse> {
        req.header.correlation_id = self.shared.next_correlation_id()?;

        let payload = self.dispatch(&req, req.header.correlation_id).await?;
        FindCoordinatorResponse::try_from(payload)
    }

    /// Send an Offset Commit request and return the decoded response.
    pub async fn commit_offset(
        &self,
        mut req: OffsetCommitRequest<'_>,
    ) -> Result<OffsetCommitResponse> {
        req.header.correlation_id = self.shared.next_correlation_id()?;

        let payload = self.dispatch(&req, req.header.correlation_id).await?;
        OffsetCommitResponse::try_from(payload)
    }

    /// Send an Offset Fetch request and return the decoded response.
    pub async fn offset_fetch(
        &self,
        mut req: OffsetFetchRequest<'_>,
    ) -> Result<OffsetFetchResponse> {
        req.header.correlation_id = self.shared.next_correlation_id()?;

        let payload = self.dispatch(&req, req.header.correlation_id).await?;
        OffsetFetchResponse::try_from(payload)
    }
}

/// Read framed responses until the socket fails, routing each payload to
/// the waiter registered under its correlation ID.
///
/// Exactly one of these runs per connection. Any read or framing error,
/// including a missed read deadline, drains the registry and ends the
/// task; the connection is terminal from then on.
async fn read_loop(
    mut reader: BufReader<ReadHalf<Transport>>,
    shared: Arc<Shared>,
    read_timeout: Option<Duration>,
) {
    loop {
        let frame = match read_timeout {
            Some(deadline) => match time::timeout(deadline, protocol::read_response(&mut reader))
                .await
            {
                Ok(frame) => frame,
                Err(_) => Err(Error::IoError(ErrorKind::TimedOut)),
            },
            None => protocol::read_response(&mut reader).await,
        };

        let (correlation_id, payload) = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(%err, "reader stopping");
                shared.drain(err);
                return;
            }
        };

        match shared.take_waiter(correlation_id) {
            // a dropped receiver is fine, the dispatcher gave up first
            Some(waiter) => {
                let _ = waiter.send(payload);
            }
            None => tracing::warn!(correlation_id, "response to unknown request"),
        }
    }
}
