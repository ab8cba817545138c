mod testsupport;

use std::io::ErrorKind;
use std::time::Duration;

use gregor::prelude::{protocol::*, *};

const CLIENT_ID: &str = "gregor-test";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect(addr: BrokerAddress) -> Connection {
    Connection::connect_tcp(&[addr], CONNECT_TIMEOUT, None)
        .await
        .unwrap()
}

#[tokio::test]
async fn metadata_round_trip() {
    let (addr, listener) = testsupport::listen().await;
    let broker = tokio::spawn(async move {
        let mut socket = testsupport::accept(&listener).await;
        let frame = testsupport::read_request(&mut socket).await;
        assert_eq!(frame.api_key, 3);
        // no ApiVersions call was made, so the request must be version 0
        assert_eq!(frame.api_version, 0);
        testsupport::write_response(
            &mut socket,
            frame.correlation_id,
            &testsupport::metadata_v0_body(1, "localhost", 9092),
        )
        .await;
        socket
    });

    let conn = connect(addr).await;
    let topics: [&str; 0] = [];
    let response = conn
        .metadata(MetadataRequest::new(0, CLIENT_ID, &topics))
        .await
        .unwrap();

    assert_eq!(response.brokers.len(), 1);
    assert_eq!(response.brokers[0].node_id, 1);
    assert_eq!(response.brokers[0].host, bytes::Bytes::from("localhost"));
    assert_eq!(response.controller_id, None);

    drop(broker.await.unwrap());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn api_versions_negotiates_metadata_version() {
    let (addr, listener) = testsupport::listen().await;
    let broker = tokio::spawn(async move {
        let mut socket = testsupport::accept(&listener).await;

        let frame = testsupport::read_request(&mut socket).await;
        assert_eq!(frame.api_key, 18);
        assert_eq!(frame.api_version, 0);
        testsupport::write_response(
            &mut socket,
            frame.correlation_id,
            // broker takes Metadata 0..=5; driver stops at 3
            &testsupport::api_versions_body(&[(3, 0, 5), (18, 0, 2)]),
        )
        .await;

        let frame = testsupport::read_request(&mut socket).await;
        assert_eq!(frame.api_key, 3);
        assert_eq!(frame.api_version, 3);
        testsupport::write_response(
            &mut socket,
            frame.correlation_id,
            &testsupport::metadata_v3_body(7, "localhost", 9092, 7),
        )
        .await;
        socket
    });

    let conn = connect(addr).await;
    conn.api_versions(ApiVersionsRequest::new(0, CLIENT_ID))
        .await
        .unwrap();

    let topics: [&str; 0] = [];
    let response = conn
        .metadata(MetadataRequest::new(0, CLIENT_ID, &topics))
        .await
        .unwrap();

    assert_eq!(response.controller_id, Some(7));
    assert_eq!(response.throttle_time_ms, Some(0));

    drop(broker.await.unwrap());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn produce_without_acks_returns_immediately() {
    let (addr, listener) = testsupport::listen().await;
    let broker = tokio::spawn(async move {
        let mut socket = testsupport::accept(&listener).await;
        let frame = testsupport::read_request(&mut socket).await;
        assert_eq!(frame.api_key, 0);
        // fire-and-forget: the broker never writes back
        socket
    });

    let conn = connect(addr).await;
    let mut req = ProduceRequest::new(0, 1000, 0, CLIENT_ID);
    req.add(
        "purchases",
        0,
        Message::new(None, Some(bytes::Bytes::from_static(b"money"))),
    );

    let response = conn.produce(req).await.unwrap();
    assert!(response.is_none());
    // no waiter was ever registered for the request
    assert_eq!(conn.in_flight(), 0);

    drop(broker.await.unwrap());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn produce_with_acks_waits_for_the_response() {
    let (addr, listener) = testsupport::listen().await;
    let broker = tokio::spawn(async move {
        let mut socket = testsupport::accept(&listener).await;
        let frame = testsupport::read_request(&mut socket).await;
        assert_eq!(frame.api_key, 0);
        testsupport::write_response(
            &mut socket,
            frame.correlation_id,
            &testsupport::produce_body("purchases", 0, 44),
        )
        .await;
        socket
    });

    let conn = connect(addr).await;
    let mut req = ProduceRequest::new(1, 1000, 0, CLIENT_ID);
    req.add(
        "purchases",
        0,
        Message::new(None, Some(bytes::Bytes::from_static(b"money"))),
    );

    let response = conn.produce(req).await.unwrap().unwrap();
    assert_eq!(response.responses[0].partition_responses[0].base_offset, 44);

    drop(broker.await.unwrap());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn fetch_trims_leading_records_below_the_requested_offset() {
    let (addr, listener) = testsupport::listen().await;
    let broker = tokio::spawn(async move {
        let mut socket = testsupport::accept(&listener).await;
        let frame = testsupport::read_request(&mut socket).await;
        assert_eq!(frame.api_key, 1);
        // a whole batch based at 97, as a broker returns for a
        // compressed log even when offset 100 was asked for
        testsupport::write_response(
            &mut socket,
            frame.correlation_id,
            &testsupport::fetch_body("purchases", 0, 97, 5),
        )
        .await;
        socket
    });

    let conn = connect(addr).await;
    let mut req = FetchRequest::new(0, CLIENT_ID, 500, 1, 1_000_000, 0);
    req.add("purchases", 0, 100, 100_000);

    let response = conn.fetch(req).await.unwrap();

    let offsets: Vec<i64> = response.topics[0].partitions[0]
        .record_batch
        .iter()
        .flat_map(|batch| {
            batch
                .records
                .iter()
                .map(|record| batch.base_offset + record.offset_delta as i64)
        })
        .collect();
    assert_eq!(offsets, vec![100, 101]);

    drop(broker.await.unwrap());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn list_offsets_always_identifies_as_a_client() {
    let (addr, listener) = testsupport::listen().await;
    let broker = tokio::spawn(async move {
        let mut socket = testsupport::accept(&listener).await;
        let frame = testsupport::read_request(&mut socket).await;
        assert_eq!(frame.api_key, 2);
        // the connection overrides whatever replica id was set
        assert_eq!(testsupport::i32_after_client_id(&frame), -1);
        testsupport::write_response(
            &mut socket,
            frame.correlation_id,
            &testsupport::list_offsets_body("purchases", 0, 45),
        )
        .await;
        socket
    });

    let conn = connect(addr).await;
    let mut req = ListOffsetsRequest::new(0, CLIENT_ID, 5);
    req.add("purchases", 0, -1);

    let response = conn.list_offsets(req).await.unwrap();
    assert_eq!(response.topics[0].partitions[0].offset, 45);

    drop(broker.await.unwrap());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn concurrent_dispatchers_get_their_own_responses() {
    let (addr, listener) = testsupport::listen().await;
    let broker = tokio::spawn(async move {
        let mut socket = testsupport::accept(&listener).await;

        let first = testsupport::read_request(&mut socket).await;
        let second = testsupport::read_request(&mut socket).await;

        // answer in the opposite order of arrival, mapping each group
        // key to a distinct coordinator
        for frame in [second, first] {
            let node_id = match testsupport::trailing_string(&frame).as_str() {
                "group-a" => 1,
                "group-b" => 2,
                other => panic!("unexpected coordinator key {other}"),
            };
            testsupport::write_response(
                &mut socket,
                frame.correlation_id,
                &testsupport::find_coordinator_body(node_id, "localhost", 9092),
            )
            .await;
        }
        socket
    });

    let conn = connect(addr).await;
    let (a, b) = tokio::join!(
        conn.find_coordinator(FindCoordinatorRequest::new(0, CLIENT_ID, "group-a")),
        conn.find_coordinator(FindCoordinatorRequest::new(0, CLIENT_ID, "group-b")),
    );

    assert_eq!(a.unwrap().node_id, 1);
    assert_eq!(b.unwrap().node_id, 2);

    drop(broker.await.unwrap());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn read_error_cancels_every_pending_dispatcher() {
    let (addr, listener) = testsupport::listen().await;
    let broker = tokio::spawn(async move {
        let mut socket = testsupport::accept(&listener).await;
        for _ in 0..3 {
            testsupport::read_request(&mut socket).await;
        }
        // drop the socket with three requests outstanding
    });

    let conn = connect(addr).await;
    let (a, b, c) = tokio::join!(
        conn.find_coordinator(FindCoordinatorRequest::new(0, CLIENT_ID, "group-a")),
        conn.find_coordinator(FindCoordinatorRequest::new(0, CLIENT_ID, "group-b")),
        conn.find_coordinator(FindCoordinatorRequest::new(0, CLIENT_ID, "group-c")),
    );

    let expected = Error::IoError(ErrorKind::UnexpectedEof);
    assert_eq!(a.unwrap_err(), expected);
    assert_eq!(b.unwrap_err(), expected);
    assert_eq!(c.unwrap_err(), expected);

    // the terminal error is sticky for new dispatches too
    let result = conn
        .find_coordinator(FindCoordinatorRequest::new(0, CLIENT_ID, "group-d"))
        .await;
    assert_eq!(result.unwrap_err(), expected);
    assert_eq!(conn.in_flight(), 0);

    broker.await.unwrap();
    conn.close().await.unwrap();
}

#[tokio::test]
async fn missed_read_deadline_is_terminal() {
    let (addr, listener) = testsupport::listen().await;
    let broker = tokio::spawn(async move {
        let mut socket = testsupport::accept(&listener).await;
        testsupport::read_request(&mut socket).await;
        // never answer; hold the socket open past the deadline
        tokio::time::sleep(Duration::from_secs(5)).await;
        socket
    });

    let conn = Connection::connect_tcp(&[addr], CONNECT_TIMEOUT, Some(Duration::from_millis(100)))
        .await
        .unwrap();

    let result = conn
        .find_coordinator(FindCoordinatorRequest::new(0, CLIENT_ID, "group-a"))
        .await;
    assert_eq!(result.unwrap_err(), Error::IoError(ErrorKind::TimedOut));

    broker.abort();
    conn.close().await.unwrap();
}

#[tokio::test]
async fn close_fails_later_dispatches_with_closed() {
    let (addr, listener) = testsupport::listen().await;
    let broker = tokio::spawn(async move { testsupport::accept(&listener).await });

    let conn = connect(addr).await;
    conn.close().await.unwrap();
    // closing twice has no further effect
    conn.close().await.unwrap();

    let topics: [&str; 0] = [];
    let result = conn.metadata(MetadataRequest::new(0, CLIENT_ID, &topics)).await;
    assert_eq!(result.unwrap_err(), Error::Closed);
    assert_eq!(conn.in_flight(), 0);

    drop(broker.await.unwrap());
}

#[tokio::test]
async fn tls_rejects_an_unusable_ca_bundle_before_dialing() {
    // no listener exists on this address; the PEM check must fire first
    let addr = BrokerAddress {
        host: "127.0.0.1".to_string(),
        port: 1,
    };

    let result = Connection::connect_tls(
        &[addr],
        b"not a certificate",
        b"not a certificate",
        b"not a key",
        CONNECT_TIMEOUT,
        None,
    )
    .await;

    match result {
        Err(Error::Tls(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}
