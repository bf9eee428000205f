//! End-to-end tests of the blocking client against mock backends.

use std::error::Error as _;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing_subscriber::layer::SubscriberExt;

use simple_http_client::{
    ClientConfig, ClientError, HttpClient, Outcome, Request, TimeoutPhase, TransportErrorKind,
};

mod common;

use common::{test_config, MockServer, WarnCounter};

fn failure(outcome: Outcome) -> ClientError {
    match outcome {
        Outcome::Failure(e) => e,
        Outcome::Success(response) => panic!("expected failure, got {}", response.status()),
    }
}

#[test]
fn test_ok_response_succeeds() {
    let server = MockServer::start();
    let client = HttpClient::start(test_config("ok")).unwrap();

    let body = client.execute(
        Request::get(server.url("/ok")),
        |response| {
            assert_eq!(response.code(), 200);
            response.text().into_owned()
        },
        |e| panic!("unexpected failure: {e}"),
    );
    assert_eq!(body, "ok");
}

#[test]
fn test_server_errors_are_failures() {
    let server = MockServer::start();
    let client = HttpClient::start(test_config("5xx")).unwrap();

    for code in [500u16, 502, 503] {
        let err = failure(client.perform(Request::get(server.url(&format!("/status/{code}")))));
        assert_eq!(err.status(), Some(code));
        assert!(matches!(err, ClientError::RemoteServerError { .. }));
    }
}

#[test]
fn test_client_error_statuses_are_successes() {
    let server = MockServer::start();
    let client = HttpClient::start(test_config("4xx")).unwrap();

    for code in [404u16, 400, 429] {
        match client.perform(Request::get(server.url(&format!("/status/{code}")))) {
            Outcome::Success(response) => assert_eq!(response.code(), code),
            Outcome::Failure(e) => panic!("status {code} should succeed, got {e}"),
        }
    }
}

#[test]
fn test_post_body_is_sent() {
    let server = MockServer::start();
    let client = HttpClient::start(test_config("post")).unwrap();

    let outcome = client.perform(Request::post(server.url("/echo"), Bytes::from_static(b"payload")));
    match outcome {
        Outcome::Success(response) => assert_eq!(response.body().as_ref(), b"payload"),
        Outcome::Failure(e) => panic!("unexpected failure: {e}"),
    }
}

#[test]
fn test_host_header_defaults_to_authority() {
    let server = MockServer::start();
    let client = HttpClient::start(test_config("host")).unwrap();

    let response = client
        .perform(Request::get(server.url("/host")))
        .into_result()
        .unwrap();
    assert_eq!(response.text(), server.addr().to_string());
}

#[test]
fn test_socket_timeout() {
    let server = MockServer::start();
    let config = ClientConfig {
        socket_timeout_ms: 50,
        ..test_config("socket-timeout")
    };
    let client = HttpClient::start(config).unwrap();

    let started = Instant::now();
    let err = failure(client.perform(Request::get(server.url("/delay/2000"))));
    assert_eq!(err.timeout_phase(), Some(TimeoutPhase::Socket));
    assert!(started.elapsed() < Duration::from_millis(1500));
}

#[test]
fn test_response_timeout() {
    let server = MockServer::start();
    let config = ClientConfig {
        response_timeout_ms: 100,
        ..test_config("response-timeout")
    };
    let client = HttpClient::start(config).unwrap();

    let err = failure(client.perform(Request::get(server.url("/delay/2000"))));
    assert_eq!(err.timeout_phase(), Some(TimeoutPhase::Response));
}

#[test]
fn test_pool_acquisition_timeout() {
    let server = MockServer::start();
    let config = ClientConfig {
        max_connections_per_route: 1,
        acquisition_timeout_ms: 100,
        ..test_config("pool")
    };
    let client = Arc::new(HttpClient::start(config).unwrap());

    let slow = {
        let client = Arc::clone(&client);
        let url = server.url("/delay/1500");
        thread::spawn(move || client.perform(Request::get(url)))
    };
    thread::sleep(Duration::from_millis(300));

    let started = Instant::now();
    let err = failure(client.perform(Request::get(server.url("/ok"))));
    assert_eq!(err.timeout_phase(), Some(TimeoutPhase::PoolAcquisition));
    assert!(started.elapsed() < Duration::from_secs(1));

    assert!(slow.join().unwrap().is_success());
}

#[test]
fn test_exactly_one_continuation_per_request() {
    let server = MockServer::start();
    let client = HttpClient::start(test_config("continuations")).unwrap();
    let successes = AtomicUsize::new(0);
    let failures = AtomicUsize::new(0);

    let urls = [
        server.url("/ok"),
        server.url("/status/500"),
        server.url("/status/404"),
        format!("http://{}/ok", common::refused_addr()),
        "http://bad host/".to_string(),
    ];
    for url in urls {
        client.execute(
            Request::get(url),
            |_| successes.fetch_add(1, Ordering::SeqCst),
            |_| failures.fetch_add(1, Ordering::SeqCst),
        );
    }

    assert_eq!(successes.load(Ordering::SeqCst), 2);
    assert_eq!(failures.load(Ordering::SeqCst), 3);
}

#[test]
fn test_large_body_warns_once() {
    let server = MockServer::start();
    let client = HttpClient::start(test_config("large")).unwrap();
    let counter = WarnCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());

    tracing::subscriber::with_default(subscriber, || {
        let outcome = client.perform(Request::get(server.url("/large")));
        match outcome {
            Outcome::Success(response) => assert_eq!(response.len(), common::LARGE_BODY),
            Outcome::Failure(e) => panic!("unexpected failure: {e}"),
        }
        assert_eq!(counter.count(), 1);

        assert!(client.perform(Request::get(server.url("/ok"))).is_success());
        assert_eq!(counter.count(), 1);

        let err = failure(client.perform(Request::get(server.url("/large-error"))));
        assert_eq!(err.status(), Some(500));
        assert_eq!(counter.count(), 1);
    });
}

#[test]
fn test_connection_refused() {
    let client = HttpClient::start(test_config("refused")).unwrap();
    let url = format!("http://{}/ok", common::refused_addr());

    let err = failure(client.perform(Request::get(url)));
    assert_eq!(err.transport_kind(), Some(TransportErrorKind::Connect));
    let cause = err.source().and_then(|e| e.downcast_ref::<io::Error>());
    assert_eq!(
        cause.map(io::Error::kind),
        Some(io::ErrorKind::ConnectionRefused)
    );
}

#[test]
fn test_peer_closing_connection() {
    let addr = common::start_closing_backend();
    let client = HttpClient::start(test_config("closing")).unwrap();

    let err = failure(client.perform(Request::get(format!("http://{addr}/"))));
    assert_eq!(err.transport_kind(), Some(TransportErrorKind::ConnectionClosed));
    assert!(err.source().is_some());
}

#[test]
fn test_peer_reset_reports_io_cause() {
    let addr = common::start_resetting_backend();
    let client = HttpClient::start(test_config("reset")).unwrap();

    let err = failure(client.perform(Request::get(format!("http://{addr}/"))));
    assert_eq!(err.transport_kind(), Some(TransportErrorKind::ConnectionClosed));
    let cause = err
        .source()
        .and_then(|e| e.downcast_ref::<io::Error>())
        .expect("root cause should be the socket error");
    assert!(matches!(
        cause.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionAborted
    ));
}

#[test]
fn test_invalid_and_unsupported_uris() {
    let client = HttpClient::start(test_config("uris")).unwrap();

    let err = failure(client.perform(Request::get("http://bad host/")));
    assert_eq!(err.transport_kind(), Some(TransportErrorKind::InvalidUri));

    let err = failure(client.perform(Request::get("/relative/only")));
    assert_eq!(err.transport_kind(), Some(TransportErrorKind::InvalidUri));

    let err = failure(client.perform(Request::get("ftp://example.com/")));
    assert_eq!(
        err.transport_kind(),
        Some(TransportErrorKind::UnsupportedScheme)
    );
}

#[test]
fn test_keep_alive_reuses_connection() {
    let server = MockServer::start();
    let client = HttpClient::start(test_config("keep-alive")).unwrap();

    for _ in 0..3 {
        assert!(client.perform(Request::get(server.url("/ok"))).is_success());
    }

    let stats = client.pool_stats();
    assert_eq!(stats.idle, 1);
    assert_eq!(stats.leased, 0);
}

#[test]
fn test_concurrent_requests_share_bounded_pool() {
    let server = MockServer::start();
    let config = ClientConfig {
        max_connections_per_route: 2,
        acquisition_timeout_ms: 0,
        ..test_config("concurrent")
    };
    let client = Arc::new(HttpClient::start(config).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = Arc::clone(&client);
            let url = server.url("/ok");
            thread::spawn(move || {
                (0..5)
                    .filter(|_| client.perform(Request::get(url.clone())).is_success())
                    .count()
            })
        })
        .collect();

    let succeeded: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(succeeded, 40);

    let stats = client.pool_stats();
    assert_eq!(stats.leased, 0);
    assert!(stats.idle <= 2);
}

#[test]
fn test_requests_after_stop_fail() {
    let server = MockServer::start();
    let client = HttpClient::start(test_config("stopped")).unwrap();
    client.stop();

    let err = failure(client.perform(Request::get(server.url("/ok"))));
    assert_eq!(err.transport_kind(), Some(TransportErrorKind::ClientClosed));
}

#[test]
fn test_stop_fails_in_flight_request() {
    let server = MockServer::start();
    let client = Arc::new(HttpClient::start(test_config("stop-in-flight")).unwrap());

    let in_flight = {
        let client = Arc::clone(&client);
        let url = server.url("/delay/5000");
        thread::spawn(move || client.perform(Request::get(url)))
    };
    thread::sleep(Duration::from_millis(300));

    let started = Instant::now();
    client.stop();
    assert!(started.elapsed() < Duration::from_secs(3));

    let err = failure(in_flight.join().unwrap());
    assert!(
        err.is_cancelled()
            || err.transport_kind() == Some(TransportErrorKind::ConnectionClosed),
        "unexpected failure: {err}"
    );
}

#[test]
fn test_start_rejects_zero_capacity() {
    let config = ClientConfig {
        max_connections_per_route: 0,
        ..test_config("invalid")
    };
    assert!(HttpClient::start(config).is_err());
}
