//! Yahoo provider against a local canned-response HTTP server.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tickchart_core::data::{
    Cell, CircuitBreaker, DataError, DataProvider, HistoryRequest, YahooConfig, YahooProvider,
};

/// Serve each canned `(status line, body)` to one connection, in order.
/// Returns the base URL and a handle yielding the request lines seen.
fn serve(responses: Vec<(&'static str, String)>) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/v8/finance/chart", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let request = String::from_utf8_lossy(&buf);
            seen.push(request.lines().next().unwrap_or_default().to_string());

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
        seen
    });

    (base, handle)
}

fn provider(base_url: String, max_retries: u32, breaker: Arc<CircuitBreaker>) -> YahooProvider {
    let config = YahooConfig {
        base_url,
        timeout: Duration::from_secs(5),
        max_retries,
        base_delay: Duration::from_millis(10),
        ..YahooConfig::default()
    };
    YahooProvider::new(config, breaker).unwrap()
}

fn breaker() -> Arc<CircuitBreaker> {
    Arc::new(CircuitBreaker::new(3, Duration::from_secs(60)))
}

const OK_BODY: &str = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200],
    "indicators":{"quote":[{"open":[187.15,184.22],"high":[188.44,185.88],
    "low":[183.89,183.43],"close":[185.64,"oops"],"volume":[82488700,null]}]}}],"error":null}}"#;

#[test]
fn fetches_and_keeps_raw_cells() {
    let (base, server) = serve(vec![("200 OK", OK_BODY.to_string())]);
    let yahoo = provider(base, 0, breaker());

    let result = yahoo.fetch(&HistoryRequest::recent_daily("AAPL")).unwrap();
    assert_eq!(result.table.row_count(), 2);
    // Close column keeps the malformed cell for the normalizer to judge.
    assert_eq!(result.table.cell(3, 1), &Cell::Text("oops".into()));
    assert_eq!(result.table.cell(4, 1), &Cell::Missing);

    let seen = server.join().unwrap();
    assert!(seen[0].starts_with("GET /v8/finance/chart/AAPL?range=5d&interval=1d"));
}

#[test]
fn not_found_body_maps_to_symbol_not_found() {
    let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
    let (base, server) = serve(vec![("404 Not Found", body.to_string())]);
    let yahoo = provider(base, 0, breaker());

    let err = yahoo.fetch(&HistoryRequest::recent_daily("ZZZZ")).unwrap_err();
    assert!(matches!(err, DataError::SymbolNotFound { ref symbol } if symbol == "ZZZZ"));
    server.join().unwrap();
}

#[test]
fn forbidden_trips_the_breaker() {
    let (base, server) = serve(vec![("403 Forbidden", "{}".to_string())]);
    let cb = breaker();
    let yahoo = provider(base, 0, cb.clone());

    let err = yahoo.fetch(&HistoryRequest::recent_daily("AAPL")).unwrap_err();
    assert!(matches!(err, DataError::CircuitBreakerTripped { .. }));
    assert!(!yahoo.is_available());
    server.join().unwrap();

    // Refused without touching the network.
    let again = yahoo.fetch(&HistoryRequest::recent_daily("AAPL")).unwrap_err();
    assert!(matches!(again, DataError::CircuitBreakerTripped { .. }));
}

#[test]
fn server_errors_are_retried_when_configured() {
    let (base, server) = serve(vec![
        ("500 Internal Server Error", "{}".to_string()),
        ("200 OK", OK_BODY.to_string()),
    ]);
    let yahoo = provider(base, 1, breaker());

    let result = yahoo.fetch(&HistoryRequest::recent_daily("AAPL")).unwrap();
    assert_eq!(result.table.row_count(), 2);
    assert_eq!(server.join().unwrap().len(), 2);
}

#[test]
fn server_error_without_retries_is_reported() {
    let (base, server) = serve(vec![("502 Bad Gateway", "{}".to_string())]);
    let yahoo = provider(base, 0, breaker());

    let err = yahoo.fetch(&HistoryRequest::recent_daily("AAPL")).unwrap_err();
    assert!(err.to_string().contains("502"), "{err}");
    server.join().unwrap();
}

#[test]
fn unreachable_host_is_network_error() {
    // Bind then drop to get a port nobody listens on.
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let yahoo = provider(format!("http://127.0.0.1:{port}/chart"), 0, breaker());

    let err = yahoo.fetch(&HistoryRequest::recent_daily("AAPL")).unwrap_err();
    assert!(matches!(err, DataError::NetworkUnreachable(_)), "{err:?}");
}
