use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use miibridge_transport::Endpoint;

/// One-shot backend: reads `request_len` bytes, writes `response`, closes.
///
/// The join handle yields the request bytes it received.
pub(crate) fn spawn_backend(
    request_len: usize,
    response: Vec<u8>,
) -> (Endpoint, JoinHandle<Vec<u8>>) {
    spawn_backend_with_delay(request_len, response, None)
}

pub(crate) fn spawn_backend_with_delay(
    request_len: usize,
    response: Vec<u8>,
    delay: Option<Duration>,
) -> (Endpoint, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut conn, _) = listener.accept().unwrap();
        let mut request = vec![0u8; request_len];
        conn.read_exact(&mut request).unwrap();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        // The client may already have given up.
        let _ = conn.write_all(&response);
        request
    });

    (Endpoint::tcp("127.0.0.1", port), handle)
}

/// An endpoint with nothing listening on it.
pub(crate) fn dead_endpoint() -> Endpoint {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    Endpoint::tcp("127.0.0.1", port)
}
