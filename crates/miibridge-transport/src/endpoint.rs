use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::RenderStream;

/// Port the render backend listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 12346;

const UNIX_PREFIX: &str = "unix:";

/// Address of a render backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// TCP host and port.
    Tcp { host: String, port: u16 },
    /// Filesystem-path Unix domain socket.
    #[cfg(unix)]
    Unix(PathBuf),
}

impl Endpoint {
    /// TCP endpoint.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Unix domain socket endpoint.
    #[cfg(unix)]
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::Unix(path.into())
    }

    /// Open one stream connection (blocking).
    ///
    /// `timeout` bounds each TCP connect attempt; every resolved address is
    /// tried in order and the last failure is reported.
    pub fn connect(&self, timeout: Option<Duration>) -> Result<RenderStream> {
        match self {
            Endpoint::Tcp { host, port } => {
                let addrs: Vec<_> = (host.as_str(), *port)
                    .to_socket_addrs()
                    .map_err(|source| TransportError::Resolve {
                        endpoint: self.to_string(),
                        source,
                    })?
                    .collect();

                let mut last_err = None;
                for addr in addrs {
                    let attempt = match timeout {
                        Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                        None => TcpStream::connect(addr),
                    };
                    match attempt {
                        Ok(stream) => {
                            stream.set_nodelay(true)?;
                            debug!(%addr, "connected to render backend");
                            return Ok(RenderStream::from_tcp(stream));
                        }
                        Err(err) => {
                            debug!(%addr, error = %err, "connect attempt failed");
                            last_err = Some(err);
                        }
                    }
                }

                Err(TransportError::Connect {
                    endpoint: self.to_string(),
                    source: last_err.unwrap_or_else(|| {
                        std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "host resolved to no addresses",
                        )
                    }),
                })
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let _ = timeout;
                let stream = std::os::unix::net::UnixStream::connect(path).map_err(|source| {
                    TransportError::Connect {
                        endpoint: self.to_string(),
                        source,
                    }
                })?;
                debug!(?path, "connected to render backend over unix socket");
                Ok(RenderStream::from_unix(stream))
            }
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::tcp("localhost", DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => write!(f, "[{host}]:{port}"),
            Endpoint::Tcp { host, port } => write!(f, "{host}:{port}"),
            #[cfg(unix)]
            Endpoint::Unix(path) => write!(f, "{UNIX_PREFIX}{}", path.display()),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    /// Accepts `host`, `host:port`, `[v6addr]:port` and `unix:/path`.
    fn from_str(input: &str) -> Result<Self> {
        let invalid = |reason| TransportError::InvalidEndpoint {
            input: input.to_string(),
            reason,
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("endpoint must not be empty"));
        }

        if let Some(path) = trimmed.strip_prefix(UNIX_PREFIX) {
            #[cfg(unix)]
            {
                if path.is_empty() {
                    return Err(invalid("unix socket path must not be empty"));
                }
                return Ok(Self::unix(path));
            }
            #[cfg(not(unix))]
            {
                let _ = path;
                return Err(invalid("unix sockets are not supported on this platform"));
            }
        }

        let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| invalid("unterminated '[' in IPv6 host"))?;
            match after.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None if after.is_empty() => (host, None),
                None => return Err(invalid("unexpected characters after IPv6 host")),
            }
        } else {
            match trimmed.rsplit_once(':') {
                Some((host, _)) if host.contains(':') => {
                    return Err(invalid("IPv6 hosts must be wrapped in brackets"))
                }
                Some((host, port)) => (host, Some(port)),
                None => (trimmed, None),
            }
        };

        if host.is_empty() {
            return Err(invalid("host must not be empty"));
        }

        let port = match port {
            Some(port) => port.parse().map_err(|_| invalid("port is not a valid u16"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self::tcp(host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn parses_host_and_port() {
        let endpoint: Endpoint = "render.local:4000".parse().unwrap();
        assert_eq!(endpoint, Endpoint::tcp("render.local", 4000));
    }

    #[test]
    fn host_without_port_uses_default() {
        let endpoint: Endpoint = "localhost".parse().unwrap();
        assert_eq!(endpoint, Endpoint::tcp("localhost", DEFAULT_PORT));
        assert_eq!(Endpoint::default(), endpoint);
    }

    #[test]
    fn parses_bracketed_ipv6() {
        let endpoint: Endpoint = "[::1]:9000".parse().unwrap();
        assert_eq!(endpoint, Endpoint::tcp("::1", 9000));
        assert_eq!(endpoint.to_string(), "[::1]:9000");
    }

    #[test]
    fn rejects_bad_ports_and_empty_input() {
        assert!(matches!(
            "host:notaport".parse::<Endpoint>(),
            Err(TransportError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            "host:70000".parse::<Endpoint>(),
            Err(TransportError::InvalidEndpoint { .. })
        ));
        assert!("".parse::<Endpoint>().is_err());
        assert!(":12346".parse::<Endpoint>().is_err());
        assert!("::1:80".parse::<Endpoint>().is_err());
    }

    #[test]
    #[cfg(unix)]
    fn parses_unix_endpoint() {
        let endpoint: Endpoint = "unix:/tmp/render.sock".parse().unwrap();
        assert_eq!(endpoint, Endpoint::unix("/tmp/render.sock"));
        assert_eq!(endpoint.to_string(), "unix:/tmp/render.sock");
        assert!("unix:".parse::<Endpoint>().is_err());
    }

    #[test]
    fn tcp_connect_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            conn.read_exact(&mut buf).unwrap();
            conn.write_all(&buf).unwrap();
        });

        let mut stream = Endpoint::tcp("127.0.0.1", port)
            .connect(Some(Duration::from_secs(2)))
            .unwrap();
        stream.write_all(b"ping").unwrap();
        let mut echoed = [0u8; 4];
        stream.read_exact(&mut echoed).unwrap();
        assert_eq!(&echoed, b"ping");

        server.join().unwrap();
    }

    #[test]
    fn connect_refused_is_reported() {
        // Bind then drop to get a port with nothing listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = Endpoint::tcp("127.0.0.1", port)
            .connect(Some(Duration::from_secs(1)))
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::ConnectionRefused));
    }
}
