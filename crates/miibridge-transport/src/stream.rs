use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

enum Inner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

/// A connected stream to the render backend.
///
/// An optional deadline bounds the whole exchange: before every read or
/// write the socket timeout is re-armed to the time remaining, and once the
/// deadline has passed operations fail with [`ErrorKind::TimedOut`].
pub struct RenderStream {
    inner: Inner,
    deadline: Option<Instant>,
}

impl RenderStream {
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: Inner::Tcp(stream),
            deadline: None,
        }
    }

    /// Wrap an already-connected Unix stream.
    #[cfg(unix)]
    pub fn from_unix(stream: UnixStream) -> Self {
        Self {
            inner: Inner::Unix(stream),
            deadline: None,
        }
    }

    /// Connected in-process pair, for tests and local stubs.
    #[cfg(unix)]
    pub fn pair() -> io::Result<(Self, UnixStream)> {
        let (a, b) = UnixStream::pair()?;
        Ok((Self::from_unix(a), b))
    }

    /// Bound every subsequent operation by `timeout` from now.
    ///
    /// `None` clears the deadline and blocks indefinitely.
    pub fn set_deadline(&mut self, timeout: Option<Duration>) {
        self.deadline = timeout.map(|timeout| Instant::now() + timeout);
    }

    /// Time left before the deadline, `None` when no deadline is armed.
    pub fn remaining(&self) -> io::Result<Option<Duration>> {
        match self.deadline {
            None => Ok(None),
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    Err(io::Error::new(
                        ErrorKind::TimedOut,
                        "render deadline exceeded",
                    ))
                } else {
                    Ok(Some(left))
                }
            }
        }
    }

    fn arm_read(&self) -> io::Result<()> {
        let timeout = self.remaining()?;
        match &self.inner {
            Inner::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            Inner::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }

    fn arm_write(&self) -> io::Result<()> {
        let timeout = self.remaining()?;
        match &self.inner {
            Inner::Tcp(stream) => stream.set_write_timeout(timeout),
            #[cfg(unix)]
            Inner::Unix(stream) => stream.set_write_timeout(timeout),
        }
    }

    // Unix platforms report an expired socket timeout as WouldBlock.
    fn map_timeout(&self, err: io::Error) -> io::Error {
        if self.deadline.is_some() && err.kind() == ErrorKind::WouldBlock {
            io::Error::new(ErrorKind::TimedOut, "render deadline exceeded")
        } else {
            err
        }
    }
}

impl Read for RenderStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.arm_read()?;
        let result = match &mut self.inner {
            Inner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Inner::Unix(stream) => stream.read(buf),
        };
        result.map_err(|err| self.map_timeout(err))
    }
}

impl Write for RenderStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.arm_write()?;
        let result = match &mut self.inner {
            Inner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Inner::Unix(stream) => stream.write(buf),
        };
        result.map_err(|err| self.map_timeout(err))
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Inner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Inner::Unix(stream) => stream.flush(),
        }
    }
}

impl fmt::Debug for RenderStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner {
            Inner::Tcp(_) => "tcp",
            #[cfg(unix)]
            Inner::Unix(_) => "unix",
        };
        f.debug_struct("RenderStream")
            .field("kind", &kind)
            .field("deadline", &self.deadline)
            .finish()
    }
}
