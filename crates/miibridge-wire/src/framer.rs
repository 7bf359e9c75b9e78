use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::error::{Result, WireError};
use crate::glb::{GlbHeader, GLB_HEADER_LEN};
use crate::tga::{TgaHeader, TGA_HEADER_LEN};

/// Responses starting with this are a renderer error message, not a payload.
pub const RENDERER_ERROR_PREFIX: &[u8] = b"ERROR: ";

/// Default maximum response size (256 MiB).
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 256 * 1024 * 1024;

const READ_CHUNK_SIZE: usize = 16 * 1024;
// Upper bound on how much of an error message is drained after the header.
const MAX_ERROR_MESSAGE_LEN: usize = 4096;

/// Response framing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerConfig {
    /// Largest response accepted, fixed or header-declared.
    pub max_response_size: usize,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

/// Outcome of one accumulate loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulated {
    pub bytes: Bytes,
    /// `false` when the peer closed before the requested count arrived.
    pub complete: bool,
}

/// A header-framed image response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TgaResponse {
    pub header: TgaHeader,
    /// Pixel payload only; the header is not included.
    pub pixels: Bytes,
}

/// Reads exactly one response from any `Read` stream.
///
/// Short reads are expected and absorbed; a zero-length read means the peer
/// closed, and anything accumulated up to that point is kept for diagnostics.
pub struct ResponseFramer<R> {
    inner: R,
    buf: BytesMut,
    config: FramerConfig,
}

impl<R: Read> ResponseFramer<R> {
    /// Create a framer with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, FramerConfig::default())
    }

    /// Create a framer with explicit configuration.
    pub fn with_config(inner: R, config: FramerConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            config,
        }
    }

    /// Read until `n` bytes are held or the peer closes.
    ///
    /// Never reads past `n`, so the stream stays positioned for whatever
    /// follows.
    pub fn accumulate(&mut self, n: usize) -> Result<Accumulated> {
        self.buf.clear();
        self.buf.reserve(n.min(READ_CHUNK_SIZE * 4));

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        while self.buf.len() < n {
            let want = (n - self.buf.len()).min(READ_CHUNK_SIZE);
            let read = match self.inner.read(&mut chunk[..want]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };

            if read == 0 {
                debug!(expected = n, received = self.buf.len(), "peer closed mid-response");
                break;
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }

        let bytes = self.buf.split().freeze();
        Ok(Accumulated {
            complete: bytes.len() == n,
            bytes,
        })
    }

    /// Fixed-size mode: exactly `n` bytes or [`WireError::IncompleteResponse`].
    pub fn read_fixed(&mut self, n: usize) -> Result<Bytes> {
        self.check_size(n)?;
        let Accumulated { bytes, complete } = self.accumulate(n)?;
        if !complete {
            return Err(WireError::IncompleteResponse {
                expected: n,
                received: bytes.len(),
                partial: bytes,
            });
        }
        debug!(len = n, "read fixed-size response");
        Ok(bytes)
    }

    /// Header-driven mode: an 18-byte TGA header then the RGBA payload.
    ///
    /// The header is validated before any payload byte is read.
    pub fn read_tga(&mut self) -> Result<TgaResponse> {
        let raw = self.read_header::<TGA_HEADER_LEN>()?;
        let header = TgaHeader::parse(&raw);
        header.validate()?;
        debug!(
            width = header.width,
            height = header.height,
            top_left = header.is_top_left(),
            "parsed TGA response header"
        );

        let pixels = self.read_fixed(header.payload_len())?;
        Ok(TgaResponse { header, pixels })
    }

    /// Binary glTF mode: the whole file, header included.
    pub fn read_glb(&mut self) -> Result<Bytes> {
        let raw = self.read_header::<GLB_HEADER_LEN>()?;
        let header = GlbHeader::parse(&raw);
        if !header.has_valid_magic() {
            return Err(WireError::InvalidGlbMagic(header.magic));
        }

        let total = header.length as usize;
        if total < GLB_HEADER_LEN {
            return Err(WireError::UnsupportedFormat(format!(
                "GLB length {total} is shorter than its header"
            )));
        }
        self.check_size(total)?;

        let body = match self.read_fixed(total - GLB_HEADER_LEN) {
            Ok(body) => body,
            Err(WireError::IncompleteResponse { received, .. }) => {
                return Err(WireError::IncompleteResponse {
                    expected: total,
                    received: GLB_HEADER_LEN + received,
                    partial: Bytes::copy_from_slice(&raw),
                })
            }
            Err(err) => return Err(err),
        };

        let mut file = BytesMut::with_capacity(total);
        file.extend_from_slice(&raw);
        file.extend_from_slice(&body);
        debug!(len = total, "read GLB response");
        Ok(file.freeze())
    }

    fn read_header<const N: usize>(&mut self) -> Result<[u8; N]> {
        let Accumulated { bytes, complete } = self.accumulate(N)?;

        if bytes.starts_with(RENDERER_ERROR_PREFIX) {
            let mut message = bytes.to_vec();
            if complete {
                let rest = self.accumulate(MAX_ERROR_MESSAGE_LEN)?;
                message.extend_from_slice(&rest.bytes);
            }
            let message = renderer_message(&message).unwrap_or_default();
            warn!(%message, "renderer returned an error");
            return Err(WireError::RendererError(message));
        }

        if !complete {
            return Err(WireError::IncompleteResponse {
                expected: N,
                received: bytes.len(),
                partial: bytes,
            });
        }

        let mut raw = [0u8; N];
        raw.copy_from_slice(&bytes);
        Ok(raw)
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.config.max_response_size {
            return Err(WireError::ResponseTooLarge {
                size,
                max: self.config.max_response_size,
            });
        }
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the framer and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }
}

/// Read one response from `stream`.
///
/// `Some(n)` selects fixed-size mode; `None` reads a TGA header first and
/// returns only the pixel payload.
pub fn read_response<R: Read>(stream: R, expected: Option<usize>) -> Result<Bytes> {
    let mut framer = ResponseFramer::new(stream);
    match expected {
        Some(n) => framer.read_fixed(n),
        None => framer.read_tga().map(|response| response.pixels),
    }
}

/// The renderer's message if `bytes` carries the error prefix.
///
/// The message ends at the first NUL, as the renderer pads its reply.
pub fn renderer_message(bytes: &[u8]) -> Option<String> {
    let rest = bytes.strip_prefix(RENDERER_ERROR_PREFIX)?;
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    Some(String::from_utf8_lossy(&rest[..end]).trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use super::*;

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::new(ErrorKind::Interrupted, "interrupted"));
            }
            self.inner.read(buf)
        }
    }

    fn tga_response(header: TgaHeader, payload: &[u8]) -> Vec<u8> {
        let mut wire = header.to_bytes().to_vec();
        wire.extend_from_slice(payload);
        wire
    }

    #[test]
    fn fixed_read_exact() {
        let mut framer = ResponseFramer::new(Cursor::new(vec![7u8; 64]));
        let bytes = framer.read_fixed(64).unwrap();
        assert_eq!(bytes.len(), 64);
    }

    #[test]
    fn fixed_read_does_not_overread() {
        let mut framer = ResponseFramer::new(Cursor::new(vec![1u8; 100]));
        framer.read_fixed(40).unwrap();
        assert_eq!(framer.get_ref().position(), 40);
    }

    #[test]
    fn partial_read_handling() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut framer = ResponseFramer::new(ByteByByteReader {
            bytes: payload.clone(),
            pos: 0,
        });
        let bytes = framer.read_fixed(1000).unwrap();
        assert_eq!(bytes.as_ref(), payload.as_slice());
    }

    #[test]
    fn interrupted_read_is_retried() {
        let mut framer = ResponseFramer::new(InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(vec![9u8; 16]),
        });
        assert_eq!(framer.read_fixed(16).unwrap().as_ref(), &[9u8; 16]);
    }

    #[test]
    fn early_close_is_incomplete_with_partial_bytes() {
        let mut framer = ResponseFramer::new(Cursor::new(vec![5u8; 10]));
        match framer.read_fixed(64).unwrap_err() {
            WireError::IncompleteResponse {
                expected,
                received,
                partial,
            } => {
                assert_eq!(expected, 64);
                assert_eq!(received, 10);
                assert_eq!(partial.as_ref(), &[5u8; 10]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_length_expected_is_clean() {
        let mut framer = ResponseFramer::new(Cursor::new(Vec::<u8>::new()));
        assert!(framer.read_fixed(0).unwrap().is_empty());
    }

    #[test]
    fn empty_stream_with_expected_bytes_is_incomplete() {
        let mut framer = ResponseFramer::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(
            framer.read_fixed(4).unwrap_err(),
            WireError::IncompleteResponse { received: 0, .. }
        ));
    }

    #[test]
    fn accumulate_reports_completeness() {
        let mut framer = ResponseFramer::new(Cursor::new(vec![1u8; 3]));
        let acc = framer.accumulate(8).unwrap();
        assert!(!acc.complete);
        assert_eq!(acc.bytes.len(), 3);
    }

    #[test]
    fn tga_header_mode_reads_declared_payload() {
        let payload: Vec<u8> = (0..64u8).collect();
        let wire = tga_response(TgaHeader::rgba(4, 4), &payload);
        let mut framer = ResponseFramer::new(ByteByByteReader { bytes: wire, pos: 0 });

        let response = framer.read_tga().unwrap();
        assert_eq!(response.header.width, 4);
        assert_eq!(response.pixels.as_ref(), payload.as_slice());
    }

    #[test]
    fn tga_header_with_unsupported_depth_reads_no_payload() {
        let header = TgaHeader {
            bits_per_pixel: 24,
            ..TgaHeader::rgba(2, 2)
        };
        let wire = tga_response(header, &[0u8; 12]);
        let mut framer = ResponseFramer::new(Cursor::new(wire));

        assert!(matches!(
            framer.read_tga().unwrap_err(),
            WireError::UnsupportedFormat(_)
        ));
        assert_eq!(framer.get_ref().position(), TGA_HEADER_LEN as u64);
    }

    #[test]
    fn tga_payload_short_is_incomplete() {
        let wire = tga_response(TgaHeader::rgba(4, 4), &[0u8; 20]);
        let mut framer = ResponseFramer::new(Cursor::new(wire));
        assert!(matches!(
            framer.read_tga().unwrap_err(),
            WireError::IncompleteResponse {
                expected: 64,
                received: 20,
                ..
            }
        ));
    }

    #[test]
    fn tga_declared_size_over_limit_is_rejected() {
        let wire = tga_response(TgaHeader::rgba(1000, 1000), &[]);
        let mut framer = ResponseFramer::with_config(
            Cursor::new(wire),
            FramerConfig {
                max_response_size: 1024,
            },
        );
        assert!(matches!(
            framer.read_tga().unwrap_err(),
            WireError::ResponseTooLarge {
                size: 4_000_000,
                max: 1024
            }
        ));
    }

    #[test]
    fn renderer_error_prefix_is_surfaced() {
        let mut wire = b"ERROR: invalid store data".to_vec();
        wire.extend_from_slice(&[0u8; 40]);
        let mut framer = ResponseFramer::new(Cursor::new(wire));
        match framer.read_tga().unwrap_err() {
            WireError::RendererError(message) => assert_eq!(message, "invalid store data"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn short_renderer_error_is_surfaced() {
        let mut framer = ResponseFramer::new(Cursor::new(b"ERROR: no".to_vec()));
        assert!(matches!(
            framer.read_glb().unwrap_err(),
            WireError::RendererError(message) if message == "no"
        ));
    }

    #[test]
    fn renderer_message_parsing() {
        assert_eq!(renderer_message(b"ERROR: bad\0junk").as_deref(), Some("bad"));
        assert_eq!(renderer_message(b"\x00\x00\x02"), None);
    }

    #[test]
    fn glb_mode_returns_whole_file() {
        let mut wire = Vec::new();
        GlbHeader::new(32).write_to(&mut wire);
        wire.extend_from_slice(&[0xAB; 20]);
        wire.extend_from_slice(b"trailing");

        let mut framer = ResponseFramer::new(Cursor::new(wire));
        let file = framer.read_glb().unwrap();
        assert_eq!(file.len(), 32);
        assert_eq!(&file[..4], b"glTF");
        assert_eq!(&file[12..], &[0xAB; 20]);
    }

    #[test]
    fn glb_bad_magic_is_rejected() {
        let mut wire = vec![0u8; 12];
        wire[8] = 12;
        let mut framer = ResponseFramer::new(Cursor::new(wire));
        assert!(matches!(
            framer.read_glb().unwrap_err(),
            WireError::InvalidGlbMagic(0)
        ));
    }

    #[test]
    fn glb_truncated_reports_total_length() {
        let mut wire = Vec::new();
        GlbHeader::new(100).write_to(&mut wire);
        wire.extend_from_slice(&[1u8; 30]);
        let mut framer = ResponseFramer::new(Cursor::new(wire));
        assert!(matches!(
            framer.read_glb().unwrap_err(),
            WireError::IncompleteResponse {
                expected: 100,
                received: 42,
                ..
            }
        ));
    }

    #[test]
    fn read_response_selects_mode() {
        let fixed = read_response(Cursor::new(vec![3u8; 8]), Some(8)).unwrap();
        assert_eq!(fixed.len(), 8);

        let wire = tga_response(TgaHeader::rgba(1, 2), &[4u8; 8]);
        let pixels = read_response(Cursor::new(wire), None).unwrap();
        assert_eq!(pixels.as_ref(), &[4u8; 8]);
    }
}
