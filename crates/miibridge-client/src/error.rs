use std::io;

use miibridge_image::ImageError;
use miibridge_transport::TransportError;
use miibridge_wire::{renderer_message, ProtocolVersion, ResponseFormat, WireError};

/// Errors surfaced by a render.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The avatar descriptor is not exactly 96 bytes.
    #[error("store data must be exactly 96 bytes (got {len})")]
    InvalidDescriptor { len: usize },

    /// No descriptor is stored for the account.
    #[error("no avatar data found for {0:?}")]
    LookupNotFound(String),

    /// The backend could not be reached.
    #[error("render backend {endpoint} unreachable: {source}")]
    UpstreamUnreachable {
        endpoint: String,
        source: io::Error,
    },

    /// Connecting or the exchange ran past its time bound.
    #[error("render backend {endpoint} timed out")]
    UpstreamTimeout { endpoint: String },

    /// The backend closed before sending the whole response.
    #[error("render failed: received {received} of {expected} bytes")]
    RenderFailed { expected: usize, received: usize },

    /// The backend answered with an error message.
    #[error("renderer error: {0}")]
    RendererMessage(String),

    /// The response header describes a layout this client cannot decode.
    #[error("unsupported response format: {0}")]
    UnsupportedFormat(String),

    /// A request field does not fit the chosen wire version.
    #[error("{field} = {value} does not fit the {version} wire layout")]
    EncodingConstraintViolation {
        field: &'static str,
        value: i64,
        version: ProtocolVersion,
    },

    /// The request asks for a response this entry point does not produce.
    #[error("response format {format:?} is not available through this call for {version}")]
    UnsupportedResponseFormat {
        format: ResponseFormat,
        version: ProtocolVersion,
    },

    /// Other wire-level failure.
    #[error("wire error: {0}")]
    Wire(WireError),

    /// Other transport-level failure.
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// Buffer or compositing failure.
    #[error("image error: {0}")]
    Image(#[from] ImageError),

    /// I/O error outside the backend exchange.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RenderError {
    /// Whether the request itself was at fault rather than the backend.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            RenderError::InvalidDescriptor { .. }
                | RenderError::LookupNotFound(_)
                | RenderError::EncodingConstraintViolation { .. }
                | RenderError::UnsupportedResponseFormat { .. }
                | RenderError::Image(ImageError::InvalidColorIndex(_))
        )
    }

    /// Whether the backend did not answer in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RenderError::UpstreamTimeout { .. })
    }
}

impl From<WireError> for RenderError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::InvalidDescriptor { len } => RenderError::InvalidDescriptor { len },
            WireError::EncodingConstraintViolation {
                field,
                value,
                version,
            } => RenderError::EncodingConstraintViolation {
                field,
                value,
                version,
            },
            WireError::IncompleteResponse {
                expected,
                received,
                partial,
            } => match renderer_message(&partial) {
                Some(message) => RenderError::RendererMessage(message),
                None => RenderError::RenderFailed { expected, received },
            },
            WireError::RendererError(message) => RenderError::RendererMessage(message),
            WireError::UnsupportedFormat(detail) => RenderError::UnsupportedFormat(detail),
            other => RenderError::Wire(other),
        }
    }
}

impl From<TransportError> for RenderError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect { endpoint, source }
                if source.kind() == io::ErrorKind::TimedOut =>
            {
                RenderError::UpstreamTimeout { endpoint }
            }
            TransportError::Connect { endpoint, source }
            | TransportError::Resolve { endpoint, source } => {
                RenderError::UpstreamUnreachable { endpoint, source }
            }
            other => RenderError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn incomplete_with_error_prefix_becomes_message() {
        let err: RenderError = WireError::IncompleteResponse {
            expected: 100,
            received: 20,
            partial: Bytes::from_static(b"ERROR: bad data\0\0\0\0\0"),
        }
        .into();
        assert!(matches!(err, RenderError::RendererMessage(ref m) if m == "bad data"));
    }

    #[test]
    fn incomplete_without_prefix_is_render_failed() {
        let err: RenderError = WireError::IncompleteResponse {
            expected: 100,
            received: 3,
            partial: Bytes::from_static(&[1, 2, 3]),
        }
        .into();
        assert!(matches!(
            err,
            RenderError::RenderFailed {
                expected: 100,
                received: 3
            }
        ));
    }

    #[test]
    fn connect_errors_map_by_kind() {
        let refused: RenderError = TransportError::Connect {
            endpoint: "127.0.0.1:1".into(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        }
        .into();
        assert!(matches!(refused, RenderError::UpstreamUnreachable { .. }));

        let timed_out: RenderError = TransportError::Connect {
            endpoint: "10.0.0.1:12346".into(),
            source: io::Error::from(io::ErrorKind::TimedOut),
        }
        .into();
        assert!(timed_out.is_timeout());
    }

    #[test]
    fn caller_errors_are_classified() {
        assert!(RenderError::InvalidDescriptor { len: 3 }.is_caller_error());
        assert!(RenderError::LookupNotFound("x".into()).is_caller_error());
        assert!(RenderError::Image(ImageError::InvalidColorIndex(40)).is_caller_error());
        assert!(!RenderError::RenderFailed {
            expected: 1,
            received: 0
        }
        .is_caller_error());
        assert!(!RenderError::UpstreamTimeout {
            endpoint: "x".into()
        }
        .is_caller_error());
    }
}
