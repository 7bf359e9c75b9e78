use std::fmt;
use std::io;

use miibridge::client::RenderError;
use miibridge::image::ImageError;
use miibridge::transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    /// Error that exits with `code`.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Map an I/O failure to an exit code.
pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Map a transport failure to an exit code.
pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidEndpoint { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

/// Map an image failure to an exit code.
pub fn image_error(context: &str, err: ImageError) -> CliError {
    match err {
        ImageError::Decode(::image::ImageError::IoError(source)) => io_error(context, source),
        ImageError::Decode(_) | ImageError::InvalidColorIndex(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

/// Map a render failure to an exit code.
pub fn render_error(context: &str, err: RenderError) -> CliError {
    if err.is_caller_error() {
        return CliError::new(DATA_INVALID, format!("{context}: {err}"));
    }
    match err {
        RenderError::UpstreamTimeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        RenderError::UpstreamUnreachable { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        RenderError::Transport(err) => transport_error(context, err),
        RenderError::Image(err) => image_error(context, err),
        RenderError::Io(source) => io_error(context, source),
        RenderError::RenderFailed { .. }
        | RenderError::RendererMessage(_)
        | RenderError::UnsupportedFormat(_)
        | RenderError::Wire(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_errors_map_to_exit_codes() {
        let code = |err| render_error("render", err).code;

        assert_eq!(code(RenderError::InvalidDescriptor { len: 4 }), DATA_INVALID);
        assert_eq!(code(RenderError::LookupNotFound("x".into())), DATA_INVALID);
        assert_eq!(
            code(RenderError::UpstreamTimeout {
                endpoint: "h:1".into()
            }),
            TIMEOUT
        );
        assert_eq!(
            code(RenderError::UpstreamUnreachable {
                endpoint: "h:1".into(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
            TRANSPORT_ERROR
        );
        assert_eq!(
            code(RenderError::RendererMessage("bad data".into())),
            FAILURE
        );
    }

    #[test]
    fn invalid_endpoint_is_usage() {
        let err = TransportError::InvalidEndpoint {
            input: "::1".into(),
            reason: "IPv6 hosts must be bracketed",
        };
        assert_eq!(transport_error("upstream", err).code, USAGE);
    }

    #[test]
    fn message_keeps_context() {
        let err = io_error("writing out.png", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.code, PERMISSION_DENIED);
        assert!(err.to_string().starts_with("writing out.png: "));
    }
}
