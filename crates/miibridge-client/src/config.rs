use std::time::Duration;

use miibridge_wire::DEFAULT_MAX_RESPONSE_SIZE;

/// Render client configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bound on establishing the connection.
    pub connect_timeout: Duration,
    /// Bound on the whole exchange once connected.
    pub deadline: Duration,
    /// Largest response accepted from the backend.
    pub max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            deadline: Duration::from_secs(30),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}
