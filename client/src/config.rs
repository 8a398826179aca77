//! Session configuration.

use feedme_protocol::FEEDME_VERSION;

/// Tunables for a [`crate::session::Session`].
///
/// Reconnection policy, timeouts and request retries are configured in the
/// layers above the core, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Protocol versions offered in the handshake, in preference order.
    pub versions: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            versions: vec![FEEDME_VERSION.to_string()],
        }
    }
}
