//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sparrow_common::{HttpTransport, NetworkError};

/// `User-Agent` sent when the configuration does not name one.
pub const DEFAULT_USER_AGENT: &str = concat!("sparrow/", env!("CARGO_PKG_VERSION"));

/// `Accept` sent with every navigation.
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

/// Settings for a [`BrowserSession`](crate::BrowserSession).
///
/// Every field has a default, so a partial JSON document such as
/// `{"max_redirects": 3}` deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// `User-Agent` header value.
    pub user_agent: String,
    /// `Accept` header value.
    pub accept: String,
    /// Redirect hops allowed per navigation, refreshes included.
    pub max_redirects: usize,
    /// Follow `Refresh` headers and `<meta http-equiv=refresh>`.
    pub follow_refresh: bool,
    /// Send a `Referer` for navigations started from a loaded document.
    pub send_referer: bool,
    /// Keep at most this many history entries, dropping the oldest.
    pub max_history: Option<usize>,
    /// Per-request timeout of the default transport, in seconds.
    pub timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            max_redirects: 10,
            follow_refresh: true,
            send_referer: true,
            max_history: None,
            timeout_secs: sparrow_common::transport::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl SessionConfig {
    /// The request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the default HTTP transport with this configuration's timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Client`] if the HTTP client cannot be
    /// initialised.
    pub fn http_transport(&self) -> Result<HttpTransport, NetworkError> {
        HttpTransport::with_timeout(self.timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_redirects, 10);
        assert!(config.follow_refresh);
        assert!(config.user_agent.starts_with("sparrow/"));
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"max_redirects": 3, "max_history": 5}"#).unwrap();
        assert_eq!(config.max_redirects, 3);
        assert_eq!(config.max_history, Some(5));
        assert_eq!(config.accept, DEFAULT_ACCEPT);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SessionConfig {
            follow_refresh: false,
            ..SessionConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<SessionConfig>(&json).unwrap(), config);
    }
}
