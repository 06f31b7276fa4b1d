//! Connection configuration.

use std::time::Duration;

/// Port for IMAP over implicit TLS.
pub const IMAPS_PORT: u16 = 993;

/// IMAP connection configuration.
///
/// Connections always use TLS from the first byte; there is no plaintext
/// or STARTTLS mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server hostname, also used for certificate verification.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Limit for the TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
    /// Limit for waiting on any single server response.
    pub io_timeout: Duration,
}

impl Config {
    /// Creates a configuration for `host` on port 993.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: IMAPS_PORT,
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(120),
        }
    }

    /// Gmail's IMAP endpoint.
    #[must_use]
    pub fn gmail() -> Self {
        Self::new("imap.gmail.com")
    }

    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the response timeout.
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// `host:port` for the TCP connect.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::gmail();
        assert_eq!(config.host, "imap.gmail.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.address(), "imap.gmail.com:993");
    }

    #[test]
    fn test_overrides() {
        let config = Config::new("mail.example.org")
            .with_port(10993)
            .with_connect_timeout(Duration::from_secs(5))
            .with_io_timeout(Duration::from_secs(9));

        assert_eq!(config.port, 10993);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.io_timeout, Duration::from_secs(9));
    }
}
