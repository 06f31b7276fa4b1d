//! TLS transport.

#![allow(clippy::missing_errors_doc)]

use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use super::config::Config;
use crate::{Error, Result};

/// A connected IMAP stream: TLS over TCP.
pub type ImapStream = TlsStream<TcpStream>;

/// Creates a TLS connector trusting the Mozilla root set.
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Connects to `config.host:config.port` and completes the TLS handshake.
///
/// Both steps together are bounded by `config.connect_timeout`.
pub async fn connect_tls(config: &Config) -> Result<ImapStream> {
    let server_name = ServerName::try_from(config.host.clone())?;
    let connector = create_tls_connector();
    let address = config.address();

    let connect = async move {
        let tcp = TcpStream::connect(&address).await?;
        debug!(%address, "TCP connected, starting TLS");
        let tls = connector.connect(server_name, tcp).await?;
        Ok::<_, Error>(tls)
    };

    tokio::time::timeout(config.connect_timeout, connect)
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))?
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tls_connector() {
        let _connector = create_tls_connector();
    }

    #[tokio::test]
    async fn test_invalid_host_name() {
        let config = Config::new("not a hostname");
        assert!(matches!(
            connect_tls(&config).await,
            Err(Error::InvalidDnsName(_))
        ));
    }
}
