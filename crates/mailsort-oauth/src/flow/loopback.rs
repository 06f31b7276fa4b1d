//! One-shot HTTP listener on the loopback interface that receives the
//! authorization redirect.

use crate::error::{Error, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};
use url::Url;

/// Upper bound on the request head we are willing to read.
const MAX_REQUEST_HEAD: usize = 8 * 1024;

const SUCCESS_PAGE: &str = "<html><body><h3>Authorization complete.</h3>\
<p>You can close this window and return to mailsort.</p></body></html>";

const FAILURE_PAGE: &str = "<html><body><h3>Authorization failed.</h3>\
<p>Return to mailsort for details.</p></body></html>";

/// What the identity provider put in the redirect query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResponse {
    /// Consent granted.
    Code {
        /// Authorization code to exchange.
        code: String,
        /// Echoed `state` parameter.
        state: Option<String>,
    },
    /// Consent refused or the request was rejected.
    Error {
        /// Error code (e.g., `access_denied`).
        error: String,
        /// Optional description.
        description: Option<String>,
    },
}

impl AuthorizationResponse {
    /// Parses the request target of the redirect (`/path?query`).
    ///
    /// Returns `None` for requests that carry neither a code nor an error,
    /// such as a browser asking for `/favicon.ico`.
    #[must_use]
    pub fn from_request_target(target: &str) -> Option<Self> {
        let url = Url::parse("http://127.0.0.1").ok()?.join(target).ok()?;

        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut description = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Some(Self::Error { error, description });
        }
        code.map(|code| Self::Code { code, state })
    }
}

/// Listener bound to `127.0.0.1` on an ephemeral port.
#[derive(Debug)]
pub struct LoopbackListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl LoopbackListener {
    /// Binds to an OS-assigned port on the loopback interface.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        debug!(%addr, "loopback listener bound");
        Ok(Self { listener, addr })
    }

    /// Port the listener is bound to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Redirect URI to register in the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/", self.addr.port())
    }

    /// Waits for the redirect and returns the authorization code.
    ///
    /// Requests without a code or error are answered with 404 and ignored.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if nothing usable arrives within `timeout`
    /// - [`Error::AccessDenied`] if the user refused consent
    /// - [`Error::StateMismatch`] if the echoed state differs from `expected_state`
    pub async fn wait_for_code(&self, expected_state: &str, timeout: Duration) -> Result<String> {
        tokio::time::timeout(timeout, self.accept_redirect(expected_state))
            .await
            .map_err(|_| Error::Timeout(timeout.as_secs()))?
    }

    async fn accept_redirect(&self, expected_state: &str) -> Result<String> {
        loop {
            let (mut stream, peer) = self.listener.accept().await?;
            let target = match read_request_target(&mut stream).await {
                Ok(target) => target,
                Err(e) => {
                    warn!(%peer, error = %e, "discarding malformed request on loopback listener");
                    continue;
                }
            };

            match AuthorizationResponse::from_request_target(&target) {
                None => {
                    respond(&mut stream, "404 Not Found", "").await;
                }
                Some(AuthorizationResponse::Error { error, description }) => {
                    respond(&mut stream, "200 OK", FAILURE_PAGE).await;
                    if error == "access_denied" {
                        return Err(Error::AccessDenied);
                    }
                    return Err(Error::oauth_error(error, description.unwrap_or_default()));
                }
                Some(AuthorizationResponse::Code { code, state }) => {
                    if state.as_deref() != Some(expected_state) {
                        respond(&mut stream, "400 Bad Request", FAILURE_PAGE).await;
                        return Err(Error::StateMismatch);
                    }
                    respond(&mut stream, "200 OK", SUCCESS_PAGE).await;
                    return Ok(code);
                }
            }
        }
    }
}

/// Reads the request head and returns the request target of the request line.
async fn read_request_target(stream: &mut TcpStream) -> Result<String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain headers so the client sees a clean response.
    let mut consumed = request_line.len();
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        consumed += n;
        if n == 0 || line == "\r\n" || line == "\n" || consumed > MAX_REQUEST_HEAD {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Ok(target.to_string()),
        _ => Err(Error::InvalidResponse(format!(
            "unexpected request line: {}",
            request_line.trim_end()
        ))),
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!(error = %e, "failed to answer loopback request");
    }
    let _ = stream.shutdown().await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn send(port: u16, target: &str) -> String {
        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap();
        let request = format!("GET {target} HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[test]
    fn test_parse_code() {
        let parsed = AuthorizationResponse::from_request_target("/?state=xyz&code=4%2F0Ab&scope=s");
        assert_eq!(
            parsed,
            Some(AuthorizationResponse::Code {
                code: "4/0Ab".into(),
                state: Some("xyz".into()),
            })
        );
    }

    #[test]
    fn test_parse_error_wins_over_code() {
        let parsed = AuthorizationResponse::from_request_target("/?error=access_denied&code=x");
        assert!(matches!(
            parsed,
            Some(AuthorizationResponse::Error { ref error, .. }) if error == "access_denied"
        ));
    }

    #[test]
    fn test_parse_unrelated_request() {
        assert_eq!(AuthorizationResponse::from_request_target("/favicon.ico"), None);
    }

    #[tokio::test]
    async fn test_receives_code() {
        let listener = LoopbackListener::bind().await.unwrap();
        assert!(listener.redirect_uri().starts_with("http://127.0.0.1:"));
        let port = listener.port();

        let client = tokio::spawn(async move {
            let favicon = send(port, "/favicon.ico").await;
            let ok = send(port, "/?state=s1&code=abc").await;
            (favicon, ok)
        });

        let code = listener
            .wait_for_code("s1", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(code, "abc");

        let (favicon, ok) = client.await.unwrap();
        assert!(favicon.starts_with("HTTP/1.1 404"));
        assert!(ok.starts_with("HTTP/1.1 200"));
    }

    #[tokio::test]
    async fn test_state_mismatch() {
        let listener = LoopbackListener::bind().await.unwrap();
        let port = listener.port();
        let client = tokio::spawn(async move { send(port, "/?state=other&code=abc").await });

        let result = listener.wait_for_code("s1", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(Error::StateMismatch)));
        assert!(client.await.unwrap().starts_with("HTTP/1.1 400"));
    }

    #[tokio::test]
    async fn test_access_denied() {
        let listener = LoopbackListener::bind().await.unwrap();
        let port = listener.port();
        let client = tokio::spawn(async move { send(port, "/?error=access_denied&state=s1").await });

        let result = listener.wait_for_code("s1", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(Error::AccessDenied)));
        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout() {
        let listener = LoopbackListener::bind().await.unwrap();
        let result = listener
            .wait_for_code("s1", Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(Error::Timeout(0))));
    }
}
