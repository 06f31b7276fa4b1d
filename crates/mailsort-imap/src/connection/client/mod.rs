//! Type-state IMAP client.
//!
//! The connection moves through three states:
//!
//! - `NotAuthenticated`: after the greeting
//! - `Authenticated`: after a successful AUTHENTICATE
//! - `Selected`: after a successful SELECT
//!
//! Each state only exposes the commands valid in it, and transitions
//! consume the client so a stale handle cannot be reused.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace, warn};

pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::{FramedStream, is_tagged_for};
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

/// IMAP client connection with type-state.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) io_timeout: Option<Duration>,
    pub(crate) state: State,
}

impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Untagged data and completion code of a finished command.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    pub(crate) untagged: Vec<UntaggedResponse>,
    pub(crate) code: Option<ResponseCode>,
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns true if the server offers Gmail labels (`X-GM-EXT-1`).
    #[must_use]
    pub fn supports_gmail_labels(&self) -> bool {
        self.has_capability(&Capability::GmailExt1)
    }

    /// Sets a limit on how long to wait for each server response.
    #[must_use]
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    /// Sends a CAPABILITY command and updates the stored capabilities.
    pub(crate) async fn capability(&mut self) -> Result<Vec<Capability>> {
        self.execute(&Command::Capability).await?;
        Ok(self.capabilities.clone())
    }

    /// Moves the connection into another state.
    pub(crate) fn transition<Next>(self, state: Next) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            io_timeout: self.io_timeout,
            state,
        }
    }

    /// Reads the next response, honoring the I/O timeout.
    pub(crate) async fn read_response(&mut self) -> Result<Bytes> {
        match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, self.stream.read_response())
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => self.stream.read_response().await,
        }
    }

    /// Sends a command and collects responses until its completion.
    ///
    /// Capability data seen along the way refreshes the stored list. A
    /// NO, BAD or BYE completion becomes the matching error.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Completion> {
        let tag = self.tag_gen.next_tag();
        trace!(%tag, command = command.name(), "sending command");
        self.stream
            .write_command(&command.serialize(tag.as_str()))
            .await?;

        let mut completion = Completion::default();

        loop {
            let raw = self.read_response().await?;
            let response = match ResponseParser::parse(&raw) {
                Ok(response) => response,
                Err(e) if is_tagged_for(&raw, tag.as_str()) => return Err(e),
                Err(e) => {
                    debug!(error = %e, command = command.name(), "skipping unparseable response");
                    continue;
                }
            };

            match response {
                Response::Tagged {
                    tag: done,
                    status,
                    code,
                    text,
                } if done == tag => {
                    self.absorb_code(code.as_ref());
                    return match status {
                        Status::Ok | Status::PreAuth => {
                            completion.code = code;
                            Ok(completion)
                        }
                        Status::No => Err(Error::No(text)),
                        Status::Bad => Err(Error::Bad(text)),
                        Status::Bye => Err(Error::Bye(text)),
                    };
                }
                Response::Tagged { tag: other, .. } => {
                    warn!(tag = %other, "ignoring completion for unknown tag");
                }
                Response::Untagged(UntaggedResponse::Bye { text, .. })
                    if !matches!(command, Command::Logout) =>
                {
                    return Err(Error::Bye(text));
                }
                Response::Untagged(UntaggedResponse::Capability(caps)) => {
                    self.capabilities = caps;
                }
                Response::Untagged(untagged) => {
                    if let UntaggedResponse::Ok { code, .. } = &untagged {
                        self.absorb_code(code.as_ref());
                    }
                    completion.untagged.push(untagged);
                }
                Response::Continuation { .. } => {
                    return Err(Error::Protocol(format!(
                        "unexpected continuation during {}",
                        command.name()
                    )));
                }
            }
        }
    }

    fn absorb_code(&mut self, code: Option<&ResponseCode>) {
        if let Some(ResponseCode::Capability(caps)) = code {
            self.capabilities.clone_from(caps);
        }
    }

    /// Sends LOGOUT and closes the stream.
    ///
    /// The server's answer is read but not required; a connection that is
    /// already gone is not an error here.
    pub async fn logout(mut self) -> Result<()> {
        if let Err(e) = self.execute(&Command::Logout).await {
            debug!(error = %e, "LOGOUT did not complete cleanly");
        }
        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "shutdown after LOGOUT failed");
        }
        Ok(())
    }
}
