//! Greeting and authentication.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, SaslMechanism, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};
use mailsort_oauth::Token;
use mailsort_oauth::sasl::{oauthbearer_response, parse_oauth_error, xoauth2_response};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a connected stream.
    ///
    /// Reads the server greeting. If it did not advertise capabilities,
    /// asks for them.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        let capabilities = match ResponseParser::parse(&greeting)? {
            Response::Untagged(
                UntaggedResponse::Ok { code, .. } | UntaggedResponse::PreAuth { code, .. },
            ) => match code {
                Some(ResponseCode::Capability(caps)) => caps,
                _ => Vec::new(),
            },
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                return Err(Error::Bye(text));
            }
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        };

        let mut client = Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            io_timeout: None,
            state: NotAuthenticated,
        };

        if client.capabilities.is_empty() {
            client.capability().await?;
        }

        Ok(client)
    }

    /// Authenticates with a bearer token.
    ///
    /// The SASL initial response goes with the command when the server
    /// advertises SASL-IR, otherwise after the first continuation. A later
    /// continuation carries the server's error details; it is answered with
    /// an empty line so the server finishes with a tagged NO.
    ///
    /// # Errors
    ///
    /// [`Error::Auth`] if the server rejects the token.
    pub async fn authenticate(
        mut self,
        mechanism: SaslMechanism,
        user: &str,
        token: &Token,
    ) -> Result<Client<S, Authenticated>> {
        let initial = match mechanism {
            SaslMechanism::XOAuth2 => xoauth2_response(user, &token.access_token),
            SaslMechanism::OAuthBearer => oauthbearer_response(user, &token.access_token),
        };

        let sasl_ir = self.has_capability(&Capability::SaslIr);
        let mut pending = if sasl_ir { None } else { Some(initial.clone()) };

        let tag = self.tag_gen.next_tag();
        let command = Command::Authenticate {
            mechanism,
            initial_response: sasl_ir.then_some(initial),
        };
        debug!(%tag, %mechanism, sasl_ir, "authenticating");
        self.stream
            .write_command(&command.serialize(tag.as_str()))
            .await?;

        let mut rejection = None;

        loop {
            let raw = self.read_response().await?;
            match ResponseParser::parse(&raw)? {
                Response::Continuation { text } => {
                    let reply = if let Some(initial) = pending.take() {
                        format!("{initial}\r\n")
                    } else {
                        rejection = text.as_deref().and_then(parse_oauth_error);
                        if let Some(details) = &rejection {
                            debug!(
                                status = %details.status,
                                scope = details.scope.as_deref().unwrap_or(""),
                                "server rejected bearer token"
                            );
                        }
                        "\r\n".to_string()
                    };
                    self.stream.write_command(reply.as_bytes()).await?;
                }
                Response::Tagged {
                    tag: done,
                    status,
                    code,
                    text,
                } if done == tag => {
                    if status == Status::Ok {
                        self.absorb_code(code.as_ref());
                        break;
                    }
                    let message = match rejection {
                        Some(details) => format!("{text} (status {})", details.status),
                        None => text,
                    };
                    return Err(Error::Auth(message));
                }
                Response::Untagged(UntaggedResponse::Capability(caps)) => {
                    self.capabilities = caps;
                }
                Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                    return Err(Error::Bye(text));
                }
                _ => {}
            }
        }

        info!(user, "authenticated");
        Ok(self.transition(Authenticated))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const GREETING: &[u8] = b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=XOAUTH2 X-GM-EXT-1] Gimap ready\r\n";

    fn token() -> Token {
        Token::new("ya29.token", "Bearer")
    }

    #[tokio::test]
    async fn test_greeting_capabilities() {
        let mock = Builder::new().read(GREETING).build();
        let client = Client::from_stream(mock).await.unwrap();

        assert!(client.has_capability(&Capability::SaslIr));
        assert!(client.supports_gmail_labels());
    }

    #[tokio::test]
    async fn test_greeting_without_capabilities_asks() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 CAPABILITY\r\n")
            .read(b"* CAPABILITY IMAP4rev1 AUTH=XOAUTH2\r\n")
            .read(b"A0001 OK done\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();

        assert!(client.has_capability(&Capability::Auth("XOAUTH2".into())));
    }

    #[tokio::test]
    async fn test_bye_greeting() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Bye(text) if text == "too many connections"));
    }

    #[tokio::test]
    async fn test_authenticate_with_initial_response() {
        let command = format!(
            "A0001 AUTHENTICATE XOAUTH2 {}\r\n",
            xoauth2_response("me@gmail.com", "ya29.token")
        );
        let mock = Builder::new()
            .read(GREETING)
            .write(command.as_bytes())
            .read(b"A0001 OK [CAPABILITY IMAP4rev1 X-GM-EXT-1 UIDPLUS] me@gmail.com authenticated (Success)\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client
            .authenticate(SaslMechanism::XOAuth2, "me@gmail.com", &token())
            .await
            .unwrap();
        assert!(client.has_capability(&Capability::Unknown("UIDPLUS".into())));
    }

    #[tokio::test]
    async fn test_authenticate_rejected_with_challenge() {
        let command = format!(
            "A0001 AUTHENTICATE XOAUTH2 {}\r\n",
            xoauth2_response("me@gmail.com", "ya29.token")
        );
        // {"status":"400","schemes":"Bearer","scope":"https://mail.google.com/"}
        let challenge = b"+ eyJzdGF0dXMiOiI0MDAiLCJzY2hlbWVzIjoiQmVhcmVyIiwic2NvcGUiOiJodHRwczovL21haWwuZ29vZ2xlLmNvbS8ifQ==\r\n";
        let mock = Builder::new()
            .read(GREETING)
            .write(command.as_bytes())
            .read(challenge)
            .write(b"\r\n")
            .read(b"A0001 NO [AUTHENTICATIONFAILED] Invalid credentials (Failure)\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let err = client
            .authenticate(SaslMechanism::XOAuth2, "me@gmail.com", &token())
            .await
            .unwrap_err();

        match err {
            Error::Auth(message) => {
                assert_eq!(message, "Invalid credentials (Failure) (status 400)");
            }
            other => panic!("expected Auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_without_sasl_ir() {
        let initial = oauthbearer_response("me@example.org", "ya29.token");
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 AUTH=OAUTHBEARER] ready\r\n")
            .write(b"A0001 AUTHENTICATE OAUTHBEARER\r\n")
            .read(b"+ \r\n")
            .write(format!("{initial}\r\n").as_bytes())
            .read(b"A0001 OK authenticated\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        client
            .authenticate(SaslMechanism::OAuthBearer, "me@example.org", &token())
            .await
            .unwrap();
    }
}
