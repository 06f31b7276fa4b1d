//! [`MessageSource`] over an IMAP connection.

use std::mem;
use std::time::Duration;

use async_trait::async_trait;
use mailsort_imap::{
    Authenticated, Client, Error as ImapError, Flag, ImapStream, SaslMechanism, Selected,
    StoreAction, connect_tls,
};
use mailsort_oauth::Token;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::{MessageSource, SourceError};
use crate::category::Category;
use crate::config::{Config, LabelMode};
use crate::message::MessageId;

/// Where the session is. The IMAP client changes type at each step, so each
/// step is its own variant.
enum State<S> {
    /// Transport is up, greeting not read yet.
    Connected(S),
    Authenticated(Client<S, Authenticated>),
    Selected(Client<S, Selected>),
    Closed,
}

impl<S> State<S> {
    const fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::Authenticated(_) => "authenticated",
            Self::Selected(_) => "selected",
            Self::Closed => "closed",
        }
    }
}

/// IMAP-backed message source.
pub struct ImapSource<S> {
    state: State<S>,
    user: String,
    mechanism: SaslMechanism,
    label_mode: LabelMode,
    io_timeout: Duration,
}

impl<S> std::fmt::Debug for ImapSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapSource")
            .field("state", &self.state.name())
            .field("user", &self.user)
            .field("mechanism", &self.mechanism)
            .field("label_mode", &self.label_mode)
            .finish_non_exhaustive()
    }
}

impl ImapSource<ImapStream> {
    /// Opens the TLS connection described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Connection`] if the server cannot be reached
    /// or the handshake fails.
    pub async fn connect(config: &Config) -> Result<Self, SourceError> {
        let imap = config.imap_config();
        let stream = connect_tls(&imap).await.map_err(SourceError::Connection)?;
        info!(host = %imap.host, port = imap.port, "Connected to mail store");
        Ok(Self::new(stream, config).with_io_timeout(imap.io_timeout))
    }
}

impl<S> ImapSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps an already connected stream. The greeting is read by `open`.
    #[must_use]
    pub fn new(stream: S, config: &Config) -> Self {
        Self {
            state: State::Connected(stream),
            user: config.email.clone(),
            mechanism: config.sasl.into(),
            label_mode: config.label_mode,
            io_timeout: config.imap_config().io_timeout,
        }
    }

    /// Sets the per-response timeout.
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    fn selected(&mut self) -> Result<&mut Client<S, Selected>, SourceError> {
        match &mut self.state {
            State::Selected(client) => Ok(client),
            _ => Err(SourceError::NotReady("no folder selected")),
        }
    }

    fn store_action(&self, label: &Category) -> StoreAction {
        let name = label.as_str().to_string();
        match self.label_mode {
            LabelMode::Gmail => StoreAction::AddGmailLabels(vec![name]),
            LabelMode::Keyword => StoreAction::AddFlags(vec![Flag::Keyword(name)]),
        }
    }
}

fn auth_error(e: ImapError) -> SourceError {
    match e {
        ImapError::Auth(msg) | ImapError::No(msg) | ImapError::Bad(msg) => {
            SourceError::AuthRejected(msg)
        }
        other => SourceError::Connection(other),
    }
}

#[async_trait]
impl<S> MessageSource for ImapSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn open(&mut self, token: &Token) -> Result<(), SourceError> {
        let State::Connected(stream) = mem::replace(&mut self.state, State::Closed) else {
            return Err(SourceError::NotReady("session already opened"));
        };

        let client = Client::from_stream(stream)
            .await
            .map_err(SourceError::Connection)?
            .with_io_timeout(self.io_timeout);

        if self.label_mode == LabelMode::Gmail && !client.supports_gmail_labels() {
            warn!("Server does not advertise X-GM-EXT-1; Gmail labels will likely fail");
        }

        debug!(user = %self.user, mechanism = %self.mechanism, "Authenticating");
        let client = client
            .authenticate(self.mechanism, &self.user, token)
            .await
            .map_err(auth_error)?;
        info!(user = %self.user, "Authenticated");

        self.state = State::Authenticated(client);
        Ok(())
    }

    async fn select_folder(&mut self, name: &str) -> Result<(), SourceError> {
        let client = match mem::replace(&mut self.state, State::Closed) {
            State::Authenticated(client) => client,
            other => {
                let reason = match other {
                    State::Selected(_) => "folder already selected",
                    State::Closed => "session closed",
                    _ => "session not authenticated",
                };
                self.state = other;
                return Err(SourceError::NotReady(reason));
            }
        };

        match client.select(name).await {
            Ok((client, status)) => {
                info!(folder = name, exists = status.exists, "Folder selected");
                self.state = State::Selected(client);
                Ok(())
            }
            Err(e) => Err(SourceError::Folder {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn list_all_ids(&mut self) -> Result<Vec<MessageId>, SourceError> {
        let ids = self
            .selected()?
            .search_all()
            .await
            .map_err(SourceError::Search)?;
        Ok(ids.into_iter().map(MessageId::from).collect())
    }

    async fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>, SourceError> {
        match self.selected()?.fetch_raw(id.into()).await {
            Ok(Some(raw)) => {
                debug!(%id, bytes = raw.len(), "Fetched message");
                Ok(raw)
            }
            Ok(None) => Err(SourceError::Fetch {
                id,
                reason: "no body returned".to_string(),
            }),
            Err(e) => Err(SourceError::Fetch {
                id,
                reason: e.to_string(),
            }),
        }
    }

    async fn apply_label(&mut self, id: MessageId, label: &Category) -> Result<(), SourceError> {
        let action = self.store_action(label);
        self.selected()?
            .store(id.into(), action)
            .await
            .map_err(|e| SourceError::Label {
                id,
                label: label.to_string(),
                reason: e.to_string(),
            })?;
        debug!(%id, %label, "Label applied");
        Ok(())
    }

    async fn close(&mut self) {
        let result = match mem::replace(&mut self.state, State::Closed) {
            State::Authenticated(client) => client.logout().await,
            State::Selected(client) => client.logout().await,
            State::Connected(_) | State::Closed => return,
        };
        match result {
            Ok(()) => debug!("Logged out"),
            Err(e) => warn!(error = %e, "Logout failed"),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::category::CategorySet;
    use std::io::{self, Cursor};
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    struct MockStream {
        responses: Cursor<Vec<u8>>,
        sent: Arc<Mutex<Vec<u8>>>,
    }

    impl MockStream {
        fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            let stream = Self {
                responses: Cursor::new(responses.to_vec()),
                sent: Arc::clone(&sent),
            };
            (stream, sent)
        }
    }

    impl AsyncRead for MockStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let pos = usize::try_from(self.responses.position()).unwrap();
            let data = self.responses.get_ref();
            if pos < data.len() {
                let n = (data.len() - pos).min(buf.remaining());
                buf.put_slice(&data[pos..pos + n]);
                self.responses.set_position((pos + n) as u64);
            }
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.sent.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn sent_lines(sent: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
        String::from_utf8(sent.lock().unwrap().clone())
            .unwrap()
            .split_terminator("\r\n")
            .map(str::to_string)
            .collect()
    }

    fn config(label_mode: LabelMode) -> Config {
        Config {
            email: "me@gmail.com".into(),
            label_mode,
            ..Config::default()
        }
    }

    fn token() -> Token {
        Token::new("ya29.token", "Bearer")
    }

    fn script(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    fn id(n: u32) -> MessageId {
        MessageId::new(n).unwrap()
    }

    const GREETING: &[u8] =
        b"* OK [CAPABILITY IMAP4rev1 SASL-IR X-GM-EXT-1 AUTH=XOAUTH2] Gimap ready\r\n";

    #[tokio::test]
    async fn full_gmail_session() {
        let transcript = script(&[
            GREETING,
            b"A0001 OK authenticated (Success)\r\n",
            b"* 2 EXISTS\r\nA0002 OK [READ-WRITE] INBOX selected.\r\n",
            b"* SEARCH 1 2\r\nA0003 OK SEARCH completed\r\n",
            b"* 2 FETCH (BODY[] {11}\r\nSubject: x\n)\r\nA0004 OK Success\r\n",
            b"* 2 FETCH (X-GM-LABELS (travel))\r\nA0005 OK Success\r\n",
            b"* BYE LOGOUT Requested\r\nA0006 OK bye\r\n",
        ]);
        let (stream, sent) = MockStream::new(&transcript);
        let mut source = ImapSource::new(stream, &config(LabelMode::Gmail));
        let travel = CategorySet::default().get("travel").unwrap().clone();

        source.open(&token()).await.unwrap();
        source.select_folder("INBOX").await.unwrap();
        assert_eq!(source.list_all_ids().await.unwrap(), vec![id(1), id(2)]);
        assert_eq!(source.fetch_raw(id(2)).await.unwrap(), b"Subject: x\n");
        source.apply_label(id(2), &travel).await.unwrap();
        source.close().await;
        source.close().await;

        let lines = sent_lines(&sent);
        assert!(lines[0].starts_with("A0001 AUTHENTICATE XOAUTH2 "));
        assert_eq!(
            &lines[1..],
            &[
                "A0002 SELECT INBOX",
                "A0003 SEARCH ALL",
                "A0004 FETCH 2 BODY.PEEK[]",
                "A0005 STORE 2 +X-GM-LABELS (travel)",
                "A0006 LOGOUT",
            ]
        );
    }

    #[tokio::test]
    async fn keyword_mode_stores_flags() {
        let transcript = script(&[
            b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=XOAUTH2] ready\r\n",
            b"A0001 OK done\r\n",
            b"* 1 EXISTS\r\nA0002 OK [READ-WRITE] done\r\n",
            b"* 1 FETCH (FLAGS (work))\r\nA0003 OK done\r\n",
        ]);
        let (stream, sent) = MockStream::new(&transcript);
        let mut source = ImapSource::new(stream, &config(LabelMode::Keyword));
        let work = CategorySet::default().get("work").unwrap().clone();

        source.open(&token()).await.unwrap();
        source.select_folder("INBOX").await.unwrap();
        source.apply_label(id(1), &work).await.unwrap();

        assert_eq!(sent_lines(&sent).last().unwrap(), "A0003 STORE 1 +FLAGS (work)");
    }

    #[tokio::test]
    async fn rejected_token_is_auth_rejected() {
        let transcript = script(&[
            GREETING,
            b"A0001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n",
        ]);
        let (stream, sent) = MockStream::new(&transcript);
        let mut source = ImapSource::new(stream, &config(LabelMode::Gmail));

        let err = source.open(&token()).await.unwrap_err();
        assert!(matches!(err, SourceError::AuthRejected(_)));

        source.close().await;
        assert!(!sent_lines(&sent).iter().any(|l| l.contains("LOGOUT")));
    }

    #[tokio::test]
    async fn missing_greeting_is_connection_error() {
        let (stream, _sent) = MockStream::new(b"");
        let mut source = ImapSource::new(stream, &config(LabelMode::Gmail));
        assert!(matches!(
            source.open(&token()).await.unwrap_err(),
            SourceError::Connection(_)
        ));
    }

    #[tokio::test]
    async fn unknown_folder_is_folder_error() {
        let transcript = script(&[
            GREETING,
            b"A0001 OK authenticated\r\n",
            b"A0002 NO [NONEXISTENT] Unknown Mailbox: Nope\r\n",
        ]);
        let (stream, _sent) = MockStream::new(&transcript);
        let mut source = ImapSource::new(stream, &config(LabelMode::Gmail));

        source.open(&token()).await.unwrap();
        let err = source.select_folder("Nope").await.unwrap_err();
        assert!(matches!(err, SourceError::Folder { ref name, .. } if name == "Nope"));
    }

    #[tokio::test]
    async fn fetch_without_body_is_fetch_error() {
        let transcript = script(&[
            GREETING,
            b"A0001 OK authenticated\r\n",
            b"A0002 OK [READ-WRITE] selected\r\n",
            b"A0003 OK nothing\r\n",
        ]);
        let (stream, _sent) = MockStream::new(&transcript);
        let mut source = ImapSource::new(stream, &config(LabelMode::Gmail));

        source.open(&token()).await.unwrap();
        source.select_folder("INBOX").await.unwrap();
        let err = source.fetch_raw(id(9)).await.unwrap_err();
        assert!(matches!(err, SourceError::Fetch { id: failed, .. } if failed == id(9)));
    }

    #[tokio::test]
    async fn calls_out_of_order_are_not_ready() {
        let (stream, _sent) = MockStream::new(GREETING);
        let mut source = ImapSource::new(stream, &config(LabelMode::Gmail));

        assert!(matches!(
            source.list_all_ids().await.unwrap_err(),
            SourceError::NotReady(_)
        ));
        assert!(matches!(
            source.select_folder("INBOX").await.unwrap_err(),
            SourceError::NotReady(_)
        ));
    }
}
