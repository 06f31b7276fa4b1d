//! End-to-end client sessions against a scripted server.
//!
//! The mock stream replays a canned server transcript and records what the
//! client wrote, so a whole session can be checked without a network.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailsort_imap::{Client, Error, Flag, SaslMechanism, StoreAction};
use mailsort_oauth::Token;
use mailsort_oauth::sasl::xoauth2_response;

/// Mock stream that replays server output and captures client input.
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

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let to_read = (data.len() - pos).min(buf.remaining());
        buf.put_slice(&data[pos..pos + to_read]);
        self.responses.set_position((pos + to_read) as u64);

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

fn token() -> Token {
    Token::new("ya29.a0AfB", "Bearer")
}

fn sent_lines(sent: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
    String::from_utf8(sent.lock().unwrap().clone())
        .unwrap()
        .split_terminator("\r\n")
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_gmail_session() {
    let transcript: &[u8] = b"* OK [CAPABILITY IMAP4rev1 UNSELECT IDLE NAMESPACE QUOTA ID XLIST CHILDREN X-GM-EXT-1 XYZZY SASL-IR AUTH=XOAUTH2 AUTH=PLAIN AUTH=PLAIN-CLIENTTOKEN AUTH=OAUTHBEARER] Gimap ready for requests\r\n\
A0001 OK [CAPABILITY IMAP4rev1 UNSELECT IDLE NAMESPACE QUOTA ID XLIST CHILDREN X-GM-EXT-1 UIDPLUS COMPRESS=DEFLATE ENABLE MOVE CONDSTORE ESEARCH UTF8=ACCEPT LIST-EXTENDED LIST-STATUS LITERAL- SPECIAL-USE APPENDLIMIT=35651584] me@gmail.com authenticated (Success)\r\n\
* FLAGS (\\Answered \\Flagged \\Draft \\Deleted \\Seen $NotPhishing $Phishing)\r\n\
* OK [PERMANENTFLAGS (\\Answered \\Flagged \\Draft \\Deleted \\Seen $NotPhishing $Phishing \\*)] Flags permitted.\r\n\
* OK [UIDVALIDITY 1] UIDs valid.\r\n\
* 2 EXISTS\r\n\
* 0 RECENT\r\n\
* OK [UIDNEXT 3] Predicted next UID.\r\n\
* OK [HIGHESTMODSEQ 4242]\r\n\
A0002 OK [READ-WRITE] INBOX selected. (Success)\r\n\
* SEARCH 1 2\r\n\
A0003 OK SEARCH completed (Success)\r\n\
* 1 FETCH (BODY[] {32}\r\nSubject: trip\r\n\r\nflight booked\r\n)\r\n\
A0004 OK Success\r\n\
* 1 FETCH (X-GM-LABELS (travel))\r\n\
A0005 OK Success\r\n\
* BYE LOGOUT Requested\r\n\
A0006 OK 73 good day (Success)\r\n";

    let (stream, sent) = MockStream::new(transcript);

    let client = Client::from_stream(stream).await.unwrap();
    assert!(client.supports_gmail_labels());

    let client = client
        .authenticate(SaslMechanism::XOAuth2, "me@gmail.com", &token())
        .await
        .unwrap();

    let (mut inbox, status) = client.select("INBOX").await.unwrap();
    assert_eq!(status.exists, 2);
    assert!(!status.read_only);
    assert_eq!(inbox.mailbox().as_str(), "INBOX");

    let ids = inbox.search_all().await.unwrap();
    assert_eq!(ids.len(), 2);

    let raw = inbox.fetch_raw(ids[0]).await.unwrap().unwrap();
    assert_eq!(raw, b"Subject: trip\r\n\r\nflight booked\r\n");

    inbox
        .store(ids[0], StoreAction::AddGmailLabels(vec!["travel".into()]))
        .await
        .unwrap();

    inbox.logout().await.unwrap();

    let lines = sent_lines(&sent);
    assert_eq!(
        lines,
        vec![
            format!(
                "A0001 AUTHENTICATE XOAUTH2 {}",
                xoauth2_response("me@gmail.com", "ya29.a0AfB")
            ),
            "A0002 SELECT INBOX".to_string(),
            "A0003 SEARCH ALL".to_string(),
            "A0004 FETCH 1 BODY.PEEK[]".to_string(),
            "A0005 STORE 1 +X-GM-LABELS (travel)".to_string(),
            "A0006 LOGOUT".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_token_never_sent_in_clear() {
    let transcript: &[u8] = b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=XOAUTH2] ready\r\n\
A0001 OK authenticated\r\n";
    let (stream, sent) = MockStream::new(transcript);

    Client::from_stream(stream)
        .await
        .unwrap()
        .authenticate(SaslMechanism::XOAuth2, "me@gmail.com", &token())
        .await
        .unwrap();

    let wire = String::from_utf8(sent.lock().unwrap().clone()).unwrap();
    assert!(!wire.contains("ya29"));
}

#[tokio::test]
async fn test_keyword_session_on_plain_imap_server() {
    let transcript: &[u8] = b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=OAUTHBEARER] Dovecot ready.\r\n\
A0001 OK Logged in\r\n\
* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
* OK [PERMANENTFLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft \\*)] Flags permitted.\r\n\
* 1 EXISTS\r\n\
A0002 OK [READ-WRITE] Select completed.\r\n\
* 1 FETCH (FLAGS (finance))\r\n\
A0003 OK Store completed.\r\n";
    let (stream, sent) = MockStream::new(transcript);

    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .authenticate(SaslMechanism::OAuthBearer, "me@example.org", &token())
        .await
        .unwrap();
    assert!(!client.supports_gmail_labels());

    let (mut inbox, status) = client.select("INBOX").await.unwrap();
    assert!(status.permanent_flags.allows_new_keywords());

    let first = mailsort_imap::SeqNum::new(1).unwrap();
    inbox
        .store(first, StoreAction::AddFlags(vec![Flag::Keyword("finance".into())]))
        .await
        .unwrap();

    assert_eq!(sent_lines(&sent).last().unwrap(), "A0003 STORE 1 +FLAGS (finance)");
}

#[tokio::test]
async fn test_connection_dropped_mid_session() {
    let transcript: &[u8] = b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=XOAUTH2] ready\r\n\
A0001 OK authenticated\r\n\
* 5 EXISTS\r\n";
    let (stream, _sent) = MockStream::new(transcript);

    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .authenticate(SaslMechanism::XOAuth2, "me@gmail.com", &token())
        .await
        .unwrap();

    let err = client.select("INBOX").await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
