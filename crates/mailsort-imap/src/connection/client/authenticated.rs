//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::states::{Authenticated, Selected};
use super::{Client, Completion};
use crate::command::Command;
use crate::parser::UntaggedResponse;
use crate::types::{Mailbox, MailboxStatus, ResponseCode};
use crate::Result;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox for read-write access.
    ///
    /// # Errors
    ///
    /// [`crate::Error::No`] if the mailbox does not exist or cannot be opened.
    pub async fn select(mut self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let mailbox = Mailbox::new(mailbox);
        let completion = self
            .execute(&Command::Select {
                mailbox: mailbox.clone(),
            })
            .await?;

        let status = mailbox_status(completion);
        debug!(
            %mailbox,
            exists = status.exists,
            read_only = status.read_only,
            "mailbox selected"
        );

        let selected = Selected::new(mailbox, status.clone());
        Ok((self.transition(selected), status))
    }
}

/// Builds the mailbox snapshot from SELECT responses.
fn mailbox_status(completion: Completion) -> MailboxStatus {
    let mut status = MailboxStatus::default();

    let codes = completion
        .untagged
        .into_iter()
        .filter_map(|response| match response {
            UntaggedResponse::Exists(n) => {
                status.exists = n;
                None
            }
            UntaggedResponse::Recent(n) => {
                status.recent = n;
                None
            }
            UntaggedResponse::Flags(flags) => {
                status.flags = flags;
                None
            }
            UntaggedResponse::Ok { code, .. } => code,
            _ => None,
        })
        .collect::<Vec<_>>();

    for code in codes.into_iter().chain(completion.code) {
        match code {
            ResponseCode::UidValidity(v) => status.uid_validity = Some(v),
            ResponseCode::UidNext(n) => status.uid_next = Some(n),
            ResponseCode::Unseen(seq) => status.unseen = Some(seq),
            ResponseCode::PermanentFlags(flags) => {
                status.permanent_flags = flags.into_iter().collect();
            }
            ResponseCode::ReadOnly => status.read_only = true,
            ResponseCode::ReadWrite => status.read_only = false,
            _ => {}
        }
    }

    status
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::command::TagGenerator;
    use crate::connection::framed::FramedStream;
    use crate::types::Flag;
    use tokio_test::io::Builder;

    fn authenticated<S>(stream: S) -> Client<S, Authenticated>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Client {
            stream: FramedStream::new(stream),
            tag_gen: TagGenerator::default(),
            capabilities: Vec::new(),
            io_timeout: None,
            state: Authenticated,
        }
    }

    #[tokio::test]
    async fn test_select_reports_status() {
        let mock = Builder::new()
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* FLAGS (\\Answered \\Flagged \\Draft \\Deleted \\Seen)\r\n")
            .read(b"* OK [PERMANENTFLAGS (\\Answered \\Flagged \\Draft \\Deleted \\Seen \\*)] Flags permitted.\r\n")
            .read(b"* OK [UIDVALIDITY 3] UIDs valid.\r\n")
            .read(b"* 42 EXISTS\r\n")
            .read(b"* 0 RECENT\r\n")
            .read(b"* OK [UIDNEXT 1200] Predicted next UID.\r\n")
            .read(b"A0001 OK [READ-WRITE] INBOX selected. (Success)\r\n")
            .build();

        let (client, status) = authenticated(mock).select("INBOX").await.unwrap();

        assert_eq!(status.exists, 42);
        assert_eq!(status.uid_validity, Some(3));
        assert_eq!(status.uid_next, Some(1200));
        assert!(!status.read_only);
        assert!(status.permanent_flags.allows_new_keywords());
        assert!(status.flags.contains(&Flag::Seen));
        assert_eq!(client.state.mailbox().as_str(), "INBOX");
    }

    #[tokio::test]
    async fn test_select_quotes_mailbox() {
        let mock = Builder::new()
            .write(b"A0001 SELECT \"[Gmail]/All Mail\"\r\n")
            .read(b"* 7 EXISTS\r\n")
            .read(b"A0001 OK [READ-ONLY] selected\r\n")
            .build();

        let (_, status) = authenticated(mock)
            .select("[Gmail]/All Mail")
            .await
            .unwrap();
        assert_eq!(status.exists, 7);
        assert!(status.read_only);
    }

    #[tokio::test]
    async fn test_select_missing_folder() {
        let mock = Builder::new()
            .write(b"A0001 SELECT Receipts\r\n")
            .read(b"A0001 NO [NONEXISTENT] Unknown Mailbox: Receipts (Failure)\r\n")
            .build();

        let err = authenticated(mock).select("Receipts").await.unwrap_err();
        assert!(matches!(err, Error::No(_)));
    }
}
