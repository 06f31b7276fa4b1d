//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

use super::Client;
use super::states::Selected;
use crate::command::{Command, FetchAttribute, StoreAction};
use crate::parser::{FetchItem, UntaggedResponse};
use crate::types::{Flag, Mailbox, MailboxStatus, SeqNum};
use crate::{Error, Result};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the selected mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        self.state.mailbox()
    }

    /// Returns the status reported when the mailbox was selected.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        self.state.status()
    }

    /// Lists the sequence numbers of every message (`SEARCH ALL`).
    pub async fn search_all(&mut self) -> Result<Vec<SeqNum>> {
        let completion = self.execute(&Command::SearchAll).await?;

        let ids: Vec<SeqNum> = completion
            .untagged
            .into_iter()
            .filter_map(|response| match response {
                UntaggedResponse::Search(ids) => Some(ids),
                _ => None,
            })
            .flatten()
            .collect();

        debug!(count = ids.len(), "search complete");
        Ok(ids)
    }

    /// Fetches the complete raw message without setting `\Seen`.
    ///
    /// Returns `None` if the server answered without body data for `seq`,
    /// which happens when the message was expunged meanwhile.
    pub async fn fetch_raw(&mut self, seq: SeqNum) -> Result<Option<Vec<u8>>> {
        let completion = self
            .execute(&Command::Fetch {
                seq,
                items: vec![FetchAttribute::full_message_peek()],
            })
            .await?;

        let body = completion
            .untagged
            .into_iter()
            .filter_map(|response| match response {
                UntaggedResponse::Fetch { seq: got, items } if got == seq => Some(items),
                _ => None,
            })
            .flatten()
            .find_map(|item| match item {
                FetchItem::Body {
                    section: None,
                    data,
                } => data,
                _ => None,
            });

        trace!(%seq, bytes = body.as_ref().map_or(0, Vec::len), "fetched message");
        Ok(body)
    }

    /// Adds flags or Gmail labels to one message.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if a keyword cannot be sent as a bare atom
    /// or a label list is empty; [`Error::No`] if the server refuses.
    pub async fn store(&mut self, seq: SeqNum, action: StoreAction) -> Result<()> {
        validate_store(&action)?;
        self.execute(&Command::Store { seq, action }).await?;
        Ok(())
    }
}

fn validate_store(action: &StoreAction) -> Result<()> {
    match action {
        StoreAction::AddFlags(flags) => {
            if flags.is_empty() {
                return Err(Error::InvalidArgument("no flags to store".into()));
            }
            for flag in flags {
                if let Flag::Keyword(keyword) = flag
                    && !Flag::is_valid_keyword(keyword)
                {
                    return Err(Error::InvalidArgument(format!(
                        "{keyword:?} is not a valid keyword"
                    )));
                }
            }
        }
        StoreAction::AddGmailLabels(labels) => {
            if labels.is_empty() || labels.iter().any(String::is_empty) {
                return Err(Error::InvalidArgument("empty label".into()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::command::TagGenerator;
    use crate::connection::framed::FramedStream;
    use tokio_test::io::Builder;

    fn selected<S>(stream: S) -> Client<S, Selected>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Client {
            stream: FramedStream::new(stream),
            tag_gen: TagGenerator::default(),
            capabilities: Vec::new(),
            io_timeout: None,
            state: Selected::new(Mailbox::inbox(), MailboxStatus::default()),
        }
    }

    fn seq(n: u32) -> SeqNum {
        SeqNum::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_search_all() {
        let mock = Builder::new()
            .write(b"A0001 SEARCH ALL\r\n")
            .read(b"* SEARCH 1 2 4\r\n")
            .read(b"A0001 OK SEARCH completed (Success)\r\n")
            .build();

        let ids = selected(mock).search_all().await.unwrap();
        assert_eq!(ids, vec![seq(1), seq(2), seq(4)]);
    }

    #[tokio::test]
    async fn test_search_empty_mailbox() {
        let mock = Builder::new()
            .write(b"A0001 SEARCH ALL\r\n")
            .read(b"* SEARCH\r\n")
            .read(b"A0001 OK done\r\n")
            .build();

        assert!(selected(mock).search_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_raw() {
        let mock = Builder::new()
            .write(b"A0001 FETCH 2 BODY.PEEK[]\r\n")
            .read(b"* 1 FETCH (FLAGS (\\Seen))\r\n")
            .read(b"* 2 FETCH (BODY[] {19}\r\n")
            .read(b"Subject: hi\r\n\r\nyo\r\n")
            .read(b")\r\n")
            .read(b"A0001 OK Success\r\n")
            .build();

        let raw = selected(mock).fetch_raw(seq(2)).await.unwrap();
        assert_eq!(raw.as_deref(), Some(&b"Subject: hi\r\n\r\nyo\r\n"[..]));
    }

    #[tokio::test]
    async fn test_fetch_expunged_message() {
        let mock = Builder::new()
            .write(b"A0001 FETCH 9 BODY.PEEK[]\r\n")
            .read(b"A0001 OK Success\r\n")
            .build();

        assert!(selected(mock).fetch_raw(seq(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_gmail_labels() {
        let mock = Builder::new()
            .write(b"A0001 STORE 3 +X-GM-LABELS (travel \"work trip\")\r\n")
            .read(b"* 3 FETCH (X-GM-LABELS (travel \"work trip\"))\r\n")
            .read(b"A0001 OK Success\r\n")
            .build();

        selected(mock)
            .store(
                seq(3),
                StoreAction::AddGmailLabels(vec!["travel".into(), "work trip".into()]),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_store_keyword() {
        let mock = Builder::new()
            .write(b"A0001 STORE 1 +FLAGS (finance)\r\n")
            .read(b"* 1 FETCH (FLAGS (\\Seen finance))\r\n")
            .read(b"A0001 OK STORE completed\r\n")
            .build();

        selected(mock)
            .store(seq(1), StoreAction::AddFlags(vec![Flag::Keyword("finance".into())]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_store_rejects_bad_keyword_locally() {
        let mock = Builder::new().build();

        let err = selected(mock)
            .store(seq(1), StoreAction::AddFlags(vec![Flag::Keyword("two words".into())]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_store_refused() {
        let mock = Builder::new()
            .write(b"A0001 STORE 1 +FLAGS (finance)\r\n")
            .read(b"A0001 NO [CANNOT] keywords not allowed\r\n")
            .build();

        let err = selected(mock)
            .store(seq(1), StoreAction::AddFlags(vec![Flag::Keyword("finance".into())]))
            .await
            .unwrap_err();
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_bye_mid_command() {
        let mock = Builder::new()
            .write(b"A0001 SEARCH ALL\r\n")
            .read(b"* BYE session expired\r\n")
            .build();

        let err = selected(mock).search_all().await.unwrap_err();
        assert!(matches!(err, Error::Bye(_)));
    }

    #[tokio::test]
    async fn test_logout() {
        let mock = Builder::new()
            .write(b"A0001 LOGOUT\r\n")
            .read(b"* BYE LOGOUT Requested\r\n")
            .read(b"A0001 OK 73 good day (Success)\r\n")
            .build();

        selected(mock).logout().await.unwrap();
    }
}
