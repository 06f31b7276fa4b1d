//! Type-state markers for the client.

use crate::types::{Mailbox, MailboxStatus};

/// Before authentication: only AUTHENTICATE and LOGOUT make sense.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Authenticated: a mailbox can be selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// A mailbox is selected; carries what SELECT reported about it.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: Mailbox,
    pub(crate) status: MailboxStatus,
}

impl Selected {
    /// Creates a selected state.
    #[must_use]
    pub const fn new(mailbox: Mailbox, status: MailboxStatus) -> Self {
        Self { mailbox, status }
    }

    /// Returns the selected mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Returns the status snapshot from SELECT.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    fn _assert_send<T: Send>() {}
    fn _assert_sync<T: Sync>() {}

    #[test]
    fn test_states_are_send_sync() {
        _assert_send::<NotAuthenticated>();
        _assert_sync::<NotAuthenticated>();
        _assert_send::<Authenticated>();
        _assert_sync::<Authenticated>();
        _assert_send::<Selected>();
        _assert_sync::<Selected>();
    }

    #[test]
    fn test_selected_accessors() {
        let status = MailboxStatus {
            exists: 12,
            read_only: true,
            ..Default::default()
        };
        let selected = Selected::new(Mailbox::inbox(), status);

        assert!(selected.mailbox().is_inbox());
        assert_eq!(selected.status().exists, 12);
        assert!(selected.status().read_only);
    }
}
