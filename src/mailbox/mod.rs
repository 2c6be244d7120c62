//! Mailbox access — the IMAP session and the header records it yields.

pub mod imap;
pub mod message;

pub use imap::ImapSession;
pub use message::HeaderMessage;

use crate::error::ImapError;

/// Sender of GitHub notification mail.
pub const GITHUB_NOTIFICATION_SENDER: &str = "notifications@github.com";

/// IMAP system flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Seen,
    Flagged,
}

impl Flag {
    pub fn as_imap(self) -> &'static str {
        match self {
            Self::Seen => "\\Seen",
            Self::Flagged => "\\Flagged",
        }
    }
}

/// Search criteria for `UID SEARCH`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub unseen: bool,
    pub from: Option<String>,
}

impl SearchCriteria {
    /// Unread mail from GitHub's notification address.
    pub fn unread_github_notifications() -> Self {
        Self {
            unseen: true,
            from: Some(GITHUB_NOTIFICATION_SENDER.to_string()),
        }
    }

    /// Render as IMAP search keys. No criteria means `ALL`.
    pub fn to_imap(&self) -> String {
        let mut keys = Vec::new();
        if self.unseen {
            keys.push("UNSEEN".to_string());
        }
        if let Some(from) = &self.from {
            keys.push(format!("FROM {}", imap::quote(from)));
        }
        if keys.is_empty() {
            return "ALL".to_string();
        }
        keys.join(" ")
    }
}

/// Operations the inbox processor needs from a mail store.
pub trait Mailbox {
    /// UIDs of messages matching `criteria`, in server order.
    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>, ImapError>;

    /// Headers of the given messages. Must not set `\Seen`.
    fn fetch_headers(&mut self, uids: &[u32]) -> Result<Vec<HeaderMessage>, ImapError>;

    /// Add (`value = true`) or remove a flag on one message.
    fn set_flag(&mut self, uid: u32, flag: Flag, value: bool) -> Result<(), ImapError>;
}

impl<M: Mailbox + ?Sized> Mailbox for &mut M {
    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>, ImapError> {
        (**self).search(criteria)
    }

    fn fetch_headers(&mut self, uids: &[u32]) -> Result<Vec<HeaderMessage>, ImapError> {
        (**self).fetch_headers(uids)
    }

    fn set_flag(&mut self, uid: u32, flag: Flag, value: bool) -> Result<(), ImapError> {
        (**self).set_flag(uid, flag, value)
    }
}
