//! Inbox processor — the driver loop.
//!
//! Flow per run:
//! 1. Search the folder for unread GitHub notifications
//! 2. Fetch all of their headers in one go
//! 3. For each message: reference → state → mark `\Seen` if closed or merged
//!
//! Messages are handled in search order. A fatal error on one message leaves
//! the earlier ones flagged and the later ones untouched.

use std::io::Write;

use tracing::{debug, info, warn};

use crate::config::MalformedPolicy;
use crate::error::{Error, Result};
use crate::github::{IssueApi, ItemState, StateResolver};
use crate::mailbox::{Flag, HeaderMessage, Mailbox, SearchCriteria};
use crate::pipeline::decision::{seen_notice, should_mark_seen};
use crate::pipeline::reference::{ItemRef, parse_reference};
use crate::progress::Progress;

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The item is closed or merged and the message was flagged `\Seen`.
    Marked { item: ItemRef, state: ItemState },
    /// The item is still open, or its state is unknown.
    Kept {
        item: ItemRef,
        state: Option<ItemState>,
    },
    /// Security advisory; nothing to look up.
    Advisory,
    /// Unusable reference header, skipped per `MalformedPolicy::Skip`.
    Skipped,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Unread notifications found by the search.
    pub found: usize,
    pub marked: usize,
    pub kept: usize,
    pub advisories: usize,
    pub skipped: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Marked { .. } => self.marked += 1,
            Outcome::Kept { .. } => self.kept += 1,
            Outcome::Advisory => self.advisories += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

/// Walks unread GitHub notifications and marks the finished ones as read.
pub struct InboxProcessor<M, A> {
    mailbox: M,
    resolver: StateResolver<A>,
    criteria: SearchCriteria,
    policy: MalformedPolicy,
}

impl<M: Mailbox, A: IssueApi> InboxProcessor<M, A> {
    pub fn new(mailbox: M, resolver: StateResolver<A>, policy: MalformedPolicy) -> Self {
        Self {
            mailbox,
            resolver,
            criteria: SearchCriteria::unread_github_notifications(),
            policy,
        }
    }

    /// Process every matching message.
    ///
    /// Report lines go to `out`; the progress bar is redrawn after each message.
    pub fn run<W: Write, P: Write>(
        &mut self,
        out: &mut W,
        progress: &mut Progress<P>,
    ) -> Result<RunSummary> {
        let uids = self.mailbox.search(&self.criteria)?;
        writeln!(out, "{} unread emails found", uids.len())?;

        let mut summary = RunSummary {
            found: uids.len(),
            ..RunSummary::default()
        };
        if uids.is_empty() {
            return Ok(summary);
        }

        let messages = self.mailbox.fetch_headers(&uids)?;
        progress.start(messages.len());

        for msg in &messages {
            let outcome = self.process(msg)?;
            if let Outcome::Marked { item, state } = &outcome {
                progress.clear();
                writeln!(out, "{}", seen_notice(&msg.subject, item, state))?;
            }
            summary.record(&outcome);
            progress.tick();
        }
        progress.finish();

        info!(
            found = summary.found,
            marked = summary.marked,
            kept = summary.kept,
            advisories = summary.advisories,
            skipped = summary.skipped,
            "Inbox processed"
        );
        Ok(summary)
    }

    /// Resolve one message and flag it if its item is done.
    pub fn process(&mut self, msg: &HeaderMessage) -> Result<Outcome> {
        let Some(reference) = msg.reference_header() else {
            return self.unusable(msg, Error::MissingReference { uid: msg.uid });
        };

        let item = match parse_reference(reference) {
            Ok(Some(item)) => item,
            Ok(None) => {
                debug!(uid = msg.uid, reference, "Security advisory, skipping");
                return Ok(Outcome::Advisory);
            }
            Err(e) => return self.unusable(msg, e.into()),
        };

        let state = self.resolver.resolve(&item)?;
        debug!(uid = msg.uid, %item, state = ?state, "Resolved notification");

        match state {
            Some(state) if should_mark_seen(Some(&state)) => {
                self.mailbox.set_flag(msg.uid, Flag::Seen, true)?;
                Ok(Outcome::Marked { item, state })
            }
            state => Ok(Outcome::Kept { item, state }),
        }
    }

    fn unusable(&self, msg: &HeaderMessage, err: Error) -> Result<Outcome> {
        match self.policy {
            MalformedPolicy::Abort => Err(err),
            MalformedPolicy::Skip => {
                warn!(uid = msg.uid, subject = %msg.subject, "Skipping message: {err}");
                Ok(Outcome::Skipped)
            }
        }
    }
}
