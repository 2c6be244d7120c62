//! Notification processing pipeline.
//!
//! Each unread notification flows through:
//! 1. `reference::parse_reference()` — header → `(owner, repo, kind, number)`
//! 2. `StateResolver::resolve()` — cached GitHub lookup
//! 3. `decision::should_mark_seen()` — closed or merged?
//! 4. `Mailbox::set_flag()` — write `\Seen` back
//!
//! `processor::InboxProcessor` drives the loop.

pub mod decision;
pub mod processor;
pub mod reference;

pub use processor::{InboxProcessor, Outcome, RunSummary};
pub use reference::{ItemKind, ItemRef, parse_reference};
