//! GitHub mail reader — marks notification mail for closed issues and merged
//! pull requests as read.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod mailbox;
pub mod pipeline;
pub mod progress;
