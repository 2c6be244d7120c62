//! GitHub lookups: the REST client and the caching state resolver on top of it.

pub mod client;
pub mod resolver;

use std::fmt;

use crate::error::GithubError;

pub use client::GithubClient;
pub use resolver::{CACHE_CAPACITY, StateResolver};

/// Lifecycle state reported by GitHub for an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemState {
    Open,
    Closed,
    Merged,
    /// Any state string we do not act on.
    Other(String),
}

impl ItemState {
    pub fn from_api(raw: &str) -> Self {
        match raw {
            "open" => Self::Open,
            "closed" => Self::Closed,
            "merged" => Self::Merged,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
            Self::Other(state) => state,
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of issue and pull request states.
///
/// `segment` is the REST path segment (`issues` or `pulls`).
pub trait IssueApi {
    fn fetch_state(
        &self,
        owner: &str,
        repo: &str,
        segment: &str,
        number: &str,
    ) -> Result<String, GithubError>;
}

impl<A: IssueApi + ?Sized> IssueApi for &A {
    fn fetch_state(
        &self,
        owner: &str,
        repo: &str,
        segment: &str,
        number: &str,
    ) -> Result<String, GithubError> {
        (**self).fetch_state(owner, repo, segment, number)
    }
}
