//! Parsing GitHub object references out of notification headers.
//!
//! GitHub threads its notification mail with message ids of the form
//! `<owner/repo/kind/number@github.com>`, e.g.
//! `<rust-lang/rust/pull/12345@github.com>`. The same id shows up as the
//! first `References` entry on follow-up mail and as the `Message-Id` of the
//! opening notification.

use std::fmt;

use crate::error::MalformedReferenceError;

/// Marker that identifies security advisory notifications, which have no
/// issue or pull request behind them.
pub const SECURITY_ADVISORY_MARKER: &str = "/security-advisories@";

/// The GitHub object category embedded in a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Issues,
    Pull,
    /// Anything else, e.g. `check-suites` or `discussions`.
    Other(String),
}

impl ItemKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "issues" => Self::Issues,
            "pull" => Self::Pull,
            other => Self::Other(other.to_string()),
        }
    }

    /// Path segment in the REST API, or `None` if the kind has no state to look up.
    pub fn api_segment(&self) -> Option<&'static str> {
        match self {
            Self::Issues => Some("issues"),
            Self::Pull => Some("pulls"),
            Self::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Issues => "issues",
            Self::Pull => "pull",
            Self::Other(kind) => kind,
        }
    }
}

/// A parsed reference: `(owner, repo, kind, number)`.
///
/// Also the cache key for state lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemRef {
    pub owner: String,
    pub repo: String,
    pub kind: ItemKind,
    pub number: String,
}

impl ItemRef {
    pub fn new(owner: &str, repo: &str, kind: ItemKind, number: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            kind,
            number: number.to_string(),
        }
    }
}

/// Formats as `owner/repo#number`.
impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Parse a reference header value.
///
/// Returns `Ok(None)` for security advisories. Surrounding angle brackets and
/// whitespace are ignored, as is everything from the first `@` on.
pub fn parse_reference(reference: &str) -> Result<Option<ItemRef>, MalformedReferenceError> {
    if reference.contains(SECURITY_ADVISORY_MARKER) {
        return Ok(None);
    }

    let trimmed = reference
        .trim_start_matches(['<', ' '])
        .trim_end_matches([' ', '>']);
    let path = trimmed.split_once('@').map_or(trimmed, |(path, _)| path);

    let parts: Vec<&str> = path.splitn(4, '/').collect();
    let [owner, repo, kind, number] = parts.as_slice() else {
        return Err(MalformedReferenceError {
            reference: reference.to_string(),
            components: parts.len(),
        });
    };

    Ok(Some(ItemRef::new(owner, repo, ItemKind::parse(kind), number)))
}
