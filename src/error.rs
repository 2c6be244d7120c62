//! Error types for the GitHub mail reader.

use std::path::PathBuf;

/// Top-level error type for a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IMAP error: {0}")]
    Imap(#[from] ImapError),

    #[error("GitHub error: {0}")]
    Github(#[from] GithubError),

    #[error("{0}")]
    MalformedReference(#[from] MalformedReferenceError),

    #[error("Message with UID {uid} has neither a References nor a Message-Id header")]
    MissingReference { uid: u32 },

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// IMAP session errors.
#[derive(Debug, thiserror::Error)]
pub enum ImapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Invalid server name {0:?}")]
    InvalidServerName(String),

    #[error("IMAP connection closed")]
    ConnectionClosed,

    #[error("IMAP server rejected greeting: {0}")]
    Greeting(String),

    #[error("IMAP command {command} failed: {response}")]
    Command { command: String, response: String },

    #[error("Unexpected IMAP response: {0}")]
    Protocol(String),
}

/// GitHub API errors.
#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GitHub returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Response from {url} has no state field")]
    MissingState { url: String },
}

/// A reference header that does not split into owner/repo/kind/number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed reference {reference:?}: expected owner/repo/kind/number, found {components} component(s)")]
pub struct MalformedReferenceError {
    pub reference: String,
    pub components: usize,
}

/// Result type alias for a run.
pub type Result<T> = std::result::Result<T, Error>;
