//! Configuration loaded from `config.toml`.
//!
//! All settings live under a `[github-mail-reader]` section:
//!
//! ```toml
//! [github-mail-reader]
//! server = "imap.example.com"
//! login = "me@example.com"
//! password = "hunter2"
//! folder = "INBOX"
//! gh_token = "ghp_..."
//! ```

use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

/// File read when no other path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Name of the TOML table holding our settings.
pub const CONFIG_SECTION: &str = "github-mail-reader";

/// Default IMAPS port (implicit TLS).
pub const DEFAULT_IMAP_PORT: u16 = 993;

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// What to do with a message whose reference header cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Stop the run with an error.
    #[default]
    Abort,
    /// Log a warning and move on to the next message.
    Skip,
}

/// Runtime configuration, built once in `main` and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    /// IMAP host.
    pub server: String,
    /// IMAP port; the connection is TLS from the first byte.
    pub port: u16,
    pub login: String,
    pub password: SecretString,
    /// Folder to select before searching.
    pub folder: String,
    /// GitHub API token, sent as a bearer token.
    pub gh_token: SecretString,
    /// GitHub API base URL, without a trailing slash.
    pub api_url: String,
    pub malformed_policy: MalformedPolicy,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "github-mail-reader")]
    section: Option<RawConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    server: Option<String>,
    port: Option<u16>,
    login: Option<String>,
    password: Option<String>,
    folder: Option<String>,
    gh_token: Option<String>,
    api_url: Option<String>,
    skip_malformed: bool,
}

impl Config {
    /// Read and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(raw)?;
        let section = file.section.ok_or_else(|| ConfigError::MissingRequired {
            key: format!("[{CONFIG_SECTION}]"),
            hint: "Add the section to config.toml.".into(),
        })?;

        let api_url = section
            .api_url
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "api_url".into(),
                message: format!("{api_url:?} is not an http(s) URL"),
            });
        }

        let port = section.port.unwrap_or(DEFAULT_IMAP_PORT);
        if port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "port".into(),
                message: "port must be non-zero".into(),
            });
        }

        Ok(Self {
            server: required(section.server, "server", "IMAP host name, e.g. imap.gmail.com.")?,
            port,
            login: required(section.login, "login", "IMAP user name.")?,
            password: required(section.password, "password", "IMAP password.")?.into(),
            folder: required(section.folder, "folder", "Mailbox folder to scan, e.g. INBOX.")?,
            gh_token: required(
                section.gh_token,
                "gh_token",
                "GitHub token with read access to the watched repositories.",
            )?
            .into(),
            api_url,
            malformed_policy: if section.skip_malformed {
                MalformedPolicy::Skip
            } else {
                MalformedPolicy::Abort
            },
        })
    }
}

fn required(value: Option<String>, key: &str, hint: &str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingRequired {
            key: key.to_string(),
            hint: hint.to_string(),
        }),
    }
}
