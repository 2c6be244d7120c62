//! Blocking GitHub REST client.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::GithubError;
use crate::github::IssueApi;

/// Media type for the v3 REST API.
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

const USER_AGENT: &str = concat!("github-mail-reader/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ItemResponse {
    state: Option<String>,
}

/// Fetches issue and pull request states from the GitHub REST API.
pub struct GithubClient {
    http: Client,
    api_url: String,
    token: SecretString,
}

impl GithubClient {
    pub fn new(config: &Config) -> Result<Self, GithubError> {
        Self::with_base_url(&config.api_url, config.gh_token.clone())
    }

    /// Build a client against an arbitrary API base URL.
    pub fn with_base_url(api_url: &str, token: SecretString) -> Result<Self, GithubError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn item_url(&self, owner: &str, repo: &str, segment: &str, number: &str) -> String {
        format!("{}/repos/{owner}/{repo}/{segment}/{number}", self.api_url)
    }
}

impl IssueApi for GithubClient {
    fn fetch_state(
        &self,
        owner: &str,
        repo: &str,
        segment: &str,
        number: &str,
    ) -> Result<String, GithubError> {
        let url = self.item_url(owner, repo, segment, number);
        debug!(%url, "Fetching item state");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GithubError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body: ItemResponse = resp.json()?;
        body.state.ok_or(GithubError::MissingState { url })
    }
}
