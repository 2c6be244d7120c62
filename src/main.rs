use std::path::Path;

use anyhow::Context;

use github_mail_reader::config::{Config, DEFAULT_CONFIG_PATH};
use github_mail_reader::github::{GithubClient, StateResolver};
use github_mail_reader::mailbox::ImapSession;
use github_mail_reader::pipeline::InboxProcessor;
use github_mail_reader::progress::Progress;

fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // ── Config ──────────────────────────────────────────────────────────
    let config = Config::load(Path::new(DEFAULT_CONFIG_PATH))
        .with_context(|| format!("loading {DEFAULT_CONFIG_PATH}"))?;

    // ── GitHub ──────────────────────────────────────────────────────────
    let github = GithubClient::new(&config).context("building GitHub client")?;
    let resolver = StateResolver::new(github);

    // ── Mailbox ─────────────────────────────────────────────────────────
    let mut session = ImapSession::connect(&config)
        .with_context(|| format!("connecting to {}:{}", config.server, config.port))?;

    {
        let mut processor = InboxProcessor::new(&mut session, resolver, config.malformed_policy);
        let mut stdout = std::io::stdout().lock();
        processor
            .run(&mut stdout, &mut Progress::stderr())
            .context("processing notifications")?;
    }

    session.logout().context("logging out")?;
    Ok(())
}
