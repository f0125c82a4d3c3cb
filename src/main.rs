use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use dns01_hook::cli::{self, Cli};
use dns01_hook::{ChallengeLifecycle, Cloudflare};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the replay line, logs go to stderr
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = cli.settings().context("failed to load configuration")?;
    let mode = cli.mode(&config)?;

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            interrupt.cancel();
        }
    });

    let api = Cloudflare::from_env().await?;
    let lookup = cli::poll_lookup(&mode, &config)
        .await
        .context("failed to set up the nameserver lookup")?;

    let mut lifecycle = ChallengeLifecycle::new(api, lookup)
        .poll_policy(config.poll_policy())
        .with_cancellation(token);
    if let Some(ttl) = &config.ttl {
        lifecycle = lifecycle.ttl(ttl);
    }
    if let Some(matcher) = config.conflict_matcher() {
        lifecycle = lifecycle.conflict_matcher(matcher);
    }

    if let Some(target) = cli::execute(&lifecycle, &mode).await? {
        let mut stdout = std::io::stdout();
        write!(stdout, "{target}")?;
        stdout.flush()?;
    }
    Ok(())
}
