use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::config::HookConfig;
use crate::dns::RecordApi;
use crate::error::ChallengeResult;
use crate::lifecycle::{ChallengeLifecycle, ChallengeRequest};
use crate::lookup::{NameserverLookup, TxtLookup};
use crate::replay::ReplayTarget;

/// Certbot manual auth/cleanup hook for DNS-01 challenges.
///
/// Without `--auth-output` the hook creates the challenge record,
/// waits for it to propagate and prints `zoneId,recordFQDN`. With
/// it, the hook deletes the record that line names.
#[derive(Parser, Debug)]
#[command(name = "dns01-hook", version)]
pub struct Cli {
    /// Domain under validation
    #[arg(long, env = "CERTBOT_DOMAIN")]
    pub domain: String,

    /// Challenge token to publish
    #[arg(long, env = "CERTBOT_VALIDATION")]
    pub validation: String,

    /// Output of the earlier create run; selects delete mode
    #[arg(long, env = "CERTBOT_AUTH_OUTPUT")]
    pub auth_output: Option<String>,

    /// JSON config file
    #[arg(short, long, env = "DNS01_HOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Nameserver to poll (host or host:port) instead of the
    /// zone's own nameservers
    #[arg(long)]
    pub nameserver: Option<String>,

    /// TTL hint for the challenge record instead of the provider
    /// default
    #[arg(long)]
    pub ttl: Option<String>,

    /// Overall deadline in seconds, 0 for none
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Propagation lookups before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Per-lookup timeout in seconds
    #[arg(long)]
    pub lookup_timeout: Option<u64>,

    /// Seconds between lookups
    #[arg(long)]
    pub retry_delay: Option<u64>,

    /// Provider error prefix treated as a recoverable conflict
    /// (repeatable)
    #[arg(long = "conflict-marker")]
    pub conflict_markers: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "DNS01_HOOK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// What one invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Create(ChallengeRequest),
    Delete {
        target: ReplayTarget,
        timeout: Option<Duration>,
    },
}

impl Cli {
    /// Config file values with command-line overrides applied.
    pub fn settings(&self) -> ChallengeResult<HookConfig> {
        let mut config = match &self.config {
            Some(path) => HookConfig::load(path)?,
            None => HookConfig::default(),
        };
        if let Some(nameserver) = &self.nameserver {
            config.nameserver = Some(nameserver.clone());
        }
        if let Some(ttl) = &self.ttl {
            config.ttl = Some(ttl.clone());
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(secs) = self.lookup_timeout {
            config.lookup_timeout_secs = secs;
        }
        if let Some(secs) = self.retry_delay {
            config.retry_delay_secs = secs;
        }
        if !self.conflict_markers.is_empty() {
            config.conflict_markers = Some(self.conflict_markers.clone());
        }
        config.validate()?;
        Ok(config)
    }

    /// Delete mode when a non-empty auth output was handed back,
    /// create mode otherwise.
    pub fn mode(&self, config: &HookConfig) -> ChallengeResult<Mode> {
        match self.auth_output.as_deref().map(str::trim) {
            Some(output) if !output.is_empty() => Ok(Mode::Delete {
                target: output.parse()?,
                timeout: config.timeout(),
            }),
            _ => {
                let mut request = ChallengeRequest::new(&self.domain, &self.validation);
                request.timeout = config.timeout();
                Ok(Mode::Create(request))
            }
        }
    }
}

/// Build the TXT lookup for `mode`.
///
/// Only a create with a configured nameserver resolves anything
/// here. Delete never polls, so it gets a lookup that has not
/// picked a nameserver and cannot fail on one.
pub async fn poll_lookup(mode: &Mode, config: &HookConfig) -> ChallengeResult<NameserverLookup> {
    match (mode, config.nameserver.as_deref()) {
        (Mode::Create(_), Some(nameserver)) => {
            NameserverLookup::connect(nameserver, config.lookup_timeout()).await
        }
        _ => Ok(NameserverLookup::follow_zone(config.lookup_timeout())),
    }
}

/// Run one invocation. Returns the replay target to print after a
/// create, `None` after a delete.
pub async fn execute<A: RecordApi, L: TxtLookup>(
    lifecycle: &ChallengeLifecycle<A, L>,
    mode: &Mode,
) -> ChallengeResult<Option<ReplayTarget>> {
    match mode {
        Mode::Create(request) => {
            let outcome = lifecycle.create(request).await?;
            info!(
                record = %outcome.record.record_fqdn,
                attempts = outcome.report.attempts.len(),
                conflict_retried = outcome.conflict_retried,
                "challenge created"
            );
            Ok(Some(outcome.record.replay_target()))
        }
        Mode::Delete { target, timeout } => {
            let deleted = lifecycle.delete(target, *timeout).await?;
            info!(record = %target.record_fqdn, deleted, "challenge deleted");
            Ok(None)
        }
    }
}
