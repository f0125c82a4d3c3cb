use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::dns::ConflictMatcher;
use crate::error::{ChallengeError, ChallengeResult};
use crate::poller::{DEFAULT_LOOKUP_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, PollPolicy};

/// Settings read from the optional JSON config file. Every field
/// has a default, and command-line flags override file values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HookConfig {
    /// Nameserver to poll as `host` or `host:port`. Unset means
    /// the nameservers the provider lists for the zone.
    pub nameserver: Option<String>,
    pub max_attempts: u32,
    pub lookup_timeout_secs: u64,
    pub retry_delay_secs: u64,
    /// Overall deadline, 0 for none.
    pub timeout_secs: u64,
    /// TTL hint handed to the provider. Unset means the
    /// provider's default.
    pub ttl: Option<String>,
    /// Error prefixes treated as a recoverable conflict. Unset
    /// means the provider's own list.
    pub conflict_markers: Option<Vec<String>>,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            nameserver: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lookup_timeout_secs: DEFAULT_LOOKUP_TIMEOUT.as_secs(),
            retry_delay_secs: DEFAULT_RETRY_DELAY.as_secs(),
            timeout_secs: 0,
            ttl: None,
            conflict_markers: None,
        }
    }
}

impl HookConfig {
    pub fn load(path: &Path) -> ChallengeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChallengeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ChallengeResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ChallengeResult<()> {
        if self.max_attempts == 0 {
            return Err(ChallengeError::Config("max_attempts must be at least 1".into()));
        }
        if self.lookup_timeout_secs == 0 {
            return Err(ChallengeError::Config(
                "lookup_timeout_secs must be at least 1".into(),
            ));
        }
        if self
            .nameserver
            .as_deref()
            .is_some_and(|ns| ns.trim().is_empty())
        {
            return Err(ChallengeError::Config("nameserver is empty".into()));
        }
        Ok(())
    }

    #[must_use]
    pub const fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    #[must_use]
    pub const fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.max_attempts,
            lookup_timeout: self.lookup_timeout(),
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    /// `None` when no overall deadline is configured.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }

    #[must_use]
    pub fn conflict_matcher(&self) -> Option<ConflictMatcher> {
        self.conflict_markers
            .as_ref()
            .map(|markers| ConflictMatcher::new(markers.iter().map(String::as_str)))
    }
}
