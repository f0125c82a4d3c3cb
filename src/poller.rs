//! Bounded wait for a TXT record to become visible.
//!
//! The delay between attempts is constant: provider propagation
//! usually settles within about fifty seconds.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::deadline::Deadline;
use crate::error::ChallengeError;
use crate::lookup::{LookupError, TxtLookup};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Attempt budget and timings of one propagation wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    /// Bound on a single lookup, independent of the overall
    /// deadline.
    pub lookup_timeout: Duration,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// What one lookup saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The name does not resolve yet.
    Absent,
    /// The lookup failed for another reason.
    TransientError(String),
    /// The name resolves but not to exactly the expected value.
    WrongValue(Vec<String>),
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollAttempt {
    /// Zero-based attempt index.
    pub attempt: u32,
    pub observation: Observation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed,
    /// Every attempt ran without seeing the expected value.
    TimedOut,
    Cancelled,
    DeadlineExceeded,
}

/// Outcome of a wait together with every attempt it made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    pub attempts: Vec<PollAttempt>,
}

impl PollReport {
    fn interrupted(err: &ChallengeError, attempts: Vec<PollAttempt>) -> Self {
        let outcome = match err {
            ChallengeError::DeadlineExceeded => PollOutcome::DeadlineExceeded,
            _ => PollOutcome::Cancelled,
        };
        Self { outcome, attempts }
    }

    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.outcome == PollOutcome::Confirmed
    }

    /// The error a failed wait maps to, `None` when confirmed.
    #[must_use]
    pub fn error(&self, fqdn: &str) -> Option<ChallengeError> {
        match self.outcome {
            PollOutcome::Confirmed => None,
            PollOutcome::TimedOut => Some(ChallengeError::PropagationTimedOut {
                fqdn: fqdn.to_string(),
                attempts: u32::try_from(self.attempts.len()).unwrap_or(u32::MAX),
            }),
            PollOutcome::Cancelled => Some(ChallengeError::Cancelled),
            PollOutcome::DeadlineExceeded => Some(ChallengeError::DeadlineExceeded),
        }
    }
}

/// Repeats TXT lookups until the expected value shows up, the
/// attempt budget runs out, or the deadline fires.
pub struct PropagationPoller<L> {
    lookup: L,
    policy: PollPolicy,
}

impl<L: TxtLookup> PropagationPoller<L> {
    #[must_use]
    pub fn new(lookup: L, policy: PollPolicy) -> Self {
        Self { lookup, policy }
    }

    #[must_use]
    pub const fn lookup(&self) -> &L {
        &self.lookup
    }

    #[must_use]
    pub const fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: PollPolicy) {
        self.policy = policy;
    }

    pub async fn await_value(&self, fqdn: &str, expected: &str, deadline: &Deadline) -> PollReport {
        let mut attempts = Vec::new();

        for attempt in 0..self.policy.max_attempts {
            let observation = match self.observe(fqdn, expected, deadline).await {
                Ok(observation) => observation,
                Err(e) => return PollReport::interrupted(&e, attempts),
            };

            match &observation {
                Observation::Absent => {
                    warn!(record = %fqdn, attempt, "dns record not found");
                }
                Observation::TransientError(error) => {
                    warn!(record = %fqdn, attempt, %error, "dns lookup failed");
                }
                Observation::WrongValue(values) => {
                    info!(record = %fqdn, attempt, ?values, "found txt value");
                }
                Observation::Confirmed => {
                    info!(record = %fqdn, attempt, "txt value confirmed");
                }
            }

            let confirmed = observation == Observation::Confirmed;
            attempts.push(PollAttempt {
                attempt,
                observation,
            });
            if confirmed {
                return PollReport {
                    outcome: PollOutcome::Confirmed,
                    attempts,
                };
            }

            if attempt + 1 < self.policy.max_attempts {
                if let Err(e) = deadline.sleep(self.policy.retry_delay).await {
                    return PollReport::interrupted(&e, attempts);
                }
            }
        }

        debug!(record = %fqdn, attempts = attempts.len(), "propagation attempts exhausted");
        PollReport {
            outcome: PollOutcome::TimedOut,
            attempts,
        }
    }

    async fn observe(
        &self,
        fqdn: &str,
        expected: &str,
        deadline: &Deadline,
    ) -> Result<Observation, ChallengeError> {
        let lookup = tokio::time::timeout(self.policy.lookup_timeout, self.lookup.lookup_txt(fqdn));
        let observation = match deadline.run(lookup).await? {
            Err(_) => Observation::TransientError(format!(
                "lookup timed out after {:?}",
                self.policy.lookup_timeout
            )),
            Ok(Err(LookupError::NotFound(_))) => Observation::Absent,
            Ok(Err(LookupError::Other(message))) => Observation::TransientError(message),
            Ok(Ok(values)) if values.len() == 1 && values[0] == expected => Observation::Confirmed,
            Ok(Ok(values)) => Observation::WrongValue(values),
        };
        Ok(observation)
    }
}
