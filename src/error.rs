use std::process::ExitStatus;

pub type ChallengeResult<T> = Result<T, ChallengeError>;

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("no zone found for domain: {domain}")]
    ZoneNotFound { domain: String },

    #[error("no record found to delete: {fqdn}")]
    RecordNotFound { fqdn: String },

    #[error("{0}")]
    Provider(String),

    #[error("TXT record {fqdn} did not propagate after {attempts} attempts")]
    PropagationTimedOut { fqdn: String, attempts: u32 },

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("operation cancelled")]
    Cancelled,

    #[error("malformed auth output, expected 'zoneId,recordFQDN': {0:?}")]
    MalformedReplayInput(String),

    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("environment variable missing: {0}")]
    EnvMissing(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ChallengeError {
    /// True for the two ways the overall deadline can stop an
    /// operation.
    #[must_use]
    pub const fn is_interrupt(&self) -> bool {
        matches!(self, Self::DeadlineExceeded | Self::Cancelled)
    }
}
