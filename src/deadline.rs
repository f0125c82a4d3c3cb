use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ChallengeError, ChallengeResult};

/// Overall bound on one invocation: an optional expiry plus a
/// cancellation token. Every network call is raced against it.
#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Option<Instant>,
    token: CancellationToken,
}

impl Deadline {
    /// A zero or absent `timeout` means no expiry; the token can
    /// still cancel.
    #[must_use]
    pub fn new(timeout: Option<Duration>, token: CancellationToken) -> Self {
        let expires_at = timeout
            .filter(|t| !t.is_zero())
            .map(|t| Instant::now() + t);
        Self { expires_at, token }
    }

    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(None, CancellationToken::new())
    }

    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fail fast if the deadline has already fired.
    pub fn check(&self) -> ChallengeResult<()> {
        if self.token.is_cancelled() {
            return Err(ChallengeError::Cancelled);
        }
        if self.expires_at.is_some_and(|at| Instant::now() >= at) {
            return Err(ChallengeError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the deadline fires first,
    /// in which case `fut` is dropped.
    pub async fn run<F: Future>(&self, fut: F) -> ChallengeResult<F::Output> {
        self.check()?;
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(ChallengeError::Cancelled),
            () = expiry(self.expires_at) => Err(ChallengeError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }

    /// Interruptible sleep.
    pub async fn sleep(&self, duration: Duration) -> ChallengeResult<()> {
        self.run(tokio::time::sleep(duration)).await
    }
}

async fn expiry(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
