//! Bounded restarts with exponential backoff for the watch loop.

use crate::watch::WatchError;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("giving up after {restarts} restarts: {source}")]
    Exhausted {
        restarts: u32,
        #[source]
        source: WatchError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Consecutive restarts allowed before giving up
    pub max_restarts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// A run lasting at least this long resets the consecutive count
    pub reset_after: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            reset_after: Duration::from_secs(60),
        }
    }
}

impl RestartPolicy {
    /// Delay before restart number `restart` (0-based): doubles each time,
    /// capped at `max_backoff`.
    pub fn backoff(&self, restart: u32) -> Duration {
        let factor = 1u32.checked_shl(restart).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Run `task` until it returns `Ok`, restarting it after failures.
///
/// `task` receives the attempt number (0 for the first run). Once
/// `max_restarts` consecutive failures have been retried, the next failure
/// is returned as [`SupervisorError::Exhausted`].
pub async fn supervise<F, Fut>(policy: &RestartPolicy, mut task: F) -> Result<(), SupervisorError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(), WatchError>>,
{
    let mut attempt = 0;
    let mut restarts = 0;

    loop {
        let started = Instant::now();
        let err = match task(attempt).await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if started.elapsed() >= policy.reset_after {
            restarts = 0;
        }

        if restarts >= policy.max_restarts {
            tracing::error!("Watch loop failed: {}", err);
            return Err(SupervisorError::Exhausted {
                restarts,
                source: err,
            });
        }

        let delay = policy.backoff(restarts);
        tracing::warn!(
            "Watch loop failed: {}; restarting in {:?} ({}/{})",
            err,
            delay,
            restarts + 1,
            policy.max_restarts
        );
        tokio::time::sleep(delay).await;

        restarts += 1;
        attempt += 1;
    }
}
