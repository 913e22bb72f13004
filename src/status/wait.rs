use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::generation::StateGeneration;
use crate::status::FollowerInternalState;
use crate::status::LeaderInternalState;
use crate::status::StateStatus;

/// Error variants related to waiting for a status condition.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("timeout after {0:?} when {1}")]
    Timeout(Duration, String),

    #[error("the replicated-state instance has shut down")]
    Shutdown,
}

/// `Wait` wraps a published-status channel and blocks until the status
/// satisfies a condition, or a timeout expires.
///
/// The status channel only stores the latest value, so intermediate states
/// may be skipped; wait for conditions that hold once reached.
pub struct Wait {
    pub timeout: Duration,
    pub rx: watch::Receiver<StateStatus>,
}

impl Wait {
    /// Wait for the published status to satisfy `func`, or timeout.
    #[tracing::instrument(level = "trace", skip(self, func), fields(msg=%msg.to_string()))]
    pub async fn status<T>(&self, func: T, msg: impl ToString) -> Result<StateStatus, WaitError>
    where T: Fn(&StateStatus) -> bool + Send {
        let timeout_at = Instant::now() + self.timeout;

        let mut rx = self.rx.clone();
        loop {
            let latest = rx.borrow().clone();

            if func(&latest) {
                tracing::debug!("done wait {}: latest: {}", msg.to_string(), latest);
                return Ok(latest);
            }

            let now = Instant::now();
            if now >= timeout_at {
                return Err(WaitError::Timeout(
                    self.timeout,
                    format!("{} latest: {}", msg.to_string(), latest),
                ));
            }

            let delay = tokio::time::sleep_until(timeout_at);

            tokio::select! {
                _ = delay => {
                    return Err(WaitError::Timeout(
                        self.timeout,
                        format!("{} latest: {}", msg.to_string(), latest),
                    ));
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        // The worker quit and dropped the sender.
                        return Err(WaitError::Shutdown);
                    }
                }
            }
        }
    }

    /// Wait for a leader-role status in the given internal state.
    pub async fn leader_state(
        &self,
        want: LeaderInternalState,
        msg: impl ToString,
    ) -> Result<StateStatus, WaitError> {
        self.status(
            |st| st.as_leader().map(|x| x.manager_state.state == want).unwrap_or(false),
            msg,
        )
        .await
    }

    /// Wait for a follower-role status in the given internal state.
    pub async fn follower_state(
        &self,
        want: FollowerInternalState,
        msg: impl ToString,
    ) -> Result<StateStatus, WaitError> {
        self.status(
            |st| st.as_follower().map(|x| x.manager_state.state == want).unwrap_or(false),
            msg,
        )
        .await
    }

    /// Wait for the published generation to reach at least `want`.
    pub async fn generation(
        &self,
        want: StateGeneration,
        msg: impl ToString,
    ) -> Result<StateStatus, WaitError> {
        self.status(|st| st.generation() >= want, msg).await
    }
}
