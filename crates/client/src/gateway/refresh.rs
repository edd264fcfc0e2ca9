//! Single-flight coordination of access-token refreshes.
//!
//! The first request to see a 401 becomes the refresher. Requests that see a
//! 401 while that refresh is outstanding park a oneshot sender in the queue
//! and are released, each exactly once, when the refresher settles. The
//! queue mutex is only held for synchronous bookkeeping, never across an
//! `.await`.

use std::sync::{Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::oneshot;

/// Why a parked request was released without a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefreshFailure {
    /// The refresh was rejected; the session is gone.
    Expired,
    /// The session the refresh was started for was replaced by a new login
    /// before it settled. The new session is untouched.
    Superseded,
    /// The refresher was dropped before it settled.
    Abandoned,
}

pub(crate) type RefreshOutcome = Result<SecretString, RefreshFailure>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// What a request that was rejected with 401 should do next.
pub(crate) enum Role<'a> {
    /// Perform the refresh and settle the guard with its outcome.
    Refresher(RefreshGuard<'a>),
    /// Wait for the in-flight refresh.
    Waiter(oneshot::Receiver<RefreshOutcome>),
    /// A refresh already completed since this request was sent; retry with
    /// the current token.
    Retry(SecretString),
}

#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    /// Decide the role of a request whose token `rejected` got a 401.
    ///
    /// `current` reads the session's access token. It is evaluated under
    /// the queue lock, so a refresh cannot settle between the check and the
    /// decision.
    pub(crate) fn join(
        &self,
        rejected: &SecretString,
        current: impl FnOnce() -> Option<SecretString>,
    ) -> Role<'_> {
        let mut state = self.lock();

        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            return Role::Waiter(rx);
        }

        if let Some(token) = current()
            && token.expose_secret() != rejected.expose_secret()
        {
            return Role::Retry(token);
        }

        state.in_flight = true;
        Role::Refresher(RefreshGuard {
            coordinator: self,
            settled: false,
        })
    }

    /// Number of parked requests.
    #[cfg(test)]
    fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        tracing::debug!(
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "Releasing requests parked on token refresh"
        );
        for waiter in waiters {
            // A waiter whose request was dropped has nobody to notify.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Held by the refresher. Dropping it unsettled releases every waiter with
/// [`RefreshFailure::Abandoned`] and clears the in-flight flag.
pub(crate) struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshGuard<'_> {
    pub(crate) fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Token refresh abandoned before completion");
            self.coordinator.settle(&Err(RefreshFailure::Abandoned));
        }
    }
}
