//! Fixed-interval background refresh with an explicit stop contract.
//!
//! The storefront pages re-check the listing, the auth markers and the cart
//! on independent timers; each owning view must cancel its timer on teardown
//! so no background work leaks. The remote calls themselves are not
//! cancellable mid-flight: stopping only guarantees that no further tick
//! starts, and a late response is simply never acted on.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// The home page's listing refresh interval.
pub const LISTING_REFRESH: Duration = Duration::from_secs(30);

/// The header's auth-marker re-check interval.
pub const AUTH_REFRESH: Duration = Duration::from_secs(1);

/// Handle for a repeating background task. Dropping the handle stops the
/// task, so an owning view cannot forget teardown.
#[derive(Debug)]
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    /// Run `task` now and then once per `period`. Ticks never overlap; when
    /// a run outlasts the period the next tick is delayed, not stacked.
    pub fn spawn<F, Fut>(period: Duration, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task().await;
            }
        });
        debug!(?period, "poller started");
        Self { handle }
    }

    /// Stop polling. Idempotent; a tick already running is not interrupted
    /// at the transport level, its result is just discarded.
    pub fn stop(&self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
