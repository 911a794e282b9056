//! Pausing between status polls, with external cancellation.
//!
//! [`JobsService::wait_for_completion`](crate::api::JobsService::wait_for_completion) has no
//! retry limit of its own. Callers bound it through the [`Pacer`] they pass in: a
//! [`CancelToken`] can be cancelled from another thread or given a deadline.

use crate::Error;
use std::{
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

/// Interval between status polls of a running build.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Blocks the calling thread between two polls.
pub trait Pacer {
    /// Wait for `interval`, or return [`Error::Cancelled`] if polling should stop.
    fn pause(&self, interval: Duration) -> Result<(), Error>;
}

impl<P: Pacer + ?Sized> Pacer for &P {
    fn pause(&self, interval: Duration) -> Result<(), Error> {
        (**self).pause(interval)
    }
}

#[derive(Default)]
struct State {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Cloneable cancellation handle that doubles as a [`Pacer`].
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Arc<State>,
    deadline: Option<Instant>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that cancels itself once `deadline` has passed.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    /// Token that cancels itself `timeout` from now. A timeout too large to represent
    /// means no deadline.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::new(),
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Wake every pending [`Pacer::pause`] and make future ones fail.
    pub fn cancel(&self) {
        let mut cancelled = match self.state.cancelled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cancelled = true;
        self.state.wake.notify_all();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        let cancelled = match self.state.cancelled.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        cancelled || self.deadline.is_some_and(|dl| Instant::now() >= dl)
    }
}

impl Pacer for CancelToken {
    /// An `interval` too large to represent waits until cancellation or the deadline.
    fn pause(&self, interval: Duration) -> Result<(), Error> {
        let until = Instant::now().checked_add(interval);
        let (stop_at, cut_short) = match (until, self.deadline) {
            (Some(until), Some(deadline)) if deadline < until => (Some(deadline), true),
            (None, Some(deadline)) => (Some(deadline), true),
            (until, _) => (until, false),
        };

        let mut cancelled = match self.state.cancelled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            if *cancelled {
                return Err(Error::Cancelled);
            }
            let Some(stop_at) = stop_at else {
                cancelled = match self.state.wake.wait(cancelled) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                continue;
            };
            let now = Instant::now();
            if now >= stop_at {
                break;
            }
            cancelled = match self.state.wake.wait_timeout(cancelled, stop_at - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }

        if cut_short {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
