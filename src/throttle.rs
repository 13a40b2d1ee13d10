//! Fixed-capacity admission gate.
//!
//! The [`Throttle`] is a counting semaphore with exactly `capacity` tokens. A
//! [`Permit`] is one admission token: holding it authorizes one in-flight
//! transform unit, and dropping it returns the token. Because release happens
//! in `Drop`, the token comes back on every exit path, unwinding included.
//!
//! This is the only backpressure in the pipeline: the dispatcher stalls in
//! [`Throttle::acquire`] while all tokens are held, which bounds memory no
//! matter how large the input is.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};

use crate::cancel::CancelToken;

pub struct Throttle {
    capacity: usize,
    state: Mutex<ThrottleState>,
    available_cv: Condvar,
}

struct ThrottleState {
    available: usize,
    peak: usize,
}

impl Throttle {
    /// Create a throttle with `capacity` tokens (clamped to at least one).
    ///
    /// The throttle subscribes to `cancel` so that a blocked
    /// [`acquire`](Self::acquire) wakes up as soon as the token is cancelled.
    pub fn new(capacity: usize, cancel: &CancelToken) -> Arc<Self> {
        let capacity = capacity.max(1);
        let throttle = Arc::new(Self {
            capacity,
            state: Mutex::new(ThrottleState {
                available: capacity,
                peak: 0,
            }),
            available_cv: Condvar::new(),
        });

        let weak: Weak<Self> = Arc::downgrade(&throttle);
        cancel.on_cancel(move || {
            if let Some(throttle) = weak.upgrade() {
                // Take the lock so a waiter between its flag check and its
                // wait cannot miss this notification.
                let _state = throttle.state.lock();
                throttle.available_cv.notify_all();
            }
        });

        throttle
    }

    /// Block until a token is free, or return `None` once `cancel` fires.
    ///
    /// A cancelled acquire never consumes a token.
    pub fn acquire(self: &Arc<Self>, cancel: &CancelToken) -> Option<Permit> {
        let mut state = self.state.lock();
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            if state.available > 0 {
                state.available -= 1;
                let in_flight = self.capacity - state.available;
                state.peak = state.peak.max(in_flight);
                return Some(Permit {
                    throttle: Arc::clone(self),
                });
            }
            self.available_cv.wait(&mut state);
        }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.available < self.capacity, "token released twice");
        state.available += 1;
        self.available_cv.notify_one();
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tokens currently held.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.capacity - self.state.lock().available
    }

    /// Highest number of tokens ever held at the same time.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.state.lock().peak
    }
}

impl fmt::Debug for Throttle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("capacity", &self.capacity)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// One admission token. Returned to its [`Throttle`] on drop.
#[must_use = "dropping the permit releases the token immediately"]
pub struct Permit {
    throttle: Arc<Throttle>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.throttle.release();
    }
}

impl fmt::Debug for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit").finish_non_exhaustive()
    }
}
