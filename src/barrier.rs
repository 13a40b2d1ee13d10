//! Completion barrier for spawned transform units.
//!
//! The dispatcher calls [`WaitGroup::register`] before spawning each unit and
//! moves the [`Registration`] into it. Dropping the registration signals
//! completion, so a unit that returns early or unwinds is still counted.
//! [`WaitGroup::wait`] returns once every registration has been dropped.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
pub struct WaitGroup {
    outstanding: Mutex<usize>,
    done_cv: Condvar,
}

impl WaitGroup {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count one more outstanding unit.
    pub fn register(self: &Arc<Self>) -> Registration {
        *self.outstanding.lock() += 1;
        Registration {
            group: Arc::clone(self),
        }
    }

    /// Block until every registered unit has completed.
    pub fn wait(&self) {
        let mut outstanding = self.outstanding.lock();
        while *outstanding > 0 {
            self.done_cv.wait(&mut outstanding);
        }
    }

    #[must_use]
    pub fn outstanding(&self) -> usize {
        *self.outstanding.lock()
    }

    fn done(&self) {
        let mut outstanding = self.outstanding.lock();
        *outstanding -= 1;
        if *outstanding == 0 {
            self.done_cv.notify_all();
        }
    }
}

/// Proof that one unit is outstanding; signals completion on drop.
#[must_use = "dropping the registration marks the unit complete"]
pub struct Registration {
    group: Arc<WaitGroup>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.group.done();
    }
}
