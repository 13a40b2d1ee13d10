//! Cooperative, process-wide cancellation.
//!
//! A [`CancelToken`] is cheap to clone and shared by the dispatcher, every
//! transform unit and the throttle. Cancelling never interrupts work that is
//! already running; it only stops new work from starting.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Waker = Box<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    wakers: Mutex<Wakers>,
    /// Parent token and the id of the waker this token registered on it.
    parent: Option<(Weak<CancelInner>, u64)>,
}

#[derive(Default)]
struct Wakers {
    next_id: u64,
    entries: Vec<(u64, Waker)>,
}

impl CancelInner {
    /// Store `wake` unless already cancelled; hands it back otherwise.
    fn register(&self, wake: Waker) -> std::result::Result<u64, Waker> {
        let mut wakers = self.wakers.lock();
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(wake);
        }
        let id = wakers.next_id;
        wakers.next_id += 1;
        wakers.entries.push((id, wake));
        Ok(id)
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let entries = std::mem::take(&mut self.wakers.lock().entries);
        for (_, wake) in entries {
            wake();
        }
    }
}

impl Drop for CancelInner {
    fn drop(&mut self) {
        if let Some((parent, id)) = self.parent.take()
            && let Some(parent) = parent.upgrade()
        {
            parent.wakers.lock().entries.retain(|(entry, _)| *entry != id);
        }
    }
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal and wake everything blocked on it. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// A token that is cancelled with this one but can also be cancelled on
    /// its own without affecting the parent.
    ///
    /// Once every clone of the child is dropped its hook is removed from the
    /// parent, so a long-lived parent does not accumulate dead children.
    #[must_use]
    pub fn child(&self) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<CancelInner>| {
            let weak = weak.clone();
            let hook: Waker = Box::new(move || {
                if let Some(child) = weak.upgrade() {
                    child.cancel();
                }
            });
            let (cancelled, parent) = match self.inner.register(hook) {
                Ok(id) => (false, Some((Arc::downgrade(&self.inner), id))),
                Err(_) => (true, None),
            };
            CancelInner {
                cancelled: AtomicBool::new(cancelled),
                wakers: Mutex::default(),
                parent,
            }
        });
        // The hook cannot reach the child before construction finishes.
        if self.is_cancelled() {
            inner.cancel();
        }
        Self { inner }
    }

    /// Register a callback that runs once when the token is cancelled.
    ///
    /// If the token is already cancelled the callback runs immediately on the
    /// calling thread.
    pub fn on_cancel(&self, wake: impl Fn() + Send + Sync + 'static) {
        if let Err(wake) = self.inner.register(Box::new(wake)) {
            wake();
        }
    }

    #[cfg(test)]
    pub(crate) fn registered_wakers(&self) -> usize {
        self.inner.wakers.lock().entries.len()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
