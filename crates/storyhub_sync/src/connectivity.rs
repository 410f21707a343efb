//! Process-wide connectivity signal.
//!
//! The flag is not persisted: at startup the host probes the platform
//! and seeds it, exactly as it would after any later transition.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

type Callback = Arc<dyn Fn() + Send + Sync>;

/// The device-level online/offline flag, with edge-triggered callbacks.
///
/// Callbacks registered via [`ConnectivitySignal::on_online`] fire
/// exactly once per offline-to-online transition. Setting the flag to a
/// value it already holds fires nothing.
pub struct ConnectivitySignal {
    online: AtomicBool,
    on_online: Mutex<Vec<Callback>>,
}

impl ConnectivitySignal {
    /// Creates a signal with the given initial state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            on_online: Mutex::new(Vec::new()),
        }
    }

    /// Returns the current flag.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Updates the flag. An offline-to-online edge invokes every
    /// registered callback, in registration order, on the caller's
    /// thread.
    ///
    /// The list is snapshotted before invocation, so a callback may
    /// itself register callbacks or flip the flag.
    pub fn set_online(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if online && !was_online {
            debug!("connectivity restored");
            let snapshot: Vec<Callback> = self.on_online.lock().clone();
            for callback in snapshot {
                callback();
            }
        }
    }

    /// Registers a callback for the offline-to-online edge.
    pub fn on_online<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_online.lock().push(Arc::new(callback));
    }
}

impl std::fmt::Debug for ConnectivitySignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivitySignal")
            .field("online", &self.is_online())
            .field("callbacks", &self.on_online.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn callback_fires_once_per_edge() {
        let signal = ConnectivitySignal::new(false);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        signal.on_online(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        signal.set_online(true);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Already online: no edge, no callback.
        signal.set_online(true);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        signal.set_online(false);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        signal.set_online(true);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn callback_may_reenter_the_signal() {
        let signal = Arc::new(ConnectivitySignal::new(false));
        let fired = Arc::new(AtomicUsize::new(0));

        let reentrant = Arc::clone(&signal);
        let counter = Arc::clone(&fired);
        signal.on_online(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            // Both of these take the signal's own locks.
            reentrant.on_online(|| {});
            reentrant.set_online(true);
        });

        signal.set_online(true);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(signal.is_online());
    }

    #[test]
    fn starting_online_fires_nothing() {
        let signal = ConnectivitySignal::new(true);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        signal.on_online(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        signal.set_online(true);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
