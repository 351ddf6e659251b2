//! Host: What the event loop may ask of the platform.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Services the host platform exposes to the event loop.
pub trait Host: Send + Sync {
    /// Ask the platform to finish (tear down) the activity.
    ///
    /// Called on the event-loop thread when the application posts
    /// [`Command::Quit`](crate::Command::Quit). The platform answers later
    /// with the usual stop/destroy notifications.
    fn finish(&self);
}

/// A host that only counts finish requests.
///
/// Used when the glue runs without a platform behind it (tests, demos).
#[derive(Debug, Default)]
pub struct DetachedHost {
    finish_requests: AtomicUsize,
}

impl DetachedHost {
    /// Create a detached host.
    pub const fn new() -> Self {
        Self {
            finish_requests: AtomicUsize::new(0),
        }
    }

    /// How many times [`Host::finish`] was called.
    pub fn finish_requests(&self) -> usize {
        self.finish_requests.load(Ordering::Acquire)
    }
}

impl Host for DetachedHost {
    fn finish(&self) {
        log::info!("finish requested with no platform attached");
        self.finish_requests.fetch_add(1, Ordering::AcqRel);
    }
}
