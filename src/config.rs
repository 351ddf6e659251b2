//! Configuration for the glue threads and tables.

use std::time::Duration;

/// Configuration for a [`Glue`](crate::glue::Glue) instance.
#[derive(Debug, Clone)]
pub struct GlueConfig {
    /// Size of the timer slot table. Slot 0 is reserved, so at most
    /// `timer_capacity - 1` timers can be registered at once.
    pub timer_capacity: usize,
    /// Bound of the command mailbox. A send into a full mailbox is logged
    /// and dropped.
    pub command_capacity: usize,
    /// How long the event loop blocks in its multiplexed wait before
    /// rechecking its sources.
    pub poll_timeout: Duration,
    /// Deadline published when no timer is active.
    pub timer_forever: Duration,
    /// Name of the event-loop thread.
    pub looper_thread_name: String,
    /// Name of the timer thread.
    pub timer_thread_name: String,
}

impl GlueConfig {
    /// Default timer table size.
    pub const DEFAULT_TIMER_CAPACITY: usize = 32;

    /// `timer_forever` in nanoseconds.
    pub fn forever_ns(&self) -> u64 {
        u64::try_from(self.timer_forever.as_nanos()).unwrap_or(u64::MAX)
    }
}

impl Default for GlueConfig {
    fn default() -> Self {
        Self {
            timer_capacity: Self::DEFAULT_TIMER_CAPACITY,
            command_capacity: 256,
            poll_timeout: Duration::from_millis(50),
            timer_forever: Duration::from_secs(24 * 60 * 60),
            looper_thread_name: "glue-looper".to_string(),
            timer_thread_name: "glue-timer".to_string(),
        }
    }
}
