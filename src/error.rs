//! Error types shared by the glue, the timer registry and the channel.

use crate::command::Command;
use std::io;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GlueError>;

/// Everything that can go wrong without being a caller bug.
///
/// Contract violations (removing an unregistered timer, issuing a second
/// pending rendezvous) are not represented here; they panic.
#[derive(Debug, Error)]
pub enum GlueError {
    /// The bounded command mailbox had no room; the command was dropped.
    #[error("command channel full, dropped {0}")]
    ChannelFull(Command),

    /// The event loop is gone; the command was dropped.
    #[error("command channel closed, dropped {0}")]
    ChannelClosed(Command),

    /// Every timer slot is taken.
    #[error("timer table full ({capacity} slots, slot 0 reserved)")]
    TimerCapacity {
        /// Configured table size.
        capacity: usize,
    },

    /// The event loop has been torn down; the rendezvous was abandoned.
    #[error("event loop destroyed")]
    Destroyed,

    /// A background thread could not be started.
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        /// Name of the thread that failed to start.
        thread: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The event-loop thread unwound instead of exiting cleanly.
    #[error("event loop thread panicked")]
    EventLoopPanicked,
}
