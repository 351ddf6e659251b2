//! Timers: The bounded periodic-timer table and the thread that wakes it.
//!
//! The [`TimerRegistry`] lives on the event loop and publishes a wake
//! interval through a [`Deadline`]; the [`TimerThread`] sleeps on that
//! deadline and posts [`Command::TimerDue`](crate::Command::TimerDue).

mod registry;
mod thread;

pub use registry::{Timer, TimerCallback, TimerId, TimerRegistry};
pub use thread::{Deadline, TimerThread};
