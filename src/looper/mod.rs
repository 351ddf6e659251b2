//! Event loop: The single thread that owns application state.
//!
//! The loop waits on the command channel plus any input and sensor
//! queues, applies lifecycle commands (completing the host's rendezvous),
//! fires timers and hands everything else to the application's
//! [`Handler`].

mod dispatch;
mod handler;
#[allow(clippy::module_inception)]
mod looper;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub(crate) use dispatch::EventLoop;
pub use handler::Handler;
pub use looper::{LoopFlags, Looper, LooperProxy};
pub use source::{event_queue, EventQueue, EventSender, InputQueue, SensorQueue, SourceId};
