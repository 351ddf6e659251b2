//! # Activity Glue
//!
//! Bridges a host-owned activity callback thread to an application-owned,
//! single-threaded event loop.
//!
//! The host delivers lifecycle notifications on its own thread and expects
//! each callback to return quickly. The application wants every piece of
//! window, input and render state touched by exactly one thread. This crate
//! sits in between.
//!
//! ## Core Concepts
//!
//! - **Command channel**: a bounded FIFO mailbox of one-byte [`Command`]s
//!   from any thread to the event loop
//! - **Rendezvous**: host callbacks that hand over a resource block until
//!   the event loop has applied them, so the host may free the old resource
//!   as soon as the callback returns
//! - **Timers**: a small bounded table of periodic callbacks on the event
//!   loop, woken by a dedicated timer thread
//! - **Event loop**: drains commands, input and sensor queues, coalesces
//!   redraws, and drives the application's [`Handler`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use glue::{Command, Glue, Handler, Looper, NativeWindow, Timer};
//! use std::time::Duration;
//!
//! struct App;
//!
//! impl Handler for App {
//!     fn on_command(&mut self, looper: &mut Looper, cmd: Command) {
//!         if cmd == Command::WindowInit {
//!             let proxy = looper.proxy();
//!             looper
//!                 .add_timer(Timer::new(Duration::from_millis(16), move |_, _| {
//!                     proxy.invalidate();
//!                 }))
//!                 .expect("timer slot");
//!         }
//!     }
//!
//!     fn on_redraw(&mut self, looper: &mut Looper) {
//!         let _surface = looper.window();
//!     }
//! }
//!
//! # fn main() -> glue::Result<()> {
//! let glue = Glue::spawn(App)?;
//! glue.on_start()?;
//! glue.on_resume()?;
//! glue.on_window_created(NativeWindow::from_raw(0x1000).unwrap())?;
//! glue.on_window_destroyed()?;
//! let exit_code = glue.destroy()?;
//! # let _ = exit_code;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod channel;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod glue;
pub mod input;
pub mod looper;
pub mod timer;
pub mod window;

// Re-exports for convenience
pub use channel::{command_channel, CommandReceiver, CommandSender};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use command::Command;
pub use config::GlueConfig;
pub use error::{GlueError, Result};
pub use glue::{ActivityState, DetachedHost, Glue, GlueBuilder, Host};
pub use input::{InputEvent, KeyAction, KeyCode, MetaState, MotionAction, SensorEvent, SensorKind};
pub use looper::{event_queue, EventQueue, EventSender, Handler, InputQueue, LoopFlags, Looper, LooperProxy, SensorQueue, SourceId};
pub use timer::{Timer, TimerId, TimerRegistry};
pub use window::{NativeWindow, Rect};
