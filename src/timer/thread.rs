//! Timer Thread: Dedicated thread that turns deadlines into commands.
//!
//! The thread owns nothing but the published deadline. It sleeps on a
//! condition variable for at most that long and, whenever it wakes (the
//! deadline elapsed or was changed), posts [`Command::TimerDue`]. All
//! timer bookkeeping happens on the event loop; this thread never runs
//! application code.

use crate::channel::CommandSender;
use crate::command::Command;
use crate::error::{GlueError, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// State shared between the registry (publisher) and the timer thread.
#[derive(Debug)]
struct DeadlineState {
    /// Relative wake interval, in nanoseconds.
    deadline_ns: u64,
    /// Set once at teardown; the thread exits without posting.
    destroy_requested: bool,
}

#[derive(Debug)]
struct DeadlineShared {
    state: Mutex<DeadlineState>,
    wake: Condvar,
}

/// Handle to the published timer deadline.
///
/// Clones refer to the same deadline. The registry publishes through it;
/// the timer thread sleeps on it.
#[derive(Debug, Clone)]
pub struct Deadline {
    shared: Arc<DeadlineShared>,
}

impl Deadline {
    /// Create a deadline with an initial wake interval.
    pub fn new(initial_ns: u64) -> Self {
        Self {
            shared: Arc::new(DeadlineShared {
                state: Mutex::new(DeadlineState {
                    deadline_ns: initial_ns,
                    destroy_requested: false,
                }),
                wake: Condvar::new(),
            }),
        }
    }

    /// Publish a new wake interval.
    ///
    /// The timer thread is only signalled when the value actually changes.
    /// Returns whether it changed.
    pub fn publish(&self, deadline_ns: u64) -> bool {
        let mut state = self.shared.state.lock();
        if state.destroy_requested || state.deadline_ns == deadline_ns {
            return false;
        }
        state.deadline_ns = deadline_ns;
        self.shared.wake.notify_all();
        true
    }

    /// Currently published wake interval.
    pub fn current_ns(&self) -> u64 {
        self.shared.state.lock().deadline_ns
    }

    /// Whether teardown has started.
    pub fn is_destroy_requested(&self) -> bool {
        self.shared.state.lock().destroy_requested
    }

    /// First phase of teardown: mark destroyed and wake the thread with a
    /// zero deadline so it observes the flag immediately.
    pub fn request_destroy(&self) {
        let mut state = self.shared.state.lock();
        state.destroy_requested = true;
        state.deadline_ns = 0;
        self.shared.wake.notify_all();
    }
}

/// The timer thread handle.
pub struct TimerThread {
    /// Handle to the timer thread.
    handle: Option<JoinHandle<()>>,
    /// Deadline the thread sleeps on.
    deadline: Deadline,
}

impl TimerThread {
    /// Spawn the timer thread.
    ///
    /// # Arguments
    ///
    /// * `deadline` - Deadline published by the timer registry.
    /// * `commands` - Mailbox to post [`Command::TimerDue`] into.
    /// * `name` - Thread name.
    pub fn spawn(deadline: Deadline, commands: CommandSender, name: &str) -> Result<Self> {
        let thread_deadline = deadline.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                Self::run_loop(&thread_deadline, &commands);
            })
            .map_err(|source| GlueError::Spawn {
                thread: name.to_string(),
                source,
            })?;

        log::debug!("timer thread {name} started");
        Ok(Self {
            handle: Some(handle),
            deadline,
        })
    }

    /// The deadline this thread sleeps on.
    pub const fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    /// Signal the thread to exit. It will not post again.
    pub fn shutdown(&self) {
        self.deadline.request_destroy();
    }

    /// Signal shutdown and wait for the thread to finish.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("timer thread panicked");
            }
        }
    }

    /// Main timer loop.
    fn run_loop(deadline: &Deadline, commands: &CommandSender) {
        let shared = &deadline.shared;
        let mut state = shared.state.lock();

        loop {
            if state.destroy_requested {
                break;
            }

            let wait = Duration::from_nanos(state.deadline_ns);
            let result = shared.wake.wait_for(&mut state, wait);

            if state.destroy_requested {
                break;
            }

            if result.timed_out() {
                log::trace!("timer deadline elapsed");
            } else {
                log::trace!("timer deadline changed to {}ns", state.deadline_ns);
            }
            // Non-blocking; a dropped TimerDue only delays the next pass.
            commands.send(Command::TimerDue);
        }

        log::debug!("timer thread exiting");
    }
}

impl Drop for TimerThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
