//! Command Channel: The cross-thread mailbox feeding the event loop.
//!
//! Any thread may send; exactly one thread (the event loop) receives.
//! Commands come out in the order the sends completed, across all
//! producers combined, because there is a single physical queue.
//!
//! The mailbox is bounded, standing in for the OS pipe of a native
//! looper. Sending never blocks: when the mailbox is full the command is
//! logged and dropped. That is tolerable because every lifecycle
//! transition is also tracked by the rendezvous state, so a lost wake-up
//! delays processing without losing state.

use crate::command::Command;
use crate::error::{GlueError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Select, Sender, TryRecvError, TrySendError};
use std::sync::OnceLock;
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Create a command mailbox holding at most `capacity` undelivered commands.
///
/// # Panics
///
/// Panics if `capacity` is 0.
pub fn command_channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    assert!(capacity > 0, "command channel needs room for at least one command");
    let (tx, rx) = bounded(capacity);
    (
        CommandSender { tx },
        CommandReceiver {
            rx,
            consumer: OnceLock::new(),
        },
    )
}

/// Producer half. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
}

impl CommandSender {
    /// Post a command without blocking.
    ///
    /// Returns `false` if the command was dropped (mailbox full or the
    /// event loop gone). The failure is logged here; callers usually
    /// ignore the return value.
    pub fn send(&self, cmd: Command) -> bool {
        match self.try_send(cmd) {
            Ok(()) => {
                log::trace!("posted {cmd}");
                true
            }
            Err(err @ GlueError::ChannelFull(_)) => {
                log::error!("{err}");
                false
            }
            Err(err) => {
                log::warn!("{err}");
                false
            }
        }
    }

    /// Post a command, reporting failure instead of logging it.
    pub fn try_send(&self, cmd: Command) -> Result<()> {
        self.tx.try_send(cmd).map_err(|err| match err {
            TrySendError::Full(cmd) => GlueError::ChannelFull(cmd),
            TrySendError::Disconnected(cmd) => GlueError::ChannelClosed(cmd),
        })
    }

    /// Number of commands waiting to be received.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Whether the mailbox is currently empty.
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Consumer half. Owned by the event loop.
///
/// The first thread to receive becomes the consumer; receiving from any
/// other thread afterwards panics.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: Receiver<Command>,
    consumer: OnceLock<ThreadId>,
}

impl CommandReceiver {
    /// Block until a command arrives.
    ///
    /// Returns `None` once every sender is gone and the mailbox is empty.
    pub fn recv(&self) -> Option<Command> {
        self.claim();
        self.rx.recv().ok()
    }

    /// Block for at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Command> {
        self.claim();
        match self.rx.recv_timeout(timeout) {
            Ok(cmd) => Some(cmd),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Take the next command if one is already queued.
    pub fn try_recv(&self) -> Option<Command> {
        self.claim();
        match self.rx.try_recv() {
            Ok(cmd) => Some(cmd),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Receive everything currently queued, in order.
    pub fn drain<F: FnMut(Command)>(&self, mut f: F) -> usize {
        let mut n = 0usize;
        while let Some(cmd) = self.try_recv() {
            f(cmd);
            n += 1;
        }
        n
    }

    /// Register this mailbox with a multiplexed wait.
    ///
    /// Only readiness is observed; commands are still taken with
    /// [`Self::try_recv`].
    pub fn register<'a>(&'a self, sel: &mut Select<'a>) -> usize {
        sel.recv(&self.rx)
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    fn claim(&self) {
        let me = thread::current().id();
        let owner = *self.consumer.get_or_init(|| me);
        assert!(
            owner == me,
            "command channel has a single consumer; received from a second thread"
        );
    }
}
