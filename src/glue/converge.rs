//! Converge: The pending/current field pairs behind every rendezvous.
//!
//! Each lifecycle resource is a [`Converge`] pair. The host thread writes
//! `pending` and blocks; the event loop applies the transition, writes
//! `current` and broadcasts. `pending == current` is the only condition
//! that releases a waiter (besides teardown).
//!
//! The host side holds the shared mutex across "write pending", "enqueue
//! command" and "wait", so two producers can never interleave their
//! pending writes and enqueues.

use crate::channel::CommandSender;
use crate::command::Command;
use crate::error::{GlueError, Result};
use crate::glue::activity::ActivityState;
use crate::looper::InputQueue;
use crate::window::{NativeWindow, Rect};
use parking_lot::{Condvar, Mutex};

/// A pending/current pair.
///
/// Only host threads write `pending`; only the event loop writes `current`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Converge<T> {
    /// Value requested by the host.
    pub pending: T,
    /// Value applied by the event loop.
    pub current: T,
}

impl<T: PartialEq> Converge<T> {
    /// Both halves agree.
    #[inline]
    pub fn is_converged(&self) -> bool {
        self.pending == self.current
    }
}

/// Accessor selecting one pair out of the shared state.
pub(crate) type Field<T> = fn(&mut SharedState) -> &mut Converge<T>;

/// Everything the host thread and the event loop share.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub window: Converge<Option<NativeWindow>>,
    pub input: Converge<Option<InputQueue>>,
    pub content_rect: Converge<Rect>,
    /// `None` until the event loop has processed `Create`.
    pub activity: Converge<Option<ActivityState>>,
    /// Save-state request serials.
    pub save: Converge<u64>,
    /// Bytes produced by the last save-state request.
    pub saved_state: Option<Vec<u8>>,
    /// Teardown has been requested by the host.
    pub destroy_requested: bool,
    /// The event loop is gone (or never coming back).
    pub destroyed: bool,
    /// Commands the channel refused; replayed by the event loop.
    pub undelivered: Vec<Command>,
}

impl SharedState {
    pub(crate) fn window(&mut self) -> &mut Converge<Option<NativeWindow>> {
        &mut self.window
    }

    pub(crate) fn input(&mut self) -> &mut Converge<Option<InputQueue>> {
        &mut self.input
    }

    pub(crate) fn content_rect(&mut self) -> &mut Converge<Rect> {
        &mut self.content_rect
    }

    pub(crate) fn activity(&mut self) -> &mut Converge<Option<ActivityState>> {
        &mut self.activity
    }

    pub(crate) fn save(&mut self) -> &mut Converge<u64> {
        &mut self.save
    }

    /// Enqueue, remembering the command if the channel refuses it.
    fn post(&mut self, commands: &CommandSender, cmd: Command) {
        if !commands.send(cmd) && !self.destroyed {
            self.undelivered.push(cmd);
        }
    }
}

/// The mutex/condvar pair guarding [`SharedState`].
#[derive(Debug, Default)]
pub(crate) struct Rendezvous {
    state: Mutex<SharedState>,
    changed: Condvar,
}

impl Rendezvous {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Host side: request a transition and block until it converges.
    ///
    /// Returns `Err(Destroyed)` if the event loop is torn down first.
    ///
    /// # Panics
    ///
    /// Panics if a previous request on the same field has not converged.
    pub(crate) fn request<T: PartialEq>(
        &self,
        commands: &CommandSender,
        cmd: Command,
        field: Field<T>,
        value: T,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(GlueError::Destroyed);
        }

        let slot = field(&mut state);
        assert!(
            slot.is_converged(),
            "{cmd} requested while a previous request on the same field is still pending"
        );
        slot.pending = value;
        state.post(commands, cmd);

        self.changed
            .wait_while(&mut state, |s| !field(s).is_converged() && !s.destroyed);

        if field(&mut state).is_converged() {
            Ok(())
        } else {
            log::warn!("{cmd} abandoned: event loop destroyed");
            Err(GlueError::Destroyed)
        }
    }

    /// Host side: update a field and post its command without waiting.
    /// Later posts overwrite earlier ones.
    pub(crate) fn post<T>(&self, commands: &CommandSender, cmd: Command, field: Field<T>, value: T) {
        let mut state = self.state.lock();
        if state.destroyed {
            return;
        }
        field(&mut state).pending = value;
        state.post(commands, cmd);
    }

    /// Host side: post a command that carries no field.
    pub(crate) fn notify(&self, commands: &CommandSender, cmd: Command) {
        let mut state = self.state.lock();
        if !state.destroyed {
            state.post(commands, cmd);
        }
    }

    /// Host side: post teardown and block until the event loop is gone.
    pub(crate) fn request_destroy(&self, commands: &CommandSender) {
        let mut state = self.state.lock();
        if !state.destroyed {
            state.destroy_requested = true;
            state.post(commands, Command::Destroy);
        }
        self.changed.wait_while(&mut state, |s| !s.destroyed);
    }

    /// Take the bytes of the last save-state request.
    pub(crate) fn take_saved_state(&self) -> Option<Vec<u8>> {
        self.state.lock().saved_state.take()
    }

    /// Read the applied half of a field.
    pub(crate) fn current<T: Clone>(&self, field: Field<T>) -> T {
        field(&mut self.state.lock()).current.clone()
    }

    /// Event-loop side: read the requested half of a field.
    pub(crate) fn pending<T: Clone>(&self, field: Field<T>) -> T {
        field(&mut self.state.lock()).pending.clone()
    }

    /// Event-loop side: publish the applied value and wake every waiter.
    pub(crate) fn settle<T>(&self, field: Field<T>, value: T) {
        let mut state = self.state.lock();
        field(&mut state).current = value;
        self.changed.notify_all();
    }

    /// Event-loop side: publish save-state bytes together with the serial.
    pub(crate) fn settle_saved_state(&self, serial: u64, bytes: Option<Vec<u8>>) {
        let mut state = self.state.lock();
        state.saved_state = bytes;
        state.save.current = serial;
        self.changed.notify_all();
    }

    /// Event-loop side: commands the channel refused, oldest first.
    pub(crate) fn take_undelivered(&self) -> Vec<Command> {
        std::mem::take(&mut self.state.lock().undelivered)
    }

    /// Whether the host has started teardown.
    pub(crate) fn is_destroy_requested(&self) -> bool {
        self.state.lock().destroy_requested
    }

    /// Whether the event loop is gone.
    pub(crate) fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Mark the event loop gone and release every waiter.
    pub(crate) fn mark_destroyed(&self) {
        let mut state = self.state.lock();
        state.destroyed = true;
        state.undelivered.clear();
        self.changed.notify_all();
    }
}

/// Marks the rendezvous destroyed when the event-loop thread exits,
/// including by unwinding.
pub(crate) struct DestroyGuard<'a>(pub &'a Rendezvous);

impl Drop for DestroyGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log::error!("event loop unwinding; releasing pending rendezvous");
        }
        self.0.mark_destroyed();
    }
}
