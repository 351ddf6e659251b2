//! Handler: The application side of the event loop.

use super::looper::Looper;
use super::source::SourceId;
use crate::command::Command;
use crate::input::{InputEvent, SensorEvent};

/// Application logic driven by the event loop.
///
/// Every method runs on the event-loop thread, one at a time, and receives
/// the [`Looper`] for timers, state accessors and posting commands. All
/// methods have no-op defaults.
pub trait Handler: Send + 'static {
    /// A lifecycle command has been applied.
    ///
    /// Called for every command except `Redraw` and `TimerDue`, which the
    /// loop consumes itself. For rendezvous commands the host thread is
    /// still blocked while this runs: attach-type commands arrive after the
    /// new value is visible through the looper, `WindowTerm` arrives while
    /// the old window is still attached.
    fn on_command(&mut self, looper: &mut Looper, cmd: Command) {
        let _ = (looper, cmd);
    }

    /// An event from the attached input queue.
    ///
    /// Returns `true` if the event was consumed.
    fn on_input(&mut self, looper: &mut Looper, event: InputEvent) -> bool {
        let _ = (looper, event);
        false
    }

    /// A reading from an attached sensor queue.
    fn on_sensor(&mut self, looper: &mut Looper, source: SourceId, event: SensorEvent) {
        let _ = (looper, source, event);
    }

    /// The host asked for saved state.
    ///
    /// The returned bytes are handed back to the host thread.
    fn on_save_state(&mut self, looper: &mut Looper) -> Option<Vec<u8>> {
        let _ = looper;
        None
    }

    /// One or more redraws were requested since the last call.
    fn on_redraw(&mut self, looper: &mut Looper) {
        let _ = looper;
    }

    /// Every ready source has been drained.
    ///
    /// Runs once per loop iteration, including iterations woken only by
    /// the poll timeout.
    fn on_idle(&mut self, looper: &mut Looper) {
        let _ = looper;
    }
}
