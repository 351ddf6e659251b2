//! Looper: Event-loop state visible to the application.
//!
//! The looper is owned by the event-loop thread and lent to every
//! [`Handler`](super::Handler) call. Its accessors expose the converged
//! half of each rendezvous field, so they are only meaningful there.

use super::source::{InputQueue, PollSource, SensorQueue, SourceId};
use crate::channel::CommandSender;
use crate::clock::Clock;
use crate::command::Command;
use crate::config::GlueConfig;
use crate::error::Result;
use crate::glue::{ActivityState, Host};
use crate::timer::{Deadline, Timer, TimerId, TimerRegistry};
use crate::window::{NativeWindow, Rect};
use bitflags::bitflags;
use std::fmt;
use std::sync::Arc;

bitflags! {
    /// Event-loop status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LoopFlags: u8 {
        /// The loop has started and not yet processed `Destroy`.
        const RUNNING = 0b0000_0001;
        /// The window has input focus.
        const FOCUSED = 0b0000_0010;
        /// A window surface is attached.
        const WINDOW = 0b0000_0100;
        /// A redraw is pending for the end of this iteration.
        const REDRAW = 0b0000_1000;
        /// `Destroy` has been processed; the loop exits.
        const DESTROYED = 0b0001_0000;
    }
}

/// Event-loop state handed to the application.
pub struct Looper {
    pub(super) config: GlueConfig,
    clock: Arc<dyn Clock>,
    commands: CommandSender,
    pub(super) host: Arc<dyn Host>,
    pub(super) timers: TimerRegistry,
    pub(super) window: Option<NativeWindow>,
    pub(super) input: Option<InputQueue>,
    /// Cleared when the input queue's producer disconnects.
    pub(super) input_live: bool,
    pub(super) content_rect: Rect,
    pub(super) activity: Option<ActivityState>,
    pub(super) saved_state: Option<Vec<u8>>,
    pub(super) flags: LoopFlags,
    pub(super) exit_code: i32,
    sensors: Vec<(SourceId, SensorQueue)>,
    next_source: SourceId,
}

impl Looper {
    pub(crate) fn new(
        config: GlueConfig,
        clock: Arc<dyn Clock>,
        commands: CommandSender,
        host: Arc<dyn Host>,
        deadline: Deadline,
        saved_state: Option<Vec<u8>>,
    ) -> Self {
        let timers = TimerRegistry::new(config.timer_capacity, config.forever_ns(), deadline);
        Self {
            config,
            clock,
            commands,
            host,
            timers,
            window: None,
            input: None,
            input_live: false,
            content_rect: Rect::ZERO,
            activity: None,
            saved_state,
            flags: LoopFlags::empty(),
            exit_code: 0,
            sensors: Vec::new(),
            next_source: SourceId::FIRST_USER,
        }
    }

    /// Request a redraw at the end of the current (or next) iteration.
    pub fn invalidate(&self) {
        self.commands.send(Command::Redraw);
    }

    /// Register a periodic timer.
    ///
    /// The timer starts its clock at the next `TimerDue` pass, not now.
    pub fn add_timer(&mut self, timer: Timer) -> Result<TimerId> {
        self.timers.add(timer)
    }

    /// Unregister a timer.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not registered.
    pub fn remove_timer(&mut self, id: TimerId) {
        self.timers.remove(id);
    }

    /// The timer table.
    pub const fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Ask the host to finish the activity. The loop keeps running until
    /// the host answers with `Destroy`.
    pub fn quit(&self) {
        self.commands.send(Command::Quit);
    }

    /// Like [`Self::quit`], also recording the code the loop exits with.
    pub fn exit(&mut self, code: i32) {
        log::debug!("exit requested with code {code}");
        self.exit_code = code;
        self.quit();
    }

    /// The exit code recorded so far.
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// The attached window surface.
    #[inline]
    pub const fn window(&self) -> Option<NativeWindow> {
        self.window
    }

    /// The attached input queue.
    #[inline]
    pub const fn input_queue(&self) -> Option<&InputQueue> {
        self.input.as_ref()
    }

    /// The area of the window not covered by system decorations.
    #[inline]
    pub const fn content_rect(&self) -> Rect {
        self.content_rect
    }

    /// The last activity state applied. `None` before `Create`.
    #[inline]
    pub const fn activity_state(&self) -> Option<ActivityState> {
        self.activity
    }

    /// Whether the window has input focus.
    #[inline]
    pub const fn has_focus(&self) -> bool {
        self.flags.contains(LoopFlags::FOCUSED)
    }

    /// Whether the loop is running (started, not yet destroyed).
    #[inline]
    pub const fn is_running(&self) -> bool {
        self.flags.contains(LoopFlags::RUNNING)
    }

    /// Current status bits.
    #[inline]
    pub const fn flags(&self) -> LoopFlags {
        self.flags
    }

    /// State the host handed over at startup. Released on the first
    /// `Resume`.
    pub fn saved_state(&self) -> Option<&[u8]> {
        self.saved_state.as_deref()
    }

    /// Current timestamp from the loop's clock.
    pub fn now_ns(&self) -> u64 {
        self.clock.now_ns()
    }

    /// A handle other threads can use to post to this loop.
    pub fn proxy(&self) -> LooperProxy {
        LooperProxy {
            commands: self.commands.clone(),
        }
    }

    /// Start polling a sensor queue.
    pub fn attach_sensor_queue(&mut self, queue: SensorQueue) -> SourceId {
        let id = self.next_source;
        self.next_source = id.next();
        self.sensors.push((id, queue));
        log::debug!("attached sensor queue as {id}");
        id
    }

    /// Stop polling a sensor queue. Returns `false` if `id` was not
    /// attached (or was already detached because its producer went away).
    pub fn detach_sensor_queue(&mut self, id: SourceId) -> bool {
        let before = self.sensors.len();
        self.sensors.retain(|(source, _)| *source != id);
        let removed = self.sensors.len() != before;
        if removed {
            log::debug!("detached {id}");
        }
        removed
    }

    /// Whether `id` is an attached sensor queue.
    pub fn has_sensor_queue(&self, id: SourceId) -> bool {
        self.sensors.iter().any(|(source, _)| *source == id)
    }

    /// Configuration the glue was spawned with.
    #[inline]
    pub const fn config(&self) -> &GlueConfig {
        &self.config
    }

    /// Snapshot of the sources to wait on this iteration.
    pub(super) fn poll_sources(&self) -> Vec<PollSource> {
        let mut sources = Vec::with_capacity(2 + self.sensors.len());
        sources.push(PollSource::Main);
        if let Some(queue) = self.input.as_ref().filter(|_| self.input_live) {
            sources.push(PollSource::Input(queue.clone()));
        }
        sources.extend(
            self.sensors
                .iter()
                .map(|(id, queue)| PollSource::Sensor(*id, queue.clone())),
        );
        sources
    }
}

impl fmt::Debug for Looper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Looper")
            .field("flags", &self.flags)
            .field("window", &self.window)
            .field("activity", &self.activity)
            .field("content_rect", &self.content_rect)
            .field("timers", &self.timers)
            .field("sensors", &self.sensors.len())
            .finish_non_exhaustive()
    }
}

/// Cloneable handle for posting to the event loop from any thread.
#[derive(Debug, Clone)]
pub struct LooperProxy {
    commands: CommandSender,
}

impl LooperProxy {
    /// Request a redraw. Returns `false` if the command was dropped.
    pub fn invalidate(&self) -> bool {
        self.commands.send(Command::Redraw)
    }

    /// Ask the host to finish the activity.
    pub fn quit(&self) -> bool {
        self.commands.send(Command::Quit)
    }

    /// Post a raw command.
    pub fn send(&self, cmd: Command) -> bool {
        self.commands.send(cmd)
    }
}

impl From<CommandSender> for LooperProxy {
    fn from(commands: CommandSender) -> Self {
        Self { commands }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::command_channel;
    use crate::clock::ManualClock;
    use crate::glue::DetachedHost;
    use crate::looper::source::event_queue;
    use std::time::Duration;

    fn looper(saved_state: Option<Vec<u8>>) -> (Looper, crate::channel::CommandReceiver) {
        let config = GlueConfig::default();
        let (tx, rx) = command_channel(16);
        let deadline = Deadline::new(config.forever_ns());
        let looper = Looper::new(
            config,
            Arc::new(ManualClock::new()),
            tx,
            Arc::new(DetachedHost::new()),
            deadline,
            saved_state,
        );
        (looper, rx)
    }

    #[test]
    fn test_invalidate_and_quit_post() {
        let (mut looper, rx) = looper(None);
        looper.invalidate();
        looper.exit(7);
        assert!(looper.proxy().invalidate());

        let mut seen = Vec::new();
        rx.drain(|cmd| seen.push(cmd));
        assert_eq!(seen, vec![Command::Redraw, Command::Quit, Command::Redraw]);
        assert_eq!(looper.exit_code(), 7);
    }

    #[test]
    fn test_initial_state() {
        let (looper, _rx) = looper(Some(vec![1, 2, 3]));
        assert_eq!(looper.saved_state(), Some(&[1u8, 2, 3][..]));
        assert_eq!(looper.window(), None);
        assert_eq!(looper.activity_state(), None);
        assert!(!looper.is_running());
        assert!(!looper.has_focus());
        assert_eq!(looper.content_rect(), Rect::ZERO);
        assert_eq!(looper.now_ns(), ManualClock::START_NS);
    }

    #[test]
    fn test_sensor_attach_detach() {
        let (mut looper, _rx) = looper(None);
        let (_tx_a, a) = event_queue(4);
        let (_tx_b, b) = event_queue(4);

        let first = looper.attach_sensor_queue(a);
        let second = looper.attach_sensor_queue(b);
        assert_eq!(first, SourceId::FIRST_USER);
        assert_ne!(first, second);
        assert_eq!(looper.poll_sources().len(), 3);

        assert!(looper.detach_sensor_queue(first));
        assert!(!looper.detach_sensor_queue(first));
        assert!(!looper.has_sensor_queue(first));
        assert!(looper.has_sensor_queue(second));
    }

    #[test]
    fn test_timers_through_looper() {
        let (mut looper, _rx) = looper(None);
        let id = looper
            .add_timer(Timer::new(Duration::from_millis(5), |_, _| {}))
            .unwrap();
        assert!(looper.timers().contains(id));
        looper.remove_timer(id);
        assert!(looper.timers().is_empty());
    }
}
