//! Dispatch: The event-loop thread body.
//!
//! # Iteration
//!
//! 1. Snapshot the poll sources (commands, input, sensors) and block in a
//!    multiplexed wait for at most `poll_timeout`.
//! 2. Drain every source to empty, commands first. Commands refused by a
//!    full mailbox are replayed after the mailbox is drained.
//! 3. If any redraw was requested, call [`Handler::on_redraw`] once.
//! 4. Call [`Handler::on_idle`].
//!
//! Processing `Destroy` stops the iteration immediately; anything queued
//! behind it is discarded.

use super::handler::Handler;
use super::looper::{LoopFlags, Looper};
use super::source::{InputQueue, PollSource, SensorQueue, SourceId};
use crate::channel::CommandReceiver;
use crate::command::Command;
use crate::glue::converge::{Rendezvous, SharedState};
use crate::glue::ActivityState;
use crossbeam_channel::{Select, TryRecvError};
use std::sync::Arc;

/// The single consumer of the command channel.
pub(crate) struct EventLoop<H> {
    looper: Looper,
    handler: H,
    commands: CommandReceiver,
    rendezvous: Arc<Rendezvous>,
}

impl<H: Handler> EventLoop<H> {
    pub(crate) fn new(
        looper: Looper,
        handler: H,
        commands: CommandReceiver,
        rendezvous: Arc<Rendezvous>,
    ) -> Self {
        Self {
            looper,
            handler,
            commands,
            rendezvous,
        }
    }

    /// Run until `Destroy` is processed. Returns the exit code.
    pub(crate) fn run(mut self) -> i32 {
        self.start();
        while !self.is_destroyed() {
            self.poll_once();
        }
        log::info!("event loop exiting with code {}", self.looper.exit_code);
        self.looper.exit_code
    }

    fn start(&mut self) {
        log::info!("event loop running");
        self.looper.flags.insert(LoopFlags::RUNNING);
        self.looper.timers.set_running(true);
    }

    fn is_destroyed(&self) -> bool {
        self.looper.flags.contains(LoopFlags::DESTROYED)
    }

    /// One wait-drain-redraw-idle iteration.
    pub(crate) fn poll_once(&mut self) {
        let sources = self.looper.poll_sources();
        self.wait(&sources);

        for source in &sources {
            match source {
                PollSource::Main => self.process_commands(),
                PollSource::Input(queue) => self.process_input(queue),
                PollSource::Sensor(id, queue) => self.process_sensor(*id, queue),
            }
            if self.is_destroyed() {
                return;
            }
        }

        if self.looper.flags.contains(LoopFlags::REDRAW) {
            self.looper.flags.remove(LoopFlags::REDRAW);
            self.handler.on_redraw(&mut self.looper);
        }
        self.handler.on_idle(&mut self.looper);
    }

    fn wait(&self, sources: &[PollSource]) {
        let mut sel = Select::new();
        for source in sources {
            match source {
                PollSource::Main => self.commands.register(&mut sel),
                PollSource::Input(queue) => queue.register(&mut sel),
                PollSource::Sensor(_, queue) => queue.register(&mut sel),
            };
        }
        if sel.ready_timeout(self.looper.config.poll_timeout).is_err() {
            log::trace!("poll timed out");
        }
    }

    fn process_commands(&mut self) {
        while let Some(cmd) = self.commands.try_recv() {
            self.process_command(cmd);
            if self.is_destroyed() {
                return;
            }
        }
        for cmd in self.rendezvous.take_undelivered() {
            log::debug!("replaying undelivered {cmd}");
            self.process_command(cmd);
            if self.is_destroyed() {
                return;
            }
        }
    }

    fn process_input(&mut self, queue: &InputQueue) {
        loop {
            // The host may have swapped queues earlier in this pass.
            if !self.looper.input_live || self.looper.input.as_ref() != Some(queue) {
                return;
            }
            match queue.try_recv() {
                Ok(event) => {
                    let handled = self.handler.on_input(&mut self.looper, event);
                    log::trace!("input event handled={handled}");
                }
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("{} disconnected, no longer polling it", SourceId::INPUT);
                    self.looper.input_live = false;
                    return;
                }
            }
        }
    }

    fn process_sensor(&mut self, id: SourceId, queue: &SensorQueue) {
        loop {
            if !self.looper.has_sensor_queue(id) {
                return;
            }
            match queue.try_recv() {
                Ok(event) => self.handler.on_sensor(&mut self.looper, id, event),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("{id} disconnected, detaching it");
                    self.looper.detach_sensor_queue(id);
                    return;
                }
            }
        }
    }

    /// Apply one command.
    pub(crate) fn process_command(&mut self, cmd: Command) {
        log::trace!("processing {cmd}");
        match cmd {
            Command::Redraw => {
                self.looper.flags.insert(LoopFlags::REDRAW);
            }
            Command::TimerDue => {
                let now = self.looper.now_ns();
                let fired = self.looper.timers.fire_due(now);
                log::trace!("{fired} timers fired at {now}ns");
            }
            Command::Quit => {
                self.looper.host.finish();
                self.handler.on_command(&mut self.looper, cmd);
            }
            Command::WindowInit => self.attach_window(),
            Command::WindowTerm => self.detach_window(),
            Command::InputChanged => self.change_input(),
            Command::ContentRectChanged => {
                let rect = self.rendezvous.pending(SharedState::content_rect);
                self.looper.content_rect = rect;
                self.rendezvous.settle(SharedState::content_rect, rect);
                self.handler.on_command(&mut self.looper, cmd);
            }
            Command::RedrawNeeded => {
                self.looper.flags.insert(LoopFlags::REDRAW);
                self.handler.on_command(&mut self.looper, cmd);
            }
            Command::GainedFocus => {
                self.looper.flags.insert(LoopFlags::FOCUSED);
                self.handler.on_command(&mut self.looper, cmd);
            }
            Command::LostFocus => {
                self.looper.flags.remove(LoopFlags::FOCUSED);
                self.handler.on_command(&mut self.looper, cmd);
            }
            Command::WindowResized | Command::ConfigChanged | Command::LowMemory => {
                self.handler.on_command(&mut self.looper, cmd);
            }
            Command::SaveState => self.save_state(),
            Command::Destroy => self.destroy(),
            Command::Create
            | Command::Start
            | Command::Resume
            | Command::Pause
            | Command::Stop => self.change_activity(cmd),
        }
    }

    fn attach_window(&mut self) {
        let pending = self.rendezvous.pending(SharedState::window);
        if pending.is_none() {
            log::warn!("window-init with no pending window, ignored");
            return;
        }
        if self.rendezvous.current(SharedState::window) == pending {
            log::trace!("window-init already applied");
            return;
        }

        log::debug!("attaching {pending:?}");
        self.looper.window = pending;
        self.looper.flags.insert(LoopFlags::WINDOW | LoopFlags::REDRAW);
        self.handler.on_command(&mut self.looper, Command::WindowInit);
        self.rendezvous.settle(SharedState::window, pending);
    }

    fn detach_window(&mut self) {
        if self.rendezvous.pending(SharedState::window).is_some() {
            log::warn!("window-term while a window is pending, ignored");
            return;
        }
        if self.looper.window.is_none() {
            log::trace!("window-term already applied");
            self.rendezvous.settle(SharedState::window, None);
            return;
        }

        log::debug!("detaching {:?}", self.looper.window);
        // The handler tears down its surface while the window is still set.
        self.handler.on_command(&mut self.looper, Command::WindowTerm);
        self.looper.window = None;
        self.looper.flags.remove(LoopFlags::WINDOW);
        self.rendezvous.settle(SharedState::window, None);
    }

    fn change_input(&mut self) {
        let pending = self.rendezvous.pending(SharedState::input);
        if self.looper.input == pending {
            log::trace!("input-changed already applied");
            self.rendezvous.settle(SharedState::input, pending);
            return;
        }

        log::debug!(
            "input queue {}",
            if pending.is_some() { "attached" } else { "detached" }
        );
        self.looper.input_live = pending.is_some();
        self.looper.input = pending.clone();
        self.handler.on_command(&mut self.looper, Command::InputChanged);
        self.rendezvous.settle(SharedState::input, pending);
    }

    fn change_activity(&mut self, cmd: Command) {
        let pending = self.rendezvous.pending(SharedState::activity);
        if pending != ActivityState::from_command(cmd) {
            log::warn!("{cmd} does not match pending activity state {pending:?}, ignored");
            return;
        }
        if self.looper.activity == pending {
            log::trace!("{cmd} already applied");
            return;
        }

        log::debug!("activity {:?} -> {pending:?}", self.looper.activity);
        self.looper.activity = pending;
        self.handler.on_command(&mut self.looper, cmd);
        if cmd == Command::Resume && self.looper.saved_state.take().is_some() {
            log::debug!("released initial saved state");
        }
        self.rendezvous.settle(SharedState::activity, pending);
    }

    fn save_state(&mut self) {
        let serial = self.rendezvous.pending(SharedState::save);
        if self.rendezvous.current(SharedState::save) == serial {
            log::trace!("save-state already applied");
            return;
        }

        self.handler.on_command(&mut self.looper, Command::SaveState);
        let bytes = self.handler.on_save_state(&mut self.looper);
        log::debug!(
            "saved state #{serial}: {} bytes",
            bytes.as_ref().map_or(0, Vec::len)
        );
        self.rendezvous.settle_saved_state(serial, bytes);
    }

    fn destroy(&mut self) {
        if !self.rendezvous.is_destroy_requested() {
            log::warn!("destroy posted without a teardown request, ignored");
            return;
        }

        log::debug!("activity {:?} -> destroyed", self.looper.activity);
        self.looper.activity = Some(ActivityState::Destroyed);
        self.handler.on_command(&mut self.looper, Command::Destroy);
        self.looper.timers.set_running(false);
        self.looper.flags.remove(LoopFlags::RUNNING | LoopFlags::REDRAW);
        self.looper.flags.insert(LoopFlags::DESTROYED);
    }

    #[cfg(test)]
    pub(crate) fn looper(&self) -> &Looper {
        &self.looper
    }

    #[cfg(test)]
    pub(crate) fn looper_mut(&mut self) -> &mut Looper {
        &mut self.looper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{command_channel, CommandSender};
    use crate::clock::ManualClock;
    use crate::config::GlueConfig;
    use crate::glue::DetachedHost;
    use crate::input::{SensorEvent, SensorKind};
    use crate::looper::source::event_queue;
    use crate::looper::testing::{Recorder, Seen};
    use crate::timer::{Deadline, Timer};
    use crate::window::{NativeWindow, Rect};
    use crossbeam_channel::Receiver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Fixture {
        event_loop: EventLoop<Recorder>,
        commands: CommandSender,
        rendezvous: Arc<Rendezvous>,
        clock: ManualClock,
        host: Arc<DetachedHost>,
        deadline: Deadline,
        seen: Receiver<Seen>,
    }

    fn fixture_with(capacity: usize, recorder: Recorder, seen: Receiver<Seen>) -> Fixture {
        let config = GlueConfig {
            command_capacity: capacity,
            poll_timeout: Duration::from_millis(5),
            ..GlueConfig::default()
        };
        let (tx, rx) = command_channel(config.command_capacity);
        let clock = ManualClock::new();
        let host = Arc::new(DetachedHost::new());
        let deadline = Deadline::new(config.forever_ns());
        let rendezvous = Arc::new(Rendezvous::new());
        let looper = Looper::new(
            config,
            Arc::new(clock.clone()),
            tx.clone(),
            host.clone(),
            deadline.clone(),
            Some(b"initial".to_vec()),
        );
        let mut event_loop = EventLoop::new(looper, recorder, rx, rendezvous.clone());
        event_loop.start();
        Fixture {
            event_loop,
            commands: tx,
            rendezvous,
            clock,
            host,
            deadline,
            seen,
        }
    }

    fn fixture() -> Fixture {
        let (recorder, seen) = Recorder::new();
        fixture_with(64, recorder, seen)
    }

    impl Fixture {
        fn seen(&self) -> Vec<Seen> {
            self.seen.try_iter().collect()
        }

        fn activity(&mut self, state: ActivityState) {
            self.rendezvous
                .post(&self.commands, state.command(), SharedState::activity, Some(state));
            self.event_loop.poll_once();
        }
    }

    #[test]
    fn test_redraws_coalesce() {
        let mut f = fixture();
        for _ in 0..5 {
            f.commands.send(Command::Redraw);
        }
        f.commands.send(Command::RedrawNeeded);
        f.event_loop.poll_once();

        let redraws = f.seen().iter().filter(|s| **s == Seen::Redraw).count();
        assert_eq!(redraws, 1);

        // Nothing pending: the next pass only idles.
        f.event_loop.poll_once();
        assert!(!f.seen().contains(&Seen::Redraw));
    }

    #[test]
    fn test_window_attach_and_detach() {
        let mut f = fixture();
        let window = NativeWindow::from_raw(0x1000);

        f.rendezvous
            .post(&f.commands, Command::WindowInit, SharedState::window, window);
        f.event_loop.poll_once();
        assert_eq!(f.event_loop.looper().window(), window);
        assert_eq!(f.rendezvous.current(SharedState::window), window);
        assert!(f.event_loop.looper().flags().contains(LoopFlags::WINDOW));
        let seen = f.seen();
        assert!(seen.contains(&Seen::Window(Command::WindowInit, window)));
        // A new surface gets painted.
        assert!(seen.contains(&Seen::Redraw));

        f.rendezvous
            .post(&f.commands, Command::WindowTerm, SharedState::window, None);
        f.event_loop.poll_once();
        assert_eq!(f.event_loop.looper().window(), None);
        assert_eq!(f.rendezvous.current(SharedState::window), None);
        // The handler saw the old window during teardown.
        assert!(f.seen().contains(&Seen::Window(Command::WindowTerm, window)));
    }

    #[test]
    fn test_stray_commands_ignored() {
        let mut f = fixture();
        f.commands.send(Command::WindowInit);
        f.commands.send(Command::Resume);
        f.commands.send(Command::Destroy);
        f.event_loop.poll_once();

        let seen = f.seen();
        assert!(!seen.iter().any(|s| matches!(s, Seen::Command(_) | Seen::Window(..))));
        assert_eq!(f.event_loop.looper().window(), None);
        assert!(f.event_loop.looper().is_running());
    }

    #[test]
    fn test_activity_transitions_and_saved_state_release() {
        let mut f = fixture();
        f.activity(ActivityState::Created);
        f.activity(ActivityState::Started);
        assert_eq!(f.event_loop.looper().saved_state(), Some(&b"initial"[..]));

        f.activity(ActivityState::Resumed);
        assert_eq!(
            f.event_loop.looper().activity_state(),
            Some(ActivityState::Resumed)
        );
        assert_eq!(f.event_loop.looper().saved_state(), None);
        assert_eq!(
            f.rendezvous.current(SharedState::activity),
            Some(ActivityState::Resumed)
        );

        let commands: Vec<_> = f
            .seen()
            .into_iter()
            .filter_map(|s| match s {
                Seen::Command(cmd) => Some(cmd),
                _ => None,
            })
            .collect();
        assert_eq!(commands, vec![Command::Create, Command::Start, Command::Resume]);
    }

    #[test]
    fn test_save_state_publishes_bytes() {
        let (recorder, seen) = Recorder::new();
        let mut f = fixture_with(64, recorder.saving(b"state".to_vec()), seen);

        f.rendezvous.post(&f.commands, Command::SaveState, SharedState::save, 1);
        f.event_loop.poll_once();
        assert_eq!(f.rendezvous.current(SharedState::save), 1);
        assert_eq!(f.rendezvous.take_saved_state(), Some(b"state".to_vec()));
    }

    #[test]
    fn test_content_rect_and_focus() {
        let mut f = fixture();
        let rect = Rect::new(0, 24, 1080, 1896);
        f.rendezvous
            .post(&f.commands, Command::ContentRectChanged, SharedState::content_rect, rect);
        f.commands.send(Command::GainedFocus);
        f.event_loop.poll_once();

        assert_eq!(f.event_loop.looper().content_rect(), rect);
        assert_eq!(f.rendezvous.current(SharedState::content_rect), rect);
        assert!(f.event_loop.looper().has_focus());

        f.commands.send(Command::LostFocus);
        f.event_loop.poll_once();
        assert!(!f.event_loop.looper().has_focus());
    }

    #[test]
    fn test_ten_ms_timer_fires_twice_in_twenty_five_ms() {
        let mut f = fixture();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        f.event_loop
            .looper_mut()
            .add_timer(Timer::from_nanos(10_000_000, move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert_eq!(f.deadline.current_ns(), 10_000_000);

        // First observation arms.
        f.commands.send(Command::TimerDue);
        f.event_loop.poll_once();

        for step in [10, 10, 5] {
            f.clock.advance(Duration::from_millis(step));
            f.commands.send(Command::TimerDue);
            f.event_loop.poll_once();
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_timer_removed_before_due_never_fires() {
        let mut f = fixture();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = f
            .event_loop
            .looper_mut()
            .add_timer(Timer::from_nanos(1_000_000, move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        f.commands.send(Command::TimerDue);
        f.event_loop.poll_once();

        // TimerDue already queued when the timer goes away.
        f.clock.advance(Duration::from_millis(5));
        f.commands.send(Command::TimerDue);
        f.event_loop.looper_mut().remove_timer(id);
        f.event_loop.poll_once();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_quit_asks_host_to_finish() {
        let mut f = fixture();
        f.commands.send(Command::Quit);
        f.event_loop.poll_once();
        assert_eq!(f.host.finish_requests(), 1);
        assert!(f.event_loop.looper().is_running());
        assert!(f.seen().contains(&Seen::Command(Command::Quit)));
    }

    #[test]
    fn test_undelivered_commands_replayed() {
        let (recorder, seen) = Recorder::new();
        let mut f = fixture_with(1, recorder, seen);
        f.commands.send(Command::LowMemory);

        let window = NativeWindow::from_raw(0x2000);
        f.rendezvous
            .post(&f.commands, Command::WindowInit, SharedState::window, window);
        f.event_loop.poll_once();

        assert_eq!(f.rendezvous.current(SharedState::window), window);
        let seen = f.seen();
        let low = seen.iter().position(|s| *s == Seen::Command(Command::LowMemory));
        let init = seen
            .iter()
            .position(|s| *s == Seen::Window(Command::WindowInit, window));
        assert!(low.unwrap() < init.unwrap());
    }

    #[test]
    fn test_destroy_stops_iteration() {
        let mut f = fixture();
        f.activity(ActivityState::Created);
        f.event_loop
            .looper_mut()
            .add_timer(Timer::from_nanos(1_000_000, |_, _| {}))
            .unwrap();
        assert_eq!(f.deadline.current_ns(), 1_000_000);

        let rendezvous = f.rendezvous.clone();
        let commands = f.commands.clone();
        let waiter = std::thread::spawn(move || rendezvous.request_destroy(&commands));
        while !f.rendezvous.is_destroy_requested() {
            std::thread::yield_now();
        }
        // Queued behind Destroy; never processed.
        f.commands.send(Command::Redraw);
        f.event_loop.poll_once();

        let looper = f.event_loop.looper();
        assert!(looper.flags().contains(LoopFlags::DESTROYED));
        assert!(!looper.is_running());
        assert_eq!(looper.activity_state(), Some(ActivityState::Destroyed));
        assert_eq!(f.deadline.current_ns(), looper.config().forever_ns());
        let seen = f.seen();
        assert!(seen.contains(&Seen::Command(Command::Destroy)));
        assert!(!seen.contains(&Seen::Redraw));

        // The thread wrapper marks the rendezvous destroyed on exit.
        f.rendezvous.mark_destroyed();
        waiter.join().unwrap();
    }

    #[test]
    fn test_input_and_sensor_sources() {
        let mut f = fixture();
        let (input_tx, input) = event_queue(8);
        f.rendezvous
            .post(&f.commands, Command::InputChanged, SharedState::input, Some(input.clone()));
        f.event_loop.poll_once();
        assert_eq!(f.event_loop.looper().input_queue(), Some(&input));

        let (sensor_tx, sensor) = event_queue(8);
        let id = f.event_loop.looper_mut().attach_sensor_queue(sensor);

        let key = crate::input::InputEvent::Key {
            action: crate::input::KeyAction::Down,
            code: crate::input::KeyCode::Enter,
            meta: crate::input::MetaState::empty(),
            repeat: 0,
        };
        let reading = SensorEvent {
            kind: SensorKind::Accelerometer,
            timestamp_ns: 42,
            values: [0.0, 9.8, 0.0],
        };
        assert!(input_tx.push(key.clone()));
        assert!(sensor_tx.push(reading));
        f.event_loop.poll_once();

        let seen = f.seen();
        assert!(seen.contains(&Seen::Input(key)));
        assert!(seen.contains(&Seen::Sensor(id, reading)));

        // Dead producers are dropped from the poll set.
        drop(sensor_tx);
        drop(input_tx);
        f.event_loop.poll_once();
        assert!(!f.event_loop.looper().has_sensor_queue(id));
        assert_eq!(f.event_loop.looper().poll_sources().len(), 1);
        // The host still owns the attachment until it detaches the queue.
        assert!(f.event_loop.looper().input_queue().is_some());
    }
}
