//! Glue: Host callbacks in, rendezvous out.
//!
//! A [`Glue`] owns the event-loop thread and the timer thread. Its
//! methods are the host's notification callbacks and may be called from
//! any thread, one at a time.

use super::activity::ActivityState;
use super::converge::{DestroyGuard, Rendezvous, SharedState};
use super::host::{DetachedHost, Host};
use crate::channel::{command_channel, CommandSender};
use crate::clock::{Clock, MonotonicClock};
use crate::command::Command;
use crate::config::GlueConfig;
use crate::error::{GlueError, Result};
use crate::looper::{EventLoop, Handler, InputQueue, Looper, LooperProxy};
use crate::timer::{Deadline, TimerThread};
use crate::window::{NativeWindow, Rect};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Assembles a [`Glue`].
pub struct GlueBuilder {
    config: GlueConfig,
    clock: Option<Arc<dyn Clock>>,
    host: Option<Arc<dyn Host>>,
    saved_state: Option<Vec<u8>>,
}

impl GlueBuilder {
    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: GlueConfig) -> Self {
        self.config = config;
        self
    }

    /// Time source for the event loop. Defaults to [`MonotonicClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Platform services. Defaults to [`DetachedHost`].
    #[must_use]
    pub fn host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    /// State saved by a previous instance of the activity.
    #[must_use]
    pub fn saved_state(mut self, bytes: Vec<u8>) -> Self {
        self.saved_state = Some(bytes);
        self
    }

    /// Start the timer thread and the event loop, and wait until the loop
    /// has processed `Create`.
    pub fn spawn<H: Handler>(self, handler: H) -> Result<Glue> {
        let Self {
            config,
            clock,
            host,
            saved_state,
        } = self;
        let clock = clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let host = host.unwrap_or_else(|| Arc::new(DetachedHost::new()));

        let (commands, receiver) = command_channel(config.command_capacity);
        let rendezvous = Arc::new(Rendezvous::new());
        let deadline = Deadline::new(config.forever_ns());
        let timer = TimerThread::spawn(deadline.clone(), commands.clone(), &config.timer_thread_name)?;

        let name = config.looper_thread_name.clone();
        let looper = Looper::new(config, clock, commands.clone(), host, deadline, saved_state);
        let event_loop = EventLoop::new(looper, handler, receiver, rendezvous.clone());
        let shared = rendezvous.clone();
        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            let _guard = DestroyGuard(&shared);
            event_loop.run()
        });
        let looper = match spawned {
            Ok(handle) => handle,
            Err(source) => {
                timer.join();
                return Err(GlueError::Spawn {
                    thread: name,
                    source,
                });
            }
        };
        log::info!("event loop {name} started");

        let glue = Glue {
            commands,
            rendezvous,
            threads: Mutex::new(Some(Threads { looper, timer })),
        };
        let created = glue.rendezvous.request(
            &glue.commands,
            Command::Create,
            SharedState::activity,
            Some(ActivityState::Created),
        );
        if let Err(err) = created {
            log::error!("event loop died before create: {err}");
            return Err(match glue.destroy() {
                Err(GlueError::EventLoopPanicked) => GlueError::EventLoopPanicked,
                _ => err,
            });
        }
        Ok(glue)
    }
}

impl fmt::Debug for GlueBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlueBuilder")
            .field("config", &self.config)
            .field("saved_state", &self.saved_state.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

struct Threads {
    looper: JoinHandle<i32>,
    timer: TimerThread,
}

/// The host's handle to a running event loop.
pub struct Glue {
    commands: CommandSender,
    rendezvous: Arc<Rendezvous>,
    threads: Mutex<Option<Threads>>,
}

impl Glue {
    /// Start assembling a glue.
    pub fn builder() -> GlueBuilder {
        GlueBuilder {
            config: GlueConfig::default(),
            clock: None,
            host: None,
            saved_state: None,
        }
    }

    /// Spawn with default settings.
    pub fn spawn<H: Handler>(handler: H) -> Result<Self> {
        Self::builder().spawn(handler)
    }

    /// The activity became visible.
    ///
    /// # Panics
    ///
    /// Panics if the activity cannot move to `Started` from its current
    /// state.
    pub fn on_start(&self) -> Result<()> {
        self.set_activity_state(ActivityState::Started)
    }

    /// The activity moved to the foreground.
    ///
    /// # Panics
    ///
    /// Panics on an invalid transition, as [`Self::on_start`].
    pub fn on_resume(&self) -> Result<()> {
        self.set_activity_state(ActivityState::Resumed)
    }

    /// The activity left the foreground.
    ///
    /// # Panics
    ///
    /// Panics on an invalid transition, as [`Self::on_start`].
    pub fn on_pause(&self) -> Result<()> {
        self.set_activity_state(ActivityState::Paused)
    }

    /// The activity is no longer visible.
    ///
    /// # Panics
    ///
    /// Panics on an invalid transition, as [`Self::on_start`].
    pub fn on_stop(&self) -> Result<()> {
        self.set_activity_state(ActivityState::Stopped)
    }

    fn set_activity_state(&self, next: ActivityState) -> Result<()> {
        if self.rendezvous.is_destroyed() {
            return Err(GlueError::Destroyed);
        }
        if let Some(current) = self.rendezvous.current(SharedState::activity) {
            assert!(
                current.can_transition_to(next),
                "invalid activity transition {current} -> {next}"
            );
        }
        log::debug!("host: {next}");
        self.rendezvous.request(
            &self.commands,
            next.command(),
            SharedState::activity,
            Some(next),
        )
    }

    /// Ask the application for its state and wait for the bytes.
    pub fn on_save_instance_state(&self) -> Result<Option<Vec<u8>>> {
        let serial = self.rendezvous.current(SharedState::save) + 1;
        log::debug!("host: save state #{serial}");
        self.rendezvous
            .request(&self.commands, Command::SaveState, SharedState::save, serial)?;
        Ok(self.rendezvous.take_saved_state())
    }

    /// A window surface was created. Returns once the event loop has
    /// attached it; a previously attached window is detached first.
    pub fn on_window_created(&self, window: NativeWindow) -> Result<()> {
        if self.rendezvous.current(SharedState::window).is_some() {
            self.on_window_destroyed()?;
        }
        log::debug!("host: window created {window:?}");
        self.rendezvous.request(
            &self.commands,
            Command::WindowInit,
            SharedState::window,
            Some(window),
        )
    }

    /// The window surface is going away. Returns once the event loop has
    /// stopped using it; the host may free it afterwards.
    pub fn on_window_destroyed(&self) -> Result<()> {
        log::debug!("host: window destroyed");
        self.rendezvous
            .request(&self.commands, Command::WindowTerm, SharedState::window, None)
    }

    /// The window surface changed size.
    pub fn on_window_resized(&self) {
        self.rendezvous.notify(&self.commands, Command::WindowResized);
    }

    /// The host needs the window repainted.
    pub fn on_window_redraw_needed(&self) {
        self.rendezvous.notify(&self.commands, Command::RedrawNeeded);
    }

    /// An input queue was created. Returns once the event loop polls it.
    pub fn on_input_queue_created(&self, queue: InputQueue) -> Result<()> {
        log::debug!("host: input queue created");
        self.rendezvous.request(
            &self.commands,
            Command::InputChanged,
            SharedState::input,
            Some(queue),
        )
    }

    /// The input queue is going away. Returns once the event loop has
    /// stopped polling it.
    pub fn on_input_queue_destroyed(&self) -> Result<()> {
        log::debug!("host: input queue destroyed");
        self.rendezvous
            .request(&self.commands, Command::InputChanged, SharedState::input, None)
    }

    /// The visible content area changed.
    pub fn on_content_rect_changed(&self, rect: Rect) {
        self.rendezvous.post(
            &self.commands,
            Command::ContentRectChanged,
            SharedState::content_rect,
            rect,
        );
    }

    /// The window gained or lost input focus.
    pub fn on_window_focus_changed(&self, focused: bool) {
        let cmd = if focused {
            Command::GainedFocus
        } else {
            Command::LostFocus
        };
        self.rendezvous.notify(&self.commands, cmd);
    }

    /// The device configuration changed.
    pub fn on_configuration_changed(&self) {
        self.rendezvous.notify(&self.commands, Command::ConfigChanged);
    }

    /// The system is low on memory.
    pub fn on_low_memory(&self) {
        self.rendezvous.notify(&self.commands, Command::LowMemory);
    }

    /// A handle for posting to the event loop from other threads.
    pub fn proxy(&self) -> LooperProxy {
        LooperProxy::from(self.commands.clone())
    }

    /// Tear everything down and return the loop's exit code.
    ///
    /// Stops the timer thread, posts `Destroy` (everything queued before
    /// it is still processed), waits for the event loop to exit and joins
    /// both threads. Any rendezvous still pending is released with
    /// [`GlueError::Destroyed`].
    ///
    /// Returns `Err(Destroyed)` if already torn down and
    /// `Err(EventLoopPanicked)` if the event loop unwound.
    pub fn destroy(&self) -> Result<i32> {
        let Some(threads) = self.threads.lock().take() else {
            return Err(GlueError::Destroyed);
        };
        log::info!("tearing down event loop");

        threads.timer.shutdown();
        self.rendezvous.request_destroy(&self.commands);
        let code = threads.looper.join().map_err(|_| {
            log::error!("event loop thread panicked");
            GlueError::EventLoopPanicked
        });
        threads.timer.join();

        log::info!("event loop torn down");
        code
    }
}

impl Drop for Glue {
    fn drop(&mut self) {
        match self.destroy() {
            Ok(_) | Err(GlueError::Destroyed) => {}
            Err(err) => log::error!("teardown on drop: {err}"),
        }
    }
}

impl fmt::Debug for Glue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Glue")
            .field("destroyed", &self.rendezvous.is_destroyed())
            .finish_non_exhaustive()
    }
}
