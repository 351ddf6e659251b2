//! A recording handler shared by the event-loop and glue tests.

use super::handler::Handler;
use super::looper::Looper;
use super::source::SourceId;
use crate::command::Command;
use crate::input::{InputEvent, SensorEvent};
use crate::window::NativeWindow;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::time::{Duration, Instant};

/// What the handler observed, in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Seen {
    Command(Command),
    /// `WindowInit`/`WindowTerm` with the window visible at that moment.
    Window(Command, Option<NativeWindow>),
    Input(InputEvent),
    Sensor(SourceId, SensorEvent),
    Saved,
    Redraw,
}

pub(crate) type Hook = Box<dyn FnMut(&mut Looper, Command) + Send>;

/// Forwards every callback to a channel, optionally running a hook first.
pub(crate) struct Recorder {
    seen: Sender<Seen>,
    hook: Option<Hook>,
    save: Option<Vec<u8>>,
}

impl Recorder {
    pub(crate) fn new() -> (Self, Receiver<Seen>) {
        let (seen, rx) = unbounded();
        (
            Self {
                seen,
                hook: None,
                save: None,
            },
            rx,
        )
    }

    /// Run `hook` on the event-loop thread for every command, before the
    /// command is recorded.
    pub(crate) fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut Looper, Command) + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Answer save-state requests with `bytes`.
    pub(crate) fn saving(mut self, bytes: Vec<u8>) -> Self {
        self.save = Some(bytes);
        self
    }

    fn record(&self, seen: Seen) {
        let _ = self.seen.send(seen);
    }
}

impl Handler for Recorder {
    fn on_command(&mut self, looper: &mut Looper, cmd: Command) {
        if let Some(hook) = self.hook.as_mut() {
            hook(looper, cmd);
        }
        match cmd {
            Command::WindowInit | Command::WindowTerm => {
                self.record(Seen::Window(cmd, looper.window()));
            }
            _ => self.record(Seen::Command(cmd)),
        }
    }

    fn on_input(&mut self, _looper: &mut Looper, event: InputEvent) -> bool {
        self.record(Seen::Input(event));
        true
    }

    fn on_sensor(&mut self, _looper: &mut Looper, source: SourceId, event: SensorEvent) {
        self.record(Seen::Sensor(source, event));
    }

    fn on_save_state(&mut self, _looper: &mut Looper) -> Option<Vec<u8>> {
        self.record(Seen::Saved);
        self.save.clone()
    }

    fn on_redraw(&mut self, _looper: &mut Looper) {
        self.record(Seen::Redraw);
    }
}

/// Wait up to two seconds for an observation matching `pred`.
pub(crate) fn wait_for<F: Fn(&Seen) -> bool>(seen: &Receiver<Seen>, pred: F) -> Option<Seen> {
    let deadline = Instant::now() + Duration::from_secs(2);
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match seen.recv_timeout(left) {
            Ok(s) if pred(&s) => return Some(s),
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    None
}
