//! Command: The one-byte opcodes posted into the command channel.
//!
//! A command carries no payload. Anything associated with it (a window
//! handle, a rectangle) travels through the matching `pending` field of the
//! shared rendezvous state, written before the command is enqueued and read
//! back by the event loop after it is dequeued.

use std::fmt;

/// What happened, as seen by the event loop.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// The application asked for a redraw.
    Redraw = 0,
    /// The timer thread's deadline elapsed or changed.
    TimerDue = 1,
    /// The application asked the host to finish the activity.
    Quit = 2,
    /// A new window surface is pending attachment.
    WindowInit = 3,
    /// The current window surface is about to go away.
    WindowTerm = 4,
    /// The window surface changed size.
    WindowResized = 5,
    /// The host needs the window contents redrawn.
    RedrawNeeded = 6,
    /// The input queue was attached or detached.
    InputChanged = 7,
    /// The visible content area changed.
    ContentRectChanged = 8,
    /// The activity window gained input focus.
    GainedFocus = 9,
    /// The activity window lost input focus.
    LostFocus = 10,
    /// The device configuration changed.
    ConfigChanged = 11,
    /// The system is running low on memory.
    LowMemory = 12,
    /// The activity was created; first command the event loop sees.
    Create = 13,
    /// The activity was started.
    Start = 14,
    /// The activity was resumed.
    Resume = 15,
    /// The host wants the application state captured.
    SaveState = 16,
    /// The activity was paused.
    Pause = 17,
    /// The activity was stopped.
    Stop = 18,
    /// The activity is being destroyed; last command the event loop sees.
    Destroy = 19,
}

impl Command {
    /// Every command, in opcode order.
    pub const ALL: [Self; 20] = [
        Self::Redraw,
        Self::TimerDue,
        Self::Quit,
        Self::WindowInit,
        Self::WindowTerm,
        Self::WindowResized,
        Self::RedrawNeeded,
        Self::InputChanged,
        Self::ContentRectChanged,
        Self::GainedFocus,
        Self::LostFocus,
        Self::ConfigChanged,
        Self::LowMemory,
        Self::Create,
        Self::Start,
        Self::Resume,
        Self::SaveState,
        Self::Pause,
        Self::Stop,
        Self::Destroy,
    ];

    /// The wire byte for this command.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a wire byte.
    #[inline]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        if (byte as usize) < Self::ALL.len() {
            Some(Self::ALL[byte as usize])
        } else {
            None
        }
    }

    /// Whether the host thread blocks on a rendezvous for this command.
    pub const fn is_rendezvous(self) -> bool {
        matches!(
            self,
            Self::WindowInit
                | Self::WindowTerm
                | Self::InputChanged
                | Self::Create
                | Self::Start
                | Self::Resume
                | Self::SaveState
                | Self::Pause
                | Self::Stop
                | Self::Destroy
        )
    }

    /// Short name for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redraw => "redraw",
            Self::TimerDue => "timer-due",
            Self::Quit => "quit",
            Self::WindowInit => "window-init",
            Self::WindowTerm => "window-term",
            Self::WindowResized => "window-resized",
            Self::RedrawNeeded => "redraw-needed",
            Self::InputChanged => "input-changed",
            Self::ContentRectChanged => "content-rect-changed",
            Self::GainedFocus => "gained-focus",
            Self::LostFocus => "lost-focus",
            Self::ConfigChanged => "config-changed",
            Self::LowMemory => "low-memory",
            Self::Create => "create",
            Self::Start => "start",
            Self::Resume => "resume",
            Self::SaveState => "save-state",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Destroy => "destroy",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_u8(byte).ok_or(byte)
    }
}

impl From<Command> for u8 {
    #[inline]
    fn from(cmd: Command) -> Self {
        cmd.as_u8()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
