//! Coarse activity lifecycle states.

use crate::command::Command;
use std::fmt;

/// Coarse activity state as reported by the host.
///
/// ```text
/// Created → Started → Resumed ⇄ Paused → Stopped → Destroyed
///              ↑                            │
///              └────────────────────────────┘
/// ```
///
/// `Destroyed` is reachable from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityState {
    /// The event loop is up; nothing is visible yet.
    Created,
    /// Visible but not in the foreground.
    Started,
    /// In the foreground, receiving input.
    Resumed,
    /// Partially obscured.
    Paused,
    /// No longer visible.
    Stopped,
    /// Torn down.
    Destroyed,
}

impl ActivityState {
    /// Whether the host may move from `self` to `next`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created | Self::Stopped, Self::Started)
                | (Self::Started | Self::Paused, Self::Resumed)
                | (Self::Resumed, Self::Paused)
                | (Self::Started | Self::Paused, Self::Stopped)
                | (_, Self::Destroyed)
        )
    }

    /// The state a lifecycle command moves to.
    pub const fn from_command(cmd: Command) -> Option<Self> {
        match cmd {
            Command::Create => Some(Self::Created),
            Command::Start => Some(Self::Started),
            Command::Resume => Some(Self::Resumed),
            Command::Pause => Some(Self::Paused),
            Command::Stop => Some(Self::Stopped),
            Command::Destroy => Some(Self::Destroyed),
            _ => None,
        }
    }

    /// The command that announces this state.
    pub const fn command(self) -> Command {
        match self {
            Self::Created => Command::Create,
            Self::Started => Command::Start,
            Self::Resumed => Command::Resume,
            Self::Paused => Command::Pause,
            Self::Stopped => Command::Stop,
            Self::Destroyed => Command::Destroy,
        }
    }

    /// Whether the activity is visible to the user.
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Started | Self::Resumed | Self::Paused)
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Resumed => "resumed",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}
