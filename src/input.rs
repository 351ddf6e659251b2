//! Input: Event types delivered through input and sensor sources.
//!
//! These are the payloads of the event-loop sources other than the
//! command channel. The host pushes them from its own thread; the event
//! loop drains them and hands them to the application handler.

use bitflags::bitflags;

/// Key codes for keyboard input.
///
/// A small subset of what hosts report, enough for navigation and text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A printable character.
    Char(char),
    /// Back navigation key.
    Back,
    /// Menu key.
    Menu,
    /// Backspace key.
    Backspace,
    /// Enter/Return key.
    Enter,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Tab key.
    Tab,
    /// Escape key.
    Esc,
    /// Volume up.
    VolumeUp,
    /// Volume down.
    VolumeDown,
    /// Any key without a dedicated variant.
    Other(u32),
}

bitflags! {
    /// Modifier keys held during an input event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MetaState: u32 {
        /// Shift held.
        const SHIFT = 0b0000_0001;
        /// Alt/Option held.
        const ALT = 0b0000_0010;
        /// Control held.
        const CTRL = 0b0000_0100;
        /// Meta/Super held.
        const META = 0b0000_1000;
        /// Caps lock on.
        const CAPS_LOCK = 0b0001_0000;
    }
}

/// Key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Key went down.
    Down,
    /// Key went up.
    Up,
}

/// Pointer transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionAction {
    /// First pointer touched down.
    Down,
    /// A pointer moved.
    Move,
    /// Last pointer lifted.
    Up,
    /// The gesture was aborted by the host.
    Cancel,
}

/// Events from the host input queue.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A key changed state.
    Key {
        /// Down or up.
        action: KeyAction,
        /// The key code.
        code: KeyCode,
        /// Modifiers held during the keypress.
        meta: MetaState,
        /// Auto-repeat count (0 for the initial press).
        repeat: u32,
    },

    /// A touch or pointer moved.
    Motion {
        /// What happened.
        action: MotionAction,
        /// Host pointer id.
        pointer_id: u32,
        /// X in window pixels.
        x: f32,
        /// Y in window pixels.
        y: f32,
        /// Modifiers held during the gesture.
        meta: MetaState,
    },
}

impl InputEvent {
    /// Modifiers held during this event.
    pub const fn meta(&self) -> MetaState {
        match self {
            Self::Key { meta, .. } | Self::Motion { meta, .. } => *meta,
        }
    }
}

/// Sensor kinds a sensor source may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// Acceleration in m/s², including gravity.
    Accelerometer,
    /// Rotation rate in rad/s.
    Gyroscope,
    /// Ambient light in lux (first value only).
    Light,
    /// Magnetic field in µT.
    MagneticField,
}

/// One sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorEvent {
    /// Which sensor produced it.
    pub kind: SensorKind,
    /// Host timestamp in nanoseconds.
    pub timestamp_ns: u64,
    /// Axis values; unused axes are zero.
    pub values: [f32; 3],
}
