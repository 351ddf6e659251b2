//! Poll sources: The wakeable origins the event loop waits on.
//!
//! Besides the command channel, the event loop polls the host input queue
//! and any sensor queues the application attached. Each origin is an
//! [`EventQueue`]: the host (or a sensor driver) keeps the
//! [`EventSender`] half, the event loop drains the queue half.

use crate::input::{InputEvent, SensorEvent};
use crossbeam_channel::{bounded, Receiver, Select, Sender, TryRecvError, TrySendError};
use std::fmt;

/// Identifies a poll source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u32);

impl SourceId {
    /// The command channel.
    pub const MAIN: Self = Self(1);
    /// The host input queue.
    pub const INPUT: Self = Self(2);
    /// First id handed to application-attached sources.
    pub const FIRST_USER: Self = Self(3);

    /// Raw id.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The id after this one.
    #[inline]
    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::MAIN => f.write_str("source:main"),
            Self::INPUT => f.write_str("source:input"),
            Self(id) => write!(f, "source:user{id}"),
        }
    }
}

/// Create an event queue holding at most `capacity` undelivered events.
pub fn event_queue<T>(capacity: usize) -> (EventSender<T>, EventQueue<T>) {
    let (tx, rx) = bounded(capacity);
    (EventSender { tx }, EventQueue { rx })
}

/// Producer half of an event queue.
#[derive(Debug)]
pub struct EventSender<T> {
    tx: Sender<T>,
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> EventSender<T> {
    /// Push an event without blocking.
    ///
    /// Returns `false` when the queue is full or the event loop stopped
    /// polling it; the event is dropped.
    pub fn push(&self, event: T) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("event queue full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Consumer half of an event queue.
///
/// Cloning yields another handle to the same queue; two handles compare
/// equal when they refer to the same queue.
#[derive(Debug)]
pub struct EventQueue<T> {
    rx: Receiver<T>,
}

impl<T> Clone for EventQueue<T> {
    fn clone(&self) -> Self {
        Self { rx: self.rx.clone() }
    }
}

impl<T> PartialEq for EventQueue<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rx.same_channel(&other.rx)
    }
}

impl<T> Eq for EventQueue<T> {}

impl<T> EventQueue<T> {
    /// Take the next event, if any.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.rx.try_recv()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Register this queue with a multiplexed wait.
    pub fn register<'a>(&'a self, sel: &mut Select<'a>) -> usize {
        sel.recv(&self.rx)
    }
}

/// The host input queue.
pub type InputQueue = EventQueue<InputEvent>;

/// A sensor event queue.
pub type SensorQueue = EventQueue<SensorEvent>;

/// One entry of the event loop's dispatch table.
#[derive(Debug, Clone)]
pub(crate) enum PollSource {
    /// The command channel.
    Main,
    /// The attached input queue.
    Input(InputQueue),
    /// An application-attached sensor queue.
    Sensor(SourceId, SensorQueue),
}

impl PollSource {
    pub(crate) const fn id(&self) -> SourceId {
        match self {
            Self::Main => SourceId::MAIN,
            Self::Input(_) => SourceId::INPUT,
            Self::Sensor(id, _) => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::SensorKind;

    fn reading(ts: u64) -> SensorEvent {
        SensorEvent {
            kind: SensorKind::Light,
            timestamp_ns: ts,
            values: [100.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_queue_identity() {
        let (_tx_a, a) = event_queue::<SensorEvent>(4);
        let (_tx_b, b) = event_queue::<SensorEvent>(4);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_push_and_drain() {
        let (tx, queue) = event_queue(2);
        assert!(tx.push(reading(1)));
        assert!(tx.push(reading(2)));
        assert!(!tx.push(reading(3)));

        assert_eq!(queue.try_recv().unwrap().timestamp_ns, 1);
        assert_eq!(queue.try_recv().unwrap().timestamp_ns, 2);
        assert_eq!(queue.try_recv(), Err(TryRecvError::Empty));

        drop(tx);
        assert_eq!(queue.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn test_source_ids() {
        assert_eq!(SourceId::MAIN.get(), 1);
        assert_eq!(SourceId::INPUT.get(), 2);
        assert_eq!(SourceId::FIRST_USER.next().get(), 4);
        assert_eq!(SourceId::FIRST_USER.to_string(), "source:user3");
        assert_eq!(PollSource::Main.id(), SourceId::MAIN);
    }
}
