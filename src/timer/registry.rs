//! Timer Registry: Bounded table of periodic callbacks.
//!
//! The registry is owned by the event-loop thread. It is a fixed-size
//! arena indexed by [`TimerId`]: `occupied[id]` says whether `slots[id]`
//! holds a live timer. Slot 0 is never used, so `TimerId::NONE` (0) is a
//! safe default for "no timer".
//!
//! # Firing
//!
//! One pass over every slot per [`Command::TimerDue`](crate::Command):
//!
//! - a timer whose `last_fired` is 0 is armed (`last_fired = now`) but not
//!   invoked; the first observation only starts its clock
//! - a timer with `now >= last_fired + period` is invoked, and afterwards
//!   stamped with `now` only if its slot still holds the same timer
//! - the smallest period among the remaining timers becomes the next
//!   published deadline (or "forever" if none remain or the loop is not
//!   running)
//!
//! The deadline is the minimum *period*, not the minimum absolute
//! deadline. This wakes the timer thread up to one period early after a
//! fire, but needs no per-timer state beyond `last_fired` and tolerates
//! callbacks adding and removing timers mid-pass.

use super::thread::Deadline;
use crate::error::{GlueError, Result};
use std::fmt;
use std::time::Duration;

/// Callback invoked when a timer is due.
///
/// It receives the registry so it can remove itself (or others) or add new
/// timers during the firing pass.
pub type TimerCallback = Box<dyn FnMut(&mut TimerRegistry, TimerId) + Send>;

/// Handle to a registered timer.
///
/// Valid handles are `1..capacity`; `0` is [`TimerId::NONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TimerId(u32);

impl TimerId {
    /// The "no timer" sentinel.
    pub const NONE: Self = Self(0);

    /// Raw slot index.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this is the sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// A periodic timer, ready to be registered.
pub struct Timer {
    period_ns: u64,
    callback: TimerCallback,
}

impl Timer {
    /// Create a timer firing every `period`.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn new<F>(period: Duration, callback: F) -> Self
    where
        F: FnMut(&mut TimerRegistry, TimerId) + Send + 'static,
    {
        Self::from_nanos(u64::try_from(period.as_nanos()).unwrap_or(u64::MAX), callback)
    }

    /// Create a timer with a period given in nanoseconds.
    ///
    /// # Panics
    ///
    /// Panics if `period_ns` is zero.
    pub fn from_nanos<F>(period_ns: u64, callback: F) -> Self
    where
        F: FnMut(&mut TimerRegistry, TimerId) + Send + 'static,
    {
        assert!(period_ns > 0, "timer period must be positive");
        Self {
            period_ns,
            callback: Box::new(callback),
        }
    }

    /// The period in nanoseconds.
    #[inline]
    pub const fn period_ns(&self) -> u64 {
        self.period_ns
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("period_ns", &self.period_ns)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Slot {
    period_ns: u64,
    /// 0 means never observed.
    last_fired: u64,
    /// Distinguishes successive occupants of the same slot.
    serial: u64,
    /// `None` while the callback is running.
    callback: Option<TimerCallback>,
}

/// The bounded timer table.
pub struct TimerRegistry {
    occupied: Vec<bool>,
    slots: Vec<Slot>,
    next_serial: u64,
    running: bool,
    forever_ns: u64,
    /// Last value handed to the timer thread.
    published_ns: u64,
    deadline: Deadline,
}

impl TimerRegistry {
    /// Create an empty table with `capacity` slots (slot 0 reserved).
    ///
    /// The registry starts not running, publishing `forever_ns`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`.
    pub fn new(capacity: usize, forever_ns: u64, deadline: Deadline) -> Self {
        assert!(capacity >= 2, "timer table needs at least one usable slot");
        assert!(
            u32::try_from(capacity).is_ok(),
            "timer table capacity exceeds id range"
        );
        let registry = Self {
            occupied: vec![false; capacity],
            slots: (0..capacity).map(|_| Slot::default()).collect(),
            next_serial: 1,
            running: false,
            forever_ns,
            published_ns: forever_ns,
            deadline,
        };
        registry.deadline.publish(forever_ns);
        registry
    }

    /// Table size, including the reserved slot.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of registered timers.
    pub fn len(&self) -> usize {
        self.occupied.iter().filter(|&&o| o).count()
    }

    /// Whether no timer is registered.
    pub fn is_empty(&self) -> bool {
        !self.occupied.iter().any(|&o| o)
    }

    /// Whether `id` refers to a registered timer.
    pub fn contains(&self, id: TimerId) -> bool {
        !id.is_none() && self.occupied.get(id.index()).copied().unwrap_or(false)
    }

    /// `last_fired` of a registered timer (0 = not yet armed).
    pub fn last_fired(&self, id: TimerId) -> Option<u64> {
        self.contains(id).then(|| self.slots[id.index()].last_fired)
    }

    /// Period of a registered timer.
    pub fn period_ns(&self, id: TimerId) -> Option<u64> {
        self.contains(id).then(|| self.slots[id.index()].period_ns)
    }

    /// Whether the event loop is running (timers publish real deadlines).
    #[inline]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// The wake interval last published to the timer thread.
    #[inline]
    pub const fn published_ns(&self) -> u64 {
        self.published_ns
    }

    /// Handle to the deadline the timer thread sleeps on.
    pub const fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    /// Mark the event loop running or stopped and republish the deadline.
    pub fn set_running(&mut self, running: bool) {
        if self.running != running {
            self.running = running;
            self.recompute();
        }
    }

    /// Register a timer in the first free slot.
    ///
    /// The timer is unarmed: it is first observed (not fired) by the next
    /// firing pass.
    pub fn add(&mut self, timer: Timer) -> Result<TimerId> {
        let Some(index) = (1..self.occupied.len()).find(|&i| !self.occupied[i]) else {
            let capacity = self.capacity();
            log::error!("cannot add timer: table full ({capacity} slots)");
            return Err(GlueError::TimerCapacity { capacity });
        };

        let serial = self.next_serial;
        self.next_serial += 1;
        self.slots[index] = Slot {
            period_ns: timer.period_ns,
            last_fired: 0,
            serial,
            callback: Some(timer.callback),
        };
        self.occupied[index] = true;

        #[allow(clippy::cast_possible_truncation)]
        let id = TimerId(index as u32);
        log::debug!("added {id} every {}ns", timer.period_ns);
        self.recompute();
        Ok(id)
    }

    /// Unregister a timer. Safe to call from inside any timer callback,
    /// including the timer's own.
    ///
    /// # Panics
    ///
    /// Panics if `id` is [`TimerId::NONE`] or not registered.
    pub fn remove(&mut self, id: TimerId) {
        assert!(!id.is_none(), "cannot remove TimerId::NONE");
        assert!(self.contains(id), "removing unregistered {id}");

        self.occupied[id.index()] = false;
        // Drops the callback, unless it is running; then the firing pass
        // drops it when the call returns.
        self.slots[id.index()] = Slot::default();
        log::debug!("removed {id}");
        self.recompute();
    }

    /// Run one firing pass at time `now`. Returns how many callbacks ran.
    pub fn fire_due(&mut self, now: u64) -> usize {
        let mut fired = 0;

        for index in 1..self.slots.len() {
            if !self.occupied[index] {
                continue;
            }

            let slot = &mut self.slots[index];
            if slot.last_fired == 0 {
                slot.last_fired = now;
                continue;
            }
            if now < slot.last_fired.saturating_add(slot.period_ns) {
                continue;
            }
            // Already running further up the stack.
            let Some(mut callback) = slot.callback.take() else {
                continue;
            };
            let serial = slot.serial;

            #[allow(clippy::cast_possible_truncation)]
            let id = TimerId(index as u32);
            callback(self, id);
            fired += 1;

            // The callback may have removed this timer, and something else
            // may now live in the slot.
            let slot = &mut self.slots[index];
            if self.occupied[index] && slot.serial == serial {
                slot.callback = Some(callback);
                slot.last_fired = now;
            }
        }

        self.recompute();
        fired
    }

    /// Smallest period among live timers, or "forever".
    pub fn earliest_ns(&self) -> u64 {
        if !self.running {
            return self.forever_ns;
        }
        self.occupied
            .iter()
            .zip(&self.slots)
            .filter(|(occupied, _)| **occupied)
            .map(|(_, slot)| slot.period_ns)
            .min()
            .unwrap_or(self.forever_ns)
    }

    fn recompute(&mut self) {
        let earliest = self.earliest_ns();
        if earliest != self.published_ns {
            self.published_ns = earliest;
            self.deadline.publish(earliest);
            log::trace!("timer deadline now {earliest}ns");
        }
    }
}

impl fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("running", &self.running)
            .field("published_ns", &self.published_ns)
            .finish_non_exhaustive()
    }
}
