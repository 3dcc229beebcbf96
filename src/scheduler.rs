// src/scheduler.rs
//
// Deferred-callback capability used by the poll loop and the repeat sender.
//
// The core never sleeps or spawns. It asks a `Scheduler` to fire a timer after
// a delay and keeps the returned handle; the host loop later hands fired timers
// back to the session. Cancelling a handle guarantees the timer is never
// delivered, and a handle that no longer matches the owner's current one is
// ignored on delivery, so stale timers are harmless either way.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// What a timer is for. Carried back to the session on delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    PollTick,
    RepeatFire,
}

/// Opaque handle to a scheduled timer. Ids are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// A timer that came due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    pub kind: TimerKind,
    /// Scheduler time the timer was due at
    pub due: Duration,
}

/// "Run this after D, give me something I can cancel."
pub trait Scheduler {
    /// Schedule a timer `delay` from the scheduler's current time.
    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle;

    /// Cancel a pending timer. Returns `false` if it already fired or was
    /// cancelled before; cancelling twice is harmless.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Current scheduler time, measured from the scheduler's own epoch.
    fn now(&self) -> Duration;
}

// ============================================================================
// Timer Queue
// ============================================================================

/// Ordered timer queue with an explicit clock.
///
/// The host loop advances the clock (real elapsed time in the console, manual
/// steps in tests) and dispatches whatever came due. Timers due at the same
/// instant fire in the order they were scheduled.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, u64), TimerKind>,
    due_by_id: HashMap<u64, Duration>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers still pending.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Due time of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    /// Whether `handle` is still waiting to fire.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.due_by_id.contains_key(&handle.0)
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to its
    /// due time. Returns `None` once nothing else is due; the clock is then left
    /// at `until` (never moved backwards).
    ///
    /// Popping one timer at a time lets callbacks schedule follow-ups that are
    /// themselves due before `until` and still get them in order.
    pub fn pop_due(&mut self, until: Duration) -> Option<FiredTimer> {
        let key = match self.pending.keys().next() {
            Some(&(due, id)) if due <= until => (due, id),
            _ => {
                if until > self.now {
                    self.now = until;
                }
                return None;
            }
        };

        let kind = self.pending.remove(&key)?;
        self.due_by_id.remove(&key.1);
        if key.0 > self.now {
            self.now = key.0;
        }

        Some(FiredTimer {
            handle: TimerHandle(key.1),
            kind,
            due: key.0,
        })
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let due = self.now + delay;
        self.pending.insert((due, id), kind);
        self.due_by_id.insert(id, due);
        TimerHandle(id)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.due_by_id.remove(&handle.0) {
            Some(due) => self.pending.remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }

    fn now(&self) -> Duration {
        self.now
    }
}
