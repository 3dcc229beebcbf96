// src/transmit.rs
//
// Repeat transmission of the last sent line.
//
// The sender only owns the timing. On each firing the session writes its
// *current* last command, so a send made while a repeat is active is picked up
// by the next firing. The first firing is due immediately, later ones one
// interval apart.

use std::time::Duration;

use crate::scheduler::{Scheduler, TimerHandle, TimerKind};

// ============================================================================
// Types
// ============================================================================

/// The one active repeat of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RepeatTask {
    handle: TimerHandle,
    /// Firings left, including the pending one; `None` repeats until stopped
    remaining: Option<u32>,
    interval: Duration,
}

/// Why `start` declined to start a repeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatRejected {
    NothingToRepeat,
    InvalidInterval,
}

impl std::fmt::Display for RepeatRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatRejected::NothingToRepeat => f.write_str("nothing sent yet"),
            RepeatRejected::InvalidInterval => f.write_str("repeat interval must be positive"),
        }
    }
}

// ============================================================================
// Repeat Sender
// ============================================================================

#[derive(Debug, Default)]
pub struct RepeatSender {
    active: Option<RepeatTask>,
}

impl RepeatSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Start repeating `last_command` every `interval_secs`, `limit` times in
    /// total (`None` = until stopped). Any running repeat is cancelled first,
    /// even when the new one is rejected.
    pub fn start(
        &mut self,
        last_command: &str,
        interval_secs: f64,
        limit: Option<u32>,
        sched: &mut dyn Scheduler,
    ) -> Result<(), RepeatRejected> {
        self.stop(sched);

        if last_command.is_empty() {
            return Err(RepeatRejected::NothingToRepeat);
        }
        let interval = Duration::try_from_secs_f64(interval_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or(RepeatRejected::InvalidInterval)?;

        let remaining = limit.filter(|&n| n > 0);
        let handle = sched.schedule(Duration::ZERO, TimerKind::RepeatFire);
        self.active = Some(RepeatTask {
            handle,
            remaining,
            interval,
        });
        tlog!(
            "[repeat] Started every {:?} ({})",
            interval,
            remaining.map_or("until stopped".to_string(), |n| format!("{} times", n))
        );
        Ok(())
    }

    /// Cancel the active repeat. Returns whether one was running.
    pub fn stop(&mut self, sched: &mut dyn Scheduler) -> bool {
        match self.active.take() {
            Some(task) => {
                sched.cancel(task.handle);
                tlog!("[repeat] Stopped");
                true
            }
            None => false,
        }
    }

    /// Handle a delivered firing. Returns `true` when the caller should
    /// transmit now; the next firing (if any) is already scheduled by then.
    pub fn on_fire(&mut self, handle: TimerHandle, sched: &mut dyn Scheduler) -> bool {
        let Some(task) = self.active.as_mut() else {
            return false;
        };
        if task.handle != handle {
            return false;
        }

        let remaining = task.remaining;
        match remaining {
            Some(n) if n <= 1 => {
                self.active = None;
                tlog!("[repeat] Completed");
            }
            _ => {
                task.remaining = remaining.map(|n| n - 1);
                task.handle = sched.schedule(task.interval, TimerKind::RepeatFire);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TimerQueue;

    fn secs(v: f64) -> Duration {
        Duration::from_secs_f64(v)
    }

    /// Deliver every firing up to `until`, returning the times a send happened.
    fn run(sender: &mut RepeatSender, q: &mut TimerQueue, until: Duration) -> Vec<Duration> {
        let mut sends = Vec::new();
        while let Some(fired) = q.pop_due(until) {
            if sender.on_fire(fired.handle, q) {
                sends.push(fired.due);
            }
        }
        sends
    }

    #[test]
    fn test_bounded_repeat_fires_count_times() {
        let mut q = TimerQueue::new();
        let mut sender = RepeatSender::new();
        sender.start("AT", 1.0, Some(3), &mut q).unwrap();

        let sends = run(&mut sender, &mut q, secs(10.0));
        assert_eq!(sends, vec![secs(0.0), secs(1.0), secs(2.0)]);
        assert!(!sender.is_active());
        assert!(q.is_empty());
    }

    #[test]
    fn test_unbounded_repeat_until_stopped() {
        let mut q = TimerQueue::new();
        let mut sender = RepeatSender::new();
        sender.start("AT", 0.5, None, &mut q).unwrap();

        assert_eq!(run(&mut sender, &mut q, secs(2.0)).len(), 5);
        assert!(sender.is_active());

        assert!(sender.stop(&mut q));
        assert!(!sender.stop(&mut q));
        assert!(run(&mut sender, &mut q, secs(10.0)).is_empty());
    }

    #[test]
    fn test_restart_cancels_previous() {
        let mut q = TimerQueue::new();
        let mut sender = RepeatSender::new();
        sender.start("A", 1.0, Some(5), &mut q).unwrap();
        assert_eq!(run(&mut sender, &mut q, secs(1.0)).len(), 2);

        sender.start("B", 1.0, Some(2), &mut q).unwrap();
        let sends = run(&mut sender, &mut q, secs(20.0));
        assert_eq!(sends, vec![secs(1.0), secs(2.0)]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_rejected_starts() {
        let mut q = TimerQueue::new();
        let mut sender = RepeatSender::new();
        assert_eq!(
            sender.start("", 1.0, None, &mut q),
            Err(RepeatRejected::NothingToRepeat)
        );
        assert_eq!(
            sender.start("AT", 0.0, None, &mut q),
            Err(RepeatRejected::InvalidInterval)
        );
        assert_eq!(
            sender.start("AT", -1.0, None, &mut q),
            Err(RepeatRejected::InvalidInterval)
        );
        assert_eq!(
            sender.start("AT", f64::NAN, None, &mut q),
            Err(RepeatRejected::InvalidInterval)
        );
        assert!(!sender.is_active());
        assert!(q.is_empty());
    }

    #[test]
    fn test_stale_firing_ignored() {
        let mut q = TimerQueue::new();
        let mut sender = RepeatSender::new();
        sender.start("AT", 1.0, None, &mut q).unwrap();
        let first = q.pop_due(secs(0.0)).unwrap();
        sender.stop(&mut q);
        assert!(!sender.on_fire(first.handle, &mut q));
    }
}
