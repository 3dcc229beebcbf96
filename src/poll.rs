// src/poll.rs
//
// Periodic read loop. Each tick drains the transport once and schedules the
// next tick, unless the read failed or the loop was cancelled.

use std::time::Duration;

use crate::io::{Transport, TransportError};
use crate::scheduler::{Scheduler, TimerHandle, TimerKind};

/// Default tick period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What one delivered tick produced.
#[derive(Debug, PartialEq)]
pub enum PollOutcome {
    /// Not the current tick (cancelled or superseded); nothing was read
    Stale,
    /// Read succeeded but nothing was waiting, or the port is virtual
    Idle,
    Data(Vec<u8>),
    /// Read failed; the loop has stopped
    Failed(TransportError),
}

#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    pending: Option<TimerHandle>,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    /// Whether a tick is outstanding.
    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Schedule the first tick. Restarting replaces any outstanding tick.
    pub fn start(&mut self, sched: &mut dyn Scheduler) {
        self.cancel(sched);
        self.pending = Some(sched.schedule(self.interval, TimerKind::PollTick));
    }

    /// Stop the loop. The outstanding tick, if any, will never be delivered.
    pub fn cancel(&mut self, sched: &mut dyn Scheduler) {
        if let Some(handle) = self.pending.take() {
            sched.cancel(handle);
        }
    }

    /// Handle a delivered tick.
    pub fn on_tick(
        &mut self,
        handle: TimerHandle,
        transport: &mut Transport,
        sched: &mut dyn Scheduler,
    ) -> PollOutcome {
        if self.pending != Some(handle) {
            return PollOutcome::Stale;
        }
        self.pending = None;

        if transport.is_virtual() {
            self.pending = Some(sched.schedule(self.interval, TimerKind::PollTick));
            return PollOutcome::Idle;
        }

        match transport.read_available() {
            Ok(bytes) => {
                self.pending = Some(sched.schedule(self.interval, TimerKind::PollTick));
                if bytes.is_empty() {
                    PollOutcome::Idle
                } else {
                    PollOutcome::Data(bytes)
                }
            }
            Err(e) => {
                tlog!("[poll] Stopped: {}", e);
                PollOutcome::Failed(e)
            }
        }
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::io::serial::mock::{script, ScriptedOpener};
    use crate::scheduler::TimerQueue;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_ticks_deliver_data_and_reschedule() {
        let s = script();
        let mut t = Transport::open_with(
            &Config::for_port("/dev/test-poll-data", 9600),
            &ScriptedOpener::new(&s),
        );
        let mut q = TimerQueue::new();
        let mut poll = PollScheduler::default();
        poll.start(&mut q);

        let fired = q.pop_due(ms(10)).unwrap();
        assert_eq!(poll.on_tick(fired.handle, &mut t, &mut q), PollOutcome::Idle);

        s.borrow_mut().incoming.push_back(b"abc".to_vec());
        let fired = q.pop_due(ms(20)).unwrap();
        assert_eq!(fired.due, ms(20));
        assert_eq!(
            poll.on_tick(fired.handle, &mut t, &mut q),
            PollOutcome::Data(b"abc".to_vec())
        );
        assert!(poll.is_running());
    }

    #[test]
    fn test_virtual_skips_read_but_keeps_ticking() {
        let mut t = Transport::open(&Config::virtual_port());
        let mut q = TimerQueue::new();
        let mut poll = PollScheduler::default();
        poll.start(&mut q);

        for step in 1..=5 {
            let fired = q.pop_due(ms(step * 10)).unwrap();
            assert_eq!(poll.on_tick(fired.handle, &mut t, &mut q), PollOutcome::Idle);
        }
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_read_failure_stops_loop() {
        let s = script();
        let mut t = Transport::open_with(
            &Config::for_port("/dev/test-poll-fail", 9600),
            &ScriptedOpener::new(&s),
        );
        let mut q = TimerQueue::new();
        let mut poll = PollScheduler::default();
        poll.start(&mut q);

        s.borrow_mut().fail_reads = Some(std::io::ErrorKind::BrokenPipe);
        let fired = q.pop_due(ms(10)).unwrap();
        assert!(matches!(
            poll.on_tick(fired.handle, &mut t, &mut q),
            PollOutcome::Failed(TransportError::Read { .. })
        ));
        assert!(!poll.is_running());
        assert!(q.is_empty());
        assert_eq!(s.borrow().polls, 1);
    }

    #[test]
    fn test_cancelled_tick_is_stale() {
        let mut t = Transport::open(&Config::virtual_port());
        let mut q = TimerQueue::new();
        let mut poll = PollScheduler::default();
        poll.start(&mut q);
        let old = q.pop_due(ms(10)).unwrap();

        poll.cancel(&mut q);
        assert_eq!(poll.on_tick(old.handle, &mut t, &mut q), PollOutcome::Stale);
        assert!(q.is_empty());
    }
}
