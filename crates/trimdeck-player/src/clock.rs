//! Repeating scheduled callback with cancel.
//!
//! The fallback timing loop measures elapsed wall-clock time on every
//! tick instead of counting timer intervals, because coarse timers drift.
//! The trait keeps the scheduling primitive swappable: a thread-backed
//! clock for production, a manually-advanced clock for tests.

use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use std::sync::Arc;
use trimdeck_core::{CancelFlag, Disposer};

/// A tick callback; receives wall-clock time elapsed since scheduling.
pub type Tick = Box<dyn FnMut(Duration) + Send>;

/// Scheduler for the fallback timing loop.
pub trait FrameClock: Send + Sync {
    /// Invoke `tick` repeatedly until the returned disposer runs.
    fn schedule_repeating(&self, tick: Tick) -> Disposer;
}

/// Thread-backed clock ticking at a fixed interval with `Instant`
/// elapsed measurement.
#[derive(Debug, Clone)]
pub struct ThreadClock {
    interval: Duration,
}

impl ThreadClock {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for ThreadClock {
    fn default() -> Self {
        // Roughly one tick per 60 Hz display frame.
        Self::new(Duration::from_millis(16))
    }
}

impl FrameClock for ThreadClock {
    fn schedule_repeating(&self, mut tick: Tick) -> Disposer {
        let cancel = CancelFlag::new();
        let thread_cancel = cancel.clone();
        let interval = self.interval;

        thread::spawn(move || {
            let start = Instant::now();
            while !thread_cancel.is_cancelled() {
                thread::sleep(interval);
                if thread_cancel.is_cancelled() {
                    return;
                }
                tick(start.elapsed());
            }
        });

        cancel.disposer()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Clone, Default)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    entries: Vec<ManualEntry>,
}

struct ManualEntry {
    started_at: Duration,
    cancelled: CancelFlag,
    tick: Arc<Mutex<Tick>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move virtual time forward and fire every live callback once.
    pub fn advance(&self, delta: Duration) {
        let firing: Vec<(Duration, CancelFlag, Arc<Mutex<Tick>>)> = {
            let mut state = self.inner.lock();
            state.now += delta;
            let now = state.now;
            state
                .entries
                .iter()
                .map(|e| (now - e.started_at, e.cancelled.clone(), e.tick.clone()))
                .collect()
        };
        // Callbacks run outside the state lock; they may schedule or cancel.
        for (elapsed, cancelled, tick) in firing {
            if !cancelled.is_cancelled() {
                (tick.lock())(elapsed);
            }
        }
        self.inner
            .lock()
            .entries
            .retain(|e| !e.cancelled.is_cancelled());
    }

    /// Number of live scheduled callbacks.
    pub fn scheduled_count(&self) -> usize {
        let state = self.inner.lock();
        state
            .entries
            .iter()
            .filter(|e| !e.cancelled.is_cancelled())
            .count()
    }
}

impl FrameClock for ManualClock {
    fn schedule_repeating(&self, tick: Tick) -> Disposer {
        let cancelled = CancelFlag::new();
        {
            let mut state = self.inner.lock();
            let started_at = state.now;
            state.entries.push(ManualEntry {
                started_at,
                cancelled: cancelled.clone(),
                tick: Arc::new(Mutex::new(tick)),
            });
        }
        cancelled.disposer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_manual_clock_reports_elapsed_since_schedule() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(100)); // before scheduling

        let seen = Arc::new(Mutex::new(Duration::ZERO));
        let seen2 = seen.clone();
        let _sub = clock.schedule_repeating(Box::new(move |elapsed| {
            *seen2.lock() = elapsed;
        }));

        clock.advance(Duration::from_millis(40));
        assert_eq!(*seen.lock(), Duration::from_millis(40));
        clock.advance(Duration::from_millis(40));
        assert_eq!(*seen.lock(), Duration::from_millis(80));
    }

    #[test]
    fn test_disposed_callback_stops_firing() {
        let clock = ManualClock::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let mut sub = clock.schedule_repeating(Box::new(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        }));

        clock.advance(Duration::from_millis(10));
        sub.dispose();
        clock.advance(Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(clock.scheduled_count(), 0);
    }

    #[test]
    fn test_thread_clock_ticks_and_cancels() {
        let clock = ThreadClock::new(Duration::from_millis(1));
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let mut sub = clock.schedule_repeating(Box::new(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        }));

        for _ in 0..200 {
            if count.load(Ordering::SeqCst) > 2 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(count.load(Ordering::SeqCst) > 2);
        sub.dispose();
        let after = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        // At most one in-flight tick after cancellation.
        assert!(count.load(Ordering::SeqCst) <= after + 1);
    }
}
