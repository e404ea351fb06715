//! Virtual-clock timer service.
//!
//! The service has no internal thread. The owner moves the clock forward
//! with `advance_to()` and drains due timers with `pop_due()`, one at a
//! time, dispatching each payload itself.
//!
//! ## Ordering
//!
//! ```text
//! due_ms ascending, then scheduling order
//! ```
//!
//! Because timers are handed out one by one, a handler that cancels a
//! timer which is also due in the same tick prevents it from firing.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Opaque handle identifying one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A timer that came due.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<T> {
    pub handle: TimerHandle,
    pub payload: T,
    /// The deadline the timer was scheduled for (not the current time).
    pub due_ms: u64,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    interval_ms: Option<u64>,
    payload: T,
}

/// Single-threaded timer scheduler.
#[derive(Debug, Clone)]
pub struct TimerService<T> {
    now_ms: u64,
    next_id: u64,
    /// Keyed by (due, id) so iteration order is the firing order.
    queue: BTreeMap<(u64, u64), Entry<T>>,
    /// id -> due, for cancellation.
    index: HashMap<u64, u64>,
}

impl<T> TimerService<T> {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms,
            next_id: 1,
            queue: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.index.contains_key(&handle.0)
    }

    pub fn pending_count(&self) -> usize {
        self.index.len()
    }

    /// Deadline of the earliest pending timer.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Schedule a one-shot timer `delay_ms` after the current clock.
    pub fn schedule(&mut self, delay_ms: u64, payload: T) -> TimerHandle {
        self.insert(self.now_ms.saturating_add(delay_ms), None, payload)
    }

    /// Schedule a timer that fires every `interval_ms` until cancelled.
    ///
    /// A zero interval is treated as 1 ms.
    pub fn schedule_repeating(&mut self, interval_ms: u64, payload: T) -> TimerHandle {
        let interval_ms = interval_ms.max(1);
        self.insert(
            self.now_ms.saturating_add(interval_ms),
            Some(interval_ms),
            payload,
        )
    }

    /// Cancel a pending timer. Returns `false` if it already fired
    /// (one-shot) or was never scheduled here.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.index.remove(&handle.0) {
            Some(due) => {
                self.queue.remove(&(due, handle.0));
                true
            }
            None => false,
        }
    }

    pub fn cancel_all<I>(&mut self, handles: I) -> usize
    where
        I: IntoIterator<Item = TimerHandle>,
    {
        handles.into_iter().filter(|h| self.cancel(*h)).count()
    }

    /// Move the clock to `now_ms`. The clock never moves backwards; an
    /// earlier value is ignored.
    pub fn advance_to(&mut self, now_ms: u64) {
        if now_ms > self.now_ms {
            self.now_ms = now_ms;
        }
    }

    fn insert(&mut self, due_ms: u64, interval_ms: Option<u64>, payload: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.insert((due_ms, id), Entry { interval_ms, payload });
        self.index.insert(id, due_ms);
        TimerHandle(id)
    }
}

impl<T: Clone> TimerService<T> {
    /// Remove and return the earliest timer whose deadline has passed.
    ///
    /// Repeating timers stay pending under the same handle, re-armed at
    /// the first interval boundary after the current clock. Intervals
    /// missed while the clock was not advanced are skipped, not replayed.
    pub fn pop_due(&mut self) -> Option<Fired<T>> {
        let (&(due_ms, id), _) = self.queue.iter().next()?;
        if due_ms > self.now_ms {
            return None;
        }

        let entry = self.queue.remove(&(due_ms, id))?;
        self.index.remove(&id);

        if let Some(interval) = entry.interval_ms {
            let missed = (self.now_ms - due_ms) / interval;
            let next_due = due_ms.saturating_add(interval.saturating_mul(missed + 1));
            self.queue.insert(
                (next_due, id),
                Entry {
                    interval_ms: Some(interval),
                    payload: entry.payload.clone(),
                },
            );
            self.index.insert(id, next_due);
        }

        Some(Fired {
            handle: TimerHandle(id),
            payload: entry.payload,
            due_ms,
        })
    }
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(timers: &mut TimerService<&'static str>) -> Vec<&'static str> {
        let mut out = Vec::new();
        while let Some(f) = timers.pop_due() {
            out.push(f.payload);
        }
        out
    }

    #[test]
    fn fires_in_deadline_then_schedule_order() {
        let mut timers = TimerService::new(0);
        timers.schedule(200, "late");
        timers.schedule(100, "first");
        timers.schedule(100, "second");

        timers.advance_to(99);
        assert!(drain(&mut timers).is_empty());

        timers.advance_to(250);
        assert_eq!(drain(&mut timers), vec!["first", "second", "late"]);
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut timers = TimerService::new(0);
        let h = timers.schedule(50, "cancelled");
        assert!(timers.cancel(h));
        assert!(!timers.cancel(h));

        timers.advance_to(1_000);
        assert!(drain(&mut timers).is_empty());
    }

    #[test]
    fn cancel_then_reschedule_in_same_tick() {
        let mut timers = TimerService::new(0);
        let old = timers.schedule(100, "old");
        timers.advance_to(100);

        // Expiry and cancellation race: cancellation wins.
        timers.cancel(old);
        let new = timers.schedule(0, "new");
        assert_ne!(old, new);

        assert_eq!(drain(&mut timers), vec!["new"]);
    }

    #[test]
    fn handler_can_cancel_a_sibling_due_in_the_same_tick() {
        let mut timers = TimerService::new(0);
        timers.schedule(10, "a");
        let b = timers.schedule(10, "b");
        timers.advance_to(10);

        let first = timers.pop_due().unwrap();
        assert_eq!(first.payload, "a");
        timers.cancel(b);
        assert!(timers.pop_due().is_none());
    }

    #[test]
    fn repeating_timer_skips_missed_intervals() {
        let mut timers = TimerService::new(0);
        let h = timers.schedule_repeating(100, "tick");

        timers.advance_to(100);
        assert_eq!(drain(&mut timers), vec!["tick"]);
        assert_eq!(timers.next_due_ms(), Some(200));

        // Suspended for a while: only one delivery, next boundary in the future.
        timers.advance_to(1_050);
        assert_eq!(drain(&mut timers), vec!["tick"]);
        assert_eq!(timers.next_due_ms(), Some(1_100));

        assert!(timers.cancel(h));
        timers.advance_to(5_000);
        assert!(drain(&mut timers).is_empty());
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut timers: TimerService<()> = TimerService::new(500);
        timers.advance_to(100);
        assert_eq!(timers.now_ms(), 500);
    }

    #[test]
    fn cancel_all_counts_pending_only() {
        let mut timers = TimerService::new(0);
        let a = timers.schedule(10, "a");
        let b = timers.schedule(20, "b");
        timers.advance_to(10);
        let _ = timers.pop_due();
        assert_eq!(timers.cancel_all([a, b]), 1);
    }
}
