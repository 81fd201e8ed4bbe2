//! Deferred wake queue.
//!
//! When a module raises a pending work signal the host must not call back
//! into it from inside that signal. Instead one deferred invocation of the
//! module's processing entry point is posted to a FIFO that the bridge drains
//! once the current synchronous turn has finished.
//!
//! ```text
//!            signal / post            take_next
//!   Idle ─────────────────────▶ Scheduled ──────────▶ Idle ──▶ process()
//!                                 │    ▲
//!                                 └────┘ signal (coalesced)
//! ```
//!
//! `take_next` returns to `Idle` *before* the entry point runs, so a signal
//! raised by `process()` itself queues a fresh invocation instead of being
//! swallowed.

use std::collections::VecDeque;

/// FIFO of work posted to run after the current turn.
#[derive(Debug)]
pub struct DeferredQueue<T> {
    tasks: VecDeque<T>,
}

impl<T> DeferredQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Post a task behind everything already queued.
    pub fn post(&mut self, task: T) {
        self.tasks.push_back(task);
    }

    /// Take the oldest task.
    pub fn next(&mut self) -> Option<T> {
        self.tasks.pop_front()
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Wake queue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeState {
    /// No invocation queued
    Idle,
    /// One invocation queued and not yet started
    Scheduled,
}

/// A queued invocation of the processing entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    /// Monotonic id, for tracing
    pub seq: u64,
}

/// Coalescing scheduler for pending work signals.
#[derive(Debug)]
pub struct WakeQueue {
    state: WakeState,
    deferred: DeferredQueue<Wake>,
    next_seq: u64,
    signals: u64,
    coalesced: u64,
}

impl WakeQueue {
    /// Create an idle queue.
    pub fn new() -> Self {
        Self {
            state: WakeState::Idle,
            deferred: DeferredQueue::new(),
            next_seq: 0,
            signals: 0,
            coalesced: 0,
        }
    }

    /// Record a pending work signal.
    ///
    /// Returns `true` if this signal queued a new invocation, `false` if it
    /// was folded into one already scheduled.
    pub fn signal(&mut self) -> bool {
        self.signals += 1;
        match self.state {
            WakeState::Scheduled => {
                self.coalesced += 1;
                false
            }
            WakeState::Idle => {
                let wake = Wake { seq: self.next_seq };
                self.next_seq += 1;
                self.deferred.post(wake);
                self.state = WakeState::Scheduled;
                true
            }
        }
    }

    /// Dequeue the next invocation, moving back to `Idle` before it runs.
    pub fn take_next(&mut self) -> Option<Wake> {
        let wake = self.deferred.next()?;
        self.state = WakeState::Idle;
        Some(wake)
    }

    /// Current state.
    pub fn state(&self) -> WakeState {
        self.state
    }

    /// Whether an invocation is waiting to run.
    pub fn is_scheduled(&self) -> bool {
        self.state == WakeState::Scheduled
    }

    /// Number of queued invocations.
    pub fn pending(&self) -> usize {
        self.deferred.len()
    }

    /// Total signals received.
    pub fn signals(&self) -> u64 {
        self.signals
    }

    /// Signals folded into an already scheduled invocation.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}

impl Default for WakeQueue {
    fn default() -> Self {
        Self::new()
    }
}
