//! Two-phase period handshake between the audio loop and the device callback.
//!
//! Phase A hands a finished period to the device: the audio loop sets
//! `callback_done` and signals; the callback waits on that flag. Phase B
//! mirrors it with `finish_wait`/`finish_done` so the loop cannot start
//! mixing the next period before the device has copied the last one out.
//! The very first callback skips the wait once, priming the pipeline with
//! one period of slack.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct SyncState {
    initial_callback: bool,
    callback_wait: bool,
    callback_done: bool,
    finish_wait: bool,
    finish_done: bool,
}

/// Synchronizes one producer period against one consumer copy.
///
/// Both sides announce intent with a wait flag before parking, and every
/// wait re-checks its predicate in a loop, so spurious wakeups and
/// signal-before-wait orderings are both harmless.
#[derive(Debug)]
pub struct PeriodHandshake {
    state: Mutex<SyncState>,
    period_cond: Condvar,
    finish_cond: Condvar,
}

impl PeriodHandshake {
    /// A fresh handshake; the first consumer wait is skipped.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SyncState {
                initial_callback: true,
                callback_wait: false,
                callback_done: false,
                finish_wait: false,
                finish_done: false,
            }),
            period_cond: Condvar::new(),
            finish_cond: Condvar::new(),
        }
    }

    /// Audio-loop side: a mixed period is ready for the device.
    pub fn period_produced(&self) {
        let mut state = self.state.lock().unwrap();
        state.callback_done = true;
        if state.callback_wait {
            self.period_cond.notify_one();
        }
    }

    /// Audio-loop side: blocks until the device copied the handed-off period.
    pub fn wait_consumed(&self) {
        let mut state = self.state.lock().unwrap();
        state.finish_wait = true;
        while !state.finish_done && state.finish_wait {
            state = self.finish_cond.wait(state).unwrap();
        }
        state.finish_wait = false;
        state.finish_done = false;
    }

    /// Device side: blocks until the audio loop hands off a period.
    ///
    /// The first call on a fresh handshake returns immediately.
    pub fn wait_period(&self) {
        let mut state = self.state.lock().unwrap();
        if state.initial_callback {
            state.initial_callback = false;
            return;
        }

        state.callback_wait = true;
        while !state.callback_done && state.callback_wait {
            state = self.period_cond.wait(state).unwrap();
        }
        state.callback_wait = false;
        state.callback_done = false;
    }

    /// Device side: like [`wait_period`](Self::wait_period) but gives up
    /// after `timeout`.
    ///
    /// Returns `false` when no period arrived in time; the caller emits
    /// silence for this callback and tries again on the next one.
    pub fn wait_period_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        if state.initial_callback {
            state.initial_callback = false;
            return true;
        }

        state.callback_wait = true;
        while !state.callback_done && state.callback_wait {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                state.callback_wait = false;
                return false;
            };
            let (guard, result) = self.period_cond.wait_timeout(state, remaining).unwrap();
            state = guard;
            if result.timed_out() && !state.callback_done {
                state.callback_wait = false;
                return false;
            }
        }

        let produced = state.callback_done;
        state.callback_wait = false;
        state.callback_done = false;
        produced
    }

    /// Device side: the handed-off period has been copied out.
    pub fn period_consumed(&self) {
        let mut state = self.state.lock().unwrap();
        state.finish_done = true;
        if state.finish_wait {
            self.finish_cond.notify_one();
        }
    }

    /// Releases both sides without handing anything off.
    ///
    /// Shutdown path: clears the wait flags so neither thread stays parked.
    pub fn unblock(&self) {
        let mut state = self.state.lock().unwrap();
        state.callback_wait = false;
        state.finish_wait = false;
        self.period_cond.notify_all();
        self.finish_cond.notify_all();
    }
}

impl Default for PeriodHandshake {
    fn default() -> Self {
        Self::new()
    }
}
