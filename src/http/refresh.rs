//! Single-flight Refresh Gate
//!
//! Serializes token refreshes: the first caller that finds the gate idle opens
//! a refresh cycle, every caller (including the first) queues its deferred
//! work, and whoever runs the refresh drains the queue in enqueue order when
//! it completes. A cycle can also be aborted when the session ends while the
//! refresh is still running; its late completion then finds nothing to drain.
//!
//! ```text
//! idle ──enqueue (opens cycle)──▶ refreshing ──complete/abort──▶ idle
//!                                   │    ▲
//!                                   └────┘ enqueue (joins cycle)
//! ```

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Queue of deferred work guarded by a single in-flight refresh
pub struct RefreshGate<T> {
    state: Mutex<GateState<T>>,
    cycles: AtomicU64,
}

struct GateState<T> {
    /// Id of the open cycle, if any
    current: Option<u64>,
    queue: Vec<T>,
}

impl<T> RefreshGate<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                current: None,
                queue: Vec::new(),
            }),
            cycles: AtomicU64::new(0),
        }
    }

    /// Queue `item`.
    ///
    /// Returns the cycle id when this call opened a new cycle; the caller must
    /// then run the refresh and call [`RefreshGate::complete`] with that id.
    pub fn enqueue(&self, item: T) -> Option<u64> {
        let mut state = self.state.lock();
        state.queue.push(item);

        if state.current.is_some() {
            None
        } else {
            let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
            state.current = Some(cycle);
            Some(cycle)
        }
    }

    /// Close `cycle` and take the queued items in enqueue order.
    ///
    /// Returns nothing when `cycle` is no longer the open cycle.
    pub fn complete(&self, cycle: u64) -> Vec<T> {
        let mut state = self.state.lock();
        if state.current != Some(cycle) {
            return Vec::new();
        }
        state.current = None;
        std::mem::take(&mut state.queue)
    }

    /// Close whatever cycle is open and take its queued items
    pub fn abort(&self) -> Vec<T> {
        let mut state = self.state.lock();
        state.current = None;
        std::mem::take(&mut state.queue)
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().current.is_some()
    }

    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Number of refresh cycles opened so far
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }
}

impl<T> Default for RefreshGate<T> {
    fn default() -> Self {
        Self::new()
    }
}
