//! Mutual-exclusion gate for table mutations.
//!
//! Waiters suspend on a fair async mutex and are woken in arrival order.
//! The gate is released when the guard drops, so every exit path of a
//! mutation (early return, `?`, panic, cancelled future) gives it back.
//! There is no acquisition timeout; wait and hold times are logged instead.

use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Hold time past which a release is logged at WARN
pub const DEFAULT_SLOW_HOLD_MS: u64 = 500;

pub struct Gate {
    inner: Mutex<()>,
    slow_hold: Duration,
}

impl Gate {
    pub fn new(slow_hold: Duration) -> Self {
        Self {
            inner: Mutex::new(()),
            slow_hold,
        }
    }

    /// Suspend until the gate is free, then hold it for `op`
    pub async fn acquire(&self, op: &'static str) -> GateGuard<'_> {
        let started = Instant::now();
        let guard = self.inner.lock().await;
        debug!(
            op,
            waited_ms = started.elapsed().as_millis() as u64,
            "Table gate acquired"
        );
        GateGuard {
            _guard: guard,
            op,
            acquired_at: Instant::now(),
            slow_hold: self.slow_hold,
        }
    }

    #[cfg(test)]
    pub fn try_acquire(&self, op: &'static str) -> Option<GateGuard<'_>> {
        let guard = self.inner.try_lock().ok()?;
        debug!(op, waited_ms = 0u64, "Table gate acquired");
        Some(GateGuard {
            _guard: guard,
            op,
            acquired_at: Instant::now(),
            slow_hold: self.slow_hold,
        })
    }

    #[cfg(test)]
    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_SLOW_HOLD_MS))
    }
}

/// Scoped hold on the gate
pub struct GateGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    op: &'static str,
    acquired_at: Instant,
    slow_hold: Duration,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        let held = self.acquired_at.elapsed();
        if held >= self.slow_hold {
            warn!(
                op = self.op,
                held_ms = held.as_millis() as u64,
                "🐢 Table gate held past slow threshold"
            );
        } else {
            debug!(
                op = self.op,
                held_ms = held.as_millis() as u64,
                "Table gate released"
            );
        }
    }
}
