//! Reclamation gate (spec §5).
//!
//! Translates the original implementation's `gc_State`/`WAIT_FOR_GC()`
//! busy-wait protocol: a signed counter with three regimes —
//! a non-negative count of in-flight dispatches, or `-1` meaning "a
//! reclamation pass is in progress, nobody may enter". The CAS loops below
//! close a race present in the original (check-then-increment as two
//! separate steps); the regimes and spin-wait shape are otherwise
//! unchanged, and a caller may substitute an `RwLock`-based gate entirely as
//! long as the same two guarantees hold: no dispatch runs concurrently with
//! a reclamation pass, and a reclamation pass only starts once every
//! in-flight dispatch has released its permit.
use std::sync::atomic::{AtomicI64, Ordering};

const RECLAIMING: i64 = -1;

/// Gates concurrent frame dispatch against a reclamation pass.
pub struct ReclaimGate {
    state: AtomicI64,
}

impl Default for ReclaimGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReclaimGate {
    #[must_use]
    pub fn new() -> Self {
        Self { state: AtomicI64::new(0) }
    }

    /// Acquires a dispatch permit, spinning while a reclamation pass is
    /// running. The returned guard releases the permit on drop, including
    /// on an early return or unwind from the caller's dispatch logic.
    #[must_use]
    pub fn enter(&self) -> ReclaimGuard<'_> {
        loop {
            let current = self.state.load(Ordering::Acquire);
            if current != RECLAIMING
                && self
                    .state
                    .compare_exchange_weak(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            {
                return ReclaimGuard { gate: self };
            }
            std::hint::spin_loop();
        }
    }

    /// Runs `reclaim` with exclusive access: spins until no dispatch permits
    /// are outstanding, flips to the reclaiming regime, runs the closure,
    /// then returns to zero.
    pub fn reclaim<F: FnOnce()>(&self, reclaim: F) {
        loop {
            if self.state.compare_exchange(0, RECLAIMING, Ordering::AcqRel, Ordering::Acquire).is_ok() {
                break;
            }
            std::hint::spin_loop();
        }
        reclaim();
        self.state.store(0, Ordering::Release);
    }

    /// Number of dispatch permits currently outstanding (0 or positive), or
    /// `None` while a reclamation pass holds the gate. Test-only inspection.
    #[cfg(test)]
    fn outstanding(&self) -> Option<i64> {
        match self.state.load(Ordering::Acquire) {
            RECLAIMING => None,
            n => Some(n),
        }
    }
}

/// RAII dispatch permit. Dropping it always releases, regardless of panics.
pub struct ReclaimGuard<'a> {
    gate: &'a ReclaimGate,
}

impl Drop for ReclaimGuard<'_> {
    fn drop(&mut self) {
        self.gate.state.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn enter_then_drop_returns_to_zero() {
        let gate = ReclaimGate::new();
        {
            let _guard = gate.enter();
            assert_eq!(gate.outstanding(), Some(1));
        }
        assert_eq!(gate.outstanding(), Some(0));
    }

    #[test]
    fn nested_enters_stack() {
        let gate = ReclaimGate::new();
        let a = gate.enter();
        let b = gate.enter();
        assert_eq!(gate.outstanding(), Some(2));
        drop(a);
        assert_eq!(gate.outstanding(), Some(1));
        drop(b);
        assert_eq!(gate.outstanding(), Some(0));
    }

    #[test]
    fn reclaim_runs_exclusively_with_no_permits_out() {
        let gate = ReclaimGate::new();
        let mut ran = false;
        gate.reclaim(|| ran = true);
        assert!(ran);
        assert_eq!(gate.outstanding(), Some(0));
    }

    #[test]
    fn reclaim_waits_for_outstanding_permits_to_drain() {
        let gate = Arc::new(ReclaimGate::new());
        let guard = gate.enter();

        let gate2 = Arc::clone(&gate);
        let handle = std::thread::spawn(move || {
            gate2.reclaim(|| {});
        });

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(gate.outstanding(), Some(1));

        drop(guard);
        handle.join().unwrap();
        assert_eq!(gate.outstanding(), Some(0));
    }
}
