use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Why a guarded action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDenied {
    /// The lock is inside its hold window.
    Held,
    /// This round (or a later one) already went through the lock.
    AlreadyClaimed,
}

/// At-most-once guard for a round-scoped mutation (award, life loss).
///
/// A round token can be claimed once: the claim is a compare-and-set on the
/// highest round seen so far, so duplicate round-end events for the same round
/// are refused no matter how they interleave. After a claim the lock also stays
/// held for a short window; `force_hold` extends that window to swallow
/// straggling events after a restart.
#[derive(Debug)]
pub struct ActionLock {
    name: &'static str,
    window: Duration,
    epoch: Instant,
    claimed_round: AtomicU64,
    held_until_ms: AtomicU64,
}

impl ActionLock {
    pub fn new(name: &'static str, window: Duration, epoch: Instant) -> Self {
        Self {
            name,
            window,
            epoch,
            claimed_round: AtomicU64::new(0),
            held_until_ms: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn offset_ms(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.epoch).as_millis() as u64
    }

    pub fn is_held(&self, now: Instant) -> bool {
        self.offset_ms(now) < self.held_until_ms.load(Ordering::Acquire)
    }

    pub fn last_claimed_round(&self) -> u64 {
        self.claimed_round.load(Ordering::Acquire)
    }

    /// Claims `round` and starts the hold window. Rounds are numbered from 1.
    pub fn try_acquire(&self, round: u64, now: Instant) -> Result<(), LockDenied> {
        if self.is_held(now) {
            tracing::debug!(lock = self.name, round, "Guard held, request ignored");
            return Err(LockDenied::Held);
        }

        let mut current = self.claimed_round.load(Ordering::Acquire);
        loop {
            if round <= current {
                tracing::debug!(lock = self.name, round, claimed = current, "Round already claimed");
                return Err(LockDenied::AlreadyClaimed);
            }
            match self.claimed_round.compare_exchange_weak(
                current,
                round,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        self.hold_until(now + self.window);
        Ok(())
    }

    /// Holds the lock for at least `duration` from `now`, independent of any claim.
    pub fn force_hold(&self, now: Instant, duration: Duration) {
        self.hold_until(now + duration);
    }

    fn hold_until(&self, until: Instant) {
        self.held_until_ms
            .fetch_max(self.offset_ms(until), Ordering::AcqRel);
    }
}
