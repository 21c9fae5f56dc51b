//! Environment abstraction for deterministic testing.
//!
//! Decouples the dispatcher and reclamation gate from real system resources
//! (time, randomness) so both can be driven deterministically in tests
//! (`relay-harness`) and from real system resources in production
//! (`relay-server`).

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// # Invariants
///
/// - `now()` never goes backwards within a single execution context.
/// - `random_bytes()` uses cryptographically secure entropy in production.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment. Production uses
    /// `std::time::Instant`; a simulated environment would use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration. The only async method on the
    /// trait; used by the reclaimer's background loop, never by dispatch
    /// logic itself.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills `buffer` with random bytes.
    ///
    /// Given the same seed, an implementation must produce the same
    /// sequence of bytes — this is what lets `relay-harness` replay a
    /// recorded sequence of userId draws.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Draws a random `u64`, used for userId generation (spec §4.2).
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }
}

/// Production environment using system time and an OS-entropy-seeded CSPRNG.
#[derive(Clone)]
pub struct SystemEnv {
    rng: std::sync::Arc<parking_lot::Mutex<rand_chacha::ChaCha20Rng>>,
}

impl Default for SystemEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemEnv {
    /// Seeds a fresh ChaCha20 RNG from OS entropy. Per spec §4.2 the
    /// generator's period must be at least 2^128 - 1; ChaCha20 comfortably
    /// exceeds that.
    #[must_use]
    pub fn new() -> Self {
        use rand::SeedableRng;

        let mut seed = [0u8; 32];
        #[allow(clippy::expect_used)]
        getrandom::getrandom(&mut seed).expect("OS RNG unavailable at startup");
        Self { rng: std::sync::Arc::new(parking_lot::Mutex::new(rand_chacha::ChaCha20Rng::from_seed(seed))) }
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        use rand::RngCore;
        self.rng.lock().fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_time_advances() {
        let env = SystemEnv::new();
        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = env.now();
        assert!(t2 > t1);
    }

    #[test]
    fn system_env_random_bytes_differ() {
        let env = SystemEnv::new();
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        env.random_bytes(&mut a);
        env.random_bytes(&mut b);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn system_env_sleep_waits() {
        let env = SystemEnv::new();
        let start = env.now();
        env.sleep(Duration::from_millis(20)).await;
        assert!(env.now() - start >= Duration::from_millis(20));
    }
}
