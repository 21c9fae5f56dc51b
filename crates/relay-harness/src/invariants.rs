//! Behavioral invariants over a [`Registry`] snapshot: properties that must
//! hold no matter what sequence of admissions, claims, and disconnects
//! produced the current state, not assertions tied to one specific scenario.

use std::collections::HashMap;

use relay_core::Registry;

/// One admitted session's observable state, captured independent of the
/// registry's internal locking.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// The session's channel.
    pub channel: Vec<u8>,
    /// The session's current `userId`.
    pub user_id: u64,
}

/// A point-in-time view of every session the registry currently holds.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    /// Every currently admitted session.
    pub sessions: Vec<SessionSnapshot>,
}

impl RegistrySnapshot {
    /// Captures the current state of `registry`.
    ///
    /// Not atomic with respect to concurrent mutation — each session's
    /// fields are read independently — so this is meant for quiescent
    /// points in a test scenario, not for racing against live traffic.
    #[must_use]
    pub fn capture(registry: &Registry) -> Self {
        let sessions = registry
            .all_sessions()
            .into_iter()
            .map(|s| SessionSnapshot { channel: s.channel().to_vec(), user_id: s.user_id() })
            .collect();
        Self { sessions }
    }
}

/// A violated invariant, with enough detail to diagnose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// What went wrong.
    pub message: String,
}

/// The result of checking one invariant.
pub type InvariantResult = Result<(), Violation>;

/// A property that must hold of every reachable [`RegistrySnapshot`].
pub trait Invariant {
    /// Checks the invariant against `snapshot`.
    fn check(&self, snapshot: &RegistrySnapshot) -> InvariantResult;
}

/// No two live sessions hold the same non-zero `userId` (spec §4.2/§4.3).
pub struct UserIdsUnique;

impl Invariant for UserIdsUnique {
    fn check(&self, snapshot: &RegistrySnapshot) -> InvariantResult {
        let mut seen = HashMap::new();
        for session in &snapshot.sessions {
            if session.user_id == 0 {
                continue;
            }
            if let Some(previous) = seen.insert(session.user_id, session.channel.clone()) {
                return Err(Violation {
                    message: format!(
                        "userId {} held by both channel {:?} and {:?}",
                        session.user_id, previous, session.channel
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Every admitted session has a non-zero `userId` (the relay sentinel, `0`,
/// is never a live session's address; spec §4.2).
pub struct NoLiveSessionHoldsReservedId;

impl Invariant for NoLiveSessionHoldsReservedId {
    fn check(&self, snapshot: &RegistrySnapshot) -> InvariantResult {
        match snapshot.sessions.iter().find(|s| s.user_id == 0) {
            Some(session) => {
                Err(Violation { message: format!("session in channel {:?} holds reserved userId 0", session.channel) })
            }
            None => Ok(()),
        }
    }
}

/// Runs every standard invariant, returning every violation found rather
/// than stopping at the first.
#[must_use]
pub fn check_standard(snapshot: &RegistrySnapshot) -> Vec<Violation> {
    let checks: Vec<Box<dyn Invariant>> = vec![Box::new(UserIdsUnique), Box::new(NoLiveSessionHoldsReservedId)];
    checks.iter().filter_map(|check| check.check(snapshot).err()).collect()
}
