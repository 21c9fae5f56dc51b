//! Concurrent session/channel registry (spec §3/§4.3).
//!
//! Four tables, all guarded by one lock: the session existence set is the
//! owning arena (it is the only table that keeps a session alive once the
//! caller drops its own handle), while the userId and channel tables hold
//! cheap `Arc` clones pointing back into that arena. A session never holds
//! a reference to the registry, so there is no cycle to break — dropping a
//! session's last handle from all three tables is enough to free it.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::session::SessionHandle;

/// A channel's name and its current member count, as reported by census
/// (relay op 2).
#[derive(Debug, Clone)]
pub struct ChannelCensusEntry {
    /// Raw channel name bytes.
    pub name: Vec<u8>,
    /// Number of sessions currently in the channel.
    pub member_count: u32,
}

#[derive(Default)]
struct Tables {
    /// Owning set of every currently admitted session.
    sessions: HashSet<SessionHandle>,
    /// channel name -> member sessions.
    by_channel: HashMap<Vec<u8>, HashSet<SessionHandle>>,
    /// userId -> session. Enforces one session per userId.
    by_user: HashMap<u64, SessionHandle>,
    /// (channel name, key) -> value, set via relay op 4 and read via op 5.
    variables: HashMap<(Vec<u8>, Vec<u8>), Vec<u8>>,
}

/// The relay's concurrent registry.
#[derive(Default)]
pub struct Registry {
    tables: RwLock<Tables>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a freshly constructed session (still addressed as the relay
    /// sentinel `0`) into its channel and the global existence set, drawing
    /// its initial `userId` under the same write-lock scope that checks for
    /// collisions — a session is never visible to another thread between
    /// "id looks free" and "id is reserved" (spec §4.2/§4.4).
    pub fn admit<E: crate::env::Environment>(&self, session: SessionHandle, env: &E) -> u64 {
        let mut t = self.tables.write();

        let user_id = crate::prng::generate_user_id(env, |candidate| t.by_user.contains_key(&candidate));
        session.set_user_id(user_id);

        t.by_channel.entry(session.channel().to_vec()).or_default().insert(session.clone());
        t.by_user.insert(user_id, session.clone());
        t.sessions.insert(session);

        user_id
    }

    /// Removes a session from every table. Drops the channel entry entirely
    /// once its last member leaves, unless it's the permanent global
    /// channel. Returns the channel the session was in and whether it still
    /// has other members, for the caller to build the disconnect broadcast.
    pub fn remove(&self, session: &SessionHandle) -> RemovalOutcome {
        let mut t = self.tables.write();
        t.sessions.remove(session);

        let channel = session.channel().to_vec();
        let mut remaining_in_channel = Vec::new();
        if let Some(members) = t.by_channel.get_mut(&channel) {
            members.remove(session);
            remaining_in_channel = members.iter().cloned().collect();
            if members.is_empty() && channel.as_slice() != relay_proto::GLOBAL_CHANNEL_NAME {
                t.by_channel.remove(&channel);
            }
        }

        let user_id = session.user_id();
        if user_id != 0 {
            // A claim (relay op 3) may have already pointed this userId at
            // a different session; only remove the entry if it still
            // belongs to us.
            if t.by_user.get(&user_id).is_some_and(|held| held == session) {
                t.by_user.remove(&user_id);
            }
        }

        let global_listeners = t
            .by_channel
            .get(relay_proto::GLOBAL_CHANNEL_NAME)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default();

        RemovalOutcome { channel, remaining_in_channel, global_listeners }
    }

    /// Every session currently in `channel`, including the departing one.
    #[must_use]
    pub fn members_of(&self, channel: &[u8]) -> Vec<SessionHandle> {
        self.tables.read().by_channel.get(channel).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    /// Every session currently in the global channel.
    #[must_use]
    pub fn global_listeners(&self) -> Vec<SessionHandle> {
        self.members_of(relay_proto::GLOBAL_CHANNEL_NAME)
    }

    /// Every currently admitted session, for the "re_globl" broadcast fan-out.
    #[must_use]
    pub fn all_sessions(&self) -> Vec<SessionHandle> {
        self.tables.read().sessions.iter().cloned().collect()
    }

    /// Looks up the session currently holding `user_id`.
    #[must_use]
    pub fn by_user_id(&self, user_id: u64) -> Option<SessionHandle> {
        self.tables.read().by_user.get(&user_id).cloned()
    }

    /// Whether `user_id` is currently held by some session.
    #[must_use]
    pub fn is_user_id_taken(&self, user_id: u64) -> bool {
        self.tables.read().by_user.contains_key(&user_id)
    }

    /// Reassigns `user_id` to `new_holder` (relay op 3). If another session
    /// already holds it, that session is evicted and returned so the caller
    /// can close it with `CLOSE_USERID_TAKEN`.
    pub fn claim_user_id(&self, new_holder: &SessionHandle, user_id: u64) -> Option<SessionHandle> {
        let mut t = self.tables.write();

        let evicted = t.by_user.get(&user_id).filter(|held| *held != new_holder).cloned();
        if let Some(evicted) = &evicted {
            let evicted_old_id = evicted.user_id();
            if t.by_user.get(&evicted_old_id).is_some_and(|held| held == evicted) {
                t.by_user.remove(&evicted_old_id);
            }
            evicted.set_user_id(0);
        }

        let previous_id = new_holder.user_id();
        if previous_id != user_id && t.by_user.get(&previous_id).is_some_and(|held| held == new_holder) {
            t.by_user.remove(&previous_id);
        }

        t.by_user.insert(user_id, new_holder.clone());
        new_holder.set_user_id(user_id);

        evicted
    }

    /// Builds a snapshot census of every channel and its population
    /// (relay op 2). Channel name and count are read from the same locked
    /// snapshot so the two can never disagree.
    #[must_use]
    pub fn census(&self) -> Vec<ChannelCensusEntry> {
        let t = self.tables.read();
        t.by_channel
            .iter()
            .map(|(name, members)| ChannelCensusEntry { name: name.clone(), member_count: members.len() as u32 })
            .collect()
    }

    /// Sets a channel-scoped variable (relay op 4).
    pub fn set_variable(&self, channel: &[u8], key: &[u8], value: &[u8]) {
        self.tables.write().variables.insert((channel.to_vec(), key.to_vec()), value.to_vec());
    }

    /// Reads a channel-scoped variable (relay op 5). `None` if never set.
    #[must_use]
    pub fn get_variable(&self, channel: &[u8], key: &[u8]) -> Option<Vec<u8>> {
        self.tables.read().variables.get(&(channel.to_vec(), key.to_vec())).cloned()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.tables.read().sessions.len()
    }
}

/// What remains after removing a session, so the caller can build the
/// disconnect-event fan-out (spec §4.6) without re-locking the registry.
pub struct RemovalOutcome {
    /// The channel the removed session was in.
    pub channel: Vec<u8>,
    /// Sessions still in that channel after removal.
    pub remaining_in_channel: Vec<SessionHandle>,
    /// Sessions currently in the global channel (disconnect-flag listeners).
    pub global_listeners: Vec<SessionHandle>,
}
