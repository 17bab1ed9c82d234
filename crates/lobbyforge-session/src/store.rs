//! The session store: every tracked player, keyed by id.
//!
//! # Concurrency note
//!
//! Unlike a single-owner registry, this map is touched from the event
//! loop AND from spawned connect/command tasks, so it is a `DashMap`.
//! Every method here runs its read-modify-write inside one entry guard:
//! operations on the same player are atomic, operations on different
//! players only contend when they hash to the same shard.
//!
//! No method is async and no guard ever escapes, so nothing in this
//! module can hold a lock across an `.await`.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lobbyforge_protocol::{PlayerId, PlayerState, WorldId};

use crate::{AuthStatus, PlayerSession, RestoreMode, StateUpdate};

/// Result of [`SessionStore::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opened {
    /// A new session was created for this connect.
    pub created: bool,
    /// The credential record still has to be read (new session, or an
    /// earlier read failed).
    pub needs_load: bool,
    /// The session's epoch after this connect.
    pub epoch: u64,
}

/// All sessions the lobby is tracking.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<PlayerId, PlayerSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create for a connect.
    ///
    /// A new session captures `state`, starts `Unregistered` and waits
    /// for its credentials. An existing one keeps its status, digest and
    /// last address (the new address is only recorded once the connect
    /// is resolved). Both are marked online with a fresh epoch.
    pub fn open(&self, player_id: PlayerId, state: &PlayerState) -> Opened {
        match self.sessions.entry(player_id) {
            Entry::Occupied(mut entry) => {
                let session = entry.get_mut();
                let epoch = session.mark_connected();
                Opened {
                    created: false,
                    needs_load: session.credentials_loading(),
                    epoch,
                }
            }
            Entry::Vacant(entry) => {
                let mut session =
                    PlayerSession::new(player_id, state.clone());
                session.set_credentials_loading(true);
                let epoch = session.mark_connected();
                entry.insert(session);
                tracing::info!(%player_id, "session created");
                Opened {
                    created: true,
                    needs_load: true,
                    epoch,
                }
            }
        }
    }

    /// Creates or fully overwrites the snapshot for `player_id`.
    ///
    /// Returns `true` if a new session had to be created.
    pub fn capture(&self, player_id: PlayerId, state: &PlayerState) -> bool {
        match self.sessions.entry(player_id) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().capture(state.clone());
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(PlayerSession::new(player_id, state.clone()));
                true
            }
        }
    }

    /// The update that hands the captured state back. `None` when the
    /// player has no session.
    pub fn restore(
        &self,
        player_id: PlayerId,
        mode: RestoreMode,
    ) -> Option<StateUpdate> {
        self.sessions
            .get(&player_id)
            .map(|s| StateUpdate::restore(s.snapshot(), mode))
    }

    /// Restore and remove in one step.
    pub fn take_restore(
        &self,
        player_id: PlayerId,
        mode: RestoreMode,
    ) -> Option<StateUpdate> {
        self.sessions
            .remove(&player_id)
            .map(|(_, s)| StateUpdate::restore(s.snapshot(), mode))
    }

    /// Deletes the session. Safe to call for an unknown id; returns
    /// whether anything was removed.
    pub fn remove(&self, player_id: PlayerId) -> bool {
        let removed = self.sessions.remove(&player_id).is_some();
        if removed {
            tracing::info!(%player_id, "session removed");
        }
        removed
    }

    /// Runs `f` on the session under its entry lock.
    pub fn update<R>(
        &self,
        player_id: PlayerId,
        f: impl FnOnce(&mut PlayerSession) -> R,
    ) -> Option<R> {
        self.sessions.get_mut(&player_id).map(|mut s| f(s.value_mut()))
    }

    /// Like [`update`](Self::update), but only if the session is still
    /// online and on `epoch`. Used by connect continuations to drop work
    /// that a later disconnect or reconnect has made stale.
    pub fn update_current<R>(
        &self,
        player_id: PlayerId,
        epoch: u64,
        f: impl FnOnce(&mut PlayerSession) -> R,
    ) -> Option<R> {
        let mut session = self.sessions.get_mut(&player_id)?;
        if !session.is_online() || session.epoch() != epoch {
            return None;
        }
        Some(f(session.value_mut()))
    }

    /// Runs `f` on a shared view of the session.
    pub fn view<R>(
        &self,
        player_id: PlayerId,
        f: impl FnOnce(&PlayerSession) -> R,
    ) -> Option<R> {
        self.sessions.get(&player_id).map(|s| f(s.value()))
    }

    pub fn status(&self, player_id: PlayerId) -> Option<AuthStatus> {
        self.view(player_id, PlayerSession::status)
    }

    /// A copy of the session.
    pub fn get(&self, player_id: PlayerId) -> Option<PlayerSession> {
        self.view(player_id, PlayerSession::clone)
    }

    pub fn captured_world(&self, player_id: PlayerId) -> Option<WorldId> {
        self.view(player_id, |s| s.captured_world().clone())
    }

    pub fn mark_offline(&self, player_id: PlayerId) {
        self.update(player_id, PlayerSession::mark_offline);
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.sessions.contains_key(&player_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes every session and returns them.
    ///
    /// Keys are collected first: removing while iterating a `DashMap`
    /// would deadlock on the shard the iterator holds.
    pub fn drain(&self) -> Vec<PlayerSession> {
        let ids: Vec<PlayerId> =
            self.sessions.iter().map(|entry| *entry.key()).collect();
        ids.into_iter()
            .filter_map(|id| self.sessions.remove(&id).map(|(_, s)| s))
            .collect()
    }
}
