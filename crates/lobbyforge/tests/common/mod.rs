//! Shared fixtures: a recording host, failing and gated credential
//! stores, and player states.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use lobbyforge::prelude::*;
use lobbyforge_session::CredentialError;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

// =========================================================================
// Recording host
// =========================================================================

/// One instruction the lobby gave the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    State(PlayerId, StateUpdate),
    Capabilities(PlayerId, CapabilityDiff),
    Kick(PlayerId, MessageKey),
    Notify(PlayerId, MessageKey),
    Alert(String),
}

#[derive(Default)]
struct Recorded {
    calls: Mutex<Vec<Call>>,
    worlds: Mutex<HashMap<PlayerId, WorldId>>,
}

/// Records every call and tracks which world each player is in.
///
/// Cheap to clone: clones share the same recording, so a test can keep
/// one while the manager owns another.
#[derive(Clone, Default)]
pub struct RecordingHost {
    inner: Arc<Recorded>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts a player online in `world`, as the host would before
    /// reporting the connect.
    pub fn join(&self, player_id: PlayerId, world: &str) {
        self.inner
            .worlds
            .lock()
            .insert(player_id, WorldId::from(world));
    }

    pub fn world_of(&self, player_id: PlayerId) -> Option<WorldId> {
        self.inner.worlds.lock().get(&player_id).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.inner.calls.lock().clear();
    }

    pub fn notices(&self, player_id: PlayerId) -> Vec<MessageKey> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Notify(id, key) if id == player_id => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self, player_id: PlayerId) -> Vec<StateUpdate> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::State(id, update) if id == player_id => Some(update),
                _ => None,
            })
            .collect()
    }

    pub fn last_state(&self, player_id: PlayerId) -> Option<StateUpdate> {
        self.states(player_id).pop()
    }

    /// All capability diffs for a player, folded into one.
    pub fn capability_changes(&self, player_id: PlayerId) -> CapabilityDiff {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Capabilities(id, diff) if id == player_id => Some(diff),
                _ => None,
            })
            .fold(CapabilityDiff::default(), CapabilityDiff::then)
    }

    pub fn alerts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Alert(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn kicked(&self, player_id: PlayerId) -> bool {
        self.calls()
            .iter()
            .any(|c| matches!(c, Call::Kick(id, _) if *id == player_id))
    }

    fn record(&self, call: Call) {
        self.inner.calls.lock().push(call);
    }
}

impl PlayerHost for RecordingHost {
    fn apply_state(&self, player_id: PlayerId, update: &StateUpdate) {
        if let Some(to) = &update.teleport {
            self.join(player_id, to.world.as_str());
        }
        self.record(Call::State(player_id, update.clone()));
    }

    fn apply_capabilities(&self, player_id: PlayerId, diff: &CapabilityDiff) {
        self.record(Call::Capabilities(player_id, diff.clone()));
    }

    fn kick(&self, player_id: PlayerId, reason: MessageKey) {
        self.inner.worlds.lock().remove(&player_id);
        self.record(Call::Kick(player_id, reason));
    }

    fn online_players(&self) -> Vec<(PlayerId, WorldId)> {
        self.inner
            .worlds
            .lock()
            .iter()
            .map(|(id, world)| (*id, world.clone()))
            .collect()
    }
}

impl Notifier for RecordingHost {
    fn notify(&self, player_id: PlayerId, key: MessageKey) {
        self.record(Call::Notify(player_id, key));
    }

    fn alert_operators(&self, text: &str) {
        self.record(Call::Alert(text.to_string()));
    }
}

// =========================================================================
// Credential stores that fail
// =========================================================================

/// Every write fails. Reads return `existing`, or fail with `fail_load`.
#[derive(Debug, Default)]
pub struct FailingStore {
    pub fail_load: bool,
    pub existing: Option<String>,
}

impl CredentialStore for FailingStore {
    async fn persist(
        &self,
        _player_id: PlayerId,
        _digest: &str,
    ) -> Result<(), CredentialError> {
        Err(CredentialError::Unavailable("disk full".into()))
    }

    async fn load(
        &self,
        _player_id: PlayerId,
    ) -> Result<Option<String>, CredentialError> {
        if self.fail_load {
            Err(CredentialError::Unavailable("disk unreadable".into()))
        } else {
            Ok(self.existing.clone())
        }
    }
}

/// A memory store whose writes wait until [`release`](Self::release) is
/// called, one write per call.
#[derive(Debug)]
pub struct GatedStore {
    inner: MemoryCredentialStore,
    gate: Semaphore,
}

impl GatedStore {
    pub fn new(inner: MemoryCredentialStore) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn get(&self, player_id: PlayerId) -> Option<String> {
        self.inner.get(player_id)
    }
}

impl CredentialStore for GatedStore {
    async fn persist(
        &self,
        player_id: PlayerId,
        digest: &str,
    ) -> Result<(), CredentialError> {
        self.gate
            .acquire()
            .await
            .map_err(|e| CredentialError::Unavailable(e.to_string()))?
            .forget();
        self.inner.persist(player_id, digest).await
    }

    async fn load(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<String>, CredentialError> {
        self.inner.load(player_id).await
    }
}

// =========================================================================
// Fixtures
// =========================================================================

pub const LOBBY: &str = "lobby";

pub fn lobby_config() -> LobbyConfig {
    LobbyConfig {
        spawn_points: vec![
            Location::new(LOBBY, 0.5, 65.0, 0.5),
            Location::new(LOBBY, 10.5, 65.0, 0.5),
        ],
        ..LobbyConfig::default()
    }
}

pub fn addr(last: u8) -> IpAddr {
    IpAddr::from([192, 168, 1, last])
}

/// A player standing in `world` with a full inventory and op.
pub fn state_in(world: &str) -> PlayerState {
    PlayerState {
        location: Location::new(world, -120.0, 71.0, 44.0),
        food_level: 12,
        inventory: vec![
            Some(ItemStack {
                material: "iron_pickaxe".into(),
                amount: 1,
            }),
            None,
            Some(ItemStack {
                material: "cobblestone".into(),
                amount: 48,
            }),
        ],
        game_mode: GameMode::Survival,
        experience: 0.3,
        total_experience: 310,
        health: 9.0,
        max_health: 20.0,
        allow_flight: false,
        flying: false,
        operator: true,
    }
}

pub fn manager_with<C: CredentialStore>(
    session: SessionConfig,
    credentials: C,
) -> (SessionManager<C, RecordingHost>, RecordingHost) {
    let host = RecordingHost::new();
    let manager =
        SessionManager::new(session, lobby_config(), credentials, host.clone())
            .unwrap();
    (manager, host)
}

pub fn manager() -> (SessionManager<MemoryCredentialStore, RecordingHost>, RecordingHost)
{
    manager_with(SessionConfig::default(), MemoryCredentialStore::new())
}
