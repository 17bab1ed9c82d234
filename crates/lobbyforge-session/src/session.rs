//! Session types: the records that represent a player the lobby is
//! looking after.
//!
//! A session tracks:
//! - WHAT the player looked like before the lobby touched them (snapshot)
//! - WHERE they stand in the authentication state machine (status)
//! - HOW to recognise them next time (credential digest, last address)
//! - WHETHER async work started for an earlier connect is still current
//!   (online flag and connect epoch)

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;

use lobbyforge_protocol::{
    GameMode, ItemStack, Location, PlayerId, PlayerState, WorldId,
};
use serde::{Deserialize, Serialize};

use crate::{capabilities_for, CapabilityDiff, CapabilitySet};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for authentication behavior.
///
/// `#[serde(default)]` lets a config file set only the fields it cares
/// about; everything else falls back to [`Default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Require players to register/log in before they may act.
    ///
    /// When `false` the lobby still captures and restores state, but
    /// every action is allowed and auth commands are refused.
    pub security_enabled: bool,

    /// Skip the password prompt for a player who was logged in last time
    /// and reconnects from the same address.
    pub auto_login_enabled: bool,

    /// Minimum password length, in characters.
    pub min_password_length: usize,

    /// Passwords that are refused outright (compared case-insensitively).
    pub disallowed_passwords: HashSet<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            security_enabled: true,
            auto_login_enabled: true,
            min_password_length: 6,
            disallowed_passwords: HashSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthStatus
// ---------------------------------------------------------------------------

/// Where a player stands in the authentication state machine.
///
/// ```text
///   Unregistered ──(register)──→ Registered ──(login)──→ LoggedIn
///                                    ↑                      │
///                                    └───(reconnect, no ────┘
///                                         auto-login)
/// ```
///
/// A successful `register` passes through `Registered` on its way to
/// `LoggedIn`. Going back to `Unregistered` only happens by removing the
/// session altogether.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum AuthStatus {
    #[default]
    Unregistered,
    Registered,
    LoggedIn,
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered => write!(f, "Unregistered"),
            Self::Registered => write!(f, "Registered"),
            Self::LoggedIn => write!(f, "LoggedIn"),
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerSession
// ---------------------------------------------------------------------------

/// One tracked player.
///
/// Fields are private: `status` and `capabilities` must always change
/// together, and only [`transition`](Self::transition) does that.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    player_id: PlayerId,
    snapshot: PlayerState,
    status: AuthStatus,
    capabilities: CapabilitySet,
    hashed_credential: Option<String>,
    /// Digest of a register/change-password that is waiting on storage.
    pending_credential: Option<String>,
    last_address: Option<IpAddr>,
    credentials_loading: bool,
    online: bool,
    epoch: u64,
}

impl PlayerSession {
    /// Creates a session that has captured `snapshot` and knows nothing
    /// about the player's credentials yet.
    pub fn new(player_id: PlayerId, snapshot: PlayerState) -> Self {
        Self {
            player_id,
            snapshot,
            status: AuthStatus::Unregistered,
            capabilities: capabilities_for(AuthStatus::Unregistered),
            hashed_credential: None,
            pending_credential: None,
            last_address: None,
            credentials_loading: false,
            online: false,
            epoch: 0,
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// The state captured on the way into the lobby.
    pub fn snapshot(&self) -> &PlayerState {
        &self.snapshot
    }

    /// The world the player was in when the snapshot was taken.
    pub fn captured_world(&self) -> &WorldId {
        &self.snapshot.location.world
    }

    pub fn status(&self) -> AuthStatus {
        self.status
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn hashed_credential(&self) -> Option<&str> {
        self.hashed_credential.as_deref()
    }

    pub fn pending_credential(&self) -> Option<&str> {
        self.pending_credential.as_deref()
    }

    pub fn last_address(&self) -> Option<IpAddr> {
        self.last_address
    }

    /// `true` until the credential record has been read successfully.
    pub fn credentials_loading(&self) -> bool {
        self.credentials_loading
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Bumped on every connect. Async work started for one connect
    /// compares it before touching the session again.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replaces the snapshot entirely. Nothing from the previous one
    /// survives.
    pub fn capture(&mut self, state: PlayerState) {
        self.snapshot = state;
    }

    pub fn record_address(&mut self, address: IpAddr) {
        self.last_address = Some(address);
    }

    /// Moves to `status` and recomputes the capability set in the same
    /// step. Returns what changed so the host can mirror it.
    pub fn transition(&mut self, status: AuthStatus) -> CapabilityDiff {
        let next = capabilities_for(status);
        let diff = CapabilityDiff::between(&self.capabilities, &next);
        self.status = status;
        self.capabilities = next;
        diff
    }

    pub(crate) fn set_hashed_credential(&mut self, digest: Option<String>) {
        self.hashed_credential = digest;
    }

    pub(crate) fn set_pending_credential(&mut self, digest: Option<String>) {
        self.pending_credential = digest;
    }

    pub(crate) fn set_credentials_loading(&mut self, loading: bool) {
        self.credentials_loading = loading;
    }

    pub(crate) fn mark_connected(&mut self) -> u64 {
        self.online = true;
        self.epoch += 1;
        self.epoch
    }

    pub(crate) fn mark_offline(&mut self) {
        self.online = false;
    }
}

// ---------------------------------------------------------------------------
// State updates
// ---------------------------------------------------------------------------

/// How a snapshot should be handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreMode {
    /// Move the player back to the captured location first.
    pub teleport: bool,
    /// Put the captured inventory back. When `false` the inventory the
    /// player carries right now is left alone.
    pub inventory: bool,
}

/// A set of changes the host should apply to a player.
///
/// `None` means "leave as is". When `teleport` is set, the host moves
/// the player before applying anything else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub teleport: Option<Location>,
    pub food_level: Option<u32>,
    pub inventory: Option<Vec<Option<ItemStack>>>,
    pub game_mode: Option<GameMode>,
    pub experience: Option<f32>,
    pub total_experience: Option<u32>,
    pub health: Option<f64>,
    pub allow_flight: Option<bool>,
    pub flying: Option<bool>,
    pub operator: Option<bool>,
}

impl StateUpdate {
    /// Only move the player.
    pub fn teleport(to: Location) -> Self {
        Self {
            teleport: Some(to),
            ..Self::default()
        }
    }

    /// Only change the operator flag.
    pub fn operator(operator: bool) -> Self {
        Self {
            operator: Some(operator),
            ..Self::default()
        }
    }

    /// Everything needed to put `snapshot` back on the player.
    pub fn restore(snapshot: &PlayerState, mode: RestoreMode) -> Self {
        Self {
            teleport: mode.teleport.then(|| snapshot.location.clone()),
            food_level: Some(snapshot.food_level),
            inventory: mode.inventory.then(|| snapshot.inventory.clone()),
            game_mode: Some(snapshot.game_mode),
            experience: Some(snapshot.experience),
            total_experience: Some(snapshot.total_experience),
            health: Some(snapshot.health),
            allow_flight: Some(snapshot.allow_flight),
            flying: Some(snapshot.flying),
            operator: Some(snapshot.operator),
        }
    }

    /// Applies this update to a state value, in the same order a host
    /// must: location first, then everything else.
    pub fn apply_to(&self, state: &mut PlayerState) {
        if let Some(location) = &self.teleport {
            state.location = location.clone();
        }
        if let Some(food) = self.food_level {
            state.food_level = food;
        }
        if let Some(items) = &self.inventory {
            state.inventory = items.clone();
        }
        if let Some(mode) = self.game_mode {
            state.game_mode = mode;
        }
        if let Some(xp) = self.experience {
            state.experience = xp;
        }
        if let Some(total) = self.total_experience {
            state.total_experience = total;
        }
        if let Some(health) = self.health {
            state.health = health;
        }
        if let Some(allow) = self.allow_flight {
            state.allow_flight = allow;
        }
        if let Some(flying) = self.flying {
            state.flying = flying;
        }
        if let Some(op) = self.operator {
            state.operator = op;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Capability;

    fn state_in(world: &str) -> PlayerState {
        PlayerState {
            location: Location::new(world, 10.0, 64.0, -4.0),
            food_level: 9,
            inventory: vec![
                Some(ItemStack {
                    material: "diamond_sword".into(),
                    amount: 1,
                }),
                None,
            ],
            game_mode: GameMode::Survival,
            experience: 0.25,
            total_experience: 118,
            health: 13.5,
            max_health: 20.0,
            allow_flight: true,
            flying: true,
            operator: true,
        }
    }

    #[test]
    fn test_new_session_starts_unregistered_with_register_capability() {
        let session = PlayerSession::new(PlayerId::new(), state_in("survival"));

        assert_eq!(session.status(), AuthStatus::Unregistered);
        assert!(session.capabilities().contains(&Capability::Register));
        assert!(session.hashed_credential().is_none());
        assert!(!session.is_online());
    }

    #[test]
    fn test_transition_keeps_capabilities_in_step() {
        let mut session =
            PlayerSession::new(PlayerId::new(), state_in("survival"));

        let diff = session.transition(AuthStatus::Registered);

        assert_eq!(session.status(), AuthStatus::Registered);
        assert_eq!(
            session.capabilities(),
            &capabilities_for(AuthStatus::Registered)
        );
        assert_eq!(diff.granted, vec![Capability::Login]);
        assert_eq!(diff.revoked, vec![Capability::Register]);
    }

    #[test]
    fn test_capture_replaces_whole_snapshot() {
        let mut session =
            PlayerSession::new(PlayerId::new(), state_in("survival"));
        let mut fresh = state_in("creative");
        fresh.inventory.clear();

        session.capture(fresh.clone());

        assert_eq!(session.snapshot(), &fresh);
        assert_eq!(session.captured_world(), &WorldId::from("creative"));
    }

    #[test]
    fn test_mark_connected_bumps_epoch() {
        let mut session =
            PlayerSession::new(PlayerId::new(), state_in("survival"));

        assert_eq!(session.mark_connected(), 1);
        session.mark_offline();
        assert!(!session.is_online());
        assert_eq!(session.mark_connected(), 2);
        assert!(session.is_online());
    }

    #[test]
    fn test_restore_with_teleport_reproduces_snapshot() {
        let snapshot = state_in("survival");
        let mut current = state_in("lobby");
        current.food_level = 20;
        current.game_mode = GameMode::Adventure;
        current.experience = 0.0;
        current.flying = false;

        StateUpdate::restore(
            &snapshot,
            RestoreMode {
                teleport: true,
                inventory: true,
            },
        )
        .apply_to(&mut current);

        assert_eq!(current, snapshot);
    }

    #[test]
    fn test_restore_without_teleport_or_inventory_leaves_them() {
        let snapshot = state_in("survival");
        let mut current = state_in("minigame");
        current.inventory = vec![None, None, None];

        StateUpdate::restore(
            &snapshot,
            RestoreMode {
                teleport: false,
                inventory: false,
            },
        )
        .apply_to(&mut current);

        assert_eq!(current.location.world, WorldId::from("minigame"));
        assert_eq!(current.inventory, vec![None, None, None]);
        assert_eq!(current.total_experience, snapshot.total_experience);
    }

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();

        assert!(config.security_enabled);
        assert!(config.auto_login_enabled);
        assert_eq!(config.min_password_length, 6);
        assert!(config.disallowed_passwords.is_empty());
    }
}
