//! Identity and world-state types shared by every Lobbyforge crate.
//!
//! These are the shapes the host environment reports to the lobby: who a
//! player is, where they stand, and the transient state (inventory,
//! vitals, flight) the lobby borrows while they are inside it.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable, unique identifier for a player.
///
/// Newtype over a UUID so it can't be confused with any other id. The
/// hyphenated string form doubles as the credential salt and as the
/// credential file name, so it must never change for a given player.
///
/// `#[serde(transparent)]` serializes it as the bare UUID string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Generates a fresh random id. Handy for tests and demos; real ids
    /// come from the host.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// The name of a world on the host (e.g. `"lobby"`, `"survival"`).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct WorldId(pub String);

impl WorldId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorldId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for WorldId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// World state
// ---------------------------------------------------------------------------

/// A position in a world, including where the player is looking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: WorldId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Location {
    /// Creates a location facing the default direction.
    pub fn new(world: impl Into<WorldId>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

/// The host's game mode for a player.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Survival,
    Creative,
    Adventure,
    Spectator,
}

/// One stack of items in an inventory slot.
///
/// The lobby only copies items out and puts them back, so the material
/// is an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub material: String,
    pub amount: u32,
}

/// Everything the lobby captures from a player on the way in and hands
/// back on the way out.
///
/// `inventory` is slot-indexed: `None` marks an empty slot, so restoring
/// puts every stack back exactly where it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub location: Location,
    pub food_level: u32,
    #[serde(default)]
    pub inventory: Vec<Option<ItemStack>>,
    #[serde(default)]
    pub game_mode: GameMode,
    /// Progress towards the next level, `0.0..1.0`.
    #[serde(default)]
    pub experience: f32,
    #[serde(default)]
    pub total_experience: u32,
    pub health: f64,
    pub max_health: f64,
    #[serde(default)]
    pub allow_flight: bool,
    #[serde(default)]
    pub flying: bool,
    #[serde(default)]
    pub operator: bool,
}

// ---------------------------------------------------------------------------
// MessageKey
// ---------------------------------------------------------------------------

/// Symbolic names for every text the lobby sends to a player.
///
/// The lobby only ever says WHICH message to show; the host's notifier
/// looks the key up in its own text table. The dotted strings returned by
/// [`as_str`](Self::as_str) are the keys of that table and must stay
/// stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    UnregisteredWelcome,
    UnregisteredNotAllowed,
    RegisteredWelcome,
    RegisteredNotAllowed,
    AutoLogin,
    LoginSuccessful,
    LoginUnsuccessful,
    RegisterMissingPassword,
    RegisterTooShort,
    RegisterDisallowed,
    RegisterAlreadyRegistered,
    RegisterSuccess,
    LoginMissingPassword,
    LoginNotRegistered,
    LoginAlreadyLogged,
    ChangePasswordMissingPassword,
    ChangePasswordTooShort,
    ChangePasswordDisallowed,
    ChangePasswordNotRegistered,
    ChangePasswordNotLogged,
    ChangePasswordSuccess,
    LogoutNotLogged,
    LogoutKick,
    CredentialsPending,
    AttemptInFlight,
    StorageFailure,
    SecurityDisabled,
}

impl MessageKey {
    /// The text-table key for this message.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnregisteredWelcome => "unregistered-players.welcome",
            Self::UnregisteredNotAllowed => "unregistered-players.notallowed",
            Self::RegisteredWelcome => "registered-players.welcome",
            Self::RegisteredNotAllowed => "registered-players.notallowed",
            Self::AutoLogin => "registered-players.autologin",
            Self::LoginSuccessful => "registered-players.login.successful",
            Self::LoginUnsuccessful => {
                "registered-players.login.unsuccessful"
            }
            Self::RegisterMissingPassword => {
                "commands.register.missing-password"
            }
            Self::RegisterTooShort => "commands.register.few-password-chars",
            Self::RegisterDisallowed => "commands.register.disallowed-password",
            Self::RegisterAlreadyRegistered => {
                "commands.register.already-registered"
            }
            Self::RegisterSuccess => "commands.register.success",
            Self::LoginMissingPassword => "commands.login.missing-password",
            Self::LoginNotRegistered => "commands.login.not-registered",
            Self::LoginAlreadyLogged => "commands.login.already-logged",
            Self::ChangePasswordMissingPassword => {
                "commands.changepassword.missing-password"
            }
            Self::ChangePasswordTooShort => {
                "commands.changepassword.few-password-chars"
            }
            Self::ChangePasswordDisallowed => {
                "commands.changepassword.disallowed-password"
            }
            Self::ChangePasswordNotRegistered => {
                "commands.changepassword.not-registered"
            }
            Self::ChangePasswordNotLogged => "commands.changepassword.not-logged",
            Self::ChangePasswordSuccess => "commands.changepassword.success",
            Self::LogoutNotLogged => "commands.logout.not-logged",
            Self::LogoutKick => "commands.logout.kick-message",
            Self::CredentialsPending => "session.credentials-pending",
            Self::AttemptInFlight => "session.attempt-in-flight",
            Self::StorageFailure => "session.storage-failure",
            Self::SecurityDisabled => "session.security-disabled",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =========================================================================
// Tests
// =========================================================================
