//! Host events: the notifications the host environment feeds the lobby.
//!
//! The host (a game server, a test harness, the replay demo) translates
//! whatever it observes into [`HostEvent`]s. Typed commands arrive as a
//! raw verb plus arguments and are turned into a [`Command`] with
//! [`Command::parse`].

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::{Location, PlayerId, PlayerState, ProtocolError, WorldId};

/// Something that happened on the host that the lobby must react to.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
/// `{ "type": "Disconnect", "player_id": "...", "world": "lobby" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostEvent {
    /// A player joined the server. `state` is what they looked like the
    /// instant before the lobby touched them.
    Connect {
        player_id: PlayerId,
        address: IpAddr,
        state: PlayerState,
    },

    /// A player left the server while standing in `world`.
    Disconnect { player_id: PlayerId, world: WorldId },

    /// A player moved from one world to another.
    WorldChange {
        player_id: PlayerId,
        from: WorldId,
        to: WorldId,
    },

    /// A player's position changed. Only used to rescue players who
    /// fall out of the lobby world.
    Move {
        player_id: PlayerId,
        location: Location,
    },

    /// A player typed a command.
    Command {
        player_id: PlayerId,
        verb: String,
        #[serde(default)]
        args: Vec<String>,
    },

    /// An administrator added a spawn point at `location`.
    AddSpawnPoint { location: Location },

    /// The host is stopping: give everyone their state back and kick them.
    Shutdown,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Which command a player issued, without its arguments.
///
/// Used to pick the right message key for a failure ("missing password"
/// means a different text for `register` than for `login`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Register,
    Login,
    Logout,
    ChangePassword,
    Spawn,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Register => "register",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::ChangePassword => "changepassword",
            Self::Spawn => "spawn",
        };
        f.write_str(name)
    }
}

/// A parsed lobby command.
///
/// Passwords are kept as `Option` so that "no password given" reaches the
/// state machine and gets its own message, instead of failing here.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    Register { password: Option<String> },
    Login { password: Option<String> },
    Logout,
    ChangePassword { password: Option<String> },
    Spawn,
}

impl Command {
    /// Parses a verb and its arguments.
    ///
    /// Verbs are case-insensitive and may carry the leading `/` players
    /// type in chat. Only the first argument is used as the password.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownCommand`] for any other verb.
    pub fn parse(verb: &str, args: &[String]) -> Result<Self, ProtocolError> {
        let password = args.first().cloned();
        let verb = verb.trim_start_matches('/').to_ascii_lowercase();
        match verb.as_str() {
            "register" => Ok(Self::Register { password }),
            "login" => Ok(Self::Login { password }),
            "logout" => Ok(Self::Logout),
            "changepassword" => Ok(Self::ChangePassword { password }),
            "spawn" => Ok(Self::Spawn),
            _ => Err(ProtocolError::UnknownCommand(verb)),
        }
    }

    /// Returns the verb of this command.
    pub fn verb(&self) -> Verb {
        match self {
            Self::Register { .. } => Verb::Register,
            Self::Login { .. } => Verb::Login,
            Self::Logout => Verb::Logout,
            Self::ChangePassword { .. } => Verb::ChangePassword,
            Self::Spawn => Verb::Spawn,
        }
    }
}

/// Never print passwords, not even in debug logs.
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register { password }
            | Self::Login { password }
            | Self::ChangePassword { password } => f
                .debug_struct(&self.verb().to_string())
                .field("password", &password.as_ref().map(|_| "<redacted>"))
                .finish(),
            Self::Logout | Self::Spawn => {
                f.write_str(&self.verb().to_string())
            }
        }
    }
}
