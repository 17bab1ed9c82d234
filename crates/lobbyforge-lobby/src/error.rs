//! Error types for the lobby layer.

use lobbyforge_protocol::WorldId;

/// Errors that can occur while managing the lobby.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    /// Every spawn point must be in the same world as the first one.
    #[error("spawn point is in world {got}, but the lobby is {expected}")]
    WrongWorld { expected: WorldId, got: WorldId },

    /// An operation needed a spawn point and none are configured.
    #[error("no spawn points configured")]
    NoSpawnPoints,
}
