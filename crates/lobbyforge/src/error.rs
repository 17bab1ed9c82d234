//! Unified error type for Lobbyforge.

use std::path::PathBuf;

use lobbyforge_lobby::LobbyError;
use lobbyforge_protocol::ProtocolError;
use lobbyforge_session::SessionError;

/// Errors from loading the TOML config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid TOML or doesn't match the schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LobbyforgeError {
    /// A host event or command could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An auth command was refused.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A lobby operation failed (bad spawn point, none configured).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The config file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
