//! Top-level configuration, loaded from TOML.
//!
//! ```toml
//! credentials_dir = "players"
//!
//! [session]
//! security_enabled = true
//! auto_login_enabled = true
//! min_password_length = 6
//! disallowed_passwords = ["password", "123456"]
//!
//! [lobby]
//! inventory_handling_enabled = true
//! override_spawn_command = true
//!
//! [[lobby.spawn_points]]
//! world = "lobby"
//! x = 0.5
//! y = 65.0
//! z = 0.5
//! yaw = 90.0
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};

use lobbyforge_lobby::LobbyConfig;
use lobbyforge_session::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Everything Lobbyforge can be configured with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyforgeConfig {
    pub session: SessionConfig,
    pub lobby: LobbyConfig,
    /// Directory holding one `<uuid>.json` credential record per player.
    pub credentials_dir: PathBuf,
}

impl Default for LobbyforgeConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            lobby: LobbyConfig::default(),
            credentials_dir: PathBuf::from("players"),
        }
    }
}

impl LobbyforgeConfig {
    /// Parses a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&text)
    }
}
