//! Lobby-side configuration.

use lobbyforge_protocol::Location;
use serde::{Deserialize, Serialize};

/// Settings for the lobby world and what happens to players inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Clear inventories on arrival and hand them back on exit. When
    /// `false` the lobby never touches inventories.
    pub inventory_handling_enabled: bool,

    /// Handle the `spawn` command by teleporting to the next spawn point.
    pub override_spawn_command: bool,

    /// Spawn points, in rotation order. All must be in one world.
    pub spawn_points: Vec<Location>,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            inventory_handling_enabled: true,
            override_spawn_command: true,
            spawn_points: Vec::new(),
        }
    }
}
