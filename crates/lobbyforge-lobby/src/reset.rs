//! The state every player is put into on arrival in the lobby.

use lobbyforge_protocol::{GameMode, Location, PlayerState};
use lobbyforge_session::StateUpdate;

/// Food level given to every player in the lobby.
pub const LOBBY_FOOD_LEVEL: u32 = 20;

/// Builds the arrival update for a player currently in `current`.
///
/// Moves them to `spawn` (if any), fills food and health, puts them in
/// adventure mode with no experience and no flight. The inventory is
/// emptied only when `clear_inventory` is set, and the operator flag is
/// revoked only when `revoke_operator` is set (security on). Both come
/// back with the snapshot on exit.
pub fn spawn_reset(
    current: &PlayerState,
    spawn: Option<Location>,
    clear_inventory: bool,
    revoke_operator: bool,
) -> StateUpdate {
    StateUpdate {
        teleport: spawn,
        food_level: Some(LOBBY_FOOD_LEVEL),
        inventory: clear_inventory.then(Vec::new),
        game_mode: Some(GameMode::Adventure),
        experience: Some(0.0),
        total_experience: Some(0),
        health: Some(current.max_health),
        allow_flight: Some(false),
        flying: Some(false),
        operator: revoke_operator.then_some(false),
    }
}
