//! The host seam: how the lobby talks back to the game server.
//!
//! Lobbyforge never owns players. It reacts to [`HostEvent`]s and tells
//! the host what to change through these two traits. A real deployment
//! implements them on top of its game server; tests implement them with
//! a recorder.
//!
//! All methods are synchronous: they hand an instruction to the host and
//! return. The host is expected to queue the work onto its own thread if
//! it needs to.
//!
//! [`HostEvent`]: lobbyforge_protocol::HostEvent

use lobbyforge_protocol::{MessageKey, PlayerId, WorldId};
use lobbyforge_session::{CapabilityDiff, StateUpdate};

/// Controls players on the host.
pub trait PlayerHost: Send + Sync + 'static {
    /// Applies `update` to the player. A teleport, if present, happens
    /// before anything else.
    fn apply_state(&self, player_id: PlayerId, update: &StateUpdate);

    /// Grants and revokes capabilities, however the host represents them.
    fn apply_capabilities(&self, player_id: PlayerId, diff: &CapabilityDiff);

    /// Sets the operator flag.
    fn set_operator(&self, player_id: PlayerId, operator: bool) {
        self.apply_state(player_id, &StateUpdate::operator(operator));
    }

    /// Disconnects the player, showing `reason`.
    fn kick(&self, player_id: PlayerId, reason: MessageKey);

    /// Every connected player and the world they are in right now.
    fn online_players(&self) -> Vec<(PlayerId, WorldId)>;
}

/// Sends text to players and operators.
pub trait Notifier: Send + Sync + 'static {
    /// Shows the message for `key` to one player. Formatting and
    /// localization are up to the host.
    fn notify(&self, player_id: PlayerId, key: MessageKey);

    /// Tells operators something needs their attention (a failed write,
    /// a missing spawn point).
    fn alert_operators(&self, text: &str);
}
