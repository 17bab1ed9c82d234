//! The lobby itself: where players stand while they authenticate.
//!
//! - [`SpawnRotator`] hands out spawn points round-robin and defines
//!   which world is "the lobby"
//! - [`spawn_reset`] builds the state every player gets on arrival
//! - [`LobbyConfig`] holds the lobby-side settings

mod config;
mod error;
mod reset;
mod spawn;

pub use config::LobbyConfig;
pub use error::LobbyError;
pub use reset::{spawn_reset, LOBBY_FOOD_LEVEL};
pub use spawn::SpawnRotator;
