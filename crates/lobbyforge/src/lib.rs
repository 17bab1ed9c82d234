//! # Lobbyforge
//!
//! Authenticated lobby sessions for multiplayer game servers.
//!
//! Every player who connects is parked in a lobby world until they
//! register or log in. Lobbyforge captures what they carried on the way
//! in (inventory, location, vitals), keeps them from acting until they
//! authenticate, and hands everything back when they leave.
//!
//! The host game server implements [`PlayerHost`] and [`Notifier`],
//! feeds [`HostEvent`](lobbyforge_protocol::HostEvent)s into a channel,
//! and lets a [`LobbyServer`] consume them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lobbyforge::prelude::*;
//!
//! // Implement PlayerHost + Notifier for your server, then:
//! // let (tx, rx) = tokio::sync::mpsc::channel(256);
//! // let server = LobbyServer::builder()
//! //     .config_file("lobby.toml")?
//! //     .build_file_backed(my_host)?;
//! // server.run(rx).await
//! ```

mod config;
mod error;
mod handler;
mod host;
mod manager;
mod server;

pub use config::LobbyforgeConfig;
pub use error::{ConfigError, LobbyforgeError};
pub use handler::{dispatch, needs_storage, parse_command};
pub use host::{Notifier, PlayerHost};
pub use manager::{PendingConnect, SessionManager};
pub use server::{LobbyServer, LobbyServerBuilder};

/// Everything a host integration usually needs.
pub mod prelude {
    pub use lobbyforge_lobby::{LobbyConfig, LobbyError, SpawnRotator};
    pub use lobbyforge_protocol::{
        Command, GameMode, HostEvent, ItemStack, Location, MessageKey,
        PlayerId, PlayerState, WorldId,
    };
    pub use lobbyforge_session::{
        AuthStatus, Capability, CapabilityDiff, CredentialStore,
        FileCredentialStore, MemoryCredentialStore, SessionConfig,
        SessionError, StateUpdate,
    };

    pub use crate::{
        LobbyServer, LobbyforgeConfig, LobbyforgeError, Notifier, PlayerHost,
        SessionManager,
    };
}
