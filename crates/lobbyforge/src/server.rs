//! `LobbyServer` builder and event loop.
//!
//! The host feeds [`HostEvent`]s into an `mpsc` channel; the server reads
//! them one at a time. Synchronous transitions run inline, so the loop
//! sees events for a player in the order the host sent them. Work that
//! waits on credential storage is spawned into a `JoinSet` and awaited
//! before shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lobbyforge_lobby::LobbyConfig;
use lobbyforge_protocol::{HostEvent, PlayerId};
use lobbyforge_session::{CredentialStore, FileCredentialStore, SessionConfig};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::handler::{dispatch, needs_storage, parse_command};
use crate::{LobbyforgeConfig, LobbyforgeError, Notifier, PlayerHost, SessionManager};

/// Builder for configuring and starting a lobby server.
///
/// # Example
///
/// ```rust,ignore
/// use lobbyforge::prelude::*;
///
/// let server = LobbyServer::builder()
///     .config_file("lobby.toml")?
///     .build_file_backed(my_host)?;
/// server.run(events).await
/// ```
pub struct LobbyServerBuilder {
    config: LobbyforgeConfig,
}

impl LobbyServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: LobbyforgeConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: LobbyforgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the whole configuration with the contents of a TOML file.
    ///
    /// # Errors
    /// [`LobbyforgeError::Config`] if the file can't be read or parsed.
    pub fn config_file(
        self,
        path: impl AsRef<Path>,
    ) -> Result<Self, LobbyforgeError> {
        Ok(self.config(LobbyforgeConfig::load(path)?))
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Sets the lobby configuration.
    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.config.lobby = config;
        self
    }

    /// Sets where credential records are kept (file-backed builds only).
    pub fn credentials_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.credentials_dir = dir.into();
        self
    }

    /// Builds a server around the given credential store and host.
    pub fn build<C, H>(
        self,
        credentials: C,
        host: H,
    ) -> Result<LobbyServer<C, H>, LobbyforgeError>
    where
        C: CredentialStore,
        H: PlayerHost + Notifier,
    {
        let manager = SessionManager::new(
            self.config.session,
            self.config.lobby,
            credentials,
            host,
        )?;
        Ok(LobbyServer {
            manager: Arc::new(manager),
            tasks: JoinSet::new(),
        })
    }

    /// Builds a server that keeps credentials under `credentials_dir`.
    pub fn build_file_backed<H>(
        self,
        host: H,
    ) -> Result<LobbyServer<FileCredentialStore, H>, LobbyforgeError>
    where
        H: PlayerHost + Notifier,
    {
        let store = FileCredentialStore::new(self.config.credentials_dir.clone());
        self.build(store, host)
    }
}

impl Default for LobbyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A lobby server, ready to consume host events.
///
/// Call [`run()`](Self::run) with the receiving end of the host's event
/// channel.
pub struct LobbyServer<C, H> {
    manager: Arc<SessionManager<C, H>>,
    tasks: JoinSet<()>,
}

impl<C, H> LobbyServer<C, H>
where
    C: CredentialStore,
    H: PlayerHost + Notifier,
{
    /// Creates a new builder.
    pub fn builder() -> LobbyServerBuilder {
        LobbyServerBuilder::new()
    }

    /// The manager, for hosts that also want to call
    /// [`check_allowed`](SessionManager::check_allowed) directly.
    pub fn manager(&self) -> &Arc<SessionManager<C, H>> {
        &self.manager
    }

    /// Runs the event loop until a [`HostEvent::Shutdown`] arrives or the
    /// channel closes.
    ///
    /// On the way out every in-flight task is awaited, then everyone in
    /// the lobby gets their state back and every online player is kicked.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<HostEvent>,
    ) -> Result<(), LobbyforgeError> {
        tracing::info!("lobby server running");

        while let Some(event) = events.recv().await {
            while let Some(joined) = self.tasks.try_join_next() {
                log_task_result(joined);
            }
            if matches!(event, HostEvent::Shutdown) {
                tracing::info!("shutdown requested");
                break;
            }
            self.handle_event(event).await;
        }

        self.flush().await;
        let dropped = self.manager.shutdown();
        tracing::info!(dropped, "lobby server stopped");
        Ok(())
    }

    /// Waits for every spawned task to finish.
    async fn flush(&mut self) {
        let pending = self.tasks.len();
        if pending > 0 {
            tracing::debug!(pending, "waiting for in-flight tasks");
        }
        while let Some(joined) = self.tasks.join_next().await {
            log_task_result(joined);
        }
    }

    async fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Connect {
                player_id,
                address,
                state,
            } => {
                if let Some(pending) =
                    self.manager.open_connect(player_id, address, state)
                {
                    let manager = Arc::clone(&self.manager);
                    self.tasks.spawn(async move {
                        manager.settle_connect(pending).await;
                    });
                }
            }
            HostEvent::Disconnect { player_id, world } => {
                self.manager.on_disconnect(player_id, &world);
            }
            HostEvent::WorldChange {
                player_id,
                from,
                to,
            } => {
                self.manager.on_world_change(player_id, &from, &to);
            }
            HostEvent::Move {
                player_id,
                location,
            } => {
                self.manager.on_move(player_id, &location);
            }
            HostEvent::Command {
                player_id,
                verb,
                args,
            } => self.handle_command(player_id, &verb, &args).await,
            HostEvent::AddSpawnPoint { location } => {
                if let Err(e) = self.manager.add_spawn_point(location) {
                    tracing::warn!(error = %e, "spawn point rejected");
                    self.manager.host().alert_operators(&e.to_string());
                }
            }
            HostEvent::Shutdown => {}
        }
    }

    async fn handle_command(
        &mut self,
        player_id: PlayerId,
        verb: &str,
        args: &[String],
    ) {
        let command = match parse_command(verb, args) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "command left to the host");
                return;
            }
        };

        if needs_storage(&command) {
            let manager = Arc::clone(&self.manager);
            self.tasks.spawn(async move {
                if let Err(e) = dispatch(&manager, player_id, command).await {
                    tracing::debug!(%player_id, error = %e, "command failed");
                }
            });
        } else if let Err(e) = dispatch(&self.manager, player_id, command).await
        {
            tracing::debug!(%player_id, error = %e, "command failed");
        }
    }
}

fn log_task_result(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "lobby task panicked");
    }
}
