//! The session manager: wires sessions, auth, credentials and the lobby
//! together in response to host events.
//!
//! # Concurrency note
//!
//! `SessionManager` is shared as `Arc<SessionManager>` between the event
//! loop and the tasks it spawns. All of its state is internally
//! synchronized:
//!
//! - sessions live in a [`SessionStore`] (per-key `DashMap` locks)
//! - the spawn rotator sits behind a `parking_lot::Mutex`
//!
//! Neither lock is ever held across an `.await`. The only suspension
//! points are credential reads and writes, and every continuation that
//! resumes after one re-enters the store through a locked update.
//!
//! ## Connect lifecycle
//!
//! ```text
//! open_connect (sync, on the loop)
//!     │   session created or re-opened, epoch bumped
//!     ▼
//! settle_connect (async, spawned)
//!     │   load credentials if needed ──→ stale? (left / reconnected) ──→ drop
//!     ▼
//! resolve: AutoLogin ──→ notify
//!          Prompt    ──→ re-capture, welcome, teleport to spawn, reset
//! ```

use std::net::IpAddr;

use lobbyforge_lobby::{spawn_reset, LobbyConfig, LobbyError, SpawnRotator};
use lobbyforge_protocol::{
    Location, MessageKey, PlayerId, PlayerState, Verb, WorldId,
};
use lobbyforge_session::{
    AuthMachine, AuthStatus, CapabilityDiff, CapabilitySet, ConnectOutcome,
    CredentialStore, PlayerSession, RestoreMode, SessionConfig, SessionError,
    SessionStore, StateUpdate,
};
use parking_lot::Mutex;

use crate::{Notifier, PlayerHost};

/// A connect that has been opened but not yet settled.
///
/// Produced by [`SessionManager::open_connect`] and consumed by
/// [`SessionManager::settle_connect`].
#[derive(Debug, Clone)]
pub struct PendingConnect {
    pub player_id: PlayerId,
    pub address: IpAddr,
    pub state: PlayerState,
    pub epoch: u64,
    pub needs_load: bool,
}

/// Orchestrates every player's lobby visit.
pub struct SessionManager<C, H> {
    store: SessionStore,
    auth: AuthMachine,
    lobby: LobbyConfig,
    spawns: Mutex<SpawnRotator>,
    credentials: C,
    host: H,
}

impl<C, H> SessionManager<C, H>
where
    C: CredentialStore,
    H: PlayerHost + Notifier,
{
    /// Creates a manager.
    ///
    /// # Errors
    /// [`LobbyError::WrongWorld`] if the configured spawn points are not
    /// all in one world.
    pub fn new(
        session: SessionConfig,
        lobby: LobbyConfig,
        credentials: C,
        host: H,
    ) -> Result<Self, LobbyError> {
        let spawns = SpawnRotator::from_points(lobby.spawn_points.clone())?;
        if spawns.is_empty() {
            tracing::warn!("no spawn points configured");
        }
        Ok(Self {
            store: SessionStore::new(),
            auth: AuthMachine::new(session),
            lobby,
            spawns: Mutex::new(spawns),
            credentials,
            host,
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn auth(&self) -> &AuthMachine {
        &self.auth
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// The world of the first spawn point, if any.
    pub fn lobby_world(&self) -> Option<WorldId> {
        self.spawns.lock().lobby_world().cloned()
    }

    fn is_lobby(&self, world: &WorldId) -> bool {
        self.spawns.lock().is_lobby(world)
    }

    fn security_enabled(&self) -> bool {
        self.auth.config().security_enabled
    }

    fn restore_mode(&self, teleport: bool) -> RestoreMode {
        RestoreMode {
            teleport,
            inventory: self.lobby.inventory_handling_enabled,
        }
    }

    fn next_spawn(&self) -> Option<Location> {
        self.spawns.lock().next()
    }

    /// Teleports to the next spawn point and applies the arrival reset.
    fn send_to_lobby(&self, player_id: PlayerId, state: &PlayerState) {
        let spawn = self.next_spawn();
        if spawn.is_none() {
            tracing::warn!(%player_id, "no spawn point set, player not teleported");
            self.host.alert_operators(
                "No spawn point set yet: go to the lobby world and add one",
            );
        }
        let update = spawn_reset(
            state,
            spawn,
            self.lobby.inventory_handling_enabled,
            self.security_enabled(),
        );
        self.host.apply_state(player_id, &update);
    }

    fn give_back(&self, player_id: PlayerId, update: Option<StateUpdate>) {
        if let Some(update) = update {
            self.host.apply_state(player_id, &update);
        }
    }

    // -----------------------------------------------------------------------
    // Connect
    // -----------------------------------------------------------------------

    /// First, synchronous half of a connect.
    ///
    /// With security off the player is captured and sent to the lobby
    /// right away and `None` is returned. With security on the session is
    /// opened (so later events for this player see it) and the rest is
    /// left to [`settle_connect`](Self::settle_connect).
    pub fn open_connect(
        &self,
        player_id: PlayerId,
        address: IpAddr,
        state: PlayerState,
    ) -> Option<PendingConnect> {
        if !self.security_enabled() {
            self.store.capture(player_id, &state);
            self.send_to_lobby(player_id, &state);
            tracing::debug!(%player_id, "player sent to lobby, security disabled");
            return None;
        }

        let opened = self.store.open(player_id, &state);
        tracing::debug!(
            %player_id,
            created = opened.created,
            needs_load = opened.needs_load,
            epoch = opened.epoch,
            "connect opened"
        );
        Some(PendingConnect {
            player_id,
            address,
            state,
            epoch: opened.epoch,
            needs_load: opened.needs_load,
        })
    }

    /// Second half of a connect: load credentials, then welcome or
    /// auto-login.
    ///
    /// Does nothing further if the player disconnected or reconnected
    /// while the credentials were loading.
    pub async fn settle_connect(&self, pending: PendingConnect) {
        let PendingConnect {
            player_id,
            address,
            state,
            epoch,
            needs_load,
        } = pending;

        if needs_load {
            match self.credentials.load(player_id).await {
                Ok(digest) => {
                    let current =
                        self.store.update_current(player_id, epoch, |s| {
                            self.auth.apply_loaded_credential(s, digest);
                        });
                    if current.is_none() {
                        tracing::debug!(%player_id, epoch, "stale connect dropped after credential load");
                        return;
                    }
                }
                Err(e) => {
                    self.credential_load_failed(player_id, epoch, &state, e);
                    return;
                }
            }
        }

        let resolved = self.store.update_current(player_id, epoch, |s| {
            let outcome = self.auth.resolve_connect(s, address);
            if matches!(outcome, ConnectOutcome::Prompt { .. }) {
                s.capture(state.clone());
            }
            (outcome, initial_grant(s))
        });
        let Some((outcome, grant)) = resolved else {
            tracing::debug!(%player_id, epoch, "stale connect dropped");
            return;
        };

        self.host.apply_capabilities(player_id, &grant);
        match outcome {
            ConnectOutcome::AutoLogin => {
                tracing::info!(%player_id, %address, "auto-login");
                self.host.notify(player_id, MessageKey::AutoLogin);
            }
            ConnectOutcome::Prompt { status, .. } => {
                tracing::debug!(%player_id, %status, "prompting player");
                self.host.notify(player_id, AuthMachine::welcome_key(status));
                self.send_to_lobby(player_id, &state);
            }
        }
    }

    /// The player stays locked (still loading) until a later connect
    /// manages to read the record.
    fn credential_load_failed(
        &self,
        player_id: PlayerId,
        epoch: u64,
        state: &PlayerState,
        err: lobbyforge_session::CredentialError,
    ) {
        tracing::error!(%player_id, error = %err, "credential load failed");
        self.host.alert_operators(&format!(
            "Could not read credentials for {player_id}: {err}"
        ));
        let current = self
            .store
            .update_current(player_id, epoch, |s| s.capture(state.clone()));
        if current.is_some() {
            self.host.notify(player_id, MessageKey::CredentialsPending);
            self.send_to_lobby(player_id, state);
        }
    }

    /// Both halves of a connect, awaited in place.
    pub async fn on_connect(
        &self,
        player_id: PlayerId,
        address: IpAddr,
        state: PlayerState,
    ) {
        if let Some(pending) = self.open_connect(player_id, address, state) {
            self.settle_connect(pending).await;
        }
    }

    // -----------------------------------------------------------------------
    // Disconnect and world changes
    // -----------------------------------------------------------------------

    /// A player left while standing in `world`.
    ///
    /// The session is kept (for auto-login) but marked offline, so any
    /// connect still settling for it gives up. Leaving from the lobby
    /// hands the captured state back, location included.
    pub fn on_disconnect(&self, player_id: PlayerId, world: &WorldId) {
        self.store.mark_offline(player_id);
        if self.is_lobby(world) {
            let update = self.store.restore(player_id, self.restore_mode(true));
            tracing::debug!(%player_id, restored = update.is_some(), "disconnect from lobby");
            self.give_back(player_id, update);
        }
    }

    /// A player moved from `from` to `to`.
    ///
    /// Only leaving the lobby matters. Going back to the captured world
    /// restores everything including the location; going to some third
    /// world restores everything but the location.
    pub fn on_world_change(
        &self,
        player_id: PlayerId,
        from: &WorldId,
        to: &WorldId,
    ) {
        if !self.is_lobby(from) {
            return;
        }
        let Some(captured) = self.store.captured_world(player_id) else {
            return;
        };

        let teleport = if *to == captured {
            true
        } else if !self.is_lobby(to) {
            false
        } else {
            return;
        };
        tracing::debug!(%player_id, %from, %to, teleport, "left the lobby");
        let update = self.store.restore(player_id, self.restore_mode(teleport));
        self.give_back(player_id, update);
    }

    /// Rescues a player who fell out of the lobby world. Returns `true`
    /// if they were teleported.
    pub fn on_move(&self, player_id: PlayerId, location: &Location) -> bool {
        if location.y >= 0.0 || !self.is_lobby(&location.world) {
            return false;
        }
        let Some(spawn) = self.next_spawn() else {
            return false;
        };
        tracing::debug!(%player_id, y = location.y, "fell out of the lobby");
        self.host.apply_state(player_id, &StateUpdate::teleport(spawn));
        true
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Runs `f` on the player's session, after the checks every auth
    /// command shares.
    fn with_session<R>(
        &self,
        player_id: PlayerId,
        f: impl FnOnce(&mut PlayerSession) -> Result<R, SessionError>,
    ) -> Result<R, SessionError> {
        if !self.security_enabled() {
            return Err(SessionError::SecurityDisabled);
        }
        self.store
            .update(player_id, f)
            .ok_or(SessionError::NoSession(player_id))?
    }

    /// Writes a pending digest, dropping the attempt if the write fails.
    async fn persist_pending(
        &self,
        player_id: PlayerId,
        digest: &str,
    ) -> Result<(), SessionError> {
        if let Err(e) = self.credentials.persist(player_id, digest).await {
            self.store
                .update(player_id, |s| self.auth.abort_pending(s, digest));
            tracing::error!(%player_id, error = %e, "credential write failed");
            self.host.alert_operators(&format!(
                "Could not save credentials for {player_id}: {e}"
            ));
            return Err(e.into());
        }
        Ok(())
    }

    /// Tells the player how their command went.
    fn report(
        &self,
        player_id: PlayerId,
        verb: Verb,
        result: &Result<(), SessionError>,
        success: MessageKey,
    ) {
        match result {
            Ok(()) => self.host.notify(player_id, success),
            Err(e) => {
                match e {
                    SessionError::AuthFailed(_) => {
                        tracing::warn!(%player_id, "wrong password");
                    }
                    SessionError::Persistence(_) => {}
                    other => {
                        tracing::debug!(%player_id, %verb, error = %other, "command refused");
                    }
                }
                self.host.notify(player_id, e.message_key(verb));
            }
        }
    }

    /// `register <password>`: `Unregistered → LoggedIn`, once the
    /// credential is safely stored.
    pub async fn register(
        &self,
        player_id: PlayerId,
        password: Option<&str>,
    ) -> Result<(), SessionError> {
        let result = self.try_register(player_id, password).await;
        self.report(player_id, Verb::Register, &result, MessageKey::RegisterSuccess);
        result
    }

    async fn try_register(
        &self,
        player_id: PlayerId,
        password: Option<&str>,
    ) -> Result<(), SessionError> {
        let digest = self.with_session(player_id, |s| {
            self.auth.begin_register(s, password)
        })?;

        self.persist_pending(player_id, &digest).await?;

        let diff = self
            .store
            .update(player_id, |s| self.auth.commit_register(s, &digest))
            .flatten()
            .ok_or(SessionError::NoSession(player_id))?;
        self.host.apply_capabilities(player_id, &diff);
        tracing::info!(%player_id, "player registered");
        Ok(())
    }

    /// `login <password>`: `Registered → LoggedIn` and the operator flag
    /// the player had before the lobby is given back.
    pub fn login(
        &self,
        player_id: PlayerId,
        password: Option<&str>,
    ) -> Result<(), SessionError> {
        let result = self
            .with_session(player_id, |s| {
                let diff = self.auth.login(s, password)?;
                Ok((diff, s.snapshot().operator))
            })
            .map(|(diff, operator)| {
                self.host.apply_capabilities(player_id, &diff);
                self.host.set_operator(player_id, operator);
                tracing::info!(%player_id, "player logged in");
            });
        self.report(player_id, Verb::Login, &result, MessageKey::LoginSuccessful);
        result
    }

    /// `changepassword <password>`: re-hash and store. Only while logged
    /// in.
    pub async fn change_password(
        &self,
        player_id: PlayerId,
        password: Option<&str>,
    ) -> Result<(), SessionError> {
        let result = self.try_change_password(player_id, password).await;
        self.report(
            player_id,
            Verb::ChangePassword,
            &result,
            MessageKey::ChangePasswordSuccess,
        );
        result
    }

    async fn try_change_password(
        &self,
        player_id: PlayerId,
        password: Option<&str>,
    ) -> Result<(), SessionError> {
        let digest = self.with_session(player_id, |s| {
            self.auth.begin_change_password(s, password)
        })?;

        self.persist_pending(player_id, &digest).await?;

        let committed = self
            .store
            .update(player_id, |s| self.auth.commit_change_password(s, &digest))
            .unwrap_or(false);
        if !committed {
            return Err(SessionError::NoSession(player_id));
        }
        tracing::info!(%player_id, "password changed");
        Ok(())
    }

    /// `logout`: the session is destroyed and the player kicked.
    ///
    /// If they are in the lobby their captured state is handed back
    /// first. Anywhere else it was already handed back on the way out.
    pub fn logout(&self, player_id: PlayerId) -> Result<(), SessionError> {
        let result = self.try_logout(player_id);
        if let Err(e) = &result {
            tracing::debug!(%player_id, error = %e, "logout refused");
            self.host.notify(player_id, e.message_key(Verb::Logout));
        }
        result
    }

    fn try_logout(&self, player_id: PlayerId) -> Result<(), SessionError> {
        self.with_session(player_id, |s| self.auth.check_logout(s))?;

        let in_lobby = self
            .host
            .online_players()
            .into_iter()
            .any(|(id, world)| id == player_id && self.is_lobby(&world));
        let update = self
            .store
            .take_restore(player_id, self.restore_mode(true))
            .ok_or(SessionError::NoSession(player_id))?;
        if in_lobby {
            self.host.apply_state(player_id, &update);
        }
        self.host.kick(player_id, MessageKey::LogoutKick);
        tracing::info!(%player_id, "player logged out");
        Ok(())
    }

    /// `spawn`: teleports the player to the next lobby spawn point, from
    /// whatever world they are in.
    ///
    /// Returns `Ok(false)` when the override is off and the host should
    /// run its own command.
    pub fn spawn(&self, player_id: PlayerId) -> Result<bool, LobbyError> {
        if !self.lobby.override_spawn_command {
            return Ok(false);
        }
        let spawn = self.next_spawn().ok_or(LobbyError::NoSpawnPoints)?;
        self.host.apply_state(player_id, &StateUpdate::teleport(spawn));
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Gating
    // -----------------------------------------------------------------------

    /// May this player act? Always `true` with security off.
    pub fn is_allowed(&self, player_id: PlayerId) -> bool {
        self.store
            .view(player_id, |s| self.auth.is_allowed(Some(s)))
            .unwrap_or_else(|| self.auth.is_allowed(None))
    }

    /// Like [`is_allowed`](Self::is_allowed), but also tells a denied
    /// player why.
    pub fn check_allowed(&self, player_id: PlayerId) -> bool {
        if self.is_allowed(player_id) {
            return true;
        }
        let status = self
            .store
            .status(player_id)
            .unwrap_or(AuthStatus::Unregistered);
        self.host.notify(player_id, AuthMachine::denial_key(status));
        false
    }

    // -----------------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------------

    /// Adds a spawn point. The first one decides the lobby world.
    pub fn add_spawn_point(&self, location: Location) -> Result<(), LobbyError> {
        let mut spawns = self.spawns.lock();
        spawns.add(location)?;
        tracing::info!(count = spawns.len(), "spawn point added");
        Ok(())
    }

    /// Hands back the state of everyone in the lobby, kicks every online
    /// player and forgets all sessions. Returns how many sessions were
    /// dropped.
    pub fn shutdown(&self) -> usize {
        for (player_id, world) in self.host.online_players() {
            if self.is_lobby(&world) {
                let update =
                    self.store.restore(player_id, self.restore_mode(true));
                self.give_back(player_id, update);
            }
            self.host.kick(player_id, MessageKey::LogoutKick);
        }
        let dropped = self.store.drain().len();
        tracing::info!(dropped, "all sessions drained");
        dropped
    }
}

/// The full capability set of a session, as a grant. A fresh connection
/// starts with nothing on the host side.
fn initial_grant(session: &PlayerSession) -> CapabilityDiff {
    CapabilityDiff::between(&CapabilitySet::new(), session.capabilities())
}
