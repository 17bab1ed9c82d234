//! The authentication state machine.
//!
//! [`AuthMachine`] never does I/O and never touches the session map. Each
//! method takes one `&mut PlayerSession` (the caller holds that session's
//! entry lock) and either performs a transition or explains why it can't.
//!
//! Commands that need storage are split in two:
//!
//! ```text
//! begin_register ──→ (persist, no lock held) ──→ commit_register
//!                                  │
//!                                  └── on failure ──→ abort_pending
//! ```
//!
//! The status only moves in the commit step, so a failed write leaves the
//! player exactly where they were.

use std::net::IpAddr;

use lobbyforge_protocol::{MessageKey, PlayerId};
use sha2::{Digest, Sha256};

use crate::{
    AuthStatus, CapabilityDiff, PlayerSession, SessionConfig, SessionError,
    ValidationError,
};

/// Hashes a password with the player's id as salt.
///
/// SHA-256 over `plaintext ++ salt`, rendered as lowercase hex. The salt
/// is the hyphenated UUID, so two players with the same password get
/// different digests.
pub fn hash_password(salt: PlayerId, plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hasher.update(salt.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// What a connect ended up as, once credentials are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Same address as last time and still logged in: no prompt.
    AutoLogin,
    /// The player has to register or log in. `diff` is non-empty when a
    /// logged-in player was demoted.
    Prompt {
        status: AuthStatus,
        diff: CapabilityDiff,
    },
}

/// Drives [`PlayerSession::status`] through its transitions.
#[derive(Debug, Clone, Default)]
pub struct AuthMachine {
    config: SessionConfig,
}

impl AuthMachine {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Password policy
    // -----------------------------------------------------------------------

    /// Checks a new password against the policy.
    ///
    /// # Errors
    /// - [`ValidationError::MissingPassword`]: absent, empty or blank
    /// - [`ValidationError::TooShort`]: fewer characters than configured
    /// - [`ValidationError::Disallowed`]: on the disallowed list
    pub fn validate_password<'a>(
        &self,
        password: Option<&'a str>,
    ) -> Result<&'a str, ValidationError> {
        let password = match password {
            Some(pw) if !pw.trim().is_empty() => pw,
            _ => return Err(ValidationError::MissingPassword),
        };

        let min = self.config.min_password_length;
        if password.chars().count() < min {
            return Err(ValidationError::TooShort { min });
        }

        let lowered = password.to_lowercase();
        if self
            .config
            .disallowed_passwords
            .iter()
            .any(|banned| banned.to_lowercase() == lowered)
        {
            return Err(ValidationError::Disallowed);
        }

        Ok(password)
    }

    /// Guards shared by every auth command.
    fn ensure_commandable(
        &self,
        session: &PlayerSession,
    ) -> Result<(), SessionError> {
        if !self.config.security_enabled {
            return Err(SessionError::SecurityDisabled);
        }
        if session.credentials_loading() {
            return Err(SessionError::CredentialsPending(session.player_id()));
        }
        Ok(())
    }

    fn ensure_status(
        session: &PlayerSession,
        expected: AuthStatus,
    ) -> Result<(), SessionError> {
        if session.status() != expected {
            return Err(SessionError::InvalidState {
                player_id: session.player_id(),
                status: session.status(),
            });
        }
        Ok(())
    }

    fn ensure_no_attempt(session: &PlayerSession) -> Result<(), SessionError> {
        if session.pending_credential().is_some() {
            return Err(SessionError::AttemptInFlight(session.player_id()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // register
    // -----------------------------------------------------------------------

    /// First half of `register`: validates and marks the attempt pending.
    ///
    /// Returns the digest the caller must persist before calling
    /// [`commit_register`](Self::commit_register).
    pub fn begin_register(
        &self,
        session: &mut PlayerSession,
        password: Option<&str>,
    ) -> Result<String, SessionError> {
        self.ensure_commandable(session)?;
        Self::ensure_status(session, AuthStatus::Unregistered)?;
        Self::ensure_no_attempt(session)?;
        let password = self.validate_password(password)?;

        let digest = hash_password(session.player_id(), password);
        session.set_pending_credential(Some(digest.clone()));
        Ok(digest)
    }

    /// Second half of `register`, after the digest is on disk.
    ///
    /// Walks `Unregistered → Registered → LoggedIn` and returns the folded
    /// capability diff. Returns `None` if the session no longer carries
    /// this attempt (removed and recreated, for instance).
    pub fn commit_register(
        &self,
        session: &mut PlayerSession,
        digest: &str,
    ) -> Option<CapabilityDiff> {
        if session.pending_credential() != Some(digest)
            || session.status() != AuthStatus::Unregistered
        {
            return None;
        }

        session.set_pending_credential(None);
        session.set_hashed_credential(Some(digest.to_string()));
        let diff = session
            .transition(AuthStatus::Registered)
            .then(session.transition(AuthStatus::LoggedIn));
        Some(diff)
    }

    /// Drops a pending attempt after its write failed. Status is untouched.
    pub fn abort_pending(&self, session: &mut PlayerSession, digest: &str) {
        if session.pending_credential() == Some(digest) {
            session.set_pending_credential(None);
        }
    }

    // -----------------------------------------------------------------------
    // login
    // -----------------------------------------------------------------------

    /// `Registered → LoggedIn` if the password matches the stored digest.
    ///
    /// The password policy is not applied here: a stored password may
    /// predate the current policy. Only a missing password is rejected.
    pub fn login(
        &self,
        session: &mut PlayerSession,
        password: Option<&str>,
    ) -> Result<CapabilityDiff, SessionError> {
        self.ensure_commandable(session)?;
        Self::ensure_status(session, AuthStatus::Registered)?;
        let password = match password {
            Some(pw) if !pw.trim().is_empty() => pw,
            _ => return Err(ValidationError::MissingPassword.into()),
        };

        let candidate = hash_password(session.player_id(), password);
        if session.hashed_credential() != Some(candidate.as_str()) {
            return Err(SessionError::AuthFailed(session.player_id()));
        }

        Ok(session.transition(AuthStatus::LoggedIn))
    }

    // -----------------------------------------------------------------------
    // changepassword
    // -----------------------------------------------------------------------

    /// First half of `changepassword`. Only valid while logged in.
    pub fn begin_change_password(
        &self,
        session: &mut PlayerSession,
        password: Option<&str>,
    ) -> Result<String, SessionError> {
        self.ensure_commandable(session)?;
        Self::ensure_status(session, AuthStatus::LoggedIn)?;
        Self::ensure_no_attempt(session)?;
        let password = self.validate_password(password)?;

        let digest = hash_password(session.player_id(), password);
        session.set_pending_credential(Some(digest.clone()));
        Ok(digest)
    }

    /// Second half of `changepassword`. Returns `false` if the attempt is
    /// stale.
    pub fn commit_change_password(
        &self,
        session: &mut PlayerSession,
        digest: &str,
    ) -> bool {
        if session.pending_credential() != Some(digest) {
            return false;
        }
        session.set_pending_credential(None);
        session.set_hashed_credential(Some(digest.to_string()));
        true
    }

    // -----------------------------------------------------------------------
    // logout
    // -----------------------------------------------------------------------

    /// Checks that `logout` is allowed. The caller removes the session.
    ///
    /// Refused while a password change is waiting on storage, so the
    /// player is always told how that write ended.
    pub fn check_logout(
        &self,
        session: &PlayerSession,
    ) -> Result<(), SessionError> {
        self.ensure_commandable(session)?;
        Self::ensure_status(session, AuthStatus::LoggedIn)?;
        Self::ensure_no_attempt(session)
    }

    // -----------------------------------------------------------------------
    // connect
    // -----------------------------------------------------------------------

    /// Records the result of the initial credential load.
    ///
    /// A record moves an `Unregistered` session to `Registered`. Sessions
    /// that already moved on (registered in the meantime) are left alone.
    pub fn apply_loaded_credential(
        &self,
        session: &mut PlayerSession,
        digest: Option<String>,
    ) -> CapabilityDiff {
        session.set_credentials_loading(false);
        match digest {
            Some(digest) if session.status() == AuthStatus::Unregistered => {
                session.set_hashed_credential(Some(digest));
                session.transition(AuthStatus::Registered)
            }
            _ => CapabilityDiff::default(),
        }
    }

    /// Decides auto-login vs. prompt for a connect from `address`.
    ///
    /// Eligible when security and auto-login are on, the player is still
    /// `LoggedIn` from last time and `address` matches the last recorded
    /// one. An ineligible `LoggedIn` player is demoted to `Registered`.
    /// On every prompt path the new address is recorded.
    pub fn resolve_connect(
        &self,
        session: &mut PlayerSession,
        address: IpAddr,
    ) -> ConnectOutcome {
        let eligible = self.config.security_enabled
            && self.config.auto_login_enabled
            && session.status() == AuthStatus::LoggedIn
            && session.last_address() == Some(address);
        if eligible {
            return ConnectOutcome::AutoLogin;
        }

        let diff = if session.status() == AuthStatus::LoggedIn {
            session.transition(AuthStatus::Registered)
        } else {
            CapabilityDiff::default()
        };
        session.record_address(address);
        ConnectOutcome::Prompt {
            status: session.status(),
            diff,
        }
    }

    // -----------------------------------------------------------------------
    // gating
    // -----------------------------------------------------------------------

    /// May this player act? Untracked players may not while security is on.
    pub fn is_allowed(&self, session: Option<&PlayerSession>) -> bool {
        if !self.config.security_enabled {
            return true;
        }
        session.is_some_and(|s| {
            s.status() == AuthStatus::LoggedIn && !s.credentials_loading()
        })
    }

    /// The message shown when a player in `status` is denied an action.
    pub fn denial_key(status: AuthStatus) -> MessageKey {
        match status {
            AuthStatus::Unregistered => MessageKey::UnregisteredNotAllowed,
            _ => MessageKey::RegisteredNotAllowed,
        }
    }

    /// The message greeting a player who has to register or log in.
    pub fn welcome_key(status: AuthStatus) -> MessageKey {
        match status {
            AuthStatus::Unregistered => MessageKey::UnregisteredWelcome,
            _ => MessageKey::RegisteredWelcome,
        }
    }
}
