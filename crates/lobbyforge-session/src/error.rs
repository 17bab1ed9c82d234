//! Error types for the session layer.

use lobbyforge_protocol::{MessageKey, PlayerId, Verb};

use crate::AuthStatus;

/// A password was rejected by the password policy.
///
/// Reported to the player who typed it. Never changes any state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The command was sent without a password (or with only whitespace).
    #[error("no password given")]
    MissingPassword,

    /// The password has fewer characters than the configured minimum.
    #[error("password must be at least {min} characters long")]
    TooShort { min: usize },

    /// The password is on the server's disallowed list.
    #[error("password is not allowed")]
    Disallowed,
}

/// Errors from reading or writing credential records.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The underlying file operation failed.
    #[error("credential i/o failed for player {player_id}: {source}")]
    Io {
        player_id: PlayerId,
        source: std::io::Error,
    },

    /// A credential file exists but isn't a valid record.
    #[error("credential record for player {player_id} is malformed: {source}")]
    Malformed {
        player_id: PlayerId,
        source: serde_json::Error,
    },

    /// The backing store refused the operation for another reason
    /// (used by non-file stores).
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur while driving a player's session.
///
/// None of these are fatal: every one of them degrades to "the action is
/// denied" plus a message. [`message_key`](Self::message_key) picks that
/// message.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The password failed the policy check.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Wrong password. No lockout or backoff is applied.
    #[error("wrong password for player {0}")]
    AuthFailed(PlayerId),

    /// The command doesn't apply to the player's current status
    /// (e.g. `register` while already registered).
    #[error("player {player_id} cannot do that while {status}")]
    InvalidState {
        player_id: PlayerId,
        status: AuthStatus,
    },

    /// No session is tracked for this player.
    #[error("no session for player {0}")]
    NoSession(PlayerId),

    /// The player's credential record hasn't been read yet (or reading
    /// it failed). Every command is refused until it has.
    #[error("credentials for player {0} are still loading")]
    CredentialsPending(PlayerId),

    /// A register or change-password for this player is already waiting
    /// on storage.
    #[error("a credential change for player {0} is already in flight")]
    AttemptInFlight(PlayerId),

    /// Authentication commands are meaningless with security disabled.
    #[error("lobby security is disabled")]
    SecurityDisabled,

    /// Writing the credential record failed. The session was left in its
    /// pre-attempt status.
    #[error(transparent)]
    Persistence(#[from] CredentialError),
}

impl SessionError {
    /// The message to show the player who issued `verb` and got this
    /// error back.
    pub fn message_key(&self, verb: Verb) -> MessageKey {
        match self {
            Self::Validation(err) => validation_key(err, verb),
            Self::AuthFailed(_) => MessageKey::LoginUnsuccessful,
            Self::InvalidState { status, .. } => state_key(*status, verb),
            Self::NoSession(_) => state_key(AuthStatus::Unregistered, verb),
            Self::CredentialsPending(_) => MessageKey::CredentialsPending,
            Self::AttemptInFlight(_) => MessageKey::AttemptInFlight,
            Self::SecurityDisabled => MessageKey::SecurityDisabled,
            Self::Persistence(_) => MessageKey::StorageFailure,
        }
    }
}

fn validation_key(err: &ValidationError, verb: Verb) -> MessageKey {
    match (verb, err) {
        (Verb::ChangePassword, ValidationError::MissingPassword) => {
            MessageKey::ChangePasswordMissingPassword
        }
        (Verb::ChangePassword, ValidationError::TooShort { .. }) => {
            MessageKey::ChangePasswordTooShort
        }
        (Verb::ChangePassword, ValidationError::Disallowed) => {
            MessageKey::ChangePasswordDisallowed
        }
        (Verb::Login, _) => MessageKey::LoginMissingPassword,
        (_, ValidationError::MissingPassword) => {
            MessageKey::RegisterMissingPassword
        }
        (_, ValidationError::TooShort { .. }) => MessageKey::RegisterTooShort,
        (_, ValidationError::Disallowed) => MessageKey::RegisterDisallowed,
    }
}

fn state_key(status: AuthStatus, verb: Verb) -> MessageKey {
    match (verb, status) {
        (Verb::Register, AuthStatus::Unregistered) => {
            MessageKey::UnregisteredNotAllowed
        }
        (Verb::Register, _) => MessageKey::RegisterAlreadyRegistered,
        (Verb::Login, AuthStatus::Unregistered) => {
            MessageKey::LoginNotRegistered
        }
        (Verb::Login, _) => MessageKey::LoginAlreadyLogged,
        (Verb::ChangePassword, AuthStatus::Unregistered) => {
            MessageKey::ChangePasswordNotRegistered
        }
        (Verb::ChangePassword, _) => MessageKey::ChangePasswordNotLogged,
        (Verb::Logout, _) => MessageKey::LogoutNotLogged,
        (Verb::Spawn, AuthStatus::Unregistered) => {
            MessageKey::UnregisteredNotAllowed
        }
        (Verb::Spawn, _) => MessageKey::RegisteredNotAllowed,
    }
}
