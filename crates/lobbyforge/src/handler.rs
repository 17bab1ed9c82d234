//! Command dispatch: parsed lobby commands to session manager calls.

use lobbyforge_protocol::{Command, PlayerId};
use lobbyforge_session::CredentialStore;

use crate::{LobbyforgeError, Notifier, PlayerHost, SessionManager};

/// Parses a raw verb and its arguments.
///
/// # Errors
/// [`LobbyforgeError::Protocol`] for verbs the lobby doesn't handle.
pub fn parse_command(
    verb: &str,
    args: &[String],
) -> Result<Command, LobbyforgeError> {
    Ok(Command::parse(verb, args)?)
}

/// `true` for commands that write credentials and should run off the
/// event loop.
pub fn needs_storage(command: &Command) -> bool {
    matches!(
        command,
        Command::Register { .. } | Command::ChangePassword { .. }
    )
}

/// Runs one command for `player_id`.
///
/// The player has already been told the outcome by the time this
/// returns. The error is for the caller's logs.
pub async fn dispatch<C, H>(
    manager: &SessionManager<C, H>,
    player_id: PlayerId,
    command: Command,
) -> Result<(), LobbyforgeError>
where
    C: CredentialStore,
    H: PlayerHost + Notifier,
{
    tracing::debug!(%player_id, ?command, "dispatching command");
    match command {
        Command::Register { password } => {
            manager.register(player_id, password.as_deref()).await?;
        }
        Command::Login { password } => {
            manager.login(player_id, password.as_deref())?;
        }
        Command::Logout => manager.logout(player_id)?,
        Command::ChangePassword { password } => {
            manager
                .change_password(player_id, password.as_deref())
                .await?;
        }
        Command::Spawn => {
            let handled = manager.spawn(player_id)?;
            tracing::debug!(%player_id, handled, "spawn command");
        }
    }
    Ok(())
}
