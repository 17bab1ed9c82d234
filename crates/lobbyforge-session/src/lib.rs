//! Player session management for Lobbyforge.
//!
//! This crate owns everything the lobby knows about a player between
//! the moment they connect and the moment they leave:
//!
//! 1. **Snapshots**: the inventory, position and vitals captured on the
//!    way into the lobby and handed back on the way out ([`SessionStore`])
//! 2. **Authentication**: the `Unregistered → Registered → LoggedIn`
//!    state machine and its password policy ([`AuthMachine`])
//! 3. **Capabilities**: what each status is allowed to do, recomputed on
//!    every transition ([`capabilities_for`], [`CapabilityDiff`])
//! 4. **Credentials**: salted digests persisted one file per player
//!    ([`CredentialStore`], [`FileCredentialStore`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Session manager (above)  ← orchestrates connects, commands, world changes
//!     ↕
//! Session Layer (this crate)  ← session records, auth transitions, credentials
//!     ↕
//! Protocol Layer (below)  ← provides PlayerId, PlayerState, MessageKey
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod capability;
mod credentials;
mod error;
mod session;
mod store;

pub use auth::{hash_password, AuthMachine, ConnectOutcome};
pub use capability::{capabilities_for, Capability, CapabilityDiff, CapabilitySet};
pub use credentials::{
    CredentialRecord, CredentialStore, FileCredentialStore,
    MemoryCredentialStore,
};
pub use error::{CredentialError, SessionError, ValidationError};
pub use session::{
    AuthStatus, PlayerSession, RestoreMode, SessionConfig, StateUpdate,
};
pub use store::{Opened, SessionStore};
