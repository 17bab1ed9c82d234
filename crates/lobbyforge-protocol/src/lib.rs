//! Shared types for Lobbyforge.
//!
//! This crate defines the vocabulary every other Lobbyforge crate speaks:
//!
//! - **Identity & world state** ([`PlayerId`], [`WorldId`], [`Location`],
//!   [`PlayerState`]): who a player is and what the host reports about
//!   them when they connect.
//! - **Host events** ([`HostEvent`], [`Command`]): the notifications the
//!   host environment feeds into the lobby (connect, disconnect, world
//!   change, typed commands).
//! - **Message keys** ([`MessageKey`]): symbolic names for user-facing
//!   texts. Formatting and localization belong to the host's notifier.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how host events are
//!   converted to/from bytes when they arrive over a pipe or a file.
//!
//! # Architecture
//!
//! ```text
//! Host environment (events) → Protocol (HostEvent) → Session / Lobby layers
//! ```

mod codec;
mod error;
mod event;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{Command, HostEvent, Verb};
pub use types::{
    GameMode, ItemStack, Location, MessageKey, PlayerId, PlayerState,
    WorldId,
};
