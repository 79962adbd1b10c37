//! Wire protocol for fourline.
//!
//! This crate defines the "language" that clients and the match server
//! speak:
//!
//! - **Identities** ([`HumanId`], [`Participant`], [`SessionId`]): who is
//!   playing and in which match.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): the messages that
//!   travel over a connection in each direction.
//! - **Results** ([`Outcome`], [`GameResult`], [`GameOverReason`]): how a
//!   match ended and what that means for each side.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events are converted
//!   to/from bytes.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the match
//! engine (queue + sessions). It knows nothing about timers or boards,
//! only how to name things and serialize them.
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Router → Lobby / Sessions
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientEvent, ErrorKind, GameOverReason, GameResult, HumanId, Outcome,
    Participant, ServerEvent, SessionId,
};
