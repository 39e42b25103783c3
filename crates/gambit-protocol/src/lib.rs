//! Wire protocol for Gambit.
//!
//! This crate defines the language clients and the server speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`MoveRequest`],
//!   [`Role`], [`RejectReason`], [`SessionId`]) — the event vocabulary.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how events become
//!   bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about connections, seats being
//! taken, or whose turn it is — it only defines shapes:
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Session (seats, turns, state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientEvent, MoveRequest, RejectReason, Role, Seat, ServerEvent, SessionId,
};
