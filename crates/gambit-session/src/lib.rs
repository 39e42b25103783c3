//! Session coordination for Gambit: who plays whom, who may move, and
//! what happens when someone walks away.
//!
//! This crate is the authority model of the server:
//!
//! - [`RulesOracle`] — the trait the actual game rules live behind
//! - [`Seats`] — the two-seat exclusivity invariant
//! - [`gate`] — the turn authority gate every move passes through
//! - session actors ([`SessionHandle`]) — one task per game, owning its
//!   authoritative position and participant channels
//! - [`SessionRegistry`] — match-making, membership, and reaping
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / connection handlers (above)
//!     ↕  join / move / leave, ServerEvent channels back
//! Session layer (this crate)
//!     ↕  apply_move / to_move / serialize
//! Rules oracle (game-specific, e.g. a chess implementation)
//! ```
//!
//! # Concurrency model
//!
//! Each session is an actor: commands are processed one at a time, so
//! all mutations of one session are serialized without locks, and
//! moves in different sessions never contend. Every operation is a
//! bounded, synchronous computation — nothing in here waits on the
//! network.

mod config;
mod error;
pub mod gate;
mod oracle;
mod registry;
mod session;

pub use config::SessionConfig;
pub use error::SessionError;
pub use gate::Verdict;
pub use oracle::{MoveOutcome, RulesOracle};
pub use registry::SessionRegistry;
pub use session::{
    EventSender, JoinGrant, LeaveReport, Seats, SessionHandle, SessionInfo,
};
