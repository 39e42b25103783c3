//! # Gambit
//!
//! A turn-based pairing server: participants connect over WebSocket,
//! get matched two-to-a-session (extras observe), and take turns
//! mutating a shared game position. The server is authoritative — a
//! move lands only if the sender holds the seat whose turn it is and
//! the rules oracle accepts it — and a departing player forfeits the
//! game rather than pausing it.
//!
//! Game rules live behind the [`RulesOracle`](gambit_session::RulesOracle)
//! trait; Gambit itself never inspects a move.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gambit::prelude::*;
//!
//! # struct MyOracle;
//! # impl RulesOracle for MyOracle {
//! #     type Position = u32;
//! #     fn initial_position(&self) -> u32 { 0 }
//! #     fn to_move(&self, p: &u32) -> Seat {
//! #         if p % 2 == 0 { Seat::First } else { Seat::Second }
//! #     }
//! #     fn apply_move(&self, p: &u32, _: &MoveRequest) -> MoveOutcome<u32> {
//! #         MoveOutcome::Legal(p + 1)
//! #     }
//! #     fn serialize(&self, p: &u32) -> String { p.to_string() }
//! # }
//! #[tokio::main]
//! async fn main() -> Result<(), GambitError> {
//!     let server = GambitServerBuilder::new()
//!         .bind("0.0.0.0:5500")
//!         .build(MyOracle)
//!         .await?;
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::GambitError;
pub use server::{GambitServer, GambitServerBuilder};

/// Everything an embedding needs in one import.
pub mod prelude {
    pub use crate::{GambitError, GambitServer, GambitServerBuilder};
    pub use gambit_protocol::{
        ClientEvent, Codec, JsonCodec, MoveRequest, ProtocolError,
        RejectReason, Role, Seat, ServerEvent, SessionId,
    };
    pub use gambit_session::{
        MoveOutcome, RulesOracle, SessionConfig, SessionError,
        SessionRegistry,
    };
    pub use gambit_transport::{Connection, ConnectionId, Transport};
}
