//! Error types for the session layer.
//!
//! These are plumbing failures (unknown session, dead actor, duplicate
//! join). Rejected moves are not errors — they are
//! [`RejectReason`](gambit_protocol::RejectReason) values delivered
//! over the wire, because an out-of-turn move is expected traffic.

use gambit_protocol::SessionId;
use gambit_transport::ConnectionId;

/// Errors that can occur during session and registry operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists with the given id. Either it never existed or
    /// it dissolved — ids are never reused, so there is no ambiguity.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The connection is already a member of a session. One connection,
    /// one session, for its whole lifetime.
    #[error("connection {0} already joined a session")]
    AlreadyJoined(ConnectionId),

    /// The connection is not a member of any session (or not of this
    /// one).
    #[error("connection {0} is not a session member")]
    NotAMember(ConnectionId),

    /// The session's observer limit is reached.
    #[error("session {0} is not accepting more observers")]
    ObserversFull(SessionId),

    /// The session's command channel is closed — it is shutting down
    /// or gone.
    #[error("session {0} is unavailable")]
    Unavailable(SessionId),
}
