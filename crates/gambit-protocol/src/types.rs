//! Core wire types for Gambit's protocol.
//!
//! Everything in this module travels between client and server as JSON.
//! The serde attributes are load-bearing: they pin the exact shapes the
//! browser client parses, and the tests at the bottom lock them down.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a session (one isolated game instance).
///
/// Generated by the registry as a random 32-character hex string at
/// session creation. Ids are never reused: a deleted session's id stays
/// dead forever, so a stale id in a client's `join` simply misses.
///
/// `#[serde(transparent)]` makes a `SessionId` serialize as the bare
/// string, not as a wrapper object — the client sees `"a3f0…"`, never
/// `{"0":"a3f0…"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Seats and roles
// ---------------------------------------------------------------------------

/// One of the two seats in a session.
///
/// The first seat belongs to the side that moves first; the oracle
/// reports whose turn it is in these terms, which is what lets the turn
/// gate stay ignorant of the actual game being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    /// Returns the opposing seat.
    pub fn other(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::First => write!(f, "first"),
            Seat::Second => write!(f, "second"),
        }
    }
}

/// What a participant is to its session: a seat holder or an observer.
///
/// Assigned once at join and never changed for the connection's
/// lifetime. Observers hold no seat and cannot mutate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    First,
    Second,
    Observer,
}

impl Role {
    /// The seat this role confers, if any.
    pub fn seat(self) -> Option<Seat> {
        match self {
            Role::First => Some(Seat::First),
            Role::Second => Some(Seat::Second),
            Role::Observer => None,
        }
    }
}

impl From<Seat> for Role {
    fn from(seat: Seat) -> Self {
        match seat {
            Seat::First => Role::First,
            Seat::Second => Role::Second,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::First => write!(f, "first"),
            Role::Second => write!(f, "second"),
            Role::Observer => write!(f, "observer"),
        }
    }
}

// ---------------------------------------------------------------------------
// Move requests and rejections
// ---------------------------------------------------------------------------

/// A move attempt: origin square, destination square, optional
/// promotion piece.
///
/// This is the validated, tagged replacement for the duck-typed move
/// objects the transport could otherwise smuggle in: anything that does
/// not decode into this shape is dropped at the boundary and never
/// reaches the rules oracle. Square strings are deliberately left
/// uninterpreted here — the oracle decides what "e2" means, and folds
/// nonsense squares into an illegal-move rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Origin square identifier (e.g. `"e2"`).
    pub from: String,
    /// Destination square identifier (e.g. `"e4"`).
    pub to: String,
    /// Promotion piece indicator (e.g. `"q"`), when the move promotes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

/// Why a move was rejected.
///
/// All three are expected, recoverable outcomes reported only to the
/// sender — never failures, never broadcast. Wire form is kebab-case to
/// match the `invalidMove` payload (`"not-your-turn"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// The sender holds a seat, but it is not their turn. Frequent and
    /// harmless; the client waits or retries after the next move.
    NotYourTurn,
    /// The oracle refused the move: bad geometry, malformed squares,
    /// wrong piece color — all folded into this one reason.
    IllegalMove,
    /// An observer attempted a move. Observers hold no write authority.
    NotAPlayer,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotYourTurn => write!(f, "not-your-turn"),
            RejectReason::IllegalMove => write!(f, "illegal-move"),
            RejectReason::NotAPlayer => write!(f, "not-a-player"),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server events
// ---------------------------------------------------------------------------

/// Messages a client sends to the server.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON —
/// `{ "type": "move", "from": "e2", "to": "e4" }` — the shape browser
/// clients find easiest to produce and switch on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// The first message on every connection: enter a session.
    ///
    /// With no `sessionId`, the registry match-makes (join any session
    /// with an open seat, or create one). With a `sessionId`, join that
    /// specific session — as an observer if both seats are taken.
    Join {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },

    /// A move attempt. Only seat holders on their turn succeed.
    Move(MoveRequest),
}

// ---------------------------------------------------------------------------
// Server → client events
// ---------------------------------------------------------------------------

/// Messages the server sends to clients.
///
/// Broadcast events (`gameStart`, `move`, `boardState`, `gameReset`)
/// reach every current member of a session; `playerRole`,
/// `spectatorRole` and `invalidMove` go to a single connection only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Seat assignment after a join: which seat, which session.
    PlayerRole { role: Role, session_id: SessionId },

    /// Observer assignment — the session was full.
    SpectatorRole,

    /// Both seats are now filled; play may begin.
    GameStart,

    /// An accepted move, re-broadcast with the exact payload the mover
    /// sent, so clients can replay it against their last `boardState`.
    Move(MoveRequest),

    /// Full-state sync: the serialized position (e.g. a FEN string).
    /// Sent to the whole session after every accepted move and after a
    /// reset.
    BoardState { position: String },

    /// The sender's move was rejected. Sender only; never broadcast.
    InvalidMove { error: RejectReason },

    /// A seat holder departed; the game restarted from the initial
    /// position. Carries a human-readable cause.
    GameReset { message: String },
}

// =========================================================================
// Tests
// =========================================================================
