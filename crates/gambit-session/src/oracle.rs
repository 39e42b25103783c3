//! The `RulesOracle` trait — the seam between session plumbing and the
//! rules of the game actually being played.
//!
//! The session layer admits participants, enforces whose turn it is,
//! and broadcasts state — but it never interprets a move itself. All
//! legality questions go through this trait, so any two-seat,
//! alternating-turn game (chess, draughts, anything with from/to
//! squares) plugs in without the framework changing.

use gambit_protocol::{MoveRequest, Seat};

/// The outcome of asking the oracle to apply a move.
///
/// Illegality is an expected, frequent branch — players mis-drag pieces
/// constantly — so it is a value, not an error type, and certainly not
/// a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome<P> {
    /// The move is legal; here is the position after it. Turn
    /// alternation is baked into the returned position — the caller
    /// never flips turn state on its own.
    Legal(P),

    /// The move is illegal. The reason is for server logs only; the
    /// client just hears `illegal-move`.
    Illegal(String),
}

/// Validates and applies moves against a game position.
///
/// Implementations must be pure with respect to their inputs:
/// [`apply_move`](RulesOracle::apply_move) takes the position by
/// reference and returns a fresh one, so a rejected move provably
/// leaves the session state untouched and a client may retry
/// immediately without risking double application.
pub trait RulesOracle: Send + Sync + 'static {
    /// The full game position: board, side to move, and whatever
    /// history the rules need. Serialized only via
    /// [`serialize`](RulesOracle::serialize).
    type Position: Clone + Send + Sync;

    /// The position a fresh (or reset) game starts from.
    fn initial_position(&self) -> Self::Position;

    /// Which seat is authorized to move in this position.
    ///
    /// The first seat is always the side that moves first from the
    /// initial position.
    fn to_move(&self, position: &Self::Position) -> Seat;

    /// Attempts `request` against `position`.
    ///
    /// Malformed square identifiers, wrong-color pieces, bad geometry —
    /// anything the rules refuse — comes back as
    /// [`MoveOutcome::Illegal`], never as a panic.
    fn apply_move(
        &self,
        position: &Self::Position,
        request: &MoveRequest,
    ) -> MoveOutcome<Self::Position>;

    /// Serializes the position for the `boardState` broadcast (e.g. a
    /// FEN string for chess oracles).
    fn serialize(&self, position: &Self::Position) -> String;
}
