//! The turn authority gate: the single choke point every move attempt
//! passes through before it may touch session state.
//!
//! Deliberately a pure function rather than a method on the session
//! actor — given a position, a role and a request it produces a
//! verdict, which makes the idempotent-rejection property directly
//! testable without spinning up any tasks.

use std::panic::{self, AssertUnwindSafe};

use gambit_protocol::{MoveRequest, RejectReason, Role};

use crate::{MoveOutcome, RulesOracle};

/// The gate's decision on one move attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<P> {
    /// The move stands. The caller commits the new position and
    /// broadcasts the move — this is the only path that mutates a
    /// session's position.
    Accepted(P),

    /// The move does not stand, for the given reason. The caller
    /// reports it to the sender alone; the position is untouched.
    Rejected(RejectReason),
}

/// Judges a move attempt from a participant with `role` against
/// `position`.
///
/// 1. Observers hold no write authority: `not-a-player`.
/// 2. A seat out of turn: `not-your-turn` — the normal, frequent case,
///    not a fault.
/// 3. Everything else is the oracle's call; refusals and malformed
///    input alike surface as `illegal-move`.
///
/// An oracle that panics on unforeseen input is contained here and
/// treated as a refusal — one bad move must never take the session (or
/// the server) down with it.
pub fn submit<O: RulesOracle>(
    oracle: &O,
    position: &O::Position,
    role: Role,
    request: &MoveRequest,
) -> Verdict<O::Position> {
    let Some(seat) = role.seat() else {
        return Verdict::Rejected(RejectReason::NotAPlayer);
    };

    if seat != oracle.to_move(position) {
        return Verdict::Rejected(RejectReason::NotYourTurn);
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        oracle.apply_move(position, request)
    }));

    match outcome {
        Ok(MoveOutcome::Legal(next)) => Verdict::Accepted(next),
        Ok(MoveOutcome::Illegal(why)) => {
            tracing::debug!(%why, from = %request.from, to = %request.to, "move refused by oracle");
            Verdict::Rejected(RejectReason::IllegalMove)
        }
        Err(_) => {
            tracing::error!(
                from = %request.from,
                to = %request.to,
                "oracle panicked applying move; treating as illegal"
            );
            Verdict::Rejected(RejectReason::IllegalMove)
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
