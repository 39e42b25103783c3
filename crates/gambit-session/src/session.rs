//! Session actor: an isolated Tokio task that owns one game.
//!
//! Each session runs in its own task, reached only through an mpsc
//! channel. Every inbound command (join, move, leave) is processed to
//! completion before the next one starts, so no two mutations of the
//! same session ever interleave — the per-session critical section the
//! authority model depends on, with no locks and no contention between
//! different sessions.

use std::collections::HashMap;
use std::sync::Arc;

use gambit_protocol::{MoveRequest, Role, Seat, ServerEvent, SessionId};
use gambit_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{RulesOracle, SessionConfig, SessionError, Verdict, gate};

/// Broadcast to a session when a seat holder departs mid-game.
pub(crate) const RESET_MESSAGE: &str = "A player has left. Game reset.";

/// Channel sender delivering outbound events to one participant's
/// connection handler.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

// ---------------------------------------------------------------------------
// Seats
// ---------------------------------------------------------------------------

/// The two seats of a session and who holds them.
///
/// Invariant: at most one connection per seat and at most one seat per
/// connection — 0, 1 or 2 occupied, never more. Everything the
/// lifecycle needs ("live", "ready", "dissolvable") derives from this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seats {
    first: Option<ConnectionId>,
    second: Option<ConnectionId>,
}

impl Seats {
    /// Creates two open seats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seats `conn` in the lowest open seat, first-come-first-served:
    /// first seat, then second, then `None` (session full).
    ///
    /// A connection already holding a seat is not seated twice.
    pub fn assign(&mut self, conn: ConnectionId) -> Option<Seat> {
        if self.first == Some(conn) || self.second == Some(conn) {
            return self.seat_of(conn);
        }
        if self.first.is_none() {
            self.first = Some(conn);
            Some(Seat::First)
        } else if self.second.is_none() {
            self.second = Some(conn);
            Some(Seat::Second)
        } else {
            None
        }
    }

    /// Vacates whichever seat `conn` holds, returning it. The seat
    /// simply reopens — no reassignment, no promotion of observers.
    pub fn clear(&mut self, conn: ConnectionId) -> Option<Seat> {
        if self.first == Some(conn) {
            self.first = None;
            Some(Seat::First)
        } else if self.second == Some(conn) {
            self.second = None;
            Some(Seat::Second)
        } else {
            None
        }
    }

    /// The seat `conn` holds, if any.
    pub fn seat_of(&self, conn: ConnectionId) -> Option<Seat> {
        if self.first == Some(conn) {
            Some(Seat::First)
        } else if self.second == Some(conn) {
            Some(Seat::Second)
        } else {
            None
        }
    }

    /// Number of occupied seats (0, 1 or 2).
    pub fn occupied(&self) -> usize {
        usize::from(self.first.is_some()) + usize::from(self.second.is_some())
    }

    /// `true` when both seats are taken — the session is ready to play.
    pub fn is_full(&self) -> bool {
        self.first.is_some() && self.second.is_some()
    }

    /// `true` when both seats are open — the session is eligible for
    /// deletion.
    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }
}

// ---------------------------------------------------------------------------
// Commands and replies
// ---------------------------------------------------------------------------

/// What a participant was granted on joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGrant {
    /// The session joined.
    pub session_id: SessionId,
    /// The role assigned, permanent for the connection's lifetime.
    pub role: Role,
}

/// What happened when a participant left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveReport {
    /// The seat the departing connection vacated (`None` for
    /// observers).
    pub vacated: Option<Seat>,
    /// Whether both seats are now open — the registry's cue to remove
    /// the session.
    pub seats_empty: bool,
}

/// A snapshot of session metadata for matchmaking and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// The session's id.
    pub session_id: SessionId,
    /// How many of the two seats are open.
    pub open_seats: usize,
    /// Total connected participants, observers included.
    pub occupants: usize,
    /// The serialized current position.
    pub position: String,
}

/// Commands sent to a session actor through its channel.
pub(crate) enum SessionCommand {
    /// Admit a participant and assign its role.
    Join {
        conn: ConnectionId,
        sender: EventSender,
        reply: oneshot::Sender<Result<JoinGrant, SessionError>>,
    },

    /// Remove a participant (departure or connection loss).
    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<LeaveReport, SessionError>>,
    },

    /// A move attempt from a participant. Fire-and-forget: the verdict
    /// travels back over the participant's event channel, not a reply.
    Move {
        conn: ConnectionId,
        request: MoveRequest,
    },

    /// Request current metadata.
    Info {
        reply: oneshot::Sender<SessionInfo>,
    },

    /// Tear the session down.
    Shutdown,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running session actor. Cheap to clone; the registry
/// keeps one per live session.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Returns the session's id.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Sends a join request and waits for the granted role.
    pub async fn join(
        &self,
        conn: ConnectionId,
        sender: EventSender,
    ) -> Result<JoinGrant, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Join {
                conn,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id.clone()))?
    }

    /// Sends a leave request and waits for the outcome.
    pub async fn leave(
        &self,
        conn: ConnectionId,
    ) -> Result<LeaveReport, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Leave {
                conn,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id.clone()))?
    }

    /// Submits a move attempt (fire-and-forget).
    pub async fn submit_move(
        &self,
        conn: ConnectionId,
        request: MoveRequest,
    ) -> Result<(), SessionError> {
        self.sender
            .send(SessionCommand::Move { conn, request })
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id.clone()))
    }

    /// Requests the current session info.
    pub async fn info(&self) -> Result<SessionInfo, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id.clone()))
    }

    /// Tells the session to shut down.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.sender
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id.clone()))
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The internal session actor state. Runs inside a Tokio task.
struct SessionActor<O: RulesOracle> {
    session_id: SessionId,
    seats: Seats,
    /// The authoritative game position. Mutated in exactly two places:
    /// a gate-accepted move, and the reset on seat departure.
    position: O::Position,
    oracle: Arc<O>,
    config: SessionConfig,
    /// Per-participant outbound channels (seat holders and observers).
    senders: HashMap<ConnectionId, EventSender>,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl<O: RulesOracle> SessionActor<O> {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::info!(session_id = %self.session_id, "session started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                SessionCommand::Join { conn, sender, reply } => {
                    let result = self.handle_join(conn, sender);
                    let _ = reply.send(result);
                }
                SessionCommand::Leave { conn, reply } => {
                    let result = self.handle_leave(conn);
                    let _ = reply.send(result);
                }
                SessionCommand::Move { conn, request } => {
                    self.handle_move(conn, request);
                }
                SessionCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                SessionCommand::Shutdown => {
                    tracing::info!(session_id = %self.session_id, "session shutting down");
                    break;
                }
            }
        }

        // Dropping the senders closes every participant's outbound
        // channel; their handlers treat that as dissolution.
        tracing::info!(session_id = %self.session_id, "session stopped");
    }

    /// Admits a participant: first seat if open, else second, else
    /// observer. Permanent for the connection's lifetime.
    fn handle_join(
        &mut self,
        conn: ConnectionId,
        sender: EventSender,
    ) -> Result<JoinGrant, SessionError> {
        if self.senders.contains_key(&conn) {
            return Err(SessionError::AlreadyJoined(conn));
        }

        let role = match self.seats.assign(conn) {
            Some(seat) => Role::from(seat),
            None => {
                let observers = self.senders.len() - self.seats.occupied();
                if self.config.max_observers > 0
                    && observers >= self.config.max_observers
                {
                    return Err(SessionError::ObserversFull(
                        self.session_id.clone(),
                    ));
                }
                Role::Observer
            }
        };

        self.senders.insert(conn, sender);
        tracing::info!(
            session_id = %self.session_id,
            %conn,
            %role,
            occupants = self.senders.len(),
            "participant joined"
        );

        // Tell the joiner what it is.
        let assignment = match role {
            Role::Observer => ServerEvent::SpectatorRole,
            seated => ServerEvent::PlayerRole {
                role: seated,
                session_id: self.session_id.clone(),
            },
        };
        self.send_to(conn, assignment);

        // Second seat just filled: the game is on.
        if role != Role::Observer && self.seats.is_full() {
            self.broadcast(ServerEvent::GameStart);
        }

        Ok(JoinGrant {
            session_id: self.session_id.clone(),
            role,
        })
    }

    /// Removes a participant. A vacated seat forfeits the game: the
    /// position resets and everyone remaining is told why.
    fn handle_leave(
        &mut self,
        conn: ConnectionId,
    ) -> Result<LeaveReport, SessionError> {
        if self.senders.remove(&conn).is_none() {
            return Err(SessionError::NotAMember(conn));
        }

        let vacated = self.seats.clear(conn);
        tracing::info!(
            session_id = %self.session_id,
            %conn,
            seated = vacated.is_some(),
            occupants = self.senders.len(),
            "participant left"
        );

        if vacated.is_some() {
            // Departure forfeits continuity: back to the initial
            // position, fresh state first so clients render before the
            // reset notice arrives.
            self.position = self.oracle.initial_position();
            self.broadcast(ServerEvent::BoardState {
                position: self.oracle.serialize(&self.position),
            });
            self.broadcast(ServerEvent::GameReset {
                message: RESET_MESSAGE.to_string(),
            });
        }

        Ok(LeaveReport {
            vacated,
            seats_empty: self.seats.is_empty(),
        })
    }

    /// Runs a move attempt through the turn authority gate.
    fn handle_move(&mut self, conn: ConnectionId, request: MoveRequest) {
        let role = match self.seats.seat_of(conn) {
            Some(seat) => Role::from(seat),
            None if self.senders.contains_key(&conn) => Role::Observer,
            None => {
                tracing::warn!(
                    session_id = %self.session_id,
                    %conn,
                    "move from non-member, ignoring"
                );
                return;
            }
        };

        match gate::submit(self.oracle.as_ref(), &self.position, role, &request)
        {
            Verdict::Accepted(next) => {
                self.position = next;
                tracing::debug!(
                    session_id = %self.session_id,
                    %conn,
                    from = %request.from,
                    to = %request.to,
                    "move accepted"
                );
                self.broadcast(ServerEvent::Move(request));
                self.broadcast(ServerEvent::BoardState {
                    position: self.oracle.serialize(&self.position),
                });
            }
            Verdict::Rejected(reason) => {
                tracing::debug!(
                    session_id = %self.session_id,
                    %conn,
                    %reason,
                    "move rejected"
                );
                // Rejections go to the sender alone, never broadcast.
                self.send_to(conn, ServerEvent::InvalidMove { error: reason });
            }
        }
    }

    /// Sends an event to every current participant of the session.
    fn broadcast(&self, event: ServerEvent) {
        for conn in self.senders.keys() {
            self.send_to(*conn, event.clone());
        }
    }

    /// Sends an event to a single participant. Silently drops if the
    /// receiver is gone (connection already closing).
    fn send_to(&self, conn: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&conn) {
            let _ = sender.send(event);
        }
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id.clone(),
            open_seats: 2 - self.seats.occupied(),
            occupants: self.senders.len(),
            position: self.oracle.serialize(&self.position),
        }
    }
}

/// Spawns a new session actor task and returns a handle to it.
///
/// The position starts at the oracle's initial position and both seats
/// open. `channel_size` bounds the command queue.
pub(crate) fn spawn_session<O: RulesOracle>(
    session_id: SessionId,
    oracle: Arc<O>,
    config: SessionConfig,
    channel_size: usize,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = SessionActor {
        session_id: session_id.clone(),
        seats: Seats::new(),
        position: oracle.initial_position(),
        oracle,
        config,
        senders: HashMap::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    SessionHandle {
        session_id,
        sender: tx,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    // =====================================================================
    // Seats — the seat-exclusivity invariant lives here
    // =====================================================================

    #[test]
    fn test_seats_assign_order_is_first_then_second() {
        let mut seats = Seats::new();
        assert_eq!(seats.assign(conn(1)), Some(Seat::First));
        assert_eq!(seats.assign(conn(2)), Some(Seat::Second));
    }

    #[test]
    fn test_seats_third_assignment_returns_none() {
        let mut seats = Seats::new();
        seats.assign(conn(1));
        seats.assign(conn(2));
        assert_eq!(seats.assign(conn(3)), None);
        assert_eq!(seats.occupied(), 2);
    }

    #[test]
    fn test_seats_assign_same_connection_twice_keeps_one_seat() {
        let mut seats = Seats::new();
        assert_eq!(seats.assign(conn(1)), Some(Seat::First));
        // Re-assigning the same connection must not also give it the
        // second seat.
        assert_eq!(seats.assign(conn(1)), Some(Seat::First));
        assert_eq!(seats.occupied(), 1);
    }

    #[test]
    fn test_seats_clear_reopens_exactly_that_seat() {
        let mut seats = Seats::new();
        seats.assign(conn(1));
        seats.assign(conn(2));

        assert_eq!(seats.clear(conn(1)), Some(Seat::First));
        assert_eq!(seats.occupied(), 1);
        assert_eq!(seats.seat_of(conn(2)), Some(Seat::Second));

        // The reopened seat goes to the next joiner.
        assert_eq!(seats.assign(conn(3)), Some(Seat::First));
    }

    #[test]
    fn test_seats_clear_unknown_connection_is_noop() {
        let mut seats = Seats::new();
        seats.assign(conn(1));
        assert_eq!(seats.clear(conn(9)), None);
        assert_eq!(seats.occupied(), 1);
    }

    #[test]
    fn test_seats_full_and_empty() {
        let mut seats = Seats::new();
        assert!(seats.is_empty());
        assert!(!seats.is_full());

        seats.assign(conn(1));
        assert!(!seats.is_empty());
        assert!(!seats.is_full());

        seats.assign(conn(2));
        assert!(seats.is_full());

        seats.clear(conn(1));
        seats.clear(conn(2));
        assert!(seats.is_empty());
    }

    #[test]
    fn test_seats_exclusive_under_any_join_sequence() {
        // Property sweep: after any interleaving of joins and leaves,
        // no two distinct connections hold the same seat.
        let mut seats = Seats::new();
        let ops: &[(u64, bool)] = &[
            (1, true),
            (2, true),
            (3, true),
            (1, false),
            (4, true),
            (2, false),
            (5, true),
            (4, false),
            (6, true),
        ];
        for &(id, join) in ops {
            if join {
                seats.assign(conn(id));
            } else {
                seats.clear(conn(id));
            }
            assert!(seats.occupied() <= 2);
            if let (Some(a), Some(b)) = (seats.first, seats.second) {
                assert_ne!(a, b, "both seats held by one connection");
            }
        }
    }
}
