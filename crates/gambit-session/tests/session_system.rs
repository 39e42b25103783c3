//! Integration tests for the session system using a mock rules oracle.
//!
//! The oracle here is deliberately trivial — any square-to-square move
//! is legal as long as the squares parse and differ — because these
//! tests are about seats, turns, broadcasts and lifecycle, not game
//! rules.

use std::time::Duration;

use gambit_protocol::{
    MoveRequest, RejectReason, Role, Seat, ServerEvent, SessionId,
};
use gambit_session::{
    EventSender, MoveOutcome, RulesOracle, SessionConfig, SessionError,
    SessionRegistry,
};
use gambit_transport::ConnectionId;
use tokio::sync::mpsc;

// =========================================================================
// Mock oracle: a move log with alternating turns.
// =========================================================================

struct RelayOracle;

#[derive(Clone, Debug)]
struct RelayPosition {
    moves: Vec<String>,
    to_move: Seat,
}

fn square_ok(sq: &str) -> bool {
    let bytes = sq.as_bytes();
    bytes.len() == 2
        && (b'a'..=b'h').contains(&bytes[0])
        && (b'1'..=b'8').contains(&bytes[1])
}

impl RulesOracle for RelayOracle {
    type Position = RelayPosition;

    fn initial_position(&self) -> RelayPosition {
        RelayPosition {
            moves: Vec::new(),
            to_move: Seat::First,
        }
    }

    fn to_move(&self, position: &RelayPosition) -> Seat {
        position.to_move
    }

    fn apply_move(
        &self,
        position: &RelayPosition,
        request: &MoveRequest,
    ) -> MoveOutcome<RelayPosition> {
        if !square_ok(&request.from) || !square_ok(&request.to) {
            return MoveOutcome::Illegal("bad square".into());
        }
        if request.from == request.to {
            return MoveOutcome::Illegal("null move".into());
        }
        let mut next = position.clone();
        next.moves.push(format!("{}{}", request.from, request.to));
        next.to_move = next.to_move.other();
        MoveOutcome::Legal(next)
    }

    fn serialize(&self, position: &RelayPosition) -> String {
        format!(
            "{} {}",
            match position.to_move {
                Seat::First => "1",
                Seat::Second => "2",
            },
            position.moves.join(" ")
        )
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn conn(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

fn mv(from: &str, to: &str) -> MoveRequest {
    MoveRequest {
        from: from.into(),
        to: to.into(),
        promotion: None,
    }
}

fn registry() -> SessionRegistry<RelayOracle> {
    SessionRegistry::new(RelayOracle)
}

/// A participant's end of the event channel.
struct Inbox {
    rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Inbox {
    fn pair() -> (EventSender, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Inbox { rx })
    }

    /// Receives the next event, waiting briefly for the actor.
    async fn next(&mut self) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    /// Asserts no event is pending after giving the actor time to act.
    async fn assert_silent(&mut self) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(
            self.rx.try_recv().is_err(),
            "expected no event, but one was queued"
        );
    }
}

/// Joins via matchmaking and drains the role announcement.
async fn join(
    reg: &mut SessionRegistry<RelayOracle>,
    id: u64,
) -> (Role, SessionId, Inbox) {
    let (tx, mut inbox) = Inbox::pair();
    let grant = reg.join(conn(id), tx, None).await.expect("join");
    let announced = inbox.next().await;
    match (&announced, grant.role) {
        (ServerEvent::PlayerRole { role, session_id }, granted) => {
            assert_eq!(*role, granted);
            assert_eq!(*session_id, grant.session_id);
        }
        (ServerEvent::SpectatorRole, Role::Observer) => {}
        other => panic!("unexpected role announcement: {other:?}"),
    }
    (grant.role, grant.session_id, inbox)
}

// =========================================================================
// Matchmaking and role assignment
// =========================================================================

#[tokio::test]
async fn test_find_or_create_creates_when_empty() {
    let mut reg = registry();
    let id = reg.find_or_create().await;
    assert_eq!(reg.session_count(), 1);
    assert!(reg.session_ids().contains(&id));
}

#[tokio::test]
async fn test_find_or_create_returns_open_session() {
    let mut reg = registry();
    let first = reg.find_or_create().await;
    let second = reg.find_or_create().await;
    assert_eq!(first, second, "open session should be reused");
    assert_eq!(reg.session_count(), 1);
}

#[tokio::test]
async fn test_first_two_joiners_get_seats_in_order() {
    let mut reg = registry();
    let (role_a, sid_a, _inbox_a) = join(&mut reg, 1).await;
    let (role_b, sid_b, _inbox_b) = join(&mut reg, 2).await;

    assert_eq!(role_a, Role::First);
    assert_eq!(role_b, Role::Second);
    assert_eq!(sid_a, sid_b, "pair should share one session");
}

#[tokio::test]
async fn test_third_matchmade_joiner_gets_a_fresh_session() {
    // Matchmaking never produces observers: a full session is simply
    // not a match, so the third participant seeds a new one.
    let mut reg = registry();
    let (_, sid_a, _ia) = join(&mut reg, 1).await;
    let (_, _sid_b, _ib) = join(&mut reg, 2).await;
    let (role_c, sid_c, _ic) = join(&mut reg, 3).await;

    assert_eq!(role_c, Role::First);
    assert_ne!(sid_a, sid_c);
    assert_eq!(reg.session_count(), 2);
}

#[tokio::test]
async fn test_third_joiner_to_named_full_session_becomes_observer() {
    let mut reg = registry();
    let (_, sid, _ia) = join(&mut reg, 1).await;
    let (_, _, _ib) = join(&mut reg, 2).await;

    let (tx, mut inbox) = Inbox::pair();
    let grant = reg.join(conn(3), tx, Some(sid.clone())).await.expect("join");

    assert_eq!(grant.role, Role::Observer);
    assert_eq!(grant.session_id, sid);
    assert_eq!(inbox.next().await, ServerEvent::SpectatorRole);
}

#[tokio::test]
async fn test_join_unknown_session_id_not_found() {
    let mut reg = registry();
    let (tx, _inbox) = Inbox::pair();
    let result = reg
        .join(conn(1), tx, Some(SessionId::from("no-such-session")))
        .await;
    assert!(matches!(result, Err(SessionError::NotFound(_))));
}

#[tokio::test]
async fn test_join_twice_rejected() {
    let mut reg = registry();
    let (_, _, _inbox) = join(&mut reg, 1).await;

    let (tx, _inbox2) = Inbox::pair();
    let result = reg.join(conn(1), tx, None).await;
    assert!(matches!(result, Err(SessionError::AlreadyJoined(_))));
}

#[tokio::test]
async fn test_observer_limit_enforced() {
    let mut reg = SessionRegistry::with_config(
        RelayOracle,
        SessionConfig { max_observers: 1 },
    );
    let (_, sid, _ia) = join(&mut reg, 1).await;
    let (_, _, _ib) = join(&mut reg, 2).await;

    let (tx, _i3) = Inbox::pair();
    reg.join(conn(3), tx, Some(sid.clone())).await.expect("first observer");

    let (tx, _i4) = Inbox::pair();
    let result = reg.join(conn(4), tx, Some(sid)).await;
    assert!(matches!(result, Err(SessionError::ObserversFull(_))));
}

#[tokio::test]
async fn test_game_start_broadcast_when_second_seat_fills() {
    let mut reg = registry();
    let (_, _, mut inbox_a) = join(&mut reg, 1).await;
    let (_, _, mut inbox_b) = join(&mut reg, 2).await;

    assert_eq!(inbox_a.next().await, ServerEvent::GameStart);
    assert_eq!(inbox_b.next().await, ServerEvent::GameStart);
}

// =========================================================================
// Turn authority
// =========================================================================

/// Seats two participants and drains their gameStart events.
async fn seated_pair(
    reg: &mut SessionRegistry<RelayOracle>,
) -> (SessionId, Inbox, Inbox) {
    let (_, sid, mut inbox_a) = join(reg, 1).await;
    let (_, _, mut inbox_b) = join(reg, 2).await;
    assert_eq!(inbox_a.next().await, ServerEvent::GameStart);
    assert_eq!(inbox_b.next().await, ServerEvent::GameStart);
    (sid, inbox_a, inbox_b)
}

#[tokio::test]
async fn test_accepted_move_broadcasts_move_then_board_state() {
    let mut reg = registry();
    let (_, mut inbox_a, mut inbox_b) = seated_pair(&mut reg).await;

    reg.route_move(conn(1), mv("e2", "e4")).await.unwrap();

    for inbox in [&mut inbox_a, &mut inbox_b] {
        assert_eq!(inbox.next().await, ServerEvent::Move(mv("e2", "e4")));
        assert_eq!(
            inbox.next().await,
            ServerEvent::BoardState {
                position: "2 e2e4".into(),
            }
        );
    }
}

#[tokio::test]
async fn test_out_of_turn_move_rejected_to_sender_only() {
    let mut reg = registry();
    let (sid, mut inbox_a, mut inbox_b) = seated_pair(&mut reg).await;

    // Second seat moves first — not their turn.
    reg.route_move(conn(2), mv("e7", "e5")).await.unwrap();

    assert_eq!(
        inbox_b.next().await,
        ServerEvent::InvalidMove {
            error: RejectReason::NotYourTurn,
        }
    );
    inbox_a.assert_silent().await;

    // Idempotent rejection: the position is unchanged.
    let info = reg.session_info(&sid).await.unwrap();
    assert_eq!(info.position, "1 ");
}

#[tokio::test]
async fn test_illegal_move_rejected_and_state_unchanged() {
    let mut reg = registry();
    let (sid, mut inbox_a, mut inbox_b) = seated_pair(&mut reg).await;

    reg.route_move(conn(1), mv("e2", "e2")).await.unwrap();

    assert_eq!(
        inbox_a.next().await,
        ServerEvent::InvalidMove {
            error: RejectReason::IllegalMove,
        }
    );
    inbox_b.assert_silent().await;

    let info = reg.session_info(&sid).await.unwrap();
    assert_eq!(info.position, "1 ");
}

#[tokio::test]
async fn test_malformed_squares_rejected_as_illegal_move() {
    let mut reg = registry();
    let (_, mut inbox_a, _inbox_b) = seated_pair(&mut reg).await;

    reg.route_move(conn(1), mv("z9", "e4")).await.unwrap();

    assert_eq!(
        inbox_a.next().await,
        ServerEvent::InvalidMove {
            error: RejectReason::IllegalMove,
        }
    );
}

#[tokio::test]
async fn test_observer_move_rejected_not_a_player() {
    let mut reg = registry();
    let (sid, mut inbox_a, mut inbox_b) = seated_pair(&mut reg).await;

    let (tx, mut inbox_o) = Inbox::pair();
    reg.join(conn(3), tx, Some(sid.clone())).await.unwrap();
    assert_eq!(inbox_o.next().await, ServerEvent::SpectatorRole);

    reg.route_move(conn(3), mv("e2", "e4")).await.unwrap();

    assert_eq!(
        inbox_o.next().await,
        ServerEvent::InvalidMove {
            error: RejectReason::NotAPlayer,
        }
    );
    inbox_a.assert_silent().await;
    inbox_b.assert_silent().await;

    let info = reg.session_info(&sid).await.unwrap();
    assert_eq!(info.position, "1 ");
}

#[tokio::test]
async fn test_observer_receives_move_broadcasts() {
    let mut reg = registry();
    let (sid, mut inbox_a, _inbox_b) = seated_pair(&mut reg).await;

    let (tx, mut inbox_o) = Inbox::pair();
    reg.join(conn(3), tx, Some(sid)).await.unwrap();
    assert_eq!(inbox_o.next().await, ServerEvent::SpectatorRole);

    reg.route_move(conn(1), mv("d2", "d4")).await.unwrap();

    assert_eq!(inbox_a.next().await, ServerEvent::Move(mv("d2", "d4")));
    assert_eq!(inbox_o.next().await, ServerEvent::Move(mv("d2", "d4")));
    assert!(matches!(
        inbox_o.next().await,
        ServerEvent::BoardState { .. }
    ));
}

#[tokio::test]
async fn test_turns_alternate_across_accepted_moves() {
    let mut reg = registry();
    let (sid, mut inbox_a, mut inbox_b) = seated_pair(&mut reg).await;

    reg.route_move(conn(1), mv("e2", "e4")).await.unwrap();
    // Drain the first broadcast pair.
    for inbox in [&mut inbox_a, &mut inbox_b] {
        inbox.next().await;
        inbox.next().await;
    }

    // First seat again — now out of turn.
    reg.route_move(conn(1), mv("d2", "d4")).await.unwrap();
    assert_eq!(
        inbox_a.next().await,
        ServerEvent::InvalidMove {
            error: RejectReason::NotYourTurn,
        }
    );

    // Second seat is in turn.
    reg.route_move(conn(2), mv("e7", "e5")).await.unwrap();
    assert_eq!(inbox_b.next().await, ServerEvent::Move(mv("e7", "e5")));

    let info = reg.session_info(&sid).await.unwrap();
    assert_eq!(info.position, "1 e2e4 e7e5");
}

#[tokio::test]
async fn test_route_move_from_unjoined_connection_errors() {
    let reg = registry();
    let result = reg.route_move(conn(9), mv("e2", "e4")).await;
    assert!(matches!(result, Err(SessionError::NotAMember(_))));
}

// =========================================================================
// Departure lifecycle
// =========================================================================

#[tokio::test]
async fn test_seated_departure_resets_game_and_notifies_survivor() {
    let mut reg = registry();
    let (sid, mut inbox_a, mut inbox_b) = seated_pair(&mut reg).await;

    // Play a move so there is state to forfeit.
    reg.route_move(conn(1), mv("e2", "e4")).await.unwrap();
    for inbox in [&mut inbox_a, &mut inbox_b] {
        inbox.next().await;
        inbox.next().await;
    }

    reg.leave(conn(1)).await.unwrap();

    // Survivor gets the fresh position first, then the reset notice.
    assert_eq!(
        inbox_b.next().await,
        ServerEvent::BoardState {
            position: "1 ".into(),
        }
    );
    assert_eq!(
        inbox_b.next().await,
        ServerEvent::GameReset {
            message: "A player has left. Game reset.".into(),
        }
    );

    // Exactly the departing seat cleared; session still live.
    let info = reg.session_info(&sid).await.unwrap();
    assert_eq!(info.open_seats, 1);
    assert_eq!(reg.session_count(), 1);
}

#[tokio::test]
async fn test_vacated_seat_is_refilled_by_next_joiner() {
    let mut reg = registry();
    let (_sid, _inbox_a, _inbox_b) = seated_pair(&mut reg).await;

    reg.leave(conn(1)).await.unwrap();

    // Matchmaking finds the half-empty session and hands out the
    // reopened first seat.
    let (role_c, _, _ic) = join(&mut reg, 3).await;
    assert_eq!(role_c, Role::First);
    assert_eq!(reg.session_count(), 1);
}

#[tokio::test]
async fn test_observer_departure_changes_nothing() {
    let mut reg = registry();
    let (sid, mut inbox_a, mut inbox_b) = seated_pair(&mut reg).await;

    let (tx, mut inbox_o) = Inbox::pair();
    reg.join(conn(3), tx, Some(sid.clone())).await.unwrap();
    assert_eq!(inbox_o.next().await, ServerEvent::SpectatorRole);

    reg.leave(conn(3)).await.unwrap();

    inbox_a.assert_silent().await;
    inbox_b.assert_silent().await;
    let info = reg.session_info(&sid).await.unwrap();
    assert_eq!(info.open_seats, 0);
    assert_eq!(info.occupants, 2);
    assert_eq!(reg.session_count(), 1);
}

#[tokio::test]
async fn test_session_removed_when_both_seats_empty() {
    let mut reg = registry();
    let (sid, _inbox_a, _inbox_b) = seated_pair(&mut reg).await;

    reg.leave(conn(1)).await.unwrap();
    assert_eq!(reg.session_count(), 1);

    reg.leave(conn(2)).await.unwrap();
    assert_eq!(reg.session_count(), 0);
    assert!(matches!(
        reg.session_info(&sid).await,
        Err(SessionError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_emptied_session_is_unreachable_by_matchmaking() {
    let mut reg = registry();
    let (sid_old, _ia, _ib) = seated_pair(&mut reg).await;

    reg.leave(conn(1)).await.unwrap();
    reg.leave(conn(2)).await.unwrap();

    // A new joiner must land in a brand-new session; the old id is
    // gone for good.
    let (_, sid_new, _ic) = join(&mut reg, 3).await;
    assert_ne!(sid_old, sid_new);
    assert_eq!(reg.session_count(), 1);
}

#[tokio::test]
async fn test_dissolving_session_closes_observer_channels() {
    let mut reg = registry();
    let (sid, _inbox_a, _inbox_b) = seated_pair(&mut reg).await;

    let (tx, mut inbox_o) = Inbox::pair();
    reg.join(conn(3), tx, Some(sid)).await.unwrap();
    assert_eq!(inbox_o.next().await, ServerEvent::SpectatorRole);

    reg.leave(conn(1)).await.unwrap();
    // Drain the reset pair the observer saw.
    inbox_o.next().await;
    inbox_o.next().await;
    reg.leave(conn(2)).await.unwrap();
    // Second reset pair may or may not arrive before shutdown; accept
    // events until the channel closes.
    let closed = tokio::time::timeout(Duration::from_secs(1), async {
        while inbox_o.rx.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "observer channel should close on dissolve");

    // The observer's membership is purged with the session.
    let result = reg.leave(conn(3)).await;
    assert!(matches!(result, Err(SessionError::NotAMember(_))));
}

#[tokio::test]
async fn test_leave_without_join_errors() {
    let mut reg = registry();
    let result = reg.leave(conn(1)).await;
    assert!(matches!(result, Err(SessionError::NotAMember(_))));
}
