//! Session registry: creates, finds, and reaps sessions, and remembers
//! which connection belongs to which session.
//!
//! This is an explicit object handed to the connection layer — there is
//! no ambient global map. All registry operations are serialized by the
//! caller (the server keeps it behind one mutex), which is what makes
//! the scan-then-join matchmaking race-free; per-session work happens
//! inside the session actors and never holds the registry up.

use std::collections::HashMap;
use std::sync::Arc;

use gambit_protocol::{MoveRequest, SessionId};
use gambit_transport::ConnectionId;
use rand::Rng;

use crate::session::spawn_session;
use crate::{
    EventSender, JoinGrant, RulesOracle, SessionConfig, SessionError,
    SessionHandle, SessionInfo,
};

/// Default command channel size for session actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Owns every live session and the connection → session index.
pub struct SessionRegistry<O: RulesOracle> {
    /// Live sessions, keyed by id.
    sessions: HashMap<SessionId, SessionHandle>,

    /// Maps each connection to the session it is bound to. A connection
    /// is in at most one session, set once for its lifetime.
    members: HashMap<ConnectionId, SessionId>,

    /// The rules oracle shared by every session.
    oracle: Arc<O>,

    config: SessionConfig,
}

impl<O: RulesOracle> SessionRegistry<O> {
    /// Creates an empty registry with default session config.
    pub fn new(oracle: O) -> Self {
        Self::with_config(oracle, SessionConfig::default())
    }

    /// Creates an empty registry with the given session config.
    pub fn with_config(oracle: O, config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            members: HashMap::new(),
            oracle: Arc::new(oracle),
            config,
        }
    }

    /// Creates a new session with a fresh id, both seats open, and the
    /// oracle's initial position. Returns its id.
    pub fn create_session(&mut self) -> SessionId {
        let session_id = new_session_id();
        let handle = spawn_session(
            session_id.clone(),
            Arc::clone(&self.oracle),
            self.config.clone(),
            DEFAULT_CHANNEL_SIZE,
        );
        self.sessions.insert(session_id.clone(), handle);
        tracing::info!(%session_id, sessions = self.sessions.len(), "session created");
        session_id
    }

    /// Finds a session with an open seat, or creates one.
    ///
    /// First found wins — sessions are interchangeable, so no better
    /// tie-break is needed. There is no bound on concurrent sessions.
    pub async fn find_or_create(&mut self) -> SessionId {
        for (session_id, handle) in &self.sessions {
            if let Ok(info) = handle.info().await {
                if info.open_seats > 0 {
                    return session_id.clone();
                }
            }
        }
        self.create_session()
    }

    /// Binds a connection to a session and assigns its role.
    ///
    /// `target` of `None` match-makes via [`find_or_create`]; a
    /// specific id joins that session (as an observer when both seats
    /// are taken). The grant carries the session id and the role, which
    /// the session has already announced to the joiner over `sender`.
    ///
    /// [`find_or_create`]: SessionRegistry::find_or_create
    pub async fn join(
        &mut self,
        conn: ConnectionId,
        sender: EventSender,
        target: Option<SessionId>,
    ) -> Result<JoinGrant, SessionError> {
        if self.members.contains_key(&conn) {
            return Err(SessionError::AlreadyJoined(conn));
        }

        let session_id = match target {
            Some(id) => {
                if !self.sessions.contains_key(&id) {
                    return Err(SessionError::NotFound(id));
                }
                id
            }
            None => self.find_or_create().await,
        };

        let handle = self
            .sessions
            .get(&session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

        let grant = handle.join(conn, sender).await?;
        self.members.insert(conn, session_id);
        Ok(grant)
    }

    /// Routes a move attempt to the sender's session.
    ///
    /// The verdict (broadcast or unicast rejection) is delivered over
    /// the participants' event channels, not returned here.
    pub async fn route_move(
        &self,
        conn: ConnectionId,
        request: MoveRequest,
    ) -> Result<(), SessionError> {
        let session_id = self
            .members
            .get(&conn)
            .ok_or(SessionError::NotAMember(conn))?;

        let handle = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

        handle.submit_move(conn, request).await
    }

    /// Unbinds a departing connection from its session.
    ///
    /// A vacated seat resets the game (the session notifies the
    /// remaining participants); when the last seat empties the session
    /// is removed outright. Removal is not retried or recoverable, and
    /// the id is never reused.
    pub async fn leave(
        &mut self,
        conn: ConnectionId,
    ) -> Result<(), SessionError> {
        let session_id = self
            .members
            .remove(&conn)
            .ok_or(SessionError::NotAMember(conn))?;

        let report = match self.sessions.get(&session_id) {
            Some(handle) => handle.leave(conn).await?,
            // Session already dissolved underneath us; membership is
            // cleaned, nothing left to do.
            None => return Ok(()),
        };

        if report.vacated.is_some() && report.seats_empty {
            self.remove_session(&session_id).await;
        }
        Ok(())
    }

    /// Removes a session: shuts the actor down and purges every
    /// membership record pointing at it (stranded observers' channels
    /// close as the actor drops them).
    pub async fn remove_session(&mut self, session_id: &SessionId) {
        let Some(handle) = self.sessions.remove(session_id) else {
            return;
        };
        let _ = handle.shutdown().await;
        self.members.retain(|_, sid| *sid != *session_id);
        tracing::info!(%session_id, sessions = self.sessions.len(), "session removed");
    }

    /// Returns info for one session.
    pub async fn session_info(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionInfo, SessionError> {
        let handle = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;
        handle.info().await
    }

    /// The session a connection is bound to, if any.
    pub fn member_session(&self, conn: &ConnectionId) -> Option<&SessionId> {
        self.members.get(conn)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Ids of all live sessions.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().cloned().collect()
    }
}

/// Generates a random 32-character hex session id (128 bits).
///
/// Random rather than sequential so ids are unguessable enough to share
/// as invite links, and trivially never reused.
fn new_session_id() -> SessionId {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    SessionId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
