//! Core protocol types for Whodunit's wire format.
//!
//! Every type here is serialized to JSON text and sent over a WebSocket.
//! Requests and events are closed enums: each message kind carries its own
//! fields and nothing else, so a payload that varies by recipient (the
//! outlier's role card, for instance) is a separate variant rather than an
//! optional field.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Ephemeral identity of one connection.
///
/// Assigned by the server at handshake from a process-wide counter. It is
/// never reused and dies with the connection; a reconnecting client is a
/// new player. Serialized as a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A short human-typeable room identifier, always canonical uppercase.
///
/// Input from players is case-insensitive and may carry stray whitespace;
/// [`RoomCode::parse`] normalizes it. Server-generated codes go through
/// `parse` as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalizes player input: trims, uppercases, and requires a
    /// non-empty ASCII alphanumeric string.
    ///
    /// Returns `None` for input that can never name a room.
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_ascii_uppercase();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who a server event is for.
///
/// Round logic returns `(Recipient, Event)` pairs and the room delivers
/// them. Role-specific payloads always use [`Recipient::Player`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every current member of the room.
    All,
    /// One member.
    Player(PlayerId),
}

// ---------------------------------------------------------------------------
// Public room state
// ---------------------------------------------------------------------------

/// A member as shown to everyone in the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
}

/// One line of a vote tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyEntry {
    pub player: PlayerId,
    pub votes: u32,
}

/// The public phase of a room, covering both rulesets.
///
/// Blend-in rounds move strictly `Clues → Voting → (Guess) → Reveal`.
/// Elimination rounds cycle `Night → Day → Night …` until `Ended`.
/// `Lobby` means no round has been started yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Lobby,
    Clues,
    Voting,
    Guess,
    Reveal,
    Night,
    Day,
    Ended,
}

impl RoundPhase {
    /// Returns `true` once a round can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reveal | Self::Ended)
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Lobby => "lobby",
            Self::Clues => "clues",
            Self::Voting => "voting",
            Self::Guess => "guess",
            Self::Reveal => "reveal",
            Self::Night => "night",
            Self::Day => "day",
            Self::Ended => "ended",
        };
        f.write_str(label)
    }
}

/// Room-level notifications shared by every ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RoomEvent {
    /// Membership, host and phase snapshot, sent after every mutation.
    /// `players` is in join order.
    RoomUpdate {
        room_code: RoomCode,
        host: Option<PlayerId>,
        phase: RoundPhase,
        players: Vec<PlayerSummary>,
    },

    /// The host left and the role passed on (or nobody is left).
    HostChanged { host: Option<PlayerId> },
}

// ---------------------------------------------------------------------------
// Errors reported to callers
// ---------------------------------------------------------------------------

/// Machine-readable reason a request was refused.
///
/// Always reported to the acting caller only, never broadcast. A refused
/// request leaves room state untouched and may simply be resubmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// No live room has this code.
    RoomNotFound,
    /// Only the host may do this.
    NotHost,
    /// Too few members to start a round.
    InsufficientPlayers,
    /// The action is not valid in the current phase.
    NotInPhase,
    /// The member already acted in a phase that allows one action.
    DuplicateSubmission,
    /// The target is not a current (alive) participant.
    InvalidTarget,
    /// Only the outlier may guess.
    NotOutlier,
    /// The member's role can't perform this action.
    InvalidAction,
    /// The room is at its member limit.
    RoomFull,
    /// The connection already belongs to a room.
    AlreadyInRoom,
    /// The connection is not a member of that room.
    NotInRoom,
    /// The frame could not be decoded or broke the handshake rules.
    BadRequest,
    /// Server-side failure, e.g. the room code space is exhausted.
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The synchronous answer to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AckResult {
    /// The request was applied. `room_code` is set for create and join.
    Accepted { room_code: Option<RoomCode> },
    /// The request was refused and nothing changed.
    Rejected { code: ErrorCode, message: String },
}

impl AckResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client can ask for. `A` is the ruleset's action type.
///
/// Internally tagged, so a join reads
/// `{ "type": "JoinRoom", "room_code": "ab12", "name": "Ada" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request<A> {
    /// First frame on every connection.
    Handshake { version: u32 },
    /// Keep-alive with the client's clock for RTT estimation.
    Heartbeat { client_time: u64 },
    /// Create a room; the caller becomes its host and only member.
    CreateRoom { name: String },
    /// Join an existing room. The code is case-insensitive.
    JoinRoom { room_code: String, name: String },
    /// Host only: start (or restart) a round.
    StartRound { room_code: String },
    /// A ruleset action (clue, vote, guess, night kill, ...).
    Act { room_code: String, action: A },
    /// Leave the current room without closing the connection.
    LeaveRoom,
    /// Close the connection.
    Disconnect { reason: String },
}

/// A request plus the caller's correlation id, echoed in the ack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFrame<A> {
    pub id: u64,
    pub request: Request<A>,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server sends. `E` is the ruleset's event type.
///
/// Adjacently tagged: `{ "type": "Game", "data": { "event": ... } }`, so a
/// client can tell framework traffic from game traffic with one lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerPayload<E> {
    /// Handshake accepted; this is the caller's identity.
    Welcome {
        player_id: PlayerId,
        protocol_version: u32,
    },
    /// Heartbeat echo.
    ///
    /// `client_time` is returned untouched. `server_time` is the number of
    /// milliseconds since this connection completed its handshake, not a
    /// wall-clock reading.
    HeartbeatAck { client_time: u64, server_time: u64 },
    /// Answer to the request with the same `id`.
    Ack { id: u64, result: AckResult },
    /// Room-level notification.
    Room(RoomEvent),
    /// Ruleset notification.
    Game(E),
}

/// A payload plus a per-connection sequence number.
///
/// `seq` increases by one per frame on a connection, so a client can
/// detect a gap or reordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFrame<E> {
    pub seq: u64,
    pub payload: ServerPayload<E>,
}
