//! Error types for the room layer.

use whodunit_protocol::{ErrorCode, PlayerId, RoomCode};

/// A round rule refused an action. The round is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The action doesn't belong to the current phase (or there is no round).
    #[error("action not allowed in the current phase")]
    NotInPhase,

    /// The member already acted in a phase that allows one action each.
    #[error("already submitted for this turn")]
    DuplicateSubmission,

    /// The target is not a current (alive) participant, or is otherwise
    /// not a legal target.
    #[error("{0} is not a valid target")]
    InvalidTarget(PlayerId),

    /// Only the outlier may guess the secret.
    #[error("only the outlier may guess")]
    NotOutlier,

    /// The member's role or status doesn't permit the action.
    #[error("action not permitted: {0}")]
    InvalidAction(&'static str),
}

/// Errors that can occur during registry and room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room matches the code.
    #[error("room {0} not found")]
    NotFound(String),

    /// The room is at its member limit.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The connection already belongs to a room.
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    /// The connection is not a member of the room.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomCode),

    /// The connection belongs to no room.
    #[error("player {0} is not in any room")]
    NotInAnyRoom(PlayerId),

    /// A privileged action was requested by someone other than the host.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// Too few members to start a round.
    #[error("need at least {need} players to start, have {have}")]
    InsufficientPlayers { have: usize, need: usize },

    /// The round refused the action.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Every code drawn collided with a live room.
    #[error("no free room code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    /// The room's actor is gone (shut down between lookup and send).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

impl ActionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotInPhase => ErrorCode::NotInPhase,
            Self::DuplicateSubmission => ErrorCode::DuplicateSubmission,
            Self::InvalidTarget(_) => ErrorCode::InvalidTarget,
            Self::NotOutlier => ErrorCode::NotOutlier,
            Self::InvalidAction(_) => ErrorCode::InvalidAction,
        }
    }
}

impl RoomError {
    /// The wire code reported to the caller.
    ///
    /// A room that vanished mid-request is reported as not found: from
    /// the caller's side the code no longer names a live room.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) | Self::Unavailable(_) => ErrorCode::RoomNotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::AlreadyInRoom(..) => ErrorCode::AlreadyInRoom,
            Self::NotInRoom(..) | Self::NotInAnyRoom(_) => ErrorCode::NotInRoom,
            Self::NotHost(_) => ErrorCode::NotHost,
            Self::InsufficientPlayers { .. } => ErrorCode::InsufficientPlayers,
            Self::Action(e) => e.code(),
            Self::CodeSpaceExhausted { .. } => ErrorCode::Internal,
        }
    }
}

/// Problems with a category corpus.
#[derive(Debug, thiserror::Error)]
pub enum WordBankError {
    /// The bank has no categories.
    #[error("word bank has no categories")]
    Empty,

    /// A category has no words to draw from.
    #[error("category {0:?} has no words")]
    EmptyCategory(String),

    /// The JSON corpus could not be parsed.
    #[error("invalid word bank: {0}")]
    Parse(#[from] serde_json::Error),

    /// The corpus file could not be read.
    #[error("failed to read word bank: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_error_codes() {
        assert_eq!(RoomError::NotFound("ZZZZ".into()).code(), ErrorCode::RoomNotFound);
        assert_eq!(RoomError::NotHost(PlayerId(1)).code(), ErrorCode::NotHost);
        assert_eq!(
            RoomError::InsufficientPlayers { have: 2, need: 3 }.code(),
            ErrorCode::InsufficientPlayers
        );
        assert_eq!(
            RoomError::CodeSpaceExhausted { attempts: 3 }.code(),
            ErrorCode::Internal
        );
    }

    #[test]
    fn test_action_error_passes_through() {
        let err: RoomError = ActionError::DuplicateSubmission.into();
        assert_eq!(err.code(), ErrorCode::DuplicateSubmission);
        let err: RoomError = ActionError::InvalidTarget(PlayerId(9)).into();
        assert_eq!(err.code(), ErrorCode::InvalidTarget);
        assert!(err.to_string().contains("P-9"));
    }

    #[test]
    fn test_insufficient_players_message() {
        let err = RoomError::InsufficientPlayers { have: 2, need: 4 };
        assert_eq!(err.to_string(), "need at least 4 players to start, have 2");
    }
}
