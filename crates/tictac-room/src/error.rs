//! Error types for the room layer.

use tictac_protocol::{PlayerId, ProtocolError, RoomId};

/// Errors that can occur during room operations.
///
/// Every variant is an expected, recoverable rejection. A rejected
/// operation leaves the room exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (or was deleted while the request was in
    /// flight).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// A request field failed validation, e.g. an empty room name.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A move position outside `0..=8`.
    #[error("invalid position {0}: expected 0-8")]
    InvalidPosition(usize),

    /// The player does not hold an active seat in this room.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomId),

    /// Moves are only accepted while the room is `playing`.
    #[error("game in room {0} is not in progress")]
    NotInProgress(RoomId),

    /// The player tried to move out of turn.
    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    /// The target cell already holds a symbol.
    #[error("position {0} is already taken")]
    CellOccupied(usize),

    /// Both seats are taken by other identities.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The room is in a state that doesn't allow this operation.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),
}

impl RoomError {
    /// A stable tag for presentation layers to switch on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidPosition(_) => "invalid_position",
            Self::NotInRoom(..) => "not_in_room",
            Self::NotInProgress(_) => "not_in_progress",
            Self::NotYourTurn(_) => "not_your_turn",
            Self::CellOccupied(_) => "cell_occupied",
            Self::RoomFull(_) => "room_full",
            Self::InvalidState(_) => "invalid_state",
        }
    }
}

impl From<ProtocolError> for RoomError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidPosition(p) => Self::InvalidPosition(p),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}
