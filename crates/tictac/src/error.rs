//! Unified error type for tictac.

use tictac_protocol::ProtocolError;
use tictac_room::RoomError;

/// Top-level error that wraps all crate-specific errors.
///
/// Callers of the `tictac` facade deal with this single type. Malformed
/// input (a room code that isn't six letters or digits) surfaces as
/// `Protocol`; everything the game itself rejects is `Room`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TictacError {
    /// Malformed room code or board position.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A rejected room operation (not found, full, wrong turn, ...).
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl TictacError {
    /// A stable snake_case tag for presentation layers to switch on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Protocol(ProtocolError::InvalidRoomId(_)) => "invalid_room_id",
            Self::Protocol(ProtocolError::InvalidPosition(_)) => "invalid_position",
            Self::Room(e) => e.code(),
        }
    }
}
