//! Error types for the protocol layer.
//!
//! These only cover malformed values. Anything that depends on the state
//! of a room lives in `tictac-room`'s `RoomError`.

/// Errors produced while parsing or validating protocol values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A room code that is not exactly six ASCII letters or digits.
    ///
    /// The offending input is kept (after trimming) so it can be echoed
    /// back to the user.
    #[error("invalid room id {0:?}: expected 6 letters or digits")]
    InvalidRoomId(String),

    /// A board position outside `0..=8`.
    #[error("invalid board position {0}: expected 0-8")]
    InvalidPosition(usize),
}
