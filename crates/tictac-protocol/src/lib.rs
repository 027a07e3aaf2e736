//! Shared vocabulary for tictac.
//!
//! This crate defines everything a presentation layer sees of a game room:
//!
//! - **Identities** ([`RoomId`], [`PlayerId`]): the shareable room code and
//!   the opaque player identity (usually a wallet address).
//! - **Board** ([`Board`], [`Symbol`]): the 3×3 grid and the win
//!   detection rules that every other crate relies on.
//! - **Snapshots** ([`Room`], [`Player`], [`RoomStatus`], [`Stake`]): the
//!   read-only view handed out after every operation.
//! - **Events** ([`RoomEvent`]): what subscribers receive when a room
//!   changes.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about timers, actors or locking. It is
//! plain data plus pure functions over that data:
//!
//! ```text
//! tictac-protocol (data) → tictac-room (state machine) → tictac (service)
//! ```

mod board;
mod error;
mod types;

pub use board::{Board, Symbol, BOARD_CELLS, WINNING_LINES};
pub use error::ProtocolError;
pub use types::{
    DisconnectedPlayer, Player, PlayerId, Room, RoomEvent, RoomId, RoomStatus,
    Stake, ROOM_ID_LEN,
};
