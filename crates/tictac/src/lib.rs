//! # tictac
//!
//! Room coordination for two-player tic-tac-toe.
//!
//! tictac owns the game state: who sits in which room, whose turn it is,
//! who won. Transports (HTTP actions, push sockets) stay outside and talk
//! to a [`GameService`]. A player who drops out of a game in progress has
//! a grace period to come back before the opponent is awarded the win; a
//! drawn board starts over on its own; abandoned rooms are cleaned up in
//! the background.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tictac::prelude::*;
//!
//! # async fn run() -> Result<(), TictacError> {
//! tictac::init_tracing();
//! let service = GameService::builder().build();
//!
//! let room = service
//!     .create_room("friday night", "0xalice", "Alice", Stake::default())
//!     .await?;
//! let code = room.id.to_string();
//! service.join_room(&code, "0xbob", "Bob").await?;
//! service.make_move(&code, "0xalice", 4).await?;
//!
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod error;
mod logging;
mod service;

pub use error::TictacError;
pub use logging::init_tracing;
pub use service::{GameService, GameServiceBuilder};

pub use tictac_protocol as protocol;
pub use tictac_room as room;
pub use tictac_timer as timer;

pub mod prelude {
    pub use crate::{GameService, GameServiceBuilder, TictacError};
    pub use tictac_protocol::{
        Board, Player, PlayerId, Room, RoomEvent, RoomId, RoomStatus, Stake, Symbol,
    };
    pub use tictac_room::{RegistryConfig, RoomError, RoomRegistry, SweepReport};
    pub use tictac_timer::{SweepConfig, SweepMetrics};
}
