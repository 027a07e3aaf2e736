//! Room registry and game state machine for tictac.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! board, its seats, and its pending timers. Operations on one room are
//! applied one at a time; different rooms never wait on each other.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates rooms and routes every operation to them
//! - [`RegistryConfig`]: grace period, draw delay, inactivity and retention
//! - [`RoomError`]: the rejection taxonomy
//! - [`SweepReport`]: what a cleanup pass did

mod config;
mod error;
mod registry;
mod room;
mod state;
#[cfg(test)]
mod tests_props_state;

pub use config::RegistryConfig;
pub use error::RoomError;
pub use registry::{RoomRegistry, SweepReport};
