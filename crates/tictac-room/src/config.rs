//! Registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing and sizing knobs for a [`RoomRegistry`](crate::RoomRegistry).
///
/// Override the defaults with struct update syntax:
///
/// ```
/// # use std::time::Duration;
/// # use tictac_room::RegistryConfig;
/// let config = RegistryConfig {
///     reconnect_grace: Duration::from_secs(60),
///     ..RegistryConfig::default()
/// };
/// # assert_eq!(config.max_name_len, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// How long a player who left an in-progress game may rejoin before
    /// the opponent is awarded the win.
    pub reconnect_grace: Duration,

    /// Delay before a drawn board is cleared and play resumes.
    pub draw_restart_delay: Duration,

    /// Rooms with no seated players are deleted after this long without
    /// activity.
    pub inactivity_timeout: Duration,

    /// Finished rooms are deleted this long after they finished,
    /// regardless of anything else.
    pub finished_retention: Duration,

    /// Longest accepted room name, in characters.
    pub max_name_len: usize,

    /// Command channel capacity per room actor.
    pub channel_size: usize,

    /// Event buffer per room for subscribers. Slow subscribers that fall
    /// further behind skip ahead.
    pub event_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::from_secs(5 * 60),
            draw_restart_delay: Duration::from_secs(2),
            inactivity_timeout: Duration::from_secs(15 * 60),
            finished_retention: Duration::from_secs(60 * 60),
            max_name_len: 50,
            channel_size: 64,
            event_capacity: 32,
        }
    }
}
