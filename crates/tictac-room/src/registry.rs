//! Room registry: creates, tracks, and routes requests to rooms.

use std::collections::HashMap;

use rand::Rng;
use tictac_protocol::{
    Board, PlayerId, Room, RoomEvent, RoomId, RoomStatus, Stake, ROOM_ID_LEN,
};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::room::{RoomHandle, StakeUpdate, spawn_room};
use crate::{RegistryConfig, RoomError};

/// Characters a room code is drawn from.
const ROOM_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Totals from one [`RoomRegistry::sweep`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Rooms that were still registered when the pass started.
    pub rooms_checked: usize,
    /// Rooms deleted for inactivity or finished retention.
    pub rooms_removed: usize,
    /// Games decided because a disconnected player never came back.
    pub forfeits: usize,
    /// Disconnected players whose grace window closed.
    pub players_expired: usize,
}

/// Owns every live room.
///
/// The registry is an explicit object: construct one per process (or per
/// test) and share it behind an `Arc`. All methods take `&self`. The room
/// map lock is held only to look up, insert, or remove a handle, never
/// while a room is working, so a slow room can't stall the others.
pub struct RoomRegistry {
    config: RegistryConfig,
    rooms: RwLock<HashMap<RoomId, RoomHandle>>,
}

impl RoomRegistry {
    /// Creates an empty registry with the default timings.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    async fn handle(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Drops the handle for `room_id`. Returns `false` if another caller
    /// already removed it.
    async fn forget(&self, room_id: &RoomId) -> bool {
        let removed = self.rooms.write().await.remove(room_id).is_some();
        if removed {
            debug!(%room_id, "room handle removed");
        }
        removed
    }

    // -----------------------------------------------------------------
    // Create / join
    // -----------------------------------------------------------------

    /// Creates a room with `creator` in the `X` seat.
    ///
    /// The room is registered, and visible to `join_room` and
    /// `list_waiting_rooms`, before this returns. A blank `display_name`
    /// falls back to the identity.
    pub async fn create_room(
        &self,
        name: &str,
        creator: PlayerId,
        display_name: &str,
        stake: Stake,
    ) -> Result<Room, RoomError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::InvalidInput("room name is required".into()));
        }
        if name.chars().count() > self.config.max_name_len {
            return Err(RoomError::InvalidInput(format!(
                "room name longer than {} characters",
                self.config.max_name_len
            )));
        }
        if creator.is_blank() {
            return Err(RoomError::InvalidInput("player identity is required".into()));
        }
        let display_name = display_name_or_id(display_name, &creator);

        let mut rooms = self.rooms.write().await;
        let room_id = loop {
            let candidate = generate_room_id()?;
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
            warn!(room_id = %candidate, "room code collision, retrying");
        };

        let room = Room::new(
            room_id.clone(),
            name.to_string(),
            creator.clone(),
            display_name,
            stake,
            tokio::time::Instant::now(),
        );
        let handle = spawn_room(room.clone(), self.config.clone());
        rooms.insert(room_id.clone(), handle);
        info!(%room_id, name = %room.name, %creator, "room created");
        Ok(room)
    }

    /// Seats `player` in a room, or restores them if they are within the
    /// reconnection grace window.
    ///
    /// Joining a room the identity already sits in returns the room
    /// unchanged.
    pub async fn join_room(
        &self,
        room_id: &RoomId,
        player: PlayerId,
        display_name: &str,
    ) -> Result<Room, RoomError> {
        if player.is_blank() {
            return Err(RoomError::InvalidInput("player identity is required".into()));
        }
        let display_name = display_name_or_id(display_name, &player);
        let handle = self.handle(room_id).await?;
        handle.join(player, display_name).await
    }

    // -----------------------------------------------------------------
    // Play
    // -----------------------------------------------------------------

    /// Places the player's symbol at `position` (0-8, row-major).
    ///
    /// The position is checked before the room is looked up, so an
    /// out-of-range move fails with `InvalidPosition` even for an unknown
    /// room.
    pub async fn make_move(
        &self,
        room_id: &RoomId,
        player: PlayerId,
        position: usize,
    ) -> Result<Room, RoomError> {
        Board::check_position(position)?;
        let handle = self.handle(room_id).await?;
        handle.make_move(player, position).await
    }

    /// Best-effort leave.
    ///
    /// Returns `None` if the room doesn't exist or was deleted because its
    /// last occupant left. Leaving a game in progress starts the
    /// reconnection grace window instead of forfeiting.
    pub async fn leave_room(&self, room_id: &RoomId, player: PlayerId) -> Option<Room> {
        let handle = self.handle(room_id).await.ok()?;
        match handle.leave(player).await {
            Ok(Some(room)) => Some(room),
            Ok(None) => {
                self.forget(room_id).await;
                info!(%room_id, "room deleted");
                None
            }
            Err(_) => None,
        }
    }

    /// "Play again": clears the board with `X` to move.
    ///
    /// The room goes back to `playing` if both seats are taken, otherwise
    /// to `waiting`. Any pending draw restart is cancelled.
    pub async fn reset_game(&self, room_id: &RoomId) -> Option<Room> {
        let handle = self.handle(room_id).await.ok()?;
        handle.reset().await.ok()
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// Current snapshot of a room. Does not touch its activity time.
    pub async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let handle = self.handle(room_id).await.ok()?;
        handle.snapshot().await.ok()
    }

    /// Whether the room's game was won by forfeit rather than by a line.
    /// `false` for unknown rooms.
    pub async fn is_forfeit(&self, room_id: &RoomId) -> bool {
        self.get_room(room_id)
            .await
            .is_some_and(|room| room.is_forfeit())
    }

    /// Rooms waiting for a second player, newest first.
    ///
    /// Runs a [`sweep`](Self::sweep) first, so dead rooms never show up
    /// here.
    pub async fn list_waiting_rooms(&self) -> Vec<Room> {
        self.sweep().await;

        let handles: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();
        let mut waiting = Vec::new();
        for handle in handles {
            if let Ok(room) = handle.snapshot().await {
                if room.status == RoomStatus::Waiting {
                    waiting.push(room);
                }
            }
        }
        waiting.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        waiting
    }

    /// Receives every change to a room until it is deleted.
    pub async fn subscribe(
        &self,
        room_id: &RoomId,
    ) -> Result<broadcast::Receiver<RoomEvent>, RoomError> {
        Ok(self.handle(room_id).await?.subscribe())
    }

    /// Number of registered rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.read().await.keys().cloned().collect()
    }

    // -----------------------------------------------------------------
    // Stake references
    // -----------------------------------------------------------------

    /// Records the escrow account holding this room's stake.
    pub async fn update_treasury(
        &self,
        room_id: &RoomId,
        treasury_id: &str,
    ) -> Result<Room, RoomError> {
        let treasury_id = non_blank(treasury_id, "treasury id")?;
        let handle = self.handle(room_id).await?;
        handle.update_stake(StakeUpdate::Treasury(treasury_id)).await
    }

    /// Records the transaction that locked the stake.
    pub async fn record_bet_transaction(
        &self,
        room_id: &RoomId,
        transaction_id: &str,
    ) -> Result<Room, RoomError> {
        let transaction_id = non_blank(transaction_id, "transaction id")?;
        let handle = self.handle(room_id).await?;
        handle
            .update_stake(StakeUpdate::BetTransaction(transaction_id))
            .await
    }

    // -----------------------------------------------------------------
    // Cleanup
    // -----------------------------------------------------------------

    /// Expires grace windows (awarding forfeits), then deletes rooms that
    /// are empty and inactive or finished past retention.
    ///
    /// Each room decides for itself inside its own actor, so a sweep never
    /// races a foreground operation on the same room.
    pub async fn sweep(&self) -> SweepReport {
        let handles: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();
        let mut report = SweepReport {
            rooms_checked: handles.len(),
            ..SweepReport::default()
        };

        for handle in handles {
            let removed = match handle.sweep().await {
                Ok(outcome) => {
                    report.players_expired += outcome.players_expired;
                    report.forfeits += usize::from(outcome.forfeit);
                    outcome.removed
                }
                Err(_) => true,
            };
            if removed && self.forget(handle.room_id()).await {
                report.rooms_removed += 1;
            }
        }

        if report.rooms_removed > 0 || report.forfeits > 0 {
            info!(
                removed = report.rooms_removed,
                forfeits = report.forfeits,
                expired = report.players_expired,
                "sweep complete"
            );
        }
        report
    }

    /// Deletes a room immediately, cancelling anything it had pending.
    pub async fn destroy_room(&self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .write()
            .await
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let _ = handle.shutdown().await;
        info!(%room_id, "room destroyed");
        Ok(())
    }

    /// Stops every room.
    pub async fn shutdown(&self) {
        let handles: Vec<RoomHandle> = self.rooms.write().await.drain().map(|(_, h)| h).collect();
        let count = handles.len();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
        info!(rooms = count, "registry shut down");
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Six random characters from [`ROOM_ID_CHARSET`].
fn generate_room_id() -> Result<RoomId, RoomError> {
    let mut rng = rand::rng();
    let code: String = (0..ROOM_ID_LEN)
        .map(|_| ROOM_ID_CHARSET[rng.random_range(0..ROOM_ID_CHARSET.len())] as char)
        .collect();
    Ok(RoomId::try_from(code)?)
}

fn display_name_or_id(display_name: &str, id: &PlayerId) -> String {
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        id.to_string()
    } else {
        trimmed.to_string()
    }
}

fn non_blank(value: &str, what: &str) -> Result<String, RoomError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(RoomError::InvalidInput(format!("{what} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}
