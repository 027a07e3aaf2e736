//! The game state machine for a single room.
//!
//! Pure and synchronous: every transition takes the current instant as an
//! argument and either mutates the room or rejects the request without
//! touching anything. The room actor owns one `RoomState` and is the only
//! caller, which is what gives each room its mutual exclusion.

use std::fmt;
use std::time::Duration;

use tictac_protocol::{Board, DisconnectedPlayer, Player, PlayerId, Room, RoomStatus, Symbol};
use tokio::time::Instant;

use crate::{RegistryConfig, RoomError};

/// What a leave request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Departure {
    /// Room finished, or the identity held no active seat.
    Unchanged,
    /// Removed from a waiting room that still has a player.
    Left,
    /// Moved into the grace window of an in-progress game.
    Disconnected,
    /// The last player left a waiting room; the room must be deleted.
    Abandoned,
}

/// Why the sweep decided a room should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expiry {
    /// Nobody seated and no activity for the inactivity timeout.
    Inactive,
    /// Finished longer ago than the retention window.
    Retention,
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => write!(f, "inactive"),
            Self::Retention => write!(f, "finished retention elapsed"),
        }
    }
}

pub(crate) struct RoomState {
    room: Room,
}

impl RoomState {
    pub(crate) fn new(room: Room) -> Self {
        Self { room }
    }

    pub(crate) fn room(&self) -> &Room {
        &self.room
    }

    fn touch(&mut self, now: Instant) {
        self.room.last_activity = now;
    }

    fn finish(&mut self, winner: Option<PlayerId>, now: Instant) {
        self.room.status = RoomStatus::Finished;
        self.room.winner = winner;
        self.room.finished_at = Some(now);
    }

    /// Clears the board and starts over with `X` to move. The room plays
    /// again only if both seats are taken.
    fn restart(&mut self, now: Instant) {
        self.room.board.clear();
        self.room.winner = None;
        self.room.finished_at = None;
        self.room.current_player = Symbol::FIRST;
        self.room.status = if self.room.seat_count() == 2 {
            RoomStatus::Playing
        } else {
            RoomStatus::Waiting
        };
        self.touch(now);
    }

    // -----------------------------------------------------------------
    // Join
    // -----------------------------------------------------------------

    /// Seats `player`, restores them from the grace window, or confirms
    /// they are already seated.
    ///
    /// Returns `Ok(true)` if the room changed.
    pub(crate) fn join(
        &mut self,
        player: PlayerId,
        display_name: String,
        now: Instant,
    ) -> Result<bool, RoomError> {
        if self.room.player(&player).is_some() {
            self.touch(now);
            return Ok(false);
        }

        if let Some(idx) = self
            .room
            .disconnected_players
            .iter()
            .position(|d| d.player.id == player)
        {
            let restored = self.room.disconnected_players.remove(idx).player;
            self.seat(restored);
            self.touch(now);
            return Ok(true);
        }

        if self.room.seat_count() >= 2 {
            return Err(RoomError::RoomFull(self.room.id.clone()));
        }
        if !self.room.status.is_joinable() {
            return Err(RoomError::InvalidState(format!(
                "cannot join room in state {}",
                self.room.status
            )));
        }

        let symbol = self.free_symbol();
        self.seat(Player {
            id: player,
            display_name,
            symbol,
        });

        if self.room.seat_count() == 2 {
            self.room.board = Board::new();
            self.room.current_player = Symbol::FIRST;
            self.room.winner = None;
            self.room.finished_at = None;
            self.room.status = RoomStatus::Playing;
        }
        self.touch(now);
        Ok(true)
    }

    /// The symbol no seat holds, counting players in the grace window.
    fn free_symbol(&self) -> Symbol {
        let held = |symbol: Symbol| {
            self.room.players.iter().any(|p| p.symbol == symbol)
                || self
                    .room
                    .disconnected_players
                    .iter()
                    .any(|d| d.player.symbol == symbol)
        };
        if held(Symbol::FIRST) {
            Symbol::FIRST.other()
        } else {
            Symbol::FIRST
        }
    }

    /// Inserts a player keeping the `X` seat first.
    fn seat(&mut self, player: Player) {
        if player.symbol == Symbol::X {
            self.room.players.insert(0, player);
        } else {
            self.room.players.push(player);
        }
    }

    // -----------------------------------------------------------------
    // Leave
    // -----------------------------------------------------------------

    pub(crate) fn leave(&mut self, player: &PlayerId, now: Instant) -> Departure {
        if self.room.status == RoomStatus::Finished {
            return Departure::Unchanged;
        }
        let Some(idx) = self.room.players.iter().position(|p| &p.id == player)
        else {
            return Departure::Unchanged;
        };

        let leaving = self.room.players.remove(idx);
        self.touch(now);

        match self.room.status {
            RoomStatus::Playing => {
                self.room.disconnected_players.push(DisconnectedPlayer {
                    player: leaving,
                    since: now,
                });
                Departure::Disconnected
            }
            _ => {
                if self.room.is_empty() {
                    Departure::Abandoned
                } else {
                    Departure::Left
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------

    /// Validates and applies a move. On any rejection the board is left
    /// untouched.
    pub(crate) fn make_move(
        &mut self,
        player: &PlayerId,
        position: usize,
        now: Instant,
    ) -> Result<(), RoomError> {
        let position = Board::check_position(position)?;
        let symbol = self
            .room
            .player(player)
            .map(|p| p.symbol)
            .ok_or_else(|| {
                RoomError::NotInRoom(player.clone(), self.room.id.clone())
            })?;
        if self.room.status != RoomStatus::Playing {
            return Err(RoomError::NotInProgress(self.room.id.clone()));
        }
        if symbol != self.room.current_player {
            return Err(RoomError::NotYourTurn(player.clone()));
        }
        if !self.room.board.is_empty_at(position) {
            return Err(RoomError::CellOccupied(position));
        }

        self.room.board.place(position, symbol)?;
        self.touch(now);

        if self.room.board.winner() == Some(symbol) {
            self.finish(Some(player.clone()), now);
        } else if self.room.board.is_full() {
            self.finish(None, now);
        } else {
            self.room.current_player = symbol.other();
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Resets
    // -----------------------------------------------------------------

    /// Explicit "play again".
    pub(crate) fn reset(&mut self, now: Instant) {
        self.restart(now);
    }

    /// The deferred restart after a draw. Re-checks that the room is still
    /// sitting on a drawn board; returns `false` (and does nothing) if
    /// something else happened in the meantime.
    pub(crate) fn restart_after_draw(&mut self, now: Instant) -> bool {
        let still_drawn = self.room.status == RoomStatus::Finished
            && self.room.winner.is_none()
            && self.room.board.is_full();
        if still_drawn {
            self.restart(now);
        }
        still_drawn
    }

    // -----------------------------------------------------------------
    // Grace window and expiry
    // -----------------------------------------------------------------

    /// When the earliest grace window closes.
    pub(crate) fn next_grace_deadline(&self, grace: Duration) -> Option<Instant> {
        self.room
            .disconnected_players
            .iter()
            .map(|d| d.since + grace)
            .min()
    }

    /// Drops disconnected players whose grace window has closed.
    ///
    /// A game left with a single seat is settled: whoever still holds it,
    /// active or in grace, wins by forfeit. A game left with no seats ends
    /// without a winner.
    ///
    /// Returns the identities that were dropped.
    pub(crate) fn expire_disconnected(
        &mut self,
        grace: Duration,
        now: Instant,
    ) -> Vec<PlayerId> {
        let (expired, kept): (Vec<_>, Vec<_>) = self
            .room
            .disconnected_players
            .drain(..)
            .partition(|d| now >= d.since + grace);
        self.room.disconnected_players = kept;

        if expired.is_empty() {
            return Vec::new();
        }

        if self.room.status == RoomStatus::Playing && self.room.seat_count() < 2 {
            let survivor = self
                .room
                .players
                .first()
                .map(|p| p.id.clone())
                .or_else(|| {
                    self.room
                        .disconnected_players
                        .first()
                        .map(|d| d.player.id.clone())
                });
            self.finish(survivor, now);
        }
        self.touch(now);
        expired.into_iter().map(|d| d.player.id).collect()
    }

    /// Whether the sweep should delete this room now.
    pub(crate) fn expiry(&self, config: &RegistryConfig, now: Instant) -> Option<Expiry> {
        if let Some(finished_at) = self.room.finished_at {
            if self.room.status == RoomStatus::Finished
                && now >= finished_at + config.finished_retention
            {
                return Some(Expiry::Retention);
            }
        }
        if self.room.is_empty()
            && now >= self.room.last_activity + config.inactivity_timeout
        {
            return Some(Expiry::Inactive);
        }
        None
    }

    // -----------------------------------------------------------------
    // Stake references
    // -----------------------------------------------------------------

    pub(crate) fn set_treasury(&mut self, treasury_id: String, now: Instant) {
        self.room.stake.treasury_id = Some(treasury_id);
        self.touch(now);
    }

    pub(crate) fn set_bet_transaction(&mut self, transaction_id: String, now: Instant) {
        self.room.stake.bet_transaction_id = Some(transaction_id);
        self.touch(now);
    }
}
