//! Identity types and room snapshots.
//!
//! A [`Room`] is a *snapshot*: the room actor owns the live state and hands
//! out clones after every operation. Nothing here mutates shared state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{Board, ProtocolError, Symbol};

/// Length of a room code.
pub const ROOM_ID_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The shareable code that identifies a room, e.g. `"K3F9QZ"`.
///
/// Always six uppercase ASCII letters or digits. Constructing one from user
/// input goes through [`RoomId::parse`], which normalizes case, so a code
/// typed as `"k3f9qz"` finds the same room.
///
/// `#[serde(try_from = "String")]` runs the same validation when a room id
/// arrives in a request body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Parses user input: surrounding whitespace is trimmed and letters
    /// are uppercased before validation.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() == ROOM_ID_LEN
            && code.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            Ok(Self(code))
        } else {
            Err(ProtocolError::InvalidRoomId(input.trim().to_string()))
        }
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

/// An opaque player identity, unique within a room.
///
/// In practice this is a wallet address, but the state machine never looks
/// inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the identity is blank (empty or whitespace).
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// A seated participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub symbol: Symbol,
}

/// A player who left an in-progress game and may still reconnect.
///
/// The full [`Player`] record is kept so a reconnect restores the same
/// symbol and display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedPlayer {
    pub player: Player,
    /// When the player left. Not serialized: it is a monotonic instant.
    #[serde(skip)]
    pub since: Instant,
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// Where a room is in its lifecycle.
///
/// ```text
///            second player joins          win / draw / forfeit
/// Waiting ───────────────────────→ Playing ─────────────────────→ Finished
///                                     ↑                              │
///                                     └──── draw restart / reset ────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Zero or one player, no active game.
    Waiting,
    /// Two seats taken and the board is live.
    Playing,
    /// Terminal until a draw restart or an explicit reset.
    Finished,
}

impl RoomStatus {
    /// Returns `true` if a new identity may take a seat.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if moves are accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Stake
// ---------------------------------------------------------------------------

/// External escrow references carried by a room.
///
/// Opaque to the game: nothing in the state machine reads these. They are
/// stored so the caller can settle the stake once it observes a winner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stake {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treasury_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_transaction_id: Option<String>,
}

impl Stake {
    pub fn new(bet_amount: impl Into<String>, treasury_id: impl Into<String>) -> Self {
        Self {
            bet_amount: Some(bet_amount.into()),
            treasury_id: Some(treasury_id.into()),
            bet_transaction_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A snapshot of one game room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// Active players in seat order. The first seat holds `X`.
    pub players: Vec<Player>,
    pub board: Board,
    /// Whose turn it is.
    pub current_player: Symbol,
    pub winner: Option<PlayerId>,
    pub status: RoomStatus,
    /// Players inside the reconnection grace window.
    pub disconnected_players: Vec<DisconnectedPlayer>,
    #[serde(flatten)]
    pub stake: Stake,
    #[serde(skip)]
    pub created_at: Instant,
    #[serde(skip)]
    pub last_activity: Instant,
    /// When the room last entered `Finished`, if it is finished.
    #[serde(skip)]
    pub finished_at: Option<Instant>,
}

impl Room {
    /// A fresh `waiting` room with its creator in the `X` seat.
    pub fn new(
        id: RoomId,
        name: String,
        creator: PlayerId,
        display_name: String,
        stake: Stake,
        now: Instant,
    ) -> Self {
        Self {
            id,
            name,
            players: vec![Player {
                id: creator,
                display_name,
                symbol: Symbol::FIRST,
            }],
            board: Board::new(),
            current_player: Symbol::FIRST,
            winner: None,
            status: RoomStatus::Waiting,
            disconnected_players: Vec::new(),
            stake,
            created_at: now,
            last_activity: now,
            finished_at: None,
        }
    }

    /// The active player with this identity.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// The disconnected player with this identity.
    pub fn disconnected(&self, id: &PlayerId) -> Option<&DisconnectedPlayer> {
        self.disconnected_players.iter().find(|d| &d.player.id == id)
    }

    /// Returns `true` if `id` holds a seat, active or within grace.
    pub fn is_seated(&self, id: &PlayerId) -> bool {
        self.player(id).is_some() || self.disconnected(id).is_some()
    }

    /// Seats taken, counting players within the grace window.
    pub fn seat_count(&self) -> usize {
        self.players.len() + self.disconnected_players.len()
    }

    /// Returns `true` if nobody holds a seat.
    pub fn is_empty(&self) -> bool {
        self.seat_count() == 0
    }

    /// The symbol held by the winner, looked up among every seat.
    pub fn winner_symbol(&self) -> Option<Symbol> {
        let winner = self.winner.as_ref()?;
        self.player(winner)
            .or_else(|| self.disconnected(winner).map(|d| &d.player))
            .map(|p| p.symbol)
    }

    /// Finished with no winner on a full board.
    ///
    /// A game abandoned by both players also finishes without a winner,
    /// but on a board that is not full, so it is not a draw.
    pub fn is_draw(&self) -> bool {
        self.status == RoomStatus::Finished && self.winner.is_none() && self.board.is_full()
    }

    /// Finished with a winner who has no completed line on the board.
    ///
    /// Derived from the board rather than stored, so it cannot drift from
    /// the state it describes.
    pub fn is_forfeit(&self) -> bool {
        if self.status != RoomStatus::Finished || self.winner.is_none() {
            return false;
        }
        match self.winner_symbol() {
            Some(symbol) => !self.board.has_line(symbol),
            None => self.board.winner().is_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomEvent
// ---------------------------------------------------------------------------

/// A change notification pushed to room subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum RoomEvent {
    /// The room changed; carries the new snapshot.
    Updated(Room),
    /// The game just ended. `winner` is `None` for a draw.
    Finished {
        winner: Option<PlayerId>,
        forfeit: bool,
    },
    /// The room was deleted. No further events follow.
    Closed,
}
