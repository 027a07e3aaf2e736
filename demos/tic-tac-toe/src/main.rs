//! Scripted tic-tac-toe session: a win, a draw that restarts itself, and a
//! forfeit after a player walks away. Run with `RUST_LOG=debug` to see the
//! JSON snapshots a transport would send.

use std::time::Duration;

use tictac::prelude::*;
use tracing::{debug, info};

/// Short enough that the demo finishes in a few seconds.
const DEMO_GRACE: Duration = Duration::from_secs(3);
const DEMO_DRAW_DELAY: Duration = Duration::from_secs(1);

/// A scripted move: who, and which cell.
type Step<'a> = (&'a str, usize, usize);

fn cell(row: usize, col: usize) -> usize {
    row * 3 + col
}

fn demo_service() -> GameService {
    GameService::builder()
        .registry_config(RegistryConfig {
            reconnect_grace: DEMO_GRACE,
            draw_restart_delay: DEMO_DRAW_DELAY,
            ..RegistryConfig::default()
        })
        .sweep_config(SweepConfig::every(Duration::from_secs(1)))
        .build()
}

fn log_snapshot(label: &str, room: &Room) {
    info!(
        room_id = %room.id,
        status = %room.status,
        winner = ?room.winner.as_ref().map(PlayerId::as_str),
        "{label}\n{}",
        room.board
    );
    if let Ok(json) = serde_json::to_string(room) {
        debug!(room_id = %room.id, %json, "snapshot");
    }
}

async fn snapshot(service: &GameService, code: &str) -> Result<Room, TictacError> {
    match service.get_room(code).await? {
        Some(room) => Ok(room),
        None => Err(RoomError::NotFound(RoomId::parse(code)?).into()),
    }
}

/// Creates a room for `host` and seats `guest`. Returns the room code.
async fn open_table(
    service: &GameService,
    name: &str,
    host: &str,
    guest: &str,
) -> Result<String, TictacError> {
    let room = service
        .create_room(name, host, host, Stake::default())
        .await?;
    let code = room.id.to_string();
    let room = service.join_room(&code, guest, guest).await?;
    log_snapshot("game started", &room);
    Ok(code)
}

async fn play(service: &GameService, code: &str, script: &[Step<'_>]) -> Result<Room, TictacError> {
    let mut room = snapshot(service, code).await?;
    for &(player, row, col) in script {
        room = service.make_move(code, player, cell(row, col)).await?;
    }
    Ok(room)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// X takes the top row.
async fn scripted_win(service: &GameService) -> Result<Room, TictacError> {
    let code = open_table(service, "top row", "alice", "bob").await?;
    let room = play(
        service,
        &code,
        &[
            ("alice", 0, 0),
            ("bob", 1, 0),
            ("alice", 0, 1),
            ("bob", 1, 1),
            ("alice", 0, 2),
        ],
    )
    .await?;
    log_snapshot("won by play", &room);
    Ok(room)
}

/// Fills the board without a line, then waits for the automatic restart.
async fn scripted_draw(service: &GameService) -> Result<Room, TictacError> {
    let code = open_table(service, "stalemate", "carol", "dave").await?;
    let room = play(
        service,
        &code,
        &[
            ("carol", 0, 0),
            ("dave", 0, 1),
            ("carol", 0, 2),
            ("dave", 1, 1),
            ("carol", 1, 0),
            ("dave", 1, 2),
            ("carol", 2, 1),
            ("dave", 2, 0),
            ("carol", 2, 2),
        ],
    )
    .await?;
    log_snapshot("drawn", &room);

    tokio::time::sleep(DEMO_DRAW_DELAY + Duration::from_millis(100)).await;
    let room = snapshot(service, &code).await?;
    log_snapshot("board restarted", &room);
    Ok(room)
}

/// The guest walks away mid-game and never comes back.
async fn scripted_forfeit(service: &GameService) -> Result<Room, TictacError> {
    let code = open_table(service, "walkout", "erin", "frank").await?;
    play(service, &code, &[("erin", 1, 1)]).await?;

    if let Some(room) = service.leave_room(&code, "frank").await? {
        info!(
            room_id = %room.id,
            grace_secs = DEMO_GRACE.as_secs(),
            "frank left, waiting for a reconnect"
        );
    }
    tokio::time::sleep(DEMO_GRACE + Duration::from_millis(100)).await;

    let room = snapshot(service, &code).await?;
    log_snapshot("won by forfeit", &room);
    info!(forfeit = service.is_forfeit(&code).await, "forfeit check");
    Ok(room)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tictac::init_tracing();
    let service = demo_service();

    scripted_win(&service).await?;
    scripted_draw(&service).await?;
    scripted_forfeit(&service).await?;

    let lobby = service
        .create_room("open table", "grace", "Grace", Stake::new("0.1", "T-demo"))
        .await?;
    for room in service.list_waiting_rooms().await {
        info!(room_id = %room.id, name = %room.name, "waiting for an opponent");
    }
    service.leave_room(lobby.id.as_str(), "grace").await?;

    if let Some(metrics) = service.shutdown().await {
        info!(sweeps = metrics.total_sweeps, "done");
    }
    Ok(())
}
