//! `GameService` builder and background sweep loop.
//!
//! This is the entry point for hosting tictac rooms. It ties together the
//! layers: protocol (room codes) → room registry → periodic cleanup.

use std::sync::Arc;

use tictac_protocol::{PlayerId, Room, RoomEvent, RoomId, Stake};
use tictac_room::{RegistryConfig, RoomRegistry, SweepReport};
use tictac_timer::{SweepConfig, SweepMetrics, SweepSchedule};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::TictacError;

/// Builder for a [`GameService`].
///
/// # Example
///
/// ```rust,no_run
/// # use std::time::Duration;
/// # use tictac::prelude::*;
/// # async fn run() {
/// let service = GameService::builder()
///     .registry_config(RegistryConfig {
///         reconnect_grace: Duration::from_secs(60),
///         ..RegistryConfig::default()
///     })
///     .sweep_config(SweepConfig::every(Duration::from_secs(10)))
///     .build();
/// # service.shutdown().await;
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GameServiceBuilder {
    registry_config: RegistryConfig,
    sweep_config: SweepConfig,
}

impl GameServiceBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the room timings and limits.
    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry_config = config;
        self
    }

    /// Sets how often the background sweep runs.
    /// [`SweepConfig::disabled`] leaves only the lazy sweep done by
    /// `list_waiting_rooms`.
    pub fn sweep_config(mut self, config: SweepConfig) -> Self {
        self.sweep_config = config;
        self
    }

    /// Creates the registry and starts the background sweep.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> GameService {
        let registry = Arc::new(RoomRegistry::with_config(self.registry_config));

        let sweeper = if self.sweep_config.is_disabled() {
            None
        } else {
            let (stop_tx, stop_rx) = oneshot::channel();
            let schedule = SweepSchedule::new(self.sweep_config);
            let task = tokio::spawn(sweep_loop(Arc::clone(&registry), schedule, stop_rx));
            Some(Sweeper {
                stop: stop_tx,
                task,
            })
        };

        info!(background_sweep = sweeper.is_some(), "game service started");
        GameService { registry, sweeper }
    }
}

struct Sweeper {
    stop: oneshot::Sender<()>,
    task: JoinHandle<SweepMetrics>,
}

/// Hosts the room registry and keeps it clean.
///
/// Room codes come in as raw strings (what a player typed or a URL
/// carried) and are normalized here, so transport layers don't need to
/// know the code format. For typed access use [`registry`](Self::registry).
pub struct GameService {
    registry: Arc<RoomRegistry>,
    sweeper: Option<Sweeper>,
}

impl GameService {
    /// Creates a new builder.
    pub fn builder() -> GameServiceBuilder {
        GameServiceBuilder::new()
    }

    /// The underlying registry, for callers that already hold a [`RoomId`].
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    pub async fn create_room(
        &self,
        name: &str,
        creator: &str,
        display_name: &str,
        stake: Stake,
    ) -> Result<Room, TictacError> {
        Ok(self
            .registry
            .create_room(name, PlayerId::new(creator), display_name, stake)
            .await?)
    }

    pub async fn join_room(
        &self,
        code: &str,
        player: &str,
        display_name: &str,
    ) -> Result<Room, TictacError> {
        let room_id = RoomId::parse(code)?;
        Ok(self
            .registry
            .join_room(&room_id, PlayerId::new(player), display_name)
            .await?)
    }

    pub async fn make_move(
        &self,
        code: &str,
        player: &str,
        position: usize,
    ) -> Result<Room, TictacError> {
        let room_id = RoomId::parse(code)?;
        Ok(self
            .registry
            .make_move(&room_id, PlayerId::new(player), position)
            .await?)
    }

    /// Best-effort: `Ok(None)` if the room is unknown or was deleted.
    pub async fn leave_room(&self, code: &str, player: &str) -> Result<Option<Room>, TictacError> {
        let room_id = RoomId::parse(code)?;
        Ok(self
            .registry
            .leave_room(&room_id, PlayerId::new(player))
            .await)
    }

    pub async fn reset_game(&self, code: &str) -> Result<Option<Room>, TictacError> {
        let room_id = RoomId::parse(code)?;
        Ok(self.registry.reset_game(&room_id).await)
    }

    pub async fn get_room(&self, code: &str) -> Result<Option<Room>, TictacError> {
        let room_id = RoomId::parse(code)?;
        Ok(self.registry.get_room(&room_id).await)
    }

    /// `false` for malformed or unknown codes.
    pub async fn is_forfeit(&self, code: &str) -> bool {
        match RoomId::parse(code) {
            Ok(room_id) => self.registry.is_forfeit(&room_id).await,
            Err(_) => false,
        }
    }

    pub async fn list_waiting_rooms(&self) -> Vec<Room> {
        self.registry.list_waiting_rooms().await
    }

    pub async fn subscribe(&self, code: &str) -> Result<broadcast::Receiver<RoomEvent>, TictacError> {
        let room_id = RoomId::parse(code)?;
        Ok(self.registry.subscribe(&room_id).await?)
    }

    pub async fn update_treasury(&self, code: &str, treasury_id: &str) -> Result<Room, TictacError> {
        let room_id = RoomId::parse(code)?;
        Ok(self.registry.update_treasury(&room_id, treasury_id).await?)
    }

    pub async fn record_bet_transaction(
        &self,
        code: &str,
        transaction_id: &str,
    ) -> Result<Room, TictacError> {
        let room_id = RoomId::parse(code)?;
        Ok(self
            .registry
            .record_bet_transaction(&room_id, transaction_id)
            .await?)
    }

    /// Runs a cleanup pass now, independent of the background schedule.
    pub async fn sweep(&self) -> SweepReport {
        self.registry.sweep().await
    }

    /// Stops the background sweep, then every room.
    ///
    /// Returns the sweep loop's counters, or `None` if the background
    /// sweep was disabled.
    pub async fn shutdown(self) -> Option<SweepMetrics> {
        let metrics = match self.sweeper {
            Some(Sweeper { stop, task }) => {
                let _ = stop.send(());
                match task.await {
                    Ok(metrics) => Some(metrics),
                    Err(e) => {
                        warn!(error = %e, "sweep task ended abnormally");
                        None
                    }
                }
            }
            None => None,
        };
        self.registry.shutdown().await;
        info!("game service stopped");
        metrics
    }
}

/// Sweeps the registry on every tick of `schedule` until `stop` fires or
/// its sender is dropped.
async fn sweep_loop(
    registry: Arc<RoomRegistry>,
    mut schedule: SweepSchedule,
    mut stop: oneshot::Receiver<()>,
) -> SweepMetrics {
    debug!(interval_ms = schedule.interval().as_millis() as u64, "sweep loop started");

    loop {
        tokio::select! {
            _ = &mut stop => break,
            tick = schedule.wait_for_sweep() => {
                let report = registry.sweep().await;
                schedule.record_sweep_end();
                debug!(
                    sweep = tick.sweep,
                    checked = report.rooms_checked,
                    removed = report.rooms_removed,
                    forfeits = report.forfeits,
                    "background sweep"
                );
            }
        }
    }

    debug!(sweeps = schedule.sweep_count(), "sweep loop stopped");
    schedule.metrics().clone()
}
