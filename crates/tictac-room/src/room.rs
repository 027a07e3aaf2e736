//! Room actor: an isolated Tokio task that owns one room.
//!
//! Each room runs in its own task and is reached only through its command
//! channel, so two operations on the same room can never interleave while
//! different rooms proceed independently. The deferred draw restart and
//! the grace-window deadline are timers inside the same task: they are
//! serialized with foreground commands and die with the actor when the
//! room is deleted.

use tictac_protocol::{PlayerId, Room, RoomEvent, RoomId, RoomStatus};
use tictac_timer::Timers;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::state::{Departure, RoomState};
use crate::{RegistryConfig, RoomError};

/// Deadlines a room can have pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoomTimer {
    /// Clear a drawn board and play again.
    DrawRestart,
    /// The earliest grace window closes.
    GraceExpiry,
}

/// Which escrow reference to record.
#[derive(Debug)]
pub(crate) enum StakeUpdate {
    Treasury(String),
    BetTransaction(String),
}

/// What a sweep pass did to one room.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SweepOutcome {
    /// Disconnected players dropped because their grace window closed.
    pub(crate) players_expired: usize,
    /// The sweep awarded a win by forfeit.
    pub(crate) forfeit: bool,
    /// The room is gone; its actor has stopped.
    pub(crate) removed: bool,
}

/// Commands sent to a room actor through its channel.
///
/// Variants with a `reply` are request/response: the caller awaits the
/// answer on the oneshot.
pub(crate) enum RoomCommand {
    Join {
        player: PlayerId,
        display_name: String,
        reply: oneshot::Sender<Result<Room, RoomError>>,
    },

    /// `None` in the reply means the room was deleted.
    Leave {
        player: PlayerId,
        reply: oneshot::Sender<Option<Room>>,
    },

    Move {
        player: PlayerId,
        position: usize,
        reply: oneshot::Sender<Result<Room, RoomError>>,
    },

    Reset {
        reply: oneshot::Sender<Room>,
    },

    UpdateStake {
        update: StakeUpdate,
        reply: oneshot::Sender<Room>,
    },

    Snapshot {
        reply: oneshot::Sender<Room>,
    },

    /// Expire grace windows, then decide whether the room should go.
    Sweep {
        reply: oneshot::Sender<SweepOutcome>,
    },

    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone. Once the actor has stopped, every request fails with
/// [`RoomError::NotFound`].
#[derive(Clone)]
pub(crate) struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
    events: broadcast::Sender<RoomEvent>,
}

impl RoomHandle {
    pub(crate) fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    fn gone(&self) -> RoomError {
        RoomError::NotFound(self.room_id.clone())
    }

    /// Sends a command and waits for the reply.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.gone())?;
        reply_rx.await.map_err(|_| self.gone())
    }

    pub(crate) async fn join(
        &self,
        player: PlayerId,
        display_name: String,
    ) -> Result<Room, RoomError> {
        self.request(|reply| RoomCommand::Join {
            player,
            display_name,
            reply,
        })
        .await?
    }

    pub(crate) async fn leave(&self, player: PlayerId) -> Result<Option<Room>, RoomError> {
        self.request(|reply| RoomCommand::Leave { player, reply }).await
    }

    pub(crate) async fn make_move(
        &self,
        player: PlayerId,
        position: usize,
    ) -> Result<Room, RoomError> {
        self.request(|reply| RoomCommand::Move {
            player,
            position,
            reply,
        })
        .await?
    }

    pub(crate) async fn reset(&self) -> Result<Room, RoomError> {
        self.request(|reply| RoomCommand::Reset { reply }).await
    }

    pub(crate) async fn update_stake(&self, update: StakeUpdate) -> Result<Room, RoomError> {
        self.request(|reply| RoomCommand::UpdateStake { update, reply })
            .await
    }

    pub(crate) async fn snapshot(&self) -> Result<Room, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    pub(crate) async fn sweep(&self) -> Result<SweepOutcome, RoomError> {
        self.request(|reply| RoomCommand::Sweep { reply }).await
    }

    /// Subscribes to room events. Does not round-trip through the actor.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    /// Tells the room to stop. Pending timers are dropped with it.
    pub(crate) async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.gone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    state: RoomState,
    config: RegistryConfig,
    timers: Timers<RoomTimer>,
    events: broadcast::Sender<RoomEvent>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until shutdown, deletion, or every handle is
    /// dropped.
    async fn run(mut self) {
        debug!(room_id = %self.room_id, "room actor started");

        loop {
            let flow = tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => Flow::Stop,
                },
                timer = self.timers.next_due() => self.handle_timer(timer),
            };
            if flow == Flow::Stop {
                break;
            }
        }

        self.timers.cancel_all();
        let _ = self.events.send(RoomEvent::Closed);
        debug!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) -> Flow {
        let now = Instant::now();
        let was_finished = self.is_finished();

        match cmd {
            RoomCommand::Join {
                player,
                display_name,
                reply,
            } => {
                let was_waiting = self.state.room().status == RoomStatus::Waiting;
                let result = self.state.join(player.clone(), display_name, now);
                match &result {
                    Ok(true) => {
                        info!(
                            room_id = %self.room_id,
                            %player,
                            status = %self.state.room().status,
                            "player joined"
                        );
                        if was_waiting && self.state.room().status == RoomStatus::Playing {
                            info!(room_id = %self.room_id, "game started");
                        }
                        self.commit(was_finished);
                    }
                    Ok(false) => {
                        debug!(room_id = %self.room_id, %player, "player already seated");
                    }
                    Err(e) => {
                        debug!(room_id = %self.room_id, %player, error = %e, "join rejected");
                    }
                }
                let _ = reply.send(result.map(|_| self.snapshot()));
                Flow::Continue
            }

            RoomCommand::Leave { player, reply } => {
                match self.state.leave(&player, now) {
                    Departure::Unchanged => {
                        let _ = reply.send(Some(self.snapshot()));
                        Flow::Continue
                    }
                    Departure::Left => {
                        info!(room_id = %self.room_id, %player, "player left");
                        self.commit(was_finished);
                        let _ = reply.send(Some(self.snapshot()));
                        Flow::Continue
                    }
                    Departure::Disconnected => {
                        info!(
                            room_id = %self.room_id,
                            %player,
                            grace_secs = self.config.reconnect_grace.as_secs(),
                            "player left game in progress, grace period started"
                        );
                        self.commit(was_finished);
                        let _ = reply.send(Some(self.snapshot()));
                        Flow::Continue
                    }
                    Departure::Abandoned => {
                        info!(room_id = %self.room_id, %player, "last player left waiting room");
                        let _ = reply.send(None);
                        Flow::Stop
                    }
                }
            }

            RoomCommand::Move {
                player,
                position,
                reply,
            } => {
                let result = self.state.make_move(&player, position, now);
                match &result {
                    Ok(()) => self.commit(was_finished),
                    Err(e) => {
                        debug!(
                            room_id = %self.room_id,
                            %player,
                            position,
                            error = %e,
                            "move rejected"
                        );
                    }
                }
                let _ = reply.send(result.map(|()| self.snapshot()));
                Flow::Continue
            }

            RoomCommand::Reset { reply } => {
                self.state.reset(now);
                info!(room_id = %self.room_id, status = %self.state.room().status, "game reset");
                self.commit(was_finished);
                let _ = reply.send(self.snapshot());
                Flow::Continue
            }

            RoomCommand::UpdateStake { update, reply } => {
                match update {
                    StakeUpdate::Treasury(id) => {
                        info!(room_id = %self.room_id, treasury_id = %id, "treasury recorded");
                        self.state.set_treasury(id, now);
                    }
                    StakeUpdate::BetTransaction(tx) => {
                        info!(room_id = %self.room_id, transaction_id = %tx, "bet transaction recorded");
                        self.state.set_bet_transaction(tx, now);
                    }
                }
                self.commit(was_finished);
                let _ = reply.send(self.snapshot());
                Flow::Continue
            }

            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
                Flow::Continue
            }

            RoomCommand::Sweep { reply } => {
                let mut outcome = SweepOutcome::default();
                let expired = self.state.expire_disconnected(self.config.reconnect_grace, now);
                if !expired.is_empty() {
                    outcome.players_expired = expired.len();
                    outcome.forfeit = self.note_expired(&expired, was_finished);
                }

                if let Some(reason) = self.state.expiry(&self.config, now) {
                    info!(room_id = %self.room_id, %reason, "room expired");
                    outcome.removed = true;
                    let _ = reply.send(outcome);
                    return Flow::Stop;
                }
                let _ = reply.send(outcome);
                Flow::Continue
            }

            RoomCommand::Shutdown => {
                debug!(room_id = %self.room_id, "room shutting down");
                Flow::Stop
            }
        }
    }

    fn handle_timer(&mut self, timer: RoomTimer) -> Flow {
        let now = Instant::now();
        let was_finished = self.is_finished();

        match timer {
            RoomTimer::DrawRestart => {
                if self.state.restart_after_draw(now) {
                    info!(room_id = %self.room_id, "board restarted after draw");
                    self.commit(was_finished);
                } else {
                    debug!(room_id = %self.room_id, "stale draw restart ignored");
                }
            }
            RoomTimer::GraceExpiry => {
                let expired = self.state.expire_disconnected(self.config.reconnect_grace, now);
                if expired.is_empty() {
                    self.sync_grace_timer();
                } else {
                    self.note_expired(&expired, was_finished);
                }
            }
        }
        Flow::Continue
    }

    /// Logs dropped players, publishes the change, and reports whether a
    /// forfeit was awarded.
    fn note_expired(&mut self, expired: &[PlayerId], was_finished: bool) -> bool {
        for player in expired {
            info!(room_id = %self.room_id, %player, "grace period elapsed");
        }
        let forfeit = !was_finished && self.state.room().is_forfeit();
        if forfeit {
            if let Some(winner) = &self.state.room().winner {
                info!(room_id = %self.room_id, %winner, "win awarded by forfeit");
            }
        }
        self.commit(was_finished);
        forfeit
    }

    /// Publishes a change and brings the timers in line with the new
    /// state.
    fn commit(&mut self, was_finished: bool) {
        let room = self.state.room();

        if room.status == RoomStatus::Finished {
            if !was_finished {
                match &room.winner {
                    Some(winner) => {
                        info!(room_id = %self.room_id, %winner, "game finished")
                    }
                    None if room.is_draw() => info!(room_id = %self.room_id, "game drawn"),
                    None => info!(room_id = %self.room_id, "game abandoned"),
                }
                if room.is_draw() {
                    self.timers
                        .schedule(RoomTimer::DrawRestart, self.config.draw_restart_delay);
                }
            }
        } else {
            self.timers.cancel(RoomTimer::DrawRestart);
        }

        let room = self.snapshot();
        let finished_now = !was_finished && room.status == RoomStatus::Finished;
        let finished = RoomEvent::Finished {
            winner: room.winner.clone(),
            forfeit: room.is_forfeit(),
        };
        let _ = self.events.send(RoomEvent::Updated(room));
        if finished_now {
            let _ = self.events.send(finished);
        }

        self.sync_grace_timer();
    }

    fn sync_grace_timer(&mut self) {
        match self.state.next_grace_deadline(self.config.reconnect_grace) {
            Some(deadline) => self.timers.schedule_at(RoomTimer::GraceExpiry, deadline),
            None => {
                self.timers.cancel(RoomTimer::GraceExpiry);
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.state.room().status == RoomStatus::Finished
    }

    fn snapshot(&self) -> Room {
        self.state.room().clone()
    }
}

/// Spawns a room actor for `room` and returns a handle to it.
pub(crate) fn spawn_room(room: Room, config: RegistryConfig) -> RoomHandle {
    let room_id = room.id.clone();
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let (events, _) = broadcast::channel(config.event_capacity.max(1));

    let actor = RoomActor {
        room_id: room_id.clone(),
        state: RoomState::new(room),
        config,
        timers: Timers::new(),
        events: events.clone(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
        events,
    }
}
