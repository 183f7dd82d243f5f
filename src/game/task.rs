//! Room task: one tokio task per room serializes every command and tick

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::util::time::tick_duration;
use crate::ws::protocol::{ReportedKinematics, RoomId};

use super::entities::{Customization, PlayerId};
use super::error::RoomError;
use super::publish::Publisher;
use super::room::{GameStatus, JoinVia, RoomSim};

const COMMAND_BUFFER: usize = 256;

/// Fire-and-forget player input
#[derive(Debug, Clone)]
pub enum RoomInput {
    Ready { is_ready: bool },
    Start,
    Jump,
    Update(ReportedKinematics),
    Slice {
        fruit_id: String,
        slice_data: Option<Value>,
    },
    Customize(Customization),
}

#[derive(Debug)]
pub enum RoomCommand {
    Join {
        player_id: PlayerId,
        via: JoinVia,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Option<usize>>,
    },
    Input {
        player_id: PlayerId,
        input: RoomInput,
    },
    /// Shut the room down if nobody is in it; replies whether it closed
    Close { reply: oneshot::Sender<bool> },
}

/// State the task mirrors for lock-free readers
#[derive(Debug)]
struct RoomShared {
    player_count: AtomicUsize,
    playing: AtomicBool,
    closed: AtomicBool,
    empty_since: Mutex<Option<Instant>>,
}

/// Cloneable handle to a running room task
#[derive(Clone)]
pub struct RoomHandle {
    pub id: RoomId,
    pub name: String,
    pub max_players: usize,
    password: Option<String>,
    command_tx: mpsc::Sender<RoomCommand>,
    shared: Arc<RoomShared>,
}

impl RoomHandle {
    pub fn player_count(&self) -> usize {
        self.shared.player_count.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> GameStatus {
        if self.shared.playing.load(Ordering::Relaxed) {
            GameStatus::Playing
        } else {
            GameStatus::Waiting
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// When the room last became empty, if it is empty now
    pub fn empty_since(&self) -> Option<Instant> {
        *self.shared.empty_since.lock()
    }

    /// Rooms without a password accept anything
    pub fn check_password(&self, given: Option<&str>) -> bool {
        match &self.password {
            None => true,
            Some(expected) => given == Some(expected.as_str()),
        }
    }

    pub async fn send(&self, command: RoomCommand) -> Result<(), RoomError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| RoomError::RoomClosed)
    }

    pub async fn join(&self, player_id: PlayerId, via: JoinVia) -> Result<usize, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            player_id,
            via,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::RoomClosed)?
    }

    /// Remaining player count, or `None` if the player was not in the room
    pub async fn leave(&self, player_id: PlayerId) -> Option<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Leave { player_id, reply }).await.ok()?;
        rx.await.ok().flatten()
    }

    pub async fn input(&self, player_id: PlayerId, input: RoomInput) -> Result<(), RoomError> {
        self.send(RoomCommand::Input { player_id, input }).await
    }

    /// Ask the task to stop if the room is empty. Returns true when the room
    /// is gone afterwards, including when it had already stopped.
    pub async fn close_if_empty(&self) -> bool {
        if self.is_closed() {
            return true;
        }
        let (reply, rx) = oneshot::channel();
        if self.send(RoomCommand::Close { reply }).await.is_err() {
            return true;
        }
        rx.await.unwrap_or(true)
    }

    #[cfg(test)]
    pub fn set_empty_since(&self, at: Option<Instant>) {
        *self.shared.empty_since.lock() = at;
    }
}

/// The task owning one [`RoomSim`]
pub struct RoomTask {
    sim: RoomSim,
    commands: mpsc::Receiver<RoomCommand>,
    /// Present only while a game is running
    ticker: Option<Interval>,
    shared: Arc<RoomShared>,
}

impl RoomTask {
    pub fn new(
        id: RoomId,
        name: String,
        password: Option<String>,
        max_players: usize,
        config: Arc<GameConfig>,
        publisher: Arc<dyn Publisher>,
        seed: u64,
    ) -> (Self, RoomHandle) {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let shared = Arc::new(RoomShared {
            player_count: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            empty_since: Mutex::new(Some(Instant::now())),
        });

        let handle = RoomHandle {
            id: id.clone(),
            name: name.clone(),
            max_players,
            password,
            command_tx,
            shared: shared.clone(),
        };

        let task = Self {
            sim: RoomSim::new(id, name, max_players, config, publisher, seed),
            commands,
            ticker: None,
            shared,
        };

        (task, handle)
    }

    pub async fn run(mut self) {
        info!(room_id = %self.sim.id(), room_name = %self.sim.name(), "Room task started");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!(room_id = %self.sim.id(), "All room handles dropped");
                        break;
                    };
                    if self.handle(command).is_break() {
                        break;
                    }
                }
                _ = next_tick(&mut self.ticker) => {
                    self.sim.tick();
                }
            }
        }

        self.stop_ticker();
        self.shared.closed.store(true, Ordering::Release);
        info!(room_id = %self.sim.id(), ticks = self.sim.tick_count(), "Room task stopped");
    }

    fn handle(&mut self, command: RoomCommand) -> ControlFlow<()> {
        match command {
            RoomCommand::Join {
                player_id,
                via,
                reply,
            } => {
                let result = self.sim.join(player_id, via);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let remaining = self.sim.leave(player_id);
                if self.sim.is_empty() {
                    self.stop_ticker();
                }
                let _ = reply.send(remaining);
            }
            RoomCommand::Input { player_id, input } => self.apply_input(player_id, input),
            RoomCommand::Close { reply } => {
                if self.sim.is_empty() {
                    // Flag before replying so callers observe the closed state
                    self.shared.closed.store(true, Ordering::Release);
                    let _ = reply.send(true);
                    return ControlFlow::Break(());
                }
                let _ = reply.send(false);
            }
        }

        self.sync_shared();
        ControlFlow::Continue(())
    }

    fn apply_input(&mut self, player_id: PlayerId, input: RoomInput) {
        match input {
            RoomInput::Ready { is_ready } => self.sim.set_ready(player_id, is_ready),
            RoomInput::Start => {
                if self.sim.start_game(player_id) {
                    self.start_ticker();
                }
            }
            RoomInput::Jump => self.sim.jump(player_id),
            RoomInput::Update(kinematics) => self.sim.update_player(player_id, kinematics),
            RoomInput::Slice {
                fruit_id,
                slice_data,
            } => {
                let _ = self.sim.slice_fruit(player_id, &fruit_id, slice_data);
            }
            RoomInput::Customize(customization) => self.sim.customize(player_id, customization),
        }
    }

    fn start_ticker(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let mut ticker = interval(tick_duration());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
        debug!(room_id = %self.sim.id(), "Room ticker started");
    }

    fn stop_ticker(&mut self) {
        if self.ticker.take().is_some() {
            debug!(room_id = %self.sim.id(), "Room ticker stopped");
        }
    }

    fn sync_shared(&self) {
        let count = self.sim.player_count();
        self.shared.player_count.store(count, Ordering::Relaxed);
        self.shared
            .playing
            .store(self.sim.status() == GameStatus::Playing, Ordering::Relaxed);

        let mut empty_since = self.shared.empty_since.lock();
        if count == 0 {
            empty_since.get_or_insert_with(Instant::now);
        } else {
            *empty_since = None;
        }
    }
}

/// Resolves on the next tick, or never while no game is running
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::publish::RecordingPublisher;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use uuid::Uuid;

    fn spawn(publisher: &Arc<RecordingPublisher>) -> (RoomHandle, JoinHandle<()>) {
        let (task, handle) = RoomTask::new(
            "abcdefghi".to_string(),
            "lobby".to_string(),
            Some("secret".to_string()),
            4,
            Arc::new(GameConfig::default()),
            publisher.clone(),
            1,
        );
        (handle, tokio::spawn(task.run()))
    }

    #[test]
    fn idle_ticker_never_fires() {
        let mut ticker: Option<Interval> = None;
        let mut tick = tokio_test::task::spawn(next_tick(&mut ticker));
        tokio_test::assert_pending!(tick.poll());
    }

    #[test]
    fn password_check() {
        let publisher = Arc::new(RecordingPublisher::new());
        let (_, handle) = RoomTask::new(
            "abcdefghi".to_string(),
            "lobby".to_string(),
            Some("secret".to_string()),
            4,
            Arc::new(GameConfig::default()),
            publisher,
            1,
        );
        assert!(handle.check_password(Some("secret")));
        assert!(!handle.check_password(Some("guess")));
        assert!(!handle.check_password(None));
    }

    #[tokio::test]
    async fn join_updates_shared_counters() {
        let publisher = Arc::new(RecordingPublisher::new());
        let (handle, _task) = spawn(&publisher);
        assert!(handle.empty_since().is_some());

        let a = Uuid::new_v4();
        assert_eq!(handle.join(a, JoinVia::Create).await, Ok(1));
        assert_eq!(handle.player_count(), 1);
        assert!(handle.empty_since().is_none());

        for _ in 0..3 {
            handle.join(Uuid::new_v4(), JoinVia::Join).await.unwrap();
        }
        assert_eq!(
            handle.join(Uuid::new_v4(), JoinVia::Join).await,
            Err(RoomError::RoomFull)
        );
    }

    #[tokio::test]
    async fn started_room_ticks_until_emptied() {
        let publisher = Arc::new(RecordingPublisher::new());
        let (handle, _task) = spawn(&publisher);
        let a = Uuid::new_v4();
        handle.join(a, JoinVia::Create).await.unwrap();
        handle.input(a, RoomInput::Start).await.unwrap();
        // Second start is a no-op
        handle.input(a, RoomInput::Start).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(handle.status(), GameStatus::Playing);
        assert_eq!(publisher.count("gameStarted"), 1);
        assert!(publisher.count("gameUpdate") >= 2);

        assert_eq!(handle.leave(a).await, Some(0));
        let after_leave = publisher.count("gameUpdate");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(publisher.count("gameUpdate"), after_leave);
        assert!(handle.empty_since().is_some());
    }

    #[tokio::test]
    async fn close_only_when_empty_and_only_once() {
        let publisher = Arc::new(RecordingPublisher::new());
        let (handle, task) = spawn(&publisher);
        let a = Uuid::new_v4();
        handle.join(a, JoinVia::Create).await.unwrap();

        assert!(!handle.close_if_empty().await);
        assert!(!handle.is_closed());

        handle.leave(a).await;
        assert!(handle.close_if_empty().await);
        task.await.unwrap();
        assert!(handle.is_closed());
        assert!(handle.close_if_empty().await);

        assert_eq!(
            handle.join(Uuid::new_v4(), JoinVia::Join).await,
            Err(RoomError::RoomClosed)
        );
    }

    #[tokio::test]
    async fn slices_apply_between_ticks() {
        let publisher = Arc::new(RecordingPublisher::new());
        let (handle, _task) = spawn(&publisher);
        let a = Uuid::new_v4();
        handle.join(a, JoinVia::Create).await.unwrap();
        handle
            .input(
                a,
                RoomInput::Slice {
                    fruit_id: "nope".to_string(),
                    slice_data: None,
                },
            )
            .await
            .unwrap();
        handle.leave(a).await;
        assert_eq!(publisher.count("fruitSliced"), 0);
    }
}
