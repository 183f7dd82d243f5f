//! Registry of all live rooms

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::GameConfig;
use crate::util::ids::generate_room_id;
use crate::ws::protocol::RoomId;

use super::entities::PlayerId;
use super::error::RoomError;
use super::publish::Publisher;
use super::room::JoinVia;
use super::task::{RoomHandle, RoomInput, RoomTask};

/// Owns every room. Rooms are looked up by id, names are unique, and each
/// player is in at most one room.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, RoomHandle>,
    /// Room name -> room id
    names: DashMap<String, RoomId>,
    /// Player -> the room they are in
    memberships: DashMap<PlayerId, RoomId>,
    publisher: Arc<dyn Publisher>,
    game_config: Arc<GameConfig>,
    max_players: usize,
}

impl RoomRegistry {
    pub fn new(
        publisher: Arc<dyn Publisher>,
        game_config: Arc<GameConfig>,
        max_players: usize,
    ) -> Self {
        Self {
            rooms: DashMap::new(),
            names: DashMap::new(),
            memberships: DashMap::new(),
            publisher,
            game_config,
            max_players,
        }
    }

    pub fn get(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.get(room_id).map(|r| r.value().clone())
    }

    pub fn room_of(&self, player_id: PlayerId) -> Option<RoomId> {
        self.memberships.get(&player_id).map(|r| r.value().clone())
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|r| r.value().player_count()).sum()
    }

    /// Create a room and make the requester its first player.
    ///
    /// A player already in another room leaves it once the new name is
    /// reserved; a rejected create leaves them where they were.
    pub async fn create_room(
        self: &Arc<Self>,
        player_id: PlayerId,
        room_name: &str,
        password: Option<String>,
    ) -> Result<RoomId, RoomError> {
        let handle = self.open_room(room_name, password)?;
        self.leave_current(player_id).await;

        match handle.join(player_id, JoinVia::Create).await {
            Ok(_) => {
                self.memberships.insert(player_id, handle.id.clone());
                info!(
                    room_id = %handle.id,
                    room_name = %handle.name,
                    player_id = %player_id,
                    "Room created"
                );
                Ok(handle.id)
            }
            Err(e) => {
                if handle.close_if_empty().await {
                    self.forget_room(&handle.id);
                }
                Err(e)
            }
        }
    }

    /// Reserve the name and spawn an empty, supervised room task
    pub fn open_room(
        self: &Arc<Self>,
        room_name: &str,
        password: Option<String>,
    ) -> Result<RoomHandle, RoomError> {
        // An empty password means no password
        let password = password.filter(|p| !p.is_empty());

        let room_id = {
            match self.names.entry(room_name.to_string()) {
                Entry::Occupied(_) => return Err(RoomError::NameTaken),
                Entry::Vacant(slot) => {
                    let room_id = self.unused_room_id();
                    slot.insert(room_id.clone());
                    room_id
                }
            }
        };

        let (task, handle) = RoomTask::new(
            room_id.clone(),
            room_name.to_string(),
            password,
            self.max_players,
            self.game_config.clone(),
            self.publisher.clone(),
            rand::random(),
        );
        self.rooms.insert(room_id, handle.clone());
        self.supervise(handle.id.clone(), tokio::spawn(task.run()));

        Ok(handle)
    }

    fn unused_room_id(&self) -> RoomId {
        loop {
            let id = generate_room_id();
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }

    /// Drop the room from the registry if its task dies unexpectedly
    fn supervise(self: &Arc<Self>, room_id: RoomId, task: JoinHandle<()>) {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let result = task.await;
            if let Err(e) = &result {
                error!(room_id = %room_id, error = %e, "Room task failed");
            }
            if let Some(registry) = registry.upgrade() {
                if result.is_err() || registry.rooms.contains_key(&room_id) {
                    registry.forget_room(&room_id);
                }
            }
        });
    }

    /// Join an existing room by name. The player only leaves their current
    /// room after the new room has accepted them.
    pub async fn join_room(
        &self,
        player_id: PlayerId,
        room_name: &str,
        password: Option<&str>,
    ) -> Result<RoomId, RoomError> {
        let room_id = self
            .names
            .get(room_name)
            .map(|r| r.value().clone())
            .ok_or(RoomError::RoomNotFound)?;
        let handle = self.get(&room_id).ok_or(RoomError::RoomNotFound)?;

        if !handle.check_password(password) {
            return Err(RoomError::WrongPassword);
        }

        let previous = self.room_of(player_id);
        match handle.join(player_id, JoinVia::Join).await {
            Ok(_) => {
                if previous.is_some_and(|prev| prev != room_id) {
                    self.leave_current(player_id).await;
                }
                self.memberships.insert(player_id, room_id.clone());
                Ok(room_id)
            }
            Err(RoomError::RoomClosed) => Err(RoomError::RoomNotFound),
            Err(e) => Err(e),
        }
    }

    /// Explicit leave. The room id must be the one the player is in.
    pub async fn leave_room(&self, player_id: PlayerId, room_id: &str) -> Result<(), RoomError> {
        match self.room_of(player_id) {
            Some(current) if current == room_id => {
                self.leave_current(player_id).await;
                Ok(())
            }
            _ => Err(RoomError::NotInRoom),
        }
    }

    /// Socket closed: same as leaving whatever room the player was in
    pub async fn disconnect(&self, player_id: PlayerId) {
        if let Some(room_id) = self.leave_current(player_id).await {
            debug!(room_id = %room_id, player_id = %player_id, "Disconnected player removed");
        }
    }

    /// Remove the player from their room, deleting the room once it is empty
    async fn leave_current(&self, player_id: PlayerId) -> Option<RoomId> {
        let (_, room_id) = self.memberships.remove(&player_id)?;
        let Some(handle) = self.get(&room_id) else {
            return Some(room_id);
        };

        if handle.leave(player_id).await == Some(0) && handle.close_if_empty().await {
            self.forget_room(&room_id);
            info!(room_id = %room_id, "Room deleted (empty)");
        }
        Some(room_id)
    }

    /// Route a player input to their room. Inputs addressed to a room the
    /// player is not in are dropped.
    pub async fn send_input(&self, player_id: PlayerId, room_id: &str, input: RoomInput) {
        let Some(current) = self.room_of(player_id) else {
            debug!(player_id = %player_id, "Input from player without a room ignored");
            return;
        };
        if current != room_id {
            debug!(player_id = %player_id, room_id, "Input for another room ignored");
            return;
        }
        let Some(handle) = self.get(&current) else {
            return;
        };
        if handle.input(player_id, input).await.is_err() {
            debug!(player_id = %player_id, room_id, "Room closed before input arrived");
        }
    }

    /// Start a room by id. Membership is not required.
    pub async fn start_game(&self, player_id: PlayerId, room_id: &str) {
        let Some(handle) = self.get(room_id) else {
            debug!(player_id = %player_id, room_id, "Start for unknown room ignored");
            return;
        };
        if handle.input(player_id, RoomInput::Start).await.is_err() {
            debug!(player_id = %player_id, room_id, "Room closed before start arrived");
        }
    }

    /// Delete rooms that have been empty for longer than `grace`
    pub async fn reap_idle(&self, now: Instant, grace: Duration) -> usize {
        let stale: Vec<RoomHandle> = self
            .rooms
            .iter()
            .filter(|r| {
                r.value()
                    .empty_since()
                    .is_some_and(|since| now.saturating_duration_since(since) > grace)
            })
            .map(|r| r.value().clone())
            .collect();

        let mut reaped = 0;
        for handle in stale {
            if handle.close_if_empty().await {
                self.forget_room(&handle.id);
                info!(room_id = %handle.id, room_name = %handle.name, "Idle room reaped");
                reaped += 1;
            }
        }
        reaped
    }

    /// Periodic idle-room sweep
    pub async fn run_reaper(self: Arc<Self>, every: Duration, grace: Duration) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let reaped = self.reap_idle(Instant::now(), grace).await;
            if reaped > 0 {
                info!(reaped, active_rooms = self.active_rooms(), "Room reaper sweep");
            }
        }
    }

    /// Drop every trace of a room: id, name and memberships
    fn forget_room(&self, room_id: &str) {
        let Some((_, handle)) = self.rooms.remove(room_id) else {
            return;
        };
        self.names.remove_if(&handle.name, |_, id| id == room_id);

        let members: Vec<PlayerId> = self
            .memberships
            .iter()
            .filter(|m| m.value() == room_id)
            .map(|m| *m.key())
            .collect();
        for player_id in members {
            self.memberships.remove_if(&player_id, |_, id| id == room_id);
            self.publisher.unsubscribe(room_id, player_id);
        }
    }
}
