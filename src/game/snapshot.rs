//! Snapshot cadence and message building

use crate::util::time::unix_millis;
use crate::ws::protocol::ServerMsg;

use super::entities::{Fruit, Player, PowerUp, Wall};

/// Decides when a room broadcasts `gameUpdate` and builds it
#[derive(Debug)]
pub struct SnapshotBuilder {
    /// Ticks since the last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Advance one tick; true when a snapshot is due
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Restart the cadence, e.g. at game start
    pub fn reset(&mut self) {
        self.ticks_since_snapshot = 0;
    }

    pub fn build_update(
        &self,
        tick: u64,
        game_speed: f32,
        players: &[Player],
        fruits: &[Fruit],
        walls: &[Wall],
        power_ups: &[PowerUp],
    ) -> ServerMsg {
        ServerMsg::GameUpdate {
            tick,
            timestamp: unix_millis(),
            game_speed,
            players: players.to_vec(),
            fruits: fruits.to_vec(),
            walls: walls.to_vec(),
            power_ups: power_ups.iter().filter(|p| !p.collected).cloned().collect(),
        }
    }
}
