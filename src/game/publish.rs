//! Outbound event sink for room simulations

use crate::ws::protocol::ServerMsg;

use super::entities::PlayerId;

/// Where rooms send their events. The simulation never touches sockets;
/// the transport layer implements this.
pub trait Publisher: Send + Sync {
    /// Send to every subscriber of `room_id`, optionally skipping one player
    fn publish(&self, room_id: &str, msg: &ServerMsg, exclude: Option<PlayerId>);

    /// Send to a single player
    fn send_to(&self, player_id: PlayerId, msg: &ServerMsg);

    fn subscribe(&self, room_id: &str, player_id: PlayerId);

    fn unsubscribe(&self, room_id: &str, player_id: PlayerId);
}

#[cfg(test)]
pub use recording::{Recorded, RecordingPublisher, Target};
