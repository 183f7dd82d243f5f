//! Session hub: live sockets and room channels

use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use crate::game::{PlayerId, Publisher};
use crate::ws::protocol::{RoomId, ServerMsg};

/// Frames a connection may have queued before it counts as slow
pub const OUTBOUND_BUFFER: usize = 256;

/// Routes encoded frames to connected sockets.
///
/// Each connection registers an outbound queue under its player id; rooms
/// subscribe players to a named channel. Full queues drop the frame rather
/// than stall the room that published it.
#[derive(Default)]
pub struct SessionHub {
    sessions: DashMap<PlayerId, mpsc::Sender<String>>,
    channels: DashMap<RoomId, HashSet<PlayerId>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and get the receiving end of its queue
    pub fn register(&self, player_id: PlayerId) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        self.sessions.insert(player_id, tx);
        rx
    }

    /// Drop the connection and every channel membership it still has
    pub fn unregister(&self, player_id: PlayerId) {
        self.sessions.remove(&player_id);
        self.channels.retain(|_, members| {
            members.remove(&player_id);
            !members.is_empty()
        });
    }

    #[cfg(test)]
    pub fn connections(&self) -> usize {
        self.sessions.len()
    }

    fn encode(msg: &ServerMsg) -> Option<String> {
        match serde_json::to_string(msg) {
            Ok(frame) => Some(frame),
            Err(e) => {
                error!(event = msg.event_name(), error = %e, "Failed to encode server message");
                None
            }
        }
    }

    fn deliver(&self, player_id: PlayerId, frame: String) {
        let Some(tx) = self.sessions.get(&player_id) else {
            return;
        };
        match tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(player_id = %player_id, "Outbound queue full, dropping frame");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(player_id = %player_id, "Connection gone, dropping frame");
            }
        }
    }
}

impl Publisher for SessionHub {
    fn publish(&self, room_id: &str, msg: &ServerMsg, exclude: Option<PlayerId>) {
        // Copy recipients out so no shard lock is held while sending
        let recipients: Vec<PlayerId> = match self.channels.get(room_id) {
            Some(members) => members
                .iter()
                .copied()
                .filter(|id| Some(*id) != exclude)
                .collect(),
            None => return,
        };
        if recipients.is_empty() {
            return;
        }
        let Some(frame) = Self::encode(msg) else {
            return;
        };
        for player_id in recipients {
            self.deliver(player_id, frame.clone());
        }
    }

    fn send_to(&self, player_id: PlayerId, msg: &ServerMsg) {
        if let Some(frame) = Self::encode(msg) {
            self.deliver(player_id, frame);
        }
    }

    fn subscribe(&self, room_id: &str, player_id: PlayerId) {
        self.channels
            .entry(room_id.to_string())
            .or_default()
            .insert(player_id);
    }

    fn unsubscribe(&self, room_id: &str, player_id: PlayerId) {
        self.channels.remove_if_mut(room_id, |_, members| {
            members.remove(&player_id);
            members.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use uuid::Uuid;

    fn error_msg(text: &str) -> ServerMsg {
        ServerMsg::RoomError {
            message: text.to_string(),
        }
    }

    #[test]
    fn publish_reaches_room_members_except_excluded() {
        let hub = SessionHub::new();
        let (a, b, outsider) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut rx_a = hub.register(a);
        let mut rx_b = hub.register(b);
        let mut rx_out = hub.register(outsider);
        hub.subscribe("room1", a);
        hub.subscribe("room1", b);

        hub.publish("room1", &error_msg("hi"), Some(a));

        assert!(rx_a.try_recv().is_err());
        assert!(rx_out.try_recv().is_err());
        let frame: Value = serde_json::from_str(&rx_b.try_recv().unwrap()).unwrap();
        assert_eq!(frame["event"], "roomError");
        assert_eq!(frame["data"]["message"], "hi");
    }

    #[test]
    fn send_to_targets_one_socket() {
        let hub = SessionHub::new();
        let a = Uuid::new_v4();
        let mut rx = hub.register(a);
        hub.send_to(a, &error_msg("Room not found"));
        hub.send_to(Uuid::new_v4(), &error_msg("nobody"));
        assert!(rx.try_recv().unwrap().contains("Room not found"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn slow_client_is_skipped_not_blocking() {
        let hub = SessionHub::new();
        let (slow, fast) = (Uuid::new_v4(), Uuid::new_v4());
        let _rx_slow = hub.register(slow);
        let mut rx_fast = hub.register(fast);
        hub.subscribe("room1", slow);
        hub.subscribe("room1", fast);

        for _ in 0..OUTBOUND_BUFFER + 10 {
            hub.publish("room1", &error_msg("tick"), None);
            let _ = rx_fast.try_recv();
        }
        assert!(rx_fast.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_and_unregister_clean_up_channels() {
        let hub = SessionHub::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let _rx_a = hub.register(a);
        let mut rx_b = hub.register(b);
        hub.subscribe("room1", a);
        hub.subscribe("room1", b);

        hub.unsubscribe("room1", b);
        hub.publish("room1", &error_msg("x"), None);
        assert!(rx_b.try_recv().is_err());

        hub.unregister(a);
        assert!(hub.channels.get("room1").is_none());
        assert_eq!(hub.connections(), 1);
    }
}
