//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": {...}}` with
//! camelCase names on both sides.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GameConfig;
use crate::game::entities::{
    Customization, DeathCause, Fruit, FruitKind, Player, PlayerId, PowerUp, PowerUpKind, Wall,
};
use crate::game::physics::WallSide;
use crate::game::room::GameStatus;

/// Short room identifier, also used as the broadcast channel name
pub type RoomId = String;

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMsg {
    /// Create a new room and join it as the first player
    CreateRoom {
        room_name: String,
        #[serde(default)]
        password: Option<String>,
    },

    /// Join an existing room by name
    JoinRoom {
        room_name: String,
        #[serde(default)]
        password: Option<String>,
    },

    LeaveRoom {
        room_id: RoomId,
    },

    StartGame {
        room_id: RoomId,
    },

    PlayerReady {
        room_id: RoomId,
        is_ready: bool,
    },

    PlayerJump {
        room_id: RoomId,
    },

    /// Client-simulated flight state
    PlayerUpdate {
        room_id: RoomId,
        player: ReportedKinematics,
    },

    SliceFruit {
        room_id: RoomId,
        fruit_id: String,
        /// Opaque swipe data echoed back in `fruitSliced`
        #[serde(default)]
        slice_data: Option<Value>,
    },

    UpdateCustomization {
        room_id: RoomId,
        customization: Customization,
    },
}

/// Player kinematics as reported by the owning client
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedKinematics {
    #[serde(default)]
    pub x: Option<f32>,
    pub y: f32,
    pub velocity_y: f32,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
}

impl ReportedKinematics {
    pub fn is_finite(&self) -> bool {
        self.y.is_finite()
            && self.velocity_y.is_finite()
            && self.x.map_or(true, f32::is_finite)
            && self.width.map_or(true, |w| w.is_finite() && w > 0.0)
            && self.height.map_or(true, |h| h.is_finite() && h > 0.0)
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMsg {
    RoomCreated {
        room_id: RoomId,
        room_name: String,
        player_count: usize,
        /// Share path for inviting others
        game_url: String,
    },

    RoomJoined {
        room_id: RoomId,
        room_name: String,
        player_count: usize,
    },

    PlayerJoined {
        player_id: PlayerId,
        player_count: usize,
    },

    PlayerLeft {
        player_id: PlayerId,
        player_count: usize,
    },

    /// Full room state, sent to a newcomer
    GameState(GameStateSnapshot),

    /// Full room state at the start of a game
    GameStarted(GameStateSnapshot),

    /// Per-tick entity state while playing
    GameUpdate {
        tick: u64,
        timestamp: u64,
        game_speed: f32,
        players: Vec<Player>,
        fruits: Vec<Fruit>,
        walls: Vec<Wall>,
        power_ups: Vec<PowerUp>,
    },

    PlayerMoved {
        player_id: PlayerId,
        player: ReportedKinematics,
    },

    PlayerJumped {
        player_id: PlayerId,
        velocity_y: f32,
    },

    FruitSliced {
        player_id: PlayerId,
        fruit_id: String,
        points: u32,
        new_score: u32,
        new_combo: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        slice_data: Option<Value>,
    },

    /// Fruit bounced off a wall
    FruitBounce {
        fruit_id: String,
        wall_id: String,
        side: WallSide,
        x: f32,
        y: f32,
    },

    FruitPlayerBounce {
        fruit_id: String,
        player_id: PlayerId,
        x: f32,
        y: f32,
    },

    /// Two fruits collided
    BallCollision {
        fruit_id: String,
        other_fruit_id: String,
        x: f32,
        y: f32,
    },

    ShieldBreak {
        player_id: PlayerId,
        wall_id: String,
        side: WallSide,
        x: f32,
        y: f32,
    },

    SpecialFruitEffect {
        fruit_id: String,
        #[serde(rename = "type")]
        kind: FruitKind,
        player_id: PlayerId,
        effects: Vec<SpecialEffect>,
    },

    /// Unsliced fruit left the field
    FruitMissed {
        fruit_id: String,
    },

    PowerUpCollected {
        player_id: PlayerId,
        power_up_id: String,
        #[serde(rename = "type")]
        kind: PowerUpKind,
    },

    PlayerDied {
        player_id: PlayerId,
        cause: DeathCause,
        x: f32,
        y: f32,
    },

    PlayerReadyUpdate {
        player_id: PlayerId,
        is_ready: bool,
        all_ready: bool,
    },

    PlayerCustomized {
        player_id: PlayerId,
        customization: Customization,
    },

    /// Rejected request, sent to the requester only
    RoomError {
        message: String,
    },
}

impl ServerMsg {
    /// Wire event name, for logging
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMsg::RoomCreated { .. } => "roomCreated",
            ServerMsg::RoomJoined { .. } => "roomJoined",
            ServerMsg::PlayerJoined { .. } => "playerJoined",
            ServerMsg::PlayerLeft { .. } => "playerLeft",
            ServerMsg::GameState(_) => "gameState",
            ServerMsg::GameStarted(_) => "gameStarted",
            ServerMsg::GameUpdate { .. } => "gameUpdate",
            ServerMsg::PlayerMoved { .. } => "playerMoved",
            ServerMsg::PlayerJumped { .. } => "playerJumped",
            ServerMsg::FruitSliced { .. } => "fruitSliced",
            ServerMsg::FruitBounce { .. } => "fruitBounce",
            ServerMsg::FruitPlayerBounce { .. } => "fruitPlayerBounce",
            ServerMsg::BallCollision { .. } => "ballCollision",
            ServerMsg::ShieldBreak { .. } => "shieldBreak",
            ServerMsg::SpecialFruitEffect { .. } => "specialFruitEffect",
            ServerMsg::FruitMissed { .. } => "fruitMissed",
            ServerMsg::PowerUpCollected { .. } => "powerUpCollected",
            ServerMsg::PlayerDied { .. } => "playerDied",
            ServerMsg::PlayerReadyUpdate { .. } => "playerReadyUpdate",
            ServerMsg::PlayerCustomized { .. } => "playerCustomized",
            ServerMsg::RoomError { .. } => "roomError",
        }
    }
}

/// Side effect of slicing a special fruit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SpecialEffect {
    /// Room scroll speed went up
    SpeedBoost { game_speed: f32 },
    /// Neighbouring fruit sliced by a destroyer
    ChainSlice { fruit_ids: Vec<String>, bonus: u32 },
    /// Cosmetic background colour change
    BackgroundShift { duration_ms: u32 },
    /// Cosmetic control scramble on the listed players' clients
    ScrambleControls {
        duration_ms: u32,
        targets: Vec<PlayerId>,
    },
}

/// Full room state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSnapshot {
    pub room_id: RoomId,
    pub room_name: String,
    pub game_state: GameStatus,
    pub game_speed: f32,
    pub tick: u64,
    pub players: Vec<Player>,
    pub fruits: Vec<Fruit>,
    pub walls: Vec<Wall>,
    pub power_ups: Vec<PowerUp>,
    pub config: GameConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_client_events() {
        let raw = json!({
            "event": "sliceFruit",
            "data": { "roomId": "abc123xyz", "fruitId": "fruit_3_00a1b2", "sliceData": { "angle": 1.2 } }
        });
        match serde_json::from_value::<ClientMsg>(raw).unwrap() {
            ClientMsg::SliceFruit {
                room_id,
                fruit_id,
                slice_data,
            } => {
                assert_eq!(room_id, "abc123xyz");
                assert_eq!(fruit_id, "fruit_3_00a1b2");
                assert_eq!(slice_data, Some(json!({ "angle": 1.2 })));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn password_is_optional() {
        let raw = json!({ "event": "createRoom", "data": { "roomName": "lobby" } });
        let msg: ClientMsg = serde_json::from_value(raw).unwrap();
        assert!(matches!(msg, ClientMsg::CreateRoom { password: None, .. }));
    }

    #[test]
    fn player_update_accepts_partial_kinematics() {
        let raw = json!({
            "event": "playerUpdate",
            "data": { "roomId": "r", "player": { "y": 120.5, "velocityY": -3.0 } }
        });
        match serde_json::from_value::<ClientMsg>(raw).unwrap() {
            ClientMsg::PlayerUpdate { player, .. } => {
                assert_eq!(player.y, 120.5);
                assert_eq!(player.height, None);
                assert!(player.is_finite());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        let raw = json!({ "event": "teleport", "data": {} });
        assert!(serde_json::from_value::<ClientMsg>(raw).is_err());
    }

    #[test]
    fn server_events_use_camel_case() {
        let msg = ServerMsg::PlayerReadyUpdate {
            player_id: uuid::Uuid::nil(),
            is_ready: true,
            all_ready: false,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "playerReadyUpdate");
        assert_eq!(value["data"]["isReady"], true);
        assert_eq!(value["data"]["allReady"], false);
        assert_eq!(msg.event_name(), "playerReadyUpdate");
    }

    #[test]
    fn special_effects_are_tagged() {
        let effect = SpecialEffect::ChainSlice {
            fruit_ids: vec!["a".into()],
            bonus: 10,
        };
        let value = serde_json::to_value(effect).unwrap();
        assert_eq!(value["kind"], "chainSlice");
        assert_eq!(value["fruitIds"][0], "a");
    }
}
