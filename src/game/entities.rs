//! Room-owned entities: players, fruit, walls and power-ups

use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::util::time::SIMULATION_TPS;

use super::physics::{Body, Circle, Rect, WallShape};

/// Opaque per-connection session id
pub type PlayerId = Uuid;

/// Fruit varieties. Each carries a fixed radius, base score and spawn weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FruitKind {
    Apple,
    Orange,
    Banana,
    /// Speeds the room up
    Bonus,
    /// Chain-slices its neighbours
    Destroyer,
    /// Cosmetic background shift
    Rainbow,
    /// Cosmetic control scramble for the other players
    Chaos,
}

impl FruitKind {
    pub const ALL: [FruitKind; 7] = [
        FruitKind::Apple,
        FruitKind::Orange,
        FruitKind::Banana,
        FruitKind::Bonus,
        FruitKind::Destroyer,
        FruitKind::Rainbow,
        FruitKind::Chaos,
    ];

    pub fn base_points(self) -> u32 {
        match self {
            FruitKind::Apple | FruitKind::Orange => 10,
            FruitKind::Banana => 15,
            FruitKind::Bonus => 50,
            FruitKind::Destroyer => 100,
            FruitKind::Rainbow => 75,
            FruitKind::Chaos => 25,
        }
    }

    pub fn radius(self) -> f32 {
        match self {
            FruitKind::Apple | FruitKind::Orange | FruitKind::Banana => 20.0,
            FruitKind::Bonus | FruitKind::Rainbow => 25.0,
            FruitKind::Destroyer => 30.0,
            FruitKind::Chaos => 22.0,
        }
    }

    /// Relative spawn weight out of [`Self::TOTAL_WEIGHT`]
    pub fn spawn_weight(self) -> u32 {
        match self {
            FruitKind::Apple => 35,
            FruitKind::Orange => 25,
            FruitKind::Banana => 20,
            FruitKind::Bonus => 10,
            FruitKind::Destroyer => 5,
            FruitKind::Rainbow => 3,
            FruitKind::Chaos => 2,
        }
    }

    pub const TOTAL_WEIGHT: u32 = 100;
}

/// Visual wall theme. No gameplay difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WallStyle {
    Crystal,
    Tech,
    Nature,
    Neon,
}

impl WallStyle {
    pub const ALL: [WallStyle; 4] = [
        WallStyle::Crystal,
        WallStyle::Tech,
        WallStyle::Nature,
        WallStyle::Neon,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    /// One-time wall pass
    Shield,
    DoublePoints,
    SuperSlice,
    /// Pulls nearby fruit toward the holder
    Magnet,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::Shield,
        PowerUpKind::DoublePoints,
        PowerUpKind::SuperSlice,
        PowerUpKind::Magnet,
    ];

    /// Active duration in ticks; `None` for the shield, which lasts until used
    pub fn duration_ticks(self, config: &GameConfig) -> Option<u64> {
        let duration_ms = match self {
            PowerUpKind::Shield => return None,
            PowerUpKind::DoublePoints => config.double_points_duration_ms,
            PowerUpKind::SuperSlice => config.super_slice_duration_ms,
            PowerUpKind::Magnet => config.magnet_duration_ms,
        };
        Some(u64::from(duration_ms) * u64::from(SIMULATION_TPS) / 1000)
    }
}

/// Why a player died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeathCause {
    Fruit,
    Wall,
    /// Reported position crossed the floor or ceiling
    Boundary,
}

/// Cosmetic choices, no gameplay effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customization {
    pub character: String,
    pub color: String,
    pub accessory: String,
    pub trail: String,
}

impl Default for Customization {
    fn default() -> Self {
        Self {
            character: "default".to_string(),
            color: "#FFD700".to_string(),
            accessory: "none".to_string(),
            trail: "none".to_string(),
        }
    }
}

/// Timed power-up held by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePowerUp {
    pub kind: PowerUpKind,
    pub expires_at_tick: u64,
}

/// Player state in a room.
///
/// Position and vertical velocity are client-reported; the server stores them
/// and runs collision checks against them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,

    pub x: f32,
    pub y: f32,
    pub velocity_y: f32,
    pub width: f32,
    pub height: f32,
    pub gravity: f32,
    pub jump_power: f32,

    pub is_alive: bool,
    pub is_ready: bool,
    pub has_shield: bool,
    pub score: u32,
    pub combo: u32,
    pub walls_passed: u32,
    pub power_ups: Vec<ActivePowerUp>,

    #[serde(flatten)]
    pub customization: Customization,
}

impl Player {
    pub fn new(id: PlayerId, config: &GameConfig) -> Self {
        Self {
            id,
            x: config.player_spawn_x,
            y: config.player_spawn_y,
            velocity_y: 0.0,
            width: config.player_width,
            height: config.player_height,
            gravity: config.gravity,
            jump_power: config.jump_power,
            is_alive: true,
            is_ready: false,
            has_shield: false,
            score: 0,
            combo: 0,
            walls_passed: 0,
            power_ups: Vec::new(),
            customization: Customization::default(),
        }
    }

    /// Back to spawn for a new game; cosmetics and readiness survive
    pub fn reset_for_game(&mut self, config: &GameConfig) {
        self.x = config.player_spawn_x;
        self.y = config.player_spawn_y;
        self.velocity_y = 0.0;
        self.width = config.player_width;
        self.height = config.player_height;
        self.gravity = config.gravity;
        self.jump_power = config.jump_power;
        self.is_alive = true;
        self.has_shield = false;
        self.score = 0;
        self.combo = 0;
        self.walls_passed = 0;
        self.power_ups.clear();
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn kill(&mut self) {
        self.is_alive = false;
        self.combo = 0;
    }

    pub fn has_power_up(&self, kind: PowerUpKind) -> bool {
        self.power_ups.iter().any(|p| p.kind == kind)
    }

    /// Multiplier applied to slice points from active power-ups
    pub fn score_multiplier(&self) -> f32 {
        let mut multiplier = 1.0;
        if self.has_power_up(PowerUpKind::DoublePoints) {
            multiplier *= 2.0;
        }
        if self.has_power_up(PowerUpKind::SuperSlice) {
            multiplier *= 1.5;
        }
        multiplier
    }
}

/// A fruit in flight (or decaying after a slice)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fruit {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FruitKind,

    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub radius: f32,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub gravity_affected: bool,

    pub sliced: bool,
    pub sliced_by: Option<PlayerId>,
    /// Set when another fruit's effect sliced this one
    pub destroyed_by: Option<FruitKind>,

    #[serde(skip)]
    pub spawn_tick: u64,
    #[serde(skip)]
    pub sliced_at_tick: Option<u64>,
}

impl Fruit {
    pub fn circle(&self) -> Circle {
        Circle::new(self.x, self.y, self.radius)
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.velocity_x, self.velocity_y)
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity_x = velocity.x;
        self.velocity_y = velocity.y;
    }

    pub fn body(&self) -> Body {
        Body {
            position: Vec2::new(self.x, self.y),
            velocity: self.velocity(),
            radius: self.radius,
        }
    }

    pub fn apply_body(&mut self, body: &Body) {
        self.x = body.position.x;
        self.y = body.position.y;
        self.set_velocity(body.velocity);
    }

    /// Terminal transition; returns false if the fruit was already sliced
    pub fn mark_sliced(&mut self, by: PlayerId, tick: u64) -> bool {
        if self.sliced {
            return false;
        }
        self.sliced = true;
        self.sliced_by = Some(by);
        self.sliced_at_tick = Some(tick);
        true
    }

    pub fn age_ticks(&self, now_tick: u64) -> u64 {
        now_tick.saturating_sub(self.spawn_tick)
    }
}

/// Obstacle pair with a passable gap
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wall {
    pub id: String,
    #[serde(rename = "type")]
    pub style: WallStyle,
    pub x: f32,
    pub width: f32,
    pub top_height: f32,
    pub bottom_y: f32,
    pub bottom_height: f32,
    pub velocity_x: f32,
    /// Permanently disables collision once set
    pub broken_by_shield: bool,
}

impl Wall {
    pub fn shape(&self) -> WallShape {
        WallShape {
            x: self.x,
            width: self.width,
            top_height: self.top_height,
            bottom_y: self.bottom_y,
            broken: self.broken_by_shield,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Collectible drifting across the field
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerUp {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PowerUpKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub velocity_x: f32,
    pub collected: bool,
}

impl PowerUp {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_weights_sum_to_denominator() {
        let total: u32 = FruitKind::ALL.iter().map(|k| k.spawn_weight()).sum();
        assert_eq!(total, FruitKind::TOTAL_WEIGHT);
    }

    #[test]
    fn fruit_kind_table() {
        assert_eq!(FruitKind::Apple.base_points(), 10);
        assert_eq!(FruitKind::Orange.base_points(), 10);
        assert_eq!(FruitKind::Banana.base_points(), 15);
        assert_eq!(FruitKind::Bonus.base_points(), 50);
        assert_eq!(FruitKind::Destroyer.base_points(), 100);
        assert_eq!(FruitKind::Rainbow.base_points(), 75);
        assert_eq!(FruitKind::Chaos.base_points(), 25);
    }

    #[test]
    fn power_up_durations_follow_config() {
        let mut config = GameConfig::default();
        assert_eq!(PowerUpKind::Shield.duration_ticks(&config), None);
        assert_eq!(PowerUpKind::DoublePoints.duration_ticks(&config), Some(480));
        assert_eq!(PowerUpKind::Magnet.duration_ticks(&config), Some(420));

        config.magnet_duration_ms = 1000;
        assert_eq!(PowerUpKind::Magnet.duration_ticks(&config), Some(60));
    }

    #[test]
    fn mark_sliced_is_first_wins() {
        let mut fruit = Fruit {
            id: "fruit_1_000001".to_string(),
            kind: FruitKind::Apple,
            x: 0.0,
            y: 0.0,
            velocity_x: 0.0,
            velocity_y: 0.0,
            radius: 20.0,
            rotation: 0.0,
            rotation_speed: 0.0,
            gravity_affected: false,
            sliced: false,
            sliced_by: None,
            destroyed_by: None,
            spawn_tick: 0,
            sliced_at_tick: None,
        };
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        assert!(fruit.mark_sliced(first, 10));
        assert!(!fruit.mark_sliced(second, 11));
        assert_eq!(fruit.sliced_by, Some(first));
        assert_eq!(fruit.sliced_at_tick, Some(10));
    }

    #[test]
    fn reset_restores_physics_but_keeps_cosmetics() {
        let config = GameConfig::default();
        let mut player = Player::new(Uuid::new_v4(), &config);
        player.customization.color = "#00FF00".to_string();
        player.y = 10.0;
        player.score = 120;
        player.kill();
        player.is_ready = true;

        player.reset_for_game(&config);
        assert!(player.is_alive);
        assert_eq!(player.y, config.player_spawn_y);
        assert_eq!(player.score, 0);
        assert!(player.is_ready);
        assert_eq!(player.customization.color, "#00FF00");
    }

    #[test]
    fn multiplier_stacks_power_ups() {
        let mut player = Player::new(Uuid::new_v4(), &GameConfig::default());
        assert_eq!(player.score_multiplier(), 1.0);
        player.power_ups.push(ActivePowerUp {
            kind: PowerUpKind::DoublePoints,
            expires_at_tick: 100,
        });
        player.power_ups.push(ActivePowerUp {
            kind: PowerUpKind::SuperSlice,
            expires_at_tick: 100,
        });
        assert_eq!(player.score_multiplier(), 3.0);
    }

    #[test]
    fn wire_shape_uses_client_field_names() {
        let player = Player::new(Uuid::new_v4(), &GameConfig::default());
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["velocityY"], 0.0);
        assert_eq!(json["isAlive"], true);
        assert_eq!(json["color"], "#FFD700");
        assert_eq!(serde_json::to_value(DeathCause::Wall).unwrap(), "wall");
        assert_eq!(serde_json::to_value(FruitKind::Destroyer).unwrap(), "destroyer");
    }
}
