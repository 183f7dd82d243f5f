//! Shared simulation tuning.
//!
//! One object holds every physics and spawning constant so that the server
//! room simulation and the client-side single-player mirror stay in step. It
//! is sent to clients inside `gameState` / `gameStarted`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    // Playfield
    pub field_width: f32,
    pub field_height: f32,
    /// Horizontal distance past the right edge where walls, fruits and power-ups appear
    pub spawn_margin: f32,

    // Player
    pub player_spawn_x: f32,
    pub player_spawn_y: f32,
    pub player_width: f32,
    pub player_height: f32,
    pub gravity: f32,
    pub jump_power: f32,

    // Walls
    pub wall_gap: f32,
    pub wall_width: f32,
    pub wall_spawn_interval_ms: f64,
    /// Minimum distance between the gap and the floor/ceiling
    pub wall_gap_margin: f32,
    /// Vertical margin between spawned fruit/power-ups and the floor/ceiling
    pub spawn_edge_margin: f32,

    // Speed
    pub base_game_speed: f32,
    pub max_game_speed: f32,
    pub bonus_speed_increment: f32,

    // Fruit motion
    pub fruit_gravity: f32,
    pub gravity_fruit_fraction: f64,
    pub fruit_perturbation: f32,
    pub launch_speed_min: f32,
    pub launch_speed_max: f32,
    pub chaos_bias_multiplier: f32,
    pub max_spin: f32,

    // Collision response
    pub wall_restitution: f32,
    pub fruit_restitution: f32,
    pub boundary_restitution: f32,
    pub collision_damping: f32,
    pub bounce_jitter: f32,
    pub min_fruit_speed: f32,
    pub separation_buffer: f32,
    /// Extra push on top of half the penetration when two fruits overlap
    pub circle_separation_slop: f32,
    pub player_bounce_padding: f32,
    pub player_bounce_strength: f32,
    /// Share of a fruit's velocity kept when a player deflects it
    pub player_bounce_retain: f32,
    pub player_nudge: f32,
    pub shield_push: f32,

    // Fruit lifetime
    pub sliced_decay_ticks: u32,
    pub min_fruit_lifetime_ticks: u32,

    // Special fruit
    pub destroyer_radius: f32,
    pub chain_bonus: u32,
    pub rainbow_duration_ms: u32,
    pub chaos_duration_ms: u32,

    // Power-ups
    pub power_up_spawn_interval_ms: f64,
    pub power_up_size: f32,
    pub power_up_speed_factor: f32,
    pub magnet_radius: f32,
    pub magnet_strength: f32,
    pub double_points_duration_ms: u32,
    pub super_slice_duration_ms: u32,
    pub magnet_duration_ms: u32,

    /// Ticks between `gameUpdate` broadcasts
    pub snapshot_every_ticks: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            field_width: 800.0,
            field_height: 600.0,
            spawn_margin: 50.0,

            player_spawn_x: 150.0,
            player_spawn_y: 300.0,
            player_width: 40.0,
            player_height: 30.0,
            gravity: 0.3,
            jump_power: -10.0,

            wall_gap: 220.0,
            wall_width: 40.0,
            wall_spawn_interval_ms: 4000.0,
            wall_gap_margin: 60.0,
            spawn_edge_margin: 50.0,

            base_game_speed: 2.0,
            max_game_speed: 5.0,
            bonus_speed_increment: 0.2,

            fruit_gravity: 0.2,
            gravity_fruit_fraction: 0.3,
            fruit_perturbation: 0.05,
            launch_speed_min: 2.0,
            launch_speed_max: 5.0,
            chaos_bias_multiplier: 1.5,
            max_spin: 0.2,

            wall_restitution: 0.8,
            fruit_restitution: 0.9,
            boundary_restitution: 0.8,
            collision_damping: 0.98,
            bounce_jitter: 0.5,
            min_fruit_speed: 1.5,
            separation_buffer: 1.0,
            circle_separation_slop: 0.01,
            player_bounce_padding: 10.0,
            player_bounce_strength: 4.0,
            player_bounce_retain: 0.3,
            player_nudge: 0.5,
            shield_push: 5.0,

            sliced_decay_ticks: 60,
            min_fruit_lifetime_ticks: 30,

            destroyer_radius: 150.0,
            chain_bonus: 10,
            rainbow_duration_ms: 3000,
            chaos_duration_ms: 4000,

            power_up_spawn_interval_ms: 8000.0,
            power_up_size: 30.0,
            power_up_speed_factor: 0.8,
            magnet_radius: 100.0,
            magnet_strength: 0.3,
            double_points_duration_ms: 8000,
            super_slice_duration_ms: 6000,
            magnet_duration_ms: 7000,

            snapshot_every_ticks: 1,
        }
    }
}

impl GameConfig {
    /// Milliseconds between fruit spawns at the given game speed
    pub fn fruit_spawn_interval_ms(&self, game_speed: f32) -> f64 {
        1000.0 / f64::from(game_speed.max(0.01))
    }
}
