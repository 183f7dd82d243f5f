//! Timed spawning of fruit, walls and power-ups

use std::f32::consts::TAU;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::GameConfig;
use crate::util::ids::entity_id;

use super::entities::{Fruit, FruitKind, PowerUp, PowerUpKind, Wall, WallStyle};

/// Tracks when each entity class last spawned, in game-clock milliseconds
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    last_fruit_ms: f64,
    last_wall_ms: f64,
    last_power_up_ms: f64,
    generation: u64,
}

impl Spawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart all timers from game-clock zero
    pub fn reset(&mut self) {
        self.last_fruit_ms = 0.0;
        self.last_wall_ms = 0.0;
        self.last_power_up_ms = 0.0;
    }

    /// Weighted draw over all fruit kinds
    pub fn pick_kind<R: Rng + ?Sized>(rng: &mut R) -> FruitKind {
        let mut roll = rng.gen_range(0..FruitKind::TOTAL_WEIGHT);
        for kind in FruitKind::ALL {
            let weight = kind.spawn_weight();
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        FruitKind::Apple
    }

    /// Spawn a fruit if `1000ms / game_speed` has passed since the last one
    pub fn maybe_spawn_fruit<R: Rng + ?Sized>(
        &mut self,
        clock_ms: f64,
        tick: u64,
        game_speed: f32,
        config: &GameConfig,
        rng: &mut R,
    ) -> Option<Fruit> {
        if clock_ms - self.last_fruit_ms <= config.fruit_spawn_interval_ms(game_speed) {
            return None;
        }
        self.last_fruit_ms = clock_ms;
        Some(self.spawn_fruit(tick, game_speed, config, rng))
    }

    /// Build a fruit just past the right edge with a randomized launch vector
    pub fn spawn_fruit<R: Rng + ?Sized>(
        &mut self,
        tick: u64,
        game_speed: f32,
        config: &GameConfig,
        rng: &mut R,
    ) -> Fruit {
        let kind = Self::pick_kind(rng);

        let angle = rng.gen_range(0.0..TAU);
        let magnitude = rng.gen_range(config.launch_speed_min..=config.launch_speed_max);
        let bias = match kind {
            FruitKind::Chaos => game_speed * config.chaos_bias_multiplier,
            _ => game_speed,
        };

        let margin = config.spawn_edge_margin;
        let y_max = (config.field_height - margin).max(margin + 1.0);
        let id = entity_id("fruit", self.next_generation(), rng);

        Fruit {
            id,
            kind,
            x: config.field_width + config.spawn_margin,
            y: rng.gen_range(margin..y_max),
            velocity_x: angle.cos() * magnitude - bias,
            velocity_y: angle.sin() * magnitude,
            radius: kind.radius(),
            rotation: 0.0,
            rotation_speed: rng.gen_range(-config.max_spin..=config.max_spin),
            gravity_affected: rng.gen_bool(config.gravity_fruit_fraction.clamp(0.0, 1.0)),
            sliced: false,
            sliced_by: None,
            destroyed_by: None,
            spawn_tick: tick,
            sliced_at_tick: None,
        }
    }

    /// Spawn a wall every `wall_spawn_interval_ms`
    pub fn maybe_spawn_wall<R: Rng + ?Sized>(
        &mut self,
        clock_ms: f64,
        game_speed: f32,
        config: &GameConfig,
        rng: &mut R,
    ) -> Option<Wall> {
        if clock_ms - self.last_wall_ms <= config.wall_spawn_interval_ms {
            return None;
        }
        self.last_wall_ms = clock_ms;
        Some(self.spawn_wall(game_speed, config, rng))
    }

    /// Build a wall whose gap sits uniformly within the field minus margins
    pub fn spawn_wall<R: Rng + ?Sized>(
        &mut self,
        game_speed: f32,
        config: &GameConfig,
        rng: &mut R,
    ) -> Wall {
        let available =
            (config.field_height - config.wall_gap - 2.0 * config.wall_gap_margin).max(0.0);
        let top_height = config.wall_gap_margin + rng.gen::<f32>() * available;
        let bottom_y = top_height + config.wall_gap;
        let style = *WallStyle::ALL.choose(rng).unwrap_or(&WallStyle::Crystal);

        Wall {
            id: entity_id("wall", self.next_generation(), rng),
            style,
            x: config.field_width + config.spawn_margin,
            width: config.wall_width,
            top_height,
            bottom_y,
            bottom_height: config.field_height - bottom_y,
            velocity_x: -game_speed,
            broken_by_shield: false,
        }
    }

    /// Spawn a power-up every `power_up_spawn_interval_ms`
    pub fn maybe_spawn_power_up<R: Rng + ?Sized>(
        &mut self,
        clock_ms: f64,
        game_speed: f32,
        config: &GameConfig,
        rng: &mut R,
    ) -> Option<PowerUp> {
        if clock_ms - self.last_power_up_ms <= config.power_up_spawn_interval_ms {
            return None;
        }
        self.last_power_up_ms = clock_ms;

        let kind = *PowerUpKind::ALL.choose(rng).unwrap_or(&PowerUpKind::Shield);
        let margin = config.spawn_edge_margin;
        let y_max = (config.field_height - margin).max(margin + 1.0);

        Some(PowerUp {
            id: entity_id("powerup", self.next_generation(), rng),
            kind,
            x: config.field_width + config.spawn_margin,
            y: rng.gen_range(margin..y_max),
            width: config.power_up_size,
            height: config.power_up_size,
            velocity_x: -game_speed * config.power_up_speed_factor,
            collected: false,
        })
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}
