//! Authoritative simulation of a single room.
//!
//! A [`RoomSim`] owns the room's players and entities. It is driven by one
//! room task: client commands call the input methods between ticks and the
//! room ticker calls [`RoomSim::tick`] at 60 Hz while a game is running.
//! Everything observers need to know leaves through the [`Publisher`].

use std::sync::Arc;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::util::time::TICK_MS;
use crate::ws::protocol::{
    GameStateSnapshot, ReportedKinematics, RoomId, ServerMsg, SpecialEffect,
};

use super::entities::{
    ActivePowerUp, Customization, DeathCause, Fruit, FruitKind, Player, PlayerId, PowerUp,
    PowerUpKind, Wall,
};
use super::error::RoomError;
use super::physics::{BounceTuning, PhysicsSystem};
use super::publish::Publisher;
use super::snapshot::SnapshotBuilder;
use super::spawner::Spawner;

/// Room phase. A room never goes back to waiting once a game has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Playing,
}

/// How a player entered the room; decides the confirmation event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinVia {
    Create,
    Join,
}

/// Result of a successful slice
#[derive(Debug, Clone, PartialEq)]
pub struct SliceOutcome {
    pub points: u32,
    pub new_score: u32,
    pub new_combo: u32,
    pub effects: Vec<SpecialEffect>,
}

pub struct RoomSim {
    id: RoomId,
    name: String,
    max_players: usize,
    config: Arc<GameConfig>,
    publisher: Arc<dyn Publisher>,

    status: GameStatus,
    tick: u64,
    /// Game clock in milliseconds, advanced by one tick period per tick
    clock_ms: f64,
    game_speed: f32,

    /// Join order
    players: Vec<Player>,
    fruits: Vec<Fruit>,
    walls: Vec<Wall>,
    power_ups: Vec<PowerUp>,

    spawner: Spawner,
    snapshots: SnapshotBuilder,
    rng: ChaCha8Rng,
}

impl RoomSim {
    pub fn new(
        id: RoomId,
        name: String,
        max_players: usize,
        config: Arc<GameConfig>,
        publisher: Arc<dyn Publisher>,
        seed: u64,
    ) -> Self {
        Self {
            id,
            name,
            max_players,
            game_speed: config.base_game_speed,
            snapshots: SnapshotBuilder::new(config.snapshot_every_ticks),
            config,
            publisher,
            status: GameStatus::Waiting,
            tick: 0,
            clock_ms: 0.0,
            players: Vec::new(),
            fruits: Vec::new(),
            walls: Vec::new(),
            power_ups: Vec::new(),
            spawner: Spawner::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    #[cfg(test)]
    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    fn player_mut(&mut self, player_id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    fn broadcast(&self, msg: &ServerMsg) {
        self.publisher.publish(&self.id, msg, None);
    }

    fn broadcast_except(&self, msg: &ServerMsg, sender: PlayerId) {
        self.publisher.publish(&self.id, msg, Some(sender));
    }

    /// Full state for newcomers and game start
    pub fn snapshot(&self) -> GameStateSnapshot {
        GameStateSnapshot {
            room_id: self.id.clone(),
            room_name: self.name.clone(),
            game_state: self.status,
            game_speed: self.game_speed,
            tick: self.tick,
            players: self.players.clone(),
            fruits: self.fruits.clone(),
            walls: self.walls.clone(),
            power_ups: self.power_ups.clone(),
            config: (*self.config).clone(),
        }
    }

    // ---------------------------------------------------------------------
    // Membership
    // ---------------------------------------------------------------------

    /// Add a player and send the join confirmation and current state.
    ///
    /// Players joining mid-game start alive at the spawn point.
    pub fn join(&mut self, player_id: PlayerId, via: JoinVia) -> Result<usize, RoomError> {
        if self.contains(player_id) {
            debug!(room_id = %self.id, player_id = %player_id, "Player already in room");
            return Ok(self.players.len());
        }

        if self.players.len() >= self.max_players {
            return Err(RoomError::RoomFull);
        }

        self.players.push(Player::new(player_id, &self.config));
        self.publisher.subscribe(&self.id, player_id);
        let player_count = self.players.len();

        match via {
            JoinVia::Create => {
                self.publisher.send_to(
                    player_id,
                    &ServerMsg::RoomCreated {
                        room_id: self.id.clone(),
                        room_name: self.name.clone(),
                        player_count,
                        game_url: format!("/room/{}", self.id),
                    },
                );
            }
            JoinVia::Join => {
                self.publisher.send_to(
                    player_id,
                    &ServerMsg::RoomJoined {
                        room_id: self.id.clone(),
                        room_name: self.name.clone(),
                        player_count,
                    },
                );
                self.broadcast_except(
                    &ServerMsg::PlayerJoined {
                        player_id,
                        player_count,
                    },
                    player_id,
                );
            }
        }

        self.publisher
            .send_to(player_id, &ServerMsg::GameState(self.snapshot()));

        info!(
            room_id = %self.id,
            player_id = %player_id,
            player_count,
            "Player joined room"
        );

        Ok(player_count)
    }

    /// Remove a player and tell the rest of the room. Returns the remaining
    /// player count, or `None` if the player was not here.
    pub fn leave(&mut self, player_id: PlayerId) -> Option<usize> {
        let idx = self.players.iter().position(|p| p.id == player_id)?;
        self.players.remove(idx);
        self.publisher.unsubscribe(&self.id, player_id);

        let player_count = self.players.len();
        self.broadcast(&ServerMsg::PlayerLeft {
            player_id,
            player_count,
        });

        info!(
            room_id = %self.id,
            player_id = %player_id,
            player_count,
            "Player left room"
        );

        Some(player_count)
    }

    // ---------------------------------------------------------------------
    // Player input
    // ---------------------------------------------------------------------

    pub fn set_ready(&mut self, player_id: PlayerId, is_ready: bool) {
        let Some(player) = self.player_mut(player_id) else {
            return;
        };
        player.is_ready = is_ready;

        let all_ready = self.all_ready();
        self.broadcast(&ServerMsg::PlayerReadyUpdate {
            player_id,
            is_ready,
            all_ready,
        });
    }

    /// Every player present is ready
    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.is_ready)
    }

    /// Move waiting -> playing. Anyone who knows the room id may start it.
    /// Returns false when already playing or nobody is in the room.
    pub fn start_game(&mut self, player_id: PlayerId) -> bool {
        if self.players.is_empty() {
            return false;
        }
        if self.status == GameStatus::Playing {
            debug!(room_id = %self.id, "Game already running");
            return false;
        }

        self.status = GameStatus::Playing;
        self.tick = 0;
        self.clock_ms = 0.0;
        self.game_speed = self.config.base_game_speed;
        self.fruits.clear();
        self.walls.clear();
        self.power_ups.clear();
        self.spawner.reset();
        self.snapshots.reset();

        let config = Arc::clone(&self.config);
        for player in &mut self.players {
            player.reset_for_game(&config);
        }

        self.broadcast(&ServerMsg::GameStarted(self.snapshot()));
        info!(
            room_id = %self.id,
            started_by = %player_id,
            player_count = self.players.len(),
            "Game started"
        );
        true
    }

    pub fn jump(&mut self, player_id: PlayerId) {
        let Some(player) = self.player_mut(player_id) else {
            return;
        };
        if !player.is_alive {
            return;
        }
        player.velocity_y = player.jump_power;
        let velocity_y = player.velocity_y;

        self.broadcast_except(
            &ServerMsg::PlayerJumped {
                player_id,
                velocity_y,
            },
            player_id,
        );
    }

    /// Store client-reported kinematics and relay them to peers.
    ///
    /// While playing, a reported position outside the floor/ceiling kills.
    pub fn update_player(&mut self, player_id: PlayerId, reported: ReportedKinematics) {
        if !reported.is_finite() {
            warn!(room_id = %self.id, player_id = %player_id, "Non-finite player update ignored");
            return;
        }

        let playing = self.status == GameStatus::Playing;
        let field_height = self.config.field_height;
        let Some(player) = self.player_mut(player_id) else {
            return;
        };

        if let Some(x) = reported.x {
            player.x = x;
        }
        player.y = reported.y;
        player.velocity_y = reported.velocity_y;
        if let Some(width) = reported.width {
            player.width = width;
        }
        if let Some(height) = reported.height {
            player.height = height;
        }

        let out_of_bounds = player.y < 0.0 || player.y + player.height > field_height;
        let died = playing && player.is_alive && out_of_bounds;
        if died {
            player.kill();
        }
        let (x, y) = (player.x, player.y);

        self.broadcast_except(
            &ServerMsg::PlayerMoved {
                player_id,
                player: reported,
            },
            player_id,
        );

        if died {
            debug!(room_id = %self.id, player_id = %player_id, "Player left the playfield");
            self.broadcast(&ServerMsg::PlayerDied {
                player_id,
                cause: DeathCause::Boundary,
                x,
                y,
            });
        }
    }

    pub fn customize(&mut self, player_id: PlayerId, customization: Customization) {
        let Some(player) = self.player_mut(player_id) else {
            return;
        };
        player.customization = customization.clone();

        self.broadcast_except(
            &ServerMsg::PlayerCustomized {
                player_id,
                customization,
            },
            player_id,
        );
    }

    // ---------------------------------------------------------------------
    // Slicing
    // ---------------------------------------------------------------------

    /// Resolve a slice request immediately.
    ///
    /// Unknown or already-sliced fruit and dead slicers are silent no-ops.
    pub fn slice_fruit(
        &mut self,
        player_id: PlayerId,
        fruit_id: &str,
        slice_data: Option<Value>,
    ) -> Option<SliceOutcome> {
        let player_idx = self.players.iter().position(|p| p.id == player_id)?;
        if !self.players[player_idx].is_alive {
            debug!(room_id = %self.id, player_id = %player_id, "Slice from dead player ignored");
            return None;
        }

        let Some(fruit_idx) = self.fruits.iter().position(|f| f.id == fruit_id) else {
            debug!(room_id = %self.id, fruit_id, "Slice of unknown fruit ignored");
            return None;
        };

        let tick = self.tick;
        if !self.fruits[fruit_idx].mark_sliced(player_id, tick) {
            debug!(room_id = %self.id, fruit_id, "Fruit already sliced");
            return None;
        }
        let kind = self.fruits[fruit_idx].kind;

        let player = &mut self.players[player_idx];
        let raw_points = kind.base_points() + 2 * player.combo;
        let points = (raw_points as f32 * player.score_multiplier()).round() as u32;
        player.score += points;
        player.combo += 1;

        let effects = self.apply_special_effect(kind, fruit_idx, player_id);
        if !effects.is_empty() {
            self.broadcast(&ServerMsg::SpecialFruitEffect {
                fruit_id: fruit_id.to_string(),
                kind,
                player_id,
                effects: effects.clone(),
            });
        }

        let player = &self.players[player_idx];
        let outcome = SliceOutcome {
            points,
            new_score: player.score,
            new_combo: player.combo,
            effects,
        };

        self.broadcast(&ServerMsg::FruitSliced {
            player_id,
            fruit_id: fruit_id.to_string(),
            points,
            new_score: outcome.new_score,
            new_combo: outcome.new_combo,
            slice_data,
        });

        Some(outcome)
    }

    fn apply_special_effect(
        &mut self,
        kind: FruitKind,
        fruit_idx: usize,
        player_id: PlayerId,
    ) -> Vec<SpecialEffect> {
        match kind {
            FruitKind::Apple | FruitKind::Orange | FruitKind::Banana => Vec::new(),

            FruitKind::Bonus => {
                self.game_speed = (self.game_speed + self.config.bonus_speed_increment)
                    .min(self.config.max_game_speed);
                vec![SpecialEffect::SpeedBoost {
                    game_speed: self.game_speed,
                }]
            }

            FruitKind::Destroyer => {
                let origin = self.fruits[fruit_idx].circle().center();
                let radius = self.config.destroyer_radius;
                let tick = self.tick;

                let mut fruit_ids = Vec::new();
                for (idx, fruit) in self.fruits.iter_mut().enumerate() {
                    if idx == fruit_idx || fruit.sliced {
                        continue;
                    }
                    if fruit.circle().center().distance(origin) <= radius
                        && fruit.mark_sliced(player_id, tick)
                    {
                        fruit.destroyed_by = Some(FruitKind::Destroyer);
                        fruit_ids.push(fruit.id.clone());
                    }
                }

                let bonus = self.config.chain_bonus * fruit_ids.len() as u32;
                if let Some(player) = self.player_mut(player_id) {
                    player.score += bonus;
                }
                vec![SpecialEffect::ChainSlice { fruit_ids, bonus }]
            }

            FruitKind::Rainbow => vec![SpecialEffect::BackgroundShift {
                duration_ms: self.config.rainbow_duration_ms,
            }],

            FruitKind::Chaos => vec![SpecialEffect::ScrambleControls {
                duration_ms: self.config.chaos_duration_ms,
                targets: self
                    .players
                    .iter()
                    .map(|p| p.id)
                    .filter(|&id| id != player_id)
                    .collect(),
            }],
        }
    }

    // ---------------------------------------------------------------------
    // Tick
    // ---------------------------------------------------------------------

    /// Advance the room by one fixed step. No-op unless playing.
    pub fn tick(&mut self) {
        if self.status != GameStatus::Playing {
            return;
        }

        self.tick += 1;
        self.clock_ms += TICK_MS;

        let mut events = Vec::new();

        self.spawn_entities();
        self.expire_power_ups();
        self.update_fruits(&mut events);
        self.cull_fruits(&mut events);
        self.update_walls();
        self.update_power_ups();
        self.check_players(&mut events);

        for msg in &events {
            self.broadcast(msg);
        }

        if self.snapshots.should_send() {
            let update = self.snapshots.build_update(
                self.tick,
                self.game_speed,
                &self.players,
                &self.fruits,
                &self.walls,
                &self.power_ups,
            );
            self.broadcast(&update);
        }
    }

    fn spawn_entities(&mut self) {
        let config = &*self.config;
        let rng = &mut self.rng;

        if let Some(fruit) =
            self.spawner
                .maybe_spawn_fruit(self.clock_ms, self.tick, self.game_speed, config, rng)
        {
            self.fruits.push(fruit);
        }
        if let Some(wall) = self
            .spawner
            .maybe_spawn_wall(self.clock_ms, self.game_speed, config, rng)
        {
            self.walls.push(wall);
        }
        if let Some(power_up) =
            self.spawner
                .maybe_spawn_power_up(self.clock_ms, self.game_speed, config, rng)
        {
            self.power_ups.push(power_up);
        }
    }

    fn expire_power_ups(&mut self) {
        let tick = self.tick;
        for player in &mut self.players {
            player.power_ups.retain(|p| p.expires_at_tick > tick);
        }
    }

    /// Fruit motion and every fruit-side collision.
    ///
    /// Boundaries: the floor, the ceiling and a right limit past the spawn
    /// line reflect; the left edge is open and counts as a miss.
    fn update_fruits(&mut self, events: &mut Vec<ServerMsg>) {
        let config = &*self.config;
        let rng = &mut self.rng;

        let magnets: Vec<Vec2> = self
            .players
            .iter()
            .filter(|p| p.is_alive && p.has_power_up(PowerUpKind::Magnet))
            .map(|p| p.rect().center())
            .collect();

        for fruit in self.fruits.iter_mut().filter(|f| !f.sliced) {
            fruit.x += fruit.velocity_x;
            fruit.y += fruit.velocity_y;
            fruit.rotation += fruit.rotation_speed;

            if fruit.gravity_affected {
                fruit.velocity_y += config.fruit_gravity;
            } else if config.fruit_perturbation > 0.0 {
                let p = config.fruit_perturbation;
                fruit.velocity_x += rng.gen_range(-p..=p);
                fruit.velocity_y += rng.gen_range(-p..=p);
            }

            for &center in &magnets {
                let delta = center - fruit.circle().center();
                let distance = delta.length();
                if distance > f32::EPSILON && distance < config.magnet_radius {
                    let force = config.magnet_strength * (1.0 - distance / config.magnet_radius);
                    fruit.set_velocity(fruit.velocity() + delta / distance * force);
                }
            }

            for player in self.players.iter_mut().filter(|p| p.is_alive) {
                let padded = fruit.circle().padded(config.player_bounce_padding);
                if !PhysicsSystem::circle_in_rect(padded, player.rect()) {
                    continue;
                }
                let Some(away) = (fruit.circle().center() - player.rect().center()).try_normalize()
                else {
                    continue;
                };

                fruit.set_velocity(
                    away * config.player_bounce_strength + fruit.velocity() * config.player_bounce_retain,
                );
                player.velocity_y += away.y * config.player_nudge;

                events.push(ServerMsg::FruitPlayerBounce {
                    fruit_id: fruit.id.clone(),
                    player_id: player.id,
                    x: fruit.x,
                    y: fruit.y,
                });
            }

            for wall in &self.walls {
                let hit = PhysicsSystem::circle_vs_wall(fruit.circle(), &wall.shape());
                if !hit.has_collision {
                    continue;
                }

                let moved = PhysicsSystem::separate(fruit.circle(), &hit, config.separation_buffer);
                fruit.x = moved.x;
                fruit.y = moved.y;
                fruit.set_velocity(PhysicsSystem::reflect(
                    fruit.velocity(),
                    hit.normal,
                    config.wall_restitution,
                    config.bounce_jitter,
                    config.min_fruit_speed,
                    rng,
                ));
                fruit.rotation_speed = rng.gen_range(-config.max_spin..=config.max_spin);

                events.push(ServerMsg::FruitBounce {
                    fruit_id: fruit.id.clone(),
                    wall_id: wall.id.clone(),
                    side: hit.side,
                    x: fruit.x,
                    y: fruit.y,
                });
            }
        }

        let tuning = BounceTuning {
            restitution: config.fruit_restitution,
            jitter: config.bounce_jitter,
            min_speed: config.min_fruit_speed,
            damping: config.collision_damping,
            slop: config.circle_separation_slop,
        };
        for j in 1..self.fruits.len() {
            let (head, tail) = self.fruits.split_at_mut(j);
            let b = &mut tail[0];
            for a in head.iter_mut() {
                if a.sliced || b.sliced {
                    continue;
                }
                let hit = PhysicsSystem::circle_vs_circle(a.circle(), b.circle());
                if !hit.has_collision {
                    continue;
                }

                let (mut body_a, mut body_b) = (a.body(), b.body());
                PhysicsSystem::resolve_elastic_collision(
                    &mut body_a,
                    &mut body_b,
                    &hit,
                    &tuning,
                    rng,
                );
                a.apply_body(&body_a);
                b.apply_body(&body_b);

                events.push(ServerMsg::BallCollision {
                    fruit_id: a.id.clone(),
                    other_fruit_id: b.id.clone(),
                    x: (a.x + b.x) / 2.0,
                    y: (a.y + b.y) / 2.0,
                });
            }
        }

        let right_limit = config.field_width + 2.0 * config.spawn_margin;
        for fruit in self.fruits.iter_mut().filter(|f| !f.sliced) {
            if fruit.y - fruit.radius < 0.0 {
                fruit.y = fruit.radius;
                fruit.velocity_y = fruit.velocity_y.abs() * config.boundary_restitution;
            } else if fruit.y + fruit.radius > config.field_height {
                fruit.y = config.field_height - fruit.radius;
                fruit.velocity_y = -fruit.velocity_y.abs() * config.boundary_restitution;
            }

            if fruit.x > right_limit {
                fruit.x = right_limit;
                fruit.velocity_x = -fruit.velocity_x.abs() * config.boundary_restitution;
            }
        }
    }

    /// Drop decayed sliced fruit and missed fruit; a miss resets the combo of
    /// every living player in the room.
    fn cull_fruits(&mut self, events: &mut Vec<ServerMsg>) {
        let tick = self.tick;
        let decay = u64::from(self.config.sliced_decay_ticks);
        let min_lifetime = u64::from(self.config.min_fruit_lifetime_ticks);
        let mut missed = 0usize;

        self.fruits.retain(|fruit| {
            if fruit.sliced {
                return fruit
                    .sliced_at_tick
                    .map_or(false, |at| tick.saturating_sub(at) < decay);
            }
            if fruit.x < -2.0 * fruit.radius && fruit.age_ticks(tick) >= min_lifetime {
                events.push(ServerMsg::FruitMissed {
                    fruit_id: fruit.id.clone(),
                });
                missed += 1;
                return false;
            }
            true
        });

        if missed > 0 {
            for player in self.players.iter_mut().filter(|p| p.is_alive) {
                player.combo = 0;
            }
        }
    }

    fn update_walls(&mut self) {
        let speed = self.game_speed;
        for wall in &mut self.walls {
            let before = wall.right();
            wall.velocity_x = -speed;
            wall.x += wall.velocity_x;
            let after = wall.right();

            for player in self.players.iter_mut().filter(|p| p.is_alive) {
                if before >= player.x && after < player.x {
                    player.walls_passed += 1;
                }
            }
        }
        self.walls.retain(|w| w.x >= -w.width);
    }

    fn update_power_ups(&mut self) {
        let velocity_x = -self.game_speed * self.config.power_up_speed_factor;
        for power_up in &mut self.power_ups {
            power_up.velocity_x = velocity_x;
            power_up.x += velocity_x;
        }
        self.power_ups
            .retain(|p| !p.collected && p.x + p.width >= 0.0);
    }

    /// Deaths, shield breaks and power-up pickups for each living player
    fn check_players(&mut self, events: &mut Vec<ServerMsg>) {
        let config = &*self.config;
        let shield_push = config.shield_push;
        let tick = self.tick;

        for player in self.players.iter_mut().filter(|p| p.is_alive) {
            let rect = player.rect();

            let hit_by_fruit = self
                .fruits
                .iter()
                .any(|f| !f.sliced && PhysicsSystem::circle_in_rect(f.circle(), rect));
            if hit_by_fruit {
                player.kill();
                events.push(ServerMsg::PlayerDied {
                    player_id: player.id,
                    cause: DeathCause::Fruit,
                    x: player.x,
                    y: player.y,
                });
                continue;
            }

            if let Some(wall) = self
                .walls
                .iter_mut()
                .find(|w| PhysicsSystem::rect_vs_wall(rect, &w.shape()))
            {
                if player.has_shield {
                    let shape = wall.shape();
                    let side = PhysicsSystem::rect_wall_side(rect, &shape);
                    player.has_shield = false;
                    wall.broken_by_shield = true;
                    player.velocity_y = if rect.center().y < shape.gap_center() {
                        shield_push
                    } else {
                        -shield_push
                    };

                    events.push(ServerMsg::ShieldBreak {
                        player_id: player.id,
                        wall_id: wall.id.clone(),
                        side,
                        x: player.x,
                        y: player.y,
                    });
                } else {
                    player.kill();
                    events.push(ServerMsg::PlayerDied {
                        player_id: player.id,
                        cause: DeathCause::Wall,
                        x: player.x,
                        y: player.y,
                    });
                    continue;
                }
            }

            for power_up in self.power_ups.iter_mut().filter(|p| !p.collected) {
                if !rect.overlaps(&power_up.rect()) {
                    continue;
                }
                power_up.collected = true;
                grant_power_up(player, power_up.kind, tick, config);

                events.push(ServerMsg::PowerUpCollected {
                    player_id: player.id,
                    power_up_id: power_up.id.clone(),
                    kind: power_up.kind,
                });
            }
        }
    }
}

fn grant_power_up(player: &mut Player, kind: PowerUpKind, tick: u64, config: &GameConfig) {
    match kind.duration_ticks(config) {
        None => player.has_shield = true,
        Some(duration) => {
            player.power_ups.retain(|p| p.kind != kind);
            player.power_ups.push(ActivePowerUp {
                kind,
                expires_at_tick: tick + duration,
            });
        }
    }
}
