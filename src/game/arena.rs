//! Arena state and the authoritative tick loop

use dashmap::DashMap;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::{tick_delta, Timer, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};
use crate::ws::protocol::{
    AnimationCue, ClientMsg, GameEvent, PlayerInfo, ServerMsg, Team, WeaponClass, WeaponSlot,
};

use super::combat::{resolve_damage, CombatError};
use super::killlog::KillLog;
use super::movement::{MoveStats, MovementSystem, PLAYER_HEIGHT, PLAYER_RADIUS};
use super::raycast::{self, HitTarget, PlayerHitbox, Ray};
use super::snapshot::SnapshotBuilder;
use super::weapon::{FireMode, FireOutcome, ReloadStart, Weapon};
use super::{PlayerInput, TickInput};

/// Spawn health for every player
pub const MAX_HEALTH: f32 = 100.0;

/// Distance of each team's spawn line from the arena center
const SPAWN_LINE_Z: f32 = 48.0;

/// Vertical look limit (45 degrees either way)
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_4;

/// Player state in an arena (authoritative)
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub user_id: Uuid,
    pub display_name: String,
    pub team: Team,

    // Position and view
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub pitch: f32,

    // Combat
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
    pub respawn_timer: f32,

    // Loadout: primary plus a melee fallback
    pub weapons: [Weapon; 2],
    pub active_slot: WeaponSlot,
    pub move_stats: MoveStats,

    // Input tracking
    pub last_input_seq: u32,
    pub current_input: TickInput,

    // Scoreboard
    pub kills: u32,
    pub deaths: u32,
}

impl PlayerState {
    pub fn new(
        user_id: Uuid,
        display_name: String,
        team: Team,
        primary: WeaponClass,
        spawn: Vec3,
        yaw: f32,
    ) -> Self {
        Self {
            user_id,
            display_name,
            team,
            position: spawn,
            velocity: Vec3::ZERO,
            yaw,
            pitch: 0.0,
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            alive: true,
            respawn_timer: 0.0,
            weapons: [Weapon::new(primary), Weapon::new(WeaponClass::Knife)],
            active_slot: WeaponSlot::Primary,
            move_stats: MoveStats::standard(),
            last_input_seq: 0,
            // Seed the input yaw so the first simulated tick keeps the
            // spawn facing until real input arrives
            current_input: TickInput {
                yaw,
                ..Default::default()
            },
            kills: 0,
            deaths: 0,
        }
    }

    fn slot_index(slot: WeaponSlot) -> usize {
        match slot {
            WeaponSlot::Primary => 0,
            WeaponSlot::Melee => 1,
        }
    }

    pub fn active_weapon(&self) -> &Weapon {
        &self.weapons[Self::slot_index(self.active_slot)]
    }

    pub fn active_weapon_mut(&mut self) -> &mut Weapon {
        &mut self.weapons[Self::slot_index(self.active_slot)]
    }

    pub fn hitbox(&self) -> PlayerHitbox {
        PlayerHitbox {
            user_id: self.user_id,
            base: self.position,
            radius: PLAYER_RADIUS,
            height: PLAYER_HEIGHT,
        }
    }
}

/// Arena state (owned by the arena task)
pub struct ArenaState {
    pub id: Uuid,
    pub seed: u64,
    pub tick: u64,
    pub players: HashMap<Uuid, PlayerState>,
    pub rng: ChaCha8Rng,
    pub max_players: usize,
}

impl ArenaState {
    pub fn new(id: Uuid, seed: u64, max_players: usize) -> Self {
        Self {
            id,
            seed,
            tick: 0,
            players: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_players,
        }
    }

    /// Pick the team with fewer players, randomizing ties
    pub fn balanced_team(&mut self) -> Team {
        let red = self
            .players
            .values()
            .filter(|p| p.team == Team::Red)
            .count();
        let blue = self.players.len() - red;
        if red < blue {
            Team::Red
        } else if blue < red {
            Team::Blue
        } else if self.rng.gen_bool(0.5) {
            Team::Red
        } else {
            Team::Blue
        }
    }

    /// Generate a spawn position on the team's side, facing the center
    pub fn generate_spawn_position(&mut self, team: Team) -> (Vec3, f32) {
        let x = self.rng.gen_range(-20.0..20.0);
        match team {
            Team::Red => (Vec3::new(x, 0.0, -SPAWN_LINE_Z), 0.0),
            Team::Blue => (Vec3::new(x, 0.0, SPAWN_LINE_Z), std::f32::consts::PI),
        }
    }
}

/// Handle to a running arena
#[derive(Clone)]
pub struct ArenaHandle {
    pub id: Uuid,
    /// Commands into the authoritative task; the only way to mutate state
    pub input_tx: mpsc::Sender<PlayerInput>,
    /// Events and snapshots out to every observer, including the sender
    pub broadcast_tx: broadcast::Sender<ServerMsg>,
    pub player_count: Arc<std::sync::atomic::AtomicUsize>,
}

impl ArenaHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Registry of all active arenas
pub struct ArenaRegistry {
    arenas: DashMap<Uuid, ArenaHandle>,
}

impl ArenaRegistry {
    pub fn new() -> Self {
        Self {
            arenas: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<ArenaHandle> {
        self.arenas.get(id).map(|a| a.value().clone())
    }

    pub fn insert(&self, handle: ArenaHandle) {
        self.arenas.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<ArenaHandle> {
        self.arenas.remove(id).map(|(_, h)| h)
    }

    pub fn active_arenas(&self) -> usize {
        self.arenas.len()
    }

    pub fn total_players(&self) -> usize {
        self.arenas.iter().map(|a| a.value().player_count()).sum()
    }

    /// Find an arena with available slots
    pub fn find_available_arena(&self, max_players: usize) -> Option<ArenaHandle> {
        for entry in self.arenas.iter() {
            if entry.value().player_count() < max_players {
                return Some(entry.value().clone());
            }
        }
        None
    }
}

impl Default for ArenaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A shot accepted by fire control, waiting for ray resolution
struct PendingShot {
    shooter_id: Uuid,
    origin: Vec3,
    dir: Vec3,
    range: f32,
    damage: f32,
}

/// The authoritative game arena
pub struct GameArena {
    state: ArenaState,
    input_rx: mpsc::Receiver<PlayerInput>,
    broadcast_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    player_count: Arc<std::sync::atomic::AtomicUsize>,
    kill_log: Arc<KillLog>,
    respawn_delay: f32,
    pending_events: Vec<GameEvent>,
    had_players: bool,
}

impl GameArena {
    /// Create a new arena. The kill log, seed and channels are handed in
    /// explicitly; the arena never reaches out to locate them.
    pub fn new(
        id: Uuid,
        seed: u64,
        max_players: usize,
        respawn_delay: f32,
        kill_log: Arc<KillLog>,
    ) -> (Self, ArenaHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (broadcast_tx, _) = broadcast::channel(64);
        let player_count = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let handle = ArenaHandle {
            id,
            input_tx,
            broadcast_tx: broadcast_tx.clone(),
            player_count: player_count.clone(),
        };

        let snapshot_interval = SIMULATION_TPS / SNAPSHOT_TPS;
        let arena = Self {
            state: ArenaState::new(id, seed, max_players),
            input_rx,
            broadcast_tx,
            snapshot_builder: SnapshotBuilder::new(snapshot_interval),
            player_count,
            kill_log,
            respawn_delay,
            pending_events: Vec::new(),
            had_players: false,
        };

        (arena, handle)
    }

    /// Run the authoritative tick loop
    pub async fn run(mut self) {
        info!(arena_id = %self.state.id, "Arena started");

        let tick_duration = Duration::from_micros(TICK_DURATION_MICROS);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            let timer = Timer::new();

            // Drain the command queue, then advance the simulation
            self.process_inputs();
            let events = self.run_tick();
            self.pending_events.extend(events);

            if self.snapshot_builder.should_send() {
                let events = std::mem::take(&mut self.pending_events);
                let snapshot =
                    self.snapshot_builder
                        .build(self.state.tick, &self.state.players, events);
                let _ = self.broadcast_tx.send(snapshot);
            }

            if timer.elapsed_micros() > TICK_DURATION_MICROS {
                warn!(
                    arena_id = %self.state.id,
                    elapsed_micros = timer.elapsed_micros(),
                    "Simulation tick ran past its budget"
                );
            }

            if self.had_players && self.state.players.is_empty() {
                info!(arena_id = %self.state.id, "All players left, shutting down arena");
                break;
            }
        }
    }

    /// Process all pending commands from players
    pub fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            match input.msg {
                ClientMsg::JoinArena {
                    weapon,
                    display_name,
                    ..
                } => {
                    self.handle_join(input.user_id, weapon, display_name);
                }
                ClientMsg::InputTick {
                    seq,
                    move_x,
                    move_z,
                    run,
                    jump,
                    yaw,
                    pitch,
                    fire_held,
                    fire_released,
                    reload_pressed,
                } => {
                    self.handle_input(
                        input.user_id,
                        seq,
                        move_x,
                        move_z,
                        run,
                        jump,
                        yaw,
                        pitch,
                        fire_held,
                        fire_released,
                        reload_pressed,
                    );
                }
                ClientMsg::SwitchWeapon { slot } => {
                    self.handle_switch(input.user_id, slot);
                }
                ClientMsg::UpdateHealth { delta } => {
                    self.handle_update_health(input.user_id, delta);
                }
                ClientMsg::Ping { t } => {
                    let _ = self.broadcast_tx.send(ServerMsg::Pong { t });
                }
                ClientMsg::LeaveArena => {
                    self.handle_leave(input.user_id);
                }
            }
        }
    }

    /// Handle player join request
    fn handle_join(&mut self, user_id: Uuid, weapon: WeaponClass, display_name: Option<String>) {
        if self.state.players.contains_key(&user_id) {
            warn!(user_id = %user_id, "Player already in arena");
            return;
        }

        if self.state.players.len() >= self.state.max_players {
            let _ = self.broadcast_tx.send(ServerMsg::Error {
                code: "arena_full".to_string(),
                message: "Arena is full".to_string(),
            });
            return;
        }

        let display_name = display_name
            .map(|n| n.trim().chars().take(24).collect::<String>())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Player_{}", &user_id.to_string()[..8]));

        let team = self.state.balanced_team();
        let (spawn, yaw) = self.state.generate_spawn_position(team);
        let player = PlayerState::new(user_id, display_name, team, weapon, spawn, yaw);

        let player_info = PlayerInfo {
            user_id,
            display_name: player.display_name.clone(),
            team,
            weapon,
        };

        self.state.players.insert(user_id, player);
        self.player_count
            .store(self.state.players.len(), std::sync::atomic::Ordering::Relaxed);
        self.had_players = true;

        // Notify all players of the new player
        let _ = self.broadcast_tx.send(ServerMsg::PlayerJoined {
            player: player_info,
        });

        // Send arena joined to the new player
        let players: Vec<PlayerInfo> = self
            .state
            .players
            .values()
            .map(|p| PlayerInfo {
                user_id: p.user_id,
                display_name: p.display_name.clone(),
                team: p.team,
                weapon: p.weapons[0].class,
            })
            .collect();

        let _ = self.broadcast_tx.send(ServerMsg::ArenaJoined {
            arena_id: self.state.id,
            seed: self.state.seed,
            team,
            players,
            recent_kills: self.kill_log.recent(10),
        });

        info!(
            arena_id = %self.state.id,
            user_id = %user_id,
            team = ?team,
            player_count = self.state.players.len(),
            "Player joined arena"
        );
    }

    /// Handle player input
    #[allow(clippy::too_many_arguments)]
    fn handle_input(
        &mut self,
        user_id: Uuid,
        seq: u32,
        move_x: f32,
        move_z: f32,
        run: bool,
        jump: bool,
        yaw: f32,
        pitch: f32,
        fire_held: bool,
        fire_released: bool,
        reload_pressed: bool,
    ) {
        let Some(player) = self.state.players.get_mut(&user_id) else {
            debug!(
                user_id = %user_id,
                error = %CombatError::NotAuthoritative,
                "Dropping input for player not owned by this arena"
            );
            return;
        };
        // Dead players have no say until they respawn; stale sequence
        // numbers cover duplicate delivery
        if player.alive && seq > player.last_input_seq {
            player.last_input_seq = seq;
            player.current_input.merge(
                seq,
                move_x,
                move_z,
                run,
                jump,
                yaw,
                pitch,
                fire_held,
                fire_released,
                reload_pressed,
            );
        }
    }

    /// Handle weapon slot switching
    fn handle_switch(&mut self, user_id: Uuid, slot: WeaponSlot) {
        let Some(player) = self.state.players.get_mut(&user_id) else {
            debug!(
                user_id = %user_id,
                error = %CombatError::NotAuthoritative,
                "Dropping weapon switch for player not owned by this arena"
            );
            return;
        };
        if !player.alive || player.active_slot == slot {
            return;
        }

        // Switching away aborts any reload on the outgoing weapon
        let was_reloading = player.active_weapon().reloading;
        player.active_weapon_mut().cancel_reload();
        player.active_slot = slot;

        let weapon = player.active_weapon();
        self.pending_events.push(GameEvent::Ammo {
            user_id,
            magazine: weapon.magazine,
            reserve: weapon.reserve,
        });
        if was_reloading {
            self.pending_events.push(GameEvent::Feedback {
                user_id,
                text: None,
            });
            self.pending_events.push(GameEvent::Animation {
                user_id,
                cue: AnimationCue::ReloadEnd,
            });
        }
    }

    /// Handle an authority-side health adjustment (healing pads, self-damage)
    fn handle_update_health(&mut self, user_id: Uuid, delta: f32) {
        let Some(player) = self.state.players.get_mut(&user_id) else {
            debug!(
                user_id = %user_id,
                error = %CombatError::NotAuthoritative,
                "Dropping health update for player not owned by this arena"
            );
            return;
        };
        if !player.alive {
            return;
        }
        player.health = (player.health + delta).min(player.max_health);
        // A lethal adjustment is picked up by the death check this tick
    }

    /// Handle player leave
    fn handle_leave(&mut self, user_id: Uuid) {
        if self.state.players.remove(&user_id).is_some() {
            self.player_count
                .store(self.state.players.len(), std::sync::atomic::Ordering::Relaxed);

            let _ = self.broadcast_tx.send(ServerMsg::PlayerLeft {
                user_id,
                reason: "disconnected".to_string(),
            });

            info!(
                arena_id = %self.state.id,
                user_id = %user_id,
                "Player left arena"
            );
        }
    }

    /// Run a single simulation tick.
    /// Per-player order: movement, fire control, reload, death check.
    pub fn run_tick(&mut self) -> Vec<GameEvent> {
        self.state.tick += 1;
        let mut events = Vec::new();

        self.update_movement();
        events.extend(self.update_combat());
        events.extend(self.update_reloads());
        events.extend(self.update_deaths_and_respawns());

        // Edges are consumed exactly once
        for player in self.state.players.values_mut() {
            player.current_input.clear_edges();
        }

        events
    }

    /// Integrate movement for all alive players
    fn update_movement(&mut self) {
        for player in self.state.players.values_mut() {
            if !player.alive {
                continue;
            }

            let input = player.current_input;
            player.yaw = input.yaw;
            player.pitch = input.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);

            let (position, velocity) = MovementSystem::update_player(
                player.position,
                player.velocity,
                input.move_x,
                input.move_z,
                input.run,
                input.jump,
                player.yaw,
                &player.move_stats,
            );
            player.position = position;
            player.velocity = velocity;
        }
    }

    /// Evaluate fire control for every alive player, then resolve the
    /// accepted shots against hitboxes
    fn update_combat(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let dt = tick_delta();
        let mut shots: Vec<PendingShot> = Vec::new();

        {
            let ArenaState { players, rng, .. } = &mut self.state;
            for player in players.values_mut() {
                if !player.alive {
                    continue;
                }

                // Cooldowns tick down whether or not the trigger moves
                for weapon in player.weapons.iter_mut() {
                    weapon.update_cooldown(dt);
                }

                let input = player.current_input;
                let user_id = player.user_id;

                if !player
                    .active_weapon()
                    .trigger_pulled(input.fire_held, input.fire_released)
                {
                    continue;
                }

                let attempt = player.active_weapon_mut().try_fire();
                if attempt.cancelled_reload {
                    events.push(GameEvent::Feedback {
                        user_id,
                        text: None,
                    });
                    events.push(GameEvent::Animation {
                        user_id,
                        cue: AnimationCue::ReloadEnd,
                    });
                }

                match attempt.outcome {
                    FireOutcome::Fired => {
                        let (forward, right, up) =
                            MovementSystem::aim_basis(player.yaw, player.pitch);
                        let origin = MovementSystem::eye_position(player.position);
                        let weapon = player.active_weapon();
                        let dir = weapon.spread_direction(forward, right, up, rng);

                        events.push(GameEvent::Shot {
                            shooter_id: user_id,
                            weapon: weapon.class,
                            origin_x: origin.x,
                            origin_y: origin.y,
                            origin_z: origin.z,
                            dir_x: dir.x,
                            dir_y: dir.y,
                            dir_z: dir.z,
                        });
                        events.push(GameEvent::Animation {
                            user_id,
                            cue: AnimationCue::Fire,
                        });
                        if weapon.spec.fire_mode != FireMode::Melee {
                            events.push(GameEvent::Ammo {
                                user_id,
                                magazine: weapon.magazine,
                                reserve: weapon.reserve,
                            });
                        }

                        shots.push(PendingShot {
                            shooter_id: user_id,
                            origin,
                            dir,
                            range: weapon.spec.range,
                            damage: weapon.spec.damage,
                        });
                    }
                    FireOutcome::Cooling => {
                        events.push(GameEvent::Notice {
                            user_id,
                            text: "weapon is cooling down".to_string(),
                        });
                    }
                    FireOutcome::Empty => {
                        events.push(GameEvent::Notice {
                            user_id,
                            text: CombatError::InsufficientAmmo.to_string(),
                        });
                    }
                }
            }
        }

        for shot in shots {
            let targets: Vec<PlayerHitbox> = self
                .state
                .players
                .values()
                .filter(|p| p.alive && p.user_id != shot.shooter_id)
                .map(|p| p.hitbox())
                .collect();

            let ray = Ray {
                origin: shot.origin,
                dir: shot.dir,
                max_dist: shot.range,
            };
            let Some(hit) = raycast::cast(&ray, &targets) else {
                continue;
            };

            match hit.target {
                // World geometry carries no combat state; skip silently
                HitTarget::Ground => {}
                HitTarget::Player(target_id) => {
                    self.apply_hit(shot.shooter_id, target_id, shot.damage, hit.point, &mut events);
                }
            }
        }

        events
    }

    /// Authority-side damage application for one resolved hit
    fn apply_hit(
        &mut self,
        shooter_id: Uuid,
        target_id: Uuid,
        damage: f32,
        point: Vec3,
        events: &mut Vec<GameEvent>,
    ) {
        let Some((attacker_team, attacker_name)) = self
            .state
            .players
            .get(&shooter_id)
            .map(|p| (p.team, p.display_name.clone()))
        else {
            return;
        };

        let Some(target) = self.state.players.get_mut(&target_id) else {
            debug!(
                target_id = %target_id,
                error = %CombatError::InvalidTarget,
                "Resolved hit on unknown target ignored"
            );
            return;
        };

        match resolve_damage(attacker_team, target.team, target.health, damage) {
            Err(err) => {
                events.push(GameEvent::Notice {
                    user_id: shooter_id,
                    text: err.to_string(),
                });
            }
            Ok(outcome) => {
                target.health = outcome.new_health;
                let victim_name = target.display_name.clone();

                events.push(GameEvent::Hit {
                    shooter_id,
                    target_id,
                    damage,
                    x: point.x,
                    y: point.y,
                    z: point.z,
                });
                events.push(GameEvent::Notice {
                    user_id: shooter_id,
                    text: format!("{:.0} damage to {}", damage, victim_name),
                });

                if outcome.lethal {
                    // Health is already written; the kill broadcast follows it
                    let entry =
                        self.kill_log
                            .append(shooter_id, &attacker_name, target_id, &victim_name);
                    events.push(GameEvent::Kill { entry });
                    self.transition_death(target_id, events);
                    if let Some(shooter) = self.state.players.get_mut(&shooter_id) {
                        shooter.kills += 1;
                    }
                    self.snapshot_builder.force_next();
                }
            }
        }
    }

    /// Move a player from alive to dead; fires exactly once per crossing
    fn transition_death(&mut self, victim_id: Uuid, events: &mut Vec<GameEvent>) {
        let respawn_delay = self.respawn_delay;
        let Some(player) = self.state.players.get_mut(&victim_id) else {
            return;
        };
        if !player.alive {
            return;
        }

        player.alive = false;
        player.velocity = Vec3::ZERO;
        player.deaths += 1;
        player.respawn_timer = respawn_delay;
        player.current_input = TickInput::default();
        for weapon in player.weapons.iter_mut() {
            weapon.cancel_reload();
        }

        events.push(GameEvent::Feedback {
            user_id: victim_id,
            text: None,
        });
        events.push(GameEvent::Death {
            user_id: victim_id,
        });

        info!(
            arena_id = %self.state.id,
            user_id = %victim_id,
            "Player died"
        );
    }

    /// Advance reload timers and handle reload input edges
    fn update_reloads(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let dt = tick_delta();

        for player in self.state.players.values_mut() {
            if !player.alive {
                continue;
            }

            let user_id = player.user_id;
            let reload_pressed = player.current_input.reload_pressed;
            let weapon = player.active_weapon_mut();

            if reload_pressed {
                match weapon.try_start_reload() {
                    ReloadStart::Started => {
                        events.push(GameEvent::Feedback {
                            user_id,
                            text: Some("Reloading...".to_string()),
                        });
                        events.push(GameEvent::Animation {
                            user_id,
                            cue: AnimationCue::Reload,
                        });
                    }
                    ReloadStart::OutOfAmmo => {
                        events.push(GameEvent::Notice {
                            user_id,
                            text: format!("cannot reload: {}", CombatError::InsufficientAmmo),
                        });
                    }
                    ReloadStart::AlreadyReloading | ReloadStart::MagazineFull => {}
                }
            }

            if weapon.update_reload(dt) {
                let (magazine, reserve) = (weapon.magazine, weapon.reserve);
                events.push(GameEvent::Ammo {
                    user_id,
                    magazine,
                    reserve,
                });
                events.push(GameEvent::Feedback {
                    user_id,
                    text: None,
                });
                events.push(GameEvent::Animation {
                    user_id,
                    cue: AnimationCue::ReloadEnd,
                });
            }
        }

        events
    }

    /// Catch health crossings from non-combat sources, then run respawns
    fn update_deaths_and_respawns(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let dt = tick_delta();

        let crossed: Vec<Uuid> = self
            .state
            .players
            .values()
            .filter(|p| p.alive && p.health <= 0.0)
            .map(|p| p.user_id)
            .collect();
        for victim_id in crossed {
            self.transition_death(victim_id, &mut events);
            self.snapshot_builder.force_next();
        }

        let mut due = Vec::new();
        for player in self.state.players.values_mut() {
            if player.alive {
                continue;
            }
            player.respawn_timer -= dt;
            if player.respawn_timer <= 0.0 {
                due.push(player.user_id);
            }
        }

        for user_id in due {
            let Some(team) = self.state.players.get(&user_id).map(|p| p.team) else {
                continue;
            };
            let (spawn, yaw) = self.state.generate_spawn_position(team);
            let Some(player) = self.state.players.get_mut(&user_id) else {
                continue;
            };

            player.position = spawn;
            player.velocity = Vec3::ZERO;
            player.yaw = yaw;
            player.pitch = 0.0;
            player.health = player.max_health;
            player.alive = true;
            player.respawn_timer = 0.0;
            player.current_input = TickInput {
                yaw,
                ..Default::default()
            };
            for weapon in player.weapons.iter_mut() {
                weapon.reset();
            }

            let weapon = player.active_weapon();
            events.push(GameEvent::Respawn {
                user_id,
                x: spawn.x,
                y: spawn.y,
                z: spawn.z,
            });
            events.push(GameEvent::Ammo {
                user_id,
                magazine: weapon.magazine,
                reserve: weapon.reserve,
            });

            info!(
                arena_id = %self.state.id,
                user_id = %user_id,
                "Player respawned"
            );
        }

        events
    }
}
