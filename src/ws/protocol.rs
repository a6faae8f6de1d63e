//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Team affiliation; friendly fire inside a team is blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Red,
    Blue,
}

/// Weapon classes available in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponClass {
    /// Full-auto, mid range
    Rifle,
    /// Semi-automatic sidearm
    Pistol,
    /// Release-fired burst rifle
    BurstRifle,
    /// Melee, no ammo
    Knife,
}

impl Default for WeaponClass {
    fn default() -> Self {
        Self::Rifle
    }
}

/// Loadout slot selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponSlot {
    Primary,
    Melee,
}

/// Animation cues broadcast for remote avatars; fire-and-forget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationCue {
    Fire,
    Reload,
    ReloadEnd,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request to join an arena
    JoinArena {
        /// Optional specific arena ID, otherwise the server assigns one
        arena_id: Option<Uuid>,
        /// Primary weapon selection
        weapon: WeaponClass,
        /// Display name shown in kill feeds; server picks one if absent
        display_name: Option<String>,
    },

    /// Player input for current tick
    InputTick {
        /// Sequence number for client-side prediction reconciliation
        seq: u32,
        /// Strafe input (-1.0 = left, 1.0 = right)
        move_x: f32,
        /// Forward input (-1.0 = back, 1.0 = forward)
        move_z: f32,
        /// Sprint modifier held
        run: bool,
        /// Jump pressed this tick
        jump: bool,
        /// View yaw in radians
        yaw: f32,
        /// View pitch in radians
        pitch: f32,
        /// Trigger held this tick
        fire_held: bool,
        /// Trigger released since the last input (edge)
        fire_released: bool,
        /// Reload pressed since the last input (edge)
        reload_pressed: bool,
    },

    /// Switch between loadout slots
    SwitchWeapon {
        slot: WeaponSlot,
    },

    /// Adjust own health (healing pads, self-damage); authority applies it
    UpdateHealth {
        delta: f32,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave current arena
    LeaveArena,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        user_id: Uuid,
        server_time: u64,
    },

    /// Confirmation of arena join
    ArenaJoined {
        arena_id: Uuid,
        /// Seed for deterministic random generation
        seed: u64,
        /// Team the joining player was placed on
        team: Team,
        /// All players in the arena at join time
        players: Vec<PlayerInfo>,
        /// Recent kill-log entries for the kill feed
        recent_kills: Vec<KillLogEntry>,
    },

    /// Player joined the arena
    PlayerJoined {
        player: PlayerInfo,
    },

    /// Player left the arena
    PlayerLeft {
        user_id: Uuid,
        reason: String,
    },

    /// Game state snapshot (sent at regular intervals)
    Snapshot {
        /// Server tick number
        tick: u64,
        /// All player states
        players: Vec<PlayerSnapshot>,
        /// Events that occurred since last snapshot
        events: Vec<GameEvent>,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Player info for join notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub user_id: Uuid,
    pub display_name: String,
    pub team: Team,
    pub weapon: WeaponClass,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub user_id: Uuid,
    /// Feet position
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// View angles in radians
    pub yaw: f32,
    pub pitch: f32,
    pub health: f32,
    pub alive: bool,
    /// Last processed input sequence
    pub last_input_seq: u32,
    /// Active weapon and its ammo state
    pub weapon: WeaponClass,
    pub magazine: u32,
    pub reserve: u32,
    pub reloading: bool,
    /// Cooldown remaining on the active weapon (0 = can fire)
    pub weapon_cooldown: f32,
    pub kills: u32,
    pub deaths: u32,
}

/// One line of the process-wide kill log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillLogEntry {
    /// Monotonic order token
    pub seq: u64,
    pub attacker_id: Uuid,
    pub attacker_name: String,
    pub victim_id: Uuid,
    pub victim_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Game events (shots, damage, kills, UI notices)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Hit-scan shot fired
    Shot {
        shooter_id: Uuid,
        weapon: WeaponClass,
        origin_x: f32,
        origin_y: f32,
        origin_z: f32,
        dir_x: f32,
        dir_y: f32,
        dir_z: f32,
    },

    /// Hit registered on a player
    Hit {
        shooter_id: Uuid,
        target_id: Uuid,
        damage: f32,
        x: f32,
        y: f32,
        z: f32,
    },

    /// Lethal hit; carries the appended kill-log line
    Kill {
        entry: KillLogEntry,
    },

    /// Player died (fires once per death)
    Death {
        user_id: Uuid,
    },

    /// Player respawned
    Respawn {
        user_id: Uuid,
        x: f32,
        y: f32,
        z: f32,
    },

    /// Console notice for one player; other clients ignore it
    Notice {
        user_id: Uuid,
        text: String,
    },

    /// Ammo display update for one player
    Ammo {
        user_id: Uuid,
        magazine: u32,
        reserve: u32,
    },

    /// Set or clear the HUD feedback line for one player
    Feedback {
        user_id: Uuid,
        text: Option<String>,
    },

    /// Avatar animation cue
    Animation {
        user_id: Uuid,
        cue: AnimationCue,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_tick_round_trips_edge_flags() {
        let msg = ClientMsg::InputTick {
            seq: 42,
            move_x: 0.0,
            move_z: 1.0,
            run: true,
            jump: false,
            yaw: 1.2,
            pitch: -0.1,
            fire_held: true,
            fire_released: false,
            reload_pressed: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"input_tick\""));
        let back: ClientMsg = serde_json::from_str(&json).unwrap();
        match back {
            ClientMsg::InputTick {
                seq,
                fire_held,
                reload_pressed,
                ..
            } => {
                assert_eq!(seq, 42);
                assert!(fire_held);
                assert!(reload_pressed);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn events_carry_their_tag() {
        let event = GameEvent::Death {
            user_id: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"death\""));
    }

    #[test]
    fn join_uses_snake_case_weapon_names() {
        let msg = ClientMsg::JoinArena {
            arena_id: None,
            weapon: WeaponClass::BurstRifle,
            display_name: Some("ace".to_string()),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"weapon\":\"burst_rifle\""));
    }
}
