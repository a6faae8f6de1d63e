//! Snapshot building for network transmission

use std::collections::HashMap;
use uuid::Uuid;

use crate::ws::protocol::{GameEvent, PlayerSnapshot, ServerMsg};

use super::PlayerState;

/// Decides when to emit snapshots and assembles them
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot message
    pub fn build(
        &mut self,
        tick: u64,
        players: &HashMap<Uuid, PlayerState>,
        events: Vec<GameEvent>,
    ) -> ServerMsg {
        let player_snapshots: Vec<PlayerSnapshot> = players
            .values()
            .map(|p| {
                let weapon = p.active_weapon();
                PlayerSnapshot {
                    user_id: p.user_id,
                    x: p.position.x,
                    y: p.position.y,
                    z: p.position.z,
                    yaw: p.yaw,
                    pitch: p.pitch,
                    health: p.health,
                    alive: p.alive,
                    last_input_seq: p.last_input_seq,
                    weapon: weapon.class,
                    magazine: weapon.magazine,
                    reserve: weapon.reserve,
                    reloading: weapon.reloading,
                    weapon_cooldown: weapon.cooldown,
                    kills: p.kills,
                    deaths: p.deaths,
                }
            })
            .collect();

        ServerMsg::Snapshot {
            tick,
            players: player_snapshots,
            events,
        }
    }
}
