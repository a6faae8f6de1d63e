//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod killlog;
pub mod movement;
pub mod raycast;
pub mod snapshot;
pub mod weapon;

pub use arena::{ArenaHandle, ArenaRegistry, GameArena, PlayerState};
pub use killlog::KillLog;

use crate::ws::protocol::ClientMsg;
use uuid::Uuid;

/// Player input received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub user_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Accumulated input state for a single tick.
///
/// Levels (movement axes, view angles, trigger held) keep the latest value;
/// edges (trigger release, reload, jump) are OR-ed across all messages that
/// arrive between two ticks and consumed exactly once by the next tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub seq: u32,
    pub move_x: f32,
    pub move_z: f32,
    pub run: bool,
    pub jump: bool,
    pub yaw: f32,
    pub pitch: f32,
    pub fire_held: bool,
    pub fire_released: bool,
    pub reload_pressed: bool,
}

impl TickInput {
    /// Fold one incoming input message into the pending tick input
    #[allow(clippy::too_many_arguments)]
    pub fn merge(
        &mut self,
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
        self.seq = seq;
        self.move_x = move_x;
        self.move_z = move_z;
        self.run = run;
        self.jump |= jump;
        self.yaw = yaw;
        self.pitch = pitch;
        self.fire_held = fire_held;
        self.fire_released |= fire_released;
        self.reload_pressed |= reload_pressed;
    }

    /// Drop the one-shot edge flags once a tick has consumed them
    pub fn clear_edges(&mut self) {
        self.jump = false;
        self.fire_released = false;
        self.reload_pressed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_accumulate_across_messages_until_consumed() {
        let mut input = TickInput::default();
        input.merge(1, 0.0, 1.0, false, false, 0.0, 0.0, true, true, false);
        // A later message without the edge must not erase it
        input.merge(2, 0.0, 1.0, false, false, 0.0, 0.0, false, false, true);

        assert!(input.fire_released);
        assert!(input.reload_pressed);
        assert!(!input.fire_held);
        assert_eq!(input.seq, 2);

        input.clear_edges();
        assert!(!input.fire_released);
        assert!(!input.reload_pressed);
    }
}
