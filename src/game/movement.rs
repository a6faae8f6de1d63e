//! First-person movement integration and view math

use glam::Vec3;

use crate::util::time::tick_delta;

/// Playable area half-extent on both ground axes
pub const ARENA_HALF_EXTENT: f32 = 60.0;

/// Hitbox dimensions shared by all players
pub const PLAYER_RADIUS: f32 = 0.5;
pub const PLAYER_HEIGHT: f32 = 1.8;
/// Camera/muzzle height above the feet
pub const EYE_HEIGHT: f32 = 1.6;

/// Locomotion constants per player
#[derive(Debug, Clone, Copy)]
pub struct MoveStats {
    pub walk_speed: f32,
    pub run_speed: f32,
    pub jump_speed: f32,
    pub gravity: f32,
}

impl MoveStats {
    pub fn standard() -> Self {
        Self {
            walk_speed: 7.5,
            run_speed: 11.5,
            jump_speed: 8.0,
            gravity: 20.0,
        }
    }
}

/// Movement system for integrating player positions
pub struct MovementSystem;

impl MovementSystem {
    /// Integrate one tick of movement input.
    /// Returns (new_position, new_velocity).
    pub fn update_player(
        position: Vec3,
        velocity: Vec3,
        move_x: f32,
        move_z: f32,
        run: bool,
        jump: bool,
        yaw: f32,
        stats: &MoveStats,
    ) -> (Vec3, Vec3) {
        let dt = tick_delta();

        // Clamp inputs
        let move_x = move_x.clamp(-1.0, 1.0);
        let move_z = move_z.clamp(-1.0, 1.0);

        // Ground-plane basis from the view yaw
        let forward = Vec3::new(yaw.sin(), 0.0, yaw.cos());
        let right = Vec3::new(yaw.cos(), 0.0, -yaw.sin());

        let speed = if run { stats.run_speed } else { stats.walk_speed };
        let horizontal = forward * (move_z * speed) + right * (move_x * speed);

        let grounded = position.y <= f32::EPSILON;
        let mut vel_y = if jump && grounded {
            stats.jump_speed
        } else {
            velocity.y
        };
        if !grounded {
            vel_y -= stats.gravity * dt;
        }

        let mut new_velocity = Vec3::new(horizontal.x, vel_y, horizontal.z);
        let mut new_position = position + new_velocity * dt;

        // Ground and arena bounds
        if new_position.y < 0.0 {
            new_position.y = 0.0;
            new_velocity.y = 0.0;
        }
        new_position.x = new_position.x.clamp(-ARENA_HALF_EXTENT, ARENA_HALF_EXTENT);
        new_position.z = new_position.z.clamp(-ARENA_HALF_EXTENT, ARENA_HALF_EXTENT);

        (new_position, new_velocity)
    }

    /// Eye position of a player standing at `position`
    pub fn eye_position(position: Vec3) -> Vec3 {
        position + Vec3::new(0.0, EYE_HEIGHT, 0.0)
    }

    /// View basis (forward, right, up) for a yaw/pitch pair
    pub fn aim_basis(yaw: f32, pitch: f32) -> (Vec3, Vec3, Vec3) {
        let forward = Vec3::new(
            yaw.sin() * pitch.cos(),
            pitch.sin(),
            yaw.cos() * pitch.cos(),
        );
        let right = Vec3::new(yaw.cos(), 0.0, -yaw.sin());
        let up = forward.cross(right);
        (forward, right, up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::time::tick_delta;

    #[test]
    fn walking_moves_along_the_view_forward() {
        let stats = MoveStats::standard();
        let (pos, vel) = MovementSystem::update_player(
            Vec3::ZERO,
            Vec3::ZERO,
            0.0,
            1.0,
            false,
            false,
            0.0,
            &stats,
        );
        assert!((vel.z - stats.walk_speed).abs() < 1e-4);
        assert!((pos.z - stats.walk_speed * tick_delta()).abs() < 1e-4);
        assert_eq!(pos.x, 0.0);
    }

    #[test]
    fn running_is_faster_than_walking() {
        let stats = MoveStats::standard();
        let (walk, _) =
            MovementSystem::update_player(Vec3::ZERO, Vec3::ZERO, 0.0, 1.0, false, false, 0.0, &stats);
        let (run, _) =
            MovementSystem::update_player(Vec3::ZERO, Vec3::ZERO, 0.0, 1.0, true, false, 0.0, &stats);
        assert!(run.z > walk.z);
    }

    #[test]
    fn jump_rises_then_gravity_pulls_back_down() {
        let stats = MoveStats::standard();
        let (mut pos, mut vel) = MovementSystem::update_player(
            Vec3::ZERO,
            Vec3::ZERO,
            0.0,
            0.0,
            false,
            true,
            0.0,
            &stats,
        );
        assert!(pos.y > 0.0);

        // Two seconds is plenty to land again
        for _ in 0..60 {
            let (p, v) =
                MovementSystem::update_player(pos, vel, 0.0, 0.0, false, false, 0.0, &stats);
            pos = p;
            vel = v;
        }
        assert_eq!(pos.y, 0.0);
        assert_eq!(vel.y, 0.0);
    }

    #[test]
    fn position_stays_inside_the_arena() {
        let stats = MoveStats::standard();
        let edge = Vec3::new(ARENA_HALF_EXTENT, 0.0, 0.0);
        let (pos, _) =
            MovementSystem::update_player(edge, Vec3::ZERO, 1.0, 0.0, true, false, 0.0, &stats);
        assert!(pos.x <= ARENA_HALF_EXTENT);
    }

    #[test]
    fn aim_basis_is_orthonormal() {
        let (forward, right, up) = MovementSystem::aim_basis(0.7, -0.3);
        assert!((forward.length() - 1.0).abs() < 1e-4);
        assert!((right.length() - 1.0).abs() < 1e-4);
        assert!((up.length() - 1.0).abs() < 1e-4);
        assert!(forward.dot(right).abs() < 1e-4);
        assert!(forward.dot(up).abs() < 1e-4);
        assert!(right.dot(up).abs() < 1e-4);
    }

    #[test]
    fn level_aim_looks_along_the_yaw_direction() {
        let (forward, _, _) = MovementSystem::aim_basis(0.0, 0.0);
        assert!((forward - Vec3::Z).length() < 1e-6);
    }
}
