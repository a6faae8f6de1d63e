//! Hit-scan ray queries against player hitboxes and world geometry

use glam::Vec3;
use uuid::Uuid;

/// A hit-scan ray; `dir` must be normalized
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
    pub max_dist: f32,
}

/// What a ray resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Player(Uuid),
    /// World geometry; carries no combat state
    Ground,
}

/// Nearest intersection along a ray
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub target: HitTarget,
    pub distance: f32,
    pub point: Vec3,
}

/// Upright cylinder hitbox for one player, anchored at the feet
#[derive(Debug, Clone, Copy)]
pub struct PlayerHitbox {
    pub user_id: Uuid,
    pub base: Vec3,
    pub radius: f32,
    pub height: f32,
}

/// Cast against all hitboxes and the ground plane, returning the nearest hit
pub fn cast(ray: &Ray, targets: &[PlayerHitbox]) -> Option<RayHit> {
    let mut best: Option<RayHit> = None;

    for hitbox in targets {
        if let Some(distance) = ray_cylinder_intersection(ray, hitbox) {
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(RayHit {
                    target: HitTarget::Player(hitbox.user_id),
                    distance,
                    point: ray.origin + ray.dir * distance,
                });
            }
        }
    }

    if let Some(distance) = ray_ground_intersection(ray) {
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(RayHit {
                target: HitTarget::Ground,
                distance,
                point: ray.origin + ray.dir * distance,
            });
        }
    }

    best
}

/// Ray vs upright cylinder: nearest `t` on the side surface or an end cap
fn ray_cylinder_intersection(ray: &Ray, hitbox: &PlayerHitbox) -> Option<f32> {
    let y_bottom = hitbox.base.y;
    let y_top = hitbox.base.y + hitbox.height;
    let mx = ray.origin.x - hitbox.base.x;
    let mz = ray.origin.z - hitbox.base.z;

    let mut best: Option<f32> = None;
    let mut consider = |t: f32| {
        if t >= 0.0 && t <= ray.max_dist && best.map_or(true, |b| t < b) {
            best = Some(t);
        }
    };

    // Side surface: solve |xz(t) - center| = radius in the ground plane
    let a = ray.dir.x * ray.dir.x + ray.dir.z * ray.dir.z;
    let b = 2.0 * (mx * ray.dir.x + mz * ray.dir.z);
    let c = mx * mx + mz * mz - hitbox.radius * hitbox.radius;

    if a > 1e-8 {
        let disc = b * b - 4.0 * a * c;
        if disc >= 0.0 {
            let sqrt_disc = disc.sqrt();
            for t in [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)] {
                let y = ray.origin.y + ray.dir.y * t;
                if y >= y_bottom && y <= y_top {
                    consider(t);
                }
            }
        }
    } else if c > 0.0 {
        // Vertical ray outside the column
        return None;
    }

    // End caps
    if ray.dir.y.abs() > 1e-8 {
        for cap_y in [y_bottom, y_top] {
            let t = (cap_y - ray.origin.y) / ray.dir.y;
            let px = ray.origin.x + ray.dir.x * t - hitbox.base.x;
            let pz = ray.origin.z + ray.dir.z * t - hitbox.base.z;
            if px * px + pz * pz <= hitbox.radius * hitbox.radius {
                consider(t);
            }
        }
    }

    best
}

/// Ray vs the y=0 ground plane
fn ray_ground_intersection(ray: &Ray) -> Option<f32> {
    if ray.dir.y.abs() < 1e-8 {
        return None;
    }
    let t = -ray.origin.y / ray.dir.y;
    (t >= 0.0 && t <= ray.max_dist).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hitbox_at(x: f32, z: f32) -> PlayerHitbox {
        PlayerHitbox {
            user_id: Uuid::new_v4(),
            base: Vec3::new(x, 0.0, z),
            radius: 0.5,
            height: 1.8,
        }
    }

    fn level_ray(max_dist: f32) -> Ray {
        Ray {
            origin: Vec3::new(0.0, 1.0, 0.0),
            dir: Vec3::Z,
            max_dist,
        }
    }

    #[test]
    fn hits_a_target_straight_ahead() {
        let target = hitbox_at(0.0, 10.0);
        let hit = cast(&level_ray(40.0), &[target]).unwrap();
        assert_eq!(hit.target, HitTarget::Player(target.user_id));
        assert!((hit.distance - 9.5).abs() < 1e-4);
        assert!((hit.point.z - 9.5).abs() < 1e-4);
    }

    #[test]
    fn nearest_target_wins() {
        let near = hitbox_at(0.0, 5.0);
        let far = hitbox_at(0.0, 12.0);
        let hit = cast(&level_ray(40.0), &[far, near]).unwrap();
        assert_eq!(hit.target, HitTarget::Player(near.user_id));
    }

    #[test]
    fn range_limits_the_cast() {
        let target = hitbox_at(0.0, 30.0);
        assert!(cast(&level_ray(15.0), &[target]).is_none());
    }

    #[test]
    fn misses_to_the_side() {
        let target = hitbox_at(2.0, 10.0);
        assert!(cast(&level_ray(40.0), &[target]).is_none());
    }

    #[test]
    fn misses_over_the_head() {
        let target = hitbox_at(0.0, 10.0);
        let ray = Ray {
            origin: Vec3::new(0.0, 3.0, 0.0),
            dir: Vec3::Z,
            max_dist: 40.0,
        };
        assert!(cast(&ray, &[target]).is_none());
    }

    #[test]
    fn downward_ray_hits_the_ground() {
        let ray = Ray {
            origin: Vec3::new(0.0, 2.0, 0.0),
            dir: Vec3::new(0.0, -1.0, 0.0),
            max_dist: 10.0,
        };
        let hit = cast(&ray, &[]).unwrap();
        assert_eq!(hit.target, HitTarget::Ground);
        assert!((hit.distance - 2.0).abs() < 1e-4);
    }

    #[test]
    fn player_in_front_of_the_ground_takes_the_hit() {
        let target = hitbox_at(0.0, 4.0);
        // Shallow downward ray that would reach the ground past the target
        let ray = Ray {
            origin: Vec3::new(0.0, 1.5, 0.0),
            dir: Vec3::new(0.0, -0.2, 0.98).normalize(),
            max_dist: 40.0,
        };
        let hit = cast(&ray, &[target]).unwrap();
        assert_eq!(hit.target, HitTarget::Player(target.user_id));
    }

    #[test]
    fn cap_hit_from_above() {
        let target = hitbox_at(0.0, 0.0);
        let ray = Ray {
            origin: Vec3::new(0.0, 5.0, 0.0),
            dir: Vec3::new(0.0, -1.0, 0.0),
            max_dist: 10.0,
        };
        let hit = cast(&ray, &[target]).unwrap();
        assert_eq!(hit.target, HitTarget::Player(target.user_id));
        assert!((hit.distance - 3.2).abs() < 1e-4);
    }
}
