//! Damage resolution rules and the combat error taxonomy

use thiserror::Error;

use crate::ws::protocol::Team;

/// Recoverable combat faults; all surface as player notices or logs,
/// none abort the simulation
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CombatError {
    #[error("out of ammo")]
    InsufficientAmmo,
    #[error("friendly fire blocked")]
    FriendlyFireBlocked,
    #[error("not the combat authority for this entity")]
    NotAuthoritative,
    #[error("target has no combat state")]
    InvalidTarget,
}

/// Result of an accepted damage application
#[derive(Debug, Clone, Copy)]
pub struct DamageOutcome {
    pub new_health: f32,
    /// True when this application crossed the target from alive to dead.
    /// Repeated hits on an already-dead target keep subtracting health but
    /// are never lethal again, so a kill is logged at most once per life.
    pub lethal: bool,
}

/// Apply the damage rules: same-team damage is rejected without touching
/// health, cross-team damage subtracts exactly `amount`.
pub fn resolve_damage(
    attacker_team: Team,
    target_team: Team,
    target_health: f32,
    amount: f32,
) -> Result<DamageOutcome, CombatError> {
    if attacker_team == target_team {
        return Err(CombatError::FriendlyFireBlocked);
    }
    let was_alive = target_health > 0.0;
    let new_health = target_health - amount;
    Ok(DamageOutcome {
        new_health,
        lethal: was_alive && new_health <= 0.0,
    })
}
