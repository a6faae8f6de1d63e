//! Weapon instances - fire control, reload handling, ammo bookkeeping

use glam::Vec3;
use rand::Rng;

use crate::ws::protocol::WeaponClass;

/// How a weapon responds to trigger input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireMode {
    /// Fires every tick the trigger is held
    Automatic,
    /// Fires once per trigger release
    SemiAutomatic,
    /// Fires once per trigger release
    // TODO: fire a fixed 3-round volley per release once the burst count is
    // settled; until then burst behaves exactly like semi-automatic.
    Burst,
    /// Swing every tick the trigger is held; consumes no ammo
    Melee,
}

/// Static weapon parameters per class
#[derive(Debug, Clone, Copy)]
pub struct WeaponSpec {
    pub name: &'static str,
    pub fire_mode: FireMode,
    /// Damage per hit
    pub damage: f32,
    /// Maximum ray distance
    pub range: f32,
    /// Aim deviation radius, sampled uniformly from a disk
    pub spread: f32,
    /// Seconds between shots
    pub fire_interval: f32,
    /// Seconds to complete a reload
    pub reload_time: f32,
    /// Rounds per magazine
    pub magazine_size: u32,
    /// Cap on reserve ammo
    pub ammo_capacity: u32,
    /// Reserve ammo granted at spawn
    pub starting_ammo: u32,
}

impl WeaponSpec {
    pub fn for_class(class: WeaponClass) -> Self {
        match class {
            WeaponClass::Rifle => Self {
                name: "rifle",
                fire_mode: FireMode::Automatic,
                damage: 8.0,
                range: 40.0,
                spread: 0.05,
                fire_interval: 0.12,
                reload_time: 2.4,
                magazine_size: 30,
                ammo_capacity: 180,
                starting_ammo: 90,
            },
            WeaponClass::Pistol => Self {
                name: "pistol",
                fire_mode: FireMode::SemiAutomatic,
                damage: 5.0,
                range: 15.0,
                spread: 0.2,
                fire_interval: 1.0,
                reload_time: 1.0,
                magazine_size: 5,
                ammo_capacity: 30,
                starting_ammo: 15,
            },
            WeaponClass::BurstRifle => Self {
                name: "burst rifle",
                fire_mode: FireMode::Burst,
                damage: 7.0,
                range: 35.0,
                spread: 0.08,
                fire_interval: 0.4,
                reload_time: 2.0,
                magazine_size: 24,
                ammo_capacity: 96,
                starting_ammo: 48,
            },
            WeaponClass::Knife => Self {
                name: "knife",
                fire_mode: FireMode::Melee,
                damage: 35.0,
                range: 2.0,
                spread: 0.0,
                fire_interval: 0.8,
                reload_time: 0.0,
                magazine_size: 0,
                ammo_capacity: 0,
                starting_ammo: 0,
            },
        }
    }
}

/// Observable fire-control state, derived from the instance fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireState {
    Idle,
    Cooling,
    Reloading,
    Empty,
}

/// Result category of a trigger pull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Shot executed; magazine already decremented
    Fired,
    /// Cooldown has not elapsed yet
    Cooling,
    /// Magazine (or the whole weapon) is out of ammo
    Empty,
}

/// Full result of a trigger pull, including reload preemption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireAttempt {
    pub outcome: FireOutcome,
    /// True if this attempt interrupted an in-progress reload
    pub cancelled_reload: bool,
}

/// Result of a reload request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStart {
    Started,
    AlreadyReloading,
    MagazineFull,
    /// Both ammo pools are empty; reload refused
    OutOfAmmo,
}

/// A weapon held by one player: static spec plus live timers and ammo
#[derive(Debug, Clone)]
pub struct Weapon {
    pub class: WeaponClass,
    pub spec: WeaponSpec,
    /// Seconds until the next shot is allowed; counts down to 0
    pub cooldown: f32,
    /// Seconds of reload progress; counts up while reloading
    pub reload_timer: f32,
    pub reloading: bool,
    /// Rounds currently in the magazine
    pub magazine: u32,
    /// Rounds in reserve, transferred in by reloads
    pub reserve: u32,
}

impl Weapon {
    pub fn new(class: WeaponClass) -> Self {
        Self::from_spec(class, WeaponSpec::for_class(class))
    }

    /// Build a weapon from an explicit spec, clamping the capacities so the
    /// ledger invariants hold from the first tick.
    pub fn from_spec(class: WeaponClass, mut spec: WeaponSpec) -> Self {
        spec.starting_ammo = spec.starting_ammo.min(spec.ammo_capacity);
        spec.magazine_size = spec.magazine_size.min(spec.ammo_capacity);
        Self {
            class,
            cooldown: 0.0,
            reload_timer: 0.0,
            reloading: false,
            magazine: spec.magazine_size,
            reserve: spec.starting_ammo,
            spec,
        }
    }

    /// Magazine empty (melee weapons never report empty)
    pub fn is_empty_clip(&self) -> bool {
        self.magazine == 0 && self.spec.fire_mode != FireMode::Melee
    }

    /// Both pools empty (melee weapons never report empty)
    pub fn is_empty(&self) -> bool {
        self.magazine == 0 && self.reserve == 0 && self.spec.fire_mode != FireMode::Melee
    }

    pub fn state(&self) -> FireState {
        if self.reloading {
            FireState::Reloading
        } else if self.is_empty_clip() {
            FireState::Empty
        } else if self.cooldown > 0.0 {
            FireState::Cooling
        } else {
            FireState::Idle
        }
    }

    /// Whether this tick's input pulls the trigger for the weapon's fire mode
    pub fn trigger_pulled(&self, fire_held: bool, fire_released: bool) -> bool {
        match self.spec.fire_mode {
            FireMode::Automatic | FireMode::Melee => fire_held,
            FireMode::SemiAutomatic | FireMode::Burst => fire_released,
        }
    }

    /// Tick down the fire cooldown; called once per simulation tick
    pub fn update_cooldown(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    /// Process one trigger pull.
    ///
    /// A trigger pull always interrupts an in-progress reload, even when the
    /// magazine is empty or the cooldown then blocks the shot - the reload's
    /// partial progress is discarded either way.
    pub fn try_fire(&mut self) -> FireAttempt {
        let cancelled_reload = self.reloading;
        if cancelled_reload {
            self.cancel_reload();
        }

        if self.is_empty_clip() || self.is_empty() {
            return FireAttempt {
                outcome: FireOutcome::Empty,
                cancelled_reload,
            };
        }

        if self.cooldown > 0.0 {
            return FireAttempt {
                outcome: FireOutcome::Cooling,
                cancelled_reload,
            };
        }

        self.cooldown = self.spec.fire_interval;
        if self.spec.fire_mode != FireMode::Melee {
            self.magazine = self.magazine.saturating_sub(1);
        }
        FireAttempt {
            outcome: FireOutcome::Fired,
            cancelled_reload,
        }
    }

    /// Request a reload on a reload input edge
    pub fn try_start_reload(&mut self) -> ReloadStart {
        if self.is_empty() {
            return ReloadStart::OutOfAmmo;
        }
        if self.reloading {
            return ReloadStart::AlreadyReloading;
        }
        if self.magazine >= self.spec.magazine_size {
            return ReloadStart::MagazineFull;
        }
        self.reload_timer = 0.0;
        self.reloading = true;
        ReloadStart::Started
    }

    /// Advance an in-progress reload; returns true on the tick it completes.
    /// The transfer moves `min(magazine_size - magazine, reserve)` rounds, so
    /// the combined pool total never grows.
    pub fn update_reload(&mut self, dt: f32) -> bool {
        if !self.reloading {
            return false;
        }
        self.reload_timer += dt;
        if self.reload_timer < self.spec.reload_time {
            return false;
        }
        let needed = (self.spec.magazine_size - self.magazine).min(self.reserve);
        self.magazine += needed;
        self.reserve -= needed;
        self.reloading = false;
        self.reload_timer = 0.0;
        true
    }

    /// Abort a reload, discarding progress; no ammo moves
    pub fn cancel_reload(&mut self) {
        self.reloading = false;
        self.reload_timer = 0.0;
    }

    /// Restore starting ammo and clear all timers (respawn)
    pub fn reset(&mut self) {
        self.cooldown = 0.0;
        self.reload_timer = 0.0;
        self.reloading = false;
        self.magazine = self.spec.magazine_size;
        self.reserve = self.spec.starting_ammo;
    }

    /// Spread-adjusted aim direction: a 2D offset drawn uniformly from the
    /// unit disk, scaled by the weapon's spread, applied on the view's
    /// right/up axes. The perturbed direction is re-normalized.
    pub fn spread_direction(
        &self,
        forward: Vec3,
        right: Vec3,
        up: Vec3,
        rng: &mut impl Rng,
    ) -> Vec3 {
        if self.spec.spread <= 0.0 {
            return forward.normalize_or_zero();
        }
        let theta = rng.gen_range(0.0..std::f32::consts::TAU);
        let radius = rng.gen_range(0.0f32..=1.0).sqrt() * self.spec.spread;
        let offset = right * (radius * theta.cos()) + up * (radius * theta.sin());
        (forward + offset).normalize_or_zero()
    }
}
