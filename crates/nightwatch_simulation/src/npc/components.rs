//! NPC ECS компоненты (тело + маркеры)
//!
//! Vision / Motrix / Brain — сами по себе компоненты (facades), здесь только
//! то, что нужно ECS слою вокруг них.

use bevy::prelude::*;

use crate::world::BodyController;

/// Маркер: entity управляется cognition стеком
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct NpcTag;

/// Kinematic тело: скорость интегрируется в Transform системой
/// `integrate_kinematic_bodies`, пол на y = 0.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct KinematicBody {
    /// Скорость (m/s)
    pub velocity: Vec3,
    /// Стоит ли на земле
    pub grounded: bool,
}

impl Default for KinematicBody {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            grounded: true,
        }
    }
}

/// Entity, которую могут видеть NPC (игрок, другие NPC, звери)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Perceivable {
    /// 0 — безобидный, 1 — смертельная угроза
    pub threat_level: f32,
}

impl Perceivable {
    pub fn new(threat_level: f32) -> Self {
        Self {
            threat_level: threat_level.clamp(0.0, 1.0),
        }
    }
}

/// BodyController поверх Transform + KinematicBody на время physics step
pub struct NpcBody<'a> {
    pub transform: &'a Transform,
    pub body: &'a mut KinematicBody,
}

impl BodyController for NpcBody<'_> {
    fn position(&self) -> Vec3 {
        self.transform.translation
    }

    fn velocity(&self) -> Vec3 {
        self.body.velocity
    }

    fn apply_velocity(&mut self, velocity: Vec3) {
        self.body.velocity = velocity;
    }

    fn is_grounded(&self) -> bool {
        self.body.grounded
    }
}
