//! Locomotion — применение движения к физическому телу
//!
//! Горизонтальная скорость разгоняется к целевой с `acceleration`,
//! вертикальная — гравитация пока тело не на земле. Facing поворачивается
//! не быстрее `turn_speed` рад/с.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::world::{flatten, BodyController};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocomotionConfig {
    /// Скорость Walk (м/с); остальные состояния — через multiplier
    pub base_speed: f32,
    pub acceleration: f32,
    /// Рад/с
    pub turn_speed: f32,
    pub jump_velocity: f32,
    pub gravity: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            base_speed: 3.0,
            acceleration: 10.0,
            turn_speed: 8.0,
            jump_velocity: 5.0,
            gravity: -9.81,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Locomotion {
    config: LocomotionConfig,
    facing: Vec3,
}

impl Locomotion {
    pub fn new(config: LocomotionConfig) -> Self {
        Self {
            config,
            facing: Vec3::X,
        }
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub fn facing(&self) -> Vec3 {
        self.facing
    }

    /// Мгновенно развернуть (спавн, телепорт)
    pub fn set_facing(&mut self, direction: Vec3) {
        if let Some(direction) = flatten(direction).try_normalize() {
            self.facing = direction;
        }
    }

    /// Разогнать тело к `direction · speed`
    pub fn drive(&self, body: &mut dyn BodyController, direction: Vec3, speed: f32, dt: f32) {
        let current = body.velocity();
        let target = flatten(direction).normalize_or_zero() * speed.max(0.0);

        let horizontal = flatten(current);
        let delta = target - horizontal;
        let max_change = self.config.acceleration * dt.max(0.0);
        let horizontal = if delta.length() <= max_change {
            target
        } else {
            horizontal + delta.normalize_or_zero() * max_change
        };

        let vertical = if body.is_grounded() {
            current.y.max(0.0)
        } else {
            current.y + self.config.gravity * dt
        };

        body.apply_velocity(Vec3::new(horizontal.x, vertical, horizontal.z));
    }

    /// Повернуть facing к `target_direction` с ограничением скорости
    pub fn face(&mut self, target_direction: Vec3, dt: f32) {
        let Some(target) = flatten(target_direction).try_normalize() else {
            return;
        };

        let current_angle = self.facing.z.atan2(self.facing.x);
        let target_angle = target.z.atan2(target.x);
        let mut delta = target_angle - current_angle;
        // В (-π, π]
        while delta > std::f32::consts::PI {
            delta -= std::f32::consts::TAU;
        }
        while delta <= -std::f32::consts::PI {
            delta += std::f32::consts::TAU;
        }

        let max_turn = self.config.turn_speed * dt.max(0.0);
        if delta.abs() <= max_turn {
            self.facing = target;
        } else {
            let angle = current_angle + max_turn * delta.signum();
            self.facing = Vec3::new(angle.cos(), 0.0, angle.sin());
        }
    }

    /// Прыжок (только с земли)
    pub fn jump(&self, body: &mut dyn BodyController) -> bool {
        if !body.is_grounded() {
            return false;
        }
        let velocity = body.velocity();
        body.apply_velocity(Vec3::new(velocity.x, self.config.jump_velocity, velocity.z));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestBody {
        position: Vec3,
        velocity: Vec3,
        grounded: bool,
    }

    impl BodyController for TestBody {
        fn position(&self) -> Vec3 {
            self.position
        }
        fn velocity(&self) -> Vec3 {
            self.velocity
        }
        fn apply_velocity(&mut self, velocity: Vec3) {
            self.velocity = velocity;
        }
        fn is_grounded(&self) -> bool {
            self.grounded
        }
    }

    fn body(grounded: bool) -> TestBody {
        TestBody {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            grounded,
        }
    }

    #[test]
    fn test_drive_accelerates_toward_target_speed() {
        let locomotion = Locomotion::new(LocomotionConfig::default());
        let mut body = body(true);

        locomotion.drive(&mut body, Vec3::X, 3.0, 0.1);
        assert!((body.velocity.x - 1.0).abs() < 1e-5);

        for _ in 0..5 {
            locomotion.drive(&mut body, Vec3::X, 3.0, 0.1);
        }
        assert!((body.velocity.x - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_gravity_only_in_air() {
        let locomotion = Locomotion::new(LocomotionConfig::default());

        let mut grounded = body(true);
        locomotion.drive(&mut grounded, Vec3::ZERO, 0.0, 0.5);
        assert_eq!(grounded.velocity.y, 0.0);

        let mut airborne = body(false);
        locomotion.drive(&mut airborne, Vec3::ZERO, 0.0, 0.5);
        assert!(airborne.velocity.y < 0.0);
    }

    #[test]
    fn test_jump_requires_ground() {
        let locomotion = Locomotion::new(LocomotionConfig::default());

        let mut airborne = body(false);
        assert!(!locomotion.jump(&mut airborne));

        let mut grounded = body(true);
        assert!(locomotion.jump(&mut grounded));
        assert_eq!(grounded.velocity.y, 5.0);
    }

    #[test]
    fn test_face_is_rate_limited() {
        let mut locomotion = Locomotion::new(LocomotionConfig::default());
        locomotion.face(-Vec3::X, 0.1);
        // 0.8 рад за 0.1 с — ещё не развернулись
        assert!(locomotion.facing().dot(-Vec3::X) < 0.9);

        for _ in 0..10 {
            locomotion.face(-Vec3::X, 0.1);
        }
        assert!(locomotion.facing().dot(-Vec3::X) > 0.999);
    }
}
