//! HeadlessWorld — простой мир без engine
//!
//! Используется headless демо (`main.rs`) и integration тестами:
//! - препятствия = сферы (raycast через аналитическое пересечение)
//! - свет = ambient + точечные источники с линейным затуханием
//! - pathfinding = прямая линия, обход одной сферы через боковой waypoint
//! - пол на y = 0

use bevy::prelude::*;

use super::{LightProbe, Pathfinder, PhysicsQuery, RayHit, LAYER_ENVIRONMENT};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessObstacle {
    pub collider: Entity,
    pub center: Vec3,
    pub radius: f32,
    pub velocity: Vec3,
    pub layer: u32,
}

impl HeadlessObstacle {
    pub fn sphere(collider: Entity, center: Vec3, radius: f32) -> Self {
        Self {
            collider,
            center,
            radius,
            velocity: Vec3::ZERO,
            layer: LAYER_ENVIRONMENT,
        }
    }

    pub fn moving(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Расстояние вдоль луча до первого пересечения (origin внутри → None)
    fn intersect(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32> {
        let oc = origin - self.center;
        let c = oc.length_squared() - self.radius * self.radius;
        if c < 0.0 {
            return None;
        }
        let b = oc.dot(direction);
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let distance = -b - discriminant.sqrt();
        (0.0..=max_distance).contains(&distance).then_some(distance)
    }

    fn contains(&self, point: Vec3) -> bool {
        point.distance(self.center) <= self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub radius: f32,
    pub intensity: f32,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessWorld {
    pub obstacles: Vec<HeadlessObstacle>,
    pub lights: Vec<PointLight>,
    pub ambient: f32,
}

impl HeadlessWorld {
    pub fn new(ambient: f32) -> Self {
        Self {
            obstacles: Vec::new(),
            lights: Vec::new(),
            ambient: ambient.clamp(0.0, 1.0),
        }
    }

    pub fn with_obstacle(mut self, obstacle: HeadlessObstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    pub fn with_light(mut self, position: Vec3, radius: f32, intensity: f32) -> Self {
        self.lights.push(PointLight {
            position,
            radius: radius.max(0.01),
            intensity: intensity.clamp(0.0, 1.0),
        });
        self
    }

    fn first_blocking(&self, from: Vec3, to: Vec3) -> Option<&HeadlessObstacle> {
        let delta = to - from;
        let length = delta.length();
        if length <= f32::EPSILON {
            return None;
        }
        let direction = delta / length;
        self.obstacles
            .iter()
            .filter_map(|o| o.intersect(from, direction, length).map(|d| (o, d)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(o, _)| o)
    }
}

impl PhysicsQuery for HeadlessWorld {
    fn cast_ray(&self, origin: Vec3, target: Vec3, mask: u32, exclude: &[Entity]) -> Option<RayHit> {
        let delta = target - origin;
        let length = delta.length();
        if length <= f32::EPSILON {
            return None;
        }
        let direction = delta / length;

        self.obstacles
            .iter()
            .filter(|o| o.layer & mask != 0 && !exclude.contains(&o.collider))
            .filter_map(|o| o.intersect(origin, direction, length).map(|d| (o, d)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(o, distance)| {
                let point = origin + direction * distance;
                RayHit {
                    point,
                    normal: (point - o.center).normalize_or_zero(),
                    collider: o.collider,
                }
            })
    }

    fn is_collider_valid(&self, collider: Entity) -> bool {
        self.obstacles.iter().any(|o| o.collider == collider)
    }

    fn collider_velocity(&self, collider: Entity) -> Vec3 {
        self.obstacles
            .iter()
            .find(|o| o.collider == collider)
            .map(|o| o.velocity)
            .unwrap_or(Vec3::ZERO)
    }
}

impl Pathfinder for HeadlessWorld {
    fn find_path(&self, from: Vec3, to: Vec3) -> Vec<Vec3> {
        if self.obstacles.iter().any(|o| o.contains(to)) {
            return Vec::new();
        }

        let Some(blocker) = self.first_blocking(from, to) else {
            return vec![from, to];
        };

        // Обход: waypoint сбоку от препятствия (перпендикуляр к линии движения)
        let forward = (to - from).normalize_or_zero();
        let side = forward.cross(Vec3::Y).normalize_or_zero();
        let clearance = blocker.radius + 1.0;
        let to_center = blocker.center - from;
        let sign = if to_center.dot(side) > 0.0 { -1.0 } else { 1.0 };
        let detour = Vec3::new(blocker.center.x, from.y, blocker.center.z) + side * clearance * sign;

        if self.first_blocking(from, detour).is_some() || self.first_blocking(detour, to).is_some() {
            return Vec::new();
        }
        vec![from, detour, to]
    }
}

impl LightProbe for HeadlessWorld {
    fn sample_light(&self, position: Vec3) -> f32 {
        let lit = self
            .lights
            .iter()
            .map(|light| {
                let falloff = 1.0 - position.distance(light.position) / light.radius;
                light.intensity * falloff.max(0.0)
            })
            .fold(self.ambient, f32::max);
        lit.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::COLLISION_MASK_LOS;

    fn wall() -> HeadlessObstacle {
        HeadlessObstacle::sphere(Entity::from_raw(900), Vec3::new(5.0, 0.0, 0.0), 1.0)
    }

    #[test]
    fn test_ray_hits_sphere() {
        let world = HeadlessWorld::new(0.5).with_obstacle(wall());
        let hit = world
            .cast_ray(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), COLLISION_MASK_LOS, &[])
            .expect("ray should hit");
        assert!((hit.point.x - 4.0).abs() < 1e-4);
        assert!((hit.normal - Vec3::NEG_X).length() < 1e-4);
        assert_eq!(hit.collider, Entity::from_raw(900));
    }

    #[test]
    fn test_ray_respects_exclusions_and_length() {
        let world = HeadlessWorld::new(0.5).with_obstacle(wall());
        assert!(world
            .cast_ray(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), COLLISION_MASK_LOS, &[Entity::from_raw(900)])
            .is_none());
        assert!(world
            .cast_ray(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), COLLISION_MASK_LOS, &[])
            .is_none());
    }

    #[test]
    fn test_path_detours_around_obstacle() {
        let world = HeadlessWorld::new(0.5).with_obstacle(wall());
        let path = world.find_path(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(path.len(), 3);
        assert!(path[1].z.abs() >= 2.0 - 1e-4);
    }

    #[test]
    fn test_path_into_obstacle_is_empty() {
        let world = HeadlessWorld::new(0.5).with_obstacle(wall());
        assert!(world.find_path(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_light_falloff() {
        let world = HeadlessWorld::new(0.1).with_light(Vec3::ZERO, 10.0, 1.0);
        assert!((world.sample_light(Vec3::ZERO) - 1.0).abs() < 1e-5);
        assert!((world.sample_light(Vec3::new(5.0, 0.0, 0.0)) - 0.5).abs() < 1e-5);
        assert!((world.sample_light(Vec3::new(50.0, 0.0, 0.0)) - 0.1).abs() < 1e-5);
    }
}
