//! World collaborators — engine-side queries как black boxes
//!
//! Архитектура:
//! - Ядро (vision/motrix/brain) НЕ знает про physics engine, navmesh и шейдеры
//! - Engine layer реализует трейты ниже (raycast, pathfinding, light sampling)
//! - `HeadlessWorld` — reference реализация для headless демо и тестов
//!
//! Все трейты read-only (`&self`): одно NPC не может мутировать мир другого.

use bevy::prelude::*;

pub mod headless;
pub mod light_cache;

pub use headless::{HeadlessObstacle, HeadlessWorld, PointLight};
pub use light_cache::{LightSampleCache, LightService};

/// Collision layers (bitmask), совпадают с engine-side настройкой слоёв
pub const LAYER_ENVIRONMENT: u32 = 1 << 0;
pub const LAYER_ACTORS: u32 = 1 << 1;
pub const LAYER_PROPS: u32 = 1 << 2;

/// LOS: окружение + акторы (актор, попавший в луч, сам может быть целью)
pub const COLLISION_MASK_LOS: u32 = LAYER_ENVIRONMENT | LAYER_ACTORS | LAYER_PROPS;

/// Avoidance: всё, во что можно врезаться
pub const COLLISION_MASK_AVOIDANCE: u32 = LAYER_ENVIRONMENT | LAYER_ACTORS | LAYER_PROPS;

/// Результат raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub collider: Entity,
}

/// Physics raycast query (engine collaborator)
pub trait PhysicsQuery: Send + Sync {
    /// Луч из `origin` в `target`. `None` — ничего не задето.
    fn cast_ray(&self, origin: Vec3, target: Vec3, mask: u32, exclude: &[Entity]) -> Option<RayHit>;

    /// Жив ли collider (despawned / freed → false)
    fn is_collider_valid(&self, collider: Entity) -> bool;

    /// Скорость collider'а (static → ZERO)
    fn collider_velocity(&self, collider: Entity) -> Vec3;
}

/// Pathfinding query (navmesh collaborator)
pub trait Pathfinder: Send + Sync {
    /// Упорядоченный список waypoints, пустой если цель недостижима
    fn find_path(&self, from: Vec3, to: Vec3) -> Vec<Vec3>;
}

/// Light probe (screen-space / shader sampling collaborator)
pub trait LightProbe: Send + Sync {
    /// Luminance в точке, [0, 1]
    fn sample_light(&self, position: Vec3) -> f32;
}

/// Физическое тело, которым управляет Locomotion
pub trait BodyController {
    fn position(&self) -> Vec3;
    fn velocity(&self) -> Vec3;
    fn apply_velocity(&mut self, velocity: Vec3);
    fn is_grounded(&self) -> bool;
}

/// Resource: реализации collaborator'ов для текущего мира
///
/// Инжектится один раз на мир (per-scene), не глобальный static.
#[derive(Resource)]
pub struct WorldServices {
    pub physics: Box<dyn PhysicsQuery>,
    pub pathfinder: Box<dyn Pathfinder>,
    pub light: Box<dyn LightProbe>,
}

impl WorldServices {
    pub fn new(
        physics: impl PhysicsQuery + 'static,
        pathfinder: impl Pathfinder + 'static,
        light: impl LightProbe + 'static,
    ) -> Self {
        Self {
            physics: Box::new(physics),
            pathfinder: Box::new(pathfinder),
            light: Box::new(light),
        }
    }

    /// Один HeadlessWorld закрывает все три роли
    pub fn headless(world: HeadlessWorld) -> Self {
        Self::new(world.clone(), world.clone(), world)
    }
}

/// Снимок потенциальной цели на текущий тик
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    pub entity: Entity,
    pub position: Vec3,
    pub velocity: Vec3,
    /// 0 — безобидный, 1 — смертельная угроза
    pub threat_level: f32,
}

impl TargetInfo {
    pub fn new(entity: Entity, position: Vec3) -> Self {
        Self {
            entity,
            position,
            velocity: Vec3::ZERO,
            threat_level: 0.0,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_threat(mut self, threat_level: f32) -> Self {
        self.threat_level = threat_level.clamp(0.0, 1.0);
        self
    }
}

/// Снимок всех perceivable entities на тик
///
/// Entity = index + generation: despawned entity просто отсутствует в снимке,
/// а переиспользованный index имеет другой generation — stale handle никогда
/// не совпадёт. Это и есть "is_instance_valid" проверка.
#[derive(Debug, Clone, Default)]
pub struct TargetSnapshot {
    targets: Vec<TargetInfo>,
}

impl TargetSnapshot {
    pub fn new(targets: Vec<TargetInfo>) -> Self {
        Self { targets }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetInfo> {
        self.targets.iter()
    }

    pub fn get(&self, entity: Entity) -> Option<&TargetInfo> {
        self.targets.iter().find(|t| t.entity == entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Горизонтальная (XZ) проекция вектора
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Горизонтальная дистанция между точками
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    flatten(a - b).length()
}
