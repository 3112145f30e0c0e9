//! FieldOfView — кандидаты по объёму (конус + ближняя сфера), без окклюзии
//!
//! Аналог VisionCone (Area3D overlap): каждый scan сравниваем текущий набор с
//! предыдущим → entered/exited. Окклюзию решает RaycastVisibility.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::world::TargetInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOfViewConfig {
    /// Дальность конуса (метры)
    pub view_distance: f32,
    /// Полный угол конуса (градусы)
    pub view_angle_degrees: f32,
    /// Ближе этого радиуса цель замечается с любой стороны
    pub proximity_radius: f32,
}

impl Default for FieldOfViewConfig {
    fn default() -> Self {
        Self {
            view_distance: 20.0,
            view_angle_degrees: 110.0,
            proximity_radius: 1.5,
        }
    }
}

/// Разница между двумя scan'ами
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FovScan {
    pub entered: Vec<Entity>,
    pub exited: Vec<Entity>,
}

#[derive(Debug, Clone)]
pub struct FieldOfView {
    config: FieldOfViewConfig,
    cos_half_angle: f32,
    in_view: HashSet<Entity>,
}

impl FieldOfView {
    pub fn new(config: FieldOfViewConfig) -> Self {
        let half_angle = (config.view_angle_degrees.clamp(0.0, 360.0) * 0.5).to_radians();
        Self {
            cos_half_angle: half_angle.cos(),
            config,
            in_view: HashSet::new(),
        }
    }

    pub fn config(&self) -> &FieldOfViewConfig {
        &self.config
    }

    /// Точка внутри объёма? `forward == ZERO` → только сфера view_distance
    pub fn covers(&self, origin: Vec3, forward: Vec3, point: Vec3) -> bool {
        let offset = point - origin;
        let distance = offset.length();

        if distance <= self.config.proximity_radius {
            return true;
        }
        if distance > self.config.view_distance {
            return false;
        }

        let Some(forward) = forward.try_normalize() else {
            return true;
        };
        offset.dot(forward) / distance >= self.cos_half_angle
    }

    /// Пересчитать набор целей в поле зрения
    pub fn scan<'a>(
        &mut self,
        observer: Entity,
        origin: Vec3,
        forward: Vec3,
        candidates: impl IntoIterator<Item = &'a TargetInfo>,
    ) -> FovScan {
        let current: HashSet<Entity> = candidates
            .into_iter()
            .filter(|t| t.entity != observer)
            .filter(|t| self.covers(origin, forward, t.position))
            .map(|t| t.entity)
            .collect();

        let mut scan = FovScan {
            entered: current.difference(&self.in_view).copied().collect(),
            exited: self.in_view.difference(&current).copied().collect(),
        };
        // HashSet порядок не детерминирован — сортируем для воспроизводимости
        scan.entered.sort();
        scan.exited.sort();

        self.in_view = current;
        scan
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.in_view.contains(&entity)
    }

    pub fn in_view(&self) -> impl Iterator<Item = Entity> + '_ {
        self.in_view.iter().copied()
    }

    pub fn clear(&mut self) {
        self.in_view.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(index: u32, position: Vec3) -> TargetInfo {
        TargetInfo::new(Entity::from_raw(index), position)
    }

    #[test]
    fn test_cone_and_proximity() {
        let fov = FieldOfView::new(FieldOfViewConfig::default());
        let forward = Vec3::X;

        assert!(fov.covers(Vec3::ZERO, forward, Vec3::new(10.0, 0.0, 0.0)));
        assert!(!fov.covers(Vec3::ZERO, forward, Vec3::new(-10.0, 0.0, 0.0)));
        assert!(fov.covers(Vec3::ZERO, forward, Vec3::new(-1.0, 0.0, 0.0))); // proximity
        assert!(!fov.covers(Vec3::ZERO, forward, Vec3::new(25.0, 0.0, 0.0))); // дальность
    }

    #[test]
    fn test_scan_reports_enter_and_exit() {
        let mut fov = FieldOfView::new(FieldOfViewConfig::default());
        let observer = Entity::from_raw(1);
        let a = target(2, Vec3::new(5.0, 0.0, 0.0));
        let b = target(3, Vec3::new(-5.0, 0.0, 0.0));

        let scan = fov.scan(observer, Vec3::ZERO, Vec3::X, [&a, &b]);
        assert_eq!(scan.entered, vec![a.entity]);
        assert!(scan.exited.is_empty());

        let scan = fov.scan(observer, Vec3::ZERO, Vec3::NEG_X, [&a, &b]);
        assert_eq!(scan.entered, vec![b.entity]);
        assert_eq!(scan.exited, vec![a.entity]);
        assert!(fov.contains(b.entity));
    }

    #[test]
    fn test_observer_is_never_in_view() {
        let mut fov = FieldOfView::new(FieldOfViewConfig::default());
        let me = target(1, Vec3::ZERO);
        fov.scan(me.entity, Vec3::ZERO, Vec3::X, [&me]);
        assert!(!fov.contains(me.entity));
    }
}
