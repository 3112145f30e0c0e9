//! RaycastVisibility — single-ray LOS check
//!
//! Луч из глаз наблюдателя в "голову" цели (оба +eye_height):
//! - нет коллизий → LOS clear
//! - collider == цель → LOS clear (попали точно в target)
//! - другой collider → LOS blocked

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::world::{PhysicsQuery, TargetInfo, COLLISION_MASK_LOS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaycastVisibilityConfig {
    /// Высота глаз/головы над pivot (метры)
    pub eye_height: f32,
    /// Дальше — не видим без raycast
    pub max_distance: f32,
    pub collision_mask: u32,
}

impl Default for RaycastVisibilityConfig {
    fn default() -> Self {
        Self {
            eye_height: 0.8,
            max_distance: 30.0,
            collision_mask: COLLISION_MASK_LOS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RaycastVisibility {
    config: RaycastVisibilityConfig,
    visible: HashSet<Entity>,
}

impl RaycastVisibility {
    pub fn new(config: RaycastVisibilityConfig) -> Self {
        Self {
            config,
            visible: HashSet::new(),
        }
    }

    pub fn config(&self) -> &RaycastVisibilityConfig {
        &self.config
    }

    pub fn check(
        &self,
        physics: &dyn PhysicsQuery,
        observer: Entity,
        observer_position: Vec3,
        target: Entity,
        target_position: Vec3,
    ) -> bool {
        if observer_position.distance(target_position) > self.config.max_distance {
            return false;
        }

        let eye = Vec3::Y * self.config.eye_height;
        match physics.cast_ray(
            observer_position + eye,
            target_position + eye,
            self.config.collision_mask,
            &[observer],
        ) {
            None => true,
            Some(hit) => hit.collider == target,
        }
    }

    /// Пересчитать видимый набор для списка кандидатов
    pub fn refresh<'a>(
        &mut self,
        physics: &dyn PhysicsQuery,
        observer: Entity,
        observer_position: Vec3,
        candidates: impl IntoIterator<Item = &'a TargetInfo>,
    ) {
        let visible: HashSet<Entity> = candidates
            .into_iter()
            .filter(|t| t.entity != observer)
            .filter(|t| self.check(physics, observer, observer_position, t.entity, t.position))
            .map(|t| t.entity)
            .collect();
        self.visible = visible;
    }

    pub fn is_visible(&self, entity: Entity) -> bool {
        self.visible.contains(&entity)
    }

    pub fn visible_targets(&self) -> impl Iterator<Item = Entity> + '_ {
        self.visible.iter().copied()
    }

    pub fn clear(&mut self) {
        self.visible.clear();
    }
}
