//! ObstacleAvoidance — кольцо лучей + поле отталкивания
//!
//! Каждый physics step:
//! 1. `scan`: `ray_count` лучей по кругу в XZ (первый — по направлению движения)
//! 2. попадания создают/обновляют ObstacleRecord (по collider)
//! 3. устаревшие (не видны `obstacle_timeout`) и невалидные записи удаляются
//! 4. `avoid`: Σ force/d² от всех записей + затухающая "память" отталкивания,
//!    смешанная с желаемым направлением по `avoidance_weight`
//!
//! Память нужна, чтобы NPC не дёргался, когда луч на кадр перестаёт попадать.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::events::MotrixEvent;
use crate::events::EventQueue;
use crate::world::{flatten, PhysicsQuery, COLLISION_MASK_AVOIDANCE};

/// Скорость, выше которой препятствие считается движущимся (м/с)
const MOVING_SPEED_EPSILON: f32 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleAvoidanceConfig {
    pub ray_count: usize,
    pub ray_length: f32,
    /// Высота лучей над позицией тела
    pub ray_height: f32,
    pub avoidance_force: f32,
    /// Доля отталкивания в итоговом направлении [0, 1]
    pub avoidance_weight: f32,
    /// frontality выше — препятствие "прямо по курсу"
    pub frontal_avoidance_threshold: f32,
    pub frontal_boost: f32,
    pub moving_obstacle_boost: f32,
    /// Скорость экспоненциального затухания памяти (1/с)
    pub memory_decay_rate: f32,
    pub obstacle_timeout: f64,
    /// Пол дистанции в 1/d² (без взрыва рядом с препятствием)
    pub min_distance: f32,
    /// Фронтальное препятствие ближе — путь заблокирован
    pub blocked_distance: f32,
    pub collision_mask: u32,
}

impl Default for ObstacleAvoidanceConfig {
    fn default() -> Self {
        Self {
            ray_count: 8,
            ray_length: 3.0,
            ray_height: 0.5,
            avoidance_force: 4.0,
            avoidance_weight: 0.6,
            frontal_avoidance_threshold: 0.7,
            frontal_boost: 2.0,
            moving_obstacle_boost: 1.5,
            memory_decay_rate: 3.0,
            obstacle_timeout: 0.5,
            min_distance: 0.2,
            blocked_distance: 1.0,
            collision_mask: COLLISION_MASK_AVOIDANCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleRecord {
    pub collider: Entity,
    /// Точка попадания
    pub position: Vec3,
    pub normal: Vec3,
    /// Единичный XZ вектор от NPC к точке попадания
    pub direction: Vec3,
    pub distance: f32,
    /// dot(direction, направление движения) ∈ [-1, 1]
    pub frontality: f32,
    pub velocity: Vec3,
    pub last_seen: f64,
}

#[derive(Debug, Clone)]
pub struct ObstacleAvoidance {
    config: ObstacleAvoidanceConfig,
    /// BTreeMap: порядок суммирования сил фиксирован (детерминизм)
    obstacles: BTreeMap<Entity, ObstacleRecord>,
    memory: Vec3,
    events: EventQueue<MotrixEvent>,
}

impl ObstacleAvoidance {
    pub fn new(config: ObstacleAvoidanceConfig) -> Self {
        Self {
            config,
            obstacles: BTreeMap::new(),
            memory: Vec3::ZERO,
            events: EventQueue::default(),
        }
    }

    pub fn config(&self) -> &ObstacleAvoidanceConfig {
        &self.config
    }

    /// Бросить кольцо лучей и обновить записи
    pub fn scan(&mut self, physics: &dyn PhysicsQuery, self_entity: Entity, origin: Vec3, travel_direction: Vec3, now: f64) {
        let travel = flatten(travel_direction).normalize_or_zero();
        let ray_origin = origin + Vec3::Y * self.config.ray_height;
        let base_angle = if travel == Vec3::ZERO {
            0.0
        } else {
            travel.z.atan2(travel.x)
        };

        let ray_count = self.config.ray_count.max(1);
        let mut nearest: BTreeMap<Entity, ObstacleRecord> = BTreeMap::new();

        for i in 0..ray_count {
            let angle = base_angle + std::f32::consts::TAU * i as f32 / ray_count as f32;
            let ray = Vec3::new(angle.cos(), 0.0, angle.sin());
            let Some(hit) = physics.cast_ray(
                ray_origin,
                ray_origin + ray * self.config.ray_length,
                self.config.collision_mask,
                &[self_entity],
            ) else {
                continue;
            };

            let offset = flatten(hit.point - ray_origin);
            let distance = offset.length();
            let direction = offset.try_normalize().unwrap_or(ray);
            let record = ObstacleRecord {
                collider: hit.collider,
                position: hit.point,
                normal: hit.normal,
                direction,
                distance,
                frontality: if travel == Vec3::ZERO { 0.0 } else { direction.dot(travel) },
                velocity: physics.collider_velocity(hit.collider),
                last_seen: now,
            };

            let closer = nearest
                .get(&hit.collider)
                .map_or(true, |existing| record.distance < existing.distance);
            if closer {
                nearest.insert(hit.collider, record);
            }
        }

        for record in nearest.into_values() {
            if !self.obstacles.contains_key(&record.collider) {
                self.events.push(MotrixEvent::ObstacleEncountered {
                    collider: record.collider,
                    position: record.position,
                });
            }
            self.obstacles.insert(record.collider, record);
        }

        let timeout = self.config.obstacle_timeout;
        self.obstacles
            .retain(|collider, record| physics.is_collider_valid(*collider) && now - record.last_seen <= timeout);
    }

    /// Вектор отталкивания одного препятствия
    pub fn contribution(&self, record: &ObstacleRecord) -> Vec3 {
        let distance = record.distance.max(self.config.min_distance);
        let mut magnitude = self.config.avoidance_force / (distance * distance);

        if record.frontality > self.config.frontal_avoidance_threshold {
            magnitude *= self.config.frontal_boost;
        }
        if record.velocity.length() > MOVING_SPEED_EPSILON {
            magnitude *= self.config.moving_obstacle_boost;
        }

        let away = if record.direction != Vec3::ZERO {
            -record.direction
        } else {
            flatten(record.normal).normalize_or_zero()
        };
        away * magnitude
    }

    /// Σ отталкиваний от всех записей
    pub fn repulsion(&self) -> Vec3 {
        self.obstacles.values().map(|r| self.contribution(r)).sum()
    }

    /// Скорректированное направление (единичное); без препятствий = desired
    pub fn avoid(&mut self, desired: Vec3, dt: f32) -> Vec3 {
        let desired = flatten(desired).normalize_or_zero();
        let repulsion = self.repulsion();

        self.memory *= (-self.config.memory_decay_rate * dt.max(0.0)).exp();
        if repulsion.length_squared() > self.memory.length_squared() {
            self.memory = repulsion;
        }

        let push = repulsion + self.memory;
        if push.length_squared() <= f32::EPSILON {
            return desired;
        }

        let weight = self.config.avoidance_weight.clamp(0.0, 1.0);
        let blended = desired * (1.0 - weight) + push * weight;
        blended.try_normalize().unwrap_or(desired)
    }

    /// Фронтальное препятствие в пределах blocked_distance
    pub fn is_path_blocked(&self) -> bool {
        self.obstacles.values().any(|r| {
            r.frontality > self.config.frontal_avoidance_threshold && r.distance < self.config.blocked_distance
        })
    }

    pub fn obstacles(&self) -> impl Iterator<Item = &ObstacleRecord> {
        self.obstacles.values()
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacles.len()
    }

    pub fn clear(&mut self) {
        self.obstacles.clear();
        self.memory = Vec3::ZERO;
    }

    pub fn drain_events(&mut self) -> Vec<MotrixEvent> {
        self.events.drain()
    }
}
