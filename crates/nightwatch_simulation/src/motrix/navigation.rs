//! Navigation — путь от внешнего pathfinder'а + следование по waypoints
//!
//! Путь упрощается: внутренняя точка выбрасывается, если поворот в ней
//! меньше `max_merge_angle_degrees` И сегмент от последней оставленной
//! точки короче 2·`simplify_radius`. Концы пути сохраняются всегда.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::events::MotrixEvent;
use crate::error::NavigationError;
use crate::events::EventQueue;
use crate::logger;
use crate::world::{horizontal_distance, Pathfinder};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Waypoint считается пройденным ближе этого (метры, XZ)
    pub waypoint_reach_distance: f32,
    /// Destination считается достигнутой ближе этого
    pub arrival_distance: f32,
    pub simplify_radius: f32,
    pub max_merge_angle_degrees: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            waypoint_reach_distance: 0.5,
            arrival_distance: 1.0,
            simplify_radius: 1.0,
            max_merge_angle_degrees: 45.0,
        }
    }
}

/// Выбросить почти-коллинеарные короткие промежуточные точки
pub fn simplify_path(points: &[Vec3], radius: f32, max_angle_degrees: f32) -> Vec<Vec3> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let max_angle = max_angle_degrees.to_radians();
    let mut simplified = vec![points[0]];

    for window in 1..points.len() - 1 {
        let Some(&last_kept) = simplified.last() else {
            continue;
        };
        let current = points[window];
        let next = points[window + 1];

        let incoming = (current - last_kept).normalize_or_zero();
        let outgoing = (next - current).normalize_or_zero();
        let turn = if incoming == Vec3::ZERO || outgoing == Vec3::ZERO {
            0.0
        } else {
            incoming.angle_between(outgoing)
        };
        let segment = last_kept.distance(current);

        let mergeable = turn < max_angle && segment < 2.0 * radius;
        if !mergeable {
            simplified.push(current);
        }
    }

    if let Some(&last) = points.last() {
        simplified.push(last);
    }
    simplified
}

#[derive(Debug, Clone, Default)]
pub struct Navigation {
    config: NavigationConfig,
    path: Vec<Vec3>,
    index: usize,
    destination: Option<Vec3>,
    events: EventQueue<MotrixEvent>,
}

impl Navigation {
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Запросить путь; возвращает число waypoints после упрощения
    pub fn request_path(&mut self, pathfinder: &dyn Pathfinder, from: Vec3, to: Vec3) -> Result<usize, NavigationError> {
        let raw = pathfinder.find_path(from, to);
        if raw.is_empty() {
            self.cancel();
            logger::log(&format!("🧭 Navigation: no path {:?} → {:?}", from, to));
            self.events.push(MotrixEvent::PathFailed { destination: to });
            return Err(NavigationError::NoPath { from, to });
        }

        self.set_path(raw, to);
        Ok(self.path.len())
    }

    /// Прямой путь без pathfinder'а
    pub fn set_direct(&mut self, from: Vec3, to: Vec3) {
        self.set_path(vec![from, to], to);
    }

    fn set_path(&mut self, raw: Vec<Vec3>, destination: Vec3) {
        self.path = simplify_path(&raw, self.config.simplify_radius, self.config.max_merge_angle_degrees);
        // Первая точка = откуда стартовали, сразу считаем пройденной
        self.index = usize::from(self.path.len() > 1);
        self.destination = Some(destination);
    }

    /// Направление на текущий waypoint; `None` когда путь пройден
    pub fn steer(&mut self, position: Vec3) -> Option<Vec3> {
        while let Some(&waypoint) = self.path.get(self.index) {
            let is_last = self.index + 1 == self.path.len();
            let reach = if is_last {
                self.config.arrival_distance
            } else {
                self.config.waypoint_reach_distance
            };

            if horizontal_distance(position, waypoint) <= reach {
                self.index += 1;
                continue;
            }

            let direction = Vec3::new(waypoint.x - position.x, 0.0, waypoint.z - position.z);
            return direction.try_normalize();
        }
        None
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.path.len()
    }

    pub fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    pub fn current_waypoint(&self) -> Option<Vec3> {
        self.path.get(self.index).copied()
    }

    pub fn path(&self) -> &[Vec3] {
        &self.path
    }

    /// Остаток пути по waypoints (XZ)
    pub fn remaining_distance(&self, position: Vec3) -> f32 {
        let Some(&next) = self.path.get(self.index) else {
            return 0.0;
        };
        let mut total = horizontal_distance(position, next);
        for pair in self.path[self.index..].windows(2) {
            total += horizontal_distance(pair[0], pair[1]);
        }
        total
    }

    pub fn cancel(&mut self) {
        self.path.clear();
        self.index = 0;
        self.destination = None;
    }

    pub fn drain_events(&mut self) -> Vec<MotrixEvent> {
        self.events.drain()
    }
}
