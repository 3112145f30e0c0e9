//! Flee — бежим от ближайшей угрозы
//!
//! Угроза: ближайшая видимая цель, иначе ближайшая из памяти.
//! Куда: known location категории Shelter примерно напротив угрозы
//! (по прибытии отмечается посещённым), иначе `min_flee_distance` по направлению от неё (случайное, если стоим
//! в одной точке). После `max_flee_attempts` неудач (путь не найден или
//! заблокирован) ищем укрытие: точку, которую луч от угрозы не достаёт.
//! Каждые `safety_check_interval` проверяем: угроза не видна и дальше
//! `safe_distance` → Wander.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use super::{random_direction, StateBehavior, StateCore, StateKind};
use crate::brain::blackboard::BlackboardFacts;
use crate::brain::context::StateContext;
use crate::brain::known_locations::{KnownLocation, KnownLocations, LocationCategory};
use crate::logger;
use crate::world::{flatten, horizontal_distance, PhysicsQuery, COLLISION_MASK_LOS};

/// Высота "глаз" угрозы для проверки укрытия
const THREAT_EYE_HEIGHT: f32 = 1.6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleeConfig {
    pub min_flee_distance: f32,
    pub safe_distance: f32,
    pub max_flee_attempts: u32,
    pub safety_check_interval: f64,
    pub shelter_search_radius: f32,
    /// Минимальный dot(направление на укрытие, направление от угрозы)
    pub shelter_alignment: f32,
    pub hiding_radius: f32,
    pub hiding_samples: usize,
}

impl Default for FleeConfig {
    fn default() -> Self {
        Self {
            min_flee_distance: 15.0,
            safe_distance: 20.0,
            max_flee_attempts: 3,
            safety_check_interval: 1.0,
            shelter_search_radius: 30.0,
            shelter_alignment: 0.5,
            hiding_radius: 8.0,
            hiding_samples: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threat {
    pub entity: Entity,
    pub position: Vec3,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct FleeState {
    config: FleeConfig,
    core: StateCore,
    threat: Option<Threat>,
    attempts: u32,
    next_safety_check: f64,
    hiding: bool,
    /// Имя укрытия, к которому бежим
    shelter: Option<String>,
}

impl FleeState {
    pub fn new(config: FleeConfig) -> Self {
        Self {
            config,
            core: StateCore::default(),
            threat: None,
            attempts: 0,
            next_safety_check: 0.0,
            hiding: false,
            shelter: None,
        }
    }

    pub fn threat(&self) -> Option<Threat> {
        self.threat
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_hiding(&self) -> bool {
        self.hiding
    }

    pub fn shelter(&self) -> Option<&str> {
        self.shelter.as_deref()
    }

    /// Точка побега без укрытий: `min_flee_distance` от угрозы
    pub fn flee_point(&self, self_position: Vec3, threat_position: Vec3) -> Option<(Vec3, Vec3)> {
        let away = flatten(self_position - threat_position).try_normalize()?;
        Some((self_position + away * self.config.min_flee_distance, away))
    }

    /// Укрытие в радиусе, лежащее примерно напротив угрозы (ближайшее)
    pub fn find_shelter<'l>(
        &self,
        locations: &'l KnownLocations,
        self_position: Vec3,
        away: Vec3,
    ) -> Option<&'l KnownLocation> {
        locations
            .within(self_position, self.config.shelter_search_radius, LocationCategory::Shelter)
            .into_iter()
            .filter(|shelter| {
                flatten(shelter.position - self_position)
                    .try_normalize()
                    .is_some_and(|direction| direction.dot(away) >= self.config.shelter_alignment)
            })
            .min_by(|a, b| {
                a.position
                    .distance(self_position)
                    .total_cmp(&b.position.distance(self_position))
            })
    }

    /// Точка на `hiding_radius`, до которой луч от угрозы не доходит
    pub fn find_hiding_spot(&self, physics: &dyn PhysicsQuery, self_position: Vec3, threat_position: Vec3) -> Option<Vec3> {
        let samples = self.config.hiding_samples;
        if samples == 0 {
            return None;
        }
        let away = flatten(self_position - threat_position).try_normalize().unwrap_or(Vec3::X);
        let eye = threat_position + Vec3::Y * THREAT_EYE_HEIGHT;

        let mut candidates: Vec<Vec3> = (0..samples)
            .map(|i| {
                let angle = i as f32 * TAU / samples as f32;
                self_position + Vec3::new(angle.cos(), 0.0, angle.sin()) * self.config.hiding_radius
            })
            .collect();
        // Сначала точки в сторону от угрозы
        candidates.sort_by(|a, b| {
            let da = flatten(*a - self_position).normalize_or_zero().dot(away);
            let db = flatten(*b - self_position).normalize_or_zero().dot(away);
            db.total_cmp(&da)
        });

        candidates.into_iter().find(|candidate| {
            let target = *candidate + Vec3::Y * 0.5;
            physics
                .cast_ray(eye, target, COLLISION_MASK_LOS, &[])
                .is_some_and(|hit| hit.point.distance(eye) + 0.5 < target.distance(eye))
        })
    }

    fn identify_threat(&mut self, facts: &BlackboardFacts) {
        if let Some(visible) = facts.nearest_visible() {
            self.threat = Some(Threat {
                entity: visible.entity,
                position: visible.position,
                visible: true,
            });
        } else if let Some(remembered) = facts.nearest_remembered() {
            self.threat = Some(Threat {
                entity: remembered.entity,
                position: remembered.position,
                visible: false,
            });
        } else if let Some(threat) = self.threat.as_mut() {
            threat.visible = false;
        }
    }

    fn flee(&mut self, ctx: &mut StateContext) {
        let Some(threat) = self.threat else {
            return;
        };
        let position = ctx.facts.position;

        let (fallback, away) = match self.flee_point(position, threat.position) {
            Some(point) => point,
            None => {
                let away = random_direction(ctx.rng);
                (position + away * self.config.min_flee_distance, away)
            }
        };

        let shelter = self
            .find_shelter(&ctx.notes.known_locations, position, away)
            .map(|shelter| (shelter.name.clone(), shelter.position));
        let destination = match shelter {
            Some((name, shelter_position)) => {
                self.shelter = Some(name);
                shelter_position
            }
            None => {
                self.shelter = None;
                fallback
            }
        };

        ctx.motrix.set_running(true);
        ctx.motrix.move_to(destination);
        ctx.motrix.face_direction(away);
        self.hiding = false;
    }

    fn retry(&mut self, ctx: &mut StateContext) {
        self.attempts += 1;
        if self.attempts <= self.config.max_flee_attempts {
            logger::log(&format!(
                "🏃 Flee: attempt {}/{} for {:?}",
                self.attempts, self.config.max_flee_attempts, ctx.self_entity
            ));
            self.flee(ctx);
            return;
        }

        let Some(threat) = self.threat else {
            return;
        };
        match self.find_hiding_spot(ctx.physics, ctx.facts.position, threat.position) {
            Some(spot) => {
                logger::log(&format!("🏃 Flee: {:?} hiding at {:?}", ctx.self_entity, spot));
                ctx.motrix.set_running(true);
                ctx.motrix.move_to(spot);
                self.hiding = true;
                self.shelter = None;
            }
            None => {
                logger::log_warning(&format!("🏃 Flee: no hiding spot for {:?}, running blind", ctx.self_entity));
                let away = random_direction(ctx.rng);
                ctx.motrix.set_running(true);
                ctx.motrix.move_to(ctx.facts.position + away * self.config.min_flee_distance);
                self.shelter = None;
            }
        }
        self.attempts = 0;
    }

    fn is_safe(&self, facts: &BlackboardFacts) -> bool {
        match self.threat {
            None => true,
            Some(threat) => {
                facts.visible(threat.entity).is_none()
                    && horizontal_distance(facts.position, threat.position) > self.config.safe_distance
            }
        }
    }
}

impl StateBehavior for FleeState {
    fn kind(&self) -> StateKind {
        StateKind::Flee
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter(&mut self, ctx: &mut StateContext) {
        self.attempts = 0;
        self.hiding = false;
        self.threat = None;
        self.shelter = None;
        self.next_safety_check = ctx.now + self.config.safety_check_interval;

        self.identify_threat(ctx.facts);
        if self.threat.is_none() {
            self.core.transition_to(StateKind::Wander);
            return;
        }
        self.flee(ctx);
    }

    fn update(&mut self, ctx: &mut StateContext) {
        self.identify_threat(ctx.facts);

        if ctx.now >= self.next_safety_check {
            self.next_safety_check = ctx.now + self.config.safety_check_interval;
            if self.is_safe(ctx.facts) {
                logger::log(&format!("🏃 Flee: {:?} is safe", ctx.self_entity));
                self.core.transition_to(StateKind::Wander);
                return;
            }
        }

        if !ctx.motrix.has_destination() || ctx.facts.is_path_blocked {
            self.retry(ctx);
        }
    }

    fn exit(&mut self, ctx: &mut StateContext) {
        ctx.motrix.set_running(false);
        ctx.motrix.clear_facing();
    }

    fn on_destination_reached(&mut self, ctx: &mut StateContext) {
        if let Some(name) = self.shelter.take() {
            if ctx.notes.known_locations.mark_visited(&name, ctx.now) {
                logger::log(&format!("🏃 Flee: {:?} reached shelter '{}'", ctx.self_entity, name));
            }
        }

        // Пришли, но угроза рядом → бежим дальше (укрытие держим)
        if !self.hiding && !self.is_safe(ctx.facts) {
            self.flee(ctx);
        }
    }
}
