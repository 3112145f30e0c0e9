//! Follow — держим дистанцию до цели
//!
//! - дальше `max_follow_distance` → бежим прямо в позицию цели
//! - ближе `min_distance` → отходим на `optimal_distance`
//! - иначе → точка на `optimal_distance` перед предсказанной позицией
//!   (`position + velocity × distance / prediction_divisor`)
//!
//! Цель пропала: осматриваем кольцо вокруг последней известной позиции,
//! через `target_memory_duration` сдаёмся → Wander.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{random_direction, ring_points, StateBehavior, StateCore, StateKind};
use crate::brain::blackboard::VisibleTargetFact;
use crate::brain::context::StateContext;
use crate::logger;
use crate::world::{flatten, horizontal_distance};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowConfig {
    pub optimal_distance: f32,
    pub min_distance: f32,
    pub max_follow_distance: f32,
    pub distance_tolerance: f32,
    /// Сколько секунд ищем потерянную цель
    pub target_memory_duration: f64,
    /// Горизонт предсказания = distance / prediction_divisor (секунды)
    pub prediction_divisor: f32,
    pub search_radius: f32,
    pub search_points: usize,
    pub search_point_delay: f64,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            optimal_distance: 3.0,
            min_distance: 1.5,
            max_follow_distance: 20.0,
            distance_tolerance: 0.5,
            target_memory_duration: 5.0,
            prediction_divisor: 5.0,
            search_radius: 4.0,
            search_points: 6,
            search_point_delay: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FollowState {
    config: FollowConfig,
    core: StateCore,
    target: Option<Entity>,
    last_known_position: Option<Vec3>,
    lost_at: Option<f64>,
    search: Vec<Vec3>,
    search_index: usize,
    next_search_at: Option<f64>,
}

impl FollowState {
    pub fn new(config: FollowConfig) -> Self {
        Self {
            config,
            core: StateCore::default(),
            target: None,
            last_known_position: None,
            lost_at: None,
            search: Vec::new(),
            search_index: 0,
            next_search_at: None,
        }
    }

    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    pub fn is_searching(&self) -> bool {
        self.lost_at.is_some()
    }

    /// Куда идти при видимой цели
    pub fn pursuit_point(&self, self_position: Vec3, target: &VisibleTargetFact) -> PursuitPoint {
        let config = &self.config;
        let distance = horizontal_distance(self_position, target.position);

        if distance > config.max_follow_distance {
            return PursuitPoint::MoveTo(target.position);
        }

        if distance < config.min_distance {
            let away = flatten(self_position - target.position).try_normalize();
            return match away {
                Some(away) => PursuitPoint::MoveTo(target.position + away * config.optimal_distance),
                None => PursuitPoint::BackAwayRandom,
            };
        }

        let horizon = if config.prediction_divisor > f32::EPSILON {
            distance / config.prediction_divisor
        } else {
            0.0
        };
        let predicted = target.position + flatten(target.velocity) * horizon;
        let standing_still = flatten(target.velocity).length() < 0.1;
        if standing_still && (distance - config.optimal_distance).abs() <= config.distance_tolerance {
            return PursuitPoint::Hold;
        }

        let back = flatten(self_position - predicted).try_normalize().unwrap_or(Vec3::ZERO);
        PursuitPoint::MoveTo(predicted + back * config.optimal_distance)
    }

    fn pursue(&mut self, ctx: &mut StateContext, target: VisibleTargetFact) {
        self.lost_at = None;
        self.search.clear();
        self.next_search_at = None;
        self.last_known_position = Some(target.position);

        let distance = horizontal_distance(ctx.facts.position, target.position);
        ctx.motrix.set_running(distance > self.config.max_follow_distance);

        match self.pursuit_point(ctx.facts.position, &target) {
            PursuitPoint::MoveTo(point) => self.move_if_changed(ctx, point),
            PursuitPoint::BackAwayRandom => {
                let away = random_direction(ctx.rng);
                ctx.motrix.move_to(target.position + away * self.config.optimal_distance);
            }
            PursuitPoint::Hold => {
                if ctx.motrix.has_destination() {
                    ctx.motrix.stop();
                }
            }
        }
        ctx.motrix.look_at(target.position);
    }

    /// Не перезапрашиваем путь, если точка почти не сдвинулась
    fn move_if_changed(&self, ctx: &mut StateContext, point: Vec3) {
        let unchanged = !ctx.motrix.has_arrived()
            && ctx
                .motrix
                .destination()
                .is_some_and(|current| horizontal_distance(current, point) <= self.config.distance_tolerance);
        if !unchanged {
            ctx.motrix.move_to(point);
        }
    }

    fn search(&mut self, ctx: &mut StateContext) {
        let lost_at = *self.lost_at.get_or_insert(ctx.now);
        if ctx.now - lost_at >= self.config.target_memory_duration {
            logger::log(&format!("👣 Follow: target {:?} lost, giving up", self.target));
            self.core.transition_to(StateKind::Wander);
            return;
        }

        let Some(center) = self.last_known_position else {
            self.core.transition_to(StateKind::Wander);
            return;
        };

        if self.search.is_empty() {
            ctx.motrix.set_running(false);
            self.search.push(center);
            self.search.extend(ring_points(
                center,
                self.config.search_radius,
                self.config.search_points,
                ctx.rng,
            ));
            self.search_index = 0;
            self.next_search_at = None;
            ctx.motrix.move_to(center);
            return;
        }

        if let Some(at) = self.next_search_at {
            if ctx.now >= at {
                self.next_search_point(ctx);
            }
            return;
        }

        if ctx.facts.has_arrived {
            self.next_search_at = Some(ctx.now + self.config.search_point_delay);
        } else if !ctx.motrix.has_destination() {
            self.next_search_point(ctx);
        }
    }

    fn next_search_point(&mut self, ctx: &mut StateContext) {
        self.next_search_at = None;
        if self.search.is_empty() {
            return;
        }
        self.search_index = (self.search_index + 1) % self.search.len();
        ctx.motrix.move_to(self.search[self.search_index]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PursuitPoint {
    MoveTo(Vec3),
    /// Стоим на одной точке с целью: направление отхода случайное
    BackAwayRandom,
    /// Уже на нужной дистанции
    Hold,
}

impl StateBehavior for FollowState {
    fn kind(&self) -> StateKind {
        StateKind::Follow
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter(&mut self, ctx: &mut StateContext) {
        self.target = ctx.facts.current_target;
        self.last_known_position = self
            .target
            .and_then(|target| ctx.facts.visible(target).map(|t| t.position));
        self.lost_at = None;
        self.search.clear();
        self.search_index = 0;
        self.next_search_at = None;

        match self.target.and_then(|target| ctx.facts.visible(target).copied()) {
            Some(target) => self.pursue(ctx, target),
            None => self.core.transition_to(StateKind::Wander),
        }
    }

    fn update(&mut self, ctx: &mut StateContext) {
        let visible = self.target.and_then(|target| ctx.facts.visible(target).copied());
        if let Some(target) = visible {
            self.pursue(ctx, target);
            return;
        }

        // Текущая цель не видна, но видна другая → переключаемся
        if let Some(other) = ctx.facts.strongest_visible().copied() {
            self.target = Some(other.entity);
            self.pursue(ctx, other);
            return;
        }

        if let Some(target) = self.target {
            if let Some(memory) = ctx.facts.remembered(target) {
                if self.search.is_empty() {
                    self.last_known_position = Some(memory.position);
                }
            }
        }
        self.search(ctx);
    }

    fn exit(&mut self, ctx: &mut StateContext) {
        ctx.motrix.set_running(false);
        ctx.motrix.clear_facing();
    }

    fn on_destination_reached(&mut self, ctx: &mut StateContext) {
        if self.lost_at.is_some() && !self.search.is_empty() && self.next_search_at.is_none() {
            self.next_search_at = Some(ctx.now + self.config.search_point_delay);
        }
    }

    fn on_target_lost(&mut self, ctx: &mut StateContext, target: Entity) {
        if self.target == Some(target) {
            self.lost_at.get_or_insert(ctx.now);
        }
    }
}
